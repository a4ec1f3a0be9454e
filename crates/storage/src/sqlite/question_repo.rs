use quiz_core::model::{AnsweredQuestion, QuestionId};
use sqlx::Row;
use std::collections::HashMap;

use super::SqliteRepository;
use super::mapping::{conn, encode_options, map_question_row, ser};
use crate::repository::{QuestionFilter, QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &AnsweredQuestion) -> Result<(), StorageError> {
        let q = question.question();
        let options = encode_options(q.options())?;

        sqlx::query(
            r"
            INSERT INTO questions (id, text, options, correct_answer, category, difficulty)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                text = excluded.text,
                options = excluded.options,
                correct_answer = excluded.correct_answer,
                category = excluded.category,
                difficulty = excluded.difficulty
            ",
        )
        .bind(q.id().as_str())
        .bind(q.text())
        .bind(options)
        .bind(question.correct_answer())
        .bind(q.category())
        .bind(q.difficulty().map(|d| d.as_str()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn sample_questions(
        &self,
        filter: &QuestionFilter,
        limit: u32,
    ) -> Result<Vec<AnsweredQuestion>, StorageError> {
        let mut sql = String::from(
            r"
                SELECT id, text, options, correct_answer, category, difficulty
                FROM questions
                WHERE 1 = 1
            ",
        );

        let mut bind_index = 1;
        if filter.category.is_some() {
            sql.push_str(" AND category = ?");
            sql.push_str(&bind_index.to_string());
            sql.push_str(" COLLATE NOCASE");
            bind_index += 1;
        }
        if filter.difficulty.is_some() {
            sql.push_str(" AND difficulty = ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        sql.push_str(" ORDER BY RANDOM() LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut query = sqlx::query(&sql);
        if let Some(category) = filter.category.as_deref() {
            query = query.bind(category);
        }
        if let Some(difficulty) = filter.difficulty {
            query = query.bind(difficulty.as_str());
        }
        query = query.bind(i64::from(limit));

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }

    async fn get_questions(
        &self,
        ids: &[QuestionId],
    ) -> Result<Vec<AnsweredQuestion>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r"
                SELECT id, text, options, correct_answer, category, difficulty
                FROM questions
                WHERE id IN (
            ",
        );
        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push(')');

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.as_str());
        }

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for row in rows {
            let question = map_question_row(&row)?;
            by_id.insert(question.question().id().clone(), question);
        }

        // Preserve the caller's order.
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn delete_all_questions(&self) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM questions")
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }

    async fn count_questions(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM questions")
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        let n: i64 = row.try_get("n").map_err(ser)?;
        u64::try_from(n).map_err(|_| StorageError::Serialization(format!("invalid count: {n}")))
    }
}

