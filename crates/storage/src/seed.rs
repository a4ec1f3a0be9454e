//! Starter question bank.

use quiz_core::model::{
    AnsweredQuestion, Difficulty, Question, QuestionDetails, QuestionError, QuestionId,
};

use crate::repository::{QuestionRepository, StorageError};

struct SampleQuestion {
    id: &'static str,
    text: &'static str,
    options: [&'static str; 4],
    correct_answer: &'static str,
    category: &'static str,
    difficulty: Difficulty,
}

const SAMPLES: &[SampleQuestion] = &[
    SampleQuestion {
        id: "capital-france",
        text: "What is the capital of France?",
        options: ["Paris", "London", "Berlin", "Madrid"],
        correct_answer: "Paris",
        category: "Geography",
        difficulty: Difficulty::Easy,
    },
    SampleQuestion {
        id: "red-planet",
        text: "Which planet is known as the Red Planet?",
        options: ["Mars", "Venus", "Jupiter", "Saturn"],
        correct_answer: "Mars",
        category: "Science",
        difficulty: Difficulty::Easy,
    },
    SampleQuestion {
        id: "largest-mammal",
        text: "What is the largest mammal in the world?",
        options: ["Blue Whale", "African Elephant", "Giraffe", "Hippopotamus"],
        correct_answer: "Blue Whale",
        category: "Animals",
        difficulty: Difficulty::Easy,
    },
    SampleQuestion {
        id: "general-relativity",
        text: "Which famous scientist developed the theory of general relativity?",
        options: ["Albert Einstein", "Isaac Newton", "Galileo Galilei", "Stephen Hawking"],
        correct_answer: "Albert Einstein",
        category: "Science",
        difficulty: Difficulty::Medium,
    },
    SampleQuestion {
        id: "ww2-end",
        text: "In which year did World War II end?",
        options: ["1945", "1939", "1942", "1950"],
        correct_answer: "1945",
        category: "History",
        difficulty: Difficulty::Medium,
    },
    SampleQuestion {
        id: "gold-symbol",
        text: "What is the chemical symbol for gold?",
        options: ["Au", "Ag", "Fe", "Cu"],
        correct_answer: "Au",
        category: "Science",
        difficulty: Difficulty::Medium,
    },
    SampleQuestion {
        id: "microsoft-language",
        text: "Which programming language was developed by Microsoft?",
        options: ["C#", "Java", "Python", "Ruby"],
        correct_answer: "C#",
        category: "Technology",
        difficulty: Difficulty::Medium,
    },
    SampleQuestion {
        id: "most-spoken",
        text: "What is the most spoken language in the world?",
        options: ["Mandarin", "English", "Spanish", "Hindi"],
        correct_answer: "Mandarin",
        category: "Language",
        difficulty: Difficulty::Medium,
    },
    SampleQuestion {
        id: "primary-color",
        text: "Which of these is NOT a primary color?",
        options: ["Green", "Red", "Blue", "Yellow"],
        correct_answer: "Green",
        category: "Art",
        difficulty: Difficulty::Hard,
    },
    SampleQuestion {
        id: "smallest-prime",
        text: "What is the smallest prime number?",
        options: ["2", "1", "0", "3"],
        correct_answer: "2",
        category: "Mathematics",
        difficulty: Difficulty::Hard,
    },
];

/// The built-in sample questions.
///
/// # Errors
///
/// Returns `QuestionError` if a sample fails validation.
pub fn sample_questions() -> Result<Vec<AnsweredQuestion>, QuestionError> {
    SAMPLES
        .iter()
        .map(|s| {
            let question = Question::new(
                QuestionId::new(s.id),
                s.text,
                s.options.iter().map(|o| (*o).to_owned()).collect(),
                QuestionDetails::new(Some(s.category.to_owned()), Some(s.difficulty)),
            )?;
            AnsweredQuestion::new(question, s.correct_answer)
        })
        .collect()
}

/// Replace the question bank with `questions`. Returns how many were written.
///
/// # Errors
///
/// Returns `StorageError` if clearing or inserting fails.
pub async fn replace_questions(
    repo: &dyn QuestionRepository,
    questions: &[AnsweredQuestion],
) -> Result<usize, StorageError> {
    let removed = repo.delete_all_questions().await?;
    log::debug!("removed {removed} questions before seeding");
    for question in questions {
        repo.upsert_question(question).await?;
    }
    Ok(questions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;

    #[test]
    fn samples_are_valid() {
        let questions = sample_questions().unwrap();
        assert_eq!(questions.len(), SAMPLES.len());
        assert!(questions.iter().all(|q| q.question().options().len() == 4));
    }

    #[tokio::test]
    async fn replace_clears_previous_bank() {
        let repo = InMemoryRepository::new();
        let questions = sample_questions().unwrap();
        replace_questions(&repo, &questions[..3]).await.unwrap();
        replace_questions(&repo, &questions).await.unwrap();
        assert_eq!(
            repo.count_questions().await.unwrap(),
            questions.len() as u64
        );
    }
}
