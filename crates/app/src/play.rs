//! Interactive terminal quiz.

use std::error::Error;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use quiz_core::model::{Question, QuizResult, difficulty_label};
use quiz_core::time::format_time;
use services::{
    Advance, AppServices, Countdown, QuizConfig, QuizEngine, QuizProgress, RankedEntry,
};

/// One line of player input while a question is open.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Choice(usize),
    Time,
    Quit,
    Invalid,
}

fn parse_input(line: &str, options: usize) -> Input {
    match line.trim() {
        "q" | "quit" => Input::Quit,
        "t" | "time" => Input::Time,
        raw => match raw.parse::<usize>() {
            Ok(n) if (1..=options).contains(&n) => Input::Choice(n - 1),
            _ => Input::Invalid,
        },
    }
}

/// How a question was closed.
enum Outcome {
    Answered(usize),
    TimedOut,
    Quit,
}

pub async fn run_quiz(services: &AppServices, config: QuizConfig) -> Result<(), Box<dyn Error>> {
    let engine = services.quiz_engine(config)?;
    let duration = engine.config().question_duration_secs;

    println!("Loading questions...");
    engine.start_quiz().await?;
    println!(
        "Welcome, {}! {} questions, {duration}s each. Type the option number, 't' for time left, 'q' to quit.",
        engine.username(),
        engine.progress().total
    );

    let (timeout_tx, mut timeout_rx) = mpsc::unbounded_channel();
    let mut countdown = Countdown::new(duration, move || {
        let _ = timeout_tx.send(());
    });
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(question) = engine.current_question() {
        print_question(&question, engine.progress(), duration);
        while timeout_rx.try_recv().is_ok() {}
        countdown.start(duration);

        let outcome = loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break Outcome::Quit };
                    match parse_input(&line, question.options().len()) {
                        Input::Choice(index) => break Outcome::Answered(index),
                        Input::Quit => break Outcome::Quit,
                        Input::Time => println!(
                            "  {} left ({:.0}%)",
                            format_time(u64::from(countdown.remaining_secs())),
                            countdown.percentage()
                        ),
                        Input::Invalid => {
                            println!("  Enter a number from 1 to {}.", question.options().len());
                        }
                    }
                }
                Some(()) = timeout_rx.recv() => break Outcome::TimedOut,
            }
        };
        countdown.stop();

        match outcome {
            Outcome::Answered(index) => {
                engine.answer_question(question.id(), question.options()[index].clone())?;
                if let Some(feedback) = engine.feedback(question.id()) {
                    if feedback.is_correct {
                        println!("  Correct!");
                    } else {
                        println!("  Wrong. The answer was {}.", feedback.correct_answer);
                    }
                }
            }
            Outcome::TimedOut => println!("  Time's up!"),
            Outcome::Quit => {
                let progress = engine.progress();
                engine.reset_quiz();
                log::info!("quiz abandoned with {} questions unanswered", progress.remaining());
                println!("Quiz abandoned.");
                return Ok(());
            }
        }

        if let Advance::Ended(result) = engine.advance_or_end()? {
            println!();
            println!("{}", result_line(&result));
            log::info!(
                "{} finished with {}/{} in {}s",
                engine.username(),
                result.score,
                result.total_questions,
                result.time_taken_secs
            );
            save_score(&engine).await;
            break;
        }
    }
    Ok(())
}

fn print_question(question: &Question, progress: QuizProgress, duration: u32) {
    println!();
    println!(
        "Question {}/{}  [{} | {}]  ({} to answer, {} unanswered)",
        progress.current_position,
        progress.total,
        question.category().unwrap_or("General"),
        difficulty_label(question.difficulty()),
        format_time(u64::from(duration)),
        progress.remaining()
    );
    println!("{}", question.text());
    for (i, option) in question.options().iter().enumerate() {
        println!("  {}. {option}", i + 1);
    }
}

fn result_line(result: &QuizResult) -> String {
    format!(
        "You scored {}/{} ({:.0}%) in {}.",
        result.score,
        result.total_questions,
        result.percentage,
        format_time(result.time_taken_secs)
    )
}

/// Runs after the result is on screen; a slow or failing backend only
/// affects this line.
async fn save_score(engine: &QuizEngine) {
    println!("Saving score...");
    match engine.submit_result().await {
        Ok(_) => println!("Score saved to the leaderboard as {}.", engine.username()),
        Err(err) => println!("Your score could not be saved: {err}"),
    }
}

pub fn print_leaderboard(rows: &[RankedEntry]) {
    if rows.is_empty() {
        println!("No scores yet.");
        return;
    }
    println!("{:>4}  {:<20} {:>7} {:>6} {:>6}", "#", "Player", "Score", "%", "Time");
    for row in rows {
        let entry = &row.entry;
        println!(
            "{:>4}  {:<20} {:>7} {:>5.0}% {:>6}",
            row.rank,
            entry.username,
            format!("{}/{}", entry.score, entry.total_questions),
            entry.percentage,
            row.time_label()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_player_input() {
        assert_eq!(parse_input(" 2 ", 4), Input::Choice(1));
        assert_eq!(parse_input("0", 4), Input::Invalid);
        assert_eq!(parse_input("5", 4), Input::Invalid);
        assert_eq!(parse_input("abc", 4), Input::Invalid);
        assert_eq!(parse_input("t", 4), Input::Time);
        assert_eq!(parse_input("quit", 4), Input::Quit);
    }

    #[test]
    fn result_line_formats_time() {
        let result = QuizResult {
            score: 7,
            total_questions: 10,
            percentage: 70.0,
            time_taken_secs: 125,
        };
        assert_eq!(result_line(&result), "You scored 7/10 (70%) in 02:05.");
    }
}
