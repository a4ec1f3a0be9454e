use std::fmt;

use quiz_core::model::Difficulty;
use services::backend::DEFAULT_LEADERBOARD_LIMIT;
use services::{AppServices, Clock, HttpBackendConfig, QuizConfig};
use storage::repository::Storage;
use storage::seed::{replace_questions, sample_questions};

mod play;

/// Database used by `play`, `leaderboard` and `seed` when no `--db` is given.
const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDifficulty { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDifficulty { raw } => {
                write!(f, "invalid --difficulty value: {raw} (easy, medium or hard)")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number(flag: &'static str, raw: String) -> Result<u32, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Leaderboard,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "leaderboard" => Some(Self::Leaderboard),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

/// Where questions and scores live.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Sqlite(String),
    Http(HttpBackendConfig),
}

struct Args {
    source: Source,
    quiz: QuizConfig,
    limit: u32,
}

impl Args {
    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
        quiz: QuizConfig,
    ) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut api = HttpBackendConfig::from_env();
        let mut quiz = quiz;
        let mut limit = DEFAULT_LEADERBOARD_LIMIT;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                    api = None;
                }
                "--api" => {
                    let value = require_value(args, "--api")?;
                    api = Some(HttpBackendConfig::new(value.trim()));
                }
                "--questions" if cmd == Command::Play => {
                    let value = require_value(args, "--questions")?;
                    quiz.question_count = parse_number("--questions", value)?;
                }
                "--duration" if cmd == Command::Play => {
                    let value = require_value(args, "--duration")?;
                    quiz.question_duration_secs = parse_number("--duration", value)?;
                }
                "--username" if cmd == Command::Play => {
                    quiz.username = Some(require_value(args, "--username")?);
                }
                "--category" if cmd == Command::Play => {
                    quiz.category = Some(require_value(args, "--category")?);
                }
                "--difficulty" if cmd == Command::Play => {
                    let value = require_value(args, "--difficulty")?;
                    let parsed = value
                        .parse::<Difficulty>()
                        .map_err(|_| ArgsError::InvalidDifficulty { raw: value.clone() })?;
                    quiz.difficulty = Some(parsed);
                }
                "--limit" if cmd == Command::Leaderboard => {
                    let value = require_value(args, "--limit")?;
                    limit = parse_number("--limit", value)?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let source = match api {
            Some(config) if cmd != Command::Seed => Source::Http(config),
            _ => Source::Sqlite(db_url),
        };
        Ok(Self {
            source,
            quiz,
            limit,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz play        [--db <sqlite_url> | --api <base_url>] [options]");
    eprintln!("  quiz leaderboard [--db <sqlite_url> | --api <base_url>] [--limit <n>]");
    eprintln!("  quiz seed        [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Play options:");
    eprintln!("  --questions <n>       Number of questions, 1-50 (default: 10)");
    eprintln!("  --duration <secs>     Seconds per question (default: 30)");
    eprintln!("  --username <name>     Leaderboard name (default: Player<NNNN>)");
    eprintln!("  --category <name>     Only questions from this category");
    eprintln!("  --difficulty <level>  easy, medium or hard");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --limit {DEFAULT_LEADERBOARD_LIMIT}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_API_URL, QUIZ_QUESTIONS, QUIZ_DURATION,");
    eprintln!("  QUIZ_USERNAME, QUIZ_CATEGORY, QUIZ_DIFFICULTY, RUST_LOG");
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

async fn connect(source: &Source, clock: Clock) -> Result<AppServices, Box<dyn std::error::Error>> {
    match source {
        Source::Sqlite(db_url) => {
            log::info!("using local question bank at {db_url}");
            prepare_sqlite_file(db_url)?;
            Ok(AppServices::new_sqlite(db_url, clock).await?)
        }
        Source::Http(config) => {
            log::info!("using remote backend at {}", config.base_url);
            Ok(AppServices::new_http(config.clone(), clock))
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Playing is the default when no subcommand is given.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let quiz = QuizConfig::from_env()?;
    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter, quiz).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let clock = Clock::default_clock();
    match cmd {
        Command::Play => {
            let services = connect(&parsed.source, clock).await?;
            play::run_quiz(&services, parsed.quiz).await
        }
        Command::Leaderboard => {
            let services = connect(&parsed.source, clock).await?;
            let rows = services.leaderboard().top(parsed.limit).await?;
            play::print_leaderboard(&rows);
            Ok(())
        }
        Command::Seed => {
            let Source::Sqlite(db_url) = &parsed.source else {
                return Ok(());
            };
            prepare_sqlite_file(db_url)?;
            let storage = Storage::sqlite(db_url).await?;
            let written = replace_questions(storage.questions.as_ref(), &sample_questions()?).await?;
            log::info!("seeded {written} questions into {db_url}");
            println!("Seeded {written} questions into {db_url}");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
