use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use studygap_core::model::{
    AnswerOption, QuestionId, QuestionResponse, QuizQuestion, QuizSnapshot, ResponsePatch,
};
use storage::SessionStore;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    questions: u32,
    answered: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidQuestions { raw: String },
    InvalidAnswered { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidQuestions { raw } => write!(f, "invalid --questions value: {raw}"),
            ArgsError::InvalidAnswered { raw } => write!(f, "invalid --answered value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("STUDYGAP_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut questions = std::env::var("STUDYGAP_SEED_QUESTIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(15);
        let mut answered = std::env::var("STUDYGAP_SEED_ANSWERED")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(5);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--questions" => {
                    let value = require_value(&mut args, "--questions")?;
                    questions = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidQuestions { raw: value.clone() })?;
                }
                "--answered" => {
                    let value = require_value(&mut args, "--answered")?;
                    answered = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidAnswered { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            questions,
            answered,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>    SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --questions <n>      Number of sample questions (default: 15)");
    eprintln!("  --answered <n>       Questions to mark as answered (default: 5)");
    eprintln!("  --now <rfc3339>      Fixed current time for deterministic seeding");
    eprintln!("  -h, --help           Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  STUDYGAP_DB_URL, STUDYGAP_SEED_QUESTIONS, STUDYGAP_SEED_ANSWERED");
}

fn sample_question(index: u32) -> QuizQuestion {
    let topics = ["Algebra", "Geometry", "Trigonometry", "Statistics"];
    QuizQuestion {
        id: QuestionId::new(format!("q{}", index + 1)),
        topic: topics[(index as usize) % topics.len()].to_owned(),
        question_text: format!("Sample question {}", index + 1),
        option_a: "Option A".into(),
        option_b: "Option B".into(),
        option_c: "Option C".into(),
        option_d: "Option D".into(),
        correct_answer: AnswerOption::B,
        difficulty: "medium".into(),
        subtopic: None,
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let store = SessionStore::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let questions: Vec<QuizQuestion> = (0..args.questions).map(sample_question).collect();

    let mut responses = HashMap::new();
    let mut time_spent = HashMap::new();
    for (index, question) in questions
        .iter()
        .enumerate()
        .take(args.answered.min(args.questions) as usize)
    {
        let mut response = QuestionResponse::seeded(index as u32 + 1, question);
        ResponsePatch::answer(AnswerOption::B, question.correct_answer).apply(&mut response);
        response.time_spent_seconds = 20;
        responses.insert(question.id.clone(), response);
        time_spent.insert(question.id.clone(), 20);
    }

    let answered = args.answered.min(args.questions);
    let snapshot = QuizSnapshot {
        current_index: answered.saturating_sub(1) as usize,
        questions,
        responses,
        time_spent,
        started_at: now,
        created_at: now,
    };
    store.save_quiz(&snapshot).await?;

    println!(
        "Seeded a guest quiz with {} questions ({} answered) into {}",
        args.questions, answered, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
