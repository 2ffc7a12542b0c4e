use std::fmt;
use std::str::FromStr;

use quiz_core::model::{AttemptId, QuizId};

const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";
const DEFAULT_HISTORY_LIMIT: u32 = 20;

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingQuizId,
    UnknownArg(String),
    UnknownCommand(String),
    InvalidQuizId { raw: String },
    InvalidAttemptId { raw: String },
    InvalidLimit { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingQuizId => write!(f, "--quiz-id is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid --quiz-id value: {raw}"),
            ArgsError::InvalidAttemptId { raw } => write!(f, "invalid --attempt-id value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Take {
        quiz_id: QuizId,
        attempt_id: Option<AttemptId>,
    },
    Attempts {
        quiz_id: QuizId,
    },
    History {
        limit: u32,
        clear: bool,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub db_url: String,
    pub command: Command,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app list                                   [--db <sqlite_url>]");
    eprintln!("  app take --quiz-id <id> [--attempt-id <id>] [--db <sqlite_url>]");
    eprintln!("  app attempts --quiz-id <id>                [--db <sqlite_url>]");
    eprintln!("  app history [--limit <n>] [--clear]        [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --limit {DEFAULT_HISTORY_LIMIT}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_API_BASE_URL, QUIZ_API_TOKEN, QUIZ_API_TIMEOUT_SECS, RUST_LOG");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    /// Parse everything after the program name. `env_db_url` is the value of
    /// `QUIZ_DB_URL`, if set.
    pub fn parse(
        argv: impl IntoIterator<Item = String>,
        env_db_url: Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter();
        let Some(name) = args.next() else {
            return Ok(Self::help(env_db_url));
        };
        if matches!(name.as_str(), "--help" | "-h" | "help") {
            return Ok(Self::help(env_db_url));
        }
        if !matches!(name.as_str(), "list" | "take" | "attempts" | "history") {
            return Err(ArgsError::UnknownCommand(name));
        }

        let mut db_url = env_db_url.map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut quiz_id = None;
        let mut attempt_id = None;
        let mut limit = DEFAULT_HISTORY_LIMIT;
        let mut clear = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--quiz-id" if matches!(name.as_str(), "take" | "attempts") => {
                    let value = require_value(&mut args, "--quiz-id")?;
                    let parsed = QuizId::from_str(&value)
                        .map_err(|_| ArgsError::InvalidQuizId { raw: value.clone() })?;
                    quiz_id = Some(parsed);
                }
                "--attempt-id" if name == "take" => {
                    let value = require_value(&mut args, "--attempt-id")?;
                    let parsed = AttemptId::from_str(&value)
                        .map_err(|_| ArgsError::InvalidAttemptId { raw: value.clone() })?;
                    attempt_id = Some(parsed);
                }
                "--limit" if name == "history" => {
                    let value = require_value(&mut args, "--limit")?;
                    limit = match value.trim().parse::<u32>() {
                        Ok(n) if n > 0 => n,
                        _ => return Err(ArgsError::InvalidLimit { raw: value }),
                    };
                }
                "--clear" if name == "history" => clear = true,
                "--help" | "-h" => return Ok(Self::help(Some(db_url))),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match name.as_str() {
            "list" => Command::List,
            "take" => Command::Take {
                quiz_id: quiz_id.ok_or(ArgsError::MissingQuizId)?,
                attempt_id,
            },
            "attempts" => Command::Attempts {
                quiz_id: quiz_id.ok_or(ArgsError::MissingQuizId)?,
            },
            _ => Command::History { limit, clear },
        };
        Ok(Self { db_url, command })
    }

    fn help(db_url: Option<String>) -> Self {
        Self {
            db_url: db_url.unwrap_or_else(|| DEFAULT_DB_URL.into()),
            command: Command::Help,
        }
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || is_sqlite_uri(&raw) {
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

fn is_sqlite_uri(raw: &str) -> bool {
    raw.starts_with("sqlite:file:")
}

/// Create the database file (and its parent directory) so `SQLite` can open it.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    // URI filenames are handed to SQLite untouched; they may not name a file at all.
    if db_url == "sqlite::memory:" || is_sqlite_uri(db_url) {
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
