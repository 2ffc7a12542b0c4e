mod args;
mod take;

use std::io;

use args::{Args, Command, prepare_sqlite_file, print_usage};
use log::info;
use services::api::{AttemptSummary, QuizApiConfig};
use services::{AppServices, Clock};
use take::{Prompt, run_take};

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1), std::env::var("QUIZ_DB_URL").ok())
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;
    if parsed.command == Command::Help {
        print_usage();
        return Ok(());
    }

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let api_config = QuizApiConfig::from_env()?;
    info!("using quiz api at {}", api_config.base_url);
    let app = AppServices::new_sqlite(&parsed.db_url, Clock::system(), api_config).await?;

    match parsed.command {
        Command::List => {
            for quiz in app.sessions().list_quizzes().await? {
                match quiz.description {
                    Some(description) => println!("{}\t{}\t{description}", quiz.quiz_id, quiz.title),
                    None => println!("{}\t{}", quiz.quiz_id, quiz.title),
                }
            }
        }
        Command::Take {
            quiz_id,
            attempt_id,
        } => {
            let stdin = io::stdin();
            let mut prompt = Prompt::new(stdin.lock(), io::stdout());
            run_take(&app.sessions(), &mut prompt, quiz_id, attempt_id).await?;
        }
        Command::Attempts { quiz_id } => {
            for attempt in app.sessions().list_attempts(quiz_id).await? {
                let started = attempt
                    .started_at
                    .map_or_else(|| "-".to_string(), |at| at.to_rfc3339());
                let passed = match attempt.passed {
                    Some(true) => "passed",
                    Some(false) => "not passed",
                    None => "",
                };
                println!(
                    "{}\t{}\t{started}\t{passed}",
                    attempt.attempt_id,
                    score_column(&attempt)
                );
            }
        }
        Command::History { limit, clear } => {
            let history = app.history();
            if clear {
                let removed = history.clear().await?;
                println!("removed {removed} entries");
            } else {
                for item in history.list(limit).await? {
                    println!(
                        "{}\t{}\t{}\t{}/{}",
                        item.completed_at.to_rfc3339(),
                        item.title,
                        item.attempt_id,
                        item.score,
                        item.max_score
                    );
                }
            }
        }
        Command::Help => print_usage(),
    }
    Ok(())
}

/// `score/max`, or `-` for an attempt the server has not graded.
fn score_column(attempt: &AttemptSummary) -> String {
    match (attempt.score, attempt.max_score) {
        (Some(score), Some(max)) => format!("{score}/{max}"),
        _ => "-".to_string(),
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
