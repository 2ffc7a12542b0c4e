use std::io::{self, BufRead, Write};

use log::warn;
use quiz_core::model::{Answer, AttemptId, Question, QuestionKind, QuizId};
use services::{QuizAttemptSession, QuizSessionService, SubmitError, SubmitOutcome};

type BoxError = Box<dyn std::error::Error>;

/// Line-oriented prompt over any reader/writer pair.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, text: &str) -> Result<String, BoxError> {
        write!(self.output, "{text}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed").into());
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn confirm(&mut self, text: &str) -> Result<bool, BoxError> {
        let reply = self.ask(&format!("{text} [y/N] "))?;
        Ok(matches!(reply.trim(), "y" | "Y" | "yes"))
    }
}

/// Turn a typed reply into an answer for `question`.
///
/// Choices are numbered from 1 on screen.
pub fn parse_answer(question: &Question, raw: &str) -> Result<Answer, String> {
    match question.kind() {
        QuestionKind::MultipleChoice { choices } => {
            let n: usize = raw
                .trim()
                .parse()
                .map_err(|_| format!("enter a number between 1 and {}", choices.len()))?;
            if n == 0 || n > choices.len() {
                return Err(format!("enter a number between 1 and {}", choices.len()));
            }
            Ok(Answer::multiple_choice(n - 1))
        }
        QuestionKind::OpenEnded => {
            if raw.trim().is_empty() {
                Err("an answer is required".to_string())
            } else {
                Ok(Answer::open_ended(raw.trim()))
            }
        }
    }
}

/// Run attempts interactively until the user stops restarting.
pub async fn run_take<R: BufRead, W: Write>(
    sessions: &QuizSessionService,
    prompt: &mut Prompt<R, W>,
    quiz_id: QuizId,
    attempt_id: Option<AttemptId>,
) -> Result<(), BoxError> {
    let mut session = sessions.load(quiz_id, attempt_id).await?;
    loop {
        collect_answers(&session, prompt)?;
        let Some(outcome) = submit_with_retry(sessions, &session, prompt).await? else {
            return Ok(());
        };
        print_result(&session, &outcome, &mut prompt.output)?;
        if outcome.history_id.is_none() {
            if let Err(err) = sessions.finalize_history(&session).await {
                warn!("attempt {} was not saved to history: {err}", session.attempt_id());
            }
        }

        if !prompt.confirm("Try again?")? {
            return Ok(());
        }
        let ticket = sessions.restart(&session).await?;
        session.dispose();
        session = sessions.resume(ticket).await?;
    }
}

fn collect_answers<R: BufRead, W: Write>(
    session: &QuizAttemptSession,
    prompt: &mut Prompt<R, W>,
) -> Result<(), BoxError> {
    let quiz = session.shared_quiz();
    writeln!(prompt.output, "\n{}", quiz.title())?;
    if let Some(description) = quiz.description() {
        writeln!(prompt.output, "{description}")?;
    }

    for (position, question) in quiz.questions().iter().enumerate() {
        writeln!(prompt.output, "\n{}. {}", position + 1, question.text())?;
        for (i, choice) in question.choices().iter().enumerate() {
            writeln!(prompt.output, "   {}) {choice}", i + 1)?;
        }
        loop {
            let raw = prompt.ask("> ")?;
            let answer = match parse_answer(question, &raw) {
                Ok(answer) => answer,
                Err(hint) => {
                    writeln!(prompt.output, "{hint}")?;
                    continue;
                }
            };
            session.set_answer(question.id(), answer)?;
            break;
        }
    }
    Ok(())
}

async fn submit_with_retry<R: BufRead, W: Write>(
    sessions: &QuizSessionService,
    session: &QuizAttemptSession,
    prompt: &mut Prompt<R, W>,
) -> Result<Option<SubmitOutcome>, BoxError> {
    loop {
        writeln!(prompt.output, "\nSubmitting...")?;
        match sessions.submit(session).await {
            Ok(outcome) => return Ok(Some(outcome)),
            // Both leave the attempt in progress, so the same answers can be resent.
            Err(err @ (SubmitError::Api(_) | SubmitError::InvalidResult(_))) => {
                writeln!(prompt.output, "Submission failed: {err}")?;
                if !prompt.confirm("Retry?")? {
                    return Ok(None);
                }
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn print_result(
    session: &QuizAttemptSession,
    outcome: &SubmitOutcome,
    out: &mut impl Write,
) -> io::Result<()> {
    let result = &outcome.result;
    writeln!(
        out,
        "\nScore: {}/{} ({} of {} correct)",
        result.total_score(),
        result.max_score(),
        result.correct_count(),
        result.details().len()
    )?;
    match result.passed() {
        Some(true) => writeln!(out, "Passed")?,
        Some(false) => writeln!(out, "Not passed")?,
        None => {}
    }
    for question in session.quiz().questions() {
        let Some(detail) = session.detail_for(question.id()) else {
            continue;
        };
        let mark = if detail.correct { "correct" } else { "wrong" };
        write!(out, "- {}: {mark}", question.text())?;
        match &detail.correct_answer {
            Some(expected) if !detail.correct => writeln!(out, " (expected: {expected})")?,
            _ => writeln!(out)?,
        }
    }
    Ok(())
}
