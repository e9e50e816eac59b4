use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use exam_core::ExamSession;
use exam_core::model::{ExamKind, UserId};
use services::{ExamRunner, ExamService, RunOutcome, SessionCommand, spawn_ticker};

use crate::render;

const COMMAND_BUFFER: usize = 64;

/// Run one session against the terminal until it is finished or saved.
pub async fn drive(
    service: Arc<ExamService>,
    user_id: UserId,
    kind: ExamKind,
    session: ExamSession,
    review: bool,
) -> anyhow::Result<()> {
    let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    render::print_help();
    let printer = tokio::spawn(render::print_events(events_rx));
    let ticker = spawn_ticker(commands.clone(), Duration::from_secs(1));
    spawn_stdin_reader(commands);

    let runner = ExamRunner::new(service, user_id.clone(), kind, session).with_events(events_tx);
    let outcome = runner.run(rx).await?;
    ticker.abort();
    printer.await?;

    match outcome {
        RunOutcome::Finished(outcome) => {
            render::print_outcome(&outcome);
            if review {
                render::print_review(&outcome.review);
            }
        }
        RunOutcome::Saved { persisted: true } => {
            println!("Progress saved. Continue with: exam-sim resume --user {user_id}");
        }
        RunOutcome::Saved { persisted: false } => match kind {
            ExamKind::FullExam => println!("Progress could not be saved; see log."),
            ExamKind::DomainPractice(_) => println!("Practice ended without a score."),
        },
    }
    Ok(())
}

// Tokio's stdin reads on a blocking thread that would keep the runtime from
// shutting down, so lines are read on a plain thread instead.
fn spawn_stdin_reader(commands: mpsc::Sender<SessionCommand>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_input(&line) {
                Ok(Some(command)) => {
                    if commands.blocking_send(command).is_err() {
                        return;
                    }
                }
                Ok(None) => render::print_help(),
                Err(msg) => println!("! {msg}"),
            }
        }
        debug!("stdin closed");
        let _ = commands.blocking_send(SessionCommand::SaveAndQuit);
    });
}

/// Translate one input line. `Ok(None)` asks for help.
///
/// Question numbers typed by the user are 1-based.
pub fn parse_input(line: &str) -> Result<Option<SessionCommand>, String> {
    let line = line.trim().to_ascii_lowercase();
    let mut parts = line.split_whitespace();
    let head = parts.next().unwrap_or("");
    let arg = parts.next();
    if parts.next().is_some() {
        return Err(format!("unexpected input: {line}"));
    }

    let command = match (head, arg) {
        ("" | "n", None) => SessionCommand::Next,
        ("p", None) => SessionCommand::Previous,
        ("r", None) => SessionCommand::ResumeFromBreak,
        ("s", None) => SessionCommand::Submit,
        ("q", None) => SessionCommand::SaveAndQuit,
        ("?" | "h" | "help", None) => return Ok(None),
        ("f", None) => SessionCommand::ToggleCurrentFlag,
        ("f", Some(n)) => SessionCommand::ToggleFlag(question_number(n)?),
        ("g", Some(n)) => SessionCommand::GoTo(question_number(n)?),
        ("x", Some(n)) => SessionCommand::ClearAnswer(question_number(n)?),
        (choice, None) => SessionCommand::Select(option_index(choice)?),
        _ => return Err(format!("unknown command: {line} (type ? for help)")),
    };
    Ok(Some(command))
}

fn question_number(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("not a question number: {raw}")),
    }
}

fn option_index(raw: &str) -> Result<usize, String> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c @ 'a'..='e'), None) => Ok(c as usize - 'a' as usize),
        (Some(c @ '1'..='9'), None) => Ok(c as usize - '1' as usize),
        _ => Err(format!("unknown command: {raw} (type ? for help)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_and_lifecycle_keys() {
        assert_eq!(parse_input(""), Ok(Some(SessionCommand::Next)));
        assert_eq!(parse_input(" N "), Ok(Some(SessionCommand::Next)));
        assert_eq!(parse_input("p"), Ok(Some(SessionCommand::Previous)));
        assert_eq!(parse_input("g 75"), Ok(Some(SessionCommand::GoTo(74))));
        assert_eq!(parse_input("r"), Ok(Some(SessionCommand::ResumeFromBreak)));
        assert_eq!(parse_input("s"), Ok(Some(SessionCommand::Submit)));
        assert_eq!(parse_input("q"), Ok(Some(SessionCommand::SaveAndQuit)));
        assert_eq!(parse_input("?"), Ok(None));
    }

    #[test]
    fn options_accept_letters_and_digits() {
        assert_eq!(parse_input("a"), Ok(Some(SessionCommand::Select(0))));
        assert_eq!(parse_input("D"), Ok(Some(SessionCommand::Select(3))));
        assert_eq!(parse_input("2"), Ok(Some(SessionCommand::Select(1))));
        assert!(parse_input("z").is_err());
        assert!(parse_input("0").is_err());
    }

    #[test]
    fn flags_and_clears_use_one_based_numbers() {
        assert_eq!(parse_input("f"), Ok(Some(SessionCommand::ToggleCurrentFlag)));
        assert_eq!(parse_input("f 3"), Ok(Some(SessionCommand::ToggleFlag(2))));
        assert_eq!(parse_input("x 1"), Ok(Some(SessionCommand::ClearAnswer(0))));
        assert!(parse_input("x 0").is_err());
        assert!(parse_input("g").is_err());
        assert!(parse_input("g 1 2").is_err());
    }
}
