use comfy_table::{Cell, Table};
use tokio::sync::mpsc;

use exam_core::{SessionError, SessionPhase};
use exam_core::model::{AnswerOutcome, ReviewItem};
use exam_core::time::format_hms;
use services::{AttemptListItem, AttemptOutcome, RunnerEvent, SessionView, TrendSummary};

/// Letter shown next to option `index` (`a`, `b`, ...).
pub fn option_label(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .and_then(|i| i.checked_add(b'a'))
        .filter(u8::is_ascii_lowercase)
        .map_or('?', char::from)
}

/// Print runner events until the runner drops its sender.
pub async fn print_events(mut events: mpsc::UnboundedReceiver<RunnerEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            RunnerEvent::Updated(view) => print_view(&view),
            RunnerEvent::Rejected(err) => println!("! {}", describe_rejection(&err)),
            // the caller prints the outcome once the run returns
            RunnerEvent::Finished(_) | RunnerEvent::Saved { .. } => {}
        }
    }
}

/// Session errors carry 0-based indices; the terminal numbers questions from 1.
pub fn describe_rejection(err: &SessionError) -> String {
    match err {
        SessionError::InvalidOption {
            index,
            option,
            option_count,
        } => format!(
            "option {} does not exist for question {} (choose a-{})",
            option_label(*option),
            index + 1,
            option_label(option_count.saturating_sub(1))
        ),
        SessionError::BreakBoundaryViolation { index, checkpoint } => format!(
            "question {} came before the break after question {checkpoint} and is locked",
            index + 1
        ),
        SessionError::SectionLocked { index, checkpoint } => format!(
            "question {} opens after the break that follows question {checkpoint}",
            index + 1
        ),
        SessionError::IndexOutOfRange { index, len } => {
            format!("there is no question {} (exam has {len})", index + 1)
        }
        other => other.to_string(),
    }
}

pub fn print_view(view: &SessionView) {
    match view.phase {
        SessionPhase::OnBreak => {
            println!();
            println!(
                "Break time. {} left; press r to continue. Earlier questions are now locked.",
                format_hms(view.break_remaining_secs)
            );
            return;
        }
        SessionPhase::Finished | SessionPhase::NotStarted => return,
        SessionPhase::InProgress => {}
    }

    let Some(prompt) = &view.prompt else {
        return;
    };
    println!();
    println!(
        "[{}/{}] {}  answered {}/{}  flagged {}  time left {}",
        view.index + 1,
        view.total,
        if view.flagged { "*" } else { " " },
        view.progress.answered,
        view.progress.total,
        view.progress.flagged,
        format_hms(view.remaining_secs)
    );
    if let Some(domain) = view.domain {
        println!("{}", domain.label());
    }
    println!("{prompt}");
    for (i, option) in view.options.iter().enumerate() {
        let marker = if view.selected == Some(i) { ">" } else { " " };
        println!("{marker} {}) {option}", option_label(i));
    }
}

pub fn print_outcome(outcome: &AttemptOutcome) {
    let result = &outcome.result;
    println!();
    println!(
        "{} finished ({:?}) in {}",
        outcome.kind,
        outcome.finish_reason,
        format_hms(outcome.time_taken_secs)
    );
    println!(
        "Score: {:.1}% ({}/{})",
        result.percentage, result.correct_count, result.total_scored
    );

    let mut table = Table::new();
    table.set_header(vec!["Domain", "Correct", "Total", "Score"]);
    for (domain, score) in &result.per_domain {
        table.add_row(vec![
            Cell::new(domain.label()),
            Cell::new(score.correct),
            Cell::new(score.total),
            Cell::new(format!("{:.1}%", score.percentage())),
        ]);
    }
    println!("{table}");

    if let Some((domain, score)) = result.weakest_domain() {
        println!("Weakest domain: {} ({:.1}%)", domain.label(), score.percentage());
    }
    if outcome.attempt_id.is_none() {
        println!("(attempt could not be recorded; see log)");
    }
}

/// Missed and unanswered scored questions, with the correct answer and explanation.
pub fn print_review(items: &[ReviewItem]) {
    let missed: Vec<&ReviewItem> = items
        .iter()
        .filter(|item| !item.is_pretest && item.outcome != AnswerOutcome::Correct)
        .collect();
    if missed.is_empty() {
        println!("Nothing to review.");
        return;
    }

    println!();
    println!("Review ({} missed)", missed.len());
    for item in missed {
        let q = &item.question;
        println!();
        println!("{}. {}", item.index + 1, q.prompt());
        match item.selected {
            Some(choice) => println!(
                "   your answer: {}) {}",
                option_label(choice),
                q.options().get(choice).map_or("", String::as_str)
            ),
            None => println!("   not answered"),
        }
        println!(
            "   correct: {}) {}",
            option_label(q.correct_index()),
            q.correct_option()
        );
        if !q.explanation().is_empty() {
            println!("   {}", q.explanation());
        }
    }
}

pub fn print_trends(items: &[AttemptListItem], summary: &TrendSummary) {
    if items.is_empty() {
        println!("No attempts recorded yet.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Completed", "Kind", "Score", "Correct", "Time", "Weakest"]);
    for item in items {
        table.add_row(vec![
            Cell::new(item.id),
            Cell::new(item.completed_at.format("%Y-%m-%d %H:%M")),
            Cell::new(item.kind),
            Cell::new(format!("{:.1}%", item.percentage)),
            Cell::new(format!("{}/{}", item.correct, item.total)),
            Cell::new(format_hms(item.time_taken_secs)),
            Cell::new(item.weakest_domain.map_or("-", |d| d.key())),
        ]);
    }
    println!("{table}");

    if let (Some(best), Some(avg)) = (summary.best_percentage, summary.average_percentage) {
        println!(
            "{} attempts, best {best:.1}%, average {avg:.1}%",
            summary.attempts
        );
    }
    if !summary.per_domain.is_empty() {
        let mut domains = Table::new();
        domains.set_header(vec!["Domain (full exams)", "Correct", "Total", "Score"]);
        for (domain, score) in &summary.per_domain {
            domains.add_row(vec![
                Cell::new(domain.label()),
                Cell::new(score.correct),
                Cell::new(score.total),
                Cell::new(format!("{:.1}%", score.percentage())),
            ]);
        }
        println!("{domains}");
    }
}

pub fn print_help() {
    println!("  a-e / 1-9   select an option");
    println!("  enter / n   next question (commits the selection)");
    println!("  p           previous question");
    println!("  g N         go to question N");
    println!("  f [N]       flag or unflag the current question (or N)");
    println!("  x N         clear the answer to question N");
    println!("  r           end the break early");
    println!("  s           submit the exam");
    println!("  q           save and quit");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_labels_are_letters() {
        assert_eq!(option_label(0), 'a');
        assert_eq!(option_label(4), 'e');
        assert_eq!(option_label(25), 'z');
        assert_eq!(option_label(26), '?');
    }

    #[test]
    fn rejections_use_question_numbers() {
        let locked = SessionError::SectionLocked {
            index: 79,
            checkpoint: 75,
        };
        assert_eq!(
            describe_rejection(&locked),
            "question 80 opens after the break that follows question 75"
        );

        let past = SessionError::BreakBoundaryViolation {
            index: 74,
            checkpoint: 75,
        };
        assert_eq!(
            describe_rejection(&past),
            "question 75 came before the break after question 75 and is locked"
        );

        let missing = SessionError::IndexOutOfRange { index: 150, len: 150 };
        assert_eq!(
            describe_rejection(&missing),
            "there is no question 151 (exam has 150)"
        );
        assert_eq!(describe_rejection(&SessionError::Finished), "session already finished");
    }
}
