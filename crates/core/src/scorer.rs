//! Pure scoring over an exam and its recorded answers.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{AnswerOutcome, DomainScore, ExamInstance, ReviewItem, ScoreResult, percentage_of};

/// Score the answers given for `exam`.
///
/// Pretest items are skipped entirely. Unanswered scored items count toward
/// the totals but never as correct. Answers keyed by an index outside the
/// exam are ignored.
#[must_use]
pub fn score(exam: &ExamInstance, answers: &BTreeMap<usize, usize>) -> ScoreResult {
    let mut per_domain: BTreeMap<_, DomainScore> = BTreeMap::new();
    let mut total_scored = 0_u32;
    let mut correct_count = 0_u32;

    for (index, item) in exam.items().iter().enumerate() {
        if item.is_pretest {
            continue;
        }
        let row = per_domain.entry(item.question.domain()).or_default();
        row.total = row.total.saturating_add(1);
        total_scored = total_scored.saturating_add(1);

        let correct = answers
            .get(&index)
            .is_some_and(|&option| item.question.is_correct(option));
        if correct {
            row.correct = row.correct.saturating_add(1);
            correct_count = correct_count.saturating_add(1);
        }
    }

    ScoreResult {
        total_scored,
        correct_count,
        percentage: percentage_of(correct_count, total_scored),
        per_domain,
    }
}

/// One review line per exam position, pretest items included.
#[must_use]
pub fn review(
    exam: &ExamInstance,
    answers: &BTreeMap<usize, usize>,
    flagged: &BTreeSet<usize>,
) -> Vec<ReviewItem> {
    exam.items()
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let selected = answers.get(&index).copied();
            let outcome = match selected {
                None => AnswerOutcome::Unanswered,
                Some(option) if item.question.is_correct(option) => AnswerOutcome::Correct,
                Some(_) => AnswerOutcome::Incorrect,
            };
            ReviewItem {
                index,
                question: item.question.clone(),
                is_pretest: item.is_pretest,
                selected,
                outcome,
                flagged: flagged.contains(&index),
            }
        })
        .collect()
}
