use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Domain, Question};

/// Correct/total counts for one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomainScore {
    pub correct: u32,
    pub total: u32,
}

impl DomainScore {
    /// Share of correct answers in `[0, 100]`; `0` when nothing was scored.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        percentage_of(self.correct, self.total)
    }
}

/// Final result of a scored attempt. Pretest items appear in no count.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total_scored: u32,
    pub correct_count: u32,
    pub percentage: f64,
    pub per_domain: BTreeMap<Domain, DomainScore>,
}

impl ScoreResult {
    /// Domain with the lowest percentage, ties resolved by domain order.
    #[must_use]
    pub fn weakest_domain(&self) -> Option<(Domain, DomainScore)> {
        self.per_domain
            .iter()
            .filter(|(_, score)| score.total > 0)
            .min_by(|(da, a), (db, b)| {
                a.percentage()
                    .total_cmp(&b.percentage())
                    .then_with(|| da.cmp(db))
            })
            .map(|(domain, score)| (*domain, *score))
    }
}

/// How a single question was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    Unanswered,
}

/// Per-question line of a post-exam review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub index: usize,
    pub question: Question,
    pub is_pretest: bool,
    pub selected: Option<usize>,
    pub outcome: AnswerOutcome,
    pub flagged: bool,
}

pub(crate) fn percentage_of(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (100.0 * f64::from(correct) / f64::from(total)).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_domain_score_is_zero_percent() {
        assert_eq!(DomainScore::default().percentage(), 0.0);
        let s = DomainScore { correct: 3, total: 4 };
        assert_eq!(s.percentage(), 75.0);
    }

    #[test]
    fn weakest_domain_skips_empty_rows() {
        let mut per_domain = BTreeMap::new();
        per_domain.insert(Domain::Fundamentals, DomainScore { correct: 9, total: 10 });
        per_domain.insert(Domain::Agile, DomainScore { correct: 2, total: 10 });
        per_domain.insert(Domain::Predictive, DomainScore { correct: 0, total: 0 });
        let result = ScoreResult {
            total_scored: 20,
            correct_count: 11,
            percentage: 55.0,
            per_domain,
        };
        let (domain, score) = result.weakest_domain().unwrap();
        assert_eq!(domain, Domain::Agile);
        assert_eq!(score.correct, 2);
    }
}
