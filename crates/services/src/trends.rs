use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use exam_core::model::{Domain, DomainScore, ExamKind, UserId};
use storage::repository::{AttemptRepository, AttemptRow, StorageError};

/// Number of attempts shown on the trends page.
pub const TREND_LIMIT: u32 = 20;

/// Presentation-agnostic line for one past attempt.
///
/// No pre-formatted strings; the caller formats timestamps and percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptListItem {
    pub id: i64,
    pub kind: ExamKind,
    pub completed_at: DateTime<Utc>,
    pub percentage: f64,
    pub correct: u32,
    pub total: u32,
    pub time_taken_secs: u64,
    pub weakest_domain: Option<Domain>,
}

impl AttemptListItem {
    #[must_use]
    pub fn from_row(row: &AttemptRow) -> Self {
        let attempt = &row.attempt;
        Self {
            id: row.id,
            kind: attempt.kind,
            completed_at: attempt.completed_at,
            percentage: attempt.result.percentage,
            correct: attempt.result.correct_count,
            total: attempt.result.total_scored,
            time_taken_secs: attempt.time_taken_secs,
            weakest_domain: attempt.result.weakest_domain().map(|(d, _)| d),
        }
    }
}

/// Roll-up over the recent attempts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrendSummary {
    pub attempts: usize,
    pub best_percentage: Option<f64>,
    pub average_percentage: Option<f64>,
    /// Domain totals summed over the recent full exams.
    pub per_domain: BTreeMap<Domain, DomainScore>,
}

impl TrendSummary {
    #[must_use]
    pub fn from_items(rows: &[AttemptRow]) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let percentages: Vec<f64> = rows.iter().map(|r| r.attempt.result.percentage).collect();
        let best = percentages.iter().copied().fold(f64::MIN, f64::max);
        #[allow(clippy::cast_precision_loss)]
        let average = percentages.iter().sum::<f64>() / percentages.len() as f64;

        let mut per_domain: BTreeMap<Domain, DomainScore> = BTreeMap::new();
        for row in rows.iter().filter(|r| r.attempt.kind == ExamKind::FullExam) {
            for (domain, score) in &row.attempt.result.per_domain {
                let total = per_domain.entry(*domain).or_default();
                total.correct = total.correct.saturating_add(score.correct);
                total.total = total.total.saturating_add(score.total);
            }
        }

        Self {
            attempts: rows.len(),
            best_percentage: Some(best),
            average_percentage: Some(average),
            per_domain,
        }
    }
}

/// Read-only facade over the attempt log for the trends view.
#[derive(Clone)]
pub struct TrendService {
    attempts: Arc<dyn AttemptRepository>,
}

impl TrendService {
    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { attempts }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(storage::repository::InMemoryRepository::new()))
    }

    /// The last [`TREND_LIMIT`] attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    pub async fn recent(&self, user_id: &UserId) -> Result<Vec<AttemptListItem>, StorageError> {
        let rows = self.attempts.load_recent_attempts(user_id, TREND_LIMIT).await?;
        Ok(rows.iter().map(AttemptListItem::from_row).collect())
    }

    /// Summary statistics over the last [`TREND_LIMIT`] attempts.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    pub async fn summary(&self, user_id: &UserId) -> Result<TrendSummary, StorageError> {
        let rows = self.attempts.load_recent_attempts(user_id, TREND_LIMIT).await?;
        Ok(TrendSummary::from_items(&rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use exam_core::model::{Attempt, ScoreResult};
    use exam_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn attempt(user: &UserId, kind: ExamKind, minutes: i64, correct: u32) -> Attempt {
        let per_domain = BTreeMap::from([(Domain::Agile, DomainScore { correct, total: 4 })]);
        Attempt::new(
            user.clone(),
            kind,
            ScoreResult {
                total_scored: 4,
                correct_count: correct,
                percentage: f64::from(correct) * 25.0,
                per_domain,
            },
            60,
            fixed_now() + Duration::minutes(minutes),
        )
    }

    #[tokio::test]
    async fn summary_reports_best_and_average() {
        let repo = InMemoryRepository::new();
        let user = UserId::new("ana").unwrap();
        repo.save_attempt(&attempt(&user, ExamKind::FullExam, 0, 1))
            .await
            .unwrap();
        repo.save_attempt(&attempt(&user, ExamKind::FullExam, 1, 3))
            .await
            .unwrap();
        repo.save_attempt(&attempt(&user, ExamKind::DomainPractice(Domain::Agile), 2, 4))
            .await
            .unwrap();

        let svc = TrendService::new(Arc::new(repo));
        let summary = svc.summary(&user).await.unwrap();
        assert_eq!(summary.attempts, 3);
        assert_eq!(summary.best_percentage, Some(100.0));
        assert_eq!(summary.average_percentage, Some(200.0 / 3.0));
        assert_eq!(
            summary.per_domain[&Domain::Agile],
            DomainScore { correct: 4, total: 8 }
        );

        let recent = svc.recent(&user).await.unwrap();
        assert_eq!(recent[0].kind, ExamKind::DomainPractice(Domain::Agile));
        assert_eq!(recent[0].weakest_domain, Some(Domain::Agile));
    }

    #[tokio::test]
    async fn empty_log_gives_empty_summary() {
        let svc = TrendService::in_memory();
        let summary = svc.summary(&UserId::new("nobody").unwrap()).await.unwrap();
        assert_eq!(summary, TrendSummary::default());
    }
}
