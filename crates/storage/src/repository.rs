use async_trait::async_trait;
use exam_core::SessionSnapshot;
use exam_core::model::{Attempt, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A stored attempt together with its row id.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRow {
    pub id: i64,
    pub attempt: Attempt,
}

impl AttemptRow {
    #[must_use]
    pub fn new(id: i64, attempt: Attempt) -> Self {
        Self { id, attempt }
    }
}

/// Append-only log of scored attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append a scored attempt and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn save_attempt(&self, attempt: &Attempt) -> Result<i64, StorageError>;

    /// Most recent attempts for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempts cannot be loaded or decoded.
    async fn load_recent_attempts(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError>;
}

/// One saved in-progress exam per user.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Save a snapshot, replacing any previous save for the user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save_progress(
        &self,
        user_id: &UserId,
        snapshot: &SessionSnapshot,
    ) -> Result<(), StorageError>;

    /// Load the saved snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the save exists but cannot be read.
    async fn load_progress(&self, user_id: &UserId)
    -> Result<Option<SessionSnapshot>, StorageError>;

    /// Remove the saved snapshot. Clearing a missing save is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn clear_progress(&self, user_id: &UserId) -> Result<(), StorageError>;
}

/// Process-local storage for tests and throwaway runs.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    attempts: Arc<Mutex<Vec<AttemptRow>>>,
    progress: Arc<Mutex<HashMap<UserId, SessionSnapshot>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn save_attempt(&self, attempt: &Attempt) -> Result<i64, StorageError> {
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("attempt id overflow".into()))?
            + 1;
        guard.push(AttemptRow::new(id, attempt.clone()));
        Ok(id)
    }

    async fn load_recent_attempts(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<AttemptRow> = guard
            .iter()
            .filter(|row| &row.attempt.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.attempt
                .completed_at
                .cmp(&a.attempt.completed_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn save_progress(
        &self,
        user_id: &UserId,
        snapshot: &SessionSnapshot,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(user_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load_progress(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SessionSnapshot>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(user_id).cloned())
    }

    async fn clear_progress(&self, user_id: &UserId) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(user_id);
        Ok(())
    }
}

/// Both repositories behind trait objects, as handed to the services.
#[derive(Clone)]
pub struct Storage {
    pub attempts: Arc<dyn AttemptRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self { attempts, progress }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use exam_core::model::{ExamInstance, ExamKind, ScoreResult};
    use exam_core::time::fixed_now;
    use exam_core::{ExamSession, SessionTiming};

    fn attempt(user: &str, minutes_later: i64, percentage: f64) -> Attempt {
        Attempt::new(
            UserId::new(user).unwrap(),
            ExamKind::FullExam,
            ScoreResult {
                percentage,
                ..ScoreResult::default()
            },
            600,
            fixed_now() + Duration::minutes(minutes_later),
        )
    }

    #[tokio::test]
    async fn recent_attempts_are_newest_first_and_per_user() {
        let repo = InMemoryRepository::new();
        repo.save_attempt(&attempt("ana", 0, 50.0)).await.unwrap();
        repo.save_attempt(&attempt("bob", 1, 90.0)).await.unwrap();
        repo.save_attempt(&attempt("ana", 2, 70.0)).await.unwrap();
        repo.save_attempt(&attempt("ana", 3, 80.0)).await.unwrap();

        let rows = repo
            .load_recent_attempts(&UserId::new("ana").unwrap(), 2)
            .await
            .unwrap();
        let scores: Vec<f64> = rows.iter().map(|r| r.attempt.result.percentage).collect();
        assert_eq!(scores, vec![80.0, 70.0]);
    }

    #[tokio::test]
    async fn progress_save_replaces_previous() {
        let repo = InMemoryRepository::new();
        let user = UserId::new("ana").unwrap();
        let mut session = ExamSession::started(
            ExamInstance::empty(),
            SessionTiming::without_break(60),
            fixed_now(),
        );

        repo.save_progress(&user, &session.snapshot()).await.unwrap();
        session.tick(10);
        repo.save_progress(&user, &session.snapshot()).await.unwrap();

        let loaded = repo.load_progress(&user).await.unwrap().unwrap();
        assert_eq!(loaded.elapsed_secs, 10);

        repo.clear_progress(&user).await.unwrap();
        assert!(repo.load_progress(&user).await.unwrap().is_none());
        repo.clear_progress(&user).await.unwrap();
    }
}
