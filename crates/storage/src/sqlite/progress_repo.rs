use chrono::Utc;
use exam_core::SessionSnapshot;
use exam_core::model::UserId;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::ser;
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn save_progress(
        &self,
        user_id: &UserId,
        snapshot: &SessionSnapshot,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(snapshot).map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO saved_exams (user_id, snapshot, saved_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(user_id) DO UPDATE SET
                    snapshot = excluded.snapshot,
                    saved_at = excluded.saved_at
            ",
        )
        .bind(user_id.as_str())
        .bind(json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn load_progress(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SessionSnapshot>, StorageError> {
        let row = sqlx::query("SELECT snapshot FROM saved_exams WHERE user_id = ?1")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("snapshot").map_err(ser)?;
        serde_json::from_str(&raw).map(Some).map_err(ser)
    }

    async fn clear_progress(&self, user_id: &UserId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM saved_exams WHERE user_id = ?1")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}
