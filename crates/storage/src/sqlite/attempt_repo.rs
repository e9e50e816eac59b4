use exam_core::model::{Attempt, UserId};

use super::SqliteRepository;
use super::mapping::{domain_scores_to_json, i64_from_u64, map_attempt_row};
use crate::repository::{AttemptRepository, AttemptRow, StorageError};

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn save_attempt(&self, attempt: &Attempt) -> Result<i64, StorageError> {
        let domain_scores = domain_scores_to_json(&attempt.result.per_domain)?;

        let res = sqlx::query(
            r"
                INSERT INTO exam_attempts (
                    user_id, exam_kind, percentage, correct_count, total_scored,
                    domain_scores, time_taken_secs, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(attempt.user_id.as_str())
        .bind(attempt.kind.to_string())
        .bind(attempt.result.percentage)
        .bind(i64::from(attempt.result.correct_count))
        .bind(i64::from(attempt.result.total_scored))
        .bind(domain_scores)
        .bind(i64_from_u64("time_taken_secs", attempt.time_taken_secs)?)
        .bind(attempt.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn load_recent_attempts(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, user_id, exam_kind, percentage, correct_count, total_scored,
                    domain_scores, time_taken_secs, completed_at
                FROM exam_attempts
                WHERE user_id = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(user_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }
        Ok(out)
    }
}
