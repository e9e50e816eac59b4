use exam_core::model::{Attempt, Domain, DomainScore, ExamKind, ScoreResult, UserId};
use sqlx::Row;
use std::collections::BTreeMap;

use crate::repository::{AttemptRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn i64_from_u64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

/// Per-domain scores are stored as a JSON object keyed by domain key.
pub(crate) fn domain_scores_to_json(
    scores: &BTreeMap<Domain, DomainScore>,
) -> Result<String, StorageError> {
    serde_json::to_string(scores).map_err(ser)
}

pub(crate) fn domain_scores_from_json(
    raw: &str,
) -> Result<BTreeMap<Domain, DomainScore>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let user_id = UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?).map_err(ser)?;
    let kind: ExamKind = row
        .try_get::<String, _>("exam_kind")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    let correct_count = u32_from_i64(
        "correct_count",
        row.try_get::<i64, _>("correct_count").map_err(ser)?,
    )?;
    let total_scored = u32_from_i64(
        "total_scored",
        row.try_get::<i64, _>("total_scored").map_err(ser)?,
    )?;
    let per_domain =
        domain_scores_from_json(&row.try_get::<String, _>("domain_scores").map_err(ser)?)?;

    let result = ScoreResult {
        total_scored,
        correct_count,
        percentage: row.try_get("percentage").map_err(ser)?,
        per_domain,
    };

    let time_taken_secs = u64_from_i64(
        "time_taken_secs",
        row.try_get::<i64, _>("time_taken_secs").map_err(ser)?,
    )?;

    Ok(AttemptRow::new(
        id,
        Attempt::new(
            user_id,
            kind,
            result,
            time_taken_secs,
            row.try_get("completed_at").map_err(ser)?,
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_scores_use_domain_keys() {
        let scores = BTreeMap::from([(
            Domain::BusinessAnalysis,
            DomainScore {
                correct: 3,
                total: 4,
            },
        )]);
        let json = domain_scores_to_json(&scores).unwrap();
        assert_eq!(json, r#"{"business-analysis":{"correct":3,"total":4}}"#);
        assert_eq!(domain_scores_from_json(&json).unwrap(), scores);
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(u32_from_i64("correct_count", -1).is_err());
        assert!(u64_from_i64("time_taken_secs", -5).is_err());
    }
}
