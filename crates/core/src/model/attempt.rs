use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{Domain, ScoreResult, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid exam kind: {0}")]
pub struct ExamKindParseError(pub String);

/// What kind of exam an attempt was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "domain", rename_all = "snake_case")]
pub enum ExamKind {
    FullExam,
    DomainPractice(Domain),
}

impl fmt::Display for ExamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamKind::FullExam => f.write_str("full"),
            ExamKind::DomainPractice(domain) => write!(f, "practice:{}", domain.key()),
        }
    }
}

impl FromStr for ExamKind {
    type Err = ExamKindParseError;

    /// Parses the storage form produced by `Display` (`full`, `practice:<domain>`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "full" {
            return Ok(ExamKind::FullExam);
        }
        s.strip_prefix("practice:")
            .and_then(|key| key.parse::<Domain>().ok())
            .map(ExamKind::DomainPractice)
            .ok_or_else(|| ExamKindParseError(s.to_owned()))
    }
}

/// A completed, scored attempt as kept in the attempt log.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub user_id: UserId,
    pub kind: ExamKind,
    pub result: ScoreResult,
    pub time_taken_secs: u64,
    pub completed_at: DateTime<Utc>,
}

impl Attempt {
    #[must_use]
    pub fn new(
        user_id: UserId,
        kind: ExamKind,
        result: ScoreResult,
        time_taken_secs: u64,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            kind,
            result,
            time_taken_secs,
            completed_at,
        }
    }
}
