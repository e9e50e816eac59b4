use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::{Domain, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id}: prompt cannot be empty")]
    EmptyPrompt { id: QuestionId },

    #[error("question {id}: needs at least 2 options, got {len}")]
    TooFewOptions { id: QuestionId, len: usize },

    #[error("question {id}: option {index} is empty")]
    EmptyOption { id: QuestionId, index: usize },

    #[error("question {id}: duplicate option {option:?}")]
    DuplicateOption { id: QuestionId, option: String },

    #[error("question {id}: correct index {index} out of range for {len} options")]
    CorrectIndexOutOfRange {
        id: QuestionId,
        index: usize,
        len: usize,
    },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Minimum number of options a question may offer.
pub const MIN_OPTIONS: usize = 2;

/// A validated multiple-choice question.
///
/// Constructed once at bank-load time and never mutated. Deserialization runs
/// the same validation as [`Question::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord", into = "QuestionRecord")]
pub struct Question {
    id: QuestionId,
    domain: Domain,
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: String,
}

impl Question {
    /// Build a question, rejecting malformed records.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank, there are fewer than two
    /// options, an option is blank or repeated, or `correct_index` is out of range.
    pub fn new(
        id: QuestionId,
        domain: Domain,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        explanation: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt { id });
        }
        if options.len() < MIN_OPTIONS {
            return Err(QuestionError::TooFewOptions {
                id,
                len: options.len(),
            });
        }
        let mut seen = HashSet::with_capacity(options.len());
        for (index, option) in options.iter().enumerate() {
            if option.trim().is_empty() {
                return Err(QuestionError::EmptyOption { id, index });
            }
            if !seen.insert(option.as_str()) {
                return Err(QuestionError::DuplicateOption {
                    id,
                    option: option.clone(),
                });
            }
        }
        if correct_index >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                id,
                index: correct_index,
                len: options.len(),
            });
        }

        Ok(Self {
            id,
            domain,
            prompt,
            options,
            correct_index,
            explanation: explanation.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn domain(&self) -> Domain {
        self.domain
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_index
    }
}

/// Wire shape of a question as it appears in JSON banks and snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub domain: Domain,
    #[serde(alias = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(alias = "correct")]
    pub correct_index: usize,
    #[serde(default)]
    pub explanation: String,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = QuestionError;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        Question::new(
            record.id,
            record.domain,
            record.prompt,
            record.options,
            record.correct_index,
            record.explanation,
        )
    }
}

impl From<Question> for QuestionRecord {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            domain: q.domain,
            prompt: q.prompt,
            options: q.options,
            correct_index: q.correct_index,
            explanation: q.explanation,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn valid_question_builds() {
        let q = Question::new(
            QuestionId::new(1),
            Domain::Agile,
            "What is velocity?",
            opts(&["A", "B", "C", "D"]),
            2,
            "Work completed per sprint.",
        )
        .unwrap();
        assert_eq!(q.correct_option(), "C");
        assert!(q.is_correct(2));
        assert!(!q.is_correct(0));
    }

    #[test]
    fn rejects_out_of_range_correct_index() {
        let err = Question::new(
            QuestionId::new(1),
            Domain::Agile,
            "Q",
            opts(&["A", "B"]),
            2,
            "",
        )
        .unwrap_err();
        assert!(matches!(err, QuestionError::CorrectIndexOutOfRange { index: 2, len: 2, .. }));
    }

    #[test]
    fn rejects_single_option_and_duplicates() {
        let err = Question::new(QuestionId::new(1), Domain::Agile, "Q", opts(&["A"]), 0, "")
            .unwrap_err();
        assert!(matches!(err, QuestionError::TooFewOptions { len: 1, .. }));

        let err = Question::new(QuestionId::new(1), Domain::Agile, "Q", opts(&["A", "A"]), 0, "")
            .unwrap_err();
        assert!(matches!(err, QuestionError::DuplicateOption { .. }));
    }

    #[test]
    fn rejects_blank_prompt() {
        let err = Question::new(QuestionId::new(7), Domain::Agile, "  ", opts(&["A", "B"]), 0, "")
            .unwrap_err();
        assert_eq!(err, QuestionError::EmptyPrompt { id: QuestionId::new(7) });
    }

    #[test]
    fn deserialization_validates() {
        let good = r#"{"id":1,"domain":"agile","question":"Q?","options":["A","B"],"correct":1}"#;
        let q: Question = serde_json::from_str(good).unwrap();
        assert_eq!(q.correct_index(), 1);
        assert_eq!(q.explanation(), "");

        let bad = r#"{"id":1,"domain":"agile","prompt":"Q?","options":["A","B"],"correct_index":5}"#;
        assert!(serde_json::from_str::<Question>(bad).is_err());
    }
}
