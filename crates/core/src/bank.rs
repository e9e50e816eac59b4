use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

use crate::model::{Domain, Question, QuestionError, QuestionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BankError {
    #[error("no questions available for domain: {domain}")]
    InsufficientQuestions { domain: Domain },

    #[error("duplicate question id: {0}")]
    DuplicateId(QuestionId),

    #[error(transparent)]
    Question(#[from] QuestionError),

    #[error("invalid question bank: {0}")]
    Parse(String),
}

/// Immutable collection of validated questions, grouped by domain.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    by_domain: BTreeMap<Domain, Vec<Question>>,
    len: usize,
}

impl QuestionBank {
    /// Build a bank from already-validated questions.
    ///
    /// # Errors
    ///
    /// Returns `BankError::DuplicateId` if two questions share an id.
    pub fn new(questions: impl IntoIterator<Item = Question>) -> Result<Self, BankError> {
        let mut seen = HashSet::new();
        let mut by_domain: BTreeMap<Domain, Vec<Question>> = BTreeMap::new();
        let mut len = 0;
        for question in questions {
            if !seen.insert(question.id()) {
                return Err(BankError::DuplicateId(question.id()));
            }
            by_domain.entry(question.domain()).or_default().push(question);
            len += 1;
        }
        Ok(Self { by_domain, len })
    }

    /// Load a bank from a JSON array of question records.
    ///
    /// Each record is validated on the way in, so a malformed question fails
    /// the whole load.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Parse` for malformed JSON or invalid questions and
    /// `BankError::DuplicateId` for repeated ids.
    pub fn from_json(raw: &str) -> Result<Self, BankError> {
        let questions: Vec<Question> =
            serde_json::from_str(raw).map_err(|e| BankError::Parse(e.to_string()))?;
        Self::new(questions)
    }

    /// Serialize the bank back to a JSON array, in domain order.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Parse` if serialization fails.
    pub fn to_json(&self) -> Result<String, BankError> {
        let all: Vec<&Question> = self.iter().collect();
        serde_json::to_string_pretty(&all).map_err(|e| BankError::Parse(e.to_string()))
    }

    /// Questions for one domain, in load order.
    ///
    /// # Errors
    ///
    /// Returns `BankError::InsufficientQuestions` if the domain has none.
    pub fn questions_by_domain(&self, domain: Domain) -> Result<&[Question], BankError> {
        match self.by_domain.get(&domain) {
            Some(questions) if !questions.is_empty() => Ok(questions),
            _ => Err(BankError::InsufficientQuestions { domain }),
        }
    }

    /// Domains that have at least one question.
    #[must_use]
    pub fn all_domains(&self) -> BTreeSet<Domain> {
        self.by_domain
            .iter()
            .filter(|(_, qs)| !qs.is_empty())
            .map(|(d, _)| *d)
            .collect()
    }

    #[must_use]
    pub fn count(&self, domain: Domain) -> usize {
        self.by_domain.get(&domain).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.iter().find(|q| q.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.by_domain.values().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u64, domain: Domain) -> Question {
        Question::new(
            QuestionId::new(id),
            domain,
            format!("Q{id}"),
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            1,
            "",
        )
        .unwrap()
    }

    #[test]
    fn groups_questions_by_domain() {
        let bank = QuestionBank::new(vec![
            question(1, Domain::Agile),
            question(2, Domain::Agile),
            question(3, Domain::Predictive),
        ])
        .unwrap();

        assert_eq!(bank.len(), 3);
        assert_eq!(bank.questions_by_domain(Domain::Agile).unwrap().len(), 2);
        assert_eq!(
            bank.all_domains(),
            BTreeSet::from([Domain::Predictive, Domain::Agile])
        );
        assert_eq!(bank.get(QuestionId::new(3)).unwrap().domain(), Domain::Predictive);
    }

    #[test]
    fn empty_domain_is_insufficient() {
        let bank = QuestionBank::new(vec![question(1, Domain::Agile)]).unwrap();
        let err = bank.questions_by_domain(Domain::Fundamentals).unwrap_err();
        assert_eq!(
            err,
            BankError::InsufficientQuestions {
                domain: Domain::Fundamentals
            }
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = QuestionBank::new(vec![question(1, Domain::Agile), question(1, Domain::Predictive)])
            .unwrap_err();
        assert_eq!(err, BankError::DuplicateId(QuestionId::new(1)));
    }

    #[test]
    fn json_load_rejects_malformed_records() {
        let raw = r#"[
            {"id": 1, "domain": "agile", "prompt": "Q", "options": ["A", "B"], "correct_index": 0},
            {"id": 2, "domain": "agile", "prompt": "Q2", "options": ["A"], "correct_index": 0}
        ]"#;
        assert!(matches!(QuestionBank::from_json(raw), Err(BankError::Parse(_))));
    }

    #[test]
    fn json_round_trip_keeps_questions() {
        let bank = QuestionBank::new(vec![question(1, Domain::Agile), question(2, Domain::Predictive)])
            .unwrap();
        let reloaded = QuestionBank::from_json(&bank.to_json().unwrap()).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get(QuestionId::new(2)), bank.get(QuestionId::new(2)));
    }
}
