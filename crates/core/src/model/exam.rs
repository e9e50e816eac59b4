use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Domain, Question};

/// One position in an assembled exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamItem {
    pub question: Question,
    /// Shown like any other question but excluded from scoring.
    pub is_pretest: bool,
}

/// Non-fatal conditions recorded while assembling an exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssemblyWarning {
    /// The domain had fewer unique questions than requested and was sampled
    /// with replacement, so duplicates may appear.
    InsufficientQuestions {
        domain: Domain,
        available: usize,
        requested: usize,
    },
}

/// An ordered, immutable exam produced by the assembler.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExamInstance {
    items: Vec<ExamItem>,
    #[serde(default)]
    warnings: Vec<AssemblyWarning>,
}

impl ExamInstance {
    #[must_use]
    pub fn new(items: Vec<ExamItem>, warnings: Vec<AssemblyWarning>) -> Self {
        Self { items, warnings }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn items(&self) -> &[ExamItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ExamItem> {
        self.items.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn warnings(&self) -> &[AssemblyWarning] {
        &self.warnings
    }

    /// True when any domain had to be sampled with replacement.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    #[must_use]
    pub fn pretest_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_pretest).count()
    }

    #[must_use]
    pub fn scored_count(&self) -> usize {
        self.len() - self.pretest_count()
    }

    /// Number of items per domain, pretest included.
    #[must_use]
    pub fn domain_counts(&self) -> BTreeMap<Domain, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            *counts.entry(item.question.domain()).or_insert(0) += 1;
        }
        counts
    }
}
