use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::Domain;
use crate::session::SessionTiming;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Configuration problems that must abort exam creation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("domain targets sum to {sum}, expected {total}")]
    TargetSumMismatch { sum: u64, total: u64 },

    #[error("pretest count {pretest} exceeds total question count {total}")]
    PretestExceedsTotal { pretest: u64, total: u64 },

    #[error("break checkpoint {break_after} is beyond the last question ({total})")]
    BreakBeyondTotal { break_after: u64, total: u64 },

    #[error("time budget must be > 0")]
    ZeroTimeBudget,

    #[error("domain percentages sum to {sum}, expected 100")]
    PercentagesDoNotSumTo100 { sum: u32 },

    #[error("assembled {actual} questions, expected {expected}")]
    LengthMismatch { actual: usize, expected: usize },

    #[error("invalid config file: {0}")]
    Parse(String),
}

//
// ─── DOMAIN WEIGHTS ────────────────────────────────────────────────────────────
//

/// Target question count per domain for a full exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainWeights(BTreeMap<Domain, u32>);

impl DomainWeights {
    #[must_use]
    pub fn from_counts(counts: impl IntoIterator<Item = (Domain, u32)>) -> Self {
        Self(counts.into_iter().collect())
    }

    /// Apportion `total` questions from integer percentages.
    ///
    /// Uses largest-remainder rounding; equal remainders go to the domain that
    /// comes first in [`Domain::ALL`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::PercentagesDoNotSumTo100` if the percentages do not add up.
    pub fn from_percentages(
        percentages: impl IntoIterator<Item = (Domain, u32)>,
        total: u32,
    ) -> Result<Self, ConfigError> {
        let percentages: BTreeMap<Domain, u32> = percentages.into_iter().collect();
        let sum: u32 = percentages.values().sum();
        if sum != 100 {
            return Err(ConfigError::PercentagesDoNotSumTo100 { sum });
        }

        let mut counts = BTreeMap::new();
        let mut remainders = Vec::with_capacity(percentages.len());
        for (&domain, &pct) in &percentages {
            let quota = u64::from(pct) * u64::from(total);
            // quota / 100 <= total, so the narrowing cannot truncate
            counts.insert(domain, u32::try_from(quota / 100).unwrap_or(u32::MAX));
            remainders.push((domain, quota % 100));
        }

        let assigned: u32 = counts.values().sum();
        let leftover = total.saturating_sub(assigned) as usize;
        remainders.sort_by(|(da, ra), (db, rb)| rb.cmp(ra).then_with(|| da.cmp(db)));
        for (domain, _) in remainders.into_iter().take(leftover) {
            if let Some(count) = counts.get_mut(&domain) {
                *count += 1;
            }
        }

        Ok(Self(counts))
    }

    #[must_use]
    pub fn target(&self, domain: Domain) -> u32 {
        self.0.get(&domain).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().map(|&c| u64::from(c)).sum()
    }

    /// Share of the exam this domain makes up, in percent.
    #[must_use]
    pub fn percentage(&self, domain: Domain) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let pct = 100.0 * f64::from(self.target(domain)) / total as f64;
        pct
    }

    /// Iterate `(domain, target)` in domain order.
    pub fn iter(&self) -> impl Iterator<Item = (Domain, u32)> + '_ {
        self.0.iter().map(|(d, c)| (*d, *c))
    }
}

impl Default for DomainWeights {
    fn default() -> Self {
        Self::from_counts([
            (Domain::Fundamentals, 54),
            (Domain::Predictive, 26),
            (Domain::Agile, 30),
            (Domain::BusinessAnalysis, 40),
        ])
    }
}

//
// ─── EXAM CONFIG ───────────────────────────────────────────────────────────────
//

fn default_total_questions() -> u32 {
    150
}

fn default_pretest_questions() -> u32 {
    15
}

fn default_time_minutes() -> u32 {
    180
}

fn default_break_after() -> u32 {
    75
}

fn default_break_minutes() -> u32 {
    10
}

/// Shape of a full-length exam. Every field has a default so partial TOML
/// files only override what they name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamConfig {
    #[serde(default = "default_total_questions")]
    pub total_questions: u32,
    #[serde(default = "default_pretest_questions")]
    pub pretest_questions: u32,
    #[serde(default = "default_time_minutes")]
    pub time_minutes: u32,
    /// Number of questions before the mandatory break; `0` disables it.
    #[serde(default = "default_break_after")]
    pub break_after: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    #[serde(default)]
    pub domain_weights: DomainWeights,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            total_questions: default_total_questions(),
            pretest_questions: default_pretest_questions(),
            time_minutes: default_time_minutes(),
            break_after: default_break_after(),
            break_minutes: default_break_minutes(),
            domain_weights: DomainWeights::default(),
        }
    }
}

impl ExamConfig {
    /// Parse and validate a TOML config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML, or any validation error.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the cross-field invariants of the exam shape.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant as a `ConfigError`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let total = u64::from(self.total_questions);
        let sum = self.domain_weights.total();
        if sum != total {
            return Err(ConfigError::TargetSumMismatch { sum, total });
        }
        if self.pretest_questions > self.total_questions {
            return Err(ConfigError::PretestExceedsTotal {
                pretest: u64::from(self.pretest_questions),
                total,
            });
        }
        if self.break_after > self.total_questions {
            return Err(ConfigError::BreakBeyondTotal {
                break_after: u64::from(self.break_after),
                total,
            });
        }
        if self.time_minutes == 0 {
            return Err(ConfigError::ZeroTimeBudget);
        }
        Ok(())
    }

    #[must_use]
    pub fn scored_questions(&self) -> u32 {
        self.total_questions.saturating_sub(self.pretest_questions)
    }

    /// Session timing derived from this config.
    #[must_use]
    pub fn timing(&self) -> SessionTiming {
        SessionTiming {
            time_budget_secs: u64::from(self.time_minutes) * 60,
            break_checkpoint: (self.break_after > 0).then_some(self.break_after as usize),
            break_budget_secs: u64::from(self.break_minutes) * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_sum_to_total() {
        let config = ExamConfig::default();
        config.validate().unwrap();
        assert_eq!(config.scored_questions(), 135);
        assert_eq!(config.domain_weights.total(), 150);
    }

    #[test]
    fn percentages_apportion_like_the_content_outline() {
        let weights = DomainWeights::from_percentages(
            [
                (Domain::Fundamentals, 36),
                (Domain::Predictive, 17),
                (Domain::Agile, 20),
                (Domain::BusinessAnalysis, 27),
            ],
            150,
        )
        .unwrap();
        assert_eq!(weights, DomainWeights::default());
    }

    #[test]
    fn percentages_must_sum_to_100() {
        let err = DomainWeights::from_percentages([(Domain::Agile, 90)], 10).unwrap_err();
        assert_eq!(err, ConfigError::PercentagesDoNotSumTo100 { sum: 90 });
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        let mut config = ExamConfig {
            pretest_questions: 151,
            ..ExamConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PretestExceedsTotal { pretest: 151, total: 150 })
        ));

        config.pretest_questions = 15;
        config.total_questions = 100;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TargetSumMismatch { sum: 150, total: 100 })
        ));
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let raw = r#"
            total_questions = 20
            pretest_questions = 2
            break_after = 10

            [domain_weights]
            fundamentals = 8
            predictive = 4
            agile = 4
            business-analysis = 4
        "#;
        let config = ExamConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.total_questions, 20);
        assert_eq!(config.time_minutes, 180);
        assert_eq!(config.domain_weights.target(Domain::BusinessAnalysis), 4);

        let timing = config.timing();
        assert_eq!(timing.time_budget_secs, 180 * 60);
        assert_eq!(timing.break_checkpoint, Some(10));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = ExamConfig::from_toml_str("total_questions = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
