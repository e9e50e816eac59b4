use rand::Rng;
use rand::seq::{SliceRandom, index};
use thiserror::Error;
use tracing::{debug, warn};

use crate::bank::{BankError, QuestionBank};
use crate::config::{ConfigError, DomainWeights, ExamConfig};
use crate::model::{AssemblyWarning, Domain, ExamInstance, ExamItem, Question};

/// Errors that abort exam creation before any question is shown.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssemblyError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Bank(#[from] BankError),
}

/// Builds exam instances by sampling a fixed count of questions per domain.
///
/// All randomness comes from the caller's RNG, so a seeded generator yields
/// the same exam every time.
pub struct ExamAssembler<'a> {
    bank: &'a QuestionBank,
}

impl<'a> ExamAssembler<'a> {
    #[must_use]
    pub fn new(bank: &'a QuestionBank) -> Self {
        Self { bank }
    }

    /// Assemble a full exam from a validated config.
    ///
    /// # Errors
    ///
    /// Returns `AssemblyError::Config` for an invalid config and
    /// `AssemblyError::Bank` if a weighted domain has no questions.
    pub fn assemble_with_config<R: Rng + ?Sized>(
        &self,
        config: &ExamConfig,
        rng: &mut R,
    ) -> Result<ExamInstance, AssemblyError> {
        config.validate()?;
        self.assemble(
            &config.domain_weights,
            config.total_questions as usize,
            config.pretest_questions as usize,
            rng,
        )
    }

    /// Assemble a single-domain practice exam with no pretest items.
    ///
    /// # Errors
    ///
    /// Returns `AssemblyError::Bank` if the domain has no questions.
    pub fn practice<R: Rng + ?Sized>(
        &self,
        domain: Domain,
        count: u32,
        rng: &mut R,
    ) -> Result<ExamInstance, AssemblyError> {
        let targets = DomainWeights::from_counts([(domain, count)]);
        self.assemble(&targets, count as usize, 0, rng)
    }

    /// Sample, shuffle and tag an exam.
    ///
    /// - Each domain draws `targets[d]` questions, without replacement when the
    ///   bank has enough of them and with replacement otherwise (recorded as an
    ///   [`AssemblyWarning::InsufficientQuestions`]).
    /// - The concatenated draw is shuffled uniformly.
    /// - `pretest_count` positions are then picked uniformly, independent of domain.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::PretestExceedsTotal`, `ConfigError::TargetSumMismatch`
    /// or `ConfigError::LengthMismatch` for inconsistent inputs, and
    /// `BankError::InsufficientQuestions` when a domain with a non-zero target
    /// has no questions at all.
    pub fn assemble<R: Rng + ?Sized>(
        &self,
        targets: &DomainWeights,
        total_count: usize,
        pretest_count: usize,
        rng: &mut R,
    ) -> Result<ExamInstance, AssemblyError> {
        if pretest_count > total_count {
            return Err(ConfigError::PretestExceedsTotal {
                pretest: pretest_count as u64,
                total: total_count as u64,
            }
            .into());
        }
        if targets.total() != total_count as u64 {
            return Err(ConfigError::TargetSumMismatch {
                sum: targets.total(),
                total: total_count as u64,
            }
            .into());
        }
        if total_count == 0 {
            return Ok(ExamInstance::empty());
        }

        let mut drawn: Vec<Question> = Vec::with_capacity(total_count);
        let mut warnings = Vec::new();

        for (domain, target) in targets.iter() {
            let target = target as usize;
            if target == 0 {
                continue;
            }
            let available = self.bank.questions_by_domain(domain)?;
            if available.len() >= target {
                let picks = index::sample(rng, available.len(), target);
                drawn.extend(picks.iter().map(|i| available[i].clone()));
            } else {
                warn!(
                    domain = domain.key(),
                    available = available.len(),
                    requested = target,
                    "not enough unique questions; sampling with replacement"
                );
                warnings.push(AssemblyWarning::InsufficientQuestions {
                    domain,
                    available: available.len(),
                    requested: target,
                });
                drawn.extend(
                    (0..target).map(|_| available[rng.random_range(0..available.len())].clone()),
                );
            }
        }

        if drawn.len() != total_count {
            return Err(ConfigError::LengthMismatch {
                actual: drawn.len(),
                expected: total_count,
            }
            .into());
        }

        drawn.shuffle(rng);

        let mut is_pretest = vec![false; total_count];
        for i in index::sample(rng, total_count, pretest_count) {
            is_pretest[i] = true;
        }

        let items: Vec<ExamItem> = drawn
            .into_iter()
            .zip(is_pretest)
            .map(|(question, is_pretest)| ExamItem {
                question,
                is_pretest,
            })
            .collect();

        debug!(
            total = items.len(),
            pretest = pretest_count,
            degraded = !warnings.is_empty(),
            "exam assembled"
        );

        Ok(ExamInstance::new(items, warnings))
    }
}
