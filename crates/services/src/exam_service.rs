use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};

use exam_core::model::{Attempt, Domain, ExamKind, ReviewItem, ScoreResult, UserId};
use exam_core::{
    Clock, ExamAssembler, ExamConfig, ExamSession, FinishReason, QuestionBank, SessionTiming,
};
use storage::repository::{AttemptRepository, ProgressRepository};

use crate::error::ExamServiceError;

/// Result of finishing an exam.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
    pub kind: ExamKind,
    pub result: ScoreResult,
    pub finish_reason: FinishReason,
    pub time_taken_secs: u64,
    /// Row id of the stored attempt; `None` if the attempt log was unavailable.
    pub attempt_id: Option<i64>,
    pub review: Vec<ReviewItem>,
}

/// Orchestrates exam creation, progress saves and attempt logging.
///
/// Sessions themselves stay pure; this service adds the clock and the
/// repositories around them. Persistence failures after scoring are logged
/// and never hide the result from the caller.
#[derive(Clone)]
pub struct ExamService {
    clock: Clock,
    bank: Arc<QuestionBank>,
    config: ExamConfig,
    attempts: Arc<dyn AttemptRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ExamService {
    #[must_use]
    pub fn new(
        clock: Clock,
        bank: Arc<QuestionBank>,
        attempts: Arc<dyn AttemptRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            bank,
            config: ExamConfig::default(),
            attempts,
            progress,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ExamConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    #[must_use]
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// Assemble and start a full-length exam.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Assembly` for an invalid config or an empty domain.
    pub fn start_exam<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ExamSession, ExamServiceError> {
        let exam = ExamAssembler::new(&self.bank).assemble_with_config(&self.config, rng)?;
        info!(
            questions = exam.len(),
            pretest = exam.pretest_count(),
            degraded = exam.is_degraded(),
            "starting full exam"
        );
        Ok(ExamSession::started(exam, self.config.timing(), self.clock.now()))
    }

    /// Assemble and start a single-domain practice run.
    ///
    /// Practice has no break and gets the full exam's time per question.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Assembly` if the domain has no questions.
    pub fn start_practice<R: Rng + ?Sized>(
        &self,
        domain: Domain,
        count: u32,
        rng: &mut R,
    ) -> Result<ExamSession, ExamServiceError> {
        let exam = ExamAssembler::new(&self.bank).practice(domain, count, rng)?;
        info!(domain = domain.key(), questions = exam.len(), "starting domain practice");
        let timing = SessionTiming::without_break(self.practice_budget_secs(count));
        Ok(ExamSession::started(exam, timing, self.clock.now()))
    }

    fn practice_budget_secs(&self, count: u32) -> u64 {
        let per_question = u64::from(self.config.time_minutes) * 60
            / u64::from(self.config.total_questions.max(1));
        per_question.max(1) * u64::from(count.max(1))
    }

    /// Restore the user's saved exam, if there is one.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Storage` if the save cannot be read, or
    /// `ExamServiceError::Session` if it no longer describes a valid session.
    pub async fn resume(&self, user_id: &UserId) -> Result<Option<ExamSession>, ExamServiceError> {
        let Some(snapshot) = self.progress.load_progress(user_id).await? else {
            return Ok(None);
        };
        let session = ExamSession::restore(snapshot)?;
        info!(
            user = %user_id,
            index = session.current_index(),
            remaining_secs = session.remaining_secs(),
            "resumed saved exam"
        );
        Ok(Some(session))
    }

    /// Save progress for later. Returns whether the save succeeded; failures
    /// are logged and otherwise ignored.
    pub async fn autosave(&self, user_id: &UserId, session: &ExamSession) -> bool {
        match self.progress.save_progress(user_id, &session.snapshot()).await {
            Ok(()) => true,
            Err(err) => {
                warn!(user = %user_id, error = %err, "failed to save exam progress");
                false
            }
        }
    }

    /// Discard the user's saved exam.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Storage` if the delete fails.
    pub async fn discard_saved(&self, user_id: &UserId) -> Result<(), ExamServiceError> {
        self.progress.clear_progress(user_id).await?;
        Ok(())
    }

    /// Score a finished session and record the attempt.
    ///
    /// Failing to log the attempt or clear the saved progress does not fail
    /// the call; `attempt_id` is `None` when the attempt was not stored.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::NotFinished` if the session is still running.
    pub async fn finish(
        &self,
        user_id: &UserId,
        kind: ExamKind,
        session: &ExamSession,
    ) -> Result<AttemptOutcome, ExamServiceError> {
        let (Some(result), Some(finish_reason)) = (session.score(), session.finish_reason()) else {
            return Err(ExamServiceError::NotFinished);
        };
        let time_taken_secs = session.elapsed_secs();

        let attempt = Attempt::new(
            user_id.clone(),
            kind,
            result.clone(),
            time_taken_secs,
            self.clock.now(),
        );
        let attempt_id = match self.attempts.save_attempt(&attempt).await {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(user = %user_id, error = %err, "failed to record attempt");
                None
            }
        };

        if let Err(err) = self.progress.clear_progress(user_id).await {
            warn!(user = %user_id, error = %err, "failed to clear saved exam");
        }

        info!(
            user = %user_id,
            kind = %kind,
            percentage = result.percentage,
            correct = result.correct_count,
            scored = result.total_scored,
            reason = ?finish_reason,
            "exam finished"
        );

        Ok(AttemptOutcome {
            kind,
            result,
            finish_reason,
            time_taken_secs,
            attempt_id,
            review: session.review(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::catalog;
    use exam_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use storage::repository::InMemoryRepository;

    fn service() -> (ExamService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let bank = catalog::builtin_bank(&mut StdRng::seed_from_u64(1)).unwrap();
        let svc = ExamService::new(
            Clock::fixed(fixed_now()),
            Arc::new(bank),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        (svc, repo)
    }

    #[test]
    fn full_exam_uses_config_timing() {
        let (svc, _) = service();
        let session = svc.start_exam(&mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(session.exam().len(), 150);
        assert_eq!(session.remaining_secs(), 180 * 60);
        assert_eq!(session.checkpoint(), Some(75));
        assert_eq!(session.started_at(), Some(fixed_now()));
    }

    #[test]
    fn practice_is_untimed_by_break_and_scaled_by_count() {
        let (svc, _) = service();
        let session = svc
            .start_practice(Domain::Agile, 10, &mut StdRng::seed_from_u64(2))
            .unwrap();
        assert_eq!(session.exam().len(), 10);
        assert_eq!(session.checkpoint(), None);
        assert_eq!(session.remaining_secs(), 720);
    }

    #[tokio::test]
    async fn finish_requires_a_finished_session() {
        let (svc, _) = service();
        let session = svc.start_exam(&mut StdRng::seed_from_u64(2)).unwrap();
        let user = UserId::new("ana").unwrap();
        let err = svc
            .finish(&user, ExamKind::FullExam, &session)
            .await
            .unwrap_err();
        assert!(matches!(err, ExamServiceError::NotFinished));
    }

    #[tokio::test]
    async fn autosave_then_resume_restores_the_session() {
        let (svc, _) = service();
        let user = UserId::new("ana").unwrap();
        let mut session = svc.start_exam(&mut StdRng::seed_from_u64(2)).unwrap();
        session.record_answer(3, 2).unwrap();

        assert!(svc.autosave(&user, &session).await);
        let resumed = svc.resume(&user).await.unwrap().expect("saved exam");
        assert_eq!(resumed, session);

        svc.discard_saved(&user).await.unwrap();
        assert!(svc.resume(&user).await.unwrap().is_none());
    }
}
