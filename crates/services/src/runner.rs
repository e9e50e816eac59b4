use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use exam_core::model::{ExamKind, UserId};
use exam_core::{ExamSession, SessionError, SessionPhase};

use crate::error::ExamServiceError;
use crate::exam_service::{AttemptOutcome, ExamService};
use crate::view::SessionView;

/// Seconds of exam time between automatic progress saves.
pub const DEFAULT_AUTOSAVE_SECS: u64 = 30;

/// One input to a running session. User actions and clock ticks share this
/// type so they are applied strictly in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Select(usize),
    Answer { index: usize, option: usize },
    ClearAnswer(usize),
    ToggleFlag(usize),
    /// Flag or unflag whichever question is current.
    ToggleCurrentFlag,
    GoTo(usize),
    Next,
    Previous,
    ResumeFromBreak,
    /// Seconds elapsed since the previous tick.
    Tick(u64),
    Submit,
    SaveAndQuit,
}

/// Notifications for whoever renders the session.
#[derive(Debug, Clone, PartialEq)]
pub enum RunnerEvent {
    Updated(SessionView),
    Rejected(SessionError),
    Finished(AttemptOutcome),
    Saved { persisted: bool },
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Finished(AttemptOutcome),
    Saved { persisted: bool },
}

/// Owns one session and applies commands from a single channel.
///
/// Once the session finishes, the attempt is scored and logged and the loop
/// ends; nothing queued behind the finishing command is applied. Full exams
/// are saved every [`DEFAULT_AUTOSAVE_SECS`] of exam time and on quit.
/// Practice runs are never saved.
pub struct ExamRunner {
    service: Arc<ExamService>,
    user_id: UserId,
    kind: ExamKind,
    session: ExamSession,
    autosave_every_secs: u64,
    since_save_secs: u64,
    events: Option<mpsc::UnboundedSender<RunnerEvent>>,
}

impl ExamRunner {
    #[must_use]
    pub fn new(
        service: Arc<ExamService>,
        user_id: UserId,
        kind: ExamKind,
        session: ExamSession,
    ) -> Self {
        Self {
            service,
            user_id,
            kind,
            session,
            autosave_every_secs: DEFAULT_AUTOSAVE_SECS,
            since_save_secs: 0,
            events: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<RunnerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Autosave cadence in seconds of exam time; `0` disables periodic saves.
    #[must_use]
    pub fn with_autosave_every(mut self, secs: u64) -> Self {
        self.autosave_every_secs = secs;
        self
    }

    #[must_use]
    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    fn saves_progress(&self) -> bool {
        self.kind == ExamKind::FullExam
    }

    /// Apply one non-lifecycle command to the session.
    ///
    /// # Errors
    ///
    /// Returns the session's rejection; the session is unchanged in that case.
    pub fn apply(&mut self, command: SessionCommand) -> Result<(), SessionError> {
        let s = &mut self.session;
        match command {
            SessionCommand::Select(option) => s.select(option),
            SessionCommand::Answer { index, option } => s.record_answer(index, option),
            SessionCommand::ClearAnswer(index) => s.clear_answer(index).map(|_| ()),
            SessionCommand::ToggleFlag(index) => s.toggle_flag(index).map(|_| ()),
            SessionCommand::ToggleCurrentFlag => s.toggle_flag(s.current_index()).map(|_| ()),
            SessionCommand::GoTo(index) => s.go_to(index),
            SessionCommand::Next => s.advance(),
            SessionCommand::Previous => s.retreat(),
            SessionCommand::ResumeFromBreak => s.resume_from_break(),
            SessionCommand::Tick(delta) => {
                if s.is_finished() {
                    return Err(SessionError::Finished);
                }
                s.tick(delta);
                Ok(())
            }
            SessionCommand::Submit => s.submit(),
            SessionCommand::SaveAndQuit => Ok(()),
        }
    }

    /// Consume commands until the session finishes or the user quits.
    ///
    /// A closed channel counts as a quit.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError` only if scoring the finished session fails;
    /// storage failures are logged and reported through the outcome.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
    ) -> Result<RunOutcome, ExamServiceError> {
        self.emit(RunnerEvent::Updated(SessionView::from_session(&self.session)));

        while let Some(command) = commands.recv().await {
            match command {
                SessionCommand::SaveAndQuit => return Ok(self.save_and_quit().await),
                SessionCommand::Tick(delta) => self.on_tick(delta).await,
                other => match self.apply(other) {
                    Ok(()) => self.emit(RunnerEvent::Updated(SessionView::from_session(&self.session))),
                    Err(err) => {
                        debug!(command = ?other, error = %err, "command rejected");
                        self.emit(RunnerEvent::Rejected(err));
                    }
                },
            }

            if self.session.is_finished() {
                let outcome = self
                    .service
                    .finish(&self.user_id, self.kind, &self.session)
                    .await?;
                self.emit(RunnerEvent::Finished(outcome.clone()));
                return Ok(RunOutcome::Finished(outcome));
            }
        }

        debug!("command channel closed");
        Ok(self.save_and_quit().await)
    }

    async fn on_tick(&mut self, delta: u64) {
        let before = self.session.phase();
        let after = self.session.tick(delta);
        if before != after {
            info!(from = ?before, to = ?after, "session phase changed");
            self.emit(RunnerEvent::Updated(SessionView::from_session(&self.session)));
        }

        if after == SessionPhase::InProgress && self.saves_progress() && self.autosave_every_secs > 0 {
            self.since_save_secs += delta;
            if self.since_save_secs >= self.autosave_every_secs {
                self.since_save_secs = 0;
                self.service.autosave(&self.user_id, &self.session).await;
            }
        }
    }

    async fn save_and_quit(self) -> RunOutcome {
        let persisted = if self.saves_progress() {
            self.service.autosave(&self.user_id, &self.session).await
        } else {
            false
        };
        info!(user = %self.user_id, persisted, "leaving exam");
        self.emit(RunnerEvent::Saved { persisted });
        RunOutcome::Saved { persisted }
    }

    fn emit(&self, event: RunnerEvent) {
        if let Some(events) = &self.events {
            // a closed receiver only means nobody is rendering
            let _ = events.send(event);
        }
    }
}

/// Feed `Tick` commands into `commands` once per `period` until the channel closes.
#[must_use]
pub fn spawn_ticker(commands: mpsc::Sender<SessionCommand>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first tick completes immediately
        interval.tick().await;
        let secs = period.as_secs().max(1);
        loop {
            interval.tick().await;
            if commands.send(SessionCommand::Tick(secs)).await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Domain, ExamInstance, ExamItem, Question, QuestionId};
    use exam_core::time::fixed_now;
    use exam_core::{Clock, QuestionBank, SessionTiming};
    use storage::repository::InMemoryRepository;

    fn exam(len: u64) -> ExamInstance {
        let items = (0..len)
            .map(|i| ExamItem {
                question: Question::new(
                    QuestionId::new(i + 1),
                    Domain::Agile,
                    format!("Q{i}"),
                    vec!["A".into(), "B".into()],
                    1,
                    "",
                )
                .unwrap(),
                is_pretest: false,
            })
            .collect();
        ExamInstance::new(items, Vec::new())
    }

    fn runner(session: ExamSession) -> ExamRunner {
        let repo = InMemoryRepository::new();
        let service = ExamService::new(
            Clock::fixed(fixed_now()),
            Arc::new(QuestionBank::default()),
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        ExamRunner::new(
            Arc::new(service),
            UserId::new("ana").unwrap(),
            ExamKind::FullExam,
            session,
        )
    }

    #[test]
    fn apply_dispatches_to_the_session() {
        let session = ExamSession::started(exam(3), SessionTiming::without_break(60), fixed_now());
        let mut r = runner(session);
        r.apply(SessionCommand::Select(1)).unwrap();
        r.apply(SessionCommand::Next).unwrap();
        r.apply(SessionCommand::ToggleFlag(1)).unwrap();
        assert_eq!(r.session().answer(0), Some(1));
        assert_eq!(r.session().current_index(), 1);
        assert!(r.session().is_flagged(1));
        assert!(matches!(
            r.apply(SessionCommand::Select(5)),
            Err(SessionError::InvalidOption { .. })
        ));
    }

    #[tokio::test]
    async fn expiry_ends_the_run_and_drops_late_answers() {
        let session = ExamSession::started(exam(3), SessionTiming::without_break(5), fixed_now());
        let (tx, rx) = mpsc::channel(8);
        tx.send(SessionCommand::Select(1)).await.unwrap();
        tx.send(SessionCommand::Tick(5)).await.unwrap();
        tx.send(SessionCommand::Answer { index: 1, option: 1 }).await.unwrap();

        let outcome = runner(session).run(rx).await.unwrap();
        let RunOutcome::Finished(outcome) = outcome else {
            panic!("expected a finished run");
        };
        assert_eq!(outcome.finish_reason, exam_core::FinishReason::TimeExpired);
        assert_eq!(outcome.result.correct_count, 1);
        assert_eq!(outcome.result.total_scored, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_sends_one_tick_per_period() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_ticker(tx, Duration::from_secs(1));
        assert_eq!(rx.recv().await, Some(SessionCommand::Tick(1)));
        assert_eq!(rx.recv().await, Some(SessionCommand::Tick(1)));
        drop(rx);
        handle.await.unwrap();
    }
}
