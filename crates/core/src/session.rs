use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::{ExamInstance, ExamItem, ReviewItem, ScoreResult};
use crate::scorer;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Rejected session actions. A rejected action leaves the session untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("option {option} is out of range for index {index} ({option_count} options)")]
    InvalidOption {
        index: usize,
        option: usize,
        option_count: usize,
    },

    #[error("index {index} is before the break checkpoint index {checkpoint} and can no longer be changed")]
    BreakBoundaryViolation { index: usize, checkpoint: usize },

    #[error("index {index} is at or past the break checkpoint index {checkpoint} and is not open yet")]
    SectionLocked { index: usize, checkpoint: usize },

    #[error("question index {index} is out of range (exam has {len} questions)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("session is not in progress (phase: {phase:?})")]
    NotInProgress { phase: SessionPhase },

    #[error("session is not on break")]
    NotOnBreak,

    #[error("session has not started")]
    NotStarted,

    #[error("session already started")]
    AlreadyStarted,

    #[error("session already finished")]
    Finished,

    #[error("invalid session snapshot: {0}")]
    InvalidSnapshot(String),
}

//
// ─── PHASES & TIMING ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    NotStarted,
    InProgress,
    OnBreak,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Submitted,
    TimeExpired,
}

/// Time limits for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTiming {
    pub time_budget_secs: u64,
    /// Index of the first question after the break; `None` disables the break.
    pub break_checkpoint: Option<usize>,
    pub break_budget_secs: u64,
}

impl SessionTiming {
    /// Timing without a break.
    #[must_use]
    pub fn without_break(time_budget_secs: u64) -> Self {
        Self {
            time_budget_secs,
            break_checkpoint: None,
            break_budget_secs: 0,
        }
    }
}

/// Aggregated view of session progress, useful for status lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub flagged: usize,
    pub remaining: usize,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State of one exam attempt.
///
/// The session owns its exam and is driven by explicit actions and
/// [`ExamSession::tick`]; it performs no I/O and reads no clock.
///
/// With a break checkpoint `c` configured (and `0 < c < len`), questions
/// `0..c` form the first section and `c..` the second. Reaching index `c`
/// puts the session on break. After the break the first section is closed
/// for good.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamSession {
    exam: ExamInstance,
    timing: SessionTiming,
    phase: SessionPhase,
    current_index: usize,
    answers: BTreeMap<usize, usize>,
    pending: Option<usize>,
    flagged: BTreeSet<usize>,
    started_at: Option<DateTime<Utc>>,
    elapsed_secs: u64,
    break_elapsed_secs: u64,
    break_consumed: bool,
    finish_reason: Option<FinishReason>,
}

impl ExamSession {
    #[must_use]
    pub fn new(exam: ExamInstance, timing: SessionTiming) -> Self {
        Self {
            exam,
            timing,
            phase: SessionPhase::NotStarted,
            current_index: 0,
            answers: BTreeMap::new(),
            pending: None,
            flagged: BTreeSet::new(),
            started_at: None,
            elapsed_secs: 0,
            break_elapsed_secs: 0,
            break_consumed: false,
            finish_reason: None,
        }
    }

    /// Create a session and start it in one step.
    #[must_use]
    pub fn started(exam: ExamInstance, timing: SessionTiming, started_at: DateTime<Utc>) -> Self {
        let mut session = Self::new(exam, timing);
        session.begin(started_at);
        session
    }

    /// Move from `NotStarted` to `InProgress` at question 0.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` or `SessionError::Finished`
    /// if the session has been started before.
    pub fn start(&mut self, started_at: DateTime<Utc>) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::NotStarted => {
                self.begin(started_at);
                Ok(())
            }
            SessionPhase::Finished => Err(SessionError::Finished),
            SessionPhase::InProgress | SessionPhase::OnBreak => Err(SessionError::AlreadyStarted),
        }
    }

    fn begin(&mut self, started_at: DateTime<Utc>) {
        self.phase = SessionPhase::InProgress;
        self.current_index = 0;
        self.answers.clear();
        self.pending = None;
        self.flagged.clear();
        self.started_at = Some(started_at);
        self.elapsed_secs = 0;
        self.break_elapsed_secs = 0;
        self.break_consumed = false;
        self.finish_reason = None;
    }

    //
    // ─── ANSWERS ───────────────────────────────────────────────────────────────
    //

    /// Mark `option` as the selection for the current question without
    /// committing it. Navigation, submit and time expiry commit it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOption` for an out-of-range option, or a
    /// phase error when the session is not in progress.
    pub fn select(&mut self, option: usize) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.check_option(self.current_index, option)?;
        self.pending = Some(option);
        Ok(())
    }

    /// Store or overwrite the answer for `index`.
    ///
    /// # Errors
    ///
    /// - `SessionError::IndexOutOfRange` for an index past the end.
    /// - `SessionError::BreakBoundaryViolation` for a first-section index after the break.
    /// - `SessionError::SectionLocked` for a second-section index before the break.
    /// - `SessionError::InvalidOption` for an out-of-range option.
    /// - A phase error when the session is not in progress.
    pub fn record_answer(&mut self, index: usize, option: usize) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.check_answerable(index)?;
        self.check_option(index, option)?;
        self.answers.insert(index, option);
        if index == self.current_index {
            self.pending = None;
        }
        Ok(())
    }

    /// Remove the answer for `index`, returning the option that was recorded.
    ///
    /// # Errors
    ///
    /// Same guards as [`ExamSession::record_answer`], minus the option check.
    pub fn clear_answer(&mut self, index: usize) -> Result<Option<usize>, SessionError> {
        self.ensure_in_progress()?;
        self.check_answerable(index)?;
        if index == self.current_index {
            self.pending = None;
        }
        Ok(self.answers.remove(&index))
    }

    /// Flag or unflag a question for review. Returns whether it is now flagged.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::IndexOutOfRange`, `SessionError::NotStarted` or
    /// `SessionError::Finished`.
    pub fn toggle_flag(&mut self, index: usize) -> Result<bool, SessionError> {
        match self.phase {
            SessionPhase::NotStarted => return Err(SessionError::NotStarted),
            SessionPhase::Finished => return Err(SessionError::Finished),
            SessionPhase::InProgress | SessionPhase::OnBreak => {}
        }
        self.check_index(index)?;
        if self.flagged.remove(&index) {
            Ok(false)
        } else {
            self.flagged.insert(index);
            Ok(true)
        }
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Jump to `index`, committing the pending selection first.
    ///
    /// Landing on or past the checkpoint before the break puts the session
    /// on break at that index.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::IndexOutOfRange`, `SessionError::BreakBoundaryViolation`
    /// or a phase error. The current index is unchanged on error.
    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.check_index(index)?;
        if let Some(checkpoint) = self.checkpoint()
            && self.break_consumed
            && index < checkpoint
        {
            return Err(SessionError::BreakBoundaryViolation { index, checkpoint });
        }

        self.commit_pending();
        self.current_index = index;

        if let Some(checkpoint) = self.checkpoint()
            && !self.break_consumed
            && index >= checkpoint
        {
            self.phase = SessionPhase::OnBreak;
        }
        Ok(())
    }

    /// Move to the next question, staying on the last one at the end.
    ///
    /// # Errors
    ///
    /// See [`ExamSession::go_to`].
    pub fn advance(&mut self) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        let last = self.last_index()?;
        self.go_to((self.current_index + 1).min(last))
    }

    /// Move to the previous question, staying on the first one at the start.
    ///
    /// # Errors
    ///
    /// See [`ExamSession::go_to`].
    pub fn retreat(&mut self) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.last_index()?;
        self.go_to(self.current_index.saturating_sub(1))
    }

    /// End the break early and open the second section.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotOnBreak` unless the session is on break.
    pub fn resume_from_break(&mut self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::OnBreak => {
                self.phase = SessionPhase::InProgress;
                self.break_consumed = true;
                Ok(())
            }
            SessionPhase::Finished => Err(SessionError::Finished),
            SessionPhase::NotStarted | SessionPhase::InProgress => Err(SessionError::NotOnBreak),
        }
    }

    //
    // ─── TIME ──────────────────────────────────────────────────────────────────
    //

    /// Account for `delta_secs` of wall time since the previous tick.
    ///
    /// Exam time does not run during the break. Break time beyond the
    /// allowance ends the break and the excess is charged to the exam clock.
    /// Returns the phase after the tick.
    pub fn tick(&mut self, delta_secs: u64) -> SessionPhase {
        match self.phase {
            SessionPhase::InProgress => self.consume_exam_time(delta_secs),
            SessionPhase::OnBreak => {
                let left = self.break_remaining_secs();
                if delta_secs < left {
                    self.break_elapsed_secs += delta_secs;
                } else {
                    self.break_elapsed_secs = self.timing.break_budget_secs;
                    self.phase = SessionPhase::InProgress;
                    self.break_consumed = true;
                    self.consume_exam_time(delta_secs - left);
                }
            }
            SessionPhase::NotStarted | SessionPhase::Finished => {}
        }
        self.phase
    }

    fn consume_exam_time(&mut self, delta_secs: u64) {
        self.elapsed_secs = self
            .elapsed_secs
            .saturating_add(delta_secs)
            .min(self.timing.time_budget_secs);
        if self.elapsed_secs >= self.timing.time_budget_secs {
            self.commit_pending();
            self.finish(FinishReason::TimeExpired);
        }
    }

    /// Finish the attempt, committing the pending selection first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` or `SessionError::Finished`.
    pub fn submit(&mut self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::NotStarted => Err(SessionError::NotStarted),
            SessionPhase::Finished => Err(SessionError::Finished),
            SessionPhase::InProgress | SessionPhase::OnBreak => {
                self.commit_pending();
                self.finish(FinishReason::Submitted);
                Ok(())
            }
        }
    }

    fn finish(&mut self, reason: FinishReason) {
        self.phase = SessionPhase::Finished;
        self.finish_reason = Some(reason);
    }

    //
    // ─── QUERIES ───────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn exam(&self) -> &ExamInstance {
        &self.exam
    }

    #[must_use]
    pub fn timing(&self) -> SessionTiming {
        self.timing
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == SessionPhase::Finished
    }

    #[must_use]
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&ExamItem> {
        self.exam.get(self.current_index)
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<usize> {
        self.answers.get(&index).copied()
    }

    #[must_use]
    pub fn pending(&self) -> Option<usize> {
        self.pending
    }

    #[must_use]
    pub fn flagged(&self) -> &BTreeSet<usize> {
        &self.flagged
    }

    #[must_use]
    pub fn is_flagged(&self, index: usize) -> bool {
        self.flagged.contains(&index)
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u64 {
        self.timing.time_budget_secs.saturating_sub(self.elapsed_secs)
    }

    #[must_use]
    pub fn break_remaining_secs(&self) -> u64 {
        self.timing
            .break_budget_secs
            .saturating_sub(self.break_elapsed_secs)
    }

    #[must_use]
    pub fn break_consumed(&self) -> bool {
        self.break_consumed
    }

    /// Effective break checkpoint. A checkpoint at 0 or at/after the last
    /// position has nothing on one side of it and is ignored.
    #[must_use]
    pub fn checkpoint(&self) -> Option<usize> {
        self.timing
            .break_checkpoint
            .filter(|&c| c > 0 && c < self.exam.len())
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.exam.len();
        let answered = self.answers.len();
        SessionProgress {
            total,
            answered,
            flagged: self.flagged.len(),
            remaining: total.saturating_sub(answered),
        }
    }

    /// Final score; `None` until the session is finished.
    #[must_use]
    pub fn score(&self) -> Option<ScoreResult> {
        self.is_finished()
            .then(|| scorer::score(&self.exam, &self.answers))
    }

    #[must_use]
    pub fn review(&self) -> Vec<ReviewItem> {
        scorer::review(&self.exam, &self.answers, &self.flagged)
    }

    //
    // ─── SNAPSHOTS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            exam: self.exam.clone(),
            timing: self.timing,
            phase: self.phase,
            current_index: self.current_index,
            answers: self.answers.clone(),
            pending: self.pending,
            flagged: self.flagged.clone(),
            started_at: self.started_at,
            elapsed_secs: self.elapsed_secs,
            break_elapsed_secs: self.break_elapsed_secs,
            break_consumed: self.break_consumed,
            finish_reason: self.finish_reason,
        }
    }

    /// Rebuild a session from a snapshot, validating every index and option.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidSnapshot` describing the first inconsistency.
    pub fn restore(snapshot: SessionSnapshot) -> Result<Self, SessionError> {
        let session = Self {
            exam: snapshot.exam,
            timing: snapshot.timing,
            phase: snapshot.phase,
            current_index: snapshot.current_index,
            answers: snapshot.answers,
            pending: snapshot.pending,
            flagged: snapshot.flagged,
            started_at: snapshot.started_at,
            elapsed_secs: snapshot.elapsed_secs,
            break_elapsed_secs: snapshot.break_elapsed_secs,
            break_consumed: snapshot.break_consumed,
            finish_reason: snapshot.finish_reason,
        };
        session.validate_restored()?;
        Ok(session)
    }

    fn validate_restored(&self) -> Result<(), SessionError> {
        let invalid = |msg: String| Err(SessionError::InvalidSnapshot(msg));
        let len = self.exam.len();

        if len > 0 && self.current_index >= len {
            return invalid(format!("current index {} past end ({len})", self.current_index));
        }
        for (&index, &option) in &self.answers {
            if self.check_option(index, option).is_err() {
                return invalid(format!("answer {option} for question {index} is out of range"));
            }
        }
        if let Some(option) = self.pending
            && self.check_option(self.current_index, option).is_err()
        {
            return invalid(format!("pending option {option} is out of range"));
        }
        if let Some(&index) = self.flagged.iter().find(|&&i| i >= len) {
            return invalid(format!("flagged question {index} past end ({len})"));
        }
        if self.elapsed_secs > self.timing.time_budget_secs {
            return invalid("elapsed time exceeds the time budget".to_owned());
        }
        if self.break_elapsed_secs > self.timing.break_budget_secs {
            return invalid("break time exceeds the break budget".to_owned());
        }
        if (self.phase == SessionPhase::Finished) != self.finish_reason.is_some() {
            return invalid(format!(
                "phase {:?} does not match finish reason {:?}",
                self.phase, self.finish_reason
            ));
        }
        if self.phase != SessionPhase::NotStarted && self.started_at.is_none() {
            return invalid("started session has no start time".to_owned());
        }

        match (self.checkpoint(), self.phase) {
            (None, SessionPhase::OnBreak) => {
                return invalid("on break without a break checkpoint".to_owned());
            }
            (Some(_), SessionPhase::OnBreak) if self.break_consumed => {
                return invalid("on break after the break was consumed".to_owned());
            }
            (Some(c), SessionPhase::OnBreak) if self.current_index < c => {
                return invalid(format!(
                    "on break at index {} before the checkpoint {c}",
                    self.current_index
                ));
            }
            (Some(c), _) if self.break_consumed && self.current_index < c => {
                return invalid(format!(
                    "current index {} is before the checkpoint {c} after the break",
                    self.current_index
                ));
            }
            (Some(c), SessionPhase::InProgress) if !self.break_consumed && self.current_index >= c => {
                return invalid(format!(
                    "current index {} is past the checkpoint {c} before the break",
                    self.current_index
                ));
            }
            _ => {}
        }
        Ok(())
    }

    //
    // ─── GUARDS ────────────────────────────────────────────────────────────────
    //

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::InProgress => Ok(()),
            SessionPhase::NotStarted => Err(SessionError::NotStarted),
            SessionPhase::Finished => Err(SessionError::Finished),
            SessionPhase::OnBreak => Err(SessionError::NotInProgress { phase: self.phase }),
        }
    }

    fn last_index(&self) -> Result<usize, SessionError> {
        self.exam
            .len()
            .checked_sub(1)
            .ok_or(SessionError::IndexOutOfRange { index: 0, len: 0 })
    }

    fn check_index(&self, index: usize) -> Result<(), SessionError> {
        let len = self.exam.len();
        if index >= len {
            return Err(SessionError::IndexOutOfRange { index, len });
        }
        Ok(())
    }

    fn check_answerable(&self, index: usize) -> Result<(), SessionError> {
        self.check_index(index)?;
        if let Some(checkpoint) = self.checkpoint() {
            if self.break_consumed && index < checkpoint {
                return Err(SessionError::BreakBoundaryViolation { index, checkpoint });
            }
            if !self.break_consumed && index >= checkpoint {
                return Err(SessionError::SectionLocked { index, checkpoint });
            }
        }
        Ok(())
    }

    fn check_option(&self, index: usize, option: usize) -> Result<(), SessionError> {
        let item = self.exam.get(index).ok_or(SessionError::IndexOutOfRange {
            index,
            len: self.exam.len(),
        })?;
        let option_count = item.question.option_count();
        if option >= option_count {
            return Err(SessionError::InvalidOption {
                index,
                option,
                option_count,
            });
        }
        Ok(())
    }

    fn commit_pending(&mut self) {
        if let Some(option) = self.pending.take() {
            self.answers.insert(self.current_index, option);
        }
    }
}

/// Serializable copy of an [`ExamSession`] for resume-after-reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub exam: ExamInstance,
    pub timing: SessionTiming,
    pub phase: SessionPhase,
    pub current_index: usize,
    #[serde(default)]
    pub answers: BTreeMap<usize, usize>,
    #[serde(default)]
    pub pending: Option<usize>,
    #[serde(default)]
    pub flagged: BTreeSet<usize>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_secs: u64,
    pub break_elapsed_secs: u64,
    pub break_consumed: bool,
    pub finish_reason: Option<FinishReason>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Domain, Question, QuestionId};
    use crate::time::fixed_now;

    const BUDGET: u64 = 180 * 60;
    const BREAK: u64 = 10 * 60;

    fn exam(len: u64) -> ExamInstance {
        let items = (0..len)
            .map(|i| ExamItem {
                question: Question::new(
                    QuestionId::new(i + 1),
                    Domain::ALL[(i % 4) as usize],
                    format!("Q{i}"),
                    vec!["A".into(), "B".into(), "C".into(), "D".into()],
                    0,
                    "",
                )
                .unwrap(),
                is_pretest: false,
            })
            .collect();
        ExamInstance::new(items, Vec::new())
    }

    fn timing() -> SessionTiming {
        SessionTiming {
            time_budget_secs: BUDGET,
            break_checkpoint: Some(75),
            break_budget_secs: BREAK,
        }
    }

    fn session() -> ExamSession {
        ExamSession::started(exam(150), timing(), fixed_now())
    }

    fn on_break() -> ExamSession {
        let mut s = session();
        s.go_to(74).unwrap();
        s.advance().unwrap();
        assert_eq!(s.phase(), SessionPhase::OnBreak);
        s
    }

    #[test]
    fn new_session_waits_for_start() {
        let mut s = ExamSession::new(exam(3), timing());
        assert_eq!(s.phase(), SessionPhase::NotStarted);
        assert_eq!(s.select(0), Err(SessionError::NotStarted));
        assert_eq!(s.tick(30), SessionPhase::NotStarted);

        s.start(fixed_now()).unwrap();
        assert_eq!(s.phase(), SessionPhase::InProgress);
        assert_eq!(s.started_at(), Some(fixed_now()));
        assert_eq!(s.start(fixed_now()), Err(SessionError::AlreadyStarted));
    }

    #[test]
    fn advancing_into_checkpoint_enters_break() {
        let mut s = session();
        s.go_to(74).unwrap();
        s.select(2).unwrap();
        s.advance().unwrap();

        assert_eq!(s.phase(), SessionPhase::OnBreak);
        assert_eq!(s.current_index(), 75);
        assert_eq!(s.answer(74), Some(2));

        let err = s.record_answer(75, 1).unwrap_err();
        assert_eq!(
            err,
            SessionError::NotInProgress {
                phase: SessionPhase::OnBreak
            }
        );
        assert!(s.answers().get(&75).is_none());

        s.resume_from_break().unwrap();
        assert!(s.break_consumed());
        s.record_answer(75, 1).unwrap();
        assert_eq!(s.answer(75), Some(1));
    }

    #[test]
    fn first_section_is_closed_after_break() {
        let mut s = on_break();
        s.resume_from_break().unwrap();

        assert_eq!(
            s.record_answer(10, 0),
            Err(SessionError::BreakBoundaryViolation {
                index: 10,
                checkpoint: 75
            })
        );
        assert!(matches!(
            s.go_to(74),
            Err(SessionError::BreakBoundaryViolation { .. })
        ));
        assert!(matches!(
            s.retreat(),
            Err(SessionError::BreakBoundaryViolation { .. })
        ));
        assert_eq!(s.current_index(), 75);
    }

    #[test]
    fn second_section_is_locked_before_break() {
        let mut s = session();
        assert_eq!(
            s.record_answer(80, 0),
            Err(SessionError::SectionLocked {
                index: 80,
                checkpoint: 75
            })
        );
        assert!(s.answers().is_empty());
    }

    #[test]
    fn jumping_past_checkpoint_goes_on_break_there() {
        let mut s = session();
        s.go_to(120).unwrap();
        assert_eq!(s.phase(), SessionPhase::OnBreak);
        assert_eq!(s.current_index(), 120);
    }

    #[test]
    fn invalid_inputs_leave_state_unchanged() {
        let mut s = session();
        s.select(1).unwrap();
        let before = s.clone();

        assert_eq!(
            s.select(4),
            Err(SessionError::InvalidOption {
                index: 0,
                option: 4,
                option_count: 4
            })
        );
        assert_eq!(
            s.go_to(150),
            Err(SessionError::IndexOutOfRange { index: 150, len: 150 })
        );
        assert!(s.record_answer(3, 9).is_err());
        assert_eq!(s, before);
    }

    #[test]
    fn navigation_clamps_at_both_ends() {
        let mut s = ExamSession::started(exam(3), SessionTiming::without_break(60), fixed_now());
        s.retreat().unwrap();
        assert_eq!(s.current_index(), 0);
        s.go_to(2).unwrap();
        s.advance().unwrap();
        assert_eq!(s.current_index(), 2);
        assert_eq!(s.phase(), SessionPhase::InProgress);
    }

    #[test]
    fn time_expiry_commits_pending_and_finishes() {
        let mut s = session();
        s.select(3).unwrap();
        assert_eq!(s.tick(BUDGET - 1), SessionPhase::InProgress);
        assert_eq!(s.remaining_secs(), 1);
        assert_eq!(s.tick(5), SessionPhase::Finished);

        assert_eq!(s.finish_reason(), Some(FinishReason::TimeExpired));
        assert_eq!(s.answer(0), Some(3));
        assert_eq!(s.remaining_secs(), 0);
        assert_eq!(s.record_answer(1, 0), Err(SessionError::Finished));
        assert_eq!(s.toggle_flag(1), Err(SessionError::Finished));
        assert_eq!(s.submit(), Err(SessionError::Finished));
    }

    #[test]
    fn exam_clock_pauses_during_break() {
        let mut s = on_break();
        s.tick(120);
        assert_eq!(s.elapsed_secs(), 0);
        assert_eq!(s.break_remaining_secs(), BREAK - 120);
    }

    #[test]
    fn exhausted_break_resumes_and_carries_over() {
        let mut s = on_break();
        assert_eq!(s.tick(BREAK + 5), SessionPhase::InProgress);
        assert!(s.break_consumed());
        assert_eq!(s.break_remaining_secs(), 0);
        assert_eq!(s.elapsed_secs(), 5);
        assert_eq!(s.resume_from_break(), Err(SessionError::NotOnBreak));
    }

    #[test]
    fn submit_from_break_finishes() {
        let mut s = on_break();
        s.submit().unwrap();
        assert_eq!(s.finish_reason(), Some(FinishReason::Submitted));
        assert!(s.score().is_some());
    }

    #[test]
    fn flags_toggle_in_any_active_phase() {
        let mut s = on_break();
        assert_eq!(s.toggle_flag(3), Ok(true));
        assert_eq!(s.toggle_flag(3), Ok(false));
        assert_eq!(s.toggle_flag(4), Ok(true));
        assert_eq!(s.progress().flagged, 1);
    }

    #[test]
    fn clearing_an_answer_removes_it() {
        let mut s = session();
        s.record_answer(5, 2).unwrap();
        assert_eq!(s.clear_answer(5), Ok(Some(2)));
        assert_eq!(s.clear_answer(5), Ok(None));
        assert_eq!(s.progress().answered, 0);
    }

    #[test]
    fn score_is_available_only_when_finished() {
        let mut s = ExamSession::started(exam(4), SessionTiming::without_break(60), fixed_now());
        s.record_answer(0, 0).unwrap();
        s.record_answer(1, 1).unwrap();
        assert!(s.score().is_none());

        s.submit().unwrap();
        let result = s.score().unwrap();
        assert_eq!(result.total_scored, 4);
        assert_eq!(result.correct_count, 1);
        assert_eq!(result.percentage, 25.0);
    }

    #[test]
    fn checkpoint_outside_exam_is_ignored() {
        let t = SessionTiming {
            break_checkpoint: Some(10),
            ..timing()
        };
        let mut s = ExamSession::started(exam(5), t, fixed_now());
        assert_eq!(s.checkpoint(), None);
        s.go_to(4).unwrap();
        assert_eq!(s.phase(), SessionPhase::InProgress);
    }

    #[test]
    fn snapshot_round_trip_keeps_state() {
        let mut s = on_break();
        s.toggle_flag(12).unwrap();
        s.tick(30);

        let json = serde_json::to_string(&s.snapshot()).unwrap();
        let restored = ExamSession::restore(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored, s);
        assert_eq!(restored.break_remaining_secs(), BREAK - 30);
    }

    #[test]
    fn restore_rejects_inconsistent_snapshots() {
        let s = session();

        let mut bad = s.snapshot();
        bad.answers.insert(3, 7);
        assert!(matches!(
            ExamSession::restore(bad),
            Err(SessionError::InvalidSnapshot(_))
        ));

        let mut bad = s.snapshot();
        bad.current_index = 90;
        assert!(matches!(
            ExamSession::restore(bad),
            Err(SessionError::InvalidSnapshot(_))
        ));

        let mut bad = s.snapshot();
        bad.phase = SessionPhase::Finished;
        assert!(matches!(
            ExamSession::restore(bad),
            Err(SessionError::InvalidSnapshot(_))
        ));

        let mut bad = s.snapshot();
        bad.phase = SessionPhase::OnBreak;
        bad.current_index = 2;
        assert!(matches!(
            ExamSession::restore(bad),
            Err(SessionError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn restored_break_resumes_into_an_open_section() {
        let snapshot = on_break().snapshot();
        let mut s = ExamSession::restore(snapshot).unwrap();
        s.resume_from_break().unwrap();
        assert_eq!(s.current_index(), 75);
        s.record_answer(75, 1).unwrap();
        s.advance().unwrap();
        assert_eq!(s.current_index(), 76);
        assert!(ExamSession::restore(s.snapshot()).is_ok());
    }
}
