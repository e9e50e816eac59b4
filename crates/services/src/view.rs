use exam_core::model::Domain;
use exam_core::{ExamSession, SessionPhase, SessionProgress};

/// Presentation-agnostic picture of a running session.
///
/// Carries raw values only; formatting (countdowns, labels) is left to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub index: usize,
    pub total: usize,
    pub domain: Option<Domain>,
    pub prompt: Option<String>,
    pub options: Vec<String>,
    /// Pending selection, or the recorded answer if nothing is pending.
    pub selected: Option<usize>,
    pub flagged: bool,
    pub remaining_secs: u64,
    pub break_remaining_secs: u64,
    pub progress: SessionProgress,
}

impl SessionView {
    #[must_use]
    pub fn from_session(session: &ExamSession) -> Self {
        let index = session.current_index();
        let item = session.current_item();
        Self {
            phase: session.phase(),
            index,
            total: session.exam().len(),
            domain: item.map(|i| i.question.domain()),
            prompt: item.map(|i| i.question.prompt().to_owned()),
            options: item.map(|i| i.question.options().to_vec()).unwrap_or_default(),
            selected: session.pending().or_else(|| session.answer(index)),
            flagged: session.is_flagged(index),
            remaining_secs: session.remaining_secs(),
            break_remaining_secs: session.break_remaining_secs(),
            progress: session.progress(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{ExamInstance, ExamItem, Question, QuestionId};
    use exam_core::time::fixed_now;
    use exam_core::SessionTiming;

    #[test]
    fn view_prefers_pending_over_recorded_answer() {
        let question = Question::new(
            QuestionId::new(1),
            Domain::Predictive,
            "Q",
            vec!["A".into(), "B".into(), "C".into()],
            0,
            "",
        )
        .unwrap();
        let exam = ExamInstance::new(
            vec![ExamItem {
                question,
                is_pretest: false,
            }],
            Vec::new(),
        );
        let mut session = ExamSession::started(exam, SessionTiming::without_break(90), fixed_now());
        session.record_answer(0, 1).unwrap();
        assert_eq!(SessionView::from_session(&session).selected, Some(1));

        session.select(2).unwrap();
        let view = SessionView::from_session(&session);
        assert_eq!(view.selected, Some(2));
        assert_eq!(view.options.len(), 3);
        assert_eq!(view.domain, Some(Domain::Predictive));
        assert_eq!(view.remaining_secs, 90);
    }
}
