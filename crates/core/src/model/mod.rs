mod attempt;
mod domain;
mod exam;
mod ids;
mod question;
mod score;

pub use ids::{ParseIdError, QuestionId, UserId};

pub use attempt::{Attempt, ExamKind, ExamKindParseError};
pub use domain::{Domain, UnknownDomain};
pub use exam::{AssemblyWarning, ExamInstance, ExamItem};
pub use question::{MIN_OPTIONS, Question, QuestionError, QuestionRecord};
pub use score::{AnswerOutcome, DomainScore, ReviewItem, ScoreResult};

pub(crate) use score::percentage_of;
