#![forbid(unsafe_code)]

pub mod assembler;
pub mod bank;
pub mod catalog;
pub mod config;
pub mod model;
pub mod scorer;
pub mod session;
pub mod time;

pub use assembler::{AssemblyError, ExamAssembler};
pub use bank::{BankError, QuestionBank};
pub use config::{ConfigError, DomainWeights, ExamConfig};
pub use session::{
    ExamSession, FinishReason, SessionError, SessionPhase, SessionProgress, SessionSnapshot,
    SessionTiming,
};
pub use time::Clock;
