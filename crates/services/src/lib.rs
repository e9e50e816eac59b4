#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod exam_service;
pub mod runner;
pub mod trends;
pub mod view;

pub use exam_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ExamServiceError};
pub use exam_service::{AttemptOutcome, ExamService};
pub use runner::{ExamRunner, RunOutcome, RunnerEvent, SessionCommand, spawn_ticker};
pub use trends::{AttemptListItem, TrendService, TrendSummary};
pub use view::SessionView;
