use std::sync::Arc;

use exam_core::{Clock, ExamConfig, QuestionBank};
use storage::repository::Storage;

use crate::error::AppServicesError;
use crate::exam_service::ExamService;
use crate::trends::TrendService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    exams: Arc<ExamService>,
    trends: Arc<TrendService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        bank: QuestionBank,
        config: ExamConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, bank, config))
    }

    /// Build services over in-memory storage; nothing outlives the process.
    #[must_use]
    pub fn in_memory(clock: Clock, bank: QuestionBank, config: ExamConfig) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, bank, config)
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        bank: QuestionBank,
        config: ExamConfig,
    ) -> Self {
        let exams = ExamService::new(
            clock,
            Arc::new(bank),
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.progress),
        )
        .with_config(config);
        let trends = TrendService::new(Arc::clone(&storage.attempts));
        Self {
            exams: Arc::new(exams),
            trends: Arc::new(trends),
        }
    }

    #[must_use]
    pub fn exams(&self) -> Arc<ExamService> {
        Arc::clone(&self.exams)
    }

    #[must_use]
    pub fn trends(&self) -> Arc<TrendService> {
        Arc::clone(&self.trends)
    }
}
