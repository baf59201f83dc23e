use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use exam_core::model::{QuestionBank, Report, ReportId, SessionConfig, SessionMode};
use storage::repository::{
    QuestionBankSource, ReportRepository, StorageError, normalize_exam_filename,
};

use super::builder::SessionBuilder;
use super::runner::{SessionHandle, spawn_session};
use super::service::{FinishOutcome, SessionService, TickOutcome};
use crate::Clock;
use crate::error::SessionError;

/// In-flight report write started at a finish transition.
#[derive(Debug)]
pub struct PendingPersist {
    handle: JoinHandle<Result<ReportId, StorageError>>,
}

impl PendingPersist {
    /// Wait for the write to complete.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the write failed, or
    /// `SessionError::Persist` if the task panicked.
    pub async fn wait(self) -> Result<ReportId, SessionError> {
        Ok(self.handle.await??)
    }
}

/// Orchestrates session start, finish and report persistence.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    banks: Arc<dyn QuestionBankSource>,
    reports: Arc<dyn ReportRepository>,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        banks: Arc<dyn QuestionBankSource>,
        reports: Arc<dyn ReportRepository>,
    ) -> Self {
        Self {
            clock,
            banks,
            reports,
        }
    }

    /// Load the bank stored under `filename` and start a session over it.
    /// A missing `.json` extension is added.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the bank cannot be loaded and
    /// `SessionError::Empty` if the working set is empty.
    pub async fn start_session(
        &self,
        filename: &str,
        mode: SessionMode,
        config: SessionConfig,
    ) -> Result<SessionService, SessionError> {
        let bank = self
            .banks
            .load_bank(&normalize_exam_filename(filename))
            .await?;
        self.start_from_bank(&bank, mode, config)
    }

    /// Start a session over an already loaded bank. The configuration is
    /// clamped against the bank first, and the report is filed under the
    /// bank's exam name whatever slice of it is drawn.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the working set is empty.
    pub fn start_from_bank(
        &self,
        bank: &QuestionBank,
        mode: SessionMode,
        config: SessionConfig,
    ) -> Result<SessionService, SessionError> {
        let config = config.clamped(bank.len());
        let working_set = SessionBuilder::new(config).build(bank.questions());
        SessionService::new(
            mode,
            working_set,
            config.time_limit_secs(),
            self.clock.now(),
        )
        .map(|session| session.with_exam_name(bank.exam_name()))
    }

    /// Finish `session` now and start storing its report.
    ///
    /// Returns `None` when the session had already finished, so a report is
    /// written at most once.
    ///
    /// # Errors
    ///
    /// Propagates scoring failures.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn finish(
        &self,
        session: &mut SessionService,
    ) -> Result<Option<(Report, PendingPersist)>, SessionError> {
        match session.finish(self.clock.now())? {
            FinishOutcome::Finished(report) => {
                let pending = self.persist(report.clone());
                Ok(Some((report, pending)))
            }
            FinishOutcome::AlreadyFinished => Ok(None),
        }
    }

    /// Feed one timer tick observed at `now`; an expiry starts storing the
    /// report. Callers driving their own timer pass the time of each tick so
    /// the report's time spent follows it.
    ///
    /// # Errors
    ///
    /// Propagates scoring failures.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn tick(
        &self,
        session: &mut SessionService,
        now: DateTime<Utc>,
    ) -> Result<Option<(Report, PendingPersist)>, SessionError> {
        match session.tick(now)? {
            TickOutcome::Expired(report) => {
                let pending = self.persist(report.clone());
                Ok(Some((report, pending)))
            }
            TickOutcome::Running { .. } | TickOutcome::Idle => Ok(None),
        }
    }

    /// Store `report` in the background without blocking the caller.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn persist(&self, report: Report) -> PendingPersist {
        let reports = Arc::clone(&self.reports);
        let handle = tokio::spawn(async move {
            let result = reports.append_report(&report).await;
            match &result {
                Ok(id) => log::info!("report {id} stored for {}", report.exam_name()),
                Err(e) => log::warn!("failed to store report for {}: {e}", report.exam_name()),
            }
            result
        });
        PendingPersist { handle }
    }

    /// Hand `session` to a background task that serializes commands and timer
    /// ticks and stores the report when it finishes.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(&self, session: SessionService) -> SessionHandle {
        spawn_session(session, self.clock, Arc::clone(&self.reports))
    }
}
