use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::error::{AppServicesError, RemoteError};
use crate::library_service::ExamLibraryService;
use crate::remote::{RemoteBankSource, RemoteConfig};
use crate::sessions::{ReportService, SessionLoopService};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    session_loop: Arc<SessionLoopService>,
    reports: Arc<ReportService>,
    library: Arc<ExamLibraryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock))
    }

    /// Build services over throwaway in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock) -> Self {
        let session_loop = Arc::new(SessionLoopService::new(
            clock,
            Arc::clone(&storage.banks),
            Arc::clone(&storage.reports),
        ));
        let reports = Arc::new(ReportService::new(Arc::clone(&storage.reports)));
        let library = Arc::new(ExamLibraryService::new(
            clock,
            Arc::clone(&storage.exams),
            Arc::clone(&storage.images),
            Arc::clone(&storage.image_resolver),
        ));
        Self {
            storage,
            session_loop,
            reports,
            library,
        }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn session_loop(&self) -> Arc<SessionLoopService> {
        Arc::clone(&self.session_loop)
    }

    #[must_use]
    pub fn reports(&self) -> Arc<ReportService> {
        Arc::clone(&self.reports)
    }

    #[must_use]
    pub fn library(&self) -> Arc<ExamLibraryService> {
        Arc::clone(&self.library)
    }

    /// Remote source configured from the environment, caching images locally.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NotConfigured` when no token is set.
    pub fn remote(&self) -> Result<RemoteBankSource, RemoteError> {
        let config = RemoteConfig::from_env()?;
        Ok(RemoteBankSource::new(config, Arc::clone(&self.storage.images)))
    }
}
