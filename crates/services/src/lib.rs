#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod library_service;
pub mod remote;
pub mod sessions;

pub use exam_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use error::{AppServicesError, LibraryError, RemoteError, ReportServiceError, SessionError};
pub use library_service::{ExamLibraryService, ResolvedImage};
pub use remote::{RemoteBankSource, RemoteConfig, RemoteEntry, RepoInfo};
pub use sessions::{
    FinishOutcome, Navigation, PendingPersist, ReportService, SessionHandle, SessionLoopService,
    SessionService, SessionSnapshot,
};
