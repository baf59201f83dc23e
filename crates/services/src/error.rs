//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{BankError, ReportError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session already finished")]
    Completed,
    #[error("session has not finished yet")]
    NotFinished,
    #[error("session task is no longer running")]
    Closed,
    #[error("report persistence task failed: {0}")]
    Persist(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ExamLibraryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LibraryError {
    #[error("exam file name must not be empty")]
    EmptyName,
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `RemoteBankSource`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("remote source is not configured: missing {0}")]
    NotConfigured(&'static str),
    #[error("remote request for {path} failed with status {status}")]
    HttpStatus {
        path: String,
        status: reqwest::StatusCode,
    },
    #[error("remote file {0} has no content")]
    MissingContent(String),
    #[error("remote file is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("remote file is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("invalid exam format: expected array of questions")]
    NotAnArray,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ReportService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportServiceError {
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to write report export: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
