use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use exam_core::model::{QuestionBank, Report, ReportId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Append `.json` unless the name already carries it.
#[must_use]
pub fn normalize_exam_filename(name: &str) -> String {
    let name = name.trim();
    if name.ends_with(".json") {
        name.to_owned()
    } else {
        format!("{name}.json")
    }
}

/// Human-facing name for an exam file: extension removed, `_` and `-` as spaces.
#[must_use]
pub fn display_name(filename: &str) -> String {
    filename
        .strip_suffix(".json")
        .unwrap_or(filename)
        .replace(['_', '-'], " ")
}

/// Library entry for an imported bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamListing {
    pub filename: String,
    pub exam_name: String,
    pub question_count: u32,
    pub uploaded_at: DateTime<Utc>,
}

impl ExamListing {
    /// Describe `bank` stored under `filename`.
    ///
    /// The exam name falls back to the file stem when the first question has none.
    #[must_use]
    pub fn for_bank(filename: &str, bank: &QuestionBank, uploaded_at: DateTime<Utc>) -> Self {
        let exam_name = bank
            .questions()
            .first()
            .and_then(|q| q.exam_name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(
                || filename.strip_suffix(".json").unwrap_or(filename).to_owned(),
                str::to_owned,
            );
        Self {
            filename: filename.to_owned(),
            exam_name,
            question_count: u32::try_from(bank.len()).unwrap_or(u32::MAX),
            uploaded_at,
        }
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        display_name(&self.filename)
    }
}

/// MIME type for an image file name, by extension.
#[must_use]
pub fn mime_for_filename(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "image/jpeg",
    }
}

/// Image bytes stored for an exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl StoredImage {
    #[must_use]
    pub fn new(filename: &str, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime_for_filename(filename).to_owned(),
            bytes,
        }
    }

    /// Inline `data:` URL suitable for rendering.
    #[must_use]
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Persisted report with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub id: ReportId,
    pub report: Report,
}

impl ReportRow {
    #[must_use]
    pub fn new(id: ReportId, report: Report) -> Self {
        Self { id, report }
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Supplies question banks to the engine.
#[async_trait]
pub trait QuestionBankSource: Send + Sync {
    /// Load and validate the bank stored under `filename`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, `StorageError::Serialization`
    /// if the stored bank no longer validates, or other storage errors.
    async fn load_bank(&self, filename: &str) -> Result<QuestionBank, StorageError>;
}

/// Library of imported banks.
#[async_trait]
pub trait ExamRepository: QuestionBankSource {
    /// Store or replace a bank under `listing.filename`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be stored.
    async fn save_exam(&self, listing: &ExamListing, bank: &QuestionBank)
    -> Result<(), StorageError>;

    /// List stored banks ordered by filename.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_exams(&self) -> Result<Vec<ExamListing>, StorageError>;

    /// Remove a bank together with the images stored under its exam name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no bank has this filename.
    async fn delete_exam(&self, filename: &str) -> Result<(), StorageError>;
}

/// Per-exam image store.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Store or replace one image.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the image cannot be stored.
    async fn save_image(
        &self,
        exam_name: &str,
        image_name: &str,
        image: &StoredImage,
    ) -> Result<(), StorageError>;

    /// Fetch one image.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_image(&self, exam_name: &str, image_name: &str)
    -> Result<StoredImage, StorageError>;

    /// Names of all images stored for an exam, sorted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_images(&self, exam_name: &str) -> Result<Vec<String>, StorageError>;

    /// Remove all images of an exam, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete_images(&self, exam_name: &str) -> Result<u64, StorageError>;
}

/// Resolves an image reference of a question into a displayable data URL.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// Returns `Ok(None)` when the image is simply not available.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the lookup itself fails.
    async fn resolve_image(
        &self,
        exam_name: &str,
        image_name: &str,
    ) -> Result<Option<String>, StorageError>;
}

/// Append-only store of finished-session reports.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Persist a report and return its new id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the report cannot be stored.
    async fn append_report(&self, report: &Report) -> Result<ReportId, StorageError>;

    /// Fetch a report by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_report(&self, id: ReportId) -> Result<Report, StorageError>;

    /// All reports, newest first (ties broken by id, descending).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_reports(&self) -> Result<Vec<ReportRow>, StorageError>;

    /// Delete a report by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_report(&self, id: ReportId) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    exams: Arc<Mutex<HashMap<String, (ExamListing, QuestionBank)>>>,
    images: Arc<Mutex<HashMap<(String, String), StoredImage>>>,
    reports: Arc<Mutex<ReportTable>>,
}

#[derive(Default)]
struct ReportTable {
    next_id: i64,
    rows: HashMap<ReportId, Report>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionBankSource for InMemoryRepository {
    async fn load_bank(&self, filename: &str) -> Result<QuestionBank, StorageError> {
        let guard = self.exams.lock().map_err(poisoned)?;
        guard
            .get(filename)
            .map(|(_, bank)| bank.clone())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ExamRepository for InMemoryRepository {
    async fn save_exam(
        &self,
        listing: &ExamListing,
        bank: &QuestionBank,
    ) -> Result<(), StorageError> {
        let mut guard = self.exams.lock().map_err(poisoned)?;
        guard.insert(listing.filename.clone(), (listing.clone(), bank.clone()));
        Ok(())
    }

    async fn list_exams(&self) -> Result<Vec<ExamListing>, StorageError> {
        let guard = self.exams.lock().map_err(poisoned)?;
        let mut out: Vec<ExamListing> = guard.values().map(|(l, _)| l.clone()).collect();
        out.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(out)
    }

    async fn delete_exam(&self, filename: &str) -> Result<(), StorageError> {
        let (listing, _) = self
            .exams
            .lock()
            .map_err(poisoned)?
            .remove(filename)
            .ok_or(StorageError::NotFound)?;
        self.delete_images(&listing.exam_name).await?;
        Ok(())
    }
}

#[async_trait]
impl ImageRepository for InMemoryRepository {
    async fn save_image(
        &self,
        exam_name: &str,
        image_name: &str,
        image: &StoredImage,
    ) -> Result<(), StorageError> {
        let mut guard = self.images.lock().map_err(poisoned)?;
        guard.insert((exam_name.to_owned(), image_name.to_owned()), image.clone());
        Ok(())
    }

    async fn get_image(
        &self,
        exam_name: &str,
        image_name: &str,
    ) -> Result<StoredImage, StorageError> {
        let guard = self.images.lock().map_err(poisoned)?;
        guard
            .get(&(exam_name.to_owned(), image_name.to_owned()))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_images(&self, exam_name: &str) -> Result<Vec<String>, StorageError> {
        let guard = self.images.lock().map_err(poisoned)?;
        let mut names: Vec<String> = guard
            .keys()
            .filter(|(exam, _)| exam == exam_name)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn delete_images(&self, exam_name: &str) -> Result<u64, StorageError> {
        let mut guard = self.images.lock().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|(exam, _), _| exam != exam_name);
        Ok(u64::try_from(before - guard.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl ImageResolver for InMemoryRepository {
    async fn resolve_image(
        &self,
        exam_name: &str,
        image_name: &str,
    ) -> Result<Option<String>, StorageError> {
        match self.get_image(exam_name, image_name).await {
            Ok(image) => Ok(Some(image.data_url())),
            Err(StorageError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ReportRepository for InMemoryRepository {
    async fn append_report(&self, report: &Report) -> Result<ReportId, StorageError> {
        let mut guard = self.reports.lock().map_err(poisoned)?;
        guard.next_id += 1;
        let id = ReportId::new(guard.next_id);
        guard.rows.insert(id, report.clone());
        Ok(id)
    }

    async fn get_report(&self, id: ReportId) -> Result<Report, StorageError> {
        let guard = self.reports.lock().map_err(poisoned)?;
        guard.rows.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_reports(&self) -> Result<Vec<ReportRow>, StorageError> {
        let guard = self.reports.lock().map_err(poisoned)?;
        let mut rows: Vec<ReportRow> = guard
            .rows
            .iter()
            .map(|(id, report)| ReportRow::new(*id, report.clone()))
            .collect();
        rows.sort_by(|a, b| {
            b.report
                .timestamp()
                .cmp(&a.report.timestamp())
                .then(b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    async fn delete_report(&self, id: ReportId) -> Result<(), StorageError> {
        let mut guard = self.reports.lock().map_err(poisoned)?;
        guard.rows.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub exams: Arc<dyn ExamRepository>,
    pub banks: Arc<dyn QuestionBankSource>,
    pub images: Arc<dyn ImageRepository>,
    pub image_resolver: Arc<dyn ImageResolver>,
    pub reports: Arc<dyn ReportRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            exams: Arc::new(repo.clone()),
            banks: Arc::new(repo.clone()),
            images: Arc::new(repo.clone()),
            image_resolver: Arc::new(repo.clone()),
            reports: Arc::new(repo),
        }
    }
}
