use std::sync::Arc;

use exam_core::model::{QuestionBank, QuestionRecord};
use storage::repository::{
    ExamListing, ExamRepository, ImageRepository, ImageResolver, QuestionBankSource,
    StoredImage, normalize_exam_filename,
};

use crate::Clock;
use crate::error::LibraryError;

/// An image reference of a question and its data URL, when available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub name: String,
    pub data_url: Option<String>,
}

/// Manages imported question banks and their images.
#[derive(Clone)]
pub struct ExamLibraryService {
    clock: Clock,
    exams: Arc<dyn ExamRepository>,
    images: Arc<dyn ImageRepository>,
    resolver: Arc<dyn ImageResolver>,
}

impl ExamLibraryService {
    #[must_use]
    pub fn new(
        clock: Clock,
        exams: Arc<dyn ExamRepository>,
        images: Arc<dyn ImageRepository>,
        resolver: Arc<dyn ImageResolver>,
    ) -> Self {
        Self {
            clock,
            exams,
            images,
            resolver,
        }
    }

    /// Parse `raw` as a bank and store it under `name`.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::EmptyName` for a blank name, `LibraryError::Bank` if the
    /// JSON is not a valid bank, and `LibraryError::Storage` if persistence fails.
    pub async fn import_json(&self, name: &str, raw: &str) -> Result<ExamListing, LibraryError> {
        let bank = QuestionBank::from_json(raw)?;
        self.import_bank(name, &bank).await
    }

    /// Store an already validated bank under `name`, replacing any previous upload.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::EmptyName` for a blank name and
    /// `LibraryError::Storage` if persistence fails.
    pub async fn import_bank(
        &self,
        name: &str,
        bank: &QuestionBank,
    ) -> Result<ExamListing, LibraryError> {
        if name.trim().trim_end_matches(".json").is_empty() {
            return Err(LibraryError::EmptyName);
        }
        let filename = normalize_exam_filename(name);
        let listing = ExamListing::for_bank(&filename, bank, self.clock.now());
        self.exams.save_exam(&listing, bank).await?;
        log::info!(
            "imported {} ({} questions) as {}",
            listing.exam_name,
            listing.question_count,
            listing.filename
        );
        Ok(listing)
    }

    /// All imported exams, sorted by file name.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` if repository access fails.
    pub async fn list(&self) -> Result<Vec<ExamListing>, LibraryError> {
        Ok(self.exams.list_exams().await?)
    }

    /// Exams whose display name, file name or exam name contains `term`,
    /// ignoring case. A blank term matches everything.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` if repository access fails.
    pub async fn search(&self, term: &str) -> Result<Vec<ExamListing>, LibraryError> {
        let term = term.trim().to_lowercase();
        let exams = self.list().await?;
        if term.is_empty() {
            return Ok(exams);
        }
        Ok(exams
            .into_iter()
            .filter(|listing| matches_term(listing, &term))
            .collect())
    }

    /// Load the bank stored under `filename`.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` (`NotFound` when missing).
    pub async fn load(&self, filename: &str) -> Result<QuestionBank, LibraryError> {
        Ok(self.exams.load_bank(&normalize_exam_filename(filename)).await?)
    }

    /// Delete an exam together with its images.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` (`NotFound` when missing).
    pub async fn delete(&self, filename: &str) -> Result<(), LibraryError> {
        let filename = normalize_exam_filename(filename);
        self.exams.delete_exam(&filename).await?;
        log::info!("deleted exam {filename}");
        Ok(())
    }

    /// Store an image for `exam_name`; the MIME type follows the file extension.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::EmptyName` for a blank image name and
    /// `LibraryError::Storage` if persistence fails.
    pub async fn save_image(
        &self,
        exam_name: &str,
        image_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), LibraryError> {
        if image_name.trim().is_empty() {
            return Err(LibraryError::EmptyName);
        }
        let image = StoredImage::new(image_name, bytes);
        self.images.save_image(exam_name, image_name, &image).await?;
        log::debug!("stored image {image_name} ({}) for {exam_name}", image.mime);
        Ok(())
    }

    /// Names of the images stored for `exam_name`.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` if repository access fails.
    pub async fn list_images(&self, exam_name: &str) -> Result<Vec<String>, LibraryError> {
        Ok(self.images.list_images(exam_name).await?)
    }

    /// Data URL of one image, or `None` when it is not available.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` if the lookup fails.
    pub async fn resolve_image(
        &self,
        exam_name: &str,
        image_name: &str,
    ) -> Result<Option<String>, LibraryError> {
        Ok(self.resolver.resolve_image(exam_name, image_name).await?)
    }

    /// Resolve every image referenced by `question` in order.
    ///
    /// Missing images stay in the result with no data URL.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` if a lookup fails.
    pub async fn resolve_question_images(
        &self,
        exam_name: &str,
        question: &QuestionRecord,
    ) -> Result<Vec<ResolvedImage>, LibraryError> {
        let mut resolved = Vec::with_capacity(question.images.len());
        for name in &question.images {
            let data_url = self.resolve_image(exam_name, name).await?;
            if data_url.is_none() {
                log::warn!("image {name} of {exam_name} is not available");
            }
            resolved.push(ResolvedImage {
                name: name.clone(),
                data_url,
            });
        }
        Ok(resolved)
    }
}

fn matches_term(listing: &ExamListing, term: &str) -> bool {
    [
        listing.display_name(),
        listing.filename.clone(),
        listing.exam_name.clone(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;

    use exam_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, StorageError};

    const BANK: &str = r#"[
        {"topic_number": 1, "question_number": 1, "question": "Which is a cloud model?",
         "answers": ["IaaS", "Fax"], "answer_labels": ["A", "B"],
         "answer_checks": [true, false], "images": ["diagram.png"], "exam_name": "AZ-900"},
        {"topic_number": 1, "question_number": 2, "question": "Pick two",
         "answers": ["a", "b", "c"], "answer_labels": ["A", "B", "C"],
         "answer_checks": [true, true, false]}
    ]"#;

    fn library() -> ExamLibraryService {
        let repo = InMemoryRepository::new();
        ExamLibraryService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo),
        )
    }

    #[tokio::test]
    async fn import_appends_extension_and_records_metadata() {
        let library = library();
        let listing = library.import_json("az_900-practice", BANK).await.unwrap();

        assert_eq!(listing.filename, "az_900-practice.json");
        assert_eq!(listing.exam_name, "AZ-900");
        assert_eq!(listing.question_count, 2);
        assert_eq!(listing.uploaded_at, fixed_now());
        assert_eq!(listing.display_name(), "az 900 practice");

        let bank = library.load("az_900-practice").await.unwrap();
        assert_eq!(bank.len(), 2);
    }

    #[tokio::test]
    async fn import_rejects_blank_name_and_bad_json() {
        let library = library();
        assert!(matches!(
            library.import_json("  ", BANK).await,
            Err(LibraryError::EmptyName)
        ));
        assert!(matches!(
            library.import_json("x", "{\"not\": \"an array\"}").await,
            Err(LibraryError::Bank(_))
        ));
        assert!(library.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_matches_any_name_ignoring_case() {
        let library = library();
        library.import_json("az_900", BANK).await.unwrap();
        library.import_json("dp-203", "[]").await.unwrap();

        let hits = library.search("Az 9").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "az_900.json");

        assert_eq!(library.search("DP").await.unwrap().len(), 1);
        assert_eq!(library.search("").await.unwrap().len(), 2);
        assert!(library.search("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn question_images_resolve_to_data_urls() {
        let library = library();
        library.import_json("az_900", BANK).await.unwrap();
        library
            .save_image("AZ-900", "diagram.png", vec![1, 2, 3])
            .await
            .unwrap();

        let bank = library.load("az_900.json").await.unwrap();
        let images = library
            .resolve_question_images(bank.exam_name(), &bank.questions()[0])
            .await
            .unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(
            images[0].data_url.as_deref(),
            Some("data:image/png;base64,AQID")
        );

        assert_eq!(
            library.resolve_image("AZ-900", "missing.jpg").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn delete_removes_exam_and_images() {
        let library = library();
        library.import_json("az_900", BANK).await.unwrap();
        library
            .save_image("AZ-900", "diagram.png", vec![1])
            .await
            .unwrap();

        library.delete("az_900").await.unwrap();
        assert!(library.list_images("AZ-900").await.unwrap().is_empty());
        assert!(matches!(
            library.delete("az_900").await,
            Err(LibraryError::Storage(StorageError::NotFound))
        ));
    }
}
