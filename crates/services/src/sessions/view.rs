use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use exam_core::model::{
    OutcomeCounts, OutcomeFilter, QuestionOutcome, Report, ReportId, SessionMode,
};
use storage::repository::{ReportRepository, ReportRow};

use crate::error::ReportServiceError;

/// Presentation-agnostic list item for a stored report.
///
/// Timestamps stay raw; the front end formats them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportListItem {
    pub id: ReportId,
    pub exam_name: String,
    pub mode: SessionMode,
    pub finished_at: DateTime<Utc>,
    pub total: u32,
    pub answered: u32,
    pub correct: u32,
    pub percentage: u8,
    pub time_spent_secs: u64,
}

impl ReportListItem {
    #[must_use]
    pub fn from_row(row: &ReportRow) -> Self {
        let report = &row.report;
        Self {
            id: row.id,
            exam_name: report.exam_name().to_owned(),
            mode: report.mode(),
            finished_at: report.timestamp(),
            total: report.total_questions(),
            answered: report.total_answered(),
            correct: report.correct_answers(),
            percentage: report.percentage(),
            time_spent_secs: report.time_spent_secs(),
        }
    }
}

/// A report together with its filtered per-question review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportReview {
    pub id: ReportId,
    pub report: Report,
    pub filter: OutcomeFilter,
    pub counts: OutcomeCounts,
    pub outcomes: Vec<QuestionOutcome>,
}

/// Read side over stored reports.
#[derive(Clone)]
pub struct ReportService {
    reports: Arc<dyn ReportRepository>,
}

impl ReportService {
    #[must_use]
    pub fn new(reports: Arc<dyn ReportRepository>) -> Self {
        Self { reports }
    }

    /// All reports, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ReportServiceError::Storage` on repository failures.
    pub async fn list(&self) -> Result<Vec<ReportListItem>, ReportServiceError> {
        let rows = self.reports.list_reports().await?;
        Ok(rows.iter().map(ReportListItem::from_row).collect())
    }

    /// Fetch a report by id.
    ///
    /// # Errors
    ///
    /// Returns `ReportServiceError::Storage` when the report is missing or the
    /// repository fails.
    pub async fn get(&self, id: ReportId) -> Result<Report, ReportServiceError> {
        Ok(self.reports.get_report(id).await?)
    }

    /// Delete a report by id.
    ///
    /// # Errors
    ///
    /// Returns `ReportServiceError::Storage` when the report is missing or the
    /// repository fails.
    pub async fn delete(&self, id: ReportId) -> Result<(), ReportServiceError> {
        self.reports.delete_report(id).await?;
        log::info!("deleted report {id}");
        Ok(())
    }

    /// Per-question review of a report restricted to `filter`.
    ///
    /// # Errors
    ///
    /// Returns `ReportServiceError::Storage` when the report cannot be loaded.
    pub async fn review(
        &self,
        id: ReportId,
        filter: OutcomeFilter,
    ) -> Result<ReportReview, ReportServiceError> {
        let report = self.get(id).await?;
        Ok(ReportReview {
            id,
            filter,
            counts: report.counts(),
            outcomes: report.filtered_outcomes(filter),
            report,
        })
    }

    /// Write the report as pretty JSON into `dir` under its export file name.
    ///
    /// # Errors
    ///
    /// Returns `ReportServiceError` if the report cannot be loaded, serialized or
    /// written.
    pub async fn export(&self, id: ReportId, dir: &Path) -> Result<PathBuf, ReportServiceError> {
        let report = self.get(id).await?;
        let path = dir.join(report.file_name());
        tokio::fs::write(&path, report.to_pretty_json()?).await?;
        log::info!("exported report {id} to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use exam_core::model::{AnswerTracker, OutcomeStatus, QuestionRecord};
    use exam_core::scoring::{ScoreInput, score};
    use exam_core::time::fixed_now;
    use std::collections::BTreeSet;
    use storage::repository::{InMemoryRepository, StorageError};

    fn report() -> Report {
        let questions: Vec<QuestionRecord> = (1..=3)
            .map(|n| QuestionRecord {
                topic_number: 1,
                question_number: n,
                text: format!("Q{n}"),
                options: vec!["a".into(), "b".into()],
                labels: vec!["A".into(), "B".into()],
                checks: vec![true, false],
                images: Vec::new(),
                community_answers: None,
                exam_name: Some("az-900".into()),
                correct_answers: None,
            })
            .collect();
        let mut answers = AnswerTracker::new();
        answers.set_answer(0, BTreeSet::from([0]));
        answers.set_answer(1, BTreeSet::from([1]));
        score(ScoreInput {
            mode: SessionMode::Exam,
            exam_name: "az-900",
            questions: &questions,
            answers: &answers,
            started_at: fixed_now(),
            finished_at: fixed_now() + Duration::seconds(42),
            time_limit_secs: Some(600),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn list_item_carries_summary_numbers() {
        let repo = InMemoryRepository::new();
        let id = repo.append_report(&report()).await.unwrap();
        let svc = ReportService::new(Arc::new(repo));

        let items = svc.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, id);
        assert_eq!(items[0].exam_name, "az-900");
        assert_eq!(items[0].percentage, 50);
        assert_eq!(items[0].time_spent_secs, 42);
    }

    #[tokio::test]
    async fn review_filters_incorrect() {
        let repo = InMemoryRepository::new();
        let id = repo.append_report(&report()).await.unwrap();
        let svc = ReportService::new(Arc::new(repo));

        let review = svc.review(id, OutcomeFilter::Incorrect).await.unwrap();
        assert_eq!(review.counts.incorrect, 1);
        assert_eq!(review.outcomes.len(), 1);
        assert_eq!(review.outcomes[0].position, 1);
        assert_eq!(review.outcomes[0].status, OutcomeStatus::Incorrect);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let repo = InMemoryRepository::new();
        let id = repo.append_report(&report()).await.unwrap();
        let svc = ReportService::new(Arc::new(repo));

        svc.delete(id).await.unwrap();
        assert!(matches!(
            svc.get(id).await,
            Err(ReportServiceError::Storage(StorageError::NotFound))
        ));
    }

    #[tokio::test]
    async fn export_writes_named_json_file() {
        let repo = InMemoryRepository::new();
        let id = repo.append_report(&report()).await.unwrap();
        let svc = ReportService::new(Arc::new(repo));
        let dir = tempfile::tempdir().unwrap();

        let path = svc.export(id, dir.path()).await.unwrap();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("az-900_exam_2023-11-14_22-14-02.json")
        );
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(Report::from_json(&raw).unwrap(), report());
    }
}
