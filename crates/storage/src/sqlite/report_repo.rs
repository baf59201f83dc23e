use exam_core::model::{Report, ReportId};

use super::SqliteRepository;
use super::mapping::{conn, map_report_row, map_report_row_with_id, ser};
use crate::repository::{ReportRepository, ReportRow, StorageError};

#[async_trait::async_trait]
impl ReportRepository for SqliteRepository {
    async fn append_report(&self, report: &Report) -> Result<ReportId, StorageError> {
        let report_json = report.to_json().map_err(ser)?;
        let time_spent = i64::try_from(report.time_spent_secs())
            .map_err(|_| StorageError::Serialization("time_spent_secs overflow".into()))?;

        let res = sqlx::query(
            r"
                INSERT INTO reports (
                    mode, exam_name, total_questions, total_answered,
                    correct_answers, percentage, time_spent_secs, finished_at, report_json
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(report.mode().as_str())
        .bind(report.exam_name())
        .bind(i64::from(report.total_questions()))
        .bind(i64::from(report.total_answered()))
        .bind(i64::from(report.correct_answers()))
        .bind(i64::from(report.percentage()))
        .bind(time_spent)
        .bind(report.timestamp())
        .bind(report_json)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(ReportId::new(res.last_insert_rowid()))
    }

    async fn get_report(&self, id: ReportId) -> Result<Report, StorageError> {
        let row = sqlx::query("SELECT report_json FROM reports WHERE id = ?1")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_report_row(&row)
    }

    async fn list_reports(&self) -> Result<Vec<ReportRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, report_json
                FROM reports
                ORDER BY finished_at DESC, id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_report_row_with_id).collect()
    }

    async fn delete_report(&self, id: ReportId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM reports WHERE id = ?1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
