use exam_core::model::{QuestionBank, Report, ReportId};
use sqlx::Row;

use crate::repository::{ExamListing, ReportRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_listing_row(row: &sqlx::sqlite::SqliteRow) -> Result<ExamListing, StorageError> {
    Ok(ExamListing {
        filename: row.try_get("filename").map_err(ser)?,
        exam_name: row.try_get("exam_name").map_err(ser)?,
        question_count: u32_from_i64(
            "question_count",
            row.try_get::<i64, _>("question_count").map_err(ser)?,
        )?,
        uploaded_at: row.try_get("uploaded_at").map_err(ser)?,
    })
}

/// Stored banks are re-validated on the way out.
pub(crate) fn map_bank_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuestionBank, StorageError> {
    let raw: String = row.try_get("bank_json").map_err(ser)?;
    QuestionBank::from_json(&raw).map_err(ser)
}

pub(crate) fn map_report_row(row: &sqlx::sqlite::SqliteRow) -> Result<Report, StorageError> {
    let raw: String = row.try_get("report_json").map_err(ser)?;
    Report::from_json(&raw).map_err(ser)
}

pub(crate) fn map_report_row_with_id(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ReportRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    Ok(ReportRow::new(ReportId::new(id), map_report_row(row)?))
}
