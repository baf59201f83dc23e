use exam_core::model::QuestionBank;

use super::SqliteRepository;
use super::mapping::{conn, map_bank_row, map_listing_row, ser};
use crate::repository::{ExamListing, ExamRepository, QuestionBankSource, StorageError};

#[async_trait::async_trait]
impl QuestionBankSource for SqliteRepository {
    async fn load_bank(&self, filename: &str) -> Result<QuestionBank, StorageError> {
        let row = sqlx::query("SELECT bank_json FROM exams WHERE filename = ?1")
            .bind(filename)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_bank_row(&row)
    }
}

#[async_trait::async_trait]
impl ExamRepository for SqliteRepository {
    async fn save_exam(
        &self,
        listing: &ExamListing,
        bank: &QuestionBank,
    ) -> Result<(), StorageError> {
        let bank_json = bank.to_json().map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO exams (filename, exam_name, question_count, uploaded_at, bank_json)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(filename) DO UPDATE SET
                    exam_name = excluded.exam_name,
                    question_count = excluded.question_count,
                    uploaded_at = excluded.uploaded_at,
                    bank_json = excluded.bank_json
            ",
        )
        .bind(&listing.filename)
        .bind(&listing.exam_name)
        .bind(i64::from(listing.question_count))
        .bind(listing.uploaded_at)
        .bind(bank_json)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn list_exams(&self) -> Result<Vec<ExamListing>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT filename, exam_name, question_count, uploaded_at
                FROM exams
                ORDER BY filename ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_listing_row).collect()
    }

    async fn delete_exam(&self, filename: &str) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let exam_name: String =
            sqlx::query_scalar("SELECT exam_name FROM exams WHERE filename = ?1")
                .bind(filename)
                .fetch_optional(&mut *tx)
                .await
                .map_err(conn)?
                .ok_or(StorageError::NotFound)?;

        sqlx::query("DELETE FROM exam_images WHERE exam_name = ?1")
            .bind(&exam_name)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        sqlx::query("DELETE FROM exams WHERE filename = ?1")
            .bind(filename)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
