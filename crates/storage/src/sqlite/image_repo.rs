use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{ImageRepository, ImageResolver, StorageError, StoredImage};

#[async_trait::async_trait]
impl ImageRepository for SqliteRepository {
    async fn save_image(
        &self,
        exam_name: &str,
        image_name: &str,
        image: &StoredImage,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO exam_images (exam_name, image_name, mime, data)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(exam_name, image_name) DO UPDATE SET
                    mime = excluded.mime,
                    data = excluded.data
            ",
        )
        .bind(exam_name)
        .bind(image_name)
        .bind(&image.mime)
        .bind(&image.bytes)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_image(
        &self,
        exam_name: &str,
        image_name: &str,
    ) -> Result<StoredImage, StorageError> {
        let row = sqlx::query(
            "SELECT mime, data FROM exam_images WHERE exam_name = ?1 AND image_name = ?2",
        )
        .bind(exam_name)
        .bind(image_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        Ok(StoredImage {
            mime: row.try_get("mime").map_err(ser)?,
            bytes: row.try_get("data").map_err(ser)?,
        })
    }

    async fn list_images(&self, exam_name: &str) -> Result<Vec<String>, StorageError> {
        sqlx::query_scalar(
            "SELECT image_name FROM exam_images WHERE exam_name = ?1 ORDER BY image_name ASC",
        )
        .bind(exam_name)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)
    }

    async fn delete_images(&self, exam_name: &str) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM exam_images WHERE exam_name = ?1")
            .bind(exam_name)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }
}

#[async_trait::async_trait]
impl ImageResolver for SqliteRepository {
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
