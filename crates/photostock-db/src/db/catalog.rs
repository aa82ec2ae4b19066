use async_trait::async_trait;
use photostock_core::{AppError, MediaAsset, NewMediaAsset, ProcessingStatus, UploadRecord};
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use super::traits::CatalogStore;

const ASSET_COLUMNS: &str = "id, title, description, license, category_id, uploader_id, \
     original_key, original_filename, content_type, file_size, width, height, \
     processing_status, download_count, created_at, updated_at";

/// Repository for the media catalog
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Assets visible in the catalog, newest first
    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.operation = "select"))]
    pub async fn list_ready_assets(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MediaAsset>, AppError> {
        let assets = sqlx::query_as::<Postgres, MediaAsset>(&format!(
            "SELECT {} FROM media_assets WHERE processing_status = 'ready' \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            ASSET_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(assets)
    }
}

/// Bump an asset's download counter on `conn`. Returns the affected row count.
pub(crate) async fn increment_download_count(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE media_assets SET download_count = download_count + 1, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Bump the download counter of the category `asset_id` belongs to
pub(crate) async fn increment_category_download_count(
    conn: &mut PgConnection,
    asset_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE categories SET download_count = download_count + 1
        WHERE id = (SELECT category_id FROM media_assets WHERE id = $1)
        "#,
    )
    .bind(asset_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    #[tracing::instrument(skip(self, asset), fields(db.table = "media_assets", db.operation = "insert", db.record_id = %asset.id))]
    async fn create_asset(&self, asset: NewMediaAsset) -> Result<MediaAsset, AppError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<Postgres, MediaAsset>(&format!(
            r#"
            INSERT INTO media_assets (
                id, title, description, license, category_id, uploader_id,
                original_key, original_filename, content_type, file_size, width, height,
                processing_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'processing')
            RETURNING {}
            "#,
            ASSET_COLUMNS
        ))
        .bind(asset.id)
        .bind(&asset.title)
        .bind(&asset.description)
        .bind(asset.license)
        .bind(asset.category_id)
        .bind(asset.uploader_id)
        .bind(&asset.original_key)
        .bind(&asset.original_filename)
        .bind(&asset.content_type)
        .bind(asset.file_size)
        .bind(asset.width)
        .bind(asset.height)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO upload_history (asset_id, uploader_id, file_size, uploaded_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(created.id)
        .bind(created.uploader_id)
        .bind(created.file_size)
        .bind(created.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.operation = "select", db.record_id = %id))]
    async fn get_asset_by_id(&self, id: Uuid) -> Result<Option<MediaAsset>, AppError> {
        let asset = sqlx::query_as::<Postgres, MediaAsset>(&format!(
            "SELECT {} FROM media_assets WHERE id = $1",
            ASSET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(asset)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.operation = "update", db.record_id = %id))]
    async fn increment_asset_download_count(&self, id: Uuid) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        let affected = increment_download_count(&mut conn, id).await?;
        Ok(affected > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.operation = "update", db.record_id = %id))]
    async fn update_processing_status(
        &self,
        id: Uuid,
        status: ProcessingStatus,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE media_assets SET processing_status = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(status)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "upload_history", db.operation = "select"))]
    async fn list_uploads_by_user(
        &self,
        uploader_id: i64,
        limit: i64,
    ) -> Result<Vec<UploadRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, UploadRecord>(
            r#"
            SELECT id, asset_id, uploader_id, file_size, uploaded_at
            FROM upload_history
            WHERE uploader_id = $1
            ORDER BY uploaded_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(uploader_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
