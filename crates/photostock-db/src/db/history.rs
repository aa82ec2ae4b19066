use async_trait::async_trait;
use chrono::{DateTime, Utc};
use photostock_core::{AppError, DownloadRecord, LicenseClass};
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use super::traits::HistoryStore;

/// Repository for the per-user download history
#[derive(Clone)]
pub struct DownloadHistoryRepository {
    pool: PgPool,
}

impl DownloadHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) async fn insert_record(
    conn: &mut PgConnection,
    asset_id: Uuid,
    user_id: i64,
    license: LicenseClass,
    at: DateTime<Utc>,
) -> Result<DownloadRecord, sqlx::Error> {
    sqlx::query_as::<Postgres, DownloadRecord>(
        r#"
        INSERT INTO download_history (asset_id, user_id, license, downloaded_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, asset_id, user_id, license, downloaded_at
        "#,
    )
    .bind(asset_id)
    .bind(user_id)
    .bind(license)
    .bind(at)
    .fetch_one(conn)
    .await
}

#[async_trait]
impl HistoryStore for DownloadHistoryRepository {
    #[tracing::instrument(skip(self), fields(db.table = "download_history", db.operation = "insert"))]
    async fn record_download(
        &self,
        asset_id: Uuid,
        user_id: i64,
        license: LicenseClass,
        at: DateTime<Utc>,
    ) -> Result<DownloadRecord, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(insert_record(&mut conn, asset_id, user_id, license, at).await?)
    }

    #[tracing::instrument(skip(self), fields(db.table = "download_history", db.operation = "select"))]
    async fn list_by_user(&self, user_id: i64, limit: i64) -> Result<Vec<DownloadRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, DownloadRecord>(
            r#"
            SELECT id, asset_id, user_id, license, downloaded_at
            FROM download_history
            WHERE user_id = $1
            ORDER BY downloaded_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
