use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit entry written when an asset is registered in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UploadRecord {
    pub id: i64,
    pub asset_id: Uuid,
    pub uploader_id: i64,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
}
