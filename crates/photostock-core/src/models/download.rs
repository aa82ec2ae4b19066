use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::media::LicenseClass;

/// Audit entry written once per successful download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DownloadRecord {
    pub id: i64,
    pub asset_id: Uuid,
    pub user_id: i64,
    pub license: LicenseClass,
    pub downloaded_at: DateTime<Utc>,
}
