//! Store traits consumed by the services layer
//!
//! Each trait has a Postgres implementation in this crate and an in-memory one in
//! `crate::memory`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use photostock_core::{
    AppError, DownloadRecord, EntitlementSnapshot, LicenseClass, MediaAsset, NewMediaAsset,
    ProcessingStatus, UploadRecord,
};
use uuid::Uuid;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Register a new asset in the `Processing` state and record its upload
    async fn create_asset(&self, asset: NewMediaAsset) -> Result<MediaAsset, AppError>;

    async fn get_asset_by_id(&self, id: Uuid) -> Result<Option<MediaAsset>, AppError>;

    /// Returns false if the asset does not exist
    async fn increment_asset_download_count(&self, id: Uuid) -> Result<bool, AppError>;

    /// Returns false if the asset does not exist
    async fn update_processing_status(
        &self,
        id: Uuid,
        status: ProcessingStatus,
    ) -> Result<bool, AppError>;

    /// Most recent first
    async fn list_uploads_by_user(
        &self,
        uploader_id: i64,
        limit: i64,
    ) -> Result<Vec<UploadRecord>, AppError>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Snapshot of the user's most recently paid subscription, if any
    async fn get_current_subscription_snapshot(
        &self,
        user_id: i64,
    ) -> Result<Option<EntitlementSnapshot>, AppError>;

    /// Consume one download from the subscription if, at `now`, it is active, its
    /// plan is active, it has not expired and it has quota left. Returns whether a
    /// unit was consumed.
    async fn conditional_increment_downloads(
        &self,
        subscription_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record_download(
        &self,
        asset_id: Uuid,
        user_id: i64,
        license: LicenseClass,
        at: DateTime<Utc>,
    ) -> Result<DownloadRecord, AppError>;

    /// Most recent first
    async fn list_by_user(&self, user_id: i64, limit: i64) -> Result<Vec<DownloadRecord>, AppError>;
}

/// One download to account for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub asset_id: Uuid,
    pub user_id: i64,
    pub license: LicenseClass,
    /// Subscription the download is charged to. Required for premium assets.
    pub subscription_id: Option<i64>,
    pub at: DateTime<Utc>,
}

/// Result of an accounting attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed(DownloadRecord),
    /// The subscription no longer had quota (or validity) when the update ran.
    /// Nothing was written.
    Rejected,
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed(_))
    }
}

/// Applies the subscription charge, the asset and category counters and the
/// history entry as one atomic unit
#[async_trait]
pub trait DownloadLedger: Send + Sync {
    async fn commit_download(&self, entry: LedgerEntry) -> Result<CommitOutcome, AppError>;
}
