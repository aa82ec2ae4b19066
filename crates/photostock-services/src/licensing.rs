//! Download authorization
//!
//! Resolves an asset and the caller's entitlement, then commits the download.
//! Only a committed download yields a grant, and only a grant gives access to
//! the original.

use chrono::{DateTime, Utc};
use photostock_core::{
    can_purchase, evaluate, AppError, Decision, DenyReason, DownloadRecord, EntitlementSnapshot,
    LicenseClass, MediaAsset,
};
use photostock_db::{CatalogStore, HistoryStore, SubscriptionStore};
use photostock_storage::{ByteStream, Storage, StorageError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::accounting::{AccountingError, AccountingOutcome, DownloadAccounting};
use crate::clock::Clock;

#[derive(Debug, Error)]
pub enum LicensingError {
    #[error("Media asset {0} not found")]
    NotFound(Uuid),

    #[error("Media asset {0} is not available for download yet")]
    NotReady(Uuid),

    #[error(transparent)]
    Store(#[from] AppError),

    #[error(transparent)]
    Accounting(#[from] AccountingError),

    #[error("Failed to open original: {0}")]
    Storage(#[from] StorageError),
}

/// Permission to fetch one original, issued after the download was committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadGrant {
    pub asset_id: Uuid,
    pub title: String,
    pub license: LicenseClass,
    #[serde(skip_serializing)]
    pub original_key: String,
    pub filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub display_size: String,
    pub resolution: String,
    pub record_id: i64,
    pub downloaded_at: DateTime<Utc>,
}

impl DownloadGrant {
    fn new(asset: &MediaAsset, record: &DownloadRecord) -> Self {
        Self {
            asset_id: asset.id,
            title: asset.title.clone(),
            license: asset.license,
            original_key: asset.original_key.clone(),
            filename: asset.original_filename.clone(),
            content_type: asset.content_type.clone(),
            file_size: asset.file_size,
            display_size: asset.display_size(),
            resolution: asset.resolution(),
            record_id: record.id,
            downloaded_at: record.downloaded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Granted(DownloadGrant),
    Denied(DenyReason),
}

impl Authorization {
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Authorization::Denied(reason) => Some(*reason),
            Authorization::Granted(_) => None,
        }
    }
}

/// A read-only entitlement check
#[derive(Debug, Clone, Serialize)]
pub struct AccessCheck {
    pub asset_id: Uuid,
    pub license: LicenseClass,
    pub decision: Decision,
    pub remaining_downloads: Option<i32>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct LicensingService {
    catalog: Arc<dyn CatalogStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    history: Arc<dyn HistoryStore>,
    storage: Arc<dyn Storage>,
    accounting: DownloadAccounting,
    clock: Arc<dyn Clock>,
}

impl LicensingService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        history: Arc<dyn HistoryStore>,
        storage: Arc<dyn Storage>,
        accounting: DownloadAccounting,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            subscriptions,
            history,
            storage,
            accounting,
            clock,
        }
    }

    async fn ready_asset(&self, asset_id: Uuid) -> Result<MediaAsset, LicensingError> {
        let asset = self
            .catalog
            .get_asset_by_id(asset_id)
            .await?
            .ok_or(LicensingError::NotFound(asset_id))?;

        if !asset.is_ready() {
            return Err(LicensingError::NotReady(asset_id));
        }
        Ok(asset)
    }

    async fn snapshot(&self, user_id: i64) -> Result<Option<EntitlementSnapshot>, LicensingError> {
        Ok(self
            .subscriptions
            .get_current_subscription_snapshot(user_id)
            .await?)
    }

    /// Evaluate whether `user_id` may download `asset_id` without recording anything
    pub async fn check_access(
        &self,
        user_id: i64,
        asset_id: Uuid,
    ) -> Result<AccessCheck, LicensingError> {
        let asset = self.ready_asset(asset_id).await?;
        let snapshot = self.snapshot(user_id).await?;
        let now = self.clock.now();

        Ok(AccessCheck {
            asset_id,
            license: asset.license,
            decision: evaluate(asset.license, snapshot.as_ref(), now),
            remaining_downloads: snapshot.as_ref().map(EntitlementSnapshot::remaining_downloads),
            checked_at: now,
        })
    }

    /// Decide, then commit. A denial leaves every counter untouched.
    #[tracing::instrument(skip(self))]
    pub async fn authorize_download(
        &self,
        user_id: i64,
        asset_id: Uuid,
    ) -> Result<Authorization, LicensingError> {
        let asset = self.ready_asset(asset_id).await?;

        let snapshot = match asset.license {
            LicenseClass::Premium => self.snapshot(user_id).await?,
            LicenseClass::Free => None,
        };

        let decision = evaluate(asset.license, snapshot.as_ref(), self.clock.now());
        if let Decision::Deny { reason } = decision {
            tracing::info!(reason = reason.code(), "Download denied");
            return Ok(Authorization::Denied(reason));
        }

        let outcome = self
            .accounting
            .commit_to(
                user_id,
                asset.id,
                asset.license,
                snapshot.map(|s| s.subscription_id),
            )
            .await?;

        Ok(match outcome {
            AccountingOutcome::Committed(record) => {
                Authorization::Granted(DownloadGrant::new(&asset, &record))
            }
            AccountingOutcome::Denied(reason) => Authorization::Denied(reason),
        })
    }

    /// Stream the original a grant refers to
    pub async fn open_download(&self, grant: &DownloadGrant) -> Result<ByteStream, LicensingError> {
        Ok(self.storage.download_stream(&grant.original_key).await?)
    }

    /// Whether `user_id` may buy a new subscription now
    pub async fn can_purchase(&self, user_id: i64) -> Result<bool, LicensingError> {
        let snapshot = self.snapshot(user_id).await?;
        Ok(can_purchase(snapshot.as_ref(), self.clock.now()))
    }

    /// Premium downloads left on the current subscription, if there is one
    pub async fn remaining_downloads(&self, user_id: i64) -> Result<Option<i32>, LicensingError> {
        Ok(self
            .snapshot(user_id)
            .await?
            .map(|s| s.remaining_downloads()))
    }

    pub async fn download_history(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<DownloadRecord>, LicensingError> {
        Ok(self.history.list_by_user(user_id, limit).await?)
    }
}
