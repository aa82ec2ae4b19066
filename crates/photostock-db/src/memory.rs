//! In-memory stores
//!
//! One mutex guards all state, so a ledger commit is atomic with respect to every
//! other operation on the same `MemoryStore`. Used by tests and local tooling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use photostock_core::{
    AppError, DownloadRecord, EntitlementSnapshot, LicenseClass, MediaAsset, NewMediaAsset,
    ProcessingStatus, Subscription, SubscriptionPlan, UploadRecord,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::db::{
    CatalogStore, CommitOutcome, DownloadLedger, HistoryStore, LedgerEntry, SubscriptionStore,
};

#[derive(Default)]
struct MemoryState {
    assets: HashMap<Uuid, MediaAsset>,
    plans: HashMap<i64, SubscriptionPlan>,
    subscriptions: HashMap<i64, Subscription>,
    history: Vec<DownloadRecord>,
    uploads: Vec<UploadRecord>,
    category_downloads: HashMap<i64, i64>,
    next_plan_id: i64,
    next_subscription_id: i64,
    next_record_id: i64,
    next_upload_id: i64,
}

impl MemoryState {
    fn snapshot(&self, subscription_id: i64) -> Option<EntitlementSnapshot> {
        let subscription = self.subscriptions.get(&subscription_id)?;
        let plan = self.plans.get(&subscription.plan.id)?;
        let mut snapshot = subscription.snapshot();
        snapshot.plan_active = plan.is_active;
        snapshot.download_limit = plan.download_limit;
        snapshot.expires_in_days = plan.expires_in_days;
        Some(snapshot)
    }

    fn charge(&mut self, subscription_id: i64, now: DateTime<Utc>) -> bool {
        let eligible = self.snapshot(subscription_id).is_some_and(|s| {
            s.subscription_active && s.plan_active && !s.is_expired(now) && !s.is_exhausted()
        });
        if !eligible {
            return false;
        }
        match self.subscriptions.get_mut(&subscription_id) {
            Some(subscription) => {
                subscription.total_downloads += 1;
                subscription.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    fn bump_asset(&mut self, id: Uuid) -> bool {
        match self.assets.get_mut(&id) {
            Some(asset) => {
                asset.download_count += 1;
                asset.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    fn bump_category(&mut self, asset_id: Uuid) {
        if let Some(category_id) = self.assets.get(&asset_id).map(|a| a.category_id) {
            *self.category_downloads.entry(category_id).or_insert(0) += 1;
        }
    }

    fn push_record(
        &mut self,
        asset_id: Uuid,
        user_id: i64,
        license: LicenseClass,
        at: DateTime<Utc>,
    ) -> DownloadRecord {
        self.next_record_id += 1;
        let record = DownloadRecord {
            id: self.next_record_id,
            asset_id,
            user_id,
            license,
            downloaded_at: at,
        };
        self.history.push(record.clone());
        record
    }
}

/// Catalog, subscription, history and ledger stores backed by process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a plan and return it with its assigned id
    pub fn insert_plan(
        &self,
        title: &str,
        price: i64,
        download_limit: i32,
        expires_in_days: i32,
    ) -> SubscriptionPlan {
        let mut state = self.state();
        state.next_plan_id += 1;
        let now = Utc::now();
        let plan = SubscriptionPlan {
            id: state.next_plan_id,
            title: title.to_string(),
            terms: Vec::new(),
            price,
            download_limit,
            expires_in_days,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.plans.insert(plan.id, plan.clone());
        plan
    }

    pub fn set_plan_active(&self, plan_id: i64, is_active: bool) -> bool {
        match self.state().plans.get_mut(&plan_id) {
            Some(plan) => {
                plan.is_active = is_active;
                true
            }
            None => false,
        }
    }

    /// Record a purchase of `plan_id` by `user_id` paid at `payment_time`
    pub fn insert_subscription(
        &self,
        user_id: i64,
        plan_id: i64,
        payment_time: DateTime<Utc>,
        total_downloads: i32,
    ) -> Result<Subscription, AppError> {
        let mut state = self.state();
        let plan = state
            .plans
            .get(&plan_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Subscription plan {} not found", plan_id)))?;

        state.next_subscription_id += 1;
        let now = Utc::now();
        let subscription = Subscription {
            id: state.next_subscription_id,
            user_id,
            payment_amount: plan.price,
            plan,
            payment_time,
            total_downloads,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state
            .subscriptions
            .insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    pub fn subscription(&self, id: i64) -> Option<Subscription> {
        self.state().subscriptions.get(&id).cloned()
    }

    pub fn history(&self) -> Vec<DownloadRecord> {
        self.state().history.clone()
    }

    pub fn category_download_count(&self, category_id: i64) -> i64 {
        self.state()
            .category_downloads
            .get(&category_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn asset_count(&self) -> usize {
        self.state().assets.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_asset(&self, asset: NewMediaAsset) -> Result<MediaAsset, AppError> {
        let mut state = self.state();
        if state.assets.contains_key(&asset.id) {
            return Err(AppError::Conflict(format!(
                "Media asset {} already exists",
                asset.id
            )));
        }

        let now = Utc::now();
        let created = MediaAsset {
            id: asset.id,
            title: asset.title,
            description: asset.description,
            license: asset.license,
            category_id: asset.category_id,
            uploader_id: asset.uploader_id,
            original_key: asset.original_key,
            original_filename: asset.original_filename,
            content_type: asset.content_type,
            file_size: asset.file_size,
            width: asset.width,
            height: asset.height,
            processing_status: ProcessingStatus::Processing,
            download_count: 0,
            created_at: now,
            updated_at: now,
        };
        state.next_upload_id += 1;
        let upload = UploadRecord {
            id: state.next_upload_id,
            asset_id: created.id,
            uploader_id: created.uploader_id,
            file_size: created.file_size,
            uploaded_at: now,
        };
        state.uploads.push(upload);
        state.assets.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_asset_by_id(&self, id: Uuid) -> Result<Option<MediaAsset>, AppError> {
        Ok(self.state().assets.get(&id).cloned())
    }

    async fn increment_asset_download_count(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.state().bump_asset(id))
    }

    async fn update_processing_status(
        &self,
        id: Uuid,
        status: ProcessingStatus,
    ) -> Result<bool, AppError> {
        match self.state().assets.get_mut(&id) {
            Some(asset) => {
                asset.processing_status = status;
                asset.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_uploads_by_user(
        &self,
        uploader_id: i64,
        limit: i64,
    ) -> Result<Vec<UploadRecord>, AppError> {
        let mut records: Vec<UploadRecord> = self
            .state()
            .uploads
            .iter()
            .filter(|r| r.uploader_id == uploader_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| (b.uploaded_at, b.id).cmp(&(a.uploaded_at, a.id)));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn get_current_subscription_snapshot(
        &self,
        user_id: i64,
    ) -> Result<Option<EntitlementSnapshot>, AppError> {
        let state = self.state();
        let current = state
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id)
            .max_by_key(|s| (s.payment_time, s.id))
            .map(|s| s.id);

        Ok(current.and_then(|id| state.snapshot(id)))
    }

    async fn conditional_increment_downloads(
        &self,
        subscription_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        Ok(self.state().charge(subscription_id, now))
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn record_download(
        &self,
        asset_id: Uuid,
        user_id: i64,
        license: LicenseClass,
        at: DateTime<Utc>,
    ) -> Result<DownloadRecord, AppError> {
        Ok(self.state().push_record(asset_id, user_id, license, at))
    }

    async fn list_by_user(&self, user_id: i64, limit: i64) -> Result<Vec<DownloadRecord>, AppError> {
        let mut records: Vec<DownloadRecord> = self
            .state()
            .history
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| (b.downloaded_at, b.id).cmp(&(a.downloaded_at, a.id)));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }
}

#[async_trait]
impl DownloadLedger for MemoryStore {
    async fn commit_download(&self, entry: LedgerEntry) -> Result<CommitOutcome, AppError> {
        let mut state = self.state();

        if !state.assets.contains_key(&entry.asset_id) {
            return Err(AppError::NotFound(format!(
                "Media asset {} not found",
                entry.asset_id
            )));
        }

        if entry.license == LicenseClass::Premium {
            let subscription_id = entry.subscription_id.ok_or_else(|| {
                AppError::InvalidInput(
                    "Premium downloads must be charged to a subscription".to_string(),
                )
            })?;
            if !state.charge(subscription_id, entry.at) {
                return Ok(CommitOutcome::Rejected);
            }
        }

        state.bump_asset(entry.asset_id);
        state.bump_category(entry.asset_id);
        let record = state.push_record(entry.asset_id, entry.user_id, entry.license, entry.at);
        Ok(CommitOutcome::Committed(record))
    }
}
