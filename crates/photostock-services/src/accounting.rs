//! Download accounting
//!
//! Records a granted download against the user's subscription, the asset's
//! counter and the download history in one atomic step. The subscription charge
//! re-checks quota and validity at write time, so a decision taken on a stale
//! snapshot can still end in `QuotaExhausted`.

use photostock_core::{evaluate, AppError, DenyReason, DownloadRecord, LicenseClass};
use photostock_db::{CommitOutcome, DownloadLedger, LedgerEntry, SubscriptionStore};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;

#[derive(Debug, Error)]
pub enum AccountingError {
    #[error("Download accounting failed: {0}")]
    Store(#[from] AppError),
}

/// Result of committing a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountingOutcome {
    Committed(DownloadRecord),
    Denied(DenyReason),
}

#[derive(Clone)]
pub struct DownloadAccounting {
    subscriptions: Arc<dyn SubscriptionStore>,
    ledger: Arc<dyn DownloadLedger>,
    clock: Arc<dyn Clock>,
}

impl DownloadAccounting {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        ledger: Arc<dyn DownloadLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscriptions,
            ledger,
            clock,
        }
    }

    /// Commit a download of `asset_id` by `user_id`.
    ///
    /// Premium downloads are charged to the user's current subscription after it
    /// passes the entitlement rules; free downloads only touch the counters and
    /// the history.
    pub async fn commit(
        &self,
        user_id: i64,
        asset_id: Uuid,
        license: LicenseClass,
    ) -> Result<AccountingOutcome, AccountingError> {
        let subscription_id = match license {
            LicenseClass::Free => None,
            LicenseClass::Premium => {
                let snapshot = self
                    .subscriptions
                    .get_current_subscription_snapshot(user_id)
                    .await?;
                if let Some(reason) =
                    evaluate(license, snapshot.as_ref(), self.clock.now()).deny_reason()
                {
                    return Ok(AccountingOutcome::Denied(reason));
                }
                snapshot.map(|s| s.subscription_id)
            }
        };

        self.commit_to(user_id, asset_id, license, subscription_id)
            .await
    }

    /// Commit against an already resolved subscription
    pub async fn commit_to(
        &self,
        user_id: i64,
        asset_id: Uuid,
        license: LicenseClass,
        subscription_id: Option<i64>,
    ) -> Result<AccountingOutcome, AccountingError> {
        let entry = LedgerEntry {
            asset_id,
            user_id,
            license,
            subscription_id: subscription_id.filter(|_| license.is_premium()),
            at: self.clock.now(),
        };

        let outcome = self.ledger.commit_download(entry).await.map_err(|e| {
            tracing::error!(
                user_id,
                asset_id = %asset_id,
                code = e.code(),
                transient = e.is_transient(),
                error = %e,
                "Download commit failed"
            );
            e
        })?;

        match outcome {
            CommitOutcome::Committed(record) => {
                tracing::info!(
                    user_id,
                    asset_id = %asset_id,
                    license = %license,
                    record_id = record.id,
                    "Download committed"
                );
                Ok(AccountingOutcome::Committed(record))
            }
            CommitOutcome::Rejected => {
                tracing::info!(
                    user_id,
                    asset_id = %asset_id,
                    subscription_id = ?subscription_id,
                    "Download rejected at commit, quota exhausted"
                );
                Ok(AccountingOutcome::Denied(DenyReason::QuotaExhausted))
            }
        }
    }
}
