//! Download accounting transaction

use async_trait::async_trait;
use photostock_core::{AppError, LicenseClass};
use sqlx::PgPool;

use super::catalog::{increment_category_download_count, increment_download_count};
use super::history::insert_record;
use super::subscription::charge_download;
use super::traits::{CommitOutcome, DownloadLedger, LedgerEntry};

/// Postgres ledger: subscription charge, asset and category counters and history
/// insert in one transaction
#[derive(Clone)]
pub struct PgDownloadLedger {
    pool: PgPool,
}

impl PgDownloadLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DownloadLedger for PgDownloadLedger {
    #[tracing::instrument(
        skip(self, entry),
        fields(
            db.operation = "transaction",
            asset_id = %entry.asset_id,
            user_id = entry.user_id,
            license = %entry.license
        )
    )]
    async fn commit_download(&self, entry: LedgerEntry) -> Result<CommitOutcome, AppError> {
        if entry.license == LicenseClass::Premium && entry.subscription_id.is_none() {
            return Err(AppError::InvalidInput(
                "Premium downloads must be charged to a subscription".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        if let (LicenseClass::Premium, Some(subscription_id)) =
            (entry.license, entry.subscription_id)
        {
            let charged = charge_download(&mut tx, subscription_id, entry.at).await?;
            if charged == 0 {
                tx.rollback().await?;
                tracing::info!(subscription_id, "Download charge rejected");
                return Ok(CommitOutcome::Rejected);
            }
        }

        if increment_download_count(&mut tx, entry.asset_id).await? == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!(
                "Media asset {} not found",
                entry.asset_id
            )));
        }

        increment_category_download_count(&mut tx, entry.asset_id).await?;

        let record = insert_record(
            &mut tx,
            entry.asset_id,
            entry.user_id,
            entry.license,
            entry.at,
        )
        .await?;

        tx.commit().await?;

        Ok(CommitOutcome::Committed(record))
    }
}
