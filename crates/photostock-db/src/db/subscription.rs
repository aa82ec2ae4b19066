use async_trait::async_trait;
use chrono::{DateTime, Utc};
use photostock_core::{AppError, EntitlementSnapshot, SubscriptionPlan};
use sqlx::{PgConnection, PgPool, Postgres};

use super::traits::SubscriptionStore;

/// Repository for subscription plans and purchased subscriptions
#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Plans currently offered for purchase
    #[tracing::instrument(skip(self), fields(db.table = "subscription_plans", db.operation = "select"))]
    pub async fn list_active_plans(&self) -> Result<Vec<SubscriptionPlan>, AppError> {
        let plans = sqlx::query_as::<Postgres, SubscriptionPlan>(
            r#"
            SELECT id, title, terms, price, download_limit, expires_in_days, is_active,
                   created_at, updated_at
            FROM subscription_plans
            WHERE is_active
            ORDER BY price ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(plans)
    }
}

/// Charge one download to `subscription_id` on `conn`, re-checking validity and
/// quota in the same statement. Returns the affected row count (0 or 1).
///
/// Concurrent callers serialize on the subscription row; a caller that waited
/// re-evaluates the predicate against the committed count, so the last unit can
/// only be taken once.
pub(crate) async fn charge_download(
    conn: &mut PgConnection,
    subscription_id: i64,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subscriptions AS s
        SET total_downloads = s.total_downloads + 1, updated_at = NOW()
        FROM subscription_plans AS p
        WHERE s.id = $1
          AND p.id = s.plan_id
          AND s.is_active
          AND p.is_active
          AND s.total_downloads < p.download_limit
          AND $2 <= s.payment_time + make_interval(days => p.expires_in_days)
        "#,
    )
    .bind(subscription_id)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

#[async_trait]
impl SubscriptionStore for SubscriptionRepository {
    #[tracing::instrument(skip(self), fields(db.table = "subscriptions", db.operation = "select"))]
    async fn get_current_subscription_snapshot(
        &self,
        user_id: i64,
    ) -> Result<Option<EntitlementSnapshot>, AppError> {
        let snapshot = sqlx::query_as::<Postgres, EntitlementSnapshot>(
            r#"
            SELECT s.id AS subscription_id,
                   s.is_active AS subscription_active,
                   p.id AS plan_id,
                   p.is_active AS plan_active,
                   p.download_limit,
                   p.expires_in_days,
                   s.payment_time,
                   s.total_downloads
            FROM subscriptions s
            JOIN subscription_plans p ON p.id = s.plan_id
            WHERE s.user_id = $1
            ORDER BY s.payment_time DESC, s.id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(snapshot)
    }

    #[tracing::instrument(skip(self), fields(db.table = "subscriptions", db.operation = "update", db.record_id = subscription_id))]
    async fn conditional_increment_downloads(
        &self,
        subscription_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        let affected = charge_download(&mut conn, subscription_id, now).await?;
        Ok(affected == 1)
    }
}
