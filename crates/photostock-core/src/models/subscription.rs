use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A plan users can purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SubscriptionPlan {
    pub id: i64,
    pub title: String,
    pub terms: Vec<String>,
    pub price: i64,
    /// Premium downloads allowed per purchase
    pub download_limit: i32,
    /// Validity window, counted in days from the payment time
    pub expires_in_days: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionPlan {
    pub fn terms(&self) -> PlanTerms {
        PlanTerms {
            plan_id: self.id,
            is_active: self.is_active,
            download_limit: self.download_limit,
            expires_in_days: self.expires_in_days,
        }
    }
}

/// The subset of a plan that entitlement decisions depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTerms {
    pub plan_id: i64,
    pub is_active: bool,
    pub download_limit: i32,
    pub expires_in_days: i32,
}

/// A purchased plan bound to one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub plan: SubscriptionPlan,
    pub payment_amount: i64,
    pub payment_time: DateTime<Utc>,
    pub total_downloads: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn snapshot(&self) -> EntitlementSnapshot {
        let terms = self.plan.terms();
        EntitlementSnapshot {
            subscription_id: self.id,
            subscription_active: self.is_active,
            plan_id: terms.plan_id,
            plan_active: terms.is_active,
            download_limit: terms.download_limit,
            expires_in_days: terms.expires_in_days,
            payment_time: self.payment_time,
            total_downloads: self.total_downloads,
        }
    }
}

/// Point-in-time view of a user's current subscription.
///
/// Built once from storage and handed to the entitlement evaluator; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct EntitlementSnapshot {
    pub subscription_id: i64,
    pub subscription_active: bool,
    pub plan_id: i64,
    pub plan_active: bool,
    pub download_limit: i32,
    pub expires_in_days: i32,
    pub payment_time: DateTime<Utc>,
    pub total_downloads: i32,
}

impl EntitlementSnapshot {
    /// Last instant at which the subscription is still usable (inclusive)
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.payment_time + Duration::days(i64::from(self.expires_in_days))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    pub fn is_exhausted(&self) -> bool {
        self.total_downloads >= self.download_limit
    }

    pub fn remaining_downloads(&self) -> i32 {
        (self.download_limit - self.total_downloads).max(0)
    }

    pub fn plan_terms(&self) -> PlanTerms {
        PlanTerms {
            plan_id: self.plan_id,
            is_active: self.plan_active,
            download_limit: self.download_limit,
            expires_in_days: self.expires_in_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(total_downloads: i32, download_limit: i32) -> EntitlementSnapshot {
        EntitlementSnapshot {
            subscription_id: 1,
            subscription_active: true,
            plan_id: 1,
            plan_active: true,
            download_limit,
            expires_in_days: 30,
            payment_time: Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
            total_downloads,
        }
    }

    #[test]
    fn test_expires_at_adds_days() {
        let s = snapshot(0, 10);
        assert_eq!(
            s.expires_at(),
            Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap()
        );
        assert!(!s.is_expired(s.expires_at()));
        assert!(s.is_expired(s.expires_at() + Duration::seconds(1)));
    }

    #[test]
    fn test_remaining_downloads_never_negative() {
        assert_eq!(snapshot(3, 10).remaining_downloads(), 7);
        assert_eq!(snapshot(10, 10).remaining_downloads(), 0);
        assert_eq!(snapshot(12, 10).remaining_downloads(), 0);
        assert!(snapshot(10, 10).is_exhausted());
    }
}
