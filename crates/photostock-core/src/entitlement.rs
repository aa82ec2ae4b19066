//! Entitlement rules
//!
//! Pure decision functions: no I/O, no mutation, the clock is a parameter. The
//! store-side conditional update in `photostock-db` re-applies the same quota and
//! expiry predicates, so a decision taken here can still be overturned by a
//! concurrent download that consumed the last unit first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{EntitlementSnapshot, LicenseClass};

/// Why a download was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    NoActiveSubscription,
    PlanInactive,
    SubscriptionExpired,
    QuotaExhausted,
}

impl DenyReason {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::NoActiveSubscription => "NO_ACTIVE_SUBSCRIPTION",
            DenyReason::PlanInactive => "PLAN_INACTIVE",
            DenyReason::SubscriptionExpired => "SUBSCRIPTION_EXPIRED",
            DenyReason::QuotaExhausted => "QUOTA_EXHAUSTED",
        }
    }

    /// User-facing, actionable message
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::NoActiveSubscription => "You must have an active subscription",
            DenyReason::PlanInactive => {
                "Your subscription plan is no longer available. Please choose another plan."
            }
            DenyReason::SubscriptionExpired => "Your subscription has expired",
            DenyReason::QuotaExhausted => "Download limit reached. Please upgrade your plan.",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of an entitlement check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// `requires_accounting` is true for premium content: the download must be
    /// committed against the subscription before bytes are served.
    Allow { requires_accounting: bool },
    Deny { reason: DenyReason },
}

impl Decision {
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Deny { reason } => Some(*reason),
            Decision::Allow { .. } => None,
        }
    }
}

/// Decide whether the holder of `snapshot` may download an asset of class `license`.
///
/// Checks, in order: subscription present and active, plan active, not expired
/// (`now <= payment_time + expires_in_days`), quota left (`total_downloads < download_limit`).
pub fn evaluate(
    license: LicenseClass,
    snapshot: Option<&EntitlementSnapshot>,
    now: DateTime<Utc>,
) -> Decision {
    if license == LicenseClass::Free {
        return Decision::Allow {
            requires_accounting: false,
        };
    }

    let deny = |reason| Decision::Deny { reason };

    let snapshot = match snapshot {
        Some(s) if s.subscription_active => s,
        _ => return deny(DenyReason::NoActiveSubscription),
    };

    if !snapshot.plan_active {
        return deny(DenyReason::PlanInactive);
    }

    if snapshot.is_expired(now) {
        return deny(DenyReason::SubscriptionExpired);
    }

    if snapshot.is_exhausted() {
        return deny(DenyReason::QuotaExhausted);
    }

    Decision::Allow {
        requires_accounting: true,
    }
}

/// Whether a user holding `current` may buy a new subscription.
///
/// Purchasing is blocked while the current subscription is both unexpired and
/// still has quota left.
pub fn can_purchase(current: Option<&EntitlementSnapshot>, now: DateTime<Utc>) -> bool {
    match current {
        None => true,
        Some(s) if !s.subscription_active => true,
        Some(s) => s.is_expired(now) || s.is_exhausted(),
    }
}
