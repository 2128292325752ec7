use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::user::TenantId;

/// Billing status of a church subscription.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Suspended,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::PastDue => "PAST_DUE",
            SubscriptionStatus::Suspended => "SUSPENDED",
            SubscriptionStatus::Canceled => "CANCELED",
        }
    }
}

/// One subscription per church, owned by the billing subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub church_id: TenantId,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub next_billing_date: Option<NaiveDate>,
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: u32,
    /// Promotional credit: free billing periods left
    #[serde(default)]
    pub free_months_remaining: u32,
    #[serde(default)]
    pub failed_payment_attempts: u32,
}

fn default_grace_period_days() -> u32 {
    7
}

impl Subscription {
    /// A subscription with default grace period and no billing history.
    pub fn new(church_id: TenantId, status: SubscriptionStatus) -> Self {
        Self {
            church_id,
            status,
            next_billing_date: None,
            grace_period_days: default_grace_period_days(),
            free_months_remaining: 0,
            failed_payment_attempts: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    pub fn is_past_due(&self) -> bool {
        self.status == SubscriptionStatus::PastDue
    }

    /// Last day (inclusive) on which a past-due subscription keeps access.
    pub fn grace_period_end(&self) -> Option<NaiveDate> {
        self.next_billing_date?
            .checked_add_days(Days::new(u64::from(self.grace_period_days)))
    }

    /// Past due, but `today` is still on or before the grace period end.
    pub fn is_in_grace_period(&self, today: NaiveDate) -> bool {
        if !self.is_past_due() {
            return false;
        }
        match self.grace_period_end() {
            Some(end) => today <= end,
            None => false,
        }
    }

    pub fn has_promotional_credits(&self) -> bool {
        self.free_months_remaining > 0
    }

    /// Negative once the billing date has passed.
    pub fn days_until_next_billing(&self, today: NaiveDate) -> i64 {
        self.next_billing_date
            .map(|date| (date - today).num_days())
            .unwrap_or(0)
    }
}
