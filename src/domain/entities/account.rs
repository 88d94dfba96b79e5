use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{plan_tier::PlanTier, subscription_status::SubscriptionStatus};

#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub plan_type: PlanTier,
    pub subscription_status: SubscriptionStatus,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub deletion_scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn billing(&self) -> BillingFields {
        BillingFields {
            plan_type: self.plan_type,
            subscription_status: self.subscription_status,
            stripe_customer_id: self.stripe_customer_id.clone(),
            stripe_subscription_id: self.stripe_subscription_id.clone(),
            current_period_start: self.current_period_start,
            current_period_end: self.current_period_end,
        }
    }
}

/// The billing columns of an account. Webhook transitions read and write
/// exactly this set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BillingFields {
    pub plan_type: PlanTier,
    pub subscription_status: SubscriptionStatus,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
}
