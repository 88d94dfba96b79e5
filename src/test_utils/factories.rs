//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::{
    application::ports::billing_provider::{
        CheckoutMode, ProviderCheckoutSession, ProviderSubscription,
    },
    domain::entities::{
        account::Account,
        device::{DEFAULT_DEVICE_NAME, Device},
        plan_tier::PlanTier,
        subscription_status::SubscriptionStatus,
    },
};

/// Fixed reference time for reproducible fixtures.
pub fn test_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
}

/// Create a free account with sensible defaults.
pub fn create_test_account(overrides: impl FnOnce(&mut Account)) -> Account {
    let mut account = Account {
        id: Uuid::new_v4(),
        email: "user@example.com".to_string(),
        display_name: None,
        plan_type: PlanTier::Free,
        subscription_status: SubscriptionStatus::Inactive,
        stripe_customer_id: None,
        stripe_subscription_id: None,
        current_period_start: None,
        current_period_end: None,
        deletion_scheduled_at: None,
        created_at: test_datetime(),
        updated_at: test_datetime(),
    };
    overrides(&mut account);
    account
}

/// Create a device seen just now.
pub fn create_test_device(user_id: Uuid, overrides: impl FnOnce(&mut Device)) -> Device {
    let now = Utc::now();
    let mut device = Device {
        id: Uuid::new_v4(),
        user_id,
        device_id: format!("device-{}", Uuid::new_v4()),
        device_fingerprint: String::new(),
        device_name: DEFAULT_DEVICE_NAME.to_string(),
        metadata: serde_json::json!({}),
        last_seen: now,
        created_at: now,
    };
    overrides(&mut device);
    if device.device_fingerprint.is_empty() {
        device.device_fingerprint = device.device_id.clone();
    }
    device
}

/// Create an active monthly provider subscription.
pub fn create_test_provider_subscription(
    overrides: impl FnOnce(&mut ProviderSubscription),
) -> ProviderSubscription {
    let start = Utc::now();
    let mut subscription = ProviderSubscription {
        id: "sub_test".to_string(),
        customer_id: "cus_test".to_string(),
        status: "active".to_string(),
        interval: Some("month".to_string()),
        current_period_start: Some(start),
        current_period_end: Some(start + Duration::days(30)),
        metadata_email: None,
    };
    overrides(&mut subscription);
    subscription
}

/// Create a paid lifetime checkout session for `email`.
pub fn create_test_checkout_session(
    email: &str,
    overrides: impl FnOnce(&mut ProviderCheckoutSession),
) -> ProviderCheckoutSession {
    let mut session = ProviderCheckoutSession {
        id: "cs_test_paid".to_string(),
        mode: CheckoutMode::Payment,
        payment_status: "paid".to_string(),
        customer_id: Some("cus_test".to_string()),
        subscription_id: None,
        emails: vec![email.to_string()],
    };
    overrides(&mut session);
    session
}
