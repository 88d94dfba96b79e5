use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::app_error::AppResult;

// ============================================================================
// Port Types - Provider-agnostic billing types
// ============================================================================

/// A subscription as reported by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer_id: String,
    /// Raw provider status (e.g. "active", "past_due")
    pub status: String,
    /// Recurring price interval ("month" or "year")
    pub interval: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    /// `metadata.userEmail` set at checkout
    pub metadata_email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    /// Recurring subscription
    Subscription,
    /// One-time payment (lifetime offer)
    Payment,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Subscription => "subscription",
            CheckoutMode::Payment => "payment",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub email: String,
    pub price_id: String,
    pub mode: CheckoutMode,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// A hosted checkout session read back from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCheckoutSession {
    pub id: String,
    pub mode: CheckoutMode,
    /// Raw provider value ("paid", "unpaid", "no_payment_required")
    pub payment_status: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    /// Candidate purchaser emails, most specific first
    pub emails: Vec<String>,
}

impl ProviderCheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

// ============================================================================
// Port Trait
// ============================================================================

#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn get_subscription(&self, subscription_id: &str) -> AppResult<ProviderSubscription>;

    /// Email on the provider's customer record, if any.
    async fn get_customer_email(&self, customer_id: &str) -> AppResult<Option<String>>;

    async fn create_checkout_session(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession>;

    async fn get_checkout_session(&self, session_id: &str) -> AppResult<ProviderCheckoutSession>;

    /// Returns the portal URL.
    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> AppResult<String>;
}
