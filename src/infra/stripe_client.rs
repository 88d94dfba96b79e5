use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;

use crate::app_error::{AppError, AppResult};
use crate::application::ports::billing_provider::{
    BillingProvider, CheckoutMode, CheckoutRequest, CheckoutSession, ProviderCheckoutSession,
    ProviderSubscription,
};
use crate::application::use_cases::billing_webhook::{
    BillingEvent, CheckoutCompleted, InvoiceEvent, ProviderEvent,
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Metadata key carrying the purchaser's email on sessions and subscriptions.
const USER_EMAIL_KEY: &str = "userEmail";

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
}

impl StripeClient {
    pub fn new(client: Client, secret_key: SecretString) -> Self {
        Self { client, secret_key }
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.secret_key.expose_secret()));
        format!("Basic {}", encoded)
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> AppResult<T> {
        let response = self
            .client
            .get(format!("{}/{}", STRIPE_API_BASE, path))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe request failed: {}", e)))?;

        self.handle_response(response).await
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> AppResult<T> {
        let response = self
            .client
            .post(format!("{}/{}", STRIPE_API_BASE, path))
            .header("Authorization", self.auth_header())
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe request failed: {}", e)))?;

        self.handle_response(response).await
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Stripe API error");

            let message = serde_json::from_str::<StripeErrorResponse>(&body)
                .ok()
                .map(|e| e.error.message.unwrap_or(e.error.error_type))
                .unwrap_or_else(|| format!("HTTP {}", status));

            // 404 and other client errors will not succeed on retry
            return Err(match status.as_u16() {
                404 => AppError::NotFound,
                429 => AppError::Upstream(format!("Stripe rate limited: {}", message)),
                400..=499 => AppError::InvalidInput(format!("Stripe error: {}", message)),
                _ => AppError::Upstream(format!("Stripe error: {}", message)),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Stripe response");
            AppError::Upstream(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn get_subscription(&self, subscription_id: &str) -> AppResult<ProviderSubscription> {
        let subscription: StripeSubscription =
            self.get(&format!("subscriptions/{}", subscription_id)).await?;
        Ok(subscription.into_provider())
    }

    async fn get_customer_email(&self, customer_id: &str) -> AppResult<Option<String>> {
        let customer: StripeCustomer = self.get(&format!("customers/{}", customer_id)).await?;
        if customer.deleted.unwrap_or(false) {
            return Ok(None);
        }
        Ok(customer.email)
    }

    async fn create_checkout_session(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".to_string(), request.mode.as_str().to_string()),
            ("line_items[0][price]".to_string(), request.price_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            ("customer_email".to_string(), request.email.clone()),
            ("client_reference_id".to_string(), request.email.clone()),
            (format!("metadata[{}]", USER_EMAIL_KEY), request.email.clone()),
        ];

        match request.mode {
            CheckoutMode::Subscription => {
                params.push((
                    format!("subscription_data[metadata][{}]", USER_EMAIL_KEY),
                    request.email.clone(),
                ));
            }
            CheckoutMode::Payment => {
                // One-time payments only create a customer when asked to
                params.push(("customer_creation".to_string(), "always".to_string()));
                params.push((
                    format!("payment_intent_data[metadata][{}]", USER_EMAIL_KEY),
                    request.email.clone(),
                ));
            }
        }

        let session: StripeCheckoutSession = self.post_form("checkout/sessions", &params).await?;
        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn get_checkout_session(&self, session_id: &str) -> AppResult<ProviderCheckoutSession> {
        let session: StripeCheckoutSession =
            self.get(&format!("checkout/sessions/{}", session_id)).await?;
        session.into_provider()
    }

    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> AppResult<String> {
        let params = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("return_url".to_string(), return_url.to_string()),
        ];

        let session: StripePortalSession =
            self.post_form("billing_portal/sessions", &params).await?;
        Ok(session.url)
    }
}

fn timestamp(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
}

// ============================================================================
// Stripe Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripePrice {
    pub id: String,
    pub recurring: Option<StripePriceRecurring>,
}

#[derive(Debug, Deserialize)]
pub struct StripePriceRecurring {
    pub interval: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    pub email: Option<String>,
    pub deleted: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StripeCustomerDetails {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub mode: Option<String>,
    pub payment_status: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    pub client_reference_id: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<StripeCustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StripeCheckoutSession {
    /// Emails that may identify the purchaser, most specific first.
    pub fn candidate_emails(&self) -> Vec<String> {
        let reference = self
            .client_reference_id
            .as_ref()
            .filter(|r| r.contains('@'));

        [
            self.metadata.get(USER_EMAIL_KEY),
            self.customer_details.as_ref().and_then(|d| d.email.as_ref()),
            self.customer_email.as_ref(),
            reference,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
    }

    pub fn into_provider(self) -> AppResult<ProviderCheckoutSession> {
        let mode = match self.mode.as_deref() {
            Some("payment") => CheckoutMode::Payment,
            Some("subscription") => CheckoutMode::Subscription,
            other => {
                return Err(AppError::InvalidInput(format!(
                    "Unsupported checkout mode: {:?}",
                    other
                )));
            }
        };

        Ok(ProviderCheckoutSession {
            emails: self.candidate_emails(),
            mode,
            payment_status: self.payment_status.unwrap_or_default(),
            id: self.id,
            customer_id: self.customer,
            subscription_id: self.subscription,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StripePortalSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    /// Moved onto subscription items in newer API versions
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub items: StripeSubscriptionItems,
}

impl StripeSubscription {
    pub fn into_provider(self) -> ProviderSubscription {
        let first = self.items.data.first();
        let interval = first
            .and_then(|item| item.price.recurring.as_ref())
            .map(|r| r.interval.clone());
        let period_start = self
            .current_period_start
            .or_else(|| first.and_then(|i| i.current_period_start));
        let period_end = self
            .current_period_end
            .or_else(|| first.and_then(|i| i.current_period_end));

        ProviderSubscription {
            interval,
            current_period_start: timestamp(period_start),
            current_period_end: timestamp(period_end),
            metadata_email: self.metadata.get(USER_EMAIL_KEY).cloned(),
            id: self.id,
            customer_id: self.customer,
            status: self.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItem {
    pub id: String,
    pub price: StripePrice,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeSubscriptionDetails {
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeInvoiceParent {
    pub subscription_details: Option<StripeSubscriptionDetails>,
}

#[derive(Debug, Deserialize)]
pub struct StripeInvoice {
    pub id: String,
    pub customer: Option<String>,
    pub customer_email: Option<String>,
    pub subscription: Option<String>,
    pub subscription_details: Option<StripeSubscriptionDetails>,
    /// Newer API versions nest subscription details here
    pub parent: Option<StripeInvoiceParent>,
}

impl StripeInvoice {
    pub fn into_event(self) -> InvoiceEvent {
        let nested = self.parent.and_then(|p| p.subscription_details);
        let details = self.subscription_details.or(nested).unwrap_or_default();

        InvoiceEvent {
            customer_id: self.customer,
            subscription_id: self.subscription.or(details.subscription),
            metadata_email: details.metadata.get(USER_EMAIL_KEY).cloned(),
            customer_email: self.customer_email,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeError,
}

#[derive(Debug, Deserialize)]
pub struct StripeError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: Option<String>,
    pub code: Option<String>,
}

// ============================================================================
// Webhook Event Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeWebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEventData {
    pub object: serde_json::Value,
}

impl StripeWebhookEvent {
    fn object<T: for<'de> Deserialize<'de>>(&self) -> AppResult<T> {
        serde_json::from_value(self.data.object.clone()).map_err(|e| {
            AppError::InvalidInput(format!("Malformed {} object: {}", self.event_type, e))
        })
    }

    /// Maps the provider payload onto a [`BillingEvent`]. Unhandled kinds
    /// become [`BillingEvent::Ignored`].
    pub fn into_provider_event(self) -> AppResult<ProviderEvent> {
        let event = match self.event_type.as_str() {
            "checkout.session.completed" => {
                let session = self.object::<StripeCheckoutSession>()?.into_provider()?;
                BillingEvent::CheckoutCompleted(CheckoutCompleted {
                    session_id: session.id,
                    mode: session.mode,
                    customer_id: session.customer_id,
                    subscription_id: session.subscription_id,
                    emails: session.emails,
                })
            }
            "customer.subscription.created" | "customer.subscription.updated" => {
                let subscription: StripeSubscription = self.object()?;
                BillingEvent::SubscriptionUpdated(subscription.into_provider())
            }
            "customer.subscription.deleted" => {
                let subscription: StripeSubscription = self.object()?;
                BillingEvent::SubscriptionDeleted(subscription.into_provider())
            }
            "invoice.payment_succeeded" | "invoice.paid" => {
                let invoice: StripeInvoice = self.object()?;
                BillingEvent::InvoicePaid(invoice.into_event())
            }
            "invoice.payment_failed" => {
                let invoice: StripeInvoice = self.object()?;
                BillingEvent::InvoicePaymentFailed(invoice.into_event())
            }
            _ => BillingEvent::Ignored,
        };

        Ok(ProviderEvent {
            id: self.id,
            event_type: self.event_type,
            event,
        })
    }
}
