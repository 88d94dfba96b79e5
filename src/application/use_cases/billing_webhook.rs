//! Payment event ingestion.
//!
//! Provider events are parsed by the infra layer into [`BillingEvent`]s. This
//! module resolves the affected account, computes the new billing columns
//! with [`apply_transition`] and records the event id once applied.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::ports::billing_provider::{
    BillingProvider, CheckoutMode, ProviderSubscription,
};
use crate::domain::entities::{
    account::{Account, BillingFields},
    plan_tier::PlanTier,
    subscription_status::SubscriptionStatus,
};
use crate::use_cases::account::AccountRepo;
use crate::validators::{is_valid_email, normalize_email};

#[async_trait]
pub trait WebhookEventRepo: Send + Sync {
    async fn is_processed(&self, event_id: &str) -> AppResult<bool>;
    /// Recording an id twice is not an error.
    async fn record_processed(&self, event_id: &str, event_type: &str) -> AppResult<()>;
}

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone)]
pub struct CheckoutCompleted {
    pub session_id: String,
    pub mode: CheckoutMode,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    /// Candidate emails in resolution order
    pub emails: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InvoiceEvent {
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub metadata_email: Option<String>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone)]
pub enum BillingEvent {
    CheckoutCompleted(CheckoutCompleted),
    /// `customer.subscription.created` and `.updated`
    SubscriptionUpdated(ProviderSubscription),
    SubscriptionDeleted(ProviderSubscription),
    /// `invoice.payment_succeeded` and `invoice.paid`
    InvoicePaid(InvoiceEvent),
    InvoicePaymentFailed(InvoiceEvent),
    /// Any other event kind. Acknowledged without effect.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct ProviderEvent {
    pub id: String,
    pub event_type: String,
    pub event: BillingEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Applied,
    Duplicate,
    Ignored,
}

/// Result of reading a checkout session back from the provider.
#[derive(Debug, Clone)]
pub enum SessionVerification {
    /// Payment has not completed; nothing was written.
    Unpaid { payment_status: String },
    /// The purchase was applied; carries the updated account.
    Paid(Account),
}

// ============================================================================
// Transitions
// ============================================================================

/// Account-level effect of an event, with provider data already fetched.
#[derive(Debug, Clone)]
pub enum BillingChange {
    SubscriptionStarted {
        customer_id: Option<String>,
        subscription: ProviderSubscription,
    },
    LifetimePurchased {
        customer_id: Option<String>,
    },
    SubscriptionSynced(ProviderSubscription),
    SubscriptionCanceled {
        subscription_id: String,
    },
    InvoicePaid {
        subscription: Option<ProviderSubscription>,
    },
    InvoiceFailed {
        subscription_id: Option<String>,
    },
}

/// Whether an event about `subscription_id` concerns the subscription the
/// account currently holds. Unknown ids on either side do not disqualify.
fn is_current_subscription(current: &BillingFields, subscription_id: Option<&str>) -> bool {
    match (current.stripe_subscription_id.as_deref(), subscription_id) {
        (Some(stored), Some(incoming)) => stored == incoming,
        _ => true,
    }
}

/// Computes the billing columns after `change`.
///
/// Every branch assigns absolute values, so applying the same change twice
/// yields the same fields as applying it once.
pub fn apply_transition(current: &BillingFields, change: &BillingChange) -> BillingFields {
    let mut next = current.clone();

    // First customer id wins
    let link_customer = |next: &mut BillingFields, customer_id: Option<&str>| {
        if next.stripe_customer_id.is_none() {
            next.stripe_customer_id = customer_id.map(str::to_string);
        }
    };

    if current.plan_type.is_sticky() {
        match change {
            BillingChange::SubscriptionStarted { customer_id, .. }
            | BillingChange::LifetimePurchased { customer_id } => {
                link_customer(&mut next, customer_id.as_deref());
            }
            _ => {}
        }
        return next;
    }

    match change {
        BillingChange::SubscriptionStarted {
            customer_id,
            subscription,
        } => {
            link_customer(
                &mut next,
                customer_id.as_deref().or(Some(subscription.customer_id.as_str())),
            );
            next.plan_type = PlanTier::from_interval(subscription.interval.as_deref());
            next.subscription_status = SubscriptionStatus::Active;
            next.stripe_subscription_id = Some(subscription.id.clone());
            next.current_period_start = subscription.current_period_start;
            next.current_period_end = subscription.current_period_end;
        }
        BillingChange::LifetimePurchased { customer_id } => {
            link_customer(&mut next, customer_id.as_deref());
            next.plan_type = PlanTier::ProLifetime;
            next.subscription_status = SubscriptionStatus::Lifetime;
            next.current_period_end = None;
        }
        BillingChange::SubscriptionSynced(subscription) => {
            link_customer(&mut next, Some(&subscription.customer_id));
            next.plan_type = PlanTier::from_interval(subscription.interval.as_deref());
            // An `incomplete` snapshot delivered late never demotes the same
            // subscription once it has been activated
            let stale_incomplete = subscription.status == "incomplete"
                && current.stripe_subscription_id.as_deref() == Some(subscription.id.as_str())
                && current.subscription_status == SubscriptionStatus::Active;
            if !stale_incomplete {
                next.subscription_status = SubscriptionStatus::from_stripe(&subscription.status);
            }
            next.stripe_subscription_id = Some(subscription.id.clone());
            next.current_period_start = subscription.current_period_start;
            next.current_period_end = subscription.current_period_end;
        }
        BillingChange::SubscriptionCanceled { subscription_id } => {
            // A replaced subscription ending must not cancel its successor,
            // and a free account has nothing to cancel
            let is_current = match current.stripe_subscription_id.as_deref() {
                Some(stored) => stored == subscription_id,
                None => current.plan_type.is_paid(),
            };
            if is_current {
                next.subscription_status = SubscriptionStatus::Canceled;
            }
        }
        BillingChange::InvoicePaid { subscription } => {
            let applies = subscription.as_ref().filter(|s| {
                is_current_subscription(current, Some(s.id.as_str()))
                    && SubscriptionStatus::from_stripe(&s.status) != SubscriptionStatus::Canceled
            });
            if let Some(subscription) = applies {
                if !current.plan_type.is_paid() {
                    next.plan_type = PlanTier::from_interval(subscription.interval.as_deref());
                }
                link_customer(&mut next, Some(&subscription.customer_id));
                next.subscription_status = SubscriptionStatus::Active;
                next.stripe_subscription_id = Some(subscription.id.clone());
                next.current_period_start = subscription.current_period_start;
                next.current_period_end = subscription.current_period_end;
            }
        }
        BillingChange::InvoiceFailed { subscription_id } => {
            // Only a live subscription can fall behind; a canceled one stays canceled
            let live = matches!(
                current.subscription_status,
                SubscriptionStatus::Active | SubscriptionStatus::PastDue
            );
            if current.plan_type.is_paid()
                && live
                && is_current_subscription(current, subscription_id.as_deref())
            {
                next.subscription_status = SubscriptionStatus::PastDue;
            }
        }
    }

    next
}

// ============================================================================
// Use cases
// ============================================================================

#[derive(Clone)]
pub struct BillingWebhookUseCases {
    accounts: Arc<dyn AccountRepo>,
    events: Arc<dyn WebhookEventRepo>,
    provider: Arc<dyn BillingProvider>,
}

impl BillingWebhookUseCases {
    pub fn new(
        accounts: Arc<dyn AccountRepo>,
        events: Arc<dyn WebhookEventRepo>,
        provider: Arc<dyn BillingProvider>,
    ) -> Self {
        Self {
            accounts,
            events,
            provider,
        }
    }

    /// Applies a verified provider event.
    ///
    /// The event id is recorded only after the account update succeeded, so a
    /// failed attempt is retried in full on redelivery.
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn ingest(&self, event: ProviderEvent) -> AppResult<IngestOutcome> {
        if matches!(event.event, BillingEvent::Ignored) {
            tracing::debug!("Ignoring unhandled event type");
            return Ok(IngestOutcome::Ignored);
        }

        if self.events.is_processed(&event.id).await? {
            tracing::info!("Event already processed");
            return Ok(IngestOutcome::Duplicate);
        }

        let (account, change) = match event.event {
            BillingEvent::CheckoutCompleted(session) => self.checkout_change(session).await?,
            BillingEvent::SubscriptionUpdated(subscription) => {
                let account = self
                    .resolve_account(
                        Some(&subscription.customer_id),
                        subscription.metadata_email.as_deref(),
                        None,
                    )
                    .await?;
                (account, BillingChange::SubscriptionSynced(subscription))
            }
            BillingEvent::SubscriptionDeleted(subscription) => {
                let account = self
                    .resolve_account(
                        Some(&subscription.customer_id),
                        subscription.metadata_email.as_deref(),
                        None,
                    )
                    .await?;
                (
                    account,
                    BillingChange::SubscriptionCanceled {
                        subscription_id: subscription.id,
                    },
                )
            }
            BillingEvent::InvoicePaid(invoice) => {
                let account = self.resolve_invoice_account(&invoice).await?;
                let subscription = match &invoice.subscription_id {
                    Some(id) => Some(self.provider.get_subscription(id).await?),
                    None => None,
                };
                (account, BillingChange::InvoicePaid { subscription })
            }
            BillingEvent::InvoicePaymentFailed(invoice) => {
                let account = self.resolve_invoice_account(&invoice).await?;
                (
                    account,
                    BillingChange::InvoiceFailed {
                        subscription_id: invoice.subscription_id,
                    },
                )
            }
            BillingEvent::Ignored => return Ok(IngestOutcome::Ignored),
        };

        self.apply_change(account.id, &change).await?;

        self.events
            .record_processed(&event.id, &event.event_type)
            .await?;

        Ok(IngestOutcome::Applied)
    }

    /// Pull side of reconciliation: the success page hands back the session
    /// id and the purchase is applied without waiting for the webhook. Uses
    /// the same transition as `checkout.session.completed`, so the later
    /// delivery converges on the same row.
    #[instrument(skip(self))]
    pub async fn verify_session(&self, session_id: &str) -> AppResult<SessionVerification> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(AppError::InvalidInput("session_id is required".into()));
        }
        if !session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AppError::InvalidInput("Malformed session_id".into()));
        }

        let session = self.provider.get_checkout_session(session_id).await?;
        if !session.is_paid() {
            tracing::info!(payment_status = %session.payment_status, "Checkout session not paid");
            return Ok(SessionVerification::Unpaid {
                payment_status: session.payment_status,
            });
        }

        let (account, change) = self
            .checkout_change(CheckoutCompleted {
                session_id: session.id,
                mode: session.mode,
                customer_id: session.customer_id,
                subscription_id: session.subscription_id,
                emails: session.emails,
            })
            .await?;

        let account = self.apply_change(account.id, &change).await?;
        Ok(SessionVerification::Paid(account))
    }

    /// Applies `change` to the freshly locked account row, so concurrent
    /// deliveries for one account never overwrite each other's fields.
    async fn apply_change(&self, account_id: Uuid, change: &BillingChange) -> AppResult<Account> {
        let (account, changed) = self
            .accounts
            .update_billing_with(account_id, &|current: &BillingFields| {
                apply_transition(current, change)
            })
            .await?;

        if changed {
            tracing::info!(
                account_id = %account.id,
                plan_type = %account.plan_type,
                subscription_status = %account.subscription_status,
                "Account billing updated"
            );
        }
        Ok(account)
    }

    async fn checkout_change(&self, session: CheckoutCompleted) -> AppResult<(Account, BillingChange)> {
        let email = session
            .emails
            .iter()
            .map(|e| normalize_email(e))
            .find(|e| is_valid_email(e));

        let account = match (email, session.customer_id.as_deref()) {
            (Some(email), _) => self.accounts.create_if_absent(&email, None).await?.0,
            (None, Some(customer_id)) => self
                .accounts
                .get_by_customer_id(customer_id)
                .await?
                .ok_or(AppError::NotFound)?,
            (None, None) => {
                return Err(AppError::InvalidInput(format!(
                    "Checkout session {} carries no account reference",
                    session.session_id
                )));
            }
        };

        let change = match session.mode {
            CheckoutMode::Subscription => {
                let subscription_id = session.subscription_id.as_deref().ok_or_else(|| {
                    AppError::InvalidInput("Subscription checkout without subscription id".into())
                })?;
                let subscription = self.provider.get_subscription(subscription_id).await?;
                BillingChange::SubscriptionStarted {
                    customer_id: session.customer_id,
                    subscription,
                }
            }
            CheckoutMode::Payment => BillingChange::LifetimePurchased {
                customer_id: session.customer_id,
            },
        };

        Ok((account, change))
    }

    async fn resolve_invoice_account(&self, invoice: &InvoiceEvent) -> AppResult<Account> {
        self.resolve_account(
            invoice.customer_id.as_deref(),
            invoice.metadata_email.as_deref(),
            invoice.customer_email.as_deref(),
        )
        .await
    }

    /// Stored customer id, then checkout metadata email, then the provider's
    /// customer email.
    async fn resolve_account(
        &self,
        customer_id: Option<&str>,
        metadata_email: Option<&str>,
        known_customer_email: Option<&str>,
    ) -> AppResult<Account> {
        if let Some(customer_id) = customer_id {
            if let Some(account) = self.accounts.get_by_customer_id(customer_id).await? {
                return Ok(account);
            }
        }

        if let Some(email) = metadata_email {
            if let Some(account) = self.accounts.get_by_email(&normalize_email(email)).await? {
                return Ok(account);
            }
        }

        let customer_email = match (known_customer_email, customer_id) {
            (Some(email), _) => Some(email.to_string()),
            (None, Some(customer_id)) => self.provider.get_customer_email(customer_id).await?,
            (None, None) => None,
        };

        if let Some(email) = customer_email {
            if let Some(account) = self.accounts.get_by_email(&normalize_email(&email)).await? {
                return Ok(account);
            }
        }

        tracing::warn!(customer_id = ?customer_id, "No account matches billing event");
        Err(AppError::NotFound)
    }
}
