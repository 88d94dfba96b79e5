use std::sync::Arc;

use tracing::instrument;
use url::Url;

use crate::app_error::{AppError, AppResult};
use crate::application::ports::billing_provider::{
    BillingProvider, CheckoutMode, CheckoutRequest, CheckoutSession,
};
use crate::use_cases::account::{AccountRepo, AccountUseCases};
use crate::validators::parse_email;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutPlan {
    Monthly,
    Yearly,
    Lifetime,
}

impl CheckoutPlan {
    pub fn mode(&self) -> CheckoutMode {
        match self {
            CheckoutPlan::Monthly | CheckoutPlan::Yearly => CheckoutMode::Subscription,
            CheckoutPlan::Lifetime => CheckoutMode::Payment,
        }
    }
}

impl std::str::FromStr for CheckoutPlan {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" => Ok(CheckoutPlan::Monthly),
            "yearly" | "year" | "annual" => Ok(CheckoutPlan::Yearly),
            "lifetime" => Ok(CheckoutPlan::Lifetime),
            _ => Err(AppError::InvalidInput(format!("Unknown plan: {}", s))),
        }
    }
}

/// Configured provider price ids for each offer.
#[derive(Debug, Clone)]
pub struct PriceCatalog {
    pub monthly: String,
    pub yearly: String,
    pub lifetime: String,
}

impl PriceCatalog {
    pub fn price_for(&self, plan: CheckoutPlan) -> &str {
        match plan {
            CheckoutPlan::Monthly => &self.monthly,
            CheckoutPlan::Yearly => &self.yearly,
            CheckoutPlan::Lifetime => &self.lifetime,
        }
    }
}

#[derive(Clone)]
pub struct CheckoutUseCases {
    accounts: Arc<dyn AccountRepo>,
    account_use_cases: Arc<AccountUseCases>,
    provider: Arc<dyn BillingProvider>,
    prices: PriceCatalog,
    app_origin: Url,
}

impl CheckoutUseCases {
    pub fn new(
        accounts: Arc<dyn AccountRepo>,
        account_use_cases: Arc<AccountUseCases>,
        provider: Arc<dyn BillingProvider>,
        prices: PriceCatalog,
        app_origin: Url,
    ) -> Self {
        Self {
            accounts,
            account_use_cases,
            provider,
            prices,
            app_origin,
        }
    }

    fn origin(&self) -> &str {
        self.app_origin.as_str().trim_end_matches('/')
    }

    /// Starts a hosted checkout. The account is provisioned if it does not
    /// exist yet so the webhook can always resolve it.
    #[instrument(skip(self))]
    pub async fn create_checkout_session(
        &self,
        email: &str,
        plan: CheckoutPlan,
    ) -> AppResult<CheckoutSession> {
        let account = self.account_use_cases.get_or_provision(email).await?;
        let encoded_email: String =
            url::form_urlencoded::byte_serialize(account.email.as_bytes()).collect();

        let request = CheckoutRequest {
            email: account.email.clone(),
            price_id: self.prices.price_for(plan).to_string(),
            mode: plan.mode(),
            success_url: format!(
                "{}/payment-success.html?session_id={{CHECKOUT_SESSION_ID}}&email={}",
                self.origin(),
                encoded_email
            ),
            cancel_url: format!("{}/dashboard.html", self.origin()),
        };

        let session = self.provider.create_checkout_session(&request).await?;
        tracing::info!(account_id = %account.id, session_id = %session.id, ?plan, "Checkout session created");
        Ok(session)
    }

    /// Returns a billing-portal URL for an account that has paid before.
    ///
    /// `return_url` is honored only when it points at the app origin.
    #[instrument(skip(self))]
    pub async fn billing_portal(&self, email: &str, return_url: Option<&str>) -> AppResult<String> {
        let email = parse_email(email)?;
        let account = self
            .accounts
            .get_by_email(&email)
            .await?
            .ok_or(AppError::NotFound)?;
        let customer_id = account
            .stripe_customer_id
            .as_deref()
            .ok_or(AppError::NotFound)?;

        let default_return = format!("{}/dashboard.html", self.origin());
        let return_url = match return_url {
            Some(url) if self.is_same_origin(url) => url.to_string(),
            _ => default_return,
        };

        self.provider
            .create_portal_session(customer_id, &return_url)
            .await
    }

    fn is_same_origin(&self, candidate: &str) -> bool {
        Url::parse(candidate)
            .map(|u| u.origin() == self.app_origin.origin())
            .unwrap_or(false)
    }
}
