//! Test app state builder for HTTP-level testing.
//!
//! `TestAppStateBuilder` wires the real use cases over in-memory repositories
//! and a scripted billing provider.

use std::sync::Arc;

use chrono::Duration;
use secrecy::SecretString;
use url::Url;

use crate::{
    adapters::http::app_state::AppState,
    domain::entities::{account::Account, device::Device},
    infra::config::AppConfig,
    test_utils::{
        FailingAccountRepo, InMemoryAccountRepo, InMemoryDeviceRepo, InMemoryWebhookEventRepo,
        StubBillingProvider,
    },
    use_cases::{account::AccountRepo, checkout::PriceCatalog},
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";
pub const TEST_APP_ORIGIN: &str = "https://tabkeep.test";

pub fn test_config(admin_emails: Vec<String>) -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".parse().expect("valid socket address"),
        database_url: "postgres://unused".into(),
        app_origin: Url::parse(TEST_APP_ORIGIN).expect("valid origin"),
        stripe_secret_key: SecretString::new("sk_test".into()),
        stripe_webhook_secret: SecretString::new(TEST_WEBHOOK_SECRET.into()),
        stripe_prices: PriceCatalog {
            monthly: "price_monthly".into(),
            yearly: "price_yearly".into(),
            lifetime: "price_lifetime".into(),
        },
        admin_emails,
        deletion_grace: Duration::hours(24),
        deletion_sweep_interval_secs: 3600,
        webhook_tolerance_secs: 300,
    }
}

/// Handles to the in-memory collaborators behind a built `AppState`.
pub struct TestMocks {
    pub accounts: Arc<InMemoryAccountRepo>,
    pub devices: Arc<InMemoryDeviceRepo>,
    pub events: Arc<InMemoryWebhookEventRepo>,
    pub provider: Arc<StubBillingProvider>,
}

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let account = create_test_account(|a| a.email = "a@example.com".into());
/// let device = create_test_device(account.id, |_| {});
///
/// let app_state = TestAppStateBuilder::new()
///     .with_account(account)
///     .with_device(device)
///     .build();
/// ```
#[derive(Default)]
pub struct TestAppStateBuilder {
    accounts: Vec<Account>,
    devices: Vec<Device>,
    admin_emails: Vec<String>,
    provider: Option<Arc<StubBillingProvider>>,
    failing_accounts: bool,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, account: Account) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.devices.push(device);
        self
    }

    pub fn with_admin_email(mut self, email: &str) -> Self {
        self.admin_emails.push(email.to_string());
        self
    }

    pub fn with_provider(mut self, provider: Arc<StubBillingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Every account lookup fails with a database error.
    pub fn with_failing_accounts(mut self) -> Self {
        self.failing_accounts = true;
        self
    }

    pub fn build(self) -> AppState {
        self.build_with_mocks().0
    }

    pub fn build_with_mocks(self) -> (AppState, TestMocks) {
        let mocks = TestMocks {
            accounts: Arc::new(InMemoryAccountRepo::with_accounts(self.accounts)),
            devices: Arc::new(InMemoryDeviceRepo::with_devices(self.devices)),
            events: Arc::new(InMemoryWebhookEventRepo::new()),
            provider: self
                .provider
                .unwrap_or_else(|| Arc::new(StubBillingProvider::new())),
        };

        let accounts: Arc<dyn AccountRepo> = if self.failing_accounts {
            Arc::new(FailingAccountRepo)
        } else {
            mocks.accounts.clone()
        };

        let app_state = AppState::from_parts(
            test_config(self.admin_emails),
            accounts,
            mocks.devices.clone(),
            mocks.events.clone(),
            mocks.provider.clone(),
        );

        (app_state, mocks)
    }
}
