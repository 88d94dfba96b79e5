use std::sync::Arc;

use crate::{
    infra::config::AppConfig,
    ports::billing_provider::BillingProvider,
    use_cases::{
        account::{AccountRepo, AccountUseCases},
        billing_webhook::{BillingWebhookUseCases, WebhookEventRepo},
        checkout::CheckoutUseCases,
        devices::{DeviceRepo, DeviceUseCases},
        entitlement::{AdminPolicy, EntitlementUseCases},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub account_use_cases: Arc<AccountUseCases>,
    pub entitlement_use_cases: Arc<EntitlementUseCases>,
    pub device_use_cases: Arc<DeviceUseCases>,
    pub billing_webhook_use_cases: Arc<BillingWebhookUseCases>,
    pub checkout_use_cases: Arc<CheckoutUseCases>,
}

impl AppState {
    /// Wires the use cases over the given ports.
    pub fn from_parts(
        config: AppConfig,
        accounts: Arc<dyn AccountRepo>,
        devices: Arc<dyn DeviceRepo>,
        events: Arc<dyn WebhookEventRepo>,
        provider: Arc<dyn BillingProvider>,
    ) -> Self {
        let admin = AdminPolicy::new(config.admin_emails.iter().cloned());

        let account_use_cases = Arc::new(AccountUseCases::new(
            accounts.clone(),
            config.deletion_grace,
        ));

        let entitlement_use_cases = EntitlementUseCases::new(
            accounts.clone(),
            devices.clone(),
            admin.clone(),
        );

        let device_use_cases = DeviceUseCases::new(accounts.clone(), devices, admin);

        let billing_webhook_use_cases =
            BillingWebhookUseCases::new(accounts.clone(), events, provider.clone());

        let checkout_use_cases = CheckoutUseCases::new(
            accounts,
            account_use_cases.clone(),
            provider,
            config.stripe_prices.clone(),
            config.app_origin.clone(),
        );

        Self {
            config: Arc::new(config),
            account_use_cases,
            entitlement_use_cases: Arc::new(entitlement_use_cases),
            device_use_cases: Arc::new(device_use_cases),
            billing_webhook_use_cases: Arc::new(billing_webhook_use_cases),
            checkout_use_cases: Arc::new(checkout_use_cases),
        }
    }
}
