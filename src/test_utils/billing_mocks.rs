//! Scripted billing provider for use case and route tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::{
    app_error::{AppError, AppResult},
    application::ports::billing_provider::{
        BillingProvider, CheckoutRequest, CheckoutSession, ProviderCheckoutSession,
        ProviderSubscription,
    },
};

#[derive(Default)]
pub struct StubBillingProvider {
    subscriptions: Mutex<HashMap<String, ProviderSubscription>>,
    customer_emails: Mutex<HashMap<String, String>>,
    checkout_sessions: Mutex<HashMap<String, ProviderCheckoutSession>>,
    checkouts: Mutex<Vec<CheckoutRequest>>,
    portal_return_urls: Mutex<Vec<String>>,
    subscription_fetches: AtomicUsize,
    fail: AtomicBool,
}

impl StubBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_subscription(&self, subscription: ProviderSubscription) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id.clone(), subscription);
    }

    pub fn put_customer_email(&self, customer_id: &str, email: &str) {
        self.customer_emails
            .lock()
            .unwrap()
            .insert(customer_id.to_string(), email.to_string());
    }

    pub fn put_checkout_session(&self, session: ProviderCheckoutSession) {
        self.checkout_sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }

    /// While set, every call fails like a provider outage.
    pub fn fail_next_requests(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn subscription_fetches(&self) -> usize {
        self.subscription_fetches.load(Ordering::SeqCst)
    }

    pub fn last_checkout(&self) -> Option<CheckoutRequest> {
        self.checkouts.lock().unwrap().last().cloned()
    }

    pub fn last_portal_return_url(&self) -> Option<String> {
        self.portal_return_urls.lock().unwrap().last().cloned()
    }

    fn check_outage(&self) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("provider unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BillingProvider for StubBillingProvider {
    async fn get_subscription(&self, subscription_id: &str) -> AppResult<ProviderSubscription> {
        self.check_outage()?;
        self.subscription_fetches.fetch_add(1, Ordering::SeqCst);
        self.subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn get_customer_email(&self, customer_id: &str) -> AppResult<Option<String>> {
        self.check_outage()?;
        Ok(self.customer_emails.lock().unwrap().get(customer_id).cloned())
    }

    async fn create_checkout_session(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession> {
        self.check_outage()?;
        let mut checkouts = self.checkouts.lock().unwrap();
        checkouts.push(request.clone());
        let id = format!("cs_test_{}", checkouts.len());
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.stripe.test/pay/{}", id)),
            id,
        })
    }

    async fn get_checkout_session(&self, session_id: &str) -> AppResult<ProviderCheckoutSession> {
        self.check_outage()?;
        self.checkout_sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> AppResult<String> {
        self.check_outage()?;
        self.portal_return_urls
            .lock()
            .unwrap()
            .push(return_url.to_string());
        Ok(format!("https://billing.stripe.test/session/{}", customer_id))
    }
}
