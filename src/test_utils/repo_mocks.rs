//! In-memory mock implementations for the persistence traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        account::AccountRepo, billing_webhook::WebhookEventRepo, devices::DeviceRepo,
    },
    domain::entities::{
        account::{Account, BillingFields},
        device::{Device, DeviceAuthorization, NewDevice},
    },
};

// ============================================================================
// InMemoryAccountRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryAccountRepo {
    pub accounts: Mutex<HashMap<Uuid, Account>>,
}

impl InMemoryAccountRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts: Mutex::new(accounts.into_iter().map(|a| (a.id, a)).collect()),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Account> {
        self.accounts.lock().unwrap().get(&id).cloned()
    }

    pub fn find_by_email(&self, email: &str) -> Option<Account> {
        self.accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.email == email)
            .cloned()
    }
}

#[async_trait]
impl AccountRepo for InMemoryAccountRepo {
    async fn get_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        Ok(self.find_by_email(email))
    }

    async fn get_by_customer_id(&self, customer_id: &str) -> AppResult<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.stripe_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn create_if_absent(
        &self,
        email: &str,
        display_name: Option<&str>,
    ) -> AppResult<(Account, bool)> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(existing) = accounts.values().find(|a| a.email == email) {
            return Ok((existing.clone(), false));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: display_name.map(str::to_string),
            plan_type: Default::default(),
            subscription_status: Default::default(),
            stripe_customer_id: None,
            stripe_subscription_id: None,
            current_period_start: None,
            current_period_end: None,
            deletion_scheduled_at: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());
        Ok((account, true))
    }

    async fn update_billing_with(
        &self,
        account_id: Uuid,
        transition: &(dyn for<'b> Fn(&'b BillingFields) -> BillingFields + Send + Sync),
    ) -> AppResult<(Account, bool)> {
        // Holding the lock across read and write mirrors the row lock
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(&account_id).ok_or(AppError::NotFound)?;
        let current = account.billing();
        let next = transition(&current);
        if next == current {
            return Ok((account.clone(), false));
        }

        account.plan_type = next.plan_type;
        account.subscription_status = next.subscription_status;
        account.stripe_customer_id = next.stripe_customer_id;
        account.stripe_subscription_id = next.stripe_subscription_id;
        account.current_period_start = next.current_period_start;
        account.current_period_end = next.current_period_end;
        account.updated_at = Utc::now();
        Ok((account.clone(), true))
    }

    async fn set_deletion_schedule(
        &self,
        account_id: Uuid,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> AppResult<Account> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(&account_id).ok_or(AppError::NotFound)?;
        account.deletion_scheduled_at = scheduled_at;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn purge_scheduled(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut accounts = self.accounts.lock().unwrap();
        let before = accounts.len();
        accounts.retain(|_, a| a.deletion_scheduled_at.is_none_or(|at| at > now));
        Ok((before - accounts.len()) as u64)
    }
}

// ============================================================================
// FailingAccountRepo
// ============================================================================

/// Every call fails with a database error.
pub struct FailingAccountRepo;

#[async_trait]
impl AccountRepo for FailingAccountRepo {
    async fn get_by_email(&self, _email: &str) -> AppResult<Option<Account>> {
        Err(AppError::Database("connection refused".into()))
    }

    async fn get_by_customer_id(&self, _customer_id: &str) -> AppResult<Option<Account>> {
        Err(AppError::Database("connection refused".into()))
    }

    async fn create_if_absent(
        &self,
        _email: &str,
        _display_name: Option<&str>,
    ) -> AppResult<(Account, bool)> {
        Err(AppError::Database("connection refused".into()))
    }

    async fn update_billing_with(
        &self,
        _account_id: Uuid,
        _transition: &(dyn for<'b> Fn(&'b BillingFields) -> BillingFields + Send + Sync),
    ) -> AppResult<(Account, bool)> {
        Err(AppError::Database("connection refused".into()))
    }

    async fn set_deletion_schedule(
        &self,
        _account_id: Uuid,
        _scheduled_at: Option<DateTime<Utc>>,
    ) -> AppResult<Account> {
        Err(AppError::Database("connection refused".into()))
    }

    async fn purge_scheduled(&self, _now: DateTime<Utc>) -> AppResult<u64> {
        Err(AppError::Database("connection refused".into()))
    }
}

// ============================================================================
// InMemoryDeviceRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryDeviceRepo {
    pub devices: Mutex<Vec<Device>>,
}

impl InMemoryDeviceRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: Vec<Device>) -> Self {
        Self {
            devices: Mutex::new(devices),
        }
    }

    pub fn len(&self) -> usize {
        self.devices.lock().unwrap().len()
    }
}

#[async_trait]
impl DeviceRepo for InMemoryDeviceRepo {
    async fn authorize(
        &self,
        account_id: Uuid,
        max_devices: i64,
        device: &NewDevice,
    ) -> AppResult<DeviceAuthorization> {
        // The lock stands in for the row lock taken by the Postgres adapter
        let mut devices = self.devices.lock().unwrap();
        let now = Utc::now();

        if let Some(existing) = devices
            .iter_mut()
            .find(|d| d.user_id == account_id && d.device_id == device.device_id)
        {
            existing.last_seen = now;
            if let Some(metadata) = &device.metadata {
                existing.metadata = metadata.clone();
            }
            let device_count = devices.iter().filter(|d| d.user_id == account_id).count() as i64;
            return Ok(DeviceAuthorization::Existing { device_count });
        }

        let device_count = devices.iter().filter(|d| d.user_id == account_id).count() as i64;
        if device_count >= max_devices {
            return Ok(DeviceAuthorization::LimitReached { device_count });
        }

        devices.push(Device {
            id: Uuid::new_v4(),
            user_id: account_id,
            device_id: device.device_id.clone(),
            device_fingerprint: device.device_fingerprint.clone(),
            device_name: device.device_name.clone(),
            metadata: device.metadata.clone().unwrap_or_else(|| serde_json::json!({})),
            last_seen: now,
            created_at: now,
        });

        Ok(DeviceAuthorization::Registered {
            device_count: device_count + 1,
        })
    }

    async fn remove(&self, account_id: Uuid, device_id: &str) -> AppResult<Option<i64>> {
        let mut devices = self.devices.lock().unwrap();
        let before = devices.len();
        devices.retain(|d| !(d.user_id == account_id && d.device_id == device_id));
        if devices.len() == before {
            return Ok(None);
        }
        Ok(Some(
            devices.iter().filter(|d| d.user_id == account_id).count() as i64,
        ))
    }

    async fn list(&self, account_id: Uuid) -> AppResult<Vec<Device>> {
        let mut devices: Vec<Device> = self
            .devices
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.user_id == account_id)
            .cloned()
            .collect();
        devices.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(devices)
    }

    async fn count(&self, account_id: Uuid) -> AppResult<i64> {
        Ok(self
            .devices
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.user_id == account_id)
            .count() as i64)
    }
}

// ============================================================================
// InMemoryWebhookEventRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryWebhookEventRepo {
    pub processed: Mutex<HashSet<String>>,
}

impl InMemoryWebhookEventRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.processed.lock().unwrap().contains(event_id)
    }
}

#[async_trait]
impl WebhookEventRepo for InMemoryWebhookEventRepo {
    async fn is_processed(&self, event_id: &str) -> AppResult<bool> {
        Ok(self.contains(event_id))
    }

    async fn record_processed(&self, event_id: &str, _event_type: &str) -> AppResult<()> {
        self.processed.lock().unwrap().insert(event_id.to_string());
        Ok(())
    }
}
