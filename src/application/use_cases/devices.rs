use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::domain::entities::{
    account::Account,
    device::{Device, DeviceAuthorization, NewDevice},
    entitlement::Entitlement,
};
use crate::use_cases::{account::AccountRepo, entitlement::AdminPolicy};
use crate::validators::parse_email;

#[async_trait]
pub trait DeviceRepo: Send + Sync {
    /// Registers the device or refreshes it if already known, as one atomic
    /// operation. A new device is only inserted while the count is below
    /// `max_devices`.
    async fn authorize(
        &self,
        account_id: Uuid,
        max_devices: i64,
        device: &NewDevice,
    ) -> AppResult<DeviceAuthorization>;
    /// Returns the remaining count, or `None` if the device was not registered.
    async fn remove(&self, account_id: Uuid, device_id: &str) -> AppResult<Option<i64>>;
    async fn list(&self, account_id: Uuid) -> AppResult<Vec<Device>>;
    async fn count(&self, account_id: Uuid) -> AppResult<i64>;
}

#[derive(Debug, Clone)]
pub struct AuthorizeDeviceInput {
    pub email: String,
    pub device_id: String,
    pub device_name: Option<String>,
    pub device_fingerprint: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct AuthorizedDevice {
    pub is_new: bool,
    pub device_count: i64,
    pub entitlement: Entitlement,
}

#[derive(Debug, Clone)]
pub struct ListedDevice {
    pub device: Device,
    pub stale: bool,
}

#[derive(Debug, Clone)]
pub struct DeviceListing {
    pub devices: Vec<ListedDevice>,
    pub entitlement: Entitlement,
}

#[derive(Clone)]
pub struct DeviceUseCases {
    accounts: Arc<dyn AccountRepo>,
    devices: Arc<dyn DeviceRepo>,
    admin: AdminPolicy,
}

impl DeviceUseCases {
    pub fn new(
        accounts: Arc<dyn AccountRepo>,
        devices: Arc<dyn DeviceRepo>,
        admin: AdminPolicy,
    ) -> Self {
        Self {
            accounts,
            devices,
            admin,
        }
    }

    #[instrument(skip(self, input), fields(device_id = %input.device_id))]
    pub async fn authorize_device(&self, input: AuthorizeDeviceInput) -> AppResult<AuthorizedDevice> {
        let device_id = input.device_id.trim().to_string();
        if device_id.is_empty() {
            return Err(AppError::InvalidInput("device_id is required".into()));
        }

        let account = self.require_account(&input.email).await?;
        let entitlement = self.admin.entitlement(&account);
        let max_devices = entitlement.max_devices();

        let device = NewDevice::new(
            device_id,
            input.device_name,
            input.device_fingerprint,
            input.metadata,
        );

        match self.devices.authorize(account.id, max_devices, &device).await? {
            DeviceAuthorization::Existing { device_count } => Ok(AuthorizedDevice {
                is_new: false,
                device_count,
                entitlement,
            }),
            DeviceAuthorization::Registered { device_count } => {
                tracing::info!(account_id = %account.id, device_count, "Registered new device");
                Ok(AuthorizedDevice {
                    is_new: true,
                    device_count,
                    entitlement,
                })
            }
            DeviceAuthorization::LimitReached { device_count } => {
                tracing::info!(
                    account_id = %account.id,
                    device_count,
                    max_devices,
                    "Device limit reached"
                );
                Err(AppError::DeviceLimitReached {
                    device_count,
                    max_devices,
                    plan_type: entitlement.quota.as_str().to_string(),
                })
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn remove_device(&self, email: &str, device_id: &str) -> AppResult<i64> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(AppError::InvalidInput("device_id is required".into()));
        }

        let account = self.require_account(email).await?;
        self.devices
            .remove(account.id, device_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    #[instrument(skip(self))]
    pub async fn list_devices(&self, email: &str) -> AppResult<DeviceListing> {
        let account = self.require_account(email).await?;
        let now = Utc::now();

        let devices = self
            .devices
            .list(account.id)
            .await?
            .into_iter()
            .map(|device| ListedDevice {
                stale: device.is_stale(now),
                device,
            })
            .collect();

        Ok(DeviceListing {
            devices,
            entitlement: self.admin.entitlement(&account),
        })
    }

    async fn require_account(&self, email: &str) -> AppResult<Account> {
        let email = parse_email(email)?;
        self.accounts
            .get_by_email(&email)
            .await?
            .ok_or(AppError::NotFound)
    }
}
