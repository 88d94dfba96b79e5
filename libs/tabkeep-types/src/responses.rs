use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a successful `POST /api/authorize-device`.
///
/// Exactly one of `is_new` / `is_existing` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeDeviceResponse {
    pub success: bool,
    pub authorized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_new: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_existing: Option<bool>,
    pub device_count: i64,
    pub max_devices: i64,
    /// Quota class: "free", "pro" or "admin"
    pub plan_type: String,
}

/// Body of a `403` from `POST /api/authorize-device`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLimitResponse {
    pub success: bool,
    pub authorized: bool,
    pub error: String,
    pub message: String,
    pub device_count: i64,
    pub max_devices: i64,
    pub plan_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveDeviceResponse {
    pub success: bool,
    pub remaining_devices: i64,
}

/// One row of the device management listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub device_id: String,
    pub device_name: String,
    pub device_fingerprint: String,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Not seen for longer than the inactivity window. Informational only.
    pub stale: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDevicesResponse {
    pub success: bool,
    pub devices: Vec<DeviceSummary>,
    pub device_count: i64,
    pub max_devices: i64,
    pub plan_type: String,
}

/// Body of `POST /api/get-subscription`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub success: bool,
    pub is_pro: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_admin: bool,
    pub subscription_status: String,
    pub subscription_type: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub next_billing_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_subscription_id: Option<String>,
}

/// Body of `GET /api/status`. Always served with `200`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub is_pro: bool,
    pub plan_type: String,
    pub subscription_status: String,
    pub max_devices: i64,
    pub device_count: i64,
    /// Set when the lookup failed and the body is the free fallback.
    #[serde(default)]
    pub degraded: bool,
}

/// Body of `GET /api/me`. Always served with `200`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub email: String,
    /// "pro" or "free"
    pub plan: String,
    pub is_pro: bool,
    pub subscription_status: String,
    #[serde(default)]
    pub degraded: bool,
}
