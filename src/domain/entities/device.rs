use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Devices not seen for this long are flagged as stale in listings.
pub const DEVICE_INACTIVITY_DAYS: i64 = 30;

pub const DEFAULT_DEVICE_NAME: &str = "Unknown Device";

#[derive(Debug, Clone)]
pub struct Device {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_id: String,
    pub device_fingerprint: String,
    pub device_name: String,
    pub metadata: serde_json::Value,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Device {
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.last_seen > Duration::days(DEVICE_INACTIVITY_DAYS)
    }
}

/// A device registration request with defaults applied.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub device_id: String,
    pub device_fingerprint: String,
    pub device_name: String,
    pub metadata: Option<serde_json::Value>,
}

impl NewDevice {
    pub fn new(
        device_id: String,
        device_name: Option<String>,
        device_fingerprint: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        let device_fingerprint = device_fingerprint
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| device_id.clone());
        let device_name = device_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string());

        Self {
            device_id,
            device_fingerprint,
            device_name,
            metadata,
        }
    }
}

/// Outcome of the atomic count-then-insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAuthorization {
    /// Device was already registered; `last_seen` refreshed.
    Existing { device_count: i64 },
    /// Device inserted.
    Registered { device_count: i64 },
    /// Quota exhausted; nothing written.
    LimitReached { device_count: i64 },
}
