//! Rust SDK for the TabKeep entitlement API.
//!
//! # Features
//!
//! - **Device gate** - Authorize or remove a device against the account's quota
//! - **Status reads** - Fetch the current entitlement snapshot
//! - **Reconciliation** - Poll after checkout until the upgrade lands
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tabkeep_sdk::{ReconciliationPoller, TabkeepClient, TabkeepConfig};
//!
//! let client = Arc::new(TabkeepClient::new(TabkeepConfig {
//!     base_url: "https://tabkeep.app".to_string(),
//! })?);
//!
//! // After redirecting the user to checkout
//! let handle = ReconciliationPoller::new(client, "user@example.com").spawn(listener);
//! ```

mod client;
mod error;
mod poller;

pub use client::{AuthorizeDeviceRequest, TabkeepClient, TabkeepConfig};
pub use error::TabkeepError;
pub use poller::{
    EntitlementSource, PollOutcome, PollerConfig, PollerHandle, ReconciliationListener,
    ReconciliationPoller,
};

// Re-export shared types for convenience
pub use tabkeep_types::{
    AuthorizeDeviceResponse, DeviceLimitResponse, ErrorCode, RemoveDeviceResponse, StatusResponse,
};
