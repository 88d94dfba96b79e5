//! Wire types shared by the TabKeep entitlement API and its clients.
//!
//! This crate provides:
//! - Response bodies for the device, subscription and status endpoints
//! - Machine-readable error codes carried in error bodies

mod errors;
mod responses;

pub use errors::{ErrorBody, ErrorCode};
pub use responses::{
    AuthorizeDeviceResponse, DeviceLimitResponse, DeviceSummary, ListDevicesResponse,
    MeResponse, RemoveDeviceResponse, StatusResponse, SubscriptionResponse,
};
