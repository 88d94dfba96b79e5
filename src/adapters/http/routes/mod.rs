//! Public API routes, nested under `/api`.
//!
//! # Route Groups
//!
//! - **Devices**: authorize, remove and list devices
//! - **Subscription**: entitlement snapshot for the dashboard
//! - **Status**: polling reads that always answer `200`
//! - **Webhook**: Stripe event ingestion
//! - **Account**: provisioning and scheduled deletion
//! - **Checkout**: hosted checkout, session verification and billing portal

mod account;
mod checkout;
mod common;
mod devices;
mod status;
mod subscription;
mod webhook;

use crate::adapters::http::app_state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    devices::router()
        .merge(subscription::router())
        .merge(status::router())
        .merge(webhook::router())
        .merge(account::router())
        .merge(checkout::router())
}
