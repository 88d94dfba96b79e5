pub mod account;
pub mod billing_webhook;
pub mod checkout;
pub mod devices;
pub mod entitlement;
