pub mod account;
pub mod device;
pub mod entitlement;
pub mod plan_tier;
pub mod subscription_status;
