use tabkeep_types::ErrorCode;
use thiserror::Error;

/// SDK-specific errors.
#[derive(Debug, Error)]
pub enum TabkeepError {
    /// API returned an error body
    #[error("API error: {code} - {message}")]
    ApiError { code: ErrorCode, message: String },

    /// Device quota exhausted; carries the counts needed for an upgrade prompt
    #[error("Device limit reached ({device_count}/{max_devices} on {plan_type})")]
    DeviceLimitReached {
        device_count: i64,
        max_devices: i64,
        plan_type: String,
    },

    /// Network error (only with `client` feature)
    #[cfg(feature = "client")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Unexpected response shape or status
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
