use thiserror::Error;

pub use tabkeep_types::ErrorCode;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Not found")]
    NotFound,

    #[error("Device limit reached ({device_count}/{max_devices})")]
    DeviceLimitReached {
        device_count: i64,
        max_devices: i64,
        plan_type: String,
    },

    #[error("Payment provider error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::InvalidInput(_) => ErrorCode::InvalidInput,
            AppError::InvalidSignature(_) => ErrorCode::InvalidSignature,
            AppError::NotFound => ErrorCode::NotFound,
            AppError::DeviceLimitReached { .. } => ErrorCode::DeviceLimitReached,
            AppError::Upstream(_) => ErrorCode::UpstreamError,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether a webhook that failed with this error should be redelivered.
    ///
    /// Transient failures return `true`; conditions a retry cannot change return `false`.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(_) | AppError::Upstream(_) | AppError::Internal(_) => true,
            AppError::NotFound
            | AppError::InvalidInput(_)
            | AppError::InvalidSignature(_)
            | AppError::DeviceLimitReached { .. } => false,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
