//! Shared imports for route modules.

pub use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
pub use serde::{Deserialize, Serialize};
pub use tracing::{error, info, warn};

pub use crate::adapters::http::app_error_impl::{ValidatedJson, ValidatedQuery};
pub use crate::adapters::http::app_state::AppState;
pub use crate::app_error::{AppError, AppResult};
