use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use tabkeep_types::{DeviceLimitResponse, ErrorBody};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        tracing::error!(error = ?self, "Request failed");

        match self {
            AppError::InvalidInput(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, msg)
            }
            AppError::InvalidSignature(_) => error_resp(
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidSignature,
                "Webhook signature verification failed".into(),
            ),
            AppError::NotFound => {
                error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, "Not found".into())
            }
            AppError::DeviceLimitReached {
                device_count,
                max_devices,
                plan_type,
            } => {
                let body = DeviceLimitResponse {
                    success: false,
                    authorized: false,
                    error: "Device limit reached".into(),
                    message: format!(
                        "This account already uses {} of {} devices. Remove a device or upgrade to add another.",
                        device_count, max_devices
                    ),
                    device_count,
                    max_devices,
                    plan_type,
                };
                (StatusCode::FORBIDDEN, Json(body)).into_response()
            }
            AppError::Upstream(_) => error_resp(
                StatusCode::BAD_GATEWAY,
                ErrorCode::UpstreamError,
                "Payment provider unavailable".into(),
            ),
            AppError::Database(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::DatabaseError,
                "Internal server error".into(),
            ),
            AppError::Internal(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                "Internal server error".into(),
            ),
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: String) -> Response {
    (status, Json(ErrorBody::new(code, message))).into_response()
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(format!("Invalid query string: {}", rejection.body_text()))
    }
}

/// JSON body extractor whose rejections (missing fields, wrong types, bad
/// syntax) render as a 400 [`ErrorBody`] instead of axum's plain-text 422.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state).await?;
        Ok(ValidatedJson(inner))
    }
}

/// Query string counterpart of [`ValidatedJson`].
#[derive(Debug, Clone, Copy)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(inner) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ValidatedQuery(inner))
    }
}
