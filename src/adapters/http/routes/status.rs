//! Polling reads. Both endpoints answer `200` even when the lookup fails.

use super::common::*;
use chrono::Utc;
use tabkeep_types::{MeResponse, StatusResponse};

#[derive(Deserialize)]
struct StatusQuery {
    #[serde(default)]
    user: String,
}

#[derive(Deserialize)]
struct MeQuery {
    #[serde(default)]
    email: String,
}

/// GET /api/status?user=
async fn status(
    State(app_state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> impl IntoResponse {
    let report = app_state
        .entitlement_use_cases
        .status_or_default(&query.user)
        .await;
    let entitlement = report.view.entitlement;

    Json(StatusResponse {
        success: true,
        timestamp: Utc::now(),
        user: report.view.user,
        is_pro: entitlement.is_pro,
        plan_type: entitlement.plan_type.as_str().to_string(),
        subscription_status: entitlement.subscription_status.as_str().to_string(),
        max_devices: entitlement.max_devices(),
        device_count: report.view.device_count,
        degraded: report.degraded,
    })
}

/// GET /api/me?email=
async fn me(State(app_state): State<AppState>, Query(query): Query<MeQuery>) -> impl IntoResponse {
    let report = app_state
        .entitlement_use_cases
        .status_or_default(&query.email)
        .await;
    let entitlement = report.view.entitlement;

    Json(MeResponse {
        email: report.view.user,
        plan: if entitlement.is_pro { "pro" } else { "free" }.to_string(),
        is_pro: entitlement.is_pro,
        subscription_status: entitlement.subscription_status.as_str().to_string(),
        degraded: report.degraded,
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/me", get(me))
}
