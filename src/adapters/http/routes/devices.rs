//! Device gate routes.

use super::common::*;
use crate::use_cases::devices::AuthorizeDeviceInput;
use tabkeep_types::{
    AuthorizeDeviceResponse, DeviceSummary, ListDevicesResponse, RemoveDeviceResponse,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeDevicePayload {
    email: String,
    #[serde(alias = "device_id")]
    device_id: String,
    #[serde(default, alias = "device_name")]
    device_name: Option<String>,
    #[serde(default, alias = "device_fingerprint")]
    device_fingerprint: Option<String>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveDevicePayload {
    email: String,
    #[serde(alias = "device_id")]
    device_id: String,
}

#[derive(Deserialize)]
struct DevicesQuery {
    email: String,
}

/// POST /api/authorize-device
async fn authorize_device(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<AuthorizeDevicePayload>,
) -> AppResult<impl IntoResponse> {
    let authorized = app_state
        .device_use_cases
        .authorize_device(AuthorizeDeviceInput {
            email: payload.email,
            device_id: payload.device_id,
            device_name: payload.device_name,
            device_fingerprint: payload.device_fingerprint,
            metadata: payload.metadata,
        })
        .await?;

    Ok(Json(AuthorizeDeviceResponse {
        success: true,
        authorized: true,
        is_new: authorized.is_new.then_some(true),
        is_existing: (!authorized.is_new).then_some(true),
        device_count: authorized.device_count,
        max_devices: authorized.entitlement.max_devices(),
        plan_type: authorized.entitlement.quota.as_str().to_string(),
    }))
}

/// POST /api/remove-device
async fn remove_device(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RemoveDevicePayload>,
) -> AppResult<impl IntoResponse> {
    let remaining = app_state
        .device_use_cases
        .remove_device(&payload.email, &payload.device_id)
        .await?;

    Ok(Json(RemoveDeviceResponse {
        success: true,
        remaining_devices: remaining,
    }))
}

/// GET /api/devices?email=
async fn list_devices(
    State(app_state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<DevicesQuery>,
) -> AppResult<impl IntoResponse> {
    let listing = app_state.device_use_cases.list_devices(&query.email).await?;

    let devices: Vec<DeviceSummary> = listing
        .devices
        .into_iter()
        .map(|listed| DeviceSummary {
            device_id: listed.device.device_id,
            device_name: listed.device.device_name,
            device_fingerprint: listed.device.device_fingerprint,
            last_seen: listed.device.last_seen,
            created_at: listed.device.created_at,
            stale: listed.stale,
        })
        .collect();

    Ok(Json(ListDevicesResponse {
        success: true,
        device_count: devices.len() as i64,
        devices,
        max_devices: listing.entitlement.max_devices(),
        plan_type: listing.entitlement.quota.as_str().to_string(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/authorize-device", post(authorize_device))
        .route("/remove-device", post(remove_device))
        .route("/devices", get(list_devices))
}
