//! Account provisioning and scheduled deletion.

use super::common::*;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Deserialize)]
struct SyncUserPayload {
    email: String,
    #[serde(default, alias = "displayName")]
    name: Option<String>,
}

#[derive(Deserialize)]
struct EmailPayload {
    email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncUserResponse {
    success: bool,
    created: bool,
    user_id: Uuid,
    email: String,
    plan_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeletionResponse {
    success: bool,
    deletion_scheduled_at: Option<DateTime<Utc>>,
}

/// POST /api/sync-user
async fn sync_user(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SyncUserPayload>,
) -> AppResult<impl IntoResponse> {
    let (account, created) = app_state
        .account_use_cases
        .sync_user(&payload.email, payload.name.as_deref())
        .await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(SyncUserResponse {
            success: true,
            created,
            user_id: account.id,
            email: account.email,
            plan_type: account.plan_type.as_str().to_string(),
        }),
    ))
}

/// POST /api/delete-account
async fn delete_account(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<EmailPayload>,
) -> AppResult<impl IntoResponse> {
    let scheduled_at = app_state
        .account_use_cases
        .delete_account(&payload.email)
        .await?;

    Ok(Json(DeletionResponse {
        success: true,
        deletion_scheduled_at: Some(scheduled_at),
    }))
}

/// POST /api/restore-account
async fn restore_account(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<EmailPayload>,
) -> AppResult<impl IntoResponse> {
    let account = app_state
        .account_use_cases
        .restore_account(&payload.email)
        .await?;

    Ok(Json(DeletionResponse {
        success: true,
        deletion_scheduled_at: account.deletion_scheduled_at,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync-user", post(sync_user))
        .route("/delete-account", post(delete_account))
        .route("/restore-account", post(restore_account))
}
