//! Hosted checkout and billing portal.

use super::common::*;
use chrono::{DateTime, Utc};

use crate::use_cases::billing_webhook::SessionVerification;
use crate::use_cases::checkout::CheckoutPlan;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutPayload {
    email: String,
    #[serde(alias = "priceType")]
    plan: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortalPayload {
    email: String,
    #[serde(default, alias = "return_url")]
    return_url: Option<String>,
}

#[derive(Deserialize)]
struct VerifySessionPayload {
    #[serde(alias = "sessionId")]
    session_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutResponse {
    session_id: String,
    url: Option<String>,
}

#[derive(Serialize)]
struct PortalResponse {
    url: String,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct VerifySessionResponse {
    success: bool,
    paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_pro: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subscription_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subscription_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_period_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stripe_customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stripe_subscription_id: Option<String>,
}

/// POST /api/create-checkout-session
async fn create_checkout_session(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CheckoutPayload>,
) -> AppResult<impl IntoResponse> {
    let plan: CheckoutPlan = payload.plan.parse()?;
    let session = app_state
        .checkout_use_cases
        .create_checkout_session(&payload.email, plan)
        .await?;

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// POST /api/billing-portal
async fn billing_portal(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<PortalPayload>,
) -> AppResult<impl IntoResponse> {
    let url = app_state
        .checkout_use_cases
        .billing_portal(&payload.email, payload.return_url.as_deref())
        .await?;

    Ok(Json(PortalResponse { url }))
}

/// POST /api/verify-session
async fn verify_session(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<VerifySessionPayload>,
) -> AppResult<impl IntoResponse> {
    let verification = app_state
        .billing_webhook_use_cases
        .verify_session(&payload.session_id)
        .await?;

    let account = match verification {
        SessionVerification::Unpaid { .. } => {
            return Ok(Json(VerifySessionResponse {
                message: Some("Payment not completed".into()),
                ..Default::default()
            }));
        }
        SessionVerification::Paid(account) => account,
    };

    let view = app_state
        .entitlement_use_cases
        .get_subscription(&account.email)
        .await?;

    Ok(Json(VerifySessionResponse {
        success: true,
        paid: true,
        message: None,
        is_pro: Some(view.entitlement.is_pro),
        subscription_status: Some(view.entitlement.subscription_status.as_str().to_string()),
        subscription_type: Some(view.entitlement.plan_type.as_str().to_string()),
        current_period_end: view.current_period_end,
        stripe_customer_id: view.stripe_customer_id,
        stripe_subscription_id: view.stripe_subscription_id,
        email: Some(account.email),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/billing-portal", post(billing_portal))
        .route("/verify-session", post(verify_session))
}
