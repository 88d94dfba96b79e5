use super::common::*;
use tabkeep_types::SubscriptionResponse;

#[derive(Deserialize)]
struct SubscriptionPayload {
    email: String,
}

/// POST /api/get-subscription
async fn get_subscription(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SubscriptionPayload>,
) -> AppResult<impl IntoResponse> {
    let view = app_state
        .entitlement_use_cases
        .get_subscription(&payload.email)
        .await?;

    Ok(Json(SubscriptionResponse {
        success: true,
        is_pro: view.entitlement.is_pro,
        is_admin: view.entitlement.is_admin,
        subscription_status: view.entitlement.subscription_status.as_str().to_string(),
        subscription_type: view.entitlement.plan_type.as_str().to_string(),
        current_period_end: view.current_period_end,
        next_billing_date: view.next_billing_date,
        stripe_customer_id: view.stripe_customer_id,
        stripe_subscription_id: view.stripe_subscription_id,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/get-subscription", post(get_subscription))
}
