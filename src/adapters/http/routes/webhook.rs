//! Stripe webhook ingestion.

use super::common::*;
use crate::infra::stripe_client::StripeWebhookEvent;
use crate::infra::stripe_signature::verify_signature;
use crate::use_cases::billing_webhook::IngestOutcome;
use chrono::Utc;
use secrecy::ExposeSecret;
use serde_json::{Value, json};

/// Returns 500 so Stripe redelivers the event.
fn webhook_retryable_error(error: &AppError, event_type: &str, event_id: &str) -> StatusCode {
    error!(
        error = %error,
        event_type,
        event_id,
        retryable = true,
        "Webhook processing failed, returning 500 for Stripe retry"
    );
    StatusCode::INTERNAL_SERVER_ERROR
}

fn received() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "received": true })))
}

/// POST /api/stripe-webhook
async fn stripe_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<(StatusCode, Json<Value>)> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidSignature("Missing Stripe-Signature header".into()))?;

    verify_signature(
        &body,
        signature,
        app_state.config.stripe_webhook_secret.expose_secret(),
        app_state.config.webhook_tolerance_secs,
        Utc::now().timestamp(),
    )?;

    let event: StripeWebhookEvent = serde_json::from_str(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid webhook payload: {}", e)))?;

    let event_id = event.id.clone();
    let event_type = event.event_type.clone();

    // A malformed object will not parse on redelivery either
    let provider_event = match event.into_provider_event() {
        Ok(provider_event) => provider_event,
        Err(e) => {
            warn!(error = %e, %event_type, %event_id, "Unprocessable webhook object, acknowledging");
            return Ok(received());
        }
    };

    match app_state
        .billing_webhook_use_cases
        .ingest(provider_event)
        .await
    {
        Ok(IngestOutcome::Applied) => info!(%event_type, %event_id, "Webhook applied"),
        Ok(IngestOutcome::Duplicate) => info!(%event_type, %event_id, "Webhook replay acknowledged"),
        Ok(IngestOutcome::Ignored) => {}
        Err(e) if e.is_retryable() => {
            let status = webhook_retryable_error(&e, &event_type, &event_id);
            return Ok((status, Json(json!({ "received": false }))));
        }
        Err(e) => {
            warn!(error = %e, %event_type, %event_id, retryable = false, "Webhook not applied, acknowledging");
        }
    }

    Ok(received())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/stripe-webhook", post(stripe_webhook))
}
