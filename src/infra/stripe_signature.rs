//! `Stripe-Signature` header handling.
//!
//! The header has the form `t=<unix>,v1=<hex>[,v1=<hex>...]`. Each `v1` is an
//! HMAC-SHA256 of `"{t}.{raw body}"` keyed by the endpoint secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::app_error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str, timestamp: &str, payload: &str) -> AppResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("HMAC key rejected".into()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// Checks `header` against the raw request body.
///
/// `now` is a unix timestamp; signatures older or newer than
/// `tolerance_secs` are rejected even if the MAC matches.
pub fn verify_signature(
    payload: &str,
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> AppResult<()> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| AppError::InvalidSignature("Missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(AppError::InvalidSignature("Missing v1 signature".into()));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| AppError::InvalidSignature("Invalid timestamp".into()))?;

    let matched = signatures.iter().any(|sig| {
        let Ok(bytes) = hex::decode(sig) else {
            return false;
        };
        // verify_slice compares in constant time
        mac_for(secret, timestamp, payload)
            .map(|mac| mac.verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if !matched {
        return Err(AppError::InvalidSignature("Signature mismatch".into()));
    }

    if (now - ts).abs() > tolerance_secs {
        return Err(AppError::InvalidSignature("Timestamp outside tolerance".into()));
    }

    Ok(())
}

/// Produces a header value in the provider's format. Used by tests and
/// local tooling that replays events.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &str) -> AppResult<String> {
    let ts = timestamp.to_string();
    let mac = mac_for(secret, &ts, payload)?;
    Ok(format!("t={},v1={}", ts, hex::encode(mac.finalize().into_bytes())))
}
