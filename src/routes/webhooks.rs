use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde_json::{Value, json};

use crate::AppState;
use crate::billing::{StripeEvent, handle_stripe_event};
use crate::constants::STRIPE_TIMESTAMP_TOLERANCE_SECS;
use crate::error::{AppError, Result};
use crate::security::verify_stripe_signature;

/// Stripe webhook endpoint
///
/// POST /api/webhooks/stripe
///
/// The raw body is verified against the `Stripe-Signature` header before
/// it is parsed. Events for unknown users are acknowledged so Stripe does
/// not retry them.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let Some(secret) = state.config.stripe_webhook_secret.as_deref() else {
        tracing::error!("Stripe webhook received but STRIPE_WEBHOOK_SECRET is not set");
        return Err(AppError::InvalidSignature);
    };

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Stripe webhook without signature header");
            AppError::InvalidSignature
        })?;

    let now = state.clock.now().timestamp();
    if !verify_stripe_signature(&body, signature, secret, now, STRIPE_TIMESTAMP_TOLERANCE_SECS) {
        tracing::warn!("Stripe webhook signature verification failed");
        return Err(AppError::InvalidSignature);
    }

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Malformed webhook payload: {}", e)))?;

    let db = state.db.clone();
    let outcome = tokio::task::spawn_blocking(move || handle_stripe_event(&db, &event)).await??;
    tracing::debug!("Webhook outcome: {:?}", outcome);

    Ok(Json(json!({ "received": true })))
}
