use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use super::auth::AuthUser;
use crate::AppState;
use crate::db::accounts;
use crate::error::{AppError, Result};
use crate::models::Tier;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySubscriptionRequest {
    #[serde(default)]
    pub subscription_id: String,
}

#[derive(Debug, Serialize)]
pub struct VerifySubscriptionResponse {
    pub success: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Confirm a PayPal subscription after the buyer approves it
///
/// POST /api/paypal/verify-subscription with `{"subscriptionId": "I-..."}`
///
/// The subscription is fetched from PayPal; an ACTIVE subscription whose
/// `custom_id` is the caller upgrades the caller to the plan's tier. Any
/// other status leaves the tier unchanged.
pub async fn verify_paypal_subscription(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<VerifySubscriptionRequest>,
) -> Result<Json<VerifySubscriptionResponse>> {
    let paypal = state.paypal.clone().ok_or_else(|| {
        tracing::error!("PayPal verification requested but PayPal is not configured");
        AppError::BillingNotConfigured
    })?;

    let subscription_id = payload.subscription_id.trim();
    if subscription_id.is_empty() {
        return Err(AppError::InvalidInput("Missing subscriptionId".to_string()));
    }

    let subscription = paypal.subscription(subscription_id).await?;

    if !subscription.is_active() {
        tracing::info!(
            "PayPal subscription {} for user {} is {}",
            subscription.id,
            auth.user_id,
            subscription.status
        );
        return Ok(Json(VerifySubscriptionResponse {
            success: false,
            status: subscription.status,
            plan: None,
            message: Some("Subscription is not active".to_string()),
        }));
    }

    match subscription.custom_id.as_deref() {
        None => {
            return Err(AppError::InvalidInput(
                "No user ID found in subscription".to_string(),
            ));
        }
        Some(owner) if owner != auth.user_id => {
            tracing::warn!(
                "User {} tried to claim PayPal subscription {} owned by {}",
                auth.user_id,
                subscription.id,
                owner
            );
            return Err(AppError::InvalidInput(
                "Subscription belongs to another account".to_string(),
            ));
        }
        Some(_) => {}
    }

    let tier = paypal.tier_for_plan(&subscription.plan_id);
    let db = state.db.clone();
    let user_id = auth.user_id.clone();
    let stored_id = subscription.id.clone();
    tokio::task::spawn_blocking(move || {
        accounts::apply_paypal_subscription(&db, &user_id, tier, &stored_id)
    })
    .await??;

    Ok(Json(VerifySubscriptionResponse {
        success: true,
        status: subscription.status,
        plan: Some(tier),
        message: None,
    }))
}
