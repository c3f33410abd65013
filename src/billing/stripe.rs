//! Subscription lifecycle events from Stripe mapped onto user tiers.

use redb::Database;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::db::accounts;
use crate::error::{AppError, Result};
use crate::models::Tier;

/// Envelope shared by all Stripe events
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    #[serde(default)]
    metadata: HashMap<String, String>,
    customer: Option<String>,
    subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Subscription {
    customer: Option<String>,
    status: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// What a webhook did to the user table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    TierChanged { user_id: String, tier: Tier },
    Ignored(String),
}

fn parse_object<T: for<'de> Deserialize<'de>>(event: &StripeEvent) -> Result<T> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| {
        AppError::InvalidInput(format!("Malformed {} payload: {}", event.event_type, e))
    })
}

/// Resolve a checkout identifier, which may be a user id or an email
fn resolve_identifier(db: &Database, identifier: &str) -> Result<Option<String>> {
    if identifier.contains('@') {
        return accounts::find_user_id_by_email(db, identifier);
    }
    Ok(accounts::find_user(db, identifier)?.map(|_| identifier.to_string()))
}

fn downgrade(db: &Database, customer: Option<&str>, reason: &str) -> Result<WebhookOutcome> {
    let Some(customer) = customer else {
        return Ok(WebhookOutcome::Ignored("subscription without customer".to_string()));
    };
    let Some(user_id) = accounts::find_user_id_by_customer(db, customer)? else {
        tracing::warn!("No user for Stripe customer {}", customer);
        return Ok(WebhookOutcome::Ignored(format!("unknown customer {}", customer)));
    };

    accounts::set_tier(db, &user_id, Tier::Free)?;
    tracing::info!("User {} downgraded to free ({})", user_id, reason);

    Ok(WebhookOutcome::TierChanged {
        user_id,
        tier: Tier::Free,
    })
}

/// Apply a verified Stripe event. Blocking; run on `spawn_blocking`.
pub fn handle_stripe_event(db: &Database, event: &StripeEvent) -> Result<WebhookOutcome> {
    tracing::info!("Webhook received: {} ({})", event.event_type, event.id);

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSession = parse_object(event)?;

            let (Some(identifier), Some(tier_name)) =
                (session.metadata.get("userId"), session.metadata.get("tier"))
            else {
                tracing::error!("Checkout session is missing userId/tier metadata");
                return Ok(WebhookOutcome::Ignored("missing metadata".to_string()));
            };

            let Some(user_id) = resolve_identifier(db, identifier)? else {
                tracing::error!("Checkout for unknown user {}", identifier);
                return Ok(WebhookOutcome::Ignored(format!("unknown user {}", identifier)));
            };

            let tier = Tier::parse_or_free(tier_name);
            accounts::apply_checkout(
                db,
                &user_id,
                tier,
                session.customer.as_deref(),
                session.subscription.as_deref(),
            )?;

            Ok(WebhookOutcome::TierChanged { user_id, tier })
        }
        "customer.subscription.updated" => {
            let subscription: Subscription = parse_object(event)?;
            let status = subscription.status.as_deref().unwrap_or("unknown");

            if !matches!(status, "active" | "trialing") {
                return downgrade(db, subscription.customer.as_deref(), status);
            }

            // Plan changes carry the new tier in metadata
            match (
                subscription.customer.as_deref(),
                subscription.metadata.get("tier"),
            ) {
                (Some(customer), Some(tier_name)) => {
                    let Some(user_id) = accounts::find_user_id_by_customer(db, customer)? else {
                        return Ok(WebhookOutcome::Ignored(format!(
                            "unknown customer {}",
                            customer
                        )));
                    };
                    let tier = Tier::parse_or_free(tier_name);
                    accounts::set_tier(db, &user_id, tier)?;
                    Ok(WebhookOutcome::TierChanged { user_id, tier })
                }
                _ => Ok(WebhookOutcome::Ignored("active subscription unchanged".to_string())),
            }
        }
        "customer.subscription.deleted" => {
            let subscription: Subscription = parse_object(event)?;
            downgrade(db, subscription.customer.as_deref(), "subscription cancelled")
        }
        other => {
            tracing::info!("Unhandled event type: {}", other);
            Ok(WebhookOutcome::Ignored(format!("unhandled event {}", other)))
        }
    }
}
