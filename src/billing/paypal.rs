//! PayPal subscriptions, verified on demand against the PayPal REST API.

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;

use crate::config::PayPalConfig;
use crate::error::{AppError, Result};
use crate::models::Tier;

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayPalSubscriber {
    pub email_address: Option<String>,
}

/// The fields of `GET /v1/billing/subscriptions/{id}` this server reads
#[derive(Debug, Clone, Deserialize)]
pub struct PayPalSubscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub plan_id: String,
    /// Set by the checkout button to the subscribing user's id
    pub custom_id: Option<String>,
    pub start_time: Option<String>,
    pub subscriber: Option<PayPalSubscriber>,
}

impl PayPalSubscription {
    pub fn is_active(&self) -> bool {
        self.status == "ACTIVE"
    }
}

/// PayPal ids are alphanumeric with dashes, e.g. `I-BW452GLLEP1G`
pub fn valid_subscription_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Client for the PayPal OAuth and billing-subscription endpoints
#[derive(Debug, Clone)]
pub struct PayPalClient {
    http: reqwest::Client,
    config: PayPalConfig,
}

impl PayPalClient {
    pub fn new(config: &PayPalConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let mut config = config.clone();
        config.api_base = config.api_base.trim_end_matches('/').to_string();

        Ok(Self { http, config })
    }

    /// Tier granted by a PayPal plan; unknown plans grant nothing
    pub fn tier_for_plan(&self, plan_id: &str) -> Tier {
        self.config.plans.get(plan_id).copied().unwrap_or_else(|| {
            tracing::warn!("Unknown PayPal plan {}, using free", plan_id);
            Tier::Free
        })
    }

    async fn access_token(&self) -> Result<String> {
        let res = self
            .http
            .post(format!("{}/v1/oauth2/token", self.config.api_base))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("Token request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::PaymentProvider(format!(
                "PayPal auth failed with {}: {}",
                status, body
            )));
        }

        let token: AccessToken = res
            .json()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("Unreadable token response: {}", e)))?;
        Ok(token.access_token)
    }

    /// Fetch a subscription's current state
    pub async fn subscription(&self, subscription_id: &str) -> Result<PayPalSubscription> {
        if !valid_subscription_id(subscription_id) {
            return Err(AppError::InvalidInput(
                "Invalid PayPal subscription id".to_string(),
            ));
        }

        let token = self.access_token().await?;
        let res = self
            .http
            .get(format!(
                "{}/v1/billing/subscriptions/{}",
                self.config.api_base, subscription_id
            ))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                AppError::PaymentProvider(format!("Subscription request failed: {}", e))
            })?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::InvalidInput(format!(
                "PayPal subscription {} not found",
                subscription_id
            )));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::PaymentProvider(format!(
                "PayPal returned {} for subscription {}: {}",
                status, subscription_id, body
            )));
        }

        res.json().await.map_err(|e| {
            AppError::PaymentProvider(format!("Unreadable subscription response: {}", e))
        })
    }
}
