use std::collections::HashMap;
use std::env;

use crate::constants::{DEFAULT_SESSION_TTL_SECS, MAX_MEDIA_BYTES, PAYPAL_SANDBOX_API};
use crate::models::Tier;
use crate::usage::UsagePeriod;

/// PayPal REST credentials and the plan ids that grant each tier
#[derive(Debug, Clone)]
pub struct PayPalConfig {
    pub api_base: String,
    pub client_id: String,
    pub client_secret: String,
    /// PayPal plan id → tier
    pub plans: HashMap<String, Tier>,
}

impl PayPalConfig {
    /// `None` unless both client credentials are set
    fn from_env() -> Option<Self> {
        let client_id = optional("PAYPAL_CLIENT_ID")?;
        let client_secret = optional("PAYPAL_CLIENT_SECRET")?;

        let plans = [
            ("PAYPAL_PLAN_STARTER", Tier::Starter),
            ("PAYPAL_PLAN_PRO", Tier::Pro),
            ("PAYPAL_PLAN_PREMIUM", Tier::Premium),
        ]
        .into_iter()
        .filter_map(|(name, tier)| optional(name).map(|plan_id| (plan_id, tier)))
        .collect();

        Some(PayPalConfig {
            api_base: optional("PAYPAL_API_URL").unwrap_or_else(|| PAYPAL_SANDBOX_API.to_string()),
            client_id,
            client_secret,
            plans,
        })
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_path: String,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    /// Server-side secret mixed into every password hash
    pub password_pepper: String,
    pub session_ttl_secs: i64,
    pub usage_period: UsagePeriod,
    pub max_media_bytes: usize,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub upstream_timeout_secs: u64,
    /// Stripe endpoint secret; webhooks are rejected when unset
    pub stripe_webhook_secret: Option<String>,
    /// Admin endpoints are disabled when unset
    pub admin_secret_key: Option<String>,
    /// PayPal verification is disabled when unset
    pub paypal: Option<PayPalConfig>,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/oratoria.db".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let password_pepper = env::var("PASSWORD_PEPPER")
            .map_err(|_| "PASSWORD_PEPPER must be set for password hashing")?;

        let session_ttl_secs = match optional("SESSION_TTL_SECS") {
            Some(v) => v.parse().map_err(|_| "Invalid SESSION_TTL_SECS")?,
            None => DEFAULT_SESSION_TTL_SECS,
        };

        let usage_period = env::var("USAGE_PERIOD")
            .unwrap_or_else(|_| "monthly".to_string())
            .parse()?;

        let max_media_bytes = match optional("MAX_MEDIA_BYTES") {
            Some(v) => v.parse().map_err(|_| "Invalid MAX_MEDIA_BYTES")?,
            None => MAX_MEDIA_BYTES,
        };

        let gemini_api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| "GEMINI_API_KEY must be set to reach the analysis service")?;

        let gemini_model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());

        let gemini_api_base = env::var("GEMINI_API_BASE")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());

        let upstream_timeout_secs = env::var("UPSTREAM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .map_err(|_| "Invalid UPSTREAM_TIMEOUT_SECS")?;

        Ok(Config {
            server_host,
            server_port,
            database_path,
            allowed_origins,
            environment,
            password_pepper,
            session_ttl_secs,
            usage_period,
            max_media_bytes,
            gemini_api_key,
            gemini_model,
            gemini_api_base,
            upstream_timeout_secs,
            stripe_webhook_secret: optional("STRIPE_WEBHOOK_SECRET"),
            admin_secret_key: optional("ADMIN_SECRET_KEY"),
            paypal: PayPalConfig::from_env(),
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Request body ceiling: twice the media ceiling plus 1MB of JSON envelope.
    /// Stays above the base64 size of slightly-oversized media; anything
    /// past it is still reported as `MediaTooLarge` by the analyze handler
    pub fn request_body_limit(&self) -> usize {
        self.max_media_bytes.saturating_mul(2).saturating_add(1024 * 1024)
    }
}
