use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription tier controlling quota and feature access
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Starter,
    Pro,
    Premium,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Free, Tier::Starter, Tier::Pro, Tier::Premium];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Starter => "starter",
            Tier::Pro => "pro",
            Tier::Premium => "premium",
        }
    }

    /// Resolve a tier name, falling back to `Free` for anything unrecognized
    pub fn parse_or_free(name: &str) -> Tier {
        let name = name.trim();
        Tier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(name))
            .unwrap_or_else(|| {
                tracing::debug!("Unrecognized tier '{}', using free", name);
                Tier::Free
            })
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User record stored in redb
/// Uses Unix timestamps for compact storage with bincode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Normalized (trimmed, lower-case) email address
    pub email: String,
    /// Display name
    pub name: String,
    /// Argon2id PHC string; the salt is embedded
    pub password_hash: String,
    /// Current subscription tier
    pub tier: Tier,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub paypal_subscription_id: Option<String>,
    /// When the user was created (Unix timestamp)
    pub created_at: i64,
}

/// User model for API responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub tier: Tier,
}

impl User {
    pub fn from_record(id: &str, record: &UserRecord) -> Self {
        Self {
            id: id.to_string(),
            email: record.email.clone(),
            name: record.name.clone(),
            tier: record.tier,
        }
    }

    /// Validate that a user ID is a UUID
    pub fn validate_id(id: &str) -> bool {
        uuid::Uuid::parse_str(id).is_ok()
    }

    /// Normalize an email for storage and lookup
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }
}

/// Session record stored in redb: bearer token -> owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl SessionRecord {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}
