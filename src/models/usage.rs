use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Tier;

/// Per-(user, period) counter stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Analyses consumed in the period
    pub count: u32,
    /// Tier active when the counter was last written
    pub tier: Tier,
    /// Unix timestamp of the last increment
    pub updated_at: i64,
}

/// A quota amount: either a finite count or the unlimited sentinel
///
/// On the wire finite values are integers and the sentinel is the string
/// `"unlimited"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allowance {
    Limited(u32),
    Unlimited,
}

impl Allowance {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Allowance::Unlimited)
    }
}

impl Serialize for Allowance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Allowance::Limited(n) => serializer.serialize_u32(*n),
            Allowance::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

impl<'de> Deserialize<'de> for Allowance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Count(u32),
            Label(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Count(n) => Ok(Allowance::Limited(n)),
            Wire::Label(label) if label == "unlimited" => Ok(Allowance::Unlimited),
            Wire::Label(label) => Err(serde::de::Error::custom(format!(
                "expected a count or \"unlimited\", got \"{}\"",
                label
            ))),
        }
    }
}

/// Quota status returned by `GET /api/check-limit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatus {
    pub success: bool,
    pub tier: Tier,
    pub limit: Allowance,
    pub used: u32,
    pub remaining: Allowance,
    pub can_analyze: bool,
    /// Period key, e.g. "2025-10"
    pub current_month: String,
    pub resets_at: DateTime<Utc>,
    /// Maximum video duration in seconds for the tier
    pub video_duration_limit: u32,
}
