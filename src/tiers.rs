//! Tier catalog: static per-tier limits.

use serde::Serialize;

use crate::models::{Allowance, Tier};

/// Limits attached to a subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierLimits {
    pub tier: Tier,
    /// Analyses allowed per usage period
    pub analyses_per_period: Allowance,
    /// Maximum declared video duration in seconds
    pub max_video_seconds: u32,
}

impl TierLimits {
    /// | Tier    | Analyses  | Max video |
    /// |---------|-----------|-----------|
    /// | free    | 3         | 1 min     |
    /// | starter | 5         | 15 min    |
    /// | pro     | 10        | 30 min    |
    /// | premium | unlimited | 60 min    |
    pub fn for_tier(tier: Tier) -> Self {
        let (analyses_per_period, max_video_seconds) = match tier {
            Tier::Free => (Allowance::Limited(3), 60),
            Tier::Starter => (Allowance::Limited(5), 900),
            Tier::Pro => (Allowance::Limited(10), 1800),
            Tier::Premium => (Allowance::Unlimited, 3600),
        };

        Self {
            tier,
            analyses_per_period,
            max_video_seconds,
        }
    }

    /// Look up limits by tier name; unknown names get the free tier
    pub fn for_name(name: &str) -> Self {
        Self::for_tier(Tier::parse_or_free(name))
    }

    /// Whether `used` analyses already exhaust the period quota
    pub fn quota_reached(&self, used: u32) -> bool {
        match self.analyses_per_period {
            Allowance::Limited(limit) => used >= limit,
            Allowance::Unlimited => false,
        }
    }

    /// Remaining analyses after `used` have been consumed
    pub fn remaining(&self, used: u32) -> Allowance {
        match self.analyses_per_period {
            Allowance::Limited(limit) => Allowance::Limited(limit.saturating_sub(used)),
            Allowance::Unlimited => Allowance::Unlimited,
        }
    }
}
