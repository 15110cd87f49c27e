//! TTL tiers referenced by callers instead of raw durations.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Named freshness tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TtlTier {
    /// 2 minutes
    Short,
    /// 5 minutes: listings and search
    #[default]
    Medium,
    /// 15 minutes: product details
    Long,
    /// 1 hour: category index
    VeryLong,
}

impl TtlTier {
    pub const fn duration(self) -> Duration {
        match self {
            TtlTier::Short => Duration::from_secs(2 * 60),
            TtlTier::Medium => Duration::from_secs(5 * 60),
            TtlTier::Long => Duration::from_secs(15 * 60),
            TtlTier::VeryLong => Duration::from_secs(60 * 60),
        }
    }
}

impl From<TtlTier> for Duration {
    fn from(tier: TtlTier) -> Self {
        tier.duration()
    }
}
