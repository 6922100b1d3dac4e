//! Live severity and wait metrics.

use serde::{Deserialize, Serialize};

use crate::config::ConsultMinutes;
use crate::models::RiskTier;

/// Base weight of a tier in the live severity score.
pub fn tier_weight(tier: RiskTier) -> u32 {
    match tier {
        RiskTier::High => 100,
        RiskTier::Medium => 50,
        RiskTier::Low => 20,
    }
}

/// Tier weight plus one point per five minutes waited.
pub fn severity_score(tier: RiskTier, waiting_minutes: u32) -> u32 {
    tier_weight(tier) + waiting_minutes / 5
}

/// High-tier case waiting strictly longer than `threshold_minutes`.
pub fn is_delayed(tier: RiskTier, waiting_minutes: u32, threshold_minutes: u32) -> bool {
    tier == RiskTier::High && waiting_minutes > threshold_minutes
}

/// Estimated time until a queued case is seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitEstimate {
    pub minutes: u32,
    pub display: String,
}

/// Queue position times the tier's average consult length.
pub fn estimate_wait(position: u32, tier: RiskTier, consult: &ConsultMinutes) -> WaitEstimate {
    let minutes = position.saturating_mul(consult.for_tier(tier));
    WaitEstimate {
        minutes,
        display: format_wait(minutes),
    }
}

/// "45 minutes", "1h 30m" or "2h".
pub fn format_wait(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{} minutes", minutes);
    }
    let (hours, rest) = (minutes / 60, minutes % 60);
    if rest > 0 {
        format!("{}h {}m", hours, rest)
    } else {
        format!("{}h", hours)
    }
}
