//! Slot selection within a preferred time window.

use std::collections::HashSet;

use crate::models::{RiskTier, SlotTime, TimeWindow};

/// Picks a concrete slot from a time window.
///
/// Selection among free slots by tier:
/// - High: earliest
/// - Medium: second earliest (or the last one if only one remains)
/// - Low: middle element (count / 2)
///
/// When every slot is taken the first slot of the window is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotPlanner;

impl SlotPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plan a slot. Taken labels that cannot be parsed are ignored.
    pub fn plan_slot(&self, window: TimeWindow, tier: RiskTier, taken: &[String]) -> SlotTime {
        let taken: HashSet<SlotTime> = taken.iter().filter_map(|s| s.parse().ok()).collect();
        let all = window.slots();
        let free: Vec<SlotTime> = all.iter().copied().filter(|s| !taken.contains(s)).collect();

        if free.is_empty() {
            tracing::debug!(window = window.label(), "All slots taken, using first slot");
            return all[0];
        }

        let index = match tier {
            RiskTier::High => 0,
            RiskTier::Medium => 1.min(free.len() - 1),
            RiskTier::Low => free.len() / 2,
        };
        free[index]
    }
}

/// Plan a slot with the default planner.
pub fn plan_slot(window: TimeWindow, tier: RiskTier, taken: &[String]) -> SlotTime {
    SlotPlanner::new().plan_slot(window, tier, taken)
}
