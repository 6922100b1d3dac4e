//! Per-(department, date) priority queues of pending cases.
//!
//! Positions are never patched incrementally. Every mutation that touches a
//! partition is followed by [`QueueCoordinator::recompute_positions`], which
//! re-reads the full Pending subset and assigns dense ranks 1..N.

mod locks;
mod severity;

pub use locks::*;
pub use severity::*;

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, TriageError};
use crate::models::{Department, QueueEntry, QueueKey};
use crate::store::TriageStore;

/// Queue ordering: priority descending, then submission time, then case id.
pub fn queue_order(a: &QueueEntry, b: &QueueEntry) -> Ordering {
    b.priority_score
        .cmp(&a.priority_score)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.case_id.cmp(&b.case_id))
}

/// Sort `entries` by [`queue_order`] and assign dense positions from 1.
///
/// Returns the number of entries whose position changed.
pub fn rank_entries(entries: &mut [QueueEntry]) -> usize {
    entries.sort_by(queue_order);
    let mut changed = 0;
    for (index, entry) in entries.iter_mut().enumerate() {
        let position = Some(index as u32 + 1);
        if entry.queue_position != position {
            entry.queue_position = position;
            changed += 1;
        }
    }
    changed
}

/// True when `entries` already carry dense positions in queue order.
pub fn is_consistent(entries: &[QueueEntry]) -> bool {
    let mut sorted: Vec<&QueueEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| queue_order(a, b));
    sorted
        .iter()
        .enumerate()
        .all(|(index, entry)| entry.queue_position == Some(index as u32 + 1))
}

/// A pending case as shown on the live queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveQueueItem {
    pub entry: QueueEntry,
    pub waiting_minutes: u32,
    pub severity_score: u32,
    /// High-risk case waiting past the alert threshold
    pub delayed: bool,
}

/// Recomputes and reads queue partitions through a store.
///
/// Callers serialize mutations of one partition (see [`KeyedLocks`]); the
/// coordinator itself holds no state.
pub struct QueueCoordinator<'a, S: TriageStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TriageStore + ?Sized> QueueCoordinator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Re-rank the Pending entries of one partition and persist changed positions.
    pub fn recompute_positions(
        &self,
        department: Department,
        date: NaiveDate,
    ) -> CoreResult<Vec<QueueEntry>> {
        let mut entries = self.store.load_pending_entries(department, date)?;
        entries.sort_by(queue_order);
        let before: Vec<Option<u32>> = entries.iter().map(|e| e.queue_position).collect();
        rank_entries(&mut entries);

        let mut saved = 0;
        for (entry, old) in entries.iter_mut().zip(before) {
            if entry.queue_position != old {
                entry.touch();
                self.store.save_queue_entry(entry)?;
                saved += 1;
            }
        }

        tracing::debug!(
            %department,
            %date,
            pending = entries.len(),
            updated = saved,
            "Queue positions recomputed"
        );
        Ok(entries)
    }

    /// Recompute until the persisted partition reads back consistent.
    pub fn recompute_until_consistent(
        &self,
        key: QueueKey,
        max_attempts: u32,
    ) -> CoreResult<Vec<QueueEntry>> {
        let attempts = max_attempts.max(1);
        for attempt in 1..=attempts {
            match self.recompute_positions(key.department, key.date) {
                Ok(_) => {
                    let persisted = self.store.load_pending_entries(key.department, key.date)?;
                    if is_consistent(&persisted) {
                        let mut ordered = persisted;
                        ordered.sort_by(queue_order);
                        return Ok(ordered);
                    }
                    tracing::warn!(%key, attempt, "Queue still inconsistent after recompute");
                }
                Err(err) => {
                    tracing::warn!(%key, attempt, error = %err, "Queue recompute failed");
                }
            }
        }
        Err(TriageError::RecomputeFailed { key, attempts })
    }

    /// Pending entries ordered by queue position.
    pub fn queue(&self, department: Department, date: NaiveDate) -> CoreResult<Vec<QueueEntry>> {
        let mut entries = self.store.load_pending_entries(department, date)?;
        entries.sort_by(queue_order);
        Ok(entries)
    }

    /// Live view: pending entries by severity descending, ties by position.
    pub fn live_queue(
        &self,
        department: Department,
        date: NaiveDate,
        now: DateTime<Utc>,
        delay_alert_minutes: u32,
    ) -> CoreResult<Vec<LiveQueueItem>> {
        let mut items: Vec<LiveQueueItem> = self
            .queue(department, date)?
            .into_iter()
            .map(|entry| {
                let waiting_minutes = entry.waiting_minutes(now);
                LiveQueueItem {
                    severity_score: severity_score(entry.risk_tier, waiting_minutes),
                    delayed: is_delayed(entry.risk_tier, waiting_minutes, delay_alert_minutes),
                    waiting_minutes,
                    entry,
                }
            })
            .collect();

        // Stable sort keeps queue order among equal severities
        items.sort_by(|a, b| b.severity_score.cmp(&a.severity_score));

        let delayed = items.iter().filter(|i| i.delayed).count();
        if delayed > 0 {
            tracing::warn!(%department, %date, delayed, "High-risk cases waiting past alert threshold");
        }
        Ok(items)
    }
}
