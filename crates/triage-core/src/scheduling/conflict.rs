//! Detection and resolution of double bookings for a patient.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::SlotTime;

/// Upper bound on forward shifts: one full turn of the 12-hour clock.
const MAX_SHIFTS: usize = 12;

/// Outcome of conflict resolution. A conflict is a normal branch, not an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictResolution {
    pub slot: SlotTime,
    pub rescheduled: bool,
    /// Requested slot, kept for audit and display when shifted
    pub original_slot: Option<SlotTime>,
    /// Every hour of the period is booked; `slot` is the requested slot
    /// and still conflicts.
    #[serde(default)]
    pub unresolved: bool,
}

impl ConflictResolution {
    /// Informational note for the caller, if the slot moved or could not.
    pub fn note(&self) -> Option<String> {
        if self.unresolved {
            return Some(format!(
                "You already have an appointment at {} and no other hour is free",
                self.slot
            ));
        }
        self.original_slot.map(|original| {
            format!(
                "You already have an appointment at {}. Rescheduled to: {}",
                original, self.slot
            )
        })
    }
}

/// Shifts a requested slot away from the patient's existing bookings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver;

impl ConflictResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a requested slot against the patient's active bookings on `date`.
    ///
    /// On conflict the slot moves forward one hour at a time (hour 12 wraps
    /// to 1, period kept) until it is free. When all twelve hours are taken
    /// the requested slot comes back flagged `unresolved`.
    pub fn resolve_conflict(
        &self,
        patient_id: &str,
        date: NaiveDate,
        slot: SlotTime,
        existing: &[SlotTime],
    ) -> ConflictResolution {
        if !existing.contains(&slot) {
            return ConflictResolution {
                slot,
                rescheduled: false,
                original_slot: None,
                unresolved: false,
            };
        }

        let free = std::iter::successors(Some(slot.next_hour()), |s| Some(s.next_hour()))
            .take(MAX_SHIFTS - 1)
            .find(|candidate| !existing.contains(candidate));
        let Some(candidate) = free else {
            tracing::warn!(patient_id, %date, requested = %slot, "Every hour of the period is booked, conflict unresolved");
            return ConflictResolution {
                slot,
                rescheduled: false,
                original_slot: None,
                unresolved: true,
            };
        };

        tracing::info!(
            patient_id,
            %date,
            original = %slot,
            rescheduled = %candidate,
            "Booking conflict, slot shifted"
        );

        ConflictResolution {
            slot: candidate,
            rescheduled: true,
            original_slot: Some(slot),
            unresolved: false,
        }
    }
}

/// Resolve a conflict with the default resolver.
pub fn resolve_conflict(
    patient_id: &str,
    date: NaiveDate,
    slot: SlotTime,
    existing: &[SlotTime],
) -> ConflictResolution {
    ConflictResolver::new().resolve_conflict(patient_id, date, slot, existing)
}
