//! Queue entry models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Department, RiskTier};

/// Lifecycle of a queued case.
///
/// ```text
/// Pending ──► InProgress ──► Completed
///    │            │
///    └────────────┴────────► Cancelled
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CaseStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Pending => "pending",
            CaseStatus::InProgress => "in-progress",
            CaseStatus::Completed => "completed",
            CaseStatus::Cancelled => "cancelled",
        }
    }

    /// Pending or InProgress: the case holds a provider unit and a slot.
    pub fn is_active(&self) -> bool {
        matches!(self, CaseStatus::Pending | CaseStatus::InProgress)
    }

    pub fn can_transition_to(&self, next: CaseStatus) -> bool {
        matches!(
            (self, next),
            (CaseStatus::Pending, CaseStatus::InProgress)
                | (CaseStatus::Pending, CaseStatus::Cancelled)
                | (CaseStatus::InProgress, CaseStatus::Completed)
                | (CaseStatus::InProgress, CaseStatus::Cancelled)
        )
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "pending" => Ok(CaseStatus::Pending),
            "in-progress" | "inprogress" => Ok(CaseStatus::InProgress),
            "completed" => Ok(CaseStatus::Completed),
            "cancelled" | "canceled" => Ok(CaseStatus::Cancelled),
            other => Err(format!("unknown case status: {}", other)),
        }
    }
}

/// Queue partition: one ordered queue per department and day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueKey {
    pub department: Department,
    pub date: NaiveDate,
}

impl QueueKey {
    pub fn new(department: Department, date: NaiveDate) -> Self {
        Self { department, date }
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.department, self.date)
    }
}

/// A scheduled case in a department queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEntry {
    pub case_id: String,
    pub patient_id: String,
    pub department: Department,
    pub date: NaiveDate,
    /// Slot label, e.g. "9:00 AM"
    pub slot: String,
    pub risk_tier: RiskTier,
    /// Risk score at submission; primary ordering key
    pub priority_score: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: CaseStatus,
    /// Dense rank within the partition, only while Pending
    pub queue_position: Option<u32>,
    /// Bound provider while the case is active
    pub provider_id: Option<String>,
    /// Business day the provider unit was counted against
    #[serde(default)]
    pub assigned_on: Option<NaiveDate>,
    /// Slot originally requested before a conflict shift
    pub original_slot: Option<String>,
    /// Fingerprint of the intake that produced this case
    pub intake_fingerprint: Option<String>,
}

impl QueueEntry {
    /// Create a new pending entry.
    pub fn new(
        patient_id: impl Into<String>,
        department: Department,
        date: NaiveDate,
        slot: impl Into<String>,
        risk_tier: RiskTier,
        priority_score: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            case_id: uuid::Uuid::new_v4().to_string(),
            patient_id: patient_id.into(),
            department,
            date,
            slot: slot.into(),
            risk_tier,
            priority_score,
            created_at: now,
            updated_at: now,
            status: CaseStatus::Pending,
            queue_position: None,
            provider_id: None,
            assigned_on: None,
            original_slot: None,
            intake_fingerprint: None,
        }
    }

    pub fn key(&self) -> QueueKey {
        QueueKey::new(self.department, self.date)
    }

    pub fn is_pending(&self) -> bool {
        self.status == CaseStatus::Pending
    }

    /// Minutes since submission, floored, never negative.
    pub fn waiting_minutes(&self, now: DateTime<Utc>) -> u32 {
        let minutes = (now - self.created_at).num_minutes();
        u32::try_from(minutes.max(0)).unwrap_or(u32::MAX)
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry() -> QueueEntry {
        QueueEntry::new(
            "patient-1",
            Department::UrgentCare,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            "9:00 AM",
            RiskTier::Medium,
            40,
        )
    }

    #[test]
    fn test_new_entry_is_pending() {
        let entry = entry();
        assert!(entry.is_pending());
        assert_eq!(entry.queue_position, None);
        assert_eq!(entry.case_id.len(), 36);
    }

    #[test]
    fn test_transitions() {
        use CaseStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn test_waiting_minutes_floors() {
        let entry = entry();
        let later = entry.created_at + Duration::seconds(19 * 60 + 59);
        assert_eq!(entry.waiting_minutes(later), 19);
        let earlier = entry.created_at - Duration::minutes(5);
        assert_eq!(entry.waiting_minutes(earlier), 0);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("in-progress".parse::<CaseStatus>().unwrap(), CaseStatus::InProgress);
        assert_eq!("IN_PROGRESS".parse::<CaseStatus>().unwrap(), CaseStatus::InProgress);
        assert_eq!("canceled".parse::<CaseStatus>().unwrap(), CaseStatus::Cancelled);
    }
}
