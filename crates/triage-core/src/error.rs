//! Core error taxonomy.

use thiserror::Error;

use crate::db::DbError;
use crate::models::{CaseStatus, Department, QueueKey};
use crate::store::StoreError;

/// Errors returned by the scheduling core.
///
/// Risk evaluation never fails and booking conflicts are a normal branch,
/// so neither appears here.
#[derive(Error, Debug)]
pub enum TriageError {
    /// No regular or backup provider has capacity. Not retryable.
    #[error("no providers available in {department}")]
    CapacityExhausted { department: Department },

    /// External store failure, propagated unchanged.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Case not found: {0}")]
    CaseNotFound(String),

    #[error("Case {case_id} cannot move from {from} to {to}")]
    InvalidTransition {
        case_id: String,
        from: CaseStatus,
        to: CaseStatus,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Queue {key} still inconsistent after {attempts} recompute attempts")]
    RecomputeFailed { key: QueueKey, attempts: u32 },

    /// The case kept moving between queues while it was being locked.
    #[error("Case {case_id} changed queue {attempts} times while locking")]
    ConcurrentUpdate { case_id: String, attempts: u32 },
}

impl TriageError {
    /// True when an operator or admin has to step in.
    pub fn needs_admin_intervention(&self) -> bool {
        matches!(
            self,
            TriageError::CapacityExhausted { .. } | TriageError::RecomputeFailed { .. }
        )
    }

    /// True when retrying the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TriageError::Persistence(_)
                | TriageError::RecomputeFailed { .. }
                | TriageError::ConcurrentUpdate { .. }
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for TriageError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        TriageError::Persistence(StoreError::LockPoisoned)
    }
}

impl From<DbError> for TriageError {
    fn from(err: DbError) -> Self {
        TriageError::Persistence(err.into())
    }
}

pub type CoreResult<T> = Result<T, TriageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_exhausted_message_and_flags() {
        let err = TriageError::CapacityExhausted {
            department: Department::UrgentCare,
        };
        assert_eq!(err.to_string(), "no providers available in Urgent Care");
        assert!(err.needs_admin_intervention());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_persistence_is_retryable() {
        let err: TriageError = StoreError::Unavailable("timeout".into()).into();
        assert!(err.is_retryable());
        assert!(!err.needs_admin_intervention());
    }
}
