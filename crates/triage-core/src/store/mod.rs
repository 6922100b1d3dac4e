//! Persisted-record store interface.
//!
//! The core never owns persistence. Every read and write of providers and
//! queue entries goes through [`TriageStore`], injected into the service.

mod memory;
#[cfg(test)]
pub(crate) mod scripted;

pub use memory::*;

use chrono::NaiveDate;
use thiserror::Error;

use crate::db::DbError;
use crate::models::{Department, DutyStatus, Provider, QueueEntry};

/// Store errors. Propagated unchanged to the caller; the core does not retry.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::LockPoisoned
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read/write interface to the persisted provider roster and queue entries.
pub trait TriageStore: Send + Sync {
    /// Providers of one department.
    fn load_providers(&self, department: Department) -> StoreResult<Vec<Provider>>;

    /// Every provider on the roster.
    fn load_all_providers(&self) -> StoreResult<Vec<Provider>>;

    /// Insert or replace a roster record.
    fn save_provider(&self, provider: &Provider) -> StoreResult<()>;

    /// Persist a provider's load and duty status.
    fn save_provider_load(
        &self,
        provider_id: &str,
        new_load: u32,
        new_status: DutyStatus,
    ) -> StoreResult<()>;

    /// Pending entries of one (department, date) partition, in any order.
    fn load_pending_entries(
        &self,
        department: Department,
        date: NaiveDate,
    ) -> StoreResult<Vec<QueueEntry>>;

    /// Pending and in-progress entries of one partition.
    fn load_active_entries(
        &self,
        department: Department,
        date: NaiveDate,
    ) -> StoreResult<Vec<QueueEntry>>;

    fn load_queue_entry(&self, case_id: &str) -> StoreResult<Option<QueueEntry>>;

    /// Insert or update an entry.
    fn save_queue_entry(&self, entry: &QueueEntry) -> StoreResult<()>;

    /// Every entry (any status) of a patient on a date.
    fn load_patient_entries(&self, patient_id: &str, date: NaiveDate)
        -> StoreResult<Vec<QueueEntry>>;

    /// Slots the patient currently holds (Pending or InProgress) on a date.
    fn load_patient_bookings(&self, patient_id: &str, date: NaiveDate) -> StoreResult<Vec<String>> {
        Ok(self
            .load_patient_entries(patient_id, date)?
            .into_iter()
            .filter(|e| e.status.is_active())
            .map(|e| e.slot)
            .collect())
    }
}
