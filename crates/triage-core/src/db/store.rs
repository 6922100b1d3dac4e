//! [`TriageStore`] over SQLite.

use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;

use super::{Database, DbResult};
use crate::models::{CaseStatus, Department, DutyStatus, Provider, QueueEntry};
use crate::store::{StoreResult, TriageStore};

/// Durable store backed by a single SQLite connection.
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }
}

impl TriageStore for SqliteStore {
    fn load_providers(&self, department: Department) -> StoreResult<Vec<Provider>> {
        let db = self.db.lock()?;
        Ok(db.list_providers(Some(department))?)
    }

    fn load_all_providers(&self) -> StoreResult<Vec<Provider>> {
        let db = self.db.lock()?;
        Ok(db.list_providers(None)?)
    }

    fn save_provider(&self, provider: &Provider) -> StoreResult<()> {
        let db = self.db.lock()?;
        Ok(db.upsert_provider(provider)?)
    }

    fn save_provider_load(
        &self,
        provider_id: &str,
        new_load: u32,
        new_status: DutyStatus,
    ) -> StoreResult<()> {
        let db = self.db.lock()?;
        Ok(db.update_provider_load(provider_id, new_load, new_status)?)
    }

    fn load_pending_entries(
        &self,
        department: Department,
        date: NaiveDate,
    ) -> StoreResult<Vec<QueueEntry>> {
        let db = self.db.lock()?;
        Ok(db.list_partition_entries(department, date, &[CaseStatus::Pending])?)
    }

    fn load_active_entries(
        &self,
        department: Department,
        date: NaiveDate,
    ) -> StoreResult<Vec<QueueEntry>> {
        let db = self.db.lock()?;
        Ok(db.list_partition_entries(
            department,
            date,
            &[CaseStatus::Pending, CaseStatus::InProgress],
        )?)
    }

    fn load_queue_entry(&self, case_id: &str) -> StoreResult<Option<QueueEntry>> {
        let db = self.db.lock()?;
        Ok(db.get_entry(case_id)?)
    }

    fn save_queue_entry(&self, entry: &QueueEntry) -> StoreResult<()> {
        let db = self.db.lock()?;
        Ok(db.upsert_entry(entry)?)
    }

    fn load_patient_entries(
        &self,
        patient_id: &str,
        date: NaiveDate,
    ) -> StoreResult<Vec<QueueEntry>> {
        let db = self.db.lock()?;
        Ok(db.list_patient_entries(patient_id, date)?)
    }
}
