//! In-memory store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::NaiveDate;

use super::{StoreError, StoreResult, TriageStore};
use crate::models::{CaseStatus, Department, DutyStatus, Provider, QueueEntry};

/// Mutex-guarded maps implementing [`TriageStore`]. Suitable for tests and
/// single-process deployments that do not need durability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    providers: Mutex<BTreeMap<String, Provider>>,
    entries: Mutex<HashMap<String, QueueEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with a roster.
    pub fn with_providers(providers: impl IntoIterator<Item = Provider>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.providers.lock() {
            for provider in providers {
                map.insert(provider.id.clone(), provider);
            }
        }
        store
    }

    /// Number of stored entries in any status.
    pub fn entry_count(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    fn filter_entries(
        &self,
        predicate: impl Fn(&QueueEntry) -> bool,
    ) -> StoreResult<Vec<QueueEntry>> {
        let entries = self.entries.lock()?;
        Ok(entries.values().filter(|e| predicate(e)).cloned().collect())
    }
}

impl TriageStore for MemoryStore {
    fn load_providers(&self, department: Department) -> StoreResult<Vec<Provider>> {
        let providers = self.providers.lock()?;
        Ok(providers
            .values()
            .filter(|p| p.department == department)
            .cloned()
            .collect())
    }

    fn load_all_providers(&self) -> StoreResult<Vec<Provider>> {
        let providers = self.providers.lock()?;
        Ok(providers.values().cloned().collect())
    }

    fn save_provider(&self, provider: &Provider) -> StoreResult<()> {
        let mut providers = self.providers.lock()?;
        providers.insert(provider.id.clone(), provider.clone());
        Ok(())
    }

    fn save_provider_load(
        &self,
        provider_id: &str,
        new_load: u32,
        new_status: DutyStatus,
    ) -> StoreResult<()> {
        let mut providers = self.providers.lock()?;
        let provider = providers
            .get_mut(provider_id)
            .ok_or_else(|| StoreError::Unavailable(format!("unknown provider {}", provider_id)))?;
        provider.current_load = new_load;
        provider.duty_status = new_status;
        Ok(())
    }

    fn load_pending_entries(
        &self,
        department: Department,
        date: NaiveDate,
    ) -> StoreResult<Vec<QueueEntry>> {
        self.filter_entries(|e| {
            e.department == department && e.date == date && e.status == CaseStatus::Pending
        })
    }

    fn load_active_entries(
        &self,
        department: Department,
        date: NaiveDate,
    ) -> StoreResult<Vec<QueueEntry>> {
        self.filter_entries(|e| e.department == department && e.date == date && e.status.is_active())
    }

    fn load_queue_entry(&self, case_id: &str) -> StoreResult<Option<QueueEntry>> {
        let entries = self.entries.lock()?;
        Ok(entries.get(case_id).cloned())
    }

    fn save_queue_entry(&self, entry: &QueueEntry) -> StoreResult<()> {
        let mut entries = self.entries.lock()?;
        entries.insert(entry.case_id.clone(), entry.clone());
        Ok(())
    }

    fn load_patient_entries(
        &self,
        patient_id: &str,
        date: NaiveDate,
    ) -> StoreResult<Vec<QueueEntry>> {
        self.filter_entries(|e| e.patient_id == patient_id && e.date == date)
    }
}
