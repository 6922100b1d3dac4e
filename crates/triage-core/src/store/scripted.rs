//! A [`MemoryStore`] wrapper whose failures and timing can be scripted.

use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;

use super::{MemoryStore, StoreError, StoreResult, TriageStore};
use crate::models::{Department, DutyStatus, Provider, QueueEntry};

type Pause = (Sender<()>, Receiver<()>);

#[derive(Debug, Default)]
pub struct ScriptedStore {
    pub inner: MemoryStore,
    failing_providers: Mutex<HashSet<String>>,
    slow_provider_write: Mutex<Option<Duration>>,
    pause_entry_load: Mutex<Option<Pause>>,
}

impl ScriptedStore {
    pub fn with_providers(providers: impl IntoIterator<Item = Provider>) -> Self {
        Self {
            inner: MemoryStore::with_providers(providers),
            ..Self::default()
        }
    }

    /// Load writes for `provider_id` fail until [`Self::heal`].
    pub fn fail_provider(&self, provider_id: &str) {
        self.failing_providers.lock().unwrap().insert(provider_id.to_string());
    }

    pub fn heal(&self) {
        self.failing_providers.lock().unwrap().clear();
    }

    /// Delay the next provider load write by `delay` before it is applied.
    pub fn slow_next_provider_write(&self, delay: Duration) {
        *self.slow_provider_write.lock().unwrap() = Some(delay);
    }

    /// Block the next `load_queue_entry` after it has read.
    ///
    /// Returns a receiver signalled once the read happened and a sender
    /// that lets it return.
    pub fn pause_next_entry_load(&self) -> (Receiver<()>, Sender<()>) {
        let (paused_tx, paused_rx) = mpsc::channel();
        let (resume_tx, resume_rx) = mpsc::channel();
        *self.pause_entry_load.lock().unwrap() = Some((paused_tx, resume_rx));
        (paused_rx, resume_tx)
    }
}

impl TriageStore for ScriptedStore {
    fn load_providers(&self, department: Department) -> StoreResult<Vec<Provider>> {
        self.inner.load_providers(department)
    }

    fn load_all_providers(&self) -> StoreResult<Vec<Provider>> {
        self.inner.load_all_providers()
    }

    fn save_provider(&self, provider: &Provider) -> StoreResult<()> {
        self.inner.save_provider(provider)
    }

    fn save_provider_load(
        &self,
        provider_id: &str,
        new_load: u32,
        new_status: DutyStatus,
    ) -> StoreResult<()> {
        if self.failing_providers.lock()?.contains(provider_id) {
            return Err(StoreError::Unavailable(format!("write for {} refused", provider_id)));
        }
        let delay = self.slow_provider_write.lock()?.take();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        self.inner.save_provider_load(provider_id, new_load, new_status)
    }

    fn load_pending_entries(
        &self,
        department: Department,
        date: NaiveDate,
    ) -> StoreResult<Vec<QueueEntry>> {
        self.inner.load_pending_entries(department, date)
    }

    fn load_active_entries(
        &self,
        department: Department,
        date: NaiveDate,
    ) -> StoreResult<Vec<QueueEntry>> {
        self.inner.load_active_entries(department, date)
    }

    fn load_queue_entry(&self, case_id: &str) -> StoreResult<Option<QueueEntry>> {
        let entry = self.inner.load_queue_entry(case_id)?;
        let pause = self.pause_entry_load.lock()?.take();
        if let Some((paused, resume)) = pause {
            let _ = paused.send(());
            let _ = resume.recv();
        }
        Ok(entry)
    }

    fn save_queue_entry(&self, entry: &QueueEntry) -> StoreResult<()> {
        self.inner.save_queue_entry(entry)
    }

    fn load_patient_entries(
        &self,
        patient_id: &str,
        date: NaiveDate,
    ) -> StoreResult<Vec<QueueEntry>> {
        self.inner.load_patient_entries(patient_id, date)
    }
}
