//! In-process capacity ledger.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::NaiveDate;

use crate::error::{CoreResult, TriageError};
use crate::models::{Department, DutyStatus, Provider};
use crate::queue::KeyedLocks;

/// A load unit taken from a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    /// Provider state after the increment
    pub provider: Provider,
    /// Duty status before the increment
    pub previous_status: DutyStatus,
    /// Providers reset by a rollover that ran before this reservation
    pub rolled_over: Vec<Provider>,
    /// Business day the unit counts against
    pub business_day: NaiveDate,
}

#[derive(Debug, Default)]
struct LedgerState {
    providers: BTreeMap<String, Provider>,
    /// Status to restore when a provider drops below capacity
    resume_status: HashMap<String, DutyStatus>,
    business_day: Option<NaiveDate>,
    /// Providers changed since their last successful write, by revision
    dirty: BTreeMap<String, u64>,
    revision: u64,
}

impl LedgerState {
    fn mark_dirty(&mut self, provider_id: &str) {
        self.revision += 1;
        self.dirty.insert(provider_id.to_string(), self.revision);
    }

    /// Roll over when `today` is later than the current business day.
    fn advance_to(&mut self, today: NaiveDate) -> (Vec<Provider>, NaiveDate) {
        match self.business_day {
            Some(day) if day >= today => (Vec::new(), day),
            _ => (self.rollover(today), today),
        }
    }

    fn take_unit(&mut self, provider_id: &str) -> Option<(Provider, DutyStatus)> {
        let provider = self.providers.get_mut(provider_id)?;
        let previous = provider.duty_status;
        if !provider.take_unit() {
            return None;
        }
        if provider.duty_status == DutyStatus::Busy && previous != DutyStatus::Busy {
            self.resume_status.insert(provider.id.clone(), previous);
        }
        let taken = provider.clone();
        self.mark_dirty(provider_id);
        Some((taken, previous))
    }

    fn release_unit(&mut self, provider_id: &str) -> Option<Provider> {
        let provider = self.providers.get_mut(provider_id)?;
        let was_busy = provider.duty_status == DutyStatus::Busy;
        provider.release_unit();
        if was_busy && provider.duty_status != DutyStatus::Busy {
            if let Some(status) = self.resume_status.remove(provider_id) {
                provider.duty_status = status;
            }
        }
        let released = provider.clone();
        self.mark_dirty(provider_id);
        Some(released)
    }

    fn rollover(&mut self, day: NaiveDate) -> Vec<Provider> {
        let mut reset = Vec::with_capacity(self.providers.len());
        for provider in self.providers.values_mut() {
            let was_busy = provider.duty_status == DutyStatus::Busy;
            provider.reset_load();
            if was_busy {
                if let Some(status) = self.resume_status.remove(&provider.id) {
                    provider.duty_status = status;
                }
            }
            reset.push(provider.clone());
        }
        self.resume_status.clear();
        self.business_day = Some(day);
        for provider in &reset {
            self.mark_dirty(&provider.id);
        }
        reset
    }
}

/// Per-provider load against daily maximum.
///
/// All mutation happens under a single short-lived lock; no store I/O is
/// performed while it is held. Every mutation marks the provider dirty until
/// [`CapacityLedger::persist`] has written a state at least that recent.
#[derive(Debug, Default)]
pub struct CapacityLedger {
    state: Mutex<LedgerState>,
    /// Serializes store writes per provider
    writes: KeyedLocks<String>,
}

impl CapacityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger for a roster already valid for `business_day`.
    pub fn with_providers(
        providers: impl IntoIterator<Item = Provider>,
        business_day: Option<NaiveDate>,
    ) -> Self {
        let ledger = Self::new();
        if let Ok(mut state) = ledger.state.lock() {
            for mut provider in providers {
                provider.normalize();
                state.providers.insert(provider.id.clone(), provider);
            }
            state.business_day = business_day;
        }
        ledger
    }

    /// Replace the whole roster.
    pub fn load(&self, providers: impl IntoIterator<Item = Provider>) -> CoreResult<()> {
        let mut state = self.state.lock()?;
        state.providers.clear();
        state.resume_status.clear();
        for mut provider in providers {
            provider.normalize();
            state.providers.insert(provider.id.clone(), provider);
        }
        Ok(())
    }

    /// Add or replace one provider.
    pub fn upsert(&self, mut provider: Provider) -> CoreResult<Provider> {
        provider.normalize();
        let mut state = self.state.lock()?;
        state.resume_status.remove(&provider.id);
        state.providers.insert(provider.id.clone(), provider.clone());
        Ok(provider)
    }

    pub fn get(&self, provider_id: &str) -> CoreResult<Option<Provider>> {
        let state = self.state.lock()?;
        Ok(state.providers.get(provider_id).cloned())
    }

    /// Snapshot of the roster, optionally for one department.
    pub fn providers(&self, department: Option<Department>) -> CoreResult<Vec<Provider>> {
        let state = self.state.lock()?;
        Ok(state
            .providers
            .values()
            .filter(|p| department.map_or(true, |d| p.department == d))
            .cloned()
            .collect())
    }

    pub fn business_day(&self) -> CoreResult<Option<NaiveDate>> {
        Ok(self.state.lock()?.business_day)
    }

    /// Select and take one load unit in `department`.
    ///
    /// Runs the daily rollover first when `today` is a new business day.
    pub fn reserve(&self, department: Department, today: NaiveDate) -> CoreResult<Reservation> {
        let mut state = self.state.lock()?;
        let (rolled_over, business_day) = state.advance_to(today);

        let chosen = select_provider(state.providers.values(), department).map(|p| p.id.clone());
        let Some(provider_id) = chosen else {
            return Err(TriageError::CapacityExhausted { department });
        };

        let (provider, previous_status) = state
            .take_unit(&provider_id)
            .ok_or(TriageError::CapacityExhausted { department })?;

        Ok(Reservation {
            provider,
            previous_status,
            rolled_over,
            business_day,
        })
    }

    /// Take one load unit from a specific provider (admin re-binding).
    pub fn reserve_provider(&self, provider_id: &str, today: NaiveDate) -> CoreResult<Reservation> {
        let mut state = self.state.lock()?;
        let (rolled_over, business_day) = state.advance_to(today);

        let department = state
            .providers
            .get(provider_id)
            .map(|p| p.department)
            .ok_or_else(|| TriageError::InvalidInput(format!("unknown provider {}", provider_id)))?;

        let (provider, previous_status) = state
            .take_unit(provider_id)
            .ok_or(TriageError::CapacityExhausted { department })?;

        Ok(Reservation {
            provider,
            previous_status,
            rolled_over,
            business_day,
        })
    }

    /// Undo a reservation whose persistence failed.
    pub fn rollback(&self, reservation: &Reservation) -> CoreResult<Option<Provider>> {
        let mut state = self.state.lock()?;
        let id = &reservation.provider.id;
        let Some(provider) = state.providers.get_mut(id) else {
            return Ok(None);
        };
        provider.current_load = provider.current_load.saturating_sub(1);
        provider.duty_status = reservation.previous_status;
        let snapshot = provider.clone();
        state.resume_status.remove(id);
        state.mark_dirty(id);
        Ok(Some(snapshot))
    }

    /// Give back one unit (floor 0). Returns the provider state afterwards.
    pub fn release(&self, provider_id: &str) -> CoreResult<Option<Provider>> {
        let mut state = self.state.lock()?;
        Ok(state.release_unit(provider_id))
    }

    /// Reset every provider's load for a new business day.
    pub fn rollover(&self, today: NaiveDate) -> CoreResult<Vec<Provider>> {
        let mut state = self.state.lock()?;
        Ok(state.rollover(today))
    }

    /// Providers with changes not yet written, in id order.
    pub fn dirty(&self) -> CoreResult<Vec<String>> {
        Ok(self.state.lock()?.dirty.keys().cloned().collect())
    }

    /// Write the latest state of one provider with `write`.
    ///
    /// Writes for the same provider are serialized and always carry the
    /// state current when the write starts, so the last write to land is
    /// never older than the ledger. The dirty mark is cleared only when no
    /// newer change arrived meanwhile.
    pub fn persist(
        &self,
        provider_id: &str,
        write: impl FnOnce(&Provider) -> CoreResult<()>,
    ) -> CoreResult<Option<Provider>> {
        self.writes.with_lock(&provider_id.to_string(), || {
            let (provider, revision) = {
                let state = self.state.lock()?;
                let Some(provider) = state.providers.get(provider_id).cloned() else {
                    return Ok(None);
                };
                (provider, state.dirty.get(provider_id).copied())
            };

            write(&provider)?;

            let mut state = self.state.lock()?;
            if revision.is_some() && state.dirty.get(provider_id).copied() == revision {
                state.dirty.remove(provider_id);
            }
            Ok(Some(provider))
        })
    }

    /// Admin override of a provider's duty status.
    ///
    /// Busy is reserved for providers at capacity, and a provider at capacity
    /// cannot be put back on duty.
    pub fn set_duty_status(&self, provider_id: &str, status: DutyStatus) -> CoreResult<Provider> {
        let mut state = self.state.lock()?;
        let provider = state
            .providers
            .get_mut(provider_id)
            .ok_or_else(|| TriageError::InvalidInput(format!("unknown provider {}", provider_id)))?;

        let at_capacity = !provider.has_capacity();
        if at_capacity != (status == DutyStatus::Busy) {
            return Err(TriageError::InvalidInput(format!(
                "provider {} is at {}/{} and cannot be {}",
                provider_id, provider.current_load, provider.max_daily, status
            )));
        }
        provider.duty_status = status;
        let updated = provider.clone();
        state.mark_dirty(provider_id);
        Ok(updated)
    }
}

/// Selection policy over a roster.
///
/// Regular providers first (Available before OnCall, then lowest load), then
/// backups by lowest load. Ties break on provider id.
pub fn select_provider<'a>(
    providers: impl IntoIterator<Item = &'a Provider>,
    department: Department,
) -> Option<&'a Provider> {
    let (regular, backup): (Vec<&Provider>, Vec<&Provider>) = providers
        .into_iter()
        .filter(|p| p.department == department && p.has_capacity())
        .partition(|p| !p.is_backup);

    let by_load = |a: &&Provider, b: &&Provider| -> Ordering {
        a.current_load.cmp(&b.current_load).then_with(|| a.id.cmp(&b.id))
    };

    let best_regular = regular.into_iter().min_by(|a, b| {
        let rank = |p: &Provider| u8::from(p.duty_status != DutyStatus::Available);
        rank(*a).cmp(&rank(*b)).then_with(|| by_load(a, b))
    });

    best_regular.or_else(|| backup.into_iter().min_by(by_load))
}
