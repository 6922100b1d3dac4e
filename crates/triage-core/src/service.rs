//! The coordinating service.
//!
//! One `TriageService` per deployment owns the capacity ledger and the lock
//! tables, and reaches persisted records only through its [`TriageStore`].
//!
//! Lock order is patient lock, then queue lock(s), then the ledger's internal
//! lock. The ledger lock is never held across a store call.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::capacity::{Assignment, AssignmentPlanner, CapacityLedger};
use crate::config::TriageConfig;
use crate::error::{CoreResult, TriageError};
use crate::fingerprint::intake_fingerprint;
use crate::models::{
    CaseStatus, Department, DutyStatus, Intake, Provider, QueueEntry, QueueKey, RiskTier,
    SlotTime, TimeWindow, TriageResult,
};
use crate::queue::{estimate_wait, KeyedLocks, LiveQueueItem, QueueCoordinator, WaitEstimate};
use crate::risk::{RiskEngine, ScoringStrategy};
use crate::scheduling::{ConflictResolution, ConflictResolver, SlotPlanner};
use crate::store::TriageStore;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A patient's intake submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntakeRequest {
    pub patient_id: String,
    /// Appointment date
    pub date: NaiveDate,
    pub window: TimeWindow,
    pub intake: Intake,
}

/// Result of a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingConfirmation {
    pub entry: QueueEntry,
    pub provider: Option<Provider>,
    pub triage: TriageResult,
    /// Backup-provider notice
    pub alert: Option<String>,
    pub conflict: ConflictResolution,
    pub queue_position: Option<u32>,
    pub estimated_wait: WaitEstimate,
    /// True when an identical active submission already existed
    pub duplicate: bool,
}

/// Result of a cancellation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancelOutcome {
    pub entry: QueueEntry,
    /// Provider state after the unit was released
    pub released: Option<Provider>,
    /// The vacated partition after recompute
    pub queue: Vec<QueueEntry>,
}

/// Result of a reschedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RescheduleOutcome {
    pub entry: QueueEntry,
    pub conflict: ConflictResolution,
    /// Backup-provider notice when the department changed
    pub alert: Option<String>,
}

pub struct TriageService<S: TriageStore> {
    store: S,
    ledger: CapacityLedger,
    scorer: Arc<dyn ScoringStrategy>,
    config: TriageConfig,
    slots: SlotPlanner,
    conflicts: ConflictResolver,
    queue_locks: KeyedLocks<QueueKey>,
    patient_locks: KeyedLocks<(String, NaiveDate)>,
    clock: Clock,
}

impl<S: TriageStore> TriageService<S> {
    /// Create a service over `store`, hydrating the ledger from its roster.
    ///
    /// Persisted loads are taken to belong to the current business day.
    pub fn new(store: S, config: TriageConfig) -> CoreResult<Self> {
        let today = Utc::now().date_naive();
        Self::with_business_day(store, config, today)
    }

    pub fn with_business_day(store: S, config: TriageConfig, today: NaiveDate) -> CoreResult<Self> {
        config.validate()?;
        let providers = store.load_all_providers()?;
        tracing::info!(providers = providers.len(), %today, "Triage service ready");
        Ok(Self {
            ledger: CapacityLedger::with_providers(providers, Some(today)),
            store,
            scorer: Arc::new(RiskEngine::new()),
            config,
            slots: SlotPlanner::new(),
            conflicts: ConflictResolver::new(),
            queue_locks: KeyedLocks::new(),
            patient_locks: KeyedLocks::new(),
            clock: Box::new(Utc::now),
        })
    }

    /// Replace the risk scoring strategy.
    pub fn with_scorer(mut self, scorer: Arc<dyn ScoringStrategy>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Replace the wall clock (tests, replays).
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn planner(&self) -> AssignmentPlanner<'_, S> {
        AssignmentPlanner::new(&self.ledger, &self.store)
    }

    fn coordinator(&self) -> QueueCoordinator<'_, S> {
        QueueCoordinator::new(&self.store)
    }

    fn load_case(&self, case_id: &str) -> CoreResult<QueueEntry> {
        self.store
            .load_queue_entry(case_id)?
            .ok_or_else(|| TriageError::CaseNotFound(case_id.to_string()))
    }

    fn recompute(&self, key: QueueKey) -> CoreResult<Vec<QueueEntry>> {
        self.coordinator()
            .recompute_until_consistent(key, self.config.recompute_max_attempts)
    }

    /// Run `f` on a case while holding its queue lock.
    ///
    /// The key comes from a read taken before locking, so the entry is
    /// reloaded under the lock and the attempt starts over when the case
    /// moved to another queue in between.
    fn with_case_locked<R>(
        &self,
        case_id: &str,
        f: impl Fn(QueueEntry) -> CoreResult<R>,
    ) -> CoreResult<R> {
        let attempts = self.config.recompute_max_attempts;
        for _ in 0..attempts {
            let key = self.load_case(case_id)?.key();
            let done = self.queue_locks.with_lock(&key, || {
                let entry = self.load_case(case_id)?;
                if entry.key() != key {
                    return Ok(None);
                }
                f(entry).map(Some)
            })?;
            if let Some(result) = done {
                return Ok(result);
            }
            tracing::debug!(case_id, %key, "Case changed queue before lock, retrying");
        }
        Err(TriageError::ConcurrentUpdate {
            case_id: case_id.to_string(),
            attempts,
        })
    }

    // =========================================================================
    // Pure operations
    // =========================================================================

    pub fn evaluate(&self, intake: &Intake) -> TriageResult {
        self.scorer.evaluate(intake)
    }

    pub fn plan_slot(&self, window: TimeWindow, tier: RiskTier, taken: &[String]) -> SlotTime {
        self.slots.plan_slot(window, tier, taken)
    }

    pub fn resolve_conflict(
        &self,
        patient_id: &str,
        date: NaiveDate,
        slot: SlotTime,
        existing: &[SlotTime],
    ) -> ConflictResolution {
        self.conflicts.resolve_conflict(patient_id, date, slot, existing)
    }

    pub fn estimate_wait(&self, position: u32, tier: RiskTier) -> WaitEstimate {
        estimate_wait(position, tier, &self.config.consult_minutes)
    }

    // =========================================================================
    // Intake
    // =========================================================================

    /// Evaluate, plan, resolve conflicts, assign and enqueue one submission.
    ///
    /// Capacity exhaustion persists nothing. A failed entry write releases
    /// the provider unit taken for it.
    pub fn submit_intake(&self, request: &IntakeRequest) -> CoreResult<BookingConfirmation> {
        let patient_id = request.patient_id.trim();
        if patient_id.is_empty() {
            return Err(TriageError::InvalidInput("patient id is required".into()));
        }

        let triage = self.evaluate(&request.intake);
        let fingerprint = intake_fingerprint(patient_id, request.date, &request.intake);
        let patient_key = (patient_id.to_string(), request.date);

        self.patient_locks.with_lock(&patient_key, || {
            let existing = self.store.load_patient_entries(patient_id, request.date)?;
            let duplicate = existing.iter().find(|e| {
                e.status.is_active() && e.intake_fingerprint.as_deref() == Some(fingerprint.as_str())
            });
            if let Some(entry) = duplicate {
                tracing::info!(patient_id, case_id = %entry.case_id, "Duplicate intake, returning existing booking");
                return self.existing_confirmation(entry.clone(), triage);
            }

            let bookings: Vec<SlotTime> = existing
                .iter()
                .filter(|e| e.status.is_active())
                .filter_map(|e| e.slot.parse().ok())
                .collect();

            let key = QueueKey::new(triage.department, request.date);
            self.queue_locks.with_lock(&key, || {
                self.book(patient_id, request, &triage, &bookings, fingerprint.clone())
            })
        })
    }

    fn book(
        &self,
        patient_id: &str,
        request: &IntakeRequest,
        triage: &TriageResult,
        bookings: &[SlotTime],
        fingerprint: String,
    ) -> CoreResult<BookingConfirmation> {
        let department = triage.department;
        let taken: Vec<String> = self
            .store
            .load_active_entries(department, request.date)?
            .into_iter()
            .map(|e| e.slot)
            .collect();

        let planned = self.plan_slot(request.window, triage.risk_tier, &taken);
        let conflict = self.resolve_conflict(patient_id, request.date, planned, bookings);

        let planner = self.planner();
        let assignment = planner.assign(department, triage.risk_tier, self.today())?;

        let mut entry = QueueEntry::new(
            patient_id,
            department,
            request.date,
            conflict.slot.to_string(),
            triage.risk_tier,
            triage.risk_score,
        );
        entry.created_at = self.now();
        entry.updated_at = entry.created_at;
        entry.provider_id = Some(assignment.provider.id.clone());
        entry.assigned_on = Some(assignment.business_day);
        entry.original_slot = conflict.original_slot.map(|s| s.to_string());
        entry.intake_fingerprint = Some(fingerprint);

        if let Err(err) = self.store.save_queue_entry(&entry) {
            tracing::warn!(patient_id, error = %err, "Entry not persisted, releasing provider unit");
            planner.release_from(&assignment.provider.id, entry.assigned_on)?;
            return Err(err.into());
        }

        let queue = self.recompute(entry.key())?;
        let entry = queue
            .into_iter()
            .find(|e| e.case_id == entry.case_id)
            .unwrap_or(entry);
        let position = entry.queue_position;

        tracing::info!(
            case_id = %entry.case_id,
            %department,
            tier = %triage.risk_tier,
            score = triage.risk_score,
            slot = %entry.slot,
            position = position.unwrap_or(0),
            "Case booked"
        );

        Ok(BookingConfirmation {
            estimated_wait: self.estimate_wait(position.unwrap_or(0), triage.risk_tier),
            queue_position: position,
            provider: Some(assignment.provider),
            alert: assignment.alert,
            triage: triage.clone(),
            conflict,
            entry,
            duplicate: false,
        })
    }

    fn existing_confirmation(
        &self,
        entry: QueueEntry,
        triage: TriageResult,
    ) -> CoreResult<BookingConfirmation> {
        let provider = match entry.provider_id.as_deref() {
            Some(id) => self.ledger.get(id)?,
            None => None,
        };
        let slot: SlotTime = entry.slot.parse().map_err(TriageError::InvalidInput)?;
        let original_slot = entry.original_slot.as_deref().and_then(|s| s.parse().ok());
        let position = entry.queue_position;

        Ok(BookingConfirmation {
            estimated_wait: self.estimate_wait(position.unwrap_or(0), entry.risk_tier),
            queue_position: position,
            provider,
            alert: None,
            triage,
            conflict: ConflictResolution {
                slot,
                rescheduled: original_slot.is_some(),
                original_slot,
                unresolved: false,
            },
            entry,
            duplicate: true,
        })
    }

    // =========================================================================
    // Capacity
    // =========================================================================

    /// Assign a provider in `department` without booking a case.
    pub fn assign(&self, department: Department, tier: RiskTier) -> CoreResult<Assignment> {
        self.planner().assign(department, tier, self.today())
    }

    /// Reset every provider's load for the current day.
    pub fn rollover_capacity(&self) -> CoreResult<Vec<Provider>> {
        let providers = self.planner().rollover(self.today())?;
        self.queue_locks.prune()?;
        self.patient_locks.prune()?;
        Ok(providers)
    }

    /// Add or replace a provider on the roster.
    pub fn register_provider(&self, provider: Provider) -> CoreResult<Provider> {
        if provider.id.trim().is_empty() {
            return Err(TriageError::InvalidInput("provider id is required".into()));
        }
        let provider = self.ledger.upsert(provider)?;
        self.store.save_provider(&provider)?;
        tracing::info!(provider_id = %provider.id, department = %provider.department, backup = provider.is_backup, "Provider registered");
        Ok(provider)
    }

    /// Seed the demo roster when the store has no providers.
    pub fn seed_roster_if_empty(&self, roster: Vec<Provider>) -> CoreResult<usize> {
        if !self.ledger.providers(None)?.is_empty() {
            return Ok(0);
        }
        let count = roster.len();
        for provider in roster {
            self.register_provider(provider)?;
        }
        Ok(count)
    }

    /// Admin override of a provider's duty status.
    pub fn set_duty_status(&self, provider_id: &str, status: DutyStatus) -> CoreResult<Provider> {
        let previous = self
            .ledger
            .get(provider_id)?
            .ok_or_else(|| TriageError::InvalidInput(format!("unknown provider {}", provider_id)))?;
        let updated = self.ledger.set_duty_status(provider_id, status)?;
        if let Err(err) = self.planner().sync(provider_id) {
            self.ledger.set_duty_status(provider_id, previous.duty_status)?;
            return Err(err);
        }
        tracing::info!(provider_id, from = %previous.duty_status, to = %status, "Duty status changed");
        Ok(updated)
    }

    pub fn list_providers(&self, department: Option<Department>) -> CoreResult<Vec<Provider>> {
        self.ledger.providers(department)
    }

    // =========================================================================
    // Queue
    // =========================================================================

    pub fn get_case(&self, case_id: &str) -> CoreResult<QueueEntry> {
        self.load_case(case_id)
    }

    /// Pending entries of a partition in queue order.
    pub fn queue(&self, department: Department, date: NaiveDate) -> CoreResult<Vec<QueueEntry>> {
        self.coordinator().queue(department, date)
    }

    pub fn recompute_positions(
        &self,
        department: Department,
        date: NaiveDate,
    ) -> CoreResult<Vec<QueueEntry>> {
        let key = QueueKey::new(department, date);
        self.queue_locks.with_lock(&key, || self.recompute(key))
    }

    pub fn live_queue(&self, department: Department, date: NaiveDate) -> CoreResult<Vec<LiveQueueItem>> {
        self.coordinator()
            .live_queue(department, date, self.now(), self.config.delay_alert_minutes)
    }

    /// Cancel a Pending or InProgress case and release its provider unit.
    ///
    /// Cancelling an already cancelled case re-syncs its provider and
    /// recomputes the queue without releasing a second unit. A unit taken on
    /// an earlier business day was cleared by the rollover and is not
    /// released again.
    pub fn cancel_case(&self, case_id: &str) -> CoreResult<CancelOutcome> {
        self.with_case_locked(case_id, |mut entry| {
            let key = entry.key();
            let planner = self.planner();

            let released = match entry.status {
                CaseStatus::Cancelled => match entry.provider_id.as_deref() {
                    Some(id) => planner.sync(id)?,
                    None => None,
                },
                status if status.can_transition_to(CaseStatus::Cancelled) => {
                    entry.status = CaseStatus::Cancelled;
                    entry.queue_position = None;
                    entry.touch();
                    self.store.save_queue_entry(&entry)?;
                    match entry.provider_id.as_deref() {
                        Some(id) => planner.release_from(id, entry.assigned_on)?,
                        None => None,
                    }
                }
                status => {
                    return Err(TriageError::InvalidTransition {
                        case_id: case_id.to_string(),
                        from: status,
                        to: CaseStatus::Cancelled,
                    })
                }
            };

            let queue = self.recompute(key)?;
            tracing::info!(case_id, %key, remaining = queue.len(), "Case cancelled");
            Ok(CancelOutcome {
                entry,
                released,
                queue,
            })
        })
    }

    /// Move a Pending case to InProgress, optionally re-binding it to a
    /// specific provider.
    pub fn start_case(&self, case_id: &str, provider_id: Option<&str>) -> CoreResult<QueueEntry> {
        self.with_case_locked(case_id, |mut entry| {
            self.check_transition(&entry, CaseStatus::InProgress)?;

            let rebind = provider_id.filter(|id| entry.provider_id.as_deref() != Some(*id));
            let planner = self.planner();
            let previous_provider = entry.provider_id.clone();
            let previous_day = entry.assigned_on;
            if let Some(new_id) = rebind {
                let target = self
                    .ledger
                    .get(new_id)?
                    .ok_or_else(|| TriageError::InvalidInput(format!("unknown provider {}", new_id)))?;
                if target.department != entry.department {
                    return Err(TriageError::InvalidInput(format!(
                        "provider {} is not in {}",
                        new_id, entry.department
                    )));
                }
                let assignment = planner.assign_to(new_id, entry.risk_tier, self.today())?;
                entry.provider_id = Some(new_id.to_string());
                entry.assigned_on = Some(assignment.business_day);
            }

            entry.status = CaseStatus::InProgress;
            entry.queue_position = None;
            entry.touch();
            if let Err(err) = self.store.save_queue_entry(&entry) {
                if let Some(new_id) = rebind {
                    planner.release_from(new_id, entry.assigned_on)?;
                }
                return Err(err.into());
            }

            if let (Some(_), Some(old)) = (rebind, previous_provider.as_deref()) {
                planner.release_from(old, previous_day)?;
            }

            self.recompute(entry.key())?;
            tracing::info!(case_id, provider_id = entry.provider_id.as_deref().unwrap_or("-"), "Case started");
            Ok(entry)
        })
    }

    /// Mark an InProgress case Completed. The provider unit is kept: it
    /// counts toward the day's load.
    pub fn complete_case(&self, case_id: &str) -> CoreResult<QueueEntry> {
        self.with_case_locked(case_id, |mut entry| {
            self.check_transition(&entry, CaseStatus::Completed)?;
            entry.status = CaseStatus::Completed;
            entry.queue_position = None;
            entry.touch();
            self.store.save_queue_entry(&entry)?;
            tracing::info!(case_id, "Case completed");
            Ok(entry)
        })
    }

    /// Move a Pending case to a new date, slot and optionally department.
    ///
    /// A department change acquires a unit in the destination first and
    /// releases the old unit only after the entry is saved. Both the vacated
    /// and the destination partition are recomputed.
    pub fn reschedule_case(
        &self,
        case_id: &str,
        new_date: NaiveDate,
        new_slot: SlotTime,
        new_department: Option<Department>,
    ) -> CoreResult<RescheduleOutcome> {
        let attempts = self.config.recompute_max_attempts;
        for _ in 0..attempts {
            let current = self.load_case(case_id)?;
            let from_key = current.key();
            let to_key = QueueKey::new(new_department.unwrap_or(current.department), new_date);
            let patient_keys = [
                (current.patient_id.clone(), current.date),
                (current.patient_id.clone(), new_date),
            ];

            let done = self.patient_locks.with_locks(&patient_keys, || {
                self.queue_locks.with_locks(&[from_key, to_key], || {
                    let entry = self.load_case(case_id)?;
                    if entry.key() != from_key {
                        return Ok(None);
                    }
                    self.move_case(entry, to_key, new_slot).map(Some)
                })
            })?;
            if let Some(outcome) = done {
                return Ok(outcome);
            }
            tracing::debug!(case_id, %from_key, "Case changed queue before lock, retrying");
        }
        Err(TriageError::ConcurrentUpdate {
            case_id: case_id.to_string(),
            attempts,
        })
    }

    /// Reschedule body, run with the patient and both queue locks held.
    fn move_case(
        &self,
        mut entry: QueueEntry,
        to_key: QueueKey,
        new_slot: SlotTime,
    ) -> CoreResult<RescheduleOutcome> {
        if entry.status != CaseStatus::Pending {
            return Err(TriageError::InvalidTransition {
                case_id: entry.case_id.clone(),
                from: entry.status,
                to: CaseStatus::Pending,
            });
        }
        let from_key = entry.key();

        let bookings: Vec<SlotTime> = self
            .store
            .load_patient_entries(&entry.patient_id, to_key.date)?
            .into_iter()
            .filter(|e| e.status.is_active() && e.case_id != entry.case_id)
            .filter_map(|e| e.slot.parse().ok())
            .collect();
        let conflict = self.resolve_conflict(&entry.patient_id, to_key.date, new_slot, &bookings);

        let planner = self.planner();
        let moved = (to_key.department != entry.department)
            .then(|| planner.assign(to_key.department, entry.risk_tier, self.today()))
            .transpose()?;

        let old_provider = entry.provider_id.clone();
        let old_day = entry.assigned_on;
        entry.department = to_key.department;
        entry.date = to_key.date;
        entry.slot = conflict.slot.to_string();
        entry.original_slot = conflict.original_slot.map(|s| s.to_string());
        entry.queue_position = None;
        if let Some(assignment) = &moved {
            entry.provider_id = Some(assignment.provider.id.clone());
            entry.assigned_on = Some(assignment.business_day);
        }
        entry.touch();

        if let Err(err) = self.store.save_queue_entry(&entry) {
            if let Some(assignment) = &moved {
                planner.release_from(&assignment.provider.id, Some(assignment.business_day))?;
            }
            return Err(err.into());
        }

        if moved.is_some() {
            if let Some(old) = old_provider.as_deref() {
                planner.release_from(old, old_day)?;
            }
        }

        if from_key != to_key {
            self.recompute(from_key)?;
        }
        let queue = self.recompute(to_key)?;
        let entry = queue
            .into_iter()
            .find(|e| e.case_id == entry.case_id)
            .unwrap_or(entry);

        tracing::info!(case_id = %entry.case_id, from = %from_key, to = %to_key, slot = %entry.slot, "Case rescheduled");
        Ok(RescheduleOutcome {
            entry,
            conflict,
            alert: moved.and_then(|a| a.alert),
        })
    }

    fn check_transition(&self, entry: &QueueEntry, to: CaseStatus) -> CoreResult<()> {
        if entry.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(TriageError::InvalidTransition {
                case_id: entry.case_id.clone(),
                from: entry.status,
                to,
            })
        }
    }
}
