//! Triage Core Library
//!
//! Patient-intake triage and appointment allocation: deterministic risk
//! scoring, capacity-aware provider assignment and per-department priority
//! queues.
//!
//! # Architecture
//!
//! ```text
//! Intake ─► RiskEngine ─► SlotPlanner ─► ConflictResolver
//!                                              │
//!                                              ▼
//!                              AssignmentPlanner ◄──► CapacityLedger
//!                                              │
//!                                              ▼
//!                                   TriageStore (save entry)
//!                                              │
//!                                              ▼
//!                        QueueCoordinator (recompute dense positions)
//! ```
//!
//! # Core Principle
//!
//! **A provider unit is never committed without its persisted counterpart.**
//! Ledger mutations are rolled back when the store write behind them fails.
//!
//! # Modules
//!
//! - [`risk`]: Rule-table risk scoring
//! - [`scheduling`]: Slot planning and conflict resolution
//! - [`capacity`]: Provider ledger and assignment policy
//! - [`queue`]: Queue ranking, severity and wait metrics
//! - [`store`]: Store interface and in-memory store
//! - [`db`]: SQLite store
//! - [`service`]: The coordinating service

pub mod capacity;
pub mod config;
pub mod db;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod queue;
pub mod risk;
pub mod scheduling;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use capacity::{Assignment, AssignmentOutcome, AssignmentPlanner, CapacityLedger};
pub use config::TriageConfig;
pub use db::{Database, SqliteStore};
pub use error::{CoreResult, TriageError};
pub use models::{
    CaseStatus, Department, DutyStatus, Intake, Provider, QueueEntry, QueueKey, RiskTier,
    SlotTime, TimeWindow, TriageResult, Vitals,
};
pub use queue::{LiveQueueItem, QueueCoordinator};
pub use risk::{RiskEngine, ScoringStrategy};
pub use scheduling::{ConflictResolution, ConflictResolver, SlotPlanner};
pub use service::{BookingConfirmation, IntakeRequest, TriageService};
pub use store::{MemoryStore, StoreError, TriageStore};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum TriageCoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Capacity exhausted: {0}")]
    CapacityExhausted(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Queue error: {0}")]
    QueueError(String),
}

impl From<TriageError> for TriageCoreError {
    fn from(e: TriageError) -> Self {
        match e {
            TriageError::CapacityExhausted { .. } => TriageCoreError::CapacityExhausted(e.to_string()),
            TriageError::Persistence(_) => TriageCoreError::DatabaseError(e.to_string()),
            TriageError::CaseNotFound(id) => TriageCoreError::NotFound(id),
            TriageError::InvalidTransition { .. } => TriageCoreError::InvalidTransition(e.to_string()),
            TriageError::InvalidInput(msg) => TriageCoreError::InvalidInput(msg),
            TriageError::RecomputeFailed { .. } | TriageError::ConcurrentUpdate { .. } => {
                TriageCoreError::QueueError(e.to_string())
            }
        }
    }
}

impl From<db::DbError> for TriageCoreError {
    fn from(e: db::DbError) -> Self {
        TriageCoreError::DatabaseError(e.to_string())
    }
}

impl From<StoreError> for TriageCoreError {
    fn from(e: StoreError) -> Self {
        TriageCoreError::DatabaseError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for TriageCoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        TriageCoreError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

fn parse<T: FromStr<Err = String>>(value: &str) -> Result<T, TriageCoreError> {
    value.parse().map_err(TriageCoreError::InvalidInput)
}

fn parse_date(value: &str) -> Result<NaiveDate, TriageCoreError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| TriageCoreError::InvalidInput(format!("date {:?}: {}", value, e)))
}

fn parse_department(value: Option<String>) -> Result<Option<Department>, TriageCoreError> {
    value.as_deref().map(parse).transpose()
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<TriageCore>, TriageCoreError> {
    open_database_with_config(path, None)
}

/// Open a database with a JSON configuration document.
///
/// Installs the tracing subscriber with the configured `log_filter` unless
/// one is already set.
#[uniffi::export]
pub fn open_database_with_config(
    path: String,
    config_json: Option<String>,
) -> Result<Arc<TriageCore>, TriageCoreError> {
    let config = match config_json {
        Some(json) => TriageConfig::from_json_str(&json)?,
        None => TriageConfig::default(),
    };
    config::init_logging(Some(&config.log_filter));
    let store = SqliteStore::open(&path)?;
    let service = TriageService::new(store, config)?;
    Ok(Arc::new(TriageCore { service }))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<TriageCore>, TriageCoreError> {
    let store = SqliteStore::open_in_memory()?;
    let service = TriageService::new(store, TriageConfig::default())?;
    Ok(Arc::new(TriageCore { service }))
}

/// Install the tracing subscriber. `RUST_LOG` takes precedence.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) {
    config::init_logging(filter.as_deref());
}

// =========================================================================
// Pure Functions (exported to FFI)
// =========================================================================

/// Score an intake without booking anything.
#[uniffi::export]
pub fn evaluate(symptoms: Vec<String>, vitals: FfiVitals, medical_history: String) -> FfiTriageResult {
    risk::evaluate(&symptoms, &vitals.into(), &medical_history).into()
}

/// Live severity score: tier weight plus one point per five minutes waited.
#[uniffi::export]
pub fn severity_score(risk_tier: String, waiting_minutes: u32) -> Result<u32, TriageCoreError> {
    Ok(queue::severity_score(parse(&risk_tier)?, waiting_minutes))
}

/// Pick a slot label from a time window.
#[uniffi::export]
pub fn plan_slot(
    window: String,
    risk_tier: String,
    taken: Vec<String>,
) -> Result<String, TriageCoreError> {
    let window = TimeWindow::from_label(&window);
    Ok(scheduling::plan_slot(window, parse(&risk_tier)?, &taken).to_string())
}

/// Shift a slot away from the patient's existing bookings.
#[uniffi::export]
pub fn resolve_conflict(
    patient_id: String,
    date: String,
    slot: String,
    existing: Vec<String>,
) -> Result<FfiConflictResolution, TriageCoreError> {
    let existing: Vec<SlotTime> = existing
        .iter()
        .map(|s| parse(s))
        .collect::<Result<_, _>>()?;
    let resolution =
        scheduling::resolve_conflict(&patient_id, parse_date(&date)?, parse(&slot)?, &existing);
    Ok(resolution.into())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe service wrapper for FFI.
#[derive(uniffi::Object)]
pub struct TriageCore {
    service: TriageService<SqliteStore>,
}

#[uniffi::export]
impl TriageCore {
    // =========================================================================
    // Intake
    // =========================================================================

    /// Evaluate, schedule and enqueue a submission.
    pub fn submit_intake(&self, intake: FfiIntake) -> Result<FfiBooking, TriageCoreError> {
        let request = IntakeRequest {
            patient_id: intake.patient_id,
            date: parse_date(&intake.date)?,
            window: TimeWindow::from_label(&intake.window),
            intake: Intake::new(intake.symptoms)
                .with_vitals(intake.vitals.into())
                .with_history(intake.medical_history),
        };
        Ok(self.service.submit_intake(&request)?.into())
    }

    /// Assign a provider without booking. Exhaustion is an outcome, not an error.
    pub fn assign(
        &self,
        department: String,
        risk_tier: String,
    ) -> Result<FfiAssignmentOutcome, TriageCoreError> {
        let result = self.service.assign(parse(&department)?, parse(&risk_tier)?);
        Ok(AssignmentOutcome::from_result(result)?.into())
    }

    // =========================================================================
    // Case Lifecycle
    // =========================================================================

    pub fn get_case(&self, case_id: String) -> Result<FfiQueueEntry, TriageCoreError> {
        Ok(self.service.get_case(&case_id)?.into())
    }

    pub fn start_case(
        &self,
        case_id: String,
        provider_id: Option<String>,
    ) -> Result<FfiQueueEntry, TriageCoreError> {
        Ok(self.service.start_case(&case_id, provider_id.as_deref())?.into())
    }

    pub fn complete_case(&self, case_id: String) -> Result<FfiQueueEntry, TriageCoreError> {
        Ok(self.service.complete_case(&case_id)?.into())
    }

    pub fn cancel_case(&self, case_id: String) -> Result<FfiCancelOutcome, TriageCoreError> {
        let outcome = self.service.cancel_case(&case_id)?;
        Ok(FfiCancelOutcome {
            entry: outcome.entry.into(),
            released: outcome.released.map(Into::into),
            remaining_in_queue: outcome.queue.len() as u32,
        })
    }

    pub fn reschedule_case(
        &self,
        case_id: String,
        new_date: String,
        new_slot: String,
        new_department: Option<String>,
    ) -> Result<FfiRescheduleOutcome, TriageCoreError> {
        let outcome = self.service.reschedule_case(
            &case_id,
            parse_date(&new_date)?,
            parse(&new_slot)?,
            parse_department(new_department)?,
        )?;
        Ok(FfiRescheduleOutcome {
            entry: outcome.entry.into(),
            conflict: outcome.conflict.into(),
            alert: outcome.alert,
        })
    }

    // =========================================================================
    // Queue
    // =========================================================================

    /// Pending entries in queue order.
    pub fn queue(&self, department: String, date: String) -> Result<Vec<FfiQueueEntry>, TriageCoreError> {
        let entries = self.service.queue(parse(&department)?, parse_date(&date)?)?;
        Ok(entries.into_iter().map(Into::into).collect())
    }

    pub fn recompute_positions(
        &self,
        department: String,
        date: String,
    ) -> Result<Vec<FfiQueueEntry>, TriageCoreError> {
        let entries = self
            .service
            .recompute_positions(parse(&department)?, parse_date(&date)?)?;
        Ok(entries.into_iter().map(Into::into).collect())
    }

    /// Pending entries by live severity, with delay flags.
    pub fn live_queue(
        &self,
        department: String,
        date: String,
    ) -> Result<Vec<FfiLiveQueueItem>, TriageCoreError> {
        let items = self.service.live_queue(parse(&department)?, parse_date(&date)?)?;
        Ok(items.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Roster
    // =========================================================================

    pub fn register_provider(&self, provider: FfiProvider) -> Result<FfiProvider, TriageCoreError> {
        let provider = Provider::try_from(provider)?;
        Ok(self.service.register_provider(provider)?.into())
    }

    /// Seed the demo roster if no provider is registered yet.
    pub fn seed_demo_roster(&self) -> Result<u32, TriageCoreError> {
        Ok(self.service.seed_roster_if_empty(models::demo_roster())? as u32)
    }

    pub fn set_duty_status(
        &self,
        provider_id: String,
        status: String,
    ) -> Result<FfiProvider, TriageCoreError> {
        Ok(self.service.set_duty_status(&provider_id, parse(&status)?)?.into())
    }

    pub fn list_providers(&self, department: Option<String>) -> Result<Vec<FfiProvider>, TriageCoreError> {
        let providers = self.service.list_providers(parse_department(department)?)?;
        Ok(providers.into_iter().map(Into::into).collect())
    }

    /// Reset all provider loads for today.
    pub fn rollover_capacity(&self) -> Result<Vec<FfiProvider>, TriageCoreError> {
        let providers = self.service.rollover_capacity()?;
        Ok(providers.into_iter().map(Into::into).collect())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe vitals. Values are passed as entered.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiVitals {
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<String>,
    pub temperature: Option<String>,
    pub oxygen_level: Option<String>,
}

impl From<FfiVitals> for Vitals {
    fn from(v: FfiVitals) -> Self {
        Vitals {
            blood_pressure: v.blood_pressure,
            heart_rate: v.heart_rate,
            temperature: v.temperature,
            oxygen_level: v.oxygen_level,
        }
    }
}

/// FFI-safe intake submission.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiIntake {
    pub patient_id: String,
    /// YYYY-MM-DD
    pub date: String,
    /// "Morning", "Afternoon (12PM - 4PM)", ...
    pub window: String,
    pub symptoms: Vec<String>,
    pub vitals: FfiVitals,
    pub medical_history: String,
}

/// FFI-safe triage result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTriageResult {
    pub risk_tier: String,
    pub risk_score: u32,
    pub department: String,
    pub confidence: u32,
    pub reasoning: Vec<String>,
    pub input_warnings: Vec<String>,
}

impl From<TriageResult> for FfiTriageResult {
    fn from(r: TriageResult) -> Self {
        Self {
            risk_tier: r.risk_tier.to_string(),
            risk_score: r.risk_score,
            department: r.department.to_string(),
            confidence: r.confidence,
            reasoning: r.reasoning,
            input_warnings: r.input_warnings,
        }
    }
}

/// FFI-safe provider.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProvider {
    pub id: String,
    pub name: String,
    pub department: String,
    pub duty_status: String,
    pub is_backup: bool,
    pub max_daily: u32,
    pub current_load: u32,
}

impl From<Provider> for FfiProvider {
    fn from(p: Provider) -> Self {
        Self {
            id: p.id,
            name: p.name,
            department: p.department.to_string(),
            duty_status: p.duty_status.to_string(),
            is_backup: p.is_backup,
            max_daily: p.max_daily,
            current_load: p.current_load,
        }
    }
}

impl TryFrom<FfiProvider> for Provider {
    type Error = TriageCoreError;

    fn try_from(p: FfiProvider) -> Result<Self, Self::Error> {
        Ok(Provider {
            department: parse(&p.department)?,
            duty_status: parse(&p.duty_status)?,
            id: p.id,
            name: p.name,
            is_backup: p.is_backup,
            max_daily: p.max_daily,
            current_load: p.current_load,
        })
    }
}

/// FFI-safe queue entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiQueueEntry {
    pub case_id: String,
    pub patient_id: String,
    pub department: String,
    pub date: String,
    pub slot: String,
    pub risk_tier: String,
    pub priority_score: u32,
    pub status: String,
    pub queue_position: Option<u32>,
    pub provider_id: Option<String>,
    /// Business day the provider unit counts against
    pub assigned_on: Option<String>,
    pub original_slot: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<QueueEntry> for FfiQueueEntry {
    fn from(e: QueueEntry) -> Self {
        Self {
            case_id: e.case_id,
            patient_id: e.patient_id,
            department: e.department.to_string(),
            date: e.date.to_string(),
            slot: e.slot,
            risk_tier: e.risk_tier.to_string(),
            priority_score: e.priority_score,
            status: e.status.to_string(),
            queue_position: e.queue_position,
            provider_id: e.provider_id,
            assigned_on: e.assigned_on.map(|d| d.to_string()),
            original_slot: e.original_slot,
            created_at: e.created_at.to_rfc3339(),
            updated_at: e.updated_at.to_rfc3339(),
        }
    }
}

/// FFI-safe conflict resolution.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConflictResolution {
    pub slot: String,
    pub rescheduled: bool,
    pub original_slot: Option<String>,
    pub unresolved: bool,
    pub note: Option<String>,
}

impl From<ConflictResolution> for FfiConflictResolution {
    fn from(c: ConflictResolution) -> Self {
        Self {
            slot: c.slot.to_string(),
            rescheduled: c.rescheduled,
            original_slot: c.original_slot.map(|s| s.to_string()),
            unresolved: c.unresolved,
            note: c.note(),
        }
    }
}

/// FFI-safe booking confirmation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBooking {
    pub entry: FfiQueueEntry,
    pub provider: Option<FfiProvider>,
    pub triage: FfiTriageResult,
    pub alert: Option<String>,
    pub conflict: FfiConflictResolution,
    pub queue_position: Option<u32>,
    pub estimated_wait_minutes: u32,
    pub estimated_wait: String,
    pub duplicate: bool,
}

impl From<BookingConfirmation> for FfiBooking {
    fn from(b: BookingConfirmation) -> Self {
        Self {
            entry: b.entry.into(),
            provider: b.provider.map(Into::into),
            triage: b.triage.into(),
            alert: b.alert,
            conflict: b.conflict.into(),
            queue_position: b.queue_position,
            estimated_wait_minutes: b.estimated_wait.minutes,
            estimated_wait: b.estimated_wait.display,
            duplicate: b.duplicate,
        }
    }
}

/// FFI-safe assignment outcome.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAssignmentOutcome {
    pub provider: Option<FfiProvider>,
    pub alert: Option<String>,
    pub needs_admin_intervention: bool,
}

impl From<AssignmentOutcome> for FfiAssignmentOutcome {
    fn from(o: AssignmentOutcome) -> Self {
        Self {
            provider: o.provider.map(Into::into),
            alert: o.alert,
            needs_admin_intervention: o.needs_admin_intervention,
        }
    }
}

/// FFI-safe live queue row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLiveQueueItem {
    pub entry: FfiQueueEntry,
    pub waiting_minutes: u32,
    pub severity_score: u32,
    pub delayed: bool,
}

impl From<LiveQueueItem> for FfiLiveQueueItem {
    fn from(i: LiveQueueItem) -> Self {
        Self {
            entry: i.entry.into(),
            waiting_minutes: i.waiting_minutes,
            severity_score: i.severity_score,
            delayed: i.delayed,
        }
    }
}

/// FFI-safe cancellation result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCancelOutcome {
    pub entry: FfiQueueEntry,
    pub released: Option<FfiProvider>,
    pub remaining_in_queue: u32,
}

/// FFI-safe reschedule result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRescheduleOutcome {
    pub entry: FfiQueueEntry,
    pub conflict: FfiConflictResolution,
    pub alert: Option<String>,
}
