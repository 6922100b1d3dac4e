//! Provider assignment on top of the capacity ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{CapacityLedger, Reservation};
use crate::error::{CoreResult, TriageError};
use crate::models::{Department, Provider, RiskTier};
use crate::store::TriageStore;

/// A successful assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    /// Provider state after taking the unit
    pub provider: Provider,
    /// Informational notice when a backup provider was engaged
    pub alert: Option<String>,
    pub department: Department,
    /// Carried for audit only; selection does not depend on it
    pub risk_tier: RiskTier,
    /// Business day the unit counts against
    pub business_day: NaiveDate,
}

/// Assignment result in caller-facing shape: either a provider, or no
/// provider plus an alert that needs operator intervention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentOutcome {
    pub provider: Option<Provider>,
    pub alert: Option<String>,
    pub needs_admin_intervention: bool,
}

impl AssignmentOutcome {
    /// Fold capacity exhaustion into the outcome; other errors pass through.
    pub fn from_result(result: CoreResult<Assignment>) -> CoreResult<Self> {
        match result {
            Ok(assignment) => Ok(Self {
                provider: Some(assignment.provider),
                alert: assignment.alert,
                needs_admin_intervention: false,
            }),
            Err(err @ TriageError::CapacityExhausted { .. }) => Ok(Self {
                provider: None,
                alert: Some(err.to_string()),
                needs_admin_intervention: true,
            }),
            Err(err) => Err(err),
        }
    }
}

/// Selects providers and keeps the ledger and the store in step.
///
/// The ledger is mutated first under its own lock; the store write follows
/// under the provider's write lock only. A failed write of the chosen
/// provider rolls the ledger back, so no unit is ever committed without its
/// persisted counterpart. Other unwritten providers, such as rollover resets
/// that failed earlier, are retried on every write pass.
pub struct AssignmentPlanner<'a, S: TriageStore + ?Sized> {
    ledger: &'a CapacityLedger,
    store: &'a S,
}

impl<'a, S: TriageStore + ?Sized> AssignmentPlanner<'a, S> {
    pub fn new(ledger: &'a CapacityLedger, store: &'a S) -> Self {
        Self { ledger, store }
    }

    /// Assign one provider in `department` for a case on business day `today`.
    pub fn assign(
        &self,
        department: Department,
        risk_tier: RiskTier,
        today: NaiveDate,
    ) -> CoreResult<Assignment> {
        let reservation = match self.ledger.reserve(department, today) {
            Ok(reservation) => reservation,
            Err(err @ TriageError::CapacityExhausted { .. }) => {
                tracing::error!(%department, tier = %risk_tier, "No provider capacity left, operator intervention required");
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        if !reservation.rolled_over.is_empty() {
            tracing::info!(%today, providers = reservation.rolled_over.len(), "Daily capacity rollover");
        }

        self.persist(&reservation)?;

        let provider = reservation.provider;
        let alert = if provider.is_backup {
            tracing::warn!(%department, provider = %provider.name, "Regular providers at capacity, backup engaged");
            Some(format!("Assigned to backup provider {}", provider.name))
        } else {
            None
        };

        tracing::info!(
            %department,
            tier = %risk_tier,
            provider_id = %provider.id,
            load = provider.current_load,
            max = provider.max_daily,
            "Provider assigned"
        );

        Ok(Assignment {
            provider,
            alert,
            department,
            risk_tier,
            business_day: reservation.business_day,
        })
    }

    /// Bind one unit of a specific provider, bypassing the selection policy.
    pub fn assign_to(
        &self,
        provider_id: &str,
        risk_tier: RiskTier,
        today: NaiveDate,
    ) -> CoreResult<Assignment> {
        let reservation = self.ledger.reserve_provider(provider_id, today)?;
        self.persist(&reservation)?;
        let provider = reservation.provider;
        tracing::info!(provider_id, tier = %risk_tier, load = provider.current_load, "Provider bound by operator");
        Ok(Assignment {
            department: provider.department,
            provider,
            alert: None,
            risk_tier,
            business_day: reservation.business_day,
        })
    }

    fn write(&self, provider: &Provider) -> CoreResult<()> {
        self.store
            .save_provider_load(&provider.id, provider.current_load, provider.duty_status)?;
        Ok(())
    }

    /// Write every provider with unwritten ledger changes.
    ///
    /// Every provider is attempted; failures stay dirty for the next pass
    /// and are returned by provider id.
    fn flush(&self) -> CoreResult<Vec<(String, TriageError)>> {
        let mut failures = Vec::new();
        for provider_id in self.ledger.dirty()? {
            if let Err(err) = self.ledger.persist(&provider_id, |p| self.write(p)) {
                tracing::warn!(%provider_id, error = %err, "Provider load not persisted, will retry");
                failures.push((provider_id, err));
            }
        }
        Ok(failures)
    }

    /// Flush and report the failure for `provider_id`, if any.
    fn flush_for(&self, provider_id: &str) -> CoreResult<()> {
        match self.flush()?.into_iter().find(|(id, _)| id == provider_id) {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }

    fn persist(&self, reservation: &Reservation) -> CoreResult<()> {
        let provider_id = &reservation.provider.id;
        if let Err(err) = self.flush_for(provider_id) {
            tracing::warn!(%provider_id, error = %err, "Provider load not persisted, rolling back");
            self.ledger.rollback(reservation)?;
            self.flush()?;
            return Err(err);
        }
        Ok(())
    }

    /// Release one unit from a provider (floor 0) and persist the new load.
    ///
    /// The ledger unit is released even when the store write fails; the
    /// write is retried by the next pass.
    pub fn release(&self, provider_id: &str) -> CoreResult<Option<Provider>> {
        let Some(provider) = self.ledger.release(provider_id)? else {
            tracing::warn!(provider_id, "Release for unknown provider ignored");
            return Ok(None);
        };
        self.flush_for(provider_id)?;
        tracing::info!(provider_id, load = provider.current_load, "Provider unit released");
        Ok(Some(provider))
    }

    /// Release a unit taken on `business_day`.
    ///
    /// A unit from an earlier business day was already cleared by the
    /// rollover, so nothing is released and `None` is returned.
    pub fn release_from(
        &self,
        provider_id: &str,
        business_day: Option<NaiveDate>,
    ) -> CoreResult<Option<Provider>> {
        let current = self.ledger.business_day()?;
        match (business_day, current) {
            (Some(taken), Some(current)) if taken != current => {
                tracing::info!(provider_id, %taken, %current, "Unit from an earlier business day, nothing to release");
                Ok(None)
            }
            _ => self.release(provider_id),
        }
    }

    /// Persist the ledger's current view of a provider.
    pub fn sync(&self, provider_id: &str) -> CoreResult<Option<Provider>> {
        self.ledger.persist(provider_id, |p| self.write(p))
    }

    /// Reset all loads for a new business day and persist them.
    ///
    /// Every reset is attempted; the first failure is returned and the
    /// unwritten providers are retried by the next write pass.
    pub fn rollover(&self, today: NaiveDate) -> CoreResult<Vec<Provider>> {
        let providers = self.ledger.rollover(today)?;
        tracing::info!(%today, providers = providers.len(), "Daily capacity rollover");
        if let Some((_, err)) = self.flush()?.into_iter().next() {
            return Err(err);
        }
        Ok(providers)
    }
}
