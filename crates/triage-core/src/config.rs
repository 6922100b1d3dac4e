//! Runtime configuration and logging setup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{CoreResult, TriageError};
use crate::models::RiskTier;

pub const DEFAULT_LOG_FILTER: &str = "triage_core=info";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Install a fmt subscriber. `RUST_LOG` wins over `filter`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(filter: Option<&str>) {
    let fallback = filter.unwrap_or(DEFAULT_LOG_FILTER).to_string();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .try_init();
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Average consultation length per tier, used for wait estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsultMinutes {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

impl Default for ConsultMinutes {
    fn default() -> Self {
        Self {
            high: 30,
            medium: 20,
            low: 15,
        }
    }
}

impl ConsultMinutes {
    pub fn for_tier(&self, tier: RiskTier) -> u32 {
        match tier {
            RiskTier::High => self.high,
            RiskTier::Medium => self.medium,
            RiskTier::Low => self.low,
        }
    }
}

/// Service configuration. Every field has a default, so a partial JSON
/// document (or `{}`) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// High-tier entries waiting longer than this are flagged as delayed.
    pub delay_alert_minutes: u32,
    /// Attempts at recomputing a queue after cancel or reschedule.
    pub recompute_max_attempts: u32,
    pub consult_minutes: ConsultMinutes,
    pub log_filter: String,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            delay_alert_minutes: 15,
            recompute_max_attempts: 3,
            consult_minutes: ConsultMinutes::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════

impl TriageConfig {
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TriageError::InvalidInput(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            TriageError::InvalidInput(format!("config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.recompute_max_attempts == 0 {
            return Err(TriageError::InvalidInput(
                "recompute_max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TriageConfig::default();
        assert_eq!(config.delay_alert_minutes, 15);
        assert_eq!(config.recompute_max_attempts, 3);
        assert_eq!(config.consult_minutes.for_tier(RiskTier::High), 30);
        assert_eq!(config.consult_minutes.for_tier(RiskTier::Medium), 20);
        assert_eq!(config.consult_minutes.for_tier(RiskTier::Low), 15);
        assert_eq!(config.log_filter, "triage_core=info");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            TriageConfig::from_json_str(r#"{"delay_alert_minutes": 10, "consult_minutes": {"low": 12}}"#)
                .unwrap();
        assert_eq!(config.delay_alert_minutes, 10);
        assert_eq!(config.consult_minutes.low, 12);
        assert_eq!(config.consult_minutes.high, 30);
        assert_eq!(config.recompute_max_attempts, 3);
    }

    #[test]
    fn test_rejects_zero_attempts() {
        assert!(TriageConfig::from_json_str(r#"{"recompute_max_attempts": 0}"#).is_err());
        assert!(TriageConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage.json");
        std::fs::write(&path, r#"{"log_filter": "triage_core=debug"}"#).unwrap();
        let config = TriageConfig::from_path(&path).unwrap();
        assert_eq!(config.log_filter, "triage_core=debug");

        assert!(TriageConfig::from_path(dir.path().join("missing.json")).is_err());
    }
}
