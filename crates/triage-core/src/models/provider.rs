//! Care provider models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Department;

/// Duty status of a provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DutyStatus {
    Available,
    OnCall,
    /// At daily capacity
    Busy,
}

impl DutyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DutyStatus::Available => "AVAILABLE",
            DutyStatus::OnCall => "ON_CALL",
            DutyStatus::Busy => "BUSY",
        }
    }
}

impl fmt::Display for DutyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DutyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "AVAILABLE" => Ok(DutyStatus::Available),
            "ON_CALL" | "ONCALL" => Ok(DutyStatus::OnCall),
            "BUSY" => Ok(DutyStatus::Busy),
            other => Err(format!("unknown duty status: {}", other)),
        }
    }
}

/// A care provider and their load for the current business day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub department: Department,
    pub duty_status: DutyStatus,
    /// Overflow-only provider
    pub is_backup: bool,
    pub max_daily: u32,
    /// Never exceeds `max_daily`
    pub current_load: u32,
}

impl Provider {
    /// Create a regular provider, available with no load.
    pub fn new(id: impl Into<String>, name: impl Into<String>, department: Department, max_daily: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            department,
            duty_status: DutyStatus::Available,
            is_backup: false,
            max_daily,
            current_load: 0,
        }
    }

    /// Create a backup provider, on call with no load.
    pub fn backup(id: impl Into<String>, name: impl Into<String>, department: Department, max_daily: u32) -> Self {
        Self {
            is_backup: true,
            duty_status: DutyStatus::OnCall,
            ..Self::new(id, name, department, max_daily)
        }
    }

    /// Status the provider returns to when not at capacity.
    pub fn on_duty_status(&self) -> DutyStatus {
        if self.is_backup {
            DutyStatus::OnCall
        } else {
            DutyStatus::Available
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.current_load < self.max_daily
    }

    /// Take one load unit. Returns false when already at capacity.
    pub fn take_unit(&mut self) -> bool {
        if !self.has_capacity() {
            return false;
        }
        self.current_load += 1;
        if self.current_load >= self.max_daily {
            self.duty_status = DutyStatus::Busy;
        }
        true
    }

    /// Give back one load unit (floor 0).
    pub fn release_unit(&mut self) {
        self.current_load = self.current_load.saturating_sub(1);
        if self.has_capacity() && self.duty_status == DutyStatus::Busy {
            self.duty_status = self.on_duty_status();
        }
    }

    /// Start-of-day reset.
    pub fn reset_load(&mut self) {
        self.current_load = 0;
        if self.duty_status == DutyStatus::Busy {
            self.duty_status = self.on_duty_status();
        }
    }

    /// Clamp a loaded record back into its invariants.
    pub(crate) fn normalize(&mut self) {
        if self.current_load >= self.max_daily {
            self.current_load = self.max_daily;
            self.duty_status = DutyStatus::Busy;
        } else if self.duty_status == DutyStatus::Busy {
            self.duty_status = self.on_duty_status();
        }
    }
}

/// Demo roster: three regular providers (10/day) and one backup (15/day)
/// per department.
pub fn demo_roster() -> Vec<Provider> {
    const NAMES: [(Department, [&str; 4]); 3] = [
        (
            Department::EmergencyDepartment,
            ["Dr. Sarah Johnson", "Dr. Michael Chen", "Dr. Emily Rodriguez", "Dr. James Wilson"],
        ),
        (
            Department::UrgentCare,
            ["Dr. Andrew Walker", "Dr. Nicole Hall", "Dr. Kevin Allen", "Dr. Stephanie Young"],
        ),
        (
            Department::GeneralPractice,
            ["Dr. Daniel White", "Dr. Jessica Harris", "Dr. Matthew Clark", "Dr. Rachel Lewis"],
        ),
    ];

    let mut roster = Vec::with_capacity(12);
    for (dept_index, (department, names)) in NAMES.iter().enumerate() {
        for (index, name) in names.iter().enumerate() {
            let id = format!("doc_{}", dept_index * 4 + index + 1);
            let provider = if index == 3 {
                Provider::backup(id, *name, *department, 15)
            } else {
                Provider::new(id, *name, *department, 10)
            };
            roster.push(provider);
        }
    }
    roster
}
