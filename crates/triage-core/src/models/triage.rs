//! Triage outcome models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Risk classification driving department routing and queue weight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(RiskTier::Low),
            "medium" => Ok(RiskTier::Medium),
            "high" => Ok(RiskTier::High),
            other => Err(format!("unknown risk tier: {}", other)),
        }
    }
}

/// Clinical department a case is routed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Department {
    EmergencyDepartment,
    UrgentCare,
    GeneralPractice,
}

impl Department {
    pub const ALL: [Department; 3] = [
        Department::EmergencyDepartment,
        Department::UrgentCare,
        Department::GeneralPractice,
    ];

    /// Human-readable department name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::EmergencyDepartment => "Emergency Department",
            Department::UrgentCare => "Urgent Care",
            Department::GeneralPractice => "General Practice",
        }
    }

    /// Department a risk tier is routed to.
    pub fn for_tier(tier: RiskTier) -> Self {
        match tier {
            RiskTier::High => Department::EmergencyDepartment,
            RiskTier::Medium => Department::UrgentCare,
            RiskTier::Low => Department::GeneralPractice,
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "emergencydepartment" | "emergency" => Ok(Department::EmergencyDepartment),
            "urgentcare" => Ok(Department::UrgentCare),
            "generalpractice" => Ok(Department::GeneralPractice),
            _ => Err(format!("unknown department: {}", s)),
        }
    }
}

/// Result of evaluating an intake. Derived; recomputed only by resubmission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageResult {
    pub risk_tier: RiskTier,
    /// Always within 0..=100
    pub risk_score: u32,
    pub department: Department,
    /// Percent, always within 0..=100
    pub confidence: u32,
    /// Tier statement first, then detected issues, then remaining findings
    pub reasoning: Vec<String>,
    /// Vitals skipped because they could not be parsed
    pub input_warnings: Vec<String>,
}

impl TriageResult {
    /// Reasoning joined into a single display sentence.
    pub fn reasoning_text(&self) -> String {
        if self.reasoning.is_empty() {
            return String::new();
        }
        format!("{}.", self.reasoning.join(". "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_department_parse_labels() {
        assert_eq!(
            "Emergency Department".parse::<Department>().unwrap(),
            Department::EmergencyDepartment
        );
        assert_eq!("urgent-care".parse::<Department>().unwrap(), Department::UrgentCare);
        assert_eq!(
            "GeneralPractice".parse::<Department>().unwrap(),
            Department::GeneralPractice
        );
        assert!("Cardiology".parse::<Department>().is_err());
    }

    #[test]
    fn test_tier_routing() {
        assert_eq!(Department::for_tier(RiskTier::High), Department::EmergencyDepartment);
        assert_eq!(Department::for_tier(RiskTier::Medium), Department::UrgentCare);
        assert_eq!(Department::for_tier(RiskTier::Low), Department::GeneralPractice);
    }

    #[test]
    fn test_reasoning_text() {
        let result = TriageResult {
            risk_tier: RiskTier::Low,
            risk_score: 12,
            department: Department::GeneralPractice,
            confidence: 76,
            reasoning: vec!["General symptoms noted".into(), "Fever detected".into()],
            input_warnings: vec![],
        };
        assert_eq!(result.reasoning_text(), "General symptoms noted. Fever detected.");
    }
}
