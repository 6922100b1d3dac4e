//! Risk scoring engine.
//!
//! Pipeline: Symptoms → Vitals → History → Tier mapping → Reasoning
//!
//! The engine is a fixed, auditable rule table. It is pure and total:
//! unrecognized symptoms contribute nothing and unreadable vitals are skipped.

mod tables;
mod vitals;

pub use tables::*;
pub use vitals::*;

use crate::models::{Department, Intake, RiskTier, TriageResult, Vitals};

/// Maximum risk score.
pub const MAX_SCORE: u32 = 100;

/// History longer than this (trimmed, in characters) counts as complex.
pub const COMPLEX_HISTORY_CHARS: usize = 50;

/// Bonus for a complex medical history.
pub const COMPLEX_HISTORY_BONUS: u32 = 5;

/// Distinct symptoms needed for the concurrent-symptoms bonus.
pub const MULTIPLE_SYMPTOMS_THRESHOLD: usize = 4;

/// Bonus for multiple concurrent symptoms.
pub const MULTIPLE_SYMPTOMS_BONUS: u32 = 10;

/// Number of detected issues carried into the reasoning list.
const MAX_DETECTED_ISSUES: usize = 3;

/// Pluggable scoring seam. The service only depends on this trait.
pub trait ScoringStrategy: Send + Sync {
    fn evaluate(&self, intake: &Intake) -> TriageResult;
}

/// Deterministic rule-table risk engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskEngine;

impl RiskEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate an intake.
    pub fn evaluate(&self, intake: &Intake) -> TriageResult {
        let symptoms = assess_symptoms(&intake.symptoms);
        let vitals = assess_vitals(&intake.vitals);

        let mut score = symptoms.score + vitals.total_bonus();
        let mut findings: Vec<String> = Vec::new();
        let mut detected_issues = symptoms.detected_issues.clone();

        for finding in &vitals.findings {
            findings.push(finding.finding.clone());
            if let Some(issue) = &finding.detected_issue {
                detected_issues.push(issue.clone());
            }
        }

        if intake.medical_history.trim().chars().count() > COMPLEX_HISTORY_CHARS {
            score += COMPLEX_HISTORY_BONUS;
            findings.push("Complex medical history noted".to_string());
        }

        if intake.normalized_symptoms().len() >= MULTIPLE_SYMPTOMS_THRESHOLD {
            score += MULTIPLE_SYMPTOMS_BONUS;
            findings.push("Multiple concurrent symptoms".to_string());
        }

        let risk_score = score.min(MAX_SCORE);
        let (risk_tier, department, confidence) = classify(risk_score);

        let mut reasoning = vec![primary_statement(symptoms.highest).to_string()];
        reasoning.extend(detected_issues.into_iter().take(MAX_DETECTED_ISSUES));
        reasoning.extend(findings);

        tracing::debug!(
            risk_score,
            tier = %risk_tier,
            department = %department,
            skipped_vitals = vitals.skipped.len(),
            "Intake evaluated"
        );

        TriageResult {
            risk_tier,
            risk_score,
            department,
            confidence,
            reasoning,
            input_warnings: vitals.skipped.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl ScoringStrategy for RiskEngine {
    fn evaluate(&self, intake: &Intake) -> TriageResult {
        RiskEngine::evaluate(self, intake)
    }
}

/// Evaluate raw intake fields with the default engine.
pub fn evaluate(symptoms: &[String], vitals: &Vitals, history: &str) -> TriageResult {
    let intake = Intake {
        symptoms: symptoms.to_vec(),
        vitals: vitals.clone(),
        medical_history: history.to_string(),
    };
    RiskEngine::new().evaluate(&intake)
}

/// Map a clamped score to tier, department and confidence percent.
pub fn classify(score: u32) -> (RiskTier, Department, u32) {
    let score = score.min(MAX_SCORE);
    let (tier, confidence) = if score >= 70 {
        (RiskTier::High, (80 + (score - 70) / 3).min(95))
    } else if score >= 35 {
        (RiskTier::Medium, (75 + (score - 35) / 2).min(90))
    } else {
        (RiskTier::Low, (70 + score / 2).min(85))
    };
    (tier, Department::for_tier(tier), confidence)
}

fn primary_statement(highest: Option<SymptomSeverity>) -> &'static str {
    match highest {
        Some(SymptomSeverity::Critical) => {
            "Critical symptoms detected requiring immediate medical attention"
        }
        Some(SymptomSeverity::Urgent) => "Urgent symptoms requiring prompt evaluation",
        Some(SymptomSeverity::Moderate) => "Symptoms suggest medical consultation is recommended",
        None => "General symptoms noted",
    }
}
