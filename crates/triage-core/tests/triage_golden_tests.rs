//! Golden tests for the risk engine.
//!
//! Each case pins score, tier, department and confidence for a known intake.

use triage_core::models::{Department, Intake, RiskTier, Vitals};
use triage_core::risk::RiskEngine;

/// Test case from golden file.
struct GoldenCase {
    id: &'static str,
    symptoms: &'static [&'static str],
    vitals: Vitals,
    history: &'static str,
    expected_score: u32,
    expected_tier: RiskTier,
    expected_department: Department,
    expected_confidence: u32,
    expected_warnings: usize,
}

const LONG_HISTORY: &str =
    "Type 2 diabetes since 2011, chronic kidney disease stage 3, two prior strokes";

fn get_golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            id: "chest-pain-hypoxic",
            symptoms: &["Chest Pain"],
            vitals: Vitals::new().with_oxygen_level(88),
            history: "",
            expected_score: 100,
            expected_tier: RiskTier::High,
            expected_department: Department::EmergencyDepartment,
            expected_confidence: 90,
            expected_warnings: 0,
        },
        GoldenCase {
            id: "chest-pain-boundary",
            symptoms: &["chest pain"],
            vitals: Vitals::new(),
            history: "",
            expected_score: 70,
            expected_tier: RiskTier::High,
            expected_department: Department::EmergencyDepartment,
            expected_confidence: 80,
            expected_warnings: 0,
        },
        GoldenCase {
            id: "stroke",
            symptoms: &["Stroke symptoms"],
            vitals: Vitals::new(),
            history: "",
            expected_score: 85,
            expected_tier: RiskTier::High,
            expected_department: Department::EmergencyDepartment,
            expected_confidence: 85,
            expected_warnings: 0,
        },
        GoldenCase {
            id: "critical-suppresses-moderate",
            symptoms: &["Loss of consciousness", "headache", "cough"],
            vitals: Vitals::new(),
            history: "",
            expected_score: 80,
            expected_tier: RiskTier::High,
            expected_department: Department::EmergencyDepartment,
            expected_confidence: 83,
            expected_warnings: 0,
        },
        GoldenCase {
            id: "urgent-fever-with-temperature",
            symptoms: &["High fever"],
            vitals: Vitals::new().with_temperature(101.5),
            history: "",
            expected_score: 47,
            expected_tier: RiskTier::Medium,
            expected_department: Department::UrgentCare,
            expected_confidence: 81,
            expected_warnings: 0,
        },
        GoldenCase {
            id: "head-injury-tachycardic",
            symptoms: &["Head injury"],
            vitals: Vitals::new().with_heart_rate(110),
            history: "",
            expected_score: 53,
            expected_tier: RiskTier::Medium,
            expected_department: Department::UrgentCare,
            expected_confidence: 84,
            expected_warnings: 0,
        },
        GoldenCase {
            id: "abdominal-pain-boundary",
            symptoms: &["Abdominal pain"],
            vitals: Vitals::new(),
            history: "",
            expected_score: 35,
            expected_tier: RiskTier::Medium,
            expected_department: Department::UrgentCare,
            expected_confidence: 75,
            expected_warnings: 0,
        },
        GoldenCase {
            id: "hypertensive-crisis",
            symptoms: &["fatigue"],
            vitals: Vitals::new().with_blood_pressure(185, 100),
            history: "",
            expected_score: 42,
            expected_tier: RiskTier::Medium,
            expected_department: Department::UrgentCare,
            expected_confidence: 78,
            expected_warnings: 0,
        },
        GoldenCase {
            id: "hypotensive",
            symptoms: &["Dizziness"],
            vitals: Vitals::new().with_blood_pressure(85, 55),
            history: "",
            expected_score: 40,
            expected_tier: RiskTier::Medium,
            expected_department: Department::UrgentCare,
            expected_confidence: 77,
            expected_warnings: 0,
        },
        GoldenCase {
            id: "headache-only",
            symptoms: &["Headache"],
            vitals: Vitals::new(),
            history: "seasonal allergies",
            expected_score: 12,
            expected_tier: RiskTier::Low,
            expected_department: Department::GeneralPractice,
            expected_confidence: 76,
            expected_warnings: 0,
        },
        GoldenCase {
            id: "moderate-cluster-complex-history",
            symptoms: &["cough", "fatigue", "nausea", "back pain"],
            vitals: Vitals::new(),
            history: LONG_HISTORY,
            expected_score: 33,
            expected_tier: RiskTier::Low,
            expected_department: Department::GeneralPractice,
            expected_confidence: 85,
            expected_warnings: 0,
        },
        GoldenCase {
            id: "unrecognized-symptom",
            symptoms: &["itchy elbow"],
            vitals: Vitals::new(),
            history: "",
            expected_score: 0,
            expected_tier: RiskTier::Low,
            expected_department: Department::GeneralPractice,
            expected_confidence: 70,
            expected_warnings: 0,
        },
        GoldenCase {
            id: "unreadable-oxygen-skipped",
            symptoms: &["Headache"],
            vitals: Vitals {
                oxygen_level: Some("n/a".into()),
                ..Vitals::new()
            },
            history: "",
            expected_score: 12,
            expected_tier: RiskTier::Low,
            expected_department: Department::GeneralPractice,
            expected_confidence: 76,
            expected_warnings: 1,
        },
    ]
}

#[test]
fn test_golden_cases() {
    let engine = RiskEngine::new();

    for case in get_golden_cases() {
        let intake = Intake::new(case.symptoms.iter().map(|s| s.to_string()).collect())
            .with_vitals(case.vitals.clone())
            .with_history(case.history);

        let result = engine.evaluate(&intake);

        assert_eq!(result.risk_score, case.expected_score, "Case {}: score mismatch", case.id);
        assert_eq!(result.risk_tier, case.expected_tier, "Case {}: tier mismatch", case.id);
        assert_eq!(
            result.department, case.expected_department,
            "Case {}: department mismatch", case.id
        );
        assert_eq!(
            result.confidence, case.expected_confidence,
            "Case {}: confidence mismatch", case.id
        );
        assert_eq!(
            result.input_warnings.len(),
            case.expected_warnings,
            "Case {}: warning count mismatch",
            case.id
        );
        assert!(!result.reasoning.is_empty(), "Case {}: empty reasoning", case.id);
    }
}

#[test]
fn test_reasoning_starts_with_tier_statement() {
    let engine = RiskEngine::new();
    let statements = [
        (&["chest pain"][..], "Critical symptoms detected requiring immediate medical attention"),
        (&["severe pain"][..], "Urgent symptoms requiring prompt evaluation"),
        (&["sore throat"][..], "Symptoms suggest medical consultation is recommended"),
        (&["itchy elbow"][..], "General symptoms noted"),
    ];

    for (symptoms, statement) in statements {
        let intake = Intake::new(symptoms.iter().map(|s| s.to_string()).collect());
        let result = engine.evaluate(&intake);
        assert_eq!(result.reasoning[0], statement, "symptoms {:?}", symptoms);
    }
}
