//! Content fingerprint of an intake submission.
//!
//! Two submissions with the same patient, date and clinical content hash to
//! the same value regardless of symptom order, case or surrounding
//! whitespace. The service uses this to return the existing booking on a
//! retried submission instead of consuming a second provider unit.

use chrono::NaiveDate;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::{Intake, Vitals};

#[derive(Serialize)]
struct Canonical<'a> {
    patient_id: &'a str,
    date: String,
    symptoms: Vec<String>,
    vitals: [Option<String>; 4],
    history: &'a str,
}

fn canonical_vital(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

fn canonical_vitals(vitals: &Vitals) -> [Option<String>; 4] {
    [
        canonical_vital(&vitals.blood_pressure),
        canonical_vital(&vitals.heart_rate),
        canonical_vital(&vitals.temperature),
        canonical_vital(&vitals.oxygen_level),
    ]
}

/// Hex-encoded SHA-256 over the canonical form of a submission.
pub fn intake_fingerprint(patient_id: &str, date: NaiveDate, intake: &Intake) -> String {
    let mut symptoms = intake.normalized_symptoms();
    symptoms.sort();

    let canonical = Canonical {
        patient_id: patient_id.trim(),
        date: date.to_string(),
        symptoms,
        vitals: canonical_vitals(&intake.vitals),
        history: intake.medical_history.trim(),
    };

    // Serializing a struct of strings cannot fail
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn test_fingerprint_ignores_order_and_case() {
        let a = Intake::new(vec!["Headache".into(), "Cough".into()])
            .with_vitals(Vitals::new().with_heart_rate(72))
            .with_history("none ");
        let b = Intake::new(vec![" cough".into(), "HEADACHE".into(), "headache".into()])
            .with_vitals(Vitals::new().with_heart_rate(72))
            .with_history("none");

        let fa = intake_fingerprint("p1", day(), &a);
        assert_eq!(fa, intake_fingerprint("p1", day(), &b));
        assert_eq!(fa.len(), 64);
    }

    #[test]
    fn test_fingerprint_distinguishes_content() {
        let intake = Intake::new(vec!["Headache".into()]);
        let base = intake_fingerprint("p1", day(), &intake);

        assert_ne!(base, intake_fingerprint("p2", day(), &intake));
        assert_ne!(base, intake_fingerprint("p1", day().succ_opt().unwrap(), &intake));
        let with_vitals = intake.clone().with_vitals(Vitals::new().with_oxygen_level(97));
        assert_ne!(base, intake_fingerprint("p1", day(), &with_vitals));
    }
}
