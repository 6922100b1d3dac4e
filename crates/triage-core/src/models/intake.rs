//! Patient intake models.

use serde::{Deserialize, Serialize};

/// Vital signs as reported on the intake form.
///
/// Values are kept as entered; the risk engine parses them and skips
/// any vital it cannot read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Vitals {
    /// "systolic/diastolic", e.g. "120/80"
    pub blood_pressure: Option<String>,
    /// Beats per minute
    pub heart_rate: Option<String>,
    /// Degrees Fahrenheit
    pub temperature: Option<String>,
    /// SpO2 percent
    pub oxygen_level: Option<String>,
}

impl Vitals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blood_pressure(mut self, systolic: u32, diastolic: u32) -> Self {
        self.blood_pressure = Some(format!("{}/{}", systolic, diastolic));
        self
    }

    pub fn with_heart_rate(mut self, bpm: u32) -> Self {
        self.heart_rate = Some(bpm.to_string());
        self
    }

    pub fn with_temperature(mut self, fahrenheit: f64) -> Self {
        self.temperature = Some(fahrenheit.to_string());
        self
    }

    pub fn with_oxygen_level(mut self, percent: u32) -> Self {
        self.oxygen_level = Some(percent.to_string());
        self
    }

    /// True when no vital was reported.
    pub fn is_empty(&self) -> bool {
        self.blood_pressure.is_none()
            && self.heart_rate.is_none()
            && self.temperature.is_none()
            && self.oxygen_level.is_none()
    }
}

/// A submitted intake. Immutable once submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Intake {
    /// Free-text symptoms (matched case-insensitively after trimming)
    pub symptoms: Vec<String>,
    pub vitals: Vitals,
    pub medical_history: String,
}

impl Intake {
    pub fn new(symptoms: Vec<String>) -> Self {
        Self {
            symptoms,
            ..Default::default()
        }
    }

    pub fn with_vitals(mut self, vitals: Vitals) -> Self {
        self.vitals = vitals;
        self
    }

    pub fn with_history(mut self, history: impl Into<String>) -> Self {
        self.medical_history = history.into();
        self
    }

    /// Distinct, lowercased, trimmed, non-empty symptoms in first-seen order.
    pub fn normalized_symptoms(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for symptom in &self.symptoms {
            let normalized = symptom.trim().to_lowercase();
            if !normalized.is_empty() && !seen.contains(&normalized) {
                seen.push(normalized);
            }
        }
        seen
    }
}
