//! Vital sign parsing and threshold bands.
//!
//! Each vital contributes at most one bonus. Bands do not overlap and the
//! more severe band is checked first.
//!
//! | Vital            | Critical band                    | Bonus | Elevated band          | Bonus |
//! |------------------|----------------------------------|-------|------------------------|-------|
//! | Blood pressure   | sys >= 180 or dia >= 120         | +30   | sys >= 140 or dia >= 90 | +10  |
//! | BP (low)         | sys < 90 or dia < 60             | +25   |                        |       |
//! | Heart rate       | > 120 or < 50 bpm                | +20   | > 100 or < 60 bpm      | +8    |
//! | Temperature      | >= 104 F or < 95 F               | +25   | >= 100.4 F             | +12   |
//! | Oxygen level     | < 90 %                           | +35   | < 95 %                 | +15   |

use thiserror::Error;

use crate::models::Vitals;

/// A vital that could not be read. The vital is skipped, never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputDataError {
    #[error("unparseable {vital}: {raw:?}")]
    Unparseable { vital: &'static str, raw: String },
}

/// Score contribution of a single vital.
#[derive(Debug, Clone, PartialEq)]
pub struct VitalFinding {
    pub bonus: u32,
    /// Qualitative finding for the reasoning list
    pub finding: String,
    /// Concrete detected issue (critical bands only)
    pub detected_issue: Option<String>,
}

impl VitalFinding {
    fn critical(bonus: u32, finding: &str, issue: String) -> Self {
        Self {
            bonus,
            finding: finding.to_string(),
            detected_issue: Some(issue),
        }
    }

    fn elevated(bonus: u32, finding: &str) -> Self {
        Self {
            bonus,
            finding: finding.to_string(),
            detected_issue: None,
        }
    }
}

/// Findings for all readable vitals plus the vitals that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VitalsAssessment {
    pub findings: Vec<VitalFinding>,
    pub skipped: Vec<InputDataError>,
}

impl VitalsAssessment {
    pub fn total_bonus(&self) -> u32 {
        self.findings.iter().map(|f| f.bonus).sum()
    }
}

/// Parse the leading numeric prefix of a value ("98%" -> 98, "101.2F" -> 101.2).
pub fn leading_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in trimmed.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    trimmed[..end].trim_end_matches('.').parse().ok()
}

/// Parse "systolic/diastolic" into its two integer readings.
pub fn parse_blood_pressure(raw: &str) -> Option<(u32, u32)> {
    let (left, right) = raw.split_once('/')?;

    let left = left.trim_end();
    let systolic_start = left
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    let systolic = &left[systolic_start..];

    let right = right.trim_start();
    let diastolic_end = right
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(right.len());
    let diastolic = &right[..diastolic_end];

    Some((systolic.parse().ok()?, diastolic.parse().ok()?))
}

fn unparseable(vital: &'static str, raw: &str) -> InputDataError {
    InputDataError::Unparseable {
        vital,
        raw: raw.to_string(),
    }
}

pub fn blood_pressure_finding(raw: &str) -> Result<Option<VitalFinding>, InputDataError> {
    let (systolic, diastolic) =
        parse_blood_pressure(raw).ok_or_else(|| unparseable("blood pressure", raw))?;

    let finding = if systolic >= 180 || diastolic >= 120 {
        Some(VitalFinding::critical(
            30,
            "Hypertensive crisis detected",
            format!("Blood pressure critically high: {}", raw.trim()),
        ))
    } else if systolic < 90 || diastolic < 60 {
        Some(VitalFinding::critical(
            25,
            "Hypotension detected",
            format!("Blood pressure critically low: {}", raw.trim()),
        ))
    } else if systolic >= 140 || diastolic >= 90 {
        Some(VitalFinding::elevated(10, "Elevated blood pressure noted"))
    } else {
        None
    };
    Ok(finding)
}

pub fn heart_rate_finding(raw: &str) -> Result<Option<VitalFinding>, InputDataError> {
    let bpm = leading_number(raw)
        .ok_or_else(|| unparseable("heart rate", raw))?
        .trunc() as i64;

    let finding = if bpm > 120 {
        Some(VitalFinding::critical(
            20,
            "Tachycardia detected",
            format!("Heart rate elevated: {} bpm", bpm),
        ))
    } else if bpm < 50 {
        Some(VitalFinding::critical(
            20,
            "Bradycardia detected",
            format!("Heart rate low: {} bpm", bpm),
        ))
    } else if bpm > 100 || bpm < 60 {
        Some(VitalFinding::elevated(8, "Heart rate slightly abnormal"))
    } else {
        None
    };
    Ok(finding)
}

pub fn temperature_finding(raw: &str) -> Result<Option<VitalFinding>, InputDataError> {
    let temp = leading_number(raw).ok_or_else(|| unparseable("temperature", raw))?;

    let finding = if temp >= 104.0 {
        Some(VitalFinding::critical(
            25,
            "Temperature critically high",
            format!("Fever: {}°F", temp),
        ))
    } else if temp < 95.0 {
        Some(VitalFinding::critical(
            25,
            "Temperature critically low",
            format!("Hypothermia risk: {}°F", temp),
        ))
    } else if temp >= 100.4 {
        Some(VitalFinding::elevated(12, "Fever detected"))
    } else {
        None
    };
    Ok(finding)
}

pub fn oxygen_finding(raw: &str) -> Result<Option<VitalFinding>, InputDataError> {
    let level = leading_number(raw)
        .ok_or_else(|| unparseable("oxygen level", raw))?
        .trunc() as i64;

    let finding = if level < 90 {
        Some(VitalFinding::critical(
            35,
            "Dangerously low oxygen saturation",
            format!("Oxygen level critical: {}%", level),
        ))
    } else if level < 95 {
        Some(VitalFinding::elevated(15, "Below normal oxygen saturation"))
    } else {
        None
    };
    Ok(finding)
}

/// Evaluate every reported vital. Unreadable vitals are skipped.
pub fn assess_vitals(vitals: &Vitals) -> VitalsAssessment {
    type Band = fn(&str) -> Result<Option<VitalFinding>, InputDataError>;

    let readings: [(Option<&String>, Band); 4] = [
        (vitals.blood_pressure.as_ref(), blood_pressure_finding),
        (vitals.heart_rate.as_ref(), heart_rate_finding),
        (vitals.temperature.as_ref(), temperature_finding),
        (vitals.oxygen_level.as_ref(), oxygen_finding),
    ];

    let mut assessment = VitalsAssessment::default();
    for (raw, band) in readings {
        let Some(raw) = raw else { continue };
        if raw.trim().is_empty() {
            continue;
        }
        match band(raw) {
            Ok(Some(finding)) => assessment.findings.push(finding),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable vital");
                assessment.skipped.push(e);
            }
        }
    }
    assessment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("98%"), Some(98.0));
        assert_eq!(leading_number(" 101.2F "), Some(101.2));
        assert_eq!(leading_number("72 bpm"), Some(72.0));
        assert_eq!(leading_number("100."), Some(100.0));
        assert_eq!(leading_number("n/a"), None);
        assert_eq!(leading_number(""), None);
    }

    #[test]
    fn test_parse_blood_pressure() {
        assert_eq!(parse_blood_pressure("120/80"), Some((120, 80)));
        assert_eq!(parse_blood_pressure("BP 185 / 95 mmHg"), Some((185, 95)));
        assert_eq!(parse_blood_pressure("120"), None);
        assert_eq!(parse_blood_pressure("high/low"), None);
    }

    #[test]
    fn test_blood_pressure_bands() {
        assert_eq!(blood_pressure_finding("185/95").unwrap().unwrap().bonus, 30);
        assert_eq!(blood_pressure_finding("130/125").unwrap().unwrap().bonus, 30);
        assert_eq!(blood_pressure_finding("85/55").unwrap().unwrap().bonus, 25);
        assert_eq!(blood_pressure_finding("145/85").unwrap().unwrap().bonus, 10);
        assert!(blood_pressure_finding("120/80").unwrap().is_none());
        // Crisis wins over low when both apply
        assert_eq!(blood_pressure_finding("190/50").unwrap().unwrap().bonus, 30);
    }

    #[test]
    fn test_heart_rate_bands() {
        assert_eq!(heart_rate_finding("130").unwrap().unwrap().bonus, 20);
        assert_eq!(heart_rate_finding("45").unwrap().unwrap().bonus, 20);
        assert_eq!(heart_rate_finding("110").unwrap().unwrap().bonus, 8);
        assert_eq!(heart_rate_finding("55").unwrap().unwrap().bonus, 8);
        assert!(heart_rate_finding("120").unwrap().unwrap().detected_issue.is_none());
        assert!(heart_rate_finding("75").unwrap().is_none());
    }

    #[test]
    fn test_temperature_bands() {
        assert_eq!(temperature_finding("104").unwrap().unwrap().bonus, 25);
        assert_eq!(temperature_finding("94.5").unwrap().unwrap().bonus, 25);
        assert_eq!(temperature_finding("100.4").unwrap().unwrap().bonus, 12);
        assert!(temperature_finding("100.3").unwrap().is_none());
        assert!(temperature_finding("98.6").unwrap().is_none());
    }

    #[test]
    fn test_oxygen_bands() {
        assert_eq!(oxygen_finding("88").unwrap().unwrap().bonus, 35);
        assert_eq!(oxygen_finding("92%").unwrap().unwrap().bonus, 15);
        assert!(oxygen_finding("95").unwrap().is_none());
    }

    #[test]
    fn test_unreadable_vital_is_skipped() {
        let vitals = Vitals {
            blood_pressure: Some("unknown".into()),
            heart_rate: Some("130".into()),
            temperature: Some("warm".into()),
            oxygen_level: None,
        };
        let assessment = assess_vitals(&vitals);
        assert_eq!(assessment.total_bonus(), 20);
        assert_eq!(assessment.skipped.len(), 2);
        assert!(matches!(
            &assessment.skipped[0],
            InputDataError::Unparseable { vital: "blood pressure", .. }
        ));
    }
}
