//! Fixed symptom severity tables and symptom matching.
//!
//! Matching is case-insensitive substring matching in either direction:
//! a reported symptom matches a table key when either contains the other.

/// Severity class of a symptom table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SymptomSeverity {
    Moderate,
    Urgent,
    Critical,
}

impl SymptomSeverity {
    fn issue_prefix(&self) -> &'static str {
        match self {
            SymptomSeverity::Critical => "Critical symptom",
            SymptomSeverity::Urgent => "Urgent symptom",
            SymptomSeverity::Moderate => "Moderate symptom",
        }
    }
}

/// Critical symptoms (weights 65-85).
pub const CRITICAL_SYMPTOMS: &[(&str, u32)] = &[
    ("chest pain", 70),
    ("difficulty breathing", 65),
    ("severe bleeding", 75),
    ("loss of consciousness", 80),
    ("stroke symptoms", 85),
    ("severe allergic reaction", 70),
];

/// Urgent symptoms (weights 30-45).
pub const URGENT_SYMPTOMS: &[(&str, u32)] = &[
    ("high fever", 35),
    ("persistent vomiting", 30),
    ("severe pain", 40),
    ("head injury", 45),
    ("abdominal pain", 35),
    ("confusion", 40),
];

/// Moderate symptoms (weights 10-18).
pub const MODERATE_SYMPTOMS: &[(&str, u32)] = &[
    ("dizziness", 15),
    ("headache", 12),
    ("cough", 10),
    ("sore throat", 10),
    ("fatigue", 12),
    ("nausea", 15),
    ("back pain", 18),
    ("joint pain", 15),
];

/// A reported symptom matched against a table entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SymptomMatch {
    pub severity: SymptomSeverity,
    pub key: &'static str,
    pub weight: u32,
    /// The symptom as the patient reported it (trimmed)
    pub reported: String,
}

/// Outcome of matching all reported symptoms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymptomAssessment {
    /// Symptom component of the risk score
    pub score: u32,
    /// Most severe class that contributed
    pub highest: Option<SymptomSeverity>,
    /// One issue line per reported critical/urgent symptom
    pub detected_issues: Vec<String>,
}

fn table(severity: SymptomSeverity) -> &'static [(&'static str, u32)] {
    match severity {
        SymptomSeverity::Critical => CRITICAL_SYMPTOMS,
        SymptomSeverity::Urgent => URGENT_SYMPTOMS,
        SymptomSeverity::Moderate => MODERATE_SYMPTOMS,
    }
}

fn matches_key(normalized: &str, key: &str) -> bool {
    normalized.contains(key) || key.contains(normalized)
}

/// All table matches for the reported symptoms, in report order.
pub fn match_symptoms(symptoms: &[String]) -> Vec<SymptomMatch> {
    let mut matches = Vec::new();
    for reported in symptoms {
        let reported = reported.trim();
        let normalized = reported.to_lowercase();
        if normalized.is_empty() {
            continue;
        }
        for severity in [
            SymptomSeverity::Critical,
            SymptomSeverity::Urgent,
            SymptomSeverity::Moderate,
        ] {
            for &(key, weight) in table(severity) {
                if matches_key(&normalized, key) {
                    matches.push(SymptomMatch {
                        severity,
                        key,
                        weight,
                        reported: reported.to_string(),
                    });
                }
            }
        }
    }
    matches
}

/// Score the reported symptoms.
///
/// The score is the maximum matched weight. Moderate matches only count when
/// no critical or urgent match exists anywhere in the submission.
pub fn assess_symptoms(symptoms: &[String]) -> SymptomAssessment {
    let matches = match_symptoms(symptoms);

    let escalated: Vec<&SymptomMatch> = matches
        .iter()
        .filter(|m| m.severity > SymptomSeverity::Moderate)
        .collect();

    let counted: Vec<&SymptomMatch> = if escalated.is_empty() {
        matches.iter().collect()
    } else {
        escalated
    };

    let score = counted.iter().map(|m| m.weight).max().unwrap_or(0);
    let highest = counted.iter().map(|m| m.severity).max();

    let mut detected_issues = Vec::new();
    for m in &counted {
        if m.severity == SymptomSeverity::Moderate {
            continue;
        }
        // Report each symptom once, under its most severe class
        let top = counted
            .iter()
            .filter(|other| other.reported == m.reported)
            .map(|other| other.severity)
            .max()
            .unwrap_or(m.severity);
        if top != m.severity {
            continue;
        }
        let issue = format!("{}: {}", m.severity.issue_prefix(), m.reported);
        if !detected_issues.contains(&issue) {
            detected_issues.push(issue);
        }
    }

    SymptomAssessment {
        score,
        highest,
        detected_issues,
    }
}
