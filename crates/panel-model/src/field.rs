//! Semantic fields that the column resolver looks for in raw headers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Assessed subject area.
///
/// Exit exams report five areas (four objective tests plus the essay), the
/// school census reports language and math, and international assessments
/// report reading, math and science.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Language,
    Math,
    NaturalSciences,
    Humanities,
    Essay,
    Reading,
    Science,
}

impl Subject {
    pub const ALL: [Subject; 7] = [
        Subject::Language,
        Subject::Math,
        Subject::NaturalSciences,
        Subject::Humanities,
        Subject::Essay,
        Subject::Reading,
        Subject::Science,
    ];

    /// Returns the snake_case identifier used in configs and CSV headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Language => "language",
            Subject::Math => "math",
            Subject::NaturalSciences => "natural_sciences",
            Subject::Humanities => "humanities",
            Subject::Essay => "essay",
            Subject::Reading => "reading",
            Subject::Science => "science",
        }
    }

    /// Returns the column label used in summary tables (e.g. `Math_Mean`).
    pub fn label(&self) -> &'static str {
        match self {
            Subject::Language => "Language",
            Subject::Math => "Math",
            Subject::NaturalSciences => "Natural_Sciences",
            Subject::Humanities => "Humanities",
            Subject::Essay => "Essay",
            Subject::Reading => "Reading",
            Subject::Science => "Science",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Subject::ALL
            .into_iter()
            .find(|subject| {
                subject.as_str() == normalized || subject.label().to_lowercase() == normalized
            })
            .ok_or_else(|| format!("unknown subject: {s}"))
    }
}

/// A semantic field with a fixed meaning across survey vintages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    /// Geographic unit (state code, state name, or stratum code).
    GeoUnit,
    /// Completion status / cohort marker (e.g. "graduating this year").
    CohortStatus,
    /// Linking identifier such as the school id; used as a cohort proxy.
    SchoolLink,
    /// Administrative network (public/private dependency).
    NetworkType,
    /// Score for one subject.
    SubjectScore(Subject),
    /// Number of students represented by a record (school-level tables).
    StudentCount,
    /// Participant country (international extracts).
    Country,
}

impl SemanticField {
    /// Returns true for the score fields.
    pub fn is_subject(&self) -> bool {
        matches!(self, SemanticField::SubjectScore(_))
    }

    /// Returns the subject for score fields.
    pub fn subject(&self) -> Option<Subject> {
        match self {
            SemanticField::SubjectScore(subject) => Some(*subject),
            _ => None,
        }
    }
}

impl fmt::Display for SemanticField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticField::GeoUnit => f.write_str("geo_unit"),
            SemanticField::CohortStatus => f.write_str("cohort_status"),
            SemanticField::SchoolLink => f.write_str("school_link"),
            SemanticField::NetworkType => f.write_str("network_type"),
            SemanticField::SubjectScore(subject) => write!(f, "subject_score({subject})"),
            SemanticField::StudentCount => f.write_str("student_count"),
            SemanticField::Country => f.write_str("country"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_parses_from_identifier_and_label() {
        assert_eq!("math".parse::<Subject>(), Ok(Subject::Math));
        assert_eq!("Natural_Sciences".parse::<Subject>(), Ok(Subject::NaturalSciences));
        assert!("geography".parse::<Subject>().is_err());
    }

    #[test]
    fn field_display_names_subject() {
        assert_eq!(
            SemanticField::SubjectScore(Subject::Essay).to_string(),
            "subject_score(essay)"
        );
        assert_eq!(SemanticField::GeoUnit.to_string(), "geo_unit");
    }
}
