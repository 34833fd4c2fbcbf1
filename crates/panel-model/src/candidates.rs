//! Field candidate catalogs: which raw column names may carry each field.
//!
//! Drift across survey cycles is expressed here as data. Each field lists
//! its acceptable column patterns in preference order, most specific first.

use serde::{Deserialize, Serialize};

use crate::field::{SemanticField, Subject};

/// A raw column name pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPattern {
    /// Whole column name, compared case-insensitively.
    Exact(String),
    /// Fragment that must appear somewhere in the column name.
    Contains(String),
    /// Every fragment must appear in the column name.
    AllOf(Vec<String>),
}

impl ColumnPattern {
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    pub fn contains(fragment: impl Into<String>) -> Self {
        Self::Contains(fragment.into())
    }

    pub fn all_of<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AllOf(fragments.into_iter().map(Into::into).collect())
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Exact(_))
    }

    /// Tests an already-normalized header entry against this pattern.
    ///
    /// Exact patterns only match whole names; fragment patterns match by
    /// containment.
    pub fn matches(&self, normalized_column: &str) -> bool {
        match self {
            Self::Exact(name) => normalize_column_name(name) == normalized_column,
            Self::Contains(fragment) => {
                let fragment = normalize_column_name(fragment);
                !fragment.is_empty() && normalized_column.contains(&fragment)
            }
            Self::AllOf(fragments) => {
                !fragments.is_empty()
                    && fragments.iter().all(|fragment| {
                        let fragment = normalize_column_name(fragment);
                        !fragment.is_empty() && normalized_column.contains(&fragment)
                    })
            }
        }
    }
}

/// Normalizes a column name for comparison: strips BOM, quotes and
/// surrounding whitespace, then uppercases.
pub fn normalize_column_name(raw: &str) -> String {
    raw.trim()
        .trim_matches('\u{feff}')
        .trim_matches('"')
        .trim()
        .to_uppercase()
}

/// Candidate patterns for one semantic field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field: SemanticField,
    #[serde(default)]
    pub required: bool,
    pub patterns: Vec<ColumnPattern>,
}

/// Per-survey-family catalog of field candidates.
///
/// At least one subject must resolve for any catalog; `GeoUnit` is always
/// treated as required regardless of the `required` flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldCandidates {
    specs: Vec<FieldSpec>,
}

impl FieldCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required field.
    #[must_use]
    pub fn required(self, field: SemanticField, patterns: Vec<ColumnPattern>) -> Self {
        self.with_field(field, true, patterns)
    }

    /// Adds an optional field.
    #[must_use]
    pub fn optional(self, field: SemanticField, patterns: Vec<ColumnPattern>) -> Self {
        self.with_field(field, false, patterns)
    }

    /// Adds a field, replacing any earlier spec for the same field.
    #[must_use]
    pub fn with_field(
        mut self,
        field: SemanticField,
        required: bool,
        patterns: Vec<ColumnPattern>,
    ) -> Self {
        self.specs.retain(|spec| spec.field != field);
        self.specs.push(FieldSpec {
            field,
            required,
            patterns,
        });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.specs.iter()
    }

    pub fn get(&self, field: SemanticField) -> Option<&FieldSpec> {
        self.specs.iter().find(|spec| spec.field == field)
    }

    /// Subjects listed in this catalog, in declaration order.
    pub fn subjects(&self) -> Vec<Subject> {
        self.specs
            .iter()
            .filter_map(|spec| spec.field.subject())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pattern_is_case_insensitive() {
        let pattern = ColumnPattern::exact("id_uf");
        assert!(pattern.matches("ID_UF"));
        assert!(!pattern.matches("ID_UF_2"));
    }

    #[test]
    fn all_of_requires_every_fragment() {
        let pattern = ColumnPattern::all_of(["MEDIA", "9EF", "LP"]);
        assert!(pattern.matches("MEDIA_9EF_LP"));
        assert!(!pattern.matches("MEDIA_9EF_MT"));
        assert!(!ColumnPattern::AllOf(Vec::new()).matches("ANY"));
    }

    #[test]
    fn normalize_strips_bom_and_quotes() {
        assert_eq!(normalize_column_name("\u{feff}\"nu_ano\" "), "NU_ANO");
    }

    #[test]
    fn with_field_replaces_existing_spec() {
        let candidates = FieldCandidates::new()
            .optional(SemanticField::GeoUnit, vec![ColumnPattern::exact("UF")])
            .required(SemanticField::GeoUnit, vec![ColumnPattern::exact("SG_UF")]);
        assert_eq!(candidates.len(), 1);
        let spec = candidates.get(SemanticField::GeoUnit).unwrap();
        assert!(spec.required);
        assert_eq!(spec.patterns, vec![ColumnPattern::exact("SG_UF")]);
    }
}
