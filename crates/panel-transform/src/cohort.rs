//! Cohort filtering.
//!
//! The strongest available evidence of "graduating this year" decides which
//! records are kept. The policy is chosen once per file from its schema.

use panel_ingest::RawRecord;
use panel_model::{CohortConfig, CohortPolicy, ResolvedSchema, SemanticField};

use crate::score::parse_decimal;

/// Tokens meaning "no value" in linking identifier columns.
const MISSING_TOKENS: [&str; 4] = ["NA", "NAN", ".", "NULL"];

/// Decides whether a record belongs to the target cohort.
#[derive(Debug, Clone)]
pub struct CohortFilter {
    policy: CohortPolicy,
    column: Option<usize>,
    sentinel: String,
    sentinel_value: Option<f64>,
}

impl CohortFilter {
    /// Selects the policy from the schema (STRICT, then PROXY, then ALL_DATA).
    pub fn new(schema: &ResolvedSchema, config: &CohortConfig) -> Self {
        let policy = CohortPolicy::select(schema);
        let column = match policy {
            CohortPolicy::Strict => schema.index(SemanticField::CohortStatus),
            CohortPolicy::Proxy => schema.index(SemanticField::SchoolLink),
            CohortPolicy::AllData => None,
        };
        let sentinel = config.sentinel.trim().to_string();
        Self {
            policy,
            column,
            sentinel_value: parse_decimal(&sentinel),
            sentinel,
        }
    }

    pub fn policy(&self) -> CohortPolicy {
        self.policy
    }

    /// Column the policy reads, if any.
    pub fn column(&self) -> Option<usize> {
        self.column
    }

    pub fn accepts(&self, record: &RawRecord) -> bool {
        match (self.policy, self.column) {
            (CohortPolicy::Strict, Some(index)) => {
                record.get(index).is_some_and(|status| self.is_sentinel(status))
            }
            (CohortPolicy::Proxy, Some(index)) => {
                record.get(index).is_some_and(|link| !is_missing_token(link))
            }
            _ => true,
        }
    }

    /// Numeric comparison when both sides parse, trimmed text otherwise.
    fn is_sentinel(&self, raw: &str) -> bool {
        let raw = raw.trim();
        match (self.sentinel_value, parse_decimal(raw)) {
            (Some(expected), Some(actual)) => expected == actual,
            _ => raw == self.sentinel,
        }
    }
}

fn is_missing_token(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || MISSING_TOKENS
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_model::{ResolvedColumn, Subject};
    use std::collections::BTreeMap;

    fn schema(fields: &[(SemanticField, usize)]) -> ResolvedSchema {
        let mut columns = BTreeMap::new();
        columns.insert(
            SemanticField::GeoUnit,
            ResolvedColumn {
                name: "SG_UF".into(),
                index: 0,
            },
        );
        columns.insert(
            SemanticField::SubjectScore(Subject::Math),
            ResolvedColumn {
                name: "NU_NOTA_MT".into(),
                index: 1,
            },
        );
        for (field, index) in fields {
            columns.insert(
                *field,
                ResolvedColumn {
                    name: field.to_string(),
                    index: *index,
                },
            );
        }
        ResolvedSchema::new("enem.csv", columns, Vec::new(), Vec::new())
    }

    fn record(cells: &[&str]) -> RawRecord {
        cells.iter().copied().collect()
    }

    #[test]
    fn strict_compares_numerically() {
        let filter = CohortFilter::new(
            &schema(&[
                (SemanticField::CohortStatus, 2),
                (SemanticField::SchoolLink, 3),
            ]),
            &CohortConfig::default(),
        );
        assert_eq!(filter.policy(), CohortPolicy::Strict);
        assert!(filter.accepts(&record(&["SP", "600", "2", ""])));
        assert!(filter.accepts(&record(&["SP", "600", " 2.0 ", ""])));
        assert!(!filter.accepts(&record(&["SP", "600", "1", "123"])));
        assert!(!filter.accepts(&record(&["SP", "600", "3", "123"])));
        assert!(!filter.accepts(&record(&["SP", "600"])));
    }

    #[test]
    fn strict_falls_back_to_text_comparison() {
        let config = CohortConfig {
            sentinel: "CONCLUINTE".to_string(),
            ..CohortConfig::default()
        };
        let filter = CohortFilter::new(&schema(&[(SemanticField::CohortStatus, 2)]), &config);
        assert!(filter.accepts(&record(&["SP", "600", "CONCLUINTE"])));
        assert!(!filter.accepts(&record(&["SP", "600", "concluinte"])));
    }

    #[test]
    fn proxy_requires_a_link() {
        let filter = CohortFilter::new(
            &schema(&[(SemanticField::SchoolLink, 2)]),
            &CohortConfig::default(),
        );
        assert_eq!(filter.policy(), CohortPolicy::Proxy);
        assert!(filter.accepts(&record(&["SP", "600", "35012345"])));
        for missing in ["", "NA", "nan", ".", "  "] {
            assert!(!filter.accepts(&record(&["SP", "600", missing])));
        }
    }

    #[test]
    fn all_data_accepts_everything() {
        let filter = CohortFilter::new(&schema(&[]), &CohortConfig::default());
        assert_eq!(filter.policy(), CohortPolicy::AllData);
        assert!(filter.accepts(&record(&["SP", ""])));
    }
}
