//! Per-file diagnostics report.

use serde::{Deserialize, Serialize};

use crate::config::CohortPolicy;
use crate::error::SchemaResolutionError;

/// Outcome counts of score normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTally {
    pub present: u64,
    pub empty: u64,
    pub zero_sentinel: u64,
    pub unparseable: u64,
}

impl ScoreTally {
    pub fn missing(&self) -> u64 {
        self.empty + self.zero_sentinel + self.unparseable
    }
}

/// What happened to the records of one file.
///
/// Every record seen ends up either aggregated or in exactly one of the
/// rejection counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub source: String,
    pub year: i32,
    pub schema_fingerprint: String,
    pub unresolved_mandatory_fields: Vec<String>,
    pub unresolved_optional_fields: Vec<String>,
    pub unresolved_geo_value_count: u64,
    /// Distinct unresolved raw values, first seen first, bounded.
    pub unresolved_geo_value_sample: Vec<String>,
    pub cohort_filter_policy_used: Option<CohortPolicy>,
    pub total_records_seen: u64,
    pub total_records_aggregated: u64,
    pub rejected_by_cohort: u64,
    pub rejected_by_country: u64,
    pub rejected_by_network: u64,
    pub records_without_scores: u64,
    pub score_tally: ScoreTally,
}

impl Diagnostics {
    pub fn new(source: impl Into<String>, year: i32) -> Self {
        Self {
            source: source.into(),
            year,
            ..Self::default()
        }
    }

    /// Diagnostics for a file whose header could not be resolved.
    pub fn for_schema_failure(year: i32, error: &SchemaResolutionError) -> Self {
        Self {
            unresolved_mandatory_fields: error
                .missing
                .iter()
                .map(ToString::to_string)
                .collect(),
            ..Self::new(error.source_name.clone(), year)
        }
    }

    /// Counts an unresolved geographic value and keeps it in the sample if
    /// it is new and the sample is not full.
    pub fn record_unresolved_geo(&mut self, raw: &str, limit: usize) {
        self.unresolved_geo_value_count += 1;
        let value = raw.trim();
        if self.unresolved_geo_value_sample.len() < limit
            && !self.unresolved_geo_value_sample.iter().any(|v| v == value)
        {
            self.unresolved_geo_value_sample.push(value.to_string());
        }
    }

    pub fn rejected_total(&self) -> u64 {
        self.rejected_by_cohort
            + self.rejected_by_country
            + self.rejected_by_network
            + self.records_without_scores
            + self.unresolved_geo_value_count
    }

    /// True when rows from this file should be discounted downstream.
    pub fn is_low_confidence(&self) -> bool {
        self.unresolved_geo_value_count > 0
            || self
                .cohort_filter_policy_used
                .is_some_and(|policy| policy.is_low_confidence())
    }
}
