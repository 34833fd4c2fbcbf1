use std::collections::BTreeMap;

use crate::field::Subject;
use crate::geo::Granularity;

/// One qualifying record after cohort filtering, score normalization and
/// geographic resolution. Consumed by the aggregator and then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedObservation {
    pub geo_key: String,
    pub region: String,
    pub granularity: Granularity,
    pub year: i32,
    pub cohort_tag: String,
    /// Non-missing scores only.
    pub subject_scores: BTreeMap<Subject, f64>,
    /// Mean of `subject_scores`; `None` when no subject was present.
    pub composite_score: Option<f64>,
    pub student_count: Option<f64>,
    pub is_public: Option<bool>,
}

impl NormalizedObservation {
    /// Arithmetic mean of the present subject scores.
    pub fn composite_of(scores: &BTreeMap<Subject, f64>) -> Option<f64> {
        if scores.is_empty() {
            return None;
        }
        Some(scores.values().sum::<f64>() / scores.len() as f64)
    }
}
