//! Aggregated output rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::CohortPolicy;
use crate::field::Subject;
use crate::geo::Granularity;

/// Per-subject statistics for one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubjectStats {
    pub mean: f64,
    /// Population standard deviation.
    pub stddev: f64,
    /// Records that carried a score for this subject.
    pub count: u64,
}

/// One row per (geo_unit, year, grade_tag). `record_count` is always
/// positive; empty groups are never emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoUnitSummary {
    pub geo_unit: String,
    pub region: String,
    pub granularity: Granularity,
    pub year: i32,
    pub grade_tag: String,
    pub subjects: BTreeMap<Subject, SubjectStats>,
    pub composite_mean: f64,
    pub composite_stddev: f64,
    pub record_count: u64,
    pub student_count: f64,
    /// Share of public-network records among those with a known network.
    pub network_share: Option<f64>,
    pub cohort_policy: CohortPolicy,
    pub source: String,
    /// Set when the row came from a degraded cohort policy or from a file
    /// with unresolved geographic values.
    #[serde(default)]
    pub low_confidence: bool,
}

impl GeoUnitSummary {
    pub fn subject_mean(&self, subject: Subject) -> Option<f64> {
        self.subjects.get(&subject).map(|stats| stats.mean)
    }

    /// Group key used for ordering ties and joins.
    pub fn group_key(&self) -> (&str, i32, &str) {
        (&self.geo_unit, self.year, &self.grade_tag)
    }
}

/// Sort summaries by composite mean descending, then geo unit, year and
/// grade tag ascending.
pub fn sort_summaries(rows: &mut [GeoUnitSummary]) {
    rows.sort_by(|a, b| {
        b.composite_mean
            .total_cmp(&a.composite_mean)
            .then_with(|| a.group_key().cmp(&b.group_key()))
    });
}

/// One source's contribution to a panel row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelCell {
    pub composite_mean: f64,
    pub record_count: u64,
    pub grade_tag: String,
    pub cohort_policy: CohortPolicy,
    pub low_confidence: bool,
}

/// Summaries from several sources joined on (key, year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonizedPanelRow {
    pub key: String,
    pub granularity: Granularity,
    pub year: i32,
    pub sources: BTreeMap<String, PanelCell>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(geo_unit: &str, composite_mean: f64) -> GeoUnitSummary {
        GeoUnitSummary {
            geo_unit: geo_unit.to_string(),
            region: "Southeast".to_string(),
            granularity: Granularity::State,
            year: 2019,
            grade_tag: "9EF".to_string(),
            subjects: BTreeMap::new(),
            composite_mean,
            composite_stddev: 0.0,
            record_count: 1,
            student_count: 1.0,
            network_share: None,
            cohort_policy: CohortPolicy::AllData,
            source: "saeb".to_string(),
            low_confidence: true,
        }
    }

    #[test]
    fn sort_is_descending_with_geo_tiebreak() {
        let mut rows = vec![row("RJ", 480.0), row("SP", 500.0), row("MG", 480.0)];
        sort_summaries(&mut rows);
        let order: Vec<_> = rows.iter().map(|r| r.geo_unit.as_str()).collect();
        assert_eq!(order, vec!["SP", "MG", "RJ"]);
    }
}
