//! Raising state-level summaries to region level.
//!
//! Region rows are unweighted means of their states' statistics: each state
//! counts once regardless of its size. Counts are summed.

use std::collections::BTreeMap;

use panel_model::{
    CohortPolicy, GeoUnitSummary, Granularity, Subject, SubjectStats, sort_summaries,
};
use tracing::{debug, warn};

/// Result of raising a table to region level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    pub rows: Vec<GeoUnitSummary>,
    /// State keys missing from the map. Their rows are dropped.
    pub unmapped: Vec<String>,
}

#[derive(Debug, Default)]
struct RegionAccumulator<'a> {
    states: Vec<&'a GeoUnitSummary>,
}

/// Groups state rows by (region, year, grade tag, source) and averages them.
/// Rows already at region level pass through unchanged.
pub fn raise_granularity(
    rows: &[GeoUnitSummary],
    state_to_region: &BTreeMap<String, String>,
) -> Reconciled {
    let mut passthrough = Vec::new();
    let mut unmapped: Vec<String> = Vec::new();
    let mut groups: BTreeMap<(String, i32, String, String), RegionAccumulator<'_>> =
        BTreeMap::new();

    for row in rows {
        if row.granularity == Granularity::Region {
            passthrough.push(row.clone());
            continue;
        }
        let Some(region) = state_to_region.get(&row.geo_unit) else {
            if !unmapped.contains(&row.geo_unit) {
                unmapped.push(row.geo_unit.clone());
            }
            continue;
        };
        groups
            .entry((
                region.clone(),
                row.year,
                row.grade_tag.clone(),
                row.source.clone(),
            ))
            .or_default()
            .states
            .push(row);
    }

    if !unmapped.is_empty() {
        warn!(
            count = unmapped.len(),
            keys = %unmapped.join(", "),
            "state keys without a region were dropped"
        );
    }

    let mut raised: Vec<GeoUnitSummary> = groups
        .into_iter()
        .map(|((region, year, grade_tag, source), group)| {
            debug!(
                region = %region,
                year,
                states = group.states.len(),
                "raised states to region"
            );
            region_row(region, year, grade_tag, source, &group.states)
        })
        .collect();
    raised.extend(passthrough);
    sort_summaries(&mut raised);

    Reconciled {
        rows: raised,
        unmapped,
    }
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), value| (sum + value, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn region_row(
    region: String,
    year: i32,
    grade_tag: String,
    source: String,
    states: &[&GeoUnitSummary],
) -> GeoUnitSummary {
    let mut subjects: BTreeMap<Subject, SubjectStats> = BTreeMap::new();
    for subject in Subject::ALL {
        let present: Vec<&SubjectStats> = states
            .iter()
            .filter_map(|row| row.subjects.get(&subject))
            .collect();
        if let (Some(mean_value), Some(stddev)) = (
            mean(present.iter().map(|stats| stats.mean)),
            mean(present.iter().map(|stats| stats.stddev)),
        ) {
            subjects.insert(
                subject,
                SubjectStats {
                    mean: mean_value,
                    stddev,
                    count: present.iter().map(|stats| stats.count).sum(),
                },
            );
        }
    }

    GeoUnitSummary {
        geo_unit: region.clone(),
        region,
        granularity: Granularity::Region,
        year,
        grade_tag,
        subjects,
        composite_mean: mean(states.iter().map(|row| row.composite_mean)).unwrap_or(0.0),
        composite_stddev: mean(states.iter().map(|row| row.composite_stddev)).unwrap_or(0.0),
        record_count: states.iter().map(|row| row.record_count).sum(),
        student_count: states.iter().map(|row| row.student_count).sum(),
        network_share: mean(states.iter().filter_map(|row| row.network_share)),
        // The least confident policy among the states labels the region.
        cohort_policy: states
            .iter()
            .map(|row| row.cohort_policy)
            .max()
            .unwrap_or(CohortPolicy::AllData),
        source,
        low_confidence: states.iter().any(|row| row.low_confidence),
    }
}
