//! Incremental aggregation of observations into per-geo summaries.
//!
//! State is kept as sums, sums of squares and counts, so the result does not
//! depend on how records were split into batches, and partial states from
//! separate runs can be merged.

use std::collections::BTreeMap;

use panel_model::{
    CohortPolicy, CompositeMethod, GeoUnitSummary, Granularity, NormalizedObservation,
    SubjectStats, Subject, sort_summaries,
};

/// Running sum, sum of squares and count.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub sum: f64,
    pub sum_sq: f64,
    pub n: u64,
}

impl Moments {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.sum_sq += value * value;
        self.n += 1;
    }

    pub fn merge(&mut self, other: &Moments) {
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.n += other.n;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }

    /// Population standard deviation, clamped at zero against rounding.
    pub fn stddev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = self.sum_sq / self.n as f64 - mean * mean;
        Some(variance.max(0.0).sqrt())
    }
}

/// Key of one output row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub geo_unit: String,
    pub year: i32,
    pub grade_tag: String,
}

#[derive(Debug, Clone, PartialEq)]
struct GroupState {
    region: String,
    granularity: Granularity,
    subjects: BTreeMap<Subject, Moments>,
    composite: Moments,
    records: u64,
    students: f64,
    public: u64,
    known_network: u64,
}

impl GroupState {
    fn new(region: &str, granularity: Granularity) -> Self {
        Self {
            region: region.to_string(),
            granularity,
            subjects: BTreeMap::new(),
            composite: Moments::default(),
            records: 0,
            students: 0.0,
            public: 0,
            known_network: 0,
        }
    }

    fn merge(&mut self, other: &GroupState) {
        for (subject, moments) in &other.subjects {
            self.subjects.entry(*subject).or_default().merge(moments);
        }
        self.composite.merge(&other.composite);
        self.records += other.records;
        self.students += other.students;
        self.public += other.public;
        self.known_network += other.known_network;
    }
}

/// How finalized rows are labelled and how their composite is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOptions {
    pub source: String,
    pub cohort_policy: CohortPolicy,
    pub composite: CompositeMethod,
}

/// Aggregation state for any number of groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateState {
    groups: BTreeMap<GroupKey, GroupState>,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one observation. Observations without a composite carry no
    /// score and are ignored; returns whether it was counted.
    pub fn add(&mut self, observation: &NormalizedObservation) -> bool {
        let Some(composite) = observation.composite_score else {
            return false;
        };
        let key = GroupKey {
            geo_unit: observation.geo_key.clone(),
            year: observation.year,
            grade_tag: observation.cohort_tag.clone(),
        };
        let group = self
            .groups
            .entry(key)
            .or_insert_with(|| GroupState::new(&observation.region, observation.granularity));

        for (subject, score) in &observation.subject_scores {
            group.subjects.entry(*subject).or_default().add(*score);
        }
        group.composite.add(composite);
        group.records += 1;
        group.students += observation.student_count.unwrap_or(1.0);
        if let Some(is_public) = observation.is_public {
            group.known_network += 1;
            if is_public {
                group.public += 1;
            }
        }
        true
    }

    /// Folds a batch into the state.
    #[must_use]
    pub fn accumulate(mut self, batch: &[NormalizedObservation]) -> Self {
        for observation in batch {
            self.add(observation);
        }
        self
    }

    /// Combines two states. Order does not matter.
    #[must_use]
    pub fn merge(mut self, other: AggregateState) -> Self {
        for (key, state) in other.groups {
            match self.groups.get_mut(&key) {
                Some(existing) => existing.merge(&state),
                None => {
                    self.groups.insert(key, state);
                }
            }
        }
        self
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn record_count(&self) -> u64 {
        self.groups.values().map(|group| group.records).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Produces one summary per group, sorted by composite mean descending.
    pub fn finalize(&self, options: &FinalizeOptions) -> Vec<GeoUnitSummary> {
        let mut rows: Vec<GeoUnitSummary> = self
            .groups
            .iter()
            .filter(|(_, group)| group.records > 0)
            .map(|(key, group)| summarize(key, group, options))
            .collect();
        sort_summaries(&mut rows);
        rows
    }
}

fn summarize(key: &GroupKey, group: &GroupState, options: &FinalizeOptions) -> GeoUnitSummary {
    let subjects: BTreeMap<Subject, SubjectStats> = group
        .subjects
        .iter()
        .filter_map(|(subject, moments)| {
            Some((
                *subject,
                SubjectStats {
                    mean: moments.mean()?,
                    stddev: moments.stddev()?,
                    count: moments.n,
                },
            ))
        })
        .collect();

    let record_mean = group.composite.mean().unwrap_or(0.0);
    let composite_mean = match options.composite {
        CompositeMethod::RecordMean => record_mean,
        CompositeMethod::SubjectMeans if subjects.is_empty() => record_mean,
        CompositeMethod::SubjectMeans => {
            subjects.values().map(|stats| stats.mean).sum::<f64>() / subjects.len() as f64
        }
    };

    GeoUnitSummary {
        geo_unit: key.geo_unit.clone(),
        region: group.region.clone(),
        granularity: group.granularity,
        year: key.year,
        grade_tag: key.grade_tag.clone(),
        subjects,
        composite_mean,
        composite_stddev: group.composite.stddev().unwrap_or(0.0),
        record_count: group.records,
        student_count: group.students,
        network_share: (group.known_network > 0)
            .then(|| group.public as f64 / group.known_network as f64),
        cohort_policy: options.cohort_policy,
        source: options.source.clone(),
        low_confidence: options.cohort_policy.is_low_confidence(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(geo: &str, scores: &[(Subject, f64)], is_public: Option<bool>) -> NormalizedObservation {
        let subject_scores: BTreeMap<Subject, f64> = scores.iter().copied().collect();
        NormalizedObservation {
            geo_key: geo.to_string(),
            region: "Southeast".to_string(),
            granularity: Granularity::State,
            year: 2019,
            cohort_tag: "9EF".to_string(),
            composite_score: NormalizedObservation::composite_of(&subject_scores),
            subject_scores,
            student_count: None,
            is_public,
        }
    }

    fn options(composite: CompositeMethod) -> FinalizeOptions {
        FinalizeOptions {
            source: "saeb".to_string(),
            cohort_policy: CohortPolicy::AllData,
            composite,
        }
    }

    #[test]
    fn moments_population_stddev() {
        let mut moments = Moments::default();
        for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            moments.add(value);
        }
        assert_eq!(moments.mean(), Some(5.0));
        assert_eq!(moments.stddev(), Some(2.0));
        assert_eq!(Moments::default().mean(), None);
    }

    #[test]
    fn single_value_has_zero_spread() {
        let mut moments = Moments::default();
        moments.add(612.3);
        assert_eq!(moments.stddev(), Some(0.0));
    }

    #[test]
    fn subject_means_composite_averages_subject_means() {
        let state = AggregateState::new().accumulate(&[
            observation("SP", &[(Subject::Math, 600.0), (Subject::Language, 400.0)], None),
            observation("SP", &[(Subject::Math, 600.0)], None),
        ]);
        let rows = state.finalize(&options(CompositeMethod::SubjectMeans));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].composite_mean, 500.0);
        assert_eq!(rows[0].subject_mean(Subject::Math), Some(600.0));
        assert_eq!(rows[0].subjects[&Subject::Language].count, 1);

        let rows = state.finalize(&options(CompositeMethod::RecordMean));
        assert_eq!(rows[0].composite_mean, 550.0);
        assert_eq!(rows[0].composite_stddev, 50.0);
    }

    #[test]
    fn network_share_only_counts_known_networks() {
        let state = AggregateState::new().accumulate(&[
            observation("RJ", &[(Subject::Math, 500.0)], Some(true)),
            observation("RJ", &[(Subject::Math, 500.0)], Some(false)),
            observation("RJ", &[(Subject::Math, 500.0)], None),
            observation("MG", &[(Subject::Math, 500.0)], None),
        ]);
        let rows = state.finalize(&options(CompositeMethod::RecordMean));
        let rj = rows.iter().find(|r| r.geo_unit == "RJ").unwrap();
        let mg = rows.iter().find(|r| r.geo_unit == "MG").unwrap();
        assert_eq!(rj.network_share, Some(0.5));
        assert_eq!(rj.record_count, 3);
        assert_eq!(rj.student_count, 3.0);
        assert_eq!(mg.network_share, None);
    }

    #[test]
    fn observations_without_scores_are_ignored() {
        let mut state = AggregateState::new();
        assert!(!state.add(&observation("SP", &[], None)));
        assert!(state.is_empty());
        assert!(state.finalize(&options(CompositeMethod::RecordMean)).is_empty());
    }

    #[test]
    fn merge_combines_groups() {
        let a = AggregateState::new().accumulate(&[observation("SP", &[(Subject::Math, 500.0)], None)]);
        let b = AggregateState::new().accumulate(&[
            observation("SP", &[(Subject::Math, 700.0)], None),
            observation("RJ", &[(Subject::Math, 450.0)], None),
        ]);
        let merged = a.merge(b);
        assert_eq!(merged.group_count(), 2);
        assert_eq!(merged.record_count(), 3);
        let rows = merged.finalize(&options(CompositeMethod::RecordMean));
        assert_eq!(rows[0].geo_unit, "SP");
        assert_eq!(rows[0].composite_mean, 600.0);
    }
}
