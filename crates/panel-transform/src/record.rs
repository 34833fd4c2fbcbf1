//! Record-level pipeline: raw record to normalized observation.

use std::collections::BTreeMap;

use panel_ingest::RawRecord;
use panel_model::{
    CohortPolicy, NetworkClass, NetworkFilter, NormalizedObservation, ResolvedSchema, ScoreTally,
    SemanticField, Subject, SurveyConfig,
};

use crate::cohort::CohortFilter;
use crate::country::CountryFilter;
use crate::geo::{GeoResolution, GeoResolver};
use crate::network::NetworkClassifier;
use crate::score::{ScoreNormalizer, parse_decimal};

/// What happened to one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Accepted(NormalizedObservation),
    RejectedByCountry,
    RejectedByCohort,
    RejectedByNetwork,
    /// Raw geographic value that no table entry matched.
    UnresolvedGeo(String),
    /// No subject carried a usable score.
    NoScores,
}

/// Applies the country filter, cohort filter, network filter, geographic
/// resolution and score normalization to each record, in that order.
#[derive(Debug, Clone)]
pub struct RecordTransformer {
    country: CountryFilter,
    cohort: CohortFilter,
    network: NetworkClassifier,
    network_filter: NetworkFilter,
    geo: GeoResolver,
    geo_column: usize,
    subjects: Vec<(Subject, usize)>,
    student_count_column: Option<usize>,
    scores: ScoreNormalizer,
    year: i32,
    grade_tag: String,
}

impl RecordTransformer {
    /// Returns `None` if the schema has no geographic column; resolved
    /// schemas always do.
    pub fn new(
        schema: &ResolvedSchema,
        config: &SurveyConfig,
        network_filter: NetworkFilter,
        year: i32,
    ) -> Option<Self> {
        let geo_column = schema.index(SemanticField::GeoUnit)?;
        let cohort = CohortFilter::new(schema, &config.cohort);
        let grade_tag = config.grade_tag(cohort.policy());
        let network_codes = schema
            .column_name(SemanticField::NetworkType)
            .map_or(&config.network_codes, |column| config.network_codes_for(column));
        Some(Self {
            country: CountryFilter::new(schema, &config.accepted_countries),
            network: NetworkClassifier::new(schema, network_codes),
            network_filter,
            geo: GeoResolver::new(config.geo_strategy.clone()),
            geo_column,
            subjects: schema.subjects().collect(),
            student_count_column: schema.index(SemanticField::StudentCount),
            scores: ScoreNormalizer::new(),
            year,
            grade_tag,
            cohort,
        })
    }

    pub fn policy(&self) -> CohortPolicy {
        self.cohort.policy()
    }

    pub fn grade_tag(&self) -> &str {
        &self.grade_tag
    }

    pub fn score_tally(&self) -> &ScoreTally {
        self.scores.tally()
    }

    /// Column indexes this transformer reads.
    pub fn columns(&self) -> Vec<usize> {
        let mut columns = vec![self.geo_column];
        columns.extend(self.subjects.iter().map(|(_, index)| *index));
        columns.extend(self.student_count_column);
        columns.extend(self.cohort.column());
        columns.extend(self.network.column());
        columns.extend(self.country.column());
        columns
    }

    pub fn apply(&mut self, record: &RawRecord) -> RecordOutcome {
        if !self.country.accepts(record) {
            return RecordOutcome::RejectedByCountry;
        }
        if !self.cohort.accepts(record) {
            return RecordOutcome::RejectedByCohort;
        }
        let network = self.network.classify(record);
        if !self.network_filter.admits(network) {
            return RecordOutcome::RejectedByNetwork;
        }

        let raw_geo = record.get(self.geo_column).unwrap_or_default();
        let GeoResolution::Resolved {
            key,
            region,
            granularity,
        } = self.geo.resolve(raw_geo)
        else {
            return RecordOutcome::UnresolvedGeo(raw_geo.trim().to_string());
        };

        let mut subject_scores = BTreeMap::new();
        for (subject, index) in &self.subjects {
            let value = self.scores.normalize(record.get(*index).unwrap_or_default());
            if let Some(score) = value.value() {
                subject_scores.insert(*subject, score);
            }
        }
        let Some(composite_score) = NormalizedObservation::composite_of(&subject_scores) else {
            return RecordOutcome::NoScores;
        };

        // Unparseable counts contribute nothing rather than a phantom student.
        let student_count = self.student_count_column.map(|index| {
            record
                .get(index)
                .and_then(parse_decimal)
                .filter(|n| n.is_finite() && *n >= 0.0)
                .unwrap_or(0.0)
        });

        RecordOutcome::Accepted(NormalizedObservation {
            geo_key: key.to_string(),
            region: region.name().to_string(),
            granularity,
            year: self.year,
            cohort_tag: self.grade_tag.clone(),
            subject_scores,
            composite_score: Some(composite_score),
            student_count,
            is_public: network.map(|class| class == NetworkClass::Public),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_ingest::{exit_exam, international_assessment_regions, resolve_columns};
    use panel_model::Granularity;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn record(cells: &[&str]) -> RawRecord {
        cells.iter().copied().collect()
    }

    #[test]
    fn exit_exam_record_flow() {
        let config = exit_exam();
        let header = header(&[
            "SG_UF_PROVA",
            "TP_ST_CONCLUSAO",
            "TP_DEPENDENCIA_ADM_ESC",
            "NU_NOTA_MT",
            "NU_NOTA_REDACAO",
        ]);
        let schema = resolve_columns("enem.csv", &header, &config.candidates).unwrap();
        let mut transformer =
            RecordTransformer::new(&schema, &config, NetworkFilter::Public, 2019).unwrap();
        assert_eq!(transformer.policy(), CohortPolicy::Strict);
        assert_eq!(transformer.grade_tag(), "STRICT_3EM");

        let RecordOutcome::Accepted(observation) =
            transformer.apply(&record(&["SP", "2", "2", "600,5", "0"]))
        else {
            panic!("expected an observation");
        };
        assert_eq!(observation.geo_key, "SP");
        assert_eq!(observation.region, "Southeast");
        assert_eq!(observation.granularity, Granularity::State);
        assert_eq!(observation.subject_scores.len(), 1);
        assert_eq!(observation.composite_score, Some(600.5));
        assert_eq!(observation.is_public, Some(true));
        assert_eq!(observation.student_count, None);

        assert_eq!(
            transformer.apply(&record(&["SP", "1", "2", "600", "700"])),
            RecordOutcome::RejectedByCohort
        );
        assert_eq!(
            transformer.apply(&record(&["SP", "2", "4", "600", "700"])),
            RecordOutcome::RejectedByNetwork
        );
        assert_eq!(
            transformer.apply(&record(&["ZZ", "2", "1", "600", "700"])),
            RecordOutcome::UnresolvedGeo("ZZ".to_string())
        );
        assert_eq!(
            transformer.apply(&record(&["RJ", "2", "1", "", "0"])),
            RecordOutcome::NoScores
        );
        assert_eq!(transformer.score_tally().zero_sentinel, 2);
    }

    #[test]
    fn strict_cohort_drops_later_year_students_with_scores() {
        let config = exit_exam();
        let header = header(&["SG_UF_PROVA", "TP_ST_CONCLUSAO", "NU_NOTA_MT", "NU_NOTA_REDACAO"]);
        let schema = resolve_columns("enem.csv", &header, &config.candidates).unwrap();
        let mut transformer =
            RecordTransformer::new(&schema, &config, NetworkFilter::All, 2019).unwrap();
        assert_eq!(transformer.policy(), CohortPolicy::Strict);

        assert_eq!(
            transformer.apply(&record(&["SP", "3", "650,0", "720"])),
            RecordOutcome::RejectedByCohort
        );
        assert!(matches!(
            transformer.apply(&record(&["SP", "2", "650,0", "720"])),
            RecordOutcome::Accepted(_)
        ));
    }

    #[test]
    fn international_extract_filters_country_first() {
        let config = international_assessment_regions();
        let header = header(&["CNT", "STRATUM", "PV1MATH", "PV1READ", "PV1SCIE"]);
        let schema = resolve_columns("pisa.csv", &header, &config.candidates).unwrap();
        let mut transformer =
            RecordTransformer::new(&schema, &config, NetworkFilter::All, 2018).unwrap();
        assert_eq!(transformer.policy(), CohortPolicy::AllData);

        assert_eq!(
            transformer.apply(&record(&["ARG", "ARG0213", "400", "400", "400"])),
            RecordOutcome::RejectedByCountry
        );
        let RecordOutcome::Accepted(observation) =
            transformer.apply(&record(&["BRA", "BRA0213", "390", "410", "400"]))
        else {
            panic!("expected an observation");
        };
        assert_eq!(observation.geo_key, "Northeast");
        assert_eq!(observation.granularity, Granularity::Region);
        assert_eq!(observation.composite_score, Some(400.0));
        assert_eq!(observation.is_public, None);
    }
}
