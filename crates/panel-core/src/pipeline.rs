//! Per-file processing pipeline.
//!
//! One survey file goes through these steps:
//!
//! 1. **Sniff and read header** - delimiter, encoding and BOM handling
//! 2. **Resolve schema** - map semantic fields to header columns
//! 3. **Choose cohort policy** - STRICT, PROXY or ALL_DATA
//! 4. **Stream batches** - filter, resolve geography, normalize scores
//! 5. **Aggregate** - fold each batch into the running state
//! 6. **Finalize** - summary rows plus the diagnostics report
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use panel_core::{FileContext, SurveyProcessor};
//! use panel_ingest::exit_exam;
//! use panel_model::ProcessingOptions;
//!
//! let config = exit_exam();
//! let options = ProcessingOptions::default();
//! let outcome = SurveyProcessor::new(&config, &options)
//!     .process_path(Path::new("MICRODADOS_ENEM_2019.csv"), &FileContext::new("enem", 2019))?;
//! println!("{} rows", outcome.summaries.len());
//! ```

use std::io::Read;
use std::path::Path;

use panel_ingest::{ColumnResolver, SurveyReader};
use panel_model::{
    CohortPolicy, Diagnostics, GeoUnitSummary, ProcessingOptions, ResolvedSchema, SemanticField,
    SurveyConfig,
};
use panel_transform::{RecordOutcome, RecordTransformer};
use tracing::{debug, info, warn};

use crate::aggregate::{AggregateState, FinalizeOptions};
use crate::error::{ProcessError, Result};

/// What the caller knows about a file that the file itself does not say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
    /// Label written to each summary row, e.g. `saeb`.
    pub source: String,
    pub year: i32,
}

impl FileContext {
    pub fn new(source: impl Into<String>, year: i32) -> Self {
        Self {
            source: source.into(),
            year,
        }
    }
}

/// Everything produced for one file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub schema: ResolvedSchema,
    pub summaries: Vec<GeoUnitSummary>,
    pub diagnostics: Diagnostics,
}

/// Receives progress while a file streams.
pub trait ProgressSink {
    /// Called after each batch with the running count of records seen.
    fn on_batch(&mut self, records_seen: u64);

    fn on_finish(&mut self, _records_seen: u64) {}
}

/// Ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_batch(&mut self, _records_seen: u64) {}
}

/// Runs files of one survey configuration through the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct SurveyProcessor<'a> {
    config: &'a SurveyConfig,
    options: &'a ProcessingOptions,
}

impl<'a> SurveyProcessor<'a> {
    pub fn new(config: &'a SurveyConfig, options: &'a ProcessingOptions) -> Self {
        Self { config, options }
    }

    pub fn process_path(&self, path: &Path, context: &FileContext) -> Result<FileOutcome> {
        self.process_path_with_progress(path, context, &mut NoProgress)
    }

    pub fn process_path_with_progress(
        &self,
        path: &Path,
        context: &FileContext,
        progress: &mut dyn ProgressSink,
    ) -> Result<FileOutcome> {
        info!(
            path = %path.display(),
            config = %self.config.name,
            year = context.year,
            "Processing survey file"
        );
        let reader = SurveyReader::open(path, self.options)?;
        self.run(reader, context, progress)
    }

    /// Processes any byte stream; `name` stands in for the file name.
    pub fn process_reader<R: Read>(
        &self,
        name: &str,
        input: R,
        context: &FileContext,
        progress: &mut dyn ProgressSink,
    ) -> Result<FileOutcome> {
        let reader = SurveyReader::from_reader(name, input, self.options)?;
        self.run(reader, context, progress)
    }

    fn run<R: Read>(
        &self,
        mut reader: SurveyReader<R>,
        context: &FileContext,
        progress: &mut dyn ProgressSink,
    ) -> Result<FileOutcome> {
        let schema = ColumnResolver::new(&self.config.candidates)
            .resolve(reader.name(), reader.header())?
            .with_format(reader.delimiter(), reader.encoding());

        let mut transformer = RecordTransformer::new(
            &schema,
            self.config,
            self.options.network_filter,
            context.year,
        )
        .ok_or_else(|| ProcessError::NoGeoColumn {
            name: reader.name().to_string(),
        })?;
        reader.set_projection(transformer.columns());

        let policy = transformer.policy();
        let fingerprint = schema.fingerprint();
        info!(
            source = %reader.name(),
            policy = %policy,
            grade_tag = transformer.grade_tag(),
            fingerprint = &fingerprint[..fingerprint.len().min(12)],
            "Resolved schema"
        );
        let has_cohort_column = self.config.candidates.get(SemanticField::CohortStatus).is_some();
        if policy != CohortPolicy::Strict && has_cohort_column {
            warn!(
                source = %reader.name(),
                policy = %policy,
                "cohort status column not found; results are low confidence"
            );
        }

        let mut diagnostics = Diagnostics::new(reader.name(), context.year);
        diagnostics.schema_fingerprint = schema.fingerprint().to_string();
        diagnostics.unresolved_optional_fields =
            schema.absent().iter().map(ToString::to_string).collect();
        diagnostics.cohort_filter_policy_used = Some(policy);

        let mut state = AggregateState::new();
        while let Some(batch) = reader.next_batch()? {
            let mut observations = Vec::with_capacity(batch.len());
            for record in &batch {
                diagnostics.total_records_seen += 1;
                match transformer.apply(record) {
                    RecordOutcome::Accepted(observation) => observations.push(observation),
                    RecordOutcome::RejectedByCountry => diagnostics.rejected_by_country += 1,
                    RecordOutcome::RejectedByCohort => diagnostics.rejected_by_cohort += 1,
                    RecordOutcome::RejectedByNetwork => diagnostics.rejected_by_network += 1,
                    RecordOutcome::UnresolvedGeo(raw) => {
                        diagnostics.record_unresolved_geo(&raw, self.options.geo_sample_limit);
                    }
                    RecordOutcome::NoScores => diagnostics.records_without_scores += 1,
                }
            }
            diagnostics.total_records_aggregated += observations.len() as u64;
            state = state.accumulate(&observations);
            debug!(
                source = %reader.name(),
                batch = batch.len(),
                seen = diagnostics.total_records_seen,
                "Processed batch"
            );
            progress.on_batch(diagnostics.total_records_seen);
        }
        diagnostics.score_tally = *transformer.score_tally();
        progress.on_finish(diagnostics.total_records_seen);

        if diagnostics.unresolved_geo_value_count > 0 {
            warn!(
                source = %reader.name(),
                count = diagnostics.unresolved_geo_value_count,
                distinct_sampled = diagnostics.unresolved_geo_value_sample.len(),
                "records with unresolved geographic values were dropped"
            );
        }

        let mut summaries = state.finalize(&FinalizeOptions {
            source: context.source.clone(),
            cohort_policy: policy,
            composite: self.config.composite,
        });
        if diagnostics.is_low_confidence() {
            for summary in &mut summaries {
                summary.low_confidence = true;
            }
        }
        info!(
            source = %reader.name(),
            seen = diagnostics.total_records_seen,
            aggregated = diagnostics.total_records_aggregated,
            scores_present = diagnostics.score_tally.present,
            scores_missing = diagnostics.score_tally.missing(),
            rows = summaries.len(),
            "Finished survey file"
        );

        Ok(FileOutcome {
            schema,
            summaries,
            diagnostics,
        })
    }
}

/// Processes one file with default progress handling.
pub fn process_file(
    path: &Path,
    context: &FileContext,
    config: &SurveyConfig,
    options: &ProcessingOptions,
) -> Result<FileOutcome> {
    SurveyProcessor::new(config, options).process_path(path, context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_ingest::{SchoolGrade, exit_exam, school_census};
    use panel_model::{NetworkFilter, Subject};

    fn run(config: &SurveyConfig, options: &ProcessingOptions, csv: &str) -> Result<FileOutcome> {
        SurveyProcessor::new(config, options).process_reader(
            "inline.csv",
            csv.as_bytes(),
            &FileContext::new(config.name.clone(), 2019),
            &mut NoProgress,
        )
    }

    #[test]
    fn every_record_is_accounted_for() {
        let config = exit_exam();
        let csv = "SG_UF_PROVA;TP_ST_CONCLUSAO;TP_DEPENDENCIA_ADM_ESC;NU_NOTA_MT;NU_NOTA_REDACAO\n\
                   SP;2;2;600,0;700\n\
                   SP;1;2;500,0;500\n\
                   RJ;2;4;550,0;0\n\
                   XX;2;2;400,0;400\n\
                   MG;2;2;;0\n";
        let options = ProcessingOptions::default().with_network_filter(NetworkFilter::Public);
        let outcome = run(&config, &options, csv).unwrap();
        let d = &outcome.diagnostics;

        assert_eq!(d.total_records_seen, 5);
        assert_eq!(d.total_records_aggregated, 1);
        assert_eq!(d.rejected_by_cohort, 1);
        assert_eq!(d.rejected_by_network, 1);
        assert_eq!(d.unresolved_geo_value_count, 1);
        assert_eq!(d.unresolved_geo_value_sample, vec!["XX"]);
        assert_eq!(d.records_without_scores, 1);
        assert_eq!(d.total_records_aggregated + d.rejected_total(), d.total_records_seen);
        assert_eq!(d.cohort_filter_policy_used, Some(CohortPolicy::Strict));

        assert_eq!(outcome.summaries.len(), 1);
        assert_eq!(outcome.summaries[0].geo_unit, "SP");
        assert_eq!(outcome.summaries[0].composite_mean, 650.0);
        assert_eq!(outcome.summaries[0].network_share, Some(1.0));
        // The unresolved XX record taints every row of the file.
        assert!(outcome.summaries[0].low_confidence);
        assert_eq!(outcome.schema.delimiter(), b';');
    }

    #[test]
    fn missing_geo_column_fails_with_schema_error() {
        let config = school_census(SchoolGrade::Ninth);
        let err = run(&config, &ProcessingOptions::default(), "ID_ESCOLA,MEDIA_9EF_MT\n1,250\n")
            .unwrap_err();
        let schema = err.schema_error().unwrap();
        assert_eq!(schema.missing.len(), 1);
        let diagnostics = Diagnostics::for_schema_failure(2019, schema);
        assert_eq!(diagnostics.unresolved_mandatory_fields, vec!["geo_unit"]);
    }

    #[test]
    fn public_flag_column_splits_networks() {
        let config = school_census(SchoolGrade::Ninth);
        let csv = "ID_UF,IN_PUBLICA,MEDIA_9EF_LP,MEDIA_9EF_MT\n35,1,240,260\n35,0,300,320\n";

        let all = run(&config, &ProcessingOptions::default(), csv).unwrap();
        assert_eq!(all.summaries[0].network_share, Some(0.5));

        let options = ProcessingOptions::default().with_network_filter(NetworkFilter::Private);
        let private = run(&config, &options, csv).unwrap();
        assert_eq!(private.diagnostics.rejected_by_network, 1);
        assert_eq!(private.summaries.len(), 1);
        assert_eq!(private.summaries[0].composite_mean, 310.0);
    }

    #[test]
    fn subject_stats_come_through() {
        let config = school_census(SchoolGrade::Ninth);
        let csv = "ID_UF,MEDIA_9EF_LP,MEDIA_9EF_MT\n35,240,260\n35,260,280\n";
        let outcome = run(&config, &ProcessingOptions::default().with_batch_size(1), csv).unwrap();
        let row = &outcome.summaries[0];
        assert_eq!(row.geo_unit, "SP");
        assert_eq!(row.subject_mean(Subject::Language), Some(250.0));
        assert_eq!(row.subject_mean(Subject::Math), Some(270.0));
        assert_eq!(row.composite_mean, 260.0);
        assert_eq!(row.record_count, 2);
    }
}
