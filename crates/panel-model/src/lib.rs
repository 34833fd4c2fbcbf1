//! Data model for the harmonized education panel.
//!
//! This crate holds the types every other crate exchanges:
//!
//! - [`field`]: semantic fields and subjects looked up in raw headers
//! - [`candidates`]: per-survey column catalogs
//! - [`schema`]: the resolved field to column mapping of one file
//! - [`geo`]: canonical states, regions and granularity
//! - [`config`]: survey configuration (geo strategy, network codes, cohort)
//! - [`summary`]: aggregated rows and harmonized panel rows
//! - [`diagnostics`]: per-file processing report
//! - [`error`]: contract-level errors

pub mod candidates;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod field;
pub mod geo;
pub mod observation;
pub mod options;
pub mod schema;
pub mod summary;

pub use candidates::{ColumnPattern, FieldCandidates, FieldSpec, normalize_column_name};
pub use config::{
    CohortConfig, CohortPolicy, CompositeMethod, GeoStrategy, NetworkClass, NetworkCodeMap,
    NetworkFilter, SurveyConfig, SurveyFamily,
};
pub use diagnostics::{Diagnostics, ScoreTally};
pub use error::{MissingRequirement, PanelError, SchemaResolutionError};
pub use field::{SemanticField, Subject};
pub use geo::{Granularity, Region, State, state_region_map};
pub use observation::NormalizedObservation;
pub use options::{DEFAULT_BATCH_SIZE, DEFAULT_GEO_SAMPLE_LIMIT, ProcessingOptions};
pub use schema::{ResolvedColumn, ResolvedSchema, TextEncoding};
pub use summary::{GeoUnitSummary, HarmonizedPanelRow, PanelCell, SubjectStats, sort_summaries};
