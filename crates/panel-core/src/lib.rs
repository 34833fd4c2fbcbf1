//! Aggregation and panel assembly for harmonized survey data.
//!
//! This crate runs resolved survey files through record transformation and
//! aggregation, and joins the resulting summary tables into panels.
//!
//! # Modules
//!
//! - [`pipeline`]: one file from bytes to summaries and diagnostics
//! - [`aggregate`]: batch-invariant, mergeable per-group statistics
//! - [`reconcile`]: raising state summaries to region level
//! - [`panel`]: joining sources on (key, year)

pub mod aggregate;
pub mod error;
pub mod panel;
pub mod pipeline;
pub mod reconcile;

pub use aggregate::{AggregateState, FinalizeOptions, GroupKey, Moments};
pub use error::{ProcessError, Result};
pub use panel::{Harmonized, JoinMode, SourceTable, harmonize, join};
pub use pipeline::{
    FileContext, FileOutcome, NoProgress, ProgressSink, SurveyProcessor, process_file,
};
pub use reconcile::{Reconciled, raise_granularity};
