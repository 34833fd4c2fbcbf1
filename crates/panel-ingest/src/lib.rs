//! Survey file ingestion.
//!
//! This crate turns a raw survey file into a resolved schema and a stream
//! of record batches.
//!
//! # Features
//!
//! - **Format sniffing**: delimiter (`;`, `,`, tab, `|`) and text encoding
//!   (UTF-8 or windows-1252), with a UTF-8 BOM stripped from the header
//! - **Batched reading**: bounded batches of positional records, decoding only
//!   the columns the schema needs
//! - **Column resolution**: exact-then-fragment matching of semantic fields,
//!   with a header fingerprint for drift tracking
//! - **Catalogs**: built-in configurations for the supported survey families
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use panel_ingest::{ColumnResolver, SurveyReader, exit_exam};
//! use panel_model::ProcessingOptions;
//!
//! let config = exit_exam();
//! let mut reader = SurveyReader::open(Path::new("MICRODADOS_ENEM_2019.csv"), &ProcessingOptions::default())?;
//! let schema = ColumnResolver::new(&config.candidates).resolve(reader.name(), reader.header())?;
//! while let Some(batch) = reader.next_batch()? {
//!     // ...
//! }
//! ```

mod catalog;
mod config;
mod error;
mod reader;
mod resolver;
mod sniff;

// === Error Types ===
pub use error::{IngestError, Result};

// === Reading ===
pub use reader::{RawRecord, SurveyReader};
pub use sniff::{decode, sniff_delimiter, sniff_encoding};

// === Resolution ===
pub use resolver::{ColumnResolver, header_fingerprint, resolve_columns};

// === Configuration ===
pub use catalog::{
    BUILTIN_FAMILIES, SchoolGrade, builtin_config, exit_exam, international_assessment_keywords,
    international_assessment_regions, international_assessment_states, school_census,
};
pub use config::load_survey_config;
