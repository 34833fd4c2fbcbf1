//! Error types for file processing.

use panel_ingest::IngestError;
use panel_model::SchemaResolutionError;
use thiserror::Error;

/// Errors that stop one file from being processed. Other files in the same
/// run are unaffected.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Reading, sniffing or schema resolution failed.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// A resolved schema lost its geographic column.
    #[error("resolved schema for {name} has no geographic column")]
    NoGeoColumn { name: String },
}

impl ProcessError {
    /// The schema failure behind this error, if that is what it is.
    pub fn schema_error(&self) -> Option<&SchemaResolutionError> {
        match self {
            ProcessError::Ingest(IngestError::Schema(err)) => Some(err),
            _ => None,
        }
    }
}

impl From<SchemaResolutionError> for ProcessError {
    fn from(err: SchemaResolutionError) -> Self {
        ProcessError::Ingest(IngestError::Schema(err))
    }
}

pub type Result<T> = std::result::Result<T, ProcessError>;

#[cfg(test)]
mod tests {
    use super::*;
    use panel_model::{MissingRequirement, SemanticField};

    #[test]
    fn schema_errors_are_recoverable_for_diagnostics() {
        let err: ProcessError = SchemaResolutionError {
            source_name: "saeb_2019.csv".to_string(),
            missing: vec![MissingRequirement::Field(SemanticField::GeoUnit)],
            header: vec!["ID_ESCOLA".to_string()],
        }
        .into();
        let schema = err.schema_error().unwrap();
        assert_eq!(schema.source_name, "saeb_2019.csv");
        assert!(err.to_string().contains("geo_unit"));

        let other = ProcessError::Ingest(IngestError::EmptyInput {
            name: "x.csv".to_string(),
        });
        assert!(other.schema_error().is_none());
    }
}
