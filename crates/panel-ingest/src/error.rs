//! Error types for survey ingestion.

use std::path::PathBuf;

use panel_model::SchemaResolutionError;
use thiserror::Error;

/// Errors that can occur while reading a survey file or its configuration.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Survey file not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to open or read a file.
    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read from a stream.
    #[error("failed to read {name}: {source}")]
    StreamRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    // === CSV Errors ===
    /// The input has no header line.
    #[error("input is empty: {name}")]
    EmptyInput { name: String },

    /// Malformed CSV container.
    #[error("failed to parse CSV {name} at line {line}: {message}")]
    CsvParse {
        name: String,
        line: u64,
        message: String,
    },

    // === Schema Errors ===
    /// Header lacks a mandatory field.
    #[error(transparent)]
    Schema(#[from] SchemaResolutionError),

    // === Configuration Errors ===
    /// Survey configuration JSON could not be parsed.
    #[error("invalid survey configuration {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    /// No built-in survey family with this name.
    #[error("unknown survey family '{name}' (available: {available})")]
    UnknownFamily { name: String, available: String },

    /// Grade label not supported by the school census catalog.
    #[error("unknown grade '{grade}' (expected 5EF, 9EF or 3EM)")]
    UnknownGrade { grade: String },
}

impl IngestError {
    pub(crate) fn csv(name: &str, err: &csv::Error) -> Self {
        let line = err.position().map(csv::Position::line).unwrap_or(0);
        Self::CsvParse {
            name: name.to_string(),
            line,
            message: err.to_string(),
        }
    }

    /// Maps an I/O error on `path`, separating "not found" from other failures.
    pub(crate) fn open(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::FileRead {
                path: path.to_path_buf(),
                source: err,
            }
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::FileNotFound {
            path: PathBuf::from("/data/enem_2015.csv"),
        };
        assert_eq!(err.to_string(), "file not found: /data/enem_2015.csv");
    }

    #[test]
    fn test_open_maps_not_found() {
        let err = IngestError::open(
            std::path::Path::new("x.csv"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(err, IngestError::FileNotFound { .. }));

        let err = IngestError::open(
            std::path::Path::new("x.csv"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, IngestError::FileRead { .. }));
    }
}
