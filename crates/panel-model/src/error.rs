//! Contract-level errors shared across the workspace.

use std::fmt;

use thiserror::Error;

use crate::field::{SemanticField, Subject};
use crate::geo::Granularity;

/// A mandatory requirement the header could not satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingRequirement {
    Field(SemanticField),
    /// None of the listed subjects resolved; at least one is required.
    AnySubject(Vec<Subject>),
}

impl fmt::Display for MissingRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingRequirement::Field(field) => write!(f, "{field}"),
            MissingRequirement::AnySubject(subjects) => {
                let names: Vec<&str> = subjects.iter().map(Subject::as_str).collect();
                write!(f, "any subject score ({})", names.join(", "))
            }
        }
    }
}

/// The header lacks a mandatory field. The file is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "cannot resolve schema for {source_name}: missing {}; header: [{}]",
    join_display(.missing),
    .header.join(", ")
)]
pub struct SchemaResolutionError {
    /// Name of the file or stream being resolved.
    pub source_name: String,
    pub missing: Vec<MissingRequirement>,
    pub header: Vec<String>,
}

fn join_display(items: &[MissingRequirement]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised while joining summary tables into a panel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    /// Tables must share one granularity before they are joined.
    #[error("cannot join {left} ({left_granularity}) with {right} ({right_granularity}); reconcile granularity first")]
    MixedGranularity {
        left: String,
        left_granularity: Granularity,
        right: String,
        right_granularity: Granularity,
    },

    #[error("no source tables to join")]
    NoSources,

    #[error("duplicate source name: {name}")]
    DuplicateSource { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_every_missing_field() {
        let err = SchemaResolutionError {
            source_name: "enem_2015.csv".to_string(),
            missing: vec![
                MissingRequirement::Field(SemanticField::GeoUnit),
                MissingRequirement::AnySubject(vec![Subject::Math, Subject::Essay]),
            ],
            header: vec!["NU_INSCRICAO".to_string(), "TP_SEXO".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "cannot resolve schema for enem_2015.csv: missing geo_unit, any subject score (math, essay); header: [NU_INSCRICAO, TP_SEXO]"
        );
    }
}
