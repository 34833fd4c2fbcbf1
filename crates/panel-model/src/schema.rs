//! Resolved schema: where each semantic field lives in a concrete file.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::{SemanticField, Subject};

/// Text encoding detected (or forced) for a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// ISO-8859-1, decoded as windows-1252.
    Latin1,
}

impl TextEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" | "windows-1252" | "cp1252" => {
                Ok(TextEncoding::Latin1)
            }
            other => Err(format!("unsupported encoding: {other}")),
        }
    }
}

/// A header column matched to a semantic field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedColumn {
    pub name: String,
    pub index: usize,
}

/// Mapping from semantic fields to concrete header columns.
///
/// Built once per file by the column resolver and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    source: String,
    columns: BTreeMap<SemanticField, ResolvedColumn>,
    absent: Vec<SemanticField>,
    header: Vec<String>,
    delimiter: u8,
    encoding: TextEncoding,
    fingerprint: String,
}

impl ResolvedSchema {
    pub fn new(
        source: impl Into<String>,
        columns: BTreeMap<SemanticField, ResolvedColumn>,
        absent: Vec<SemanticField>,
        header: Vec<String>,
    ) -> Self {
        Self {
            source: source.into(),
            columns,
            absent,
            header,
            delimiter: b',',
            encoding: TextEncoding::Utf8,
            fingerprint: String::new(),
        }
    }

    /// Records the container format the header was read with.
    #[must_use]
    pub fn with_format(mut self, delimiter: u8, encoding: TextEncoding) -> Self {
        self.delimiter = delimiter;
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn column(&self, field: SemanticField) -> Option<&ResolvedColumn> {
        self.columns.get(&field)
    }

    pub fn index(&self, field: SemanticField) -> Option<usize> {
        self.columns.get(&field).map(|column| column.index)
    }

    pub fn column_name(&self, field: SemanticField) -> Option<&str> {
        self.columns.get(&field).map(|column| column.name.as_str())
    }

    pub fn has(&self, field: SemanticField) -> bool {
        self.columns.contains_key(&field)
    }

    pub fn columns(&self) -> impl Iterator<Item = (SemanticField, &ResolvedColumn)> {
        self.columns.iter().map(|(field, column)| (*field, column))
    }

    /// Resolved subject score columns in subject order.
    pub fn subjects(&self) -> impl Iterator<Item = (Subject, usize)> + '_ {
        self.columns
            .iter()
            .filter_map(|(field, column)| field.subject().map(|subject| (subject, column.index)))
    }

    /// Optional fields that matched no header entry.
    pub fn absent(&self) -> &[SemanticField] {
        &self.absent
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Hex SHA-256 over the normalized header.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ResolvedSchema {
        let mut columns = BTreeMap::new();
        columns.insert(
            SemanticField::GeoUnit,
            ResolvedColumn {
                name: "ID_UF".to_string(),
                index: 0,
            },
        );
        columns.insert(
            SemanticField::SubjectScore(Subject::Math),
            ResolvedColumn {
                name: "MEDIA_MT".to_string(),
                index: 2,
            },
        );
        columns.insert(
            SemanticField::SubjectScore(Subject::Language),
            ResolvedColumn {
                name: "MEDIA_LP".to_string(),
                index: 1,
            },
        );
        ResolvedSchema::new(
            "saeb.csv",
            columns,
            vec![SemanticField::CohortStatus],
            vec!["ID_UF".into(), "MEDIA_LP".into(), "MEDIA_MT".into()],
        )
    }

    #[test]
    fn subjects_follow_subject_order() {
        let subjects: Vec<_> = schema().subjects().collect();
        assert_eq!(subjects, vec![(Subject::Language, 1), (Subject::Math, 2)]);
    }

    #[test]
    fn lookups_by_field() {
        let schema = schema().with_format(b';', TextEncoding::Latin1);
        assert_eq!(schema.index(SemanticField::GeoUnit), Some(0));
        assert_eq!(
            schema.column_name(SemanticField::SubjectScore(Subject::Math)),
            Some("MEDIA_MT")
        );
        assert!(!schema.has(SemanticField::CohortStatus));
        assert_eq!(schema.delimiter(), b';');
        assert_eq!(schema.encoding(), TextEncoding::Latin1);
    }

    #[test]
    fn encoding_parses_common_aliases() {
        assert_eq!("ISO-8859-1".parse::<TextEncoding>(), Ok(TextEncoding::Latin1));
        assert_eq!("utf8".parse::<TextEncoding>(), Ok(TextEncoding::Utf8));
        assert!("utf-16".parse::<TextEncoding>().is_err());
    }
}
