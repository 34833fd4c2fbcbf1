//! Participant-country filtering for multi-country extracts.

use panel_ingest::RawRecord;
use panel_model::{ResolvedSchema, SemanticField};

/// Keeps records whose country matches one of the accepted tokens.
///
/// Numeric tokens (ISO numeric codes) must match the whole cell; text tokens
/// may appear anywhere in it, case-insensitively. With no country column or
/// no accepted tokens every record passes.
#[derive(Debug, Clone)]
pub struct CountryFilter {
    column: Option<usize>,
    accepted: Vec<String>,
}

impl CountryFilter {
    pub fn new(schema: &ResolvedSchema, accepted: &[String]) -> Self {
        let accepted: Vec<String> = accepted
            .iter()
            .map(|token| token.trim().to_uppercase())
            .filter(|token| !token.is_empty())
            .collect();
        let column = if accepted.is_empty() {
            None
        } else {
            schema.index(SemanticField::Country)
        };
        Self { column, accepted }
    }

    pub fn is_active(&self) -> bool {
        self.column.is_some()
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }

    pub fn accepts(&self, record: &RawRecord) -> bool {
        let Some(index) = self.column else {
            return true;
        };
        let value = record.get(index).unwrap_or_default().trim().to_uppercase();
        self.accepted.iter().any(|token| {
            if token.chars().all(|c| c.is_ascii_digit()) {
                value.trim_start_matches('0') == token.trim_start_matches('0')
                    || value.strip_suffix(".0") == Some(token.as_str())
            } else {
                value.contains(token.as_str())
            }
        })
    }
}
