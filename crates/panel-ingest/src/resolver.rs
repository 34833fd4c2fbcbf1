//! Column resolution: match semantic fields to header entries.
//!
//! Exact patterns are tried first across all of a field's candidates, then
//! fragment patterns. Within each stage the candidate order wins over the
//! header order: a later header entry matching an earlier pattern beats an
//! earlier header entry matching a later pattern.

use std::collections::BTreeMap;

use panel_model::{
    ColumnPattern, FieldCandidates, FieldSpec, MissingRequirement, ResolvedColumn,
    ResolvedSchema, SchemaResolutionError, SemanticField, normalize_column_name,
};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Resolves headers against one catalog.
#[derive(Debug, Clone, Copy)]
pub struct ColumnResolver<'a> {
    candidates: &'a FieldCandidates,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(candidates: &'a FieldCandidates) -> Self {
        Self { candidates }
    }

    /// Resolves every field of the catalog against `header`.
    ///
    /// `GeoUnit`, at least one subject, and any field flagged `required`
    /// are mandatory; when any is missing the error names all of them.
    pub fn resolve(
        &self,
        source: &str,
        header: &[String],
    ) -> Result<ResolvedSchema, SchemaResolutionError> {
        let normalized: Vec<String> = header.iter().map(|h| normalize_column_name(h)).collect();

        let mut columns = BTreeMap::new();
        let mut absent = Vec::new();
        let mut missing = Vec::new();

        for spec in self.candidates.iter() {
            match find_column(spec, &normalized) {
                Some(index) => {
                    debug!(
                        source,
                        field = %spec.field,
                        column = %header[index],
                        index,
                        "Resolved field"
                    );
                    columns.insert(
                        spec.field,
                        ResolvedColumn {
                            name: header[index].trim().to_string(),
                            index,
                        },
                    );
                }
                None if is_mandatory(spec) => {
                    missing.push(MissingRequirement::Field(spec.field));
                }
                None => absent.push(spec.field),
            }
        }

        if self.candidates.get(SemanticField::GeoUnit).is_none() {
            missing.insert(0, MissingRequirement::Field(SemanticField::GeoUnit));
        }
        if !columns.keys().any(SemanticField::is_subject) {
            missing.push(MissingRequirement::AnySubject(self.candidates.subjects()));
        }

        if !missing.is_empty() {
            return Err(SchemaResolutionError {
                source_name: source.to_string(),
                missing,
                header: header.to_vec(),
            });
        }

        Ok(ResolvedSchema::new(source, columns, absent, header.to_vec())
            .with_fingerprint(header_fingerprint(header)))
    }
}

/// Convenience wrapper over [`ColumnResolver::resolve`].
pub fn resolve_columns(
    source: &str,
    header: &[String],
    candidates: &FieldCandidates,
) -> Result<ResolvedSchema, SchemaResolutionError> {
    ColumnResolver::new(candidates).resolve(source, header)
}

fn is_mandatory(spec: &FieldSpec) -> bool {
    spec.required || spec.field == SemanticField::GeoUnit
}

fn find_column(spec: &FieldSpec, normalized: &[String]) -> Option<usize> {
    let exact = spec.patterns.iter().filter(|p| p.is_exact());
    let fallback = spec.patterns.iter().filter(|p| !p.is_exact());
    exact
        .chain(fallback)
        .find_map(|pattern| first_match(pattern, normalized))
}

fn first_match(pattern: &ColumnPattern, normalized: &[String]) -> Option<usize> {
    normalized.iter().position(|column| pattern.matches(column))
}

/// Hex SHA-256 over the normalized header, so drift between vintages shows
/// up as a changed fingerprint.
pub fn header_fingerprint(header: &[String]) -> String {
    let mut hasher = Sha256::new();
    for column in header {
        hasher.update(normalize_column_name(column).as_bytes());
        hasher.update([0x1f]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_model::Subject;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn candidates() -> FieldCandidates {
        FieldCandidates::new()
            .required(
                SemanticField::GeoUnit,
                vec![
                    ColumnPattern::exact("SG_UF_PROVA"),
                    ColumnPattern::exact("SG_UF_ESC"),
                    ColumnPattern::contains("UF"),
                ],
            )
            .optional(
                SemanticField::CohortStatus,
                vec![ColumnPattern::exact("TP_ST_CONCLUSAO")],
            )
            .optional(
                SemanticField::SubjectScore(Subject::Math),
                vec![ColumnPattern::exact("NU_NOTA_MT")],
            )
            .optional(
                SemanticField::SubjectScore(Subject::Essay),
                vec![ColumnPattern::exact("NU_NOTA_REDACAO")],
            )
    }

    #[test]
    fn exact_match_is_case_insensitive_and_ordered() {
        let header = header(&["sg_uf_esc", "NU_NOTA_MT", " SG_UF_PROVA "]);
        let schema = resolve_columns("enem.csv", &header, &candidates()).unwrap();
        assert_eq!(schema.index(SemanticField::GeoUnit), Some(2));
        assert_eq!(schema.column_name(SemanticField::GeoUnit), Some("SG_UF_PROVA"));
        assert_eq!(
            schema.absent(),
            [
                SemanticField::CohortStatus,
                SemanticField::SubjectScore(Subject::Essay)
            ]
        );
    }

    #[test]
    fn fallback_pattern_scans_header_in_order() {
        let header = header(&["CO_UF_RESIDENCIA", "UF_PROVA", "NU_NOTA_REDACAO"]);
        let schema = resolve_columns("enem.csv", &header, &candidates()).unwrap();
        assert_eq!(schema.index(SemanticField::GeoUnit), Some(0));
    }

    #[test]
    fn pattern_preference_beats_header_order() {
        let candidates = FieldCandidates::new()
            .required(
                SemanticField::GeoUnit,
                vec![
                    ColumnPattern::contains("ESTRATO"),
                    ColumnPattern::contains("UF"),
                ],
            )
            .optional(
                SemanticField::SubjectScore(Subject::Math),
                vec![ColumnPattern::exact("MT")],
            );
        let header = header(&["ID_UF", "MT", "ESTRATO_REGIAO"]);
        let schema = resolve_columns("x.csv", &header, &candidates).unwrap();
        assert_eq!(schema.index(SemanticField::GeoUnit), Some(2));
    }

    #[test]
    fn missing_mandatory_fields_are_all_reported() {
        let header = header(&["NU_INSCRICAO", "TP_SEXO"]);
        let err = resolve_columns("enem.csv", &header, &candidates()).unwrap_err();
        assert_eq!(err.source_name, "enem.csv");
        assert_eq!(err.header, header);
        assert_eq!(
            err.missing,
            vec![
                MissingRequirement::Field(SemanticField::GeoUnit),
                MissingRequirement::AnySubject(vec![Subject::Math, Subject::Essay]),
            ]
        );
    }

    #[test]
    fn fingerprint_ignores_case_and_padding() {
        assert_eq!(
            header_fingerprint(&header(&["a", " B"])),
            header_fingerprint(&header(&["A", "b"]))
        );
        assert_ne!(
            header_fingerprint(&header(&["A", "B"])),
            header_fingerprint(&header(&["B", "A"]))
        );
        assert_eq!(header_fingerprint(&header(&["A"])).len(), 64);
    }
}
