//! Administrative network classification.

use panel_ingest::RawRecord;
use panel_model::{NetworkClass, NetworkCodeMap, ResolvedSchema, SemanticField};

/// Maps a record's network column through the survey's code table.
#[derive(Debug, Clone)]
pub struct NetworkClassifier {
    column: Option<usize>,
    codes: NetworkCodeMap,
}

impl NetworkClassifier {
    pub fn new(schema: &ResolvedSchema, codes: &NetworkCodeMap) -> Self {
        Self {
            column: schema.index(SemanticField::NetworkType),
            codes: codes.clone(),
        }
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }

    /// `None` when the column is absent, the cell is empty, or the code is
    /// not in the table.
    pub fn classify(&self, record: &RawRecord) -> Option<NetworkClass> {
        let raw = record.get(self.column?)?;
        self.codes.get(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_model::{ResolvedColumn, Subject};
    use std::collections::BTreeMap;

    #[test]
    fn classifies_through_code_table() {
        let mut columns = BTreeMap::new();
        columns.insert(
            SemanticField::GeoUnit,
            ResolvedColumn {
                name: "ID_UF".into(),
                index: 0,
            },
        );
        columns.insert(
            SemanticField::SubjectScore(Subject::Math),
            ResolvedColumn {
                name: "MEDIA_9EF_MT".into(),
                index: 1,
            },
        );
        columns.insert(
            SemanticField::NetworkType,
            ResolvedColumn {
                name: "ID_DEPENDENCIA_ADM".into(),
                index: 2,
            },
        );
        let schema = ResolvedSchema::new("saeb.csv", columns, Vec::new(), Vec::new());
        let codes = NetworkCodeMap::new()
            .with_code("3", NetworkClass::Public)
            .with_code("4", NetworkClass::Private);
        let classifier = NetworkClassifier::new(&schema, &codes);

        let record = |code: &str| -> RawRecord { ["35", "250", code].into_iter().collect() };
        assert_eq!(classifier.classify(&record("4")), Some(NetworkClass::Private));
        assert_eq!(classifier.classify(&record("3.0")), Some(NetworkClass::Public));
        assert_eq!(classifier.classify(&record("")), None);
        assert_eq!(classifier.classify(&record("7")), None);
    }
}
