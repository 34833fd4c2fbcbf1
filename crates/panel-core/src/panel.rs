//! Joining summary tables from several sources into one panel.

use std::collections::{BTreeMap, BTreeSet};

use panel_model::{GeoUnitSummary, Granularity, HarmonizedPanelRow, PanelCell, PanelError};
use tracing::{debug, info};

use crate::reconcile::raise_granularity;

/// How keys missing from some sources are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum JoinMode {
    /// Keep only (key, year) pairs present in every source.
    #[default]
    Inner,
    /// Keep every pair; absent sources have no cell.
    Outer,
}

impl JoinMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinMode::Inner => "inner",
            JoinMode::Outer => "outer",
        }
    }
}

impl std::str::FromStr for JoinMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinMode::Inner),
            "outer" => Ok(JoinMode::Outer),
            other => Err(format!("unknown join mode: {other}")),
        }
    }
}

/// Summary rows of one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    pub name: String,
    pub rows: Vec<GeoUnitSummary>,
    /// Overrides each row's year when aligning sources from different years
    /// into one wave.
    pub wave: Option<i32>,
}

impl SourceTable {
    pub fn new(name: impl Into<String>, rows: Vec<GeoUnitSummary>) -> Self {
        Self {
            name: name.into(),
            rows,
            wave: None,
        }
    }

    #[must_use]
    pub fn with_wave(mut self, wave: i32) -> Self {
        self.wave = Some(wave);
        self
    }

    /// The coarsest granularity present, or `None` for an empty table.
    pub fn granularity(&self) -> Option<Granularity> {
        self.rows.iter().map(|row| row.granularity).max()
    }

    fn is_mixed(&self) -> bool {
        let mut levels = self.rows.iter().map(|row| row.granularity);
        levels
            .next()
            .is_some_and(|first| levels.any(|level| level != first))
    }

    fn year_of(&self, row: &GeoUnitSummary) -> i32 {
        self.wave.unwrap_or(row.year)
    }

    /// Column name for a row. Tables mixing grade tags get one column per tag.
    fn cell_name(&self, row: &GeoUnitSummary, multi_grade: bool) -> String {
        if multi_grade {
            format!("{}_{}", self.name, row.grade_tag)
        } else {
            self.name.clone()
        }
    }

    fn has_multiple_grades(&self) -> bool {
        let tags: BTreeSet<&str> = self.rows.iter().map(|row| row.grade_tag.as_str()).collect();
        tags.len() > 1
    }
}

/// A joined panel and what was done to get there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Harmonized {
    pub rows: Vec<HarmonizedPanelRow>,
    /// Tables that were raised from state to region level.
    pub raised: Vec<String>,
    /// State keys dropped during raising because no region was known.
    pub unmapped: Vec<String>,
}

/// Raises state-level tables to region level when the sources disagree on
/// granularity, then joins them.
pub fn harmonize(
    tables: Vec<SourceTable>,
    mode: JoinMode,
    state_to_region: &BTreeMap<String, String>,
) -> Result<Harmonized, PanelError> {
    let needs_raise = tables.iter().any(SourceTable::is_mixed) || {
        let levels: BTreeSet<Granularity> =
            tables.iter().filter_map(SourceTable::granularity).collect();
        levels.len() > 1
    };

    let mut raised = Vec::new();
    let mut unmapped = Vec::new();
    let tables: Vec<SourceTable> = if needs_raise {
        tables
            .into_iter()
            .map(|table| {
                if table.rows.iter().all(|row| row.granularity == Granularity::Region) {
                    return table;
                }
                info!(source = %table.name, "raising state rows to region level");
                let reconciled = raise_granularity(&table.rows, state_to_region);
                raised.push(table.name.clone());
                for key in reconciled.unmapped {
                    if !unmapped.contains(&key) {
                        unmapped.push(key);
                    }
                }
                SourceTable {
                    rows: reconciled.rows,
                    ..table
                }
            })
            .collect()
    } else {
        tables
    };

    let rows = join(&tables, mode)?;
    Ok(Harmonized {
        rows,
        raised,
        unmapped,
    })
}

/// Joins tables on (key, year). All tables must share one granularity.
pub fn join(tables: &[SourceTable], mode: JoinMode) -> Result<Vec<HarmonizedPanelRow>, PanelError> {
    let Some(first) = tables.first() else {
        return Err(PanelError::NoSources);
    };

    let mut names = BTreeSet::new();
    for table in tables {
        if !names.insert(table.name.as_str()) {
            return Err(PanelError::DuplicateSource {
                name: table.name.clone(),
            });
        }
    }

    let reference = tables
        .iter()
        .find_map(|table| table.rows.first().map(|row| (table, row.granularity)));
    if let Some((anchor, granularity)) = reference {
        for table in tables {
            if let Some(row) = table.rows.iter().find(|row| row.granularity != granularity) {
                return Err(PanelError::MixedGranularity {
                    left: anchor.name.clone(),
                    left_granularity: granularity,
                    right: table.name.clone(),
                    right_granularity: row.granularity,
                });
            }
        }
    }
    let granularity = reference.map_or(Granularity::State, |(_, granularity)| granularity);

    let mut panel: BTreeMap<(String, i32), BTreeMap<String, PanelCell>> = BTreeMap::new();
    let mut presence: BTreeMap<(String, i32), BTreeSet<&str>> = BTreeMap::new();
    for table in tables {
        let multi_grade = table.has_multiple_grades();
        for row in &table.rows {
            let key = (row.geo_unit.clone(), table.year_of(row));
            presence
                .entry(key.clone())
                .or_default()
                .insert(table.name.as_str());
            panel.entry(key).or_default().insert(
                table.cell_name(row, multi_grade),
                PanelCell {
                    composite_mean: row.composite_mean,
                    record_count: row.record_count,
                    grade_tag: row.grade_tag.clone(),
                    cohort_policy: row.cohort_policy,
                    low_confidence: row.low_confidence,
                },
            );
        }
    }

    let rows: Vec<HarmonizedPanelRow> = panel
        .into_iter()
        .filter(|(key, _)| match mode {
            JoinMode::Outer => true,
            JoinMode::Inner => presence
                .get(key)
                .is_some_and(|sources| sources.len() == tables.len()),
        })
        .map(|((key, year), sources)| HarmonizedPanelRow {
            key,
            granularity,
            year,
            sources,
        })
        .collect();

    debug!(
        sources = tables.len(),
        first = %first.name,
        mode = mode.as_str(),
        rows = rows.len(),
        "joined panel"
    );
    Ok(rows)
}
