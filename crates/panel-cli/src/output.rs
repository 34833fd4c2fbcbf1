//! Output files: summary CSV, panel CSV and the diagnostics report.
//!
//! Summary CSVs written by `panel process` are read back by
//! `panel reconcile`, so the two functions here must agree on columns.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use serde::Serialize;

use panel_model::{
    CohortPolicy, Diagnostics, GeoUnitSummary, Granularity, HarmonizedPanelRow, Subject,
    SubjectStats,
};

const FIXED_COLUMNS: [&str; 13] = [
    "geo_unit",
    "region",
    "granularity",
    "year",
    "grade_tag",
    "source",
    "cohort_policy",
    "low_confidence",
    "composite_mean",
    "composite_stddev",
    "record_count",
    "student_count",
    "network_share",
];

/// First standalone four-digit run in the file name that looks like a
/// survey year.
pub fn infer_year(path: &Path) -> Option<i32> {
    let name = path.file_name()?.to_string_lossy();
    let bytes = name.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        if !bytes[start].is_ascii_digit() {
            start += 1;
            continue;
        }
        let end = bytes[start..]
            .iter()
            .position(|b| !b.is_ascii_digit())
            .map_or(bytes.len(), |offset| start + offset);
        if end - start == 4
            && let Ok(year) = name[start..end].parse::<i32>()
            && (1990..=2100).contains(&year)
        {
            return Some(year);
        }
        start = end;
    }
    None
}

fn subjects_in(rows: &[GeoUnitSummary]) -> Vec<Subject> {
    let present: BTreeSet<Subject> = rows
        .iter()
        .flat_map(|row| row.subjects.keys().copied())
        .collect();
    Subject::ALL
        .into_iter()
        .filter(|subject| present.contains(subject))
        .collect()
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes summary rows with one mean/stddev/count triple per subject that
/// appears in any row.
pub fn write_summaries<W: Write>(writer: W, rows: &[GeoUnitSummary]) -> Result<()> {
    let subjects = subjects_in(rows);
    let mut csv = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = FIXED_COLUMNS.iter().map(ToString::to_string).collect();
    for subject in &subjects {
        header.push(format!("{}_Mean", subject.label()));
        header.push(format!("{}_Std", subject.label()));
        header.push(format!("{}_N", subject.label()));
    }
    csv.write_record(&header)?;

    for s in rows {
        let mut record = vec![
            s.geo_unit.clone(),
            s.region.clone(),
            s.granularity.to_string(),
            s.year.to_string(),
            s.grade_tag.clone(),
            s.source.clone(),
            s.cohort_policy.to_string(),
            s.low_confidence.to_string(),
            s.composite_mean.to_string(),
            s.composite_stddev.to_string(),
            s.record_count.to_string(),
            s.student_count.to_string(),
            optional_number(s.network_share),
        ];
        for subject in &subjects {
            let stats = s.subjects.get(subject);
            record.push(optional_number(stats.map(|st| st.mean)));
            record.push(optional_number(stats.map(|st| st.stddev)));
            record.push(stats.map(|st| st.count.to_string()).unwrap_or_default());
        }
        csv.write_record(&record)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_summaries_file(path: &Path, rows: &[GeoUnitSummary]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    write_summaries(file, rows).with_context(|| format!("write {}", path.display()))
}

struct SummaryColumns {
    fixed: BTreeMap<&'static str, usize>,
    subjects: Vec<(Subject, usize, Option<usize>, Option<usize>)>,
}

impl SummaryColumns {
    fn from_header(header: &csv::StringRecord) -> Result<Self> {
        let position = |name: &str| header.iter().position(|h| h.trim() == name);
        let mut fixed = BTreeMap::new();
        for name in FIXED_COLUMNS {
            match position(name) {
                Some(index) => {
                    fixed.insert(name, index);
                }
                None if name == "low_confidence" || name == "network_share" => {}
                None => bail!("summary file is missing column {name}"),
            }
        }

        let mut subjects = Vec::new();
        for (index, name) in header.iter().enumerate() {
            let Some(label) = name.trim().strip_suffix("_Mean") else {
                continue;
            };
            let Ok(subject) = label.parse::<Subject>() else {
                continue;
            };
            subjects.push((
                subject,
                index,
                position(&format!("{label}_Std")),
                position(&format!("{label}_N")),
            ));
        }
        Ok(Self { fixed, subjects })
    }

    fn text<'r>(&self, record: &'r csv::StringRecord, name: &str) -> &'r str {
        self.fixed
            .get(name)
            .and_then(|index| record.get(*index))
            .unwrap_or_default()
            .trim()
    }

    fn parse_row(&self, record: &csv::StringRecord, line: u64) -> Result<GeoUnitSummary> {
        let number = |name: &str| -> Result<f64> {
            let raw = self.text(record, name);
            raw.parse::<f64>()
                .with_context(|| format!("line {line}: invalid {name} '{raw}'"))
        };
        let optional = |raw: &str| -> Option<f64> {
            let raw = raw.trim();
            if raw.is_empty() { None } else { raw.parse().ok() }
        };

        let mut subjects = BTreeMap::new();
        for (subject, mean_index, std_index, count_index) in &self.subjects {
            let Some(mean) = record.get(*mean_index).and_then(optional) else {
                continue;
            };
            let stddev = std_index
                .and_then(|i| record.get(i))
                .and_then(optional)
                .unwrap_or(0.0);
            let count = count_index
                .and_then(|i| record.get(i))
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .unwrap_or(0);
            subjects.insert(*subject, SubjectStats { mean, stddev, count });
        }

        let granularity: Granularity = self
            .text(record, "granularity")
            .parse()
            .map_err(|e: String| anyhow!("line {line}: {e}"))?;
        let cohort_policy: CohortPolicy = self
            .text(record, "cohort_policy")
            .parse()
            .map_err(|e: String| anyhow!("line {line}: {e}"))?;
        Ok(GeoUnitSummary {
            geo_unit: self.text(record, "geo_unit").to_string(),
            region: self.text(record, "region").to_string(),
            granularity,
            year: self
                .text(record, "year")
                .parse()
                .with_context(|| format!("line {line}: invalid year"))?,
            grade_tag: self.text(record, "grade_tag").to_string(),
            subjects,
            composite_mean: number("composite_mean")?,
            composite_stddev: number("composite_stddev")?,
            record_count: self
                .text(record, "record_count")
                .parse()
                .with_context(|| format!("line {line}: invalid record_count"))?,
            student_count: number("student_count")?,
            network_share: optional(self.text(record, "network_share")),
            cohort_policy,
            source: self.text(record, "source").to_string(),
            low_confidence: self.text(record, "low_confidence").eq_ignore_ascii_case("true"),
        })
    }
}

/// Reads a summary CSV written by [`write_summaries`].
pub fn read_summaries<R: Read>(reader: R) -> Result<Vec<GeoUnitSummary>> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = SummaryColumns::from_header(csv.headers()?)?;
    let mut rows = Vec::new();
    for (offset, record) in csv.records().enumerate() {
        let record = record?;
        rows.push(columns.parse_row(&record, offset as u64 + 2)?);
    }
    Ok(rows)
}

pub fn read_summaries_file(path: &Path) -> Result<Vec<GeoUnitSummary>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    read_summaries(file).with_context(|| format!("read summaries from {}", path.display()))
}

/// Writes one row per (key, year) with five columns per source.
pub fn write_panel<W: Write>(writer: W, rows: &[HarmonizedPanelRow]) -> Result<()> {
    let sources: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.sources.keys().map(String::as_str))
        .collect();
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec![
        "key".to_string(),
        "granularity".to_string(),
        "year".to_string(),
    ];
    for source in &sources {
        header.push(format!("{source}_composite_mean"));
        header.push(format!("{source}_record_count"));
        header.push(format!("{source}_grade_tag"));
        header.push(format!("{source}_cohort_policy"));
        header.push(format!("{source}_low_confidence"));
    }
    csv.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.key.clone(), row.granularity.to_string(), row.year.to_string()];
        for source in &sources {
            match row.sources.get(*source) {
                Some(cell) => {
                    record.push(cell.composite_mean.to_string());
                    record.push(cell.record_count.to_string());
                    record.push(cell.grade_tag.clone());
                    record.push(cell.cohort_policy.to_string());
                    record.push(cell.low_confidence.to_string());
                }
                None => record.extend(std::iter::repeat_n(String::new(), 5)),
            }
        }
        csv.write_record(&record)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_panel_file(path: &Path, rows: &[HarmonizedPanelRow]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    write_panel(file, rows).with_context(|| format!("write {}", path.display()))
}

/// A file that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

/// Diagnostics of every file in one `panel process` run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsReport {
    pub generated_at: String,
    pub config: String,
    pub files: Vec<Diagnostics>,
    pub failed: Vec<FailedFile>,
}

impl DiagnosticsReport {
    pub fn new(config: impl Into<String>, files: Vec<Diagnostics>, failed: Vec<FailedFile>) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            config: config.into(),
            files,
            failed,
        }
    }
}

pub fn write_diagnostics_file(path: &Path, report: &DiagnosticsReport) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(file, report)
        .with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_model::PanelCell;

    #[test]
    fn year_comes_from_standalone_digits() {
        assert_eq!(infer_year(Path::new("/data/MICRODADOS_ENEM_2019.csv")), Some(2019));
        assert_eq!(infer_year(Path::new("saeb2017_escola.csv")), Some(2017));
        assert_eq!(infer_year(Path::new("TS_ESCOLA_123456.csv")), None);
        assert_eq!(infer_year(Path::new("pisa_1234_2018.csv")), Some(2018));
        assert_eq!(infer_year(Path::new("export.csv")), None);
    }

    #[test]
    fn low_confidence_reaches_the_panel() {
        let summary = GeoUnitSummary {
            geo_unit: "SP".to_string(),
            region: "Southeast".to_string(),
            granularity: Granularity::State,
            year: 2019,
            grade_tag: "STRICT_3EM".to_string(),
            subjects: BTreeMap::new(),
            composite_mean: 550.0,
            composite_stddev: 0.0,
            record_count: 1,
            student_count: 1.0,
            network_share: None,
            cohort_policy: CohortPolicy::Strict,
            source: "enem".to_string(),
            low_confidence: true,
        };
        let mut buffer = Vec::new();
        write_summaries(&mut buffer, std::slice::from_ref(&summary)).unwrap();
        let back = read_summaries(buffer.as_slice()).unwrap();
        assert_eq!(back, vec![summary.clone()]);

        let mut sources = BTreeMap::new();
        sources.insert(
            "enem".to_string(),
            PanelCell {
                composite_mean: back[0].composite_mean,
                record_count: back[0].record_count,
                grade_tag: back[0].grade_tag.clone(),
                cohort_policy: back[0].cohort_policy,
                low_confidence: back[0].low_confidence,
            },
        );
        let row = HarmonizedPanelRow {
            key: "SP".to_string(),
            granularity: Granularity::State,
            year: 2019,
            sources,
        };
        let mut panel = Vec::new();
        write_panel(&mut panel, &[row]).unwrap();
        let text = String::from_utf8(panel).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with(",enem_cohort_policy,enem_low_confidence"));
        assert_eq!(lines[1], "SP,state,2019,550,1,STRICT_3EM,STRICT,true");
    }

    #[test]
    fn missing_flag_column_reads_as_confident() {
        let csv = "geo_unit,region,granularity,year,grade_tag,source,cohort_policy,\
                   composite_mean,composite_stddev,record_count,student_count\n\
                   SP,Southeast,state,2019,9EF,saeb,ALL_DATA,250,10,3,3\n";
        let rows = read_summaries(csv.as_bytes()).unwrap();
        assert!(!rows[0].low_confidence);
        assert_eq!(rows[0].network_share, None);
    }

    #[test]
    fn summary_file_requires_core_columns() {
        let err = read_summaries("geo_unit,year\nSP,2019\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("missing column"));
    }
}
