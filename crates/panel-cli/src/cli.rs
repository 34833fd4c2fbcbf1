//! CLI argument definitions for the `panel` tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use tracing::level_filters::LevelFilter;

use panel_cli::logging::LogFormat;
use panel_core::JoinMode;
use panel_ingest::SchoolGrade;
use panel_model::{DEFAULT_BATCH_SIZE, DEFAULT_GEO_SAMPLE_LIMIT, NetworkFilter, TextEncoding};

#[derive(Parser)]
#[command(
    name = "panel",
    version,
    about = "Harmonize education survey microdata into comparable geographic panels",
    long_about = "Harmonize education survey microdata into comparable geographic panels.\n\n\
                  Reads school census, exit exam and international assessment files,\n\
                  resolves drifting column names, filters the target cohort and\n\
                  aggregates scores per state or region."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machines).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow raw cell values (such as unresolved geographic labels) in logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Aggregate survey files into per-geography summaries.
    Process(ProcessArgs),

    /// Join summary files from several sources into one panel.
    Reconcile(ReconcileArgs),

    /// List built-in survey families or dump one as JSON.
    Families(FamiliesArgs),
}

#[derive(Parser)]
pub struct ProcessArgs {
    /// Survey files to process. A file that fails is reported and skipped.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Built-in survey family (see `panel families`).
    #[arg(long, required_unless_present = "config", conflicts_with = "config")]
    pub family: Option<String>,

    /// Grade for the school census family (5EF, 9EF or 3EM).
    #[arg(long)]
    pub grade: Option<SchoolGrade>,

    /// Survey configuration JSON, e.g. an edited `panel families --dump` output.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Survey year. Inferred from a four-digit run in each file name when absent.
    #[arg(long)]
    pub year: Option<i32>,

    /// Source label written to each row (default: the configuration name).
    #[arg(long)]
    pub source: Option<String>,

    /// Administrative network filter.
    #[arg(long, value_enum, default_value = "all")]
    pub network: NetworkArg,

    /// Records per batch. Results do not depend on it.
    #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Distinct unresolved geographic values kept in the diagnostics.
    #[arg(long = "geo-sample", default_value_t = DEFAULT_GEO_SAMPLE_LIMIT)]
    pub geo_sample: usize,

    /// Force the text encoding instead of sniffing it. Sniffing only looks at
    /// the first 256 KiB; pass `latin-1` for windows-1252 files whose accented
    /// place names appear later.
    #[arg(long, value_enum)]
    pub encoding: Option<EncodingArg>,

    /// Force the delimiter instead of sniffing it (e.g. ";", ",", "tab").
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,

    /// Write the summary rows to this CSV file.
    #[arg(long, value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// Write the diagnostics report to this JSON file.
    #[arg(long, value_name = "JSON")]
    pub diagnostics: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ReconcileArgs {
    /// Summary CSV files from `panel process`, as PATH or NAME=PATH.
    /// The source name defaults to the file stem.
    #[arg(value_name = "CSV", required = true)]
    pub inputs: Vec<String>,

    /// Keep keys present in every source (inner) or in any source (outer).
    #[arg(long, value_enum, default_value = "inner")]
    pub join: JoinArg,

    /// Align a source to a wave year, e.g. `saeb=2018`.
    #[arg(long = "wave", value_name = "NAME=YEAR", value_parser = parse_wave)]
    pub waves: Vec<(String, i32)>,

    /// Write the panel to this CSV file.
    #[arg(long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct FamiliesArgs {
    /// Print this family's configuration as JSON.
    #[arg(long, value_name = "NAME")]
    pub dump: Option<String>,

    /// Grade used when dumping the school census family.
    #[arg(long)]
    pub grade: Option<SchoolGrade>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        }
    }
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum NetworkArg {
    All,
    Public,
    Private,
}

impl From<NetworkArg> for NetworkFilter {
    fn from(arg: NetworkArg) -> Self {
        match arg {
            NetworkArg::All => NetworkFilter::All,
            NetworkArg::Public => NetworkFilter::Public,
            NetworkArg::Private => NetworkFilter::Private,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum EncodingArg {
    #[value(name = "utf-8", alias = "utf8")]
    Utf8,
    #[value(name = "latin-1", alias = "latin1", alias = "windows-1252")]
    Latin1,
}

impl From<EncodingArg> for TextEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Utf8 => TextEncoding::Utf8,
            EncodingArg::Latin1 => TextEncoding::Latin1,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum JoinArg {
    Inner,
    Outer,
}

impl From<JoinArg> for JoinMode {
    fn from(arg: JoinArg) -> Self {
        match arg {
            JoinArg::Inner => JoinMode::Inner,
            JoinArg::Outer => JoinMode::Outer,
        }
    }
}

fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ => match raw.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(format!("delimiter must be a single ASCII character, got '{raw}'")),
        },
    }
}

fn parse_wave(raw: &str) -> Result<(String, i32), String> {
    let (name, year) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=YEAR, got '{raw}'"))?;
    let year = year
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("invalid wave year in '{raw}'"))?;
    Ok((name.trim().to_string(), year))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arguments_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn delimiter_accepts_tab_names() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert!(parse_delimiter(";;").is_err());
    }

    #[test]
    fn wave_needs_name_and_year() {
        assert_eq!(parse_wave("saeb=2018"), Ok(("saeb".to_string(), 2018)));
        assert!(parse_wave("saeb").is_err());
        assert!(parse_wave("saeb=next").is_err());
    }

    #[test]
    fn process_requires_family_or_config() {
        assert!(Cli::try_parse_from(["panel", "process", "a.csv"]).is_err());
        let cli = Cli::try_parse_from([
            "panel", "process", "a.csv", "--family", "saeb", "--grade", "3EM", "--network",
            "public",
        ])
        .unwrap();
        let Command::Process(args) = cli.command else {
            panic!("expected process");
        };
        assert_eq!(args.grade, Some(SchoolGrade::HighSchoolThird));
        assert_eq!(NetworkFilter::from(args.network), NetworkFilter::Public);
    }
}
