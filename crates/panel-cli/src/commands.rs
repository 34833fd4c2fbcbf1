use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use comfy_table::Table;
use tracing::{error, info, info_span, warn};

use panel_cli::logging::redact_value;
use panel_cli::output::{
    DiagnosticsReport, FailedFile, infer_year, read_summaries_file,
    write_diagnostics_file, write_panel_file, write_summaries_file,
};
use panel_core::{FileContext, SourceTable, SurveyProcessor, harmonize};
use panel_ingest::{BUILTIN_FAMILIES, builtin_config, load_survey_config};
use panel_model::{Diagnostics, ProcessingOptions, SurveyConfig, state_region_map};

use crate::cli::{FamiliesArgs, ProcessArgs, ReconcileArgs};
use crate::progress::Spinner;
use crate::summary::apply_table_style;
use crate::types::{FileReport, ProcessResult, ReconcileResult};

pub fn run_families(args: &FamiliesArgs) -> Result<()> {
    if let Some(name) = &args.dump {
        let config = builtin_config(name, args.grade)?;
        serde_json::to_writer_pretty(io::stdout().lock(), &config)
            .context("write configuration")?;
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Family", "Geo strategy", "Description"]);
    apply_table_style(&mut table);
    for (name, description) in BUILTIN_FAMILIES {
        let strategy = builtin_config(name, None)
            .map(|config| config.geo_strategy.as_str().to_string())
            .unwrap_or_default();
        table.add_row(vec![name.to_string(), strategy, description.to_string()]);
    }
    println!("{table}");
    Ok(())
}

fn load_config(args: &ProcessArgs) -> Result<SurveyConfig> {
    if let Some(path) = &args.config {
        return load_survey_config(path)
            .with_context(|| format!("load survey configuration {}", path.display()));
    }
    let Some(family) = &args.family else {
        bail!("either --family or --config is required");
    };
    Ok(builtin_config(family, args.grade)?)
}

fn processing_options(args: &ProcessArgs) -> ProcessingOptions {
    let mut options = ProcessingOptions::new()
        .with_batch_size(args.batch_size)
        .with_geo_sample_limit(args.geo_sample)
        .with_network_filter(args.network.into());
    if let Some(encoding) = args.encoding {
        options = options.with_encoding(encoding.into());
    }
    if let Some(delimiter) = args.delimiter {
        options = options.with_delimiter(delimiter);
    }
    options
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn run_process(args: &ProcessArgs) -> Result<ProcessResult> {
    let config = load_config(args)?;
    let options = processing_options(args);
    let processor = SurveyProcessor::new(&config, &options);
    let source = args.source.clone().unwrap_or_else(|| config.name.clone());
    let run_span = info_span!("process", config = %config.name, files = args.files.len());
    let _run_guard = run_span.enter();

    let mut files = Vec::with_capacity(args.files.len());
    let mut summaries = Vec::new();
    for path in &args.files {
        let label = file_label(path);
        let Some(year) = args.year.or_else(|| infer_year(path)) else {
            let message =
                "cannot infer the survey year from the file name; pass --year".to_string();
            error!(file = %label, "{message}");
            files.push(FileReport {
                path: path.clone(),
                diagnostics: Diagnostics::new(label, 0),
                rows: 0,
                error: Some(message),
            });
            continue;
        };

        let file_span = info_span!("file", file = %label, year);
        let _file_guard = file_span.enter();
        let started = Instant::now();
        let mut spinner = Spinner::new(&label);
        let context = FileContext::new(&source, year);
        match processor.process_path_with_progress(path, &context, &mut spinner) {
            Ok(outcome) => {
                let diagnostics = outcome.diagnostics;
                if !diagnostics.unresolved_geo_value_sample.is_empty() {
                    let sample: Vec<&str> = diagnostics
                        .unresolved_geo_value_sample
                        .iter()
                        .map(|value| redact_value(value))
                        .collect();
                    warn!(
                        count = diagnostics.unresolved_geo_value_count,
                        sample = %sample.join(" | "),
                        "unresolved geographic values"
                    );
                }
                info!(
                    rows = outcome.summaries.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "file complete"
                );
                let rows = outcome.summaries.len();
                summaries.extend(outcome.summaries);
                files.push(FileReport {
                    path: path.clone(),
                    diagnostics,
                    rows,
                    error: None,
                });
            }
            Err(err) => {
                error!(error = %err, "file skipped");
                let diagnostics = err.schema_error().map_or_else(
                    || Diagnostics::new(label.clone(), year),
                    |schema| Diagnostics::for_schema_failure(year, schema),
                );
                files.push(FileReport {
                    path: path.clone(),
                    diagnostics,
                    rows: 0,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    if let Some(path) = &args.output {
        write_summaries_file(path, &summaries)?;
        info!(path = %path.display(), rows = summaries.len(), "wrote summaries");
    }
    if let Some(path) = &args.diagnostics {
        let failed = files
            .iter()
            .filter_map(|file| {
                file.error.as_ref().map(|error| FailedFile {
                    path: file.path.clone(),
                    error: error.clone(),
                })
            })
            .collect();
        let report = DiagnosticsReport::new(
            config.name.clone(),
            files.iter().map(|file| file.diagnostics.clone()).collect(),
            failed,
        );
        write_diagnostics_file(path, &report)?;
        info!(path = %path.display(), "wrote diagnostics");
    }

    Ok(ProcessResult {
        config_name: config.name,
        files,
        summaries,
        output: args.output.clone(),
        diagnostics: args.diagnostics.clone(),
    })
}

/// Splits `NAME=PATH`; a bare path is named after its file stem.
fn parse_input(raw: &str) -> (String, PathBuf) {
    if let Some((name, path)) = raw.split_once('=')
        && !name.is_empty()
        && !name.contains(['/', '\\', '.'])
    {
        return (name.to_string(), PathBuf::from(path));
    }
    let path = PathBuf::from(raw);
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| raw.to_string());
    (name, path)
}

pub fn run_reconcile(args: &ReconcileArgs) -> Result<ReconcileResult> {
    let mut tables = Vec::with_capacity(args.inputs.len());
    for raw in &args.inputs {
        let (name, path) = parse_input(raw);
        let rows = read_summaries_file(&path)?;
        info!(source = %name, path = %path.display(), rows = rows.len(), "loaded summaries");
        let mut table = SourceTable::new(name, rows);
        if let Some((_, wave)) = args.waves.iter().find(|(source, _)| *source == table.name) {
            table = table.with_wave(*wave);
        }
        tables.push(table);
    }
    for (source, _) in &args.waves {
        if !tables.iter().any(|table| &table.name == source) {
            warn!(source = %source, "wave given for an unknown source");
        }
    }

    let sources: Vec<String> = tables.iter().map(|table| table.name.clone()).collect();
    let harmonized = harmonize(tables, args.join.into(), &state_region_map())
        .context("join summary tables")?;
    if let Some(path) = &args.output {
        write_panel_file(path, &harmonized.rows)?;
        info!(path = %path.display(), rows = harmonized.rows.len(), "wrote panel");
    }

    Ok(ReconcileResult {
        sources,
        rows: harmonized.rows,
        raised: harmonized.raised,
        unmapped: harmonized.unmapped,
        output: args.output.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_accept_names() {
        assert_eq!(
            parse_input("enem=out/enem_summary.csv"),
            ("enem".to_string(), PathBuf::from("out/enem_summary.csv"))
        );
        assert_eq!(
            parse_input("out/saeb_2019.csv"),
            ("saeb_2019".to_string(), PathBuf::from("out/saeb_2019.csv"))
        );
        assert_eq!(
            parse_input("out/a=b.csv"),
            ("a=b".to_string(), PathBuf::from("out/a=b.csv"))
        );
    }
}
