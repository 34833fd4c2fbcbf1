//! Education survey panel CLI.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use panel_cli::logging::{LogConfig, init_logging};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod progress;
mod summary;
mod types;

use crate::cli::{Cli, Command};
use crate::commands::{run_families, run_process, run_reconcile};
use crate::summary::{print_panel_summary, print_process_summary};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    if let Err(error) = init_logging(&log_config_from_cli(&cli)) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli.command) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

/// Runs one subcommand; a `process` run with failed files exits with 1.
fn run(command: &Command) -> anyhow::Result<i32> {
    match command {
        Command::Process(args) => {
            let result = run_process(args)?;
            print_process_summary(&result);
            Ok(i32::from(result.has_errors()))
        }
        Command::Reconcile(args) => {
            print_panel_summary(&run_reconcile(args)?);
            Ok(0)
        }
        Command::Families(args) => {
            run_families(args)?;
            Ok(0)
        }
    }
}

/// Explicit `--log-level` beats `-v/-q`, which beat `RUST_LOG`.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let level = cli
        .log_level
        .map_or_else(|| cli.verbosity.tracing_level_filter(), LevelFilter::from);
    let mut config = LogConfig::default()
        .with_level(level)
        .with_format(cli.log_format.into())
        .with_log_file(cli.log_file.clone())
        .with_log_data(cli.log_data);
    config.use_env_filter = !cli.verbosity.is_present() && cli.log_level.is_none();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
