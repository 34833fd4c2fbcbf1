use std::path::PathBuf;

use panel_model::{Diagnostics, GeoUnitSummary, HarmonizedPanelRow};

/// One input file of a `panel process` run.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub diagnostics: Diagnostics,
    pub rows: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub config_name: String,
    pub files: Vec<FileReport>,
    pub summaries: Vec<GeoUnitSummary>,
    pub output: Option<PathBuf>,
    pub diagnostics: Option<PathBuf>,
}

impl ProcessResult {
    pub fn has_errors(&self) -> bool {
        self.files.iter().any(|file| file.error.is_some())
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileResult {
    pub sources: Vec<String>,
    pub rows: Vec<HarmonizedPanelRow>,
    pub raised: Vec<String>,
    pub unmapped: Vec<String>,
    pub output: Option<PathBuf>,
}
