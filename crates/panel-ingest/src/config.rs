//! Loading survey configurations from JSON files.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use panel_model::{SemanticField, SurveyConfig};
use tracing::{debug, warn};

use crate::error::{IngestError, Result};

/// Reads a [`SurveyConfig`] from a JSON file.
pub fn load_survey_config(path: &Path) -> Result<SurveyConfig> {
    let file = File::open(path).map_err(|e| IngestError::open(path, e))?;
    let config: SurveyConfig =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| IngestError::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    validate(&config, path)?;
    debug!(
        path = %path.display(),
        name = %config.name,
        fields = config.candidates.len(),
        strategy = config.geo_strategy.as_str(),
        "Loaded survey configuration"
    );
    Ok(config)
}

fn validate(config: &SurveyConfig, path: &Path) -> Result<()> {
    let invalid = |message: &str| IngestError::InvalidConfig {
        path: path.to_path_buf(),
        message: message.to_string(),
    };
    if config.candidates.get(SemanticField::GeoUnit).is_none() {
        return Err(invalid("no candidates for geo_unit"));
    }
    if config.candidates.subjects().is_empty() {
        return Err(invalid("no subject score candidates"));
    }
    if config.candidates.iter().any(|spec| spec.patterns.is_empty()) {
        return Err(invalid("a field has an empty pattern list"));
    }
    if config.candidates.get(SemanticField::NetworkType).is_some() && config.network_codes.is_empty()
    {
        warn!(
            path = %path.display(),
            "network_type has candidates but network_codes is empty; network share will be absent"
        );
    }
    Ok(())
}
