//! Survey configuration: everything that varies per survey family.
//!
//! A [`SurveyConfig`] bundles the column catalog, the geographic strategy,
//! the administrative network code table and the cohort settings. Built-in
//! configurations live in `panel-ingest`; operators can dump them as JSON,
//! edit them and load them back.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::candidates::{FieldCandidates, normalize_column_name};
use crate::field::SemanticField;
use crate::schema::ResolvedSchema;

/// Survey family a configuration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyFamily {
    /// School-level census exam tables (one row per school).
    SchoolCensus,
    /// National exit-exam participant microdata.
    ExitExam,
    /// International assessment student extracts.
    InternationalAssessment,
}

impl SurveyFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurveyFamily::SchoolCensus => "school_census",
            SurveyFamily::ExitExam => "exit_exam",
            SurveyFamily::InternationalAssessment => "international_assessment",
        }
    }
}

impl fmt::Display for SurveyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How raw geographic values are mapped to canonical units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeoStrategy {
    /// Two-digit state statistics code (or a canonical abbreviation).
    NumericCode,
    /// Free-text state name, accented or not.
    TextName,
    /// Fixed-width region segment inside a structured stratum code.
    StratumPrefix {
        offset: usize,
        width: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },
    /// Region keyword inside a stratum description.
    RegionKeyword,
}

impl GeoStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoStrategy::NumericCode => "numeric_code",
            GeoStrategy::TextName => "text_name",
            GeoStrategy::StratumPrefix { .. } => "stratum_prefix",
            GeoStrategy::RegionKeyword => "region_keyword",
        }
    }
}

/// Administrative network class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkClass {
    Public,
    Private,
}

/// Raw administrative codes mapped to a network class.
///
/// Keys are compared after numeric normalization, so `"4"`, `"4.0"` and
/// `" 04 "` all hit the entry for `"4"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkCodeMap {
    codes: BTreeMap<String, NetworkClass>,
}

impl NetworkCodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_code(mut self, code: impl AsRef<str>, class: NetworkClass) -> Self {
        self.codes.insert(normalize_code(code.as_ref()), class);
        self
    }

    pub fn get(&self, raw: &str) -> Option<NetworkClass> {
        let key = normalize_code(raw);
        if key.is_empty() {
            return None;
        }
        self.codes.get(&key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NetworkClass)> {
        self.codes.iter().map(|(code, class)| (code.as_str(), *class))
    }
}

/// Integral codes lose leading zeros and trailing `.0`; anything else is
/// compared as trimmed uppercase text.
fn normalize_code(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", value as i64)
        }
        _ => trimmed.to_uppercase(),
    }
}

/// Network subset to keep while processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkFilter {
    #[default]
    All,
    Public,
    Private,
}

impl NetworkFilter {
    /// Records whose network cannot be determined only pass `All`.
    pub fn admits(&self, class: Option<NetworkClass>) -> bool {
        match self {
            NetworkFilter::All => true,
            NetworkFilter::Public => class == Some(NetworkClass::Public),
            NetworkFilter::Private => class == Some(NetworkClass::Private),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkFilter::All => "all",
            NetworkFilter::Public => "public",
            NetworkFilter::Private => "private",
        }
    }
}

impl FromStr for NetworkFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(NetworkFilter::All),
            "public" => Ok(NetworkFilter::Public),
            "private" => Ok(NetworkFilter::Private),
            other => Err(format!("unknown network filter: {other}")),
        }
    }
}

/// Cohort filter policy chosen from the resolved schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CohortPolicy {
    /// Completion status column present; only graduating records pass.
    Strict,
    /// No status column; a linking identifier stands in for enrollment.
    Proxy,
    /// Neither column present; every record passes.
    AllData,
}

impl CohortPolicy {
    /// STRICT when the status column resolved, else PROXY when the linking
    /// identifier resolved, else ALL_DATA.
    pub fn select(schema: &ResolvedSchema) -> Self {
        if schema.has(SemanticField::CohortStatus) {
            CohortPolicy::Strict
        } else if schema.has(SemanticField::SchoolLink) {
            CohortPolicy::Proxy
        } else {
            CohortPolicy::AllData
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CohortPolicy::Strict => "STRICT",
            CohortPolicy::Proxy => "PROXY",
            CohortPolicy::AllData => "ALL_DATA",
        }
    }

    /// Rows produced under a degraded policy are flagged in outputs.
    pub fn is_low_confidence(&self) -> bool {
        !matches!(self, CohortPolicy::Strict)
    }
}

impl fmt::Display for CohortPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CohortPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "STRICT" => Ok(CohortPolicy::Strict),
            "PROXY" => Ok(CohortPolicy::Proxy),
            "ALL_DATA" => Ok(CohortPolicy::AllData),
            other => Err(format!("unknown cohort policy: {other}")),
        }
    }
}

/// Cohort sentinel and the grade tags attached per policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortConfig {
    /// Status value meaning "graduating this year".
    pub sentinel: String,
    pub strict_tag: String,
    pub proxy_tag: String,
    pub all_data_tag: String,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            sentinel: "2".to_string(),
            strict_tag: "STRICT_3EM".to_string(),
            proxy_tag: "PROXY_3EM".to_string(),
            all_data_tag: "ALL_DATA".to_string(),
        }
    }
}

impl CohortConfig {
    pub fn tag_for(&self, policy: CohortPolicy) -> &str {
        match policy {
            CohortPolicy::Strict => &self.strict_tag,
            CohortPolicy::Proxy => &self.proxy_tag,
            CohortPolicy::AllData => &self.all_data_tag,
        }
    }
}

/// How the composite mean of a group is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMethod {
    /// Mean of the per-record composites.
    #[default]
    RecordMean,
    /// Mean of the per-subject means.
    SubjectMeans,
}

/// Complete configuration for one survey family or vintage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyConfig {
    pub name: String,
    pub family: SurveyFamily,
    pub candidates: FieldCandidates,
    pub geo_strategy: GeoStrategy,
    #[serde(default)]
    pub network_codes: NetworkCodeMap,
    /// Code tables for specific network columns, keyed by normalized column
    /// name. Columns not listed here use `network_codes`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub network_column_codes: BTreeMap<String, NetworkCodeMap>,
    #[serde(default)]
    pub cohort: CohortConfig,
    #[serde(default)]
    pub composite: CompositeMethod,
    /// Fixed grade tag (e.g. `9EF`); overrides the policy tags when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_label: Option<String>,
    /// Participant countries to keep when a country column resolves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accepted_countries: Vec<String>,
}

impl SurveyConfig {
    pub fn new(
        name: impl Into<String>,
        family: SurveyFamily,
        candidates: FieldCandidates,
        geo_strategy: GeoStrategy,
    ) -> Self {
        Self {
            name: name.into(),
            family,
            candidates,
            geo_strategy,
            network_codes: NetworkCodeMap::default(),
            network_column_codes: BTreeMap::new(),
            cohort: CohortConfig::default(),
            composite: CompositeMethod::default(),
            grade_label: None,
            accepted_countries: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_network_codes(mut self, codes: NetworkCodeMap) -> Self {
        self.network_codes = codes;
        self
    }

    /// Gives `column` its own code table, e.g. a 0/1 public flag.
    #[must_use]
    pub fn with_column_network_codes(
        mut self,
        column: impl AsRef<str>,
        codes: NetworkCodeMap,
    ) -> Self {
        self.network_column_codes
            .insert(normalize_column_name(column.as_ref()), codes);
        self
    }

    /// Code table for the resolved network column `column`.
    pub fn network_codes_for(&self, column: &str) -> &NetworkCodeMap {
        self.network_column_codes
            .get(&normalize_column_name(column))
            .unwrap_or(&self.network_codes)
    }

    #[must_use]
    pub fn with_cohort(mut self, cohort: CohortConfig) -> Self {
        self.cohort = cohort;
        self
    }

    #[must_use]
    pub fn with_composite(mut self, composite: CompositeMethod) -> Self {
        self.composite = composite;
        self
    }

    #[must_use]
    pub fn with_grade_label(mut self, label: impl Into<String>) -> Self {
        self.grade_label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_accepted_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_countries = countries.into_iter().map(Into::into).collect();
        self
    }

    /// Grade tag for summaries produced under `policy`.
    pub fn grade_tag(&self, policy: CohortPolicy) -> String {
        self.grade_label
            .clone()
            .unwrap_or_else(|| self.cohort.tag_for(policy).to_string())
    }
}
