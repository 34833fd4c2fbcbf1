//! Built-in survey configurations.
//!
//! Each catalog lists the column spellings seen across published vintages,
//! most specific first. Operators can dump any of these as JSON, edit the
//! copy and load it back with [`crate::load_survey_config`].

use std::fmt;
use std::str::FromStr;

use panel_model::{
    CohortConfig, ColumnPattern, CompositeMethod, FieldCandidates, GeoStrategy, NetworkClass,
    NetworkCodeMap, SemanticField, Subject, SurveyConfig, SurveyFamily,
};

use crate::error::{IngestError, Result};

/// Grades published in the school census tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchoolGrade {
    /// 5th year of primary school.
    Fifth,
    /// 9th year of primary school.
    Ninth,
    /// 3rd year of upper secondary school.
    HighSchoolThird,
}

impl SchoolGrade {
    pub fn label(&self) -> &'static str {
        match self {
            SchoolGrade::Fifth => "5EF",
            SchoolGrade::Ninth => "9EF",
            SchoolGrade::HighSchoolThird => "3EM",
        }
    }
}

impl fmt::Display for SchoolGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SchoolGrade {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "5EF" => Ok(SchoolGrade::Fifth),
            "9EF" => Ok(SchoolGrade::Ninth),
            "3EM" | "EM" => Ok(SchoolGrade::HighSchoolThird),
            _ => Err(IngestError::UnknownGrade {
                grade: s.to_string(),
            }),
        }
    }
}

/// Built-in family names accepted by [`builtin_config`].
pub const BUILTIN_FAMILIES: [(&str, &str); 5] = [
    ("saeb", "School census exam, school-level table (grade required)"),
    ("enem", "National exit exam, participant microdata"),
    (
        "pisa-states",
        "International assessment, stratum labels with state names",
    ),
    (
        "pisa-regions",
        "International assessment, structured stratum codes (BRA + region digits)",
    ),
    (
        "pisa-keywords",
        "International assessment, stratum descriptions with region keywords",
    ),
];

/// Looks up a built-in configuration by family name.
///
/// `grade` only applies to the school census and defaults to 9EF there.
pub fn builtin_config(name: &str, grade: Option<SchoolGrade>) -> Result<SurveyConfig> {
    match name.trim().to_lowercase().as_str() {
        "saeb" | "school_census" => Ok(school_census(grade.unwrap_or(SchoolGrade::Ninth))),
        "enem" | "exit_exam" => Ok(exit_exam()),
        "pisa-states" => Ok(international_assessment_states()),
        "pisa-regions" => Ok(international_assessment_regions()),
        "pisa-keywords" => Ok(international_assessment_keywords()),
        _ => Err(IngestError::UnknownFamily {
            name: name.to_string(),
            available: BUILTIN_FAMILIES
                .iter()
                .map(|(family, _)| *family)
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// Public administrative networks: federal, state and municipal.
fn public_private_codes() -> NetworkCodeMap {
    NetworkCodeMap::new()
        .with_code("1", NetworkClass::Public)
        .with_code("2", NetworkClass::Public)
        .with_code("3", NetworkClass::Public)
        .with_code("4", NetworkClass::Private)
}

/// `IN_PUBLICA` is a flag: 1 for public schools, 0 for private ones.
fn public_flag_codes() -> NetworkCodeMap {
    NetworkCodeMap::new()
        .with_code("1", NetworkClass::Public)
        .with_code("0", NetworkClass::Private)
}

/// School census table (one row per school, mean proficiency per grade).
pub fn school_census(grade: SchoolGrade) -> SurveyConfig {
    let g = grade.label();

    let mut language = vec![
        ColumnPattern::exact(format!("MEDIA_{g}_LP")),
        ColumnPattern::all_of(["MEDIA", g, "LP"]),
        ColumnPattern::all_of(["PROFICIENCIA", g, "LP"]),
        ColumnPattern::all_of(["MEDIA", g, "LINGUA"]),
    ];
    let mut math = vec![
        ColumnPattern::exact(format!("MEDIA_{g}_MT")),
        ColumnPattern::all_of(["MEDIA", g, "MT"]),
        ColumnPattern::all_of(["PROFICIENCIA", g, "MT"]),
        ColumnPattern::all_of(["MEDIA", g, "MAT"]),
    ];
    let mut count = vec![
        ColumnPattern::exact(format!("NU_PRESENTES_{g}")),
        ColumnPattern::exact(format!("NU_PRESENTES_{g}_LP")),
        ColumnPattern::exact(format!("QTD_ALUNOS_{g}")),
        ColumnPattern::exact(format!("N_ALUNOS_{g}")),
    ];
    if grade == SchoolGrade::HighSchoolThird {
        // Some vintages label upper secondary as plain "EM".
        language.push(ColumnPattern::all_of(["MEDIA", "_EM_", "LP"]));
        math.push(ColumnPattern::all_of(["MEDIA", "_EM_", "MT"]));
        count.push(ColumnPattern::exact("NU_PRESENTES_EM"));
        count.push(ColumnPattern::exact("NU_PRESENTES_EM_LP"));
    }
    count.push(ColumnPattern::exact("NU_PRESENTES"));

    let candidates = FieldCandidates::new()
        .required(
            SemanticField::GeoUnit,
            vec![
                ColumnPattern::exact("ID_UF"),
                ColumnPattern::exact("CO_UF"),
                ColumnPattern::exact("UF"),
                ColumnPattern::exact("SG_UF"),
            ],
        )
        .optional(
            SemanticField::NetworkType,
            vec![
                ColumnPattern::exact("ID_DEPENDENCIA_ADM"),
                ColumnPattern::exact("IN_PUBLICA"),
                ColumnPattern::exact("ID_REDE"),
                ColumnPattern::exact("TP_DEPENDENCIA"),
                ColumnPattern::contains("DEPENDENCIA"),
            ],
        )
        .optional(SemanticField::SubjectScore(Subject::Language), language)
        .optional(SemanticField::SubjectScore(Subject::Math), math)
        .optional(SemanticField::StudentCount, count);

    SurveyConfig::new(
        format!("saeb_{}", g.to_lowercase()),
        SurveyFamily::SchoolCensus,
        candidates,
        GeoStrategy::NumericCode,
    )
    .with_network_codes(public_private_codes())
    .with_column_network_codes("IN_PUBLICA", public_flag_codes())
    .with_composite(CompositeMethod::SubjectMeans)
    .with_grade_label(g)
}

/// Exit exam participant microdata.
///
/// The completion status column selects graduating seniors (`2`); vintages
/// without it fall back to participants linked to a school.
pub fn exit_exam() -> SurveyConfig {
    let candidates = FieldCandidates::new()
        .required(
            SemanticField::GeoUnit,
            vec![
                ColumnPattern::exact("SG_UF_PROVA"),
                ColumnPattern::exact("UF_PROVA"),
                ColumnPattern::exact("SG_UF_ESC"),
                ColumnPattern::exact("SG_UF_RESIDENCIA"),
                ColumnPattern::exact("CO_UF_PROVA"),
            ],
        )
        .optional(
            SemanticField::CohortStatus,
            vec![ColumnPattern::exact("TP_ST_CONCLUSAO")],
        )
        .optional(SemanticField::SchoolLink, vec![ColumnPattern::exact("CO_ESCOLA")])
        .optional(
            SemanticField::NetworkType,
            vec![
                ColumnPattern::exact("TP_DEPENDENCIA_ADM_ESC"),
                ColumnPattern::exact("ID_DEPENDENCIA_ADM_ESC"),
            ],
        )
        .optional(
            SemanticField::SubjectScore(Subject::NaturalSciences),
            vec![ColumnPattern::exact("NU_NOTA_CN")],
        )
        .optional(
            SemanticField::SubjectScore(Subject::Humanities),
            vec![ColumnPattern::exact("NU_NOTA_CH")],
        )
        .optional(
            SemanticField::SubjectScore(Subject::Language),
            vec![ColumnPattern::exact("NU_NOTA_LC")],
        )
        .optional(
            SemanticField::SubjectScore(Subject::Math),
            vec![ColumnPattern::exact("NU_NOTA_MT")],
        )
        .optional(
            SemanticField::SubjectScore(Subject::Essay),
            vec![ColumnPattern::exact("NU_NOTA_REDACAO")],
        );

    SurveyConfig::new(
        "enem",
        SurveyFamily::ExitExam,
        candidates,
        GeoStrategy::NumericCode,
    )
    .with_network_codes(public_private_codes())
    .with_cohort(CohortConfig::default())
    .with_composite(CompositeMethod::RecordMean)
}

fn international_assessment(
    name: &str,
    geo_patterns: Vec<ColumnPattern>,
    strategy: GeoStrategy,
) -> SurveyConfig {
    let candidates = FieldCandidates::new()
        .required(SemanticField::GeoUnit, geo_patterns)
        .optional(SemanticField::Country, vec![ColumnPattern::exact("CNT")])
        .optional(
            SemanticField::SubjectScore(Subject::Math),
            vec![ColumnPattern::exact("PV1MATH")],
        )
        .optional(
            SemanticField::SubjectScore(Subject::Reading),
            vec![ColumnPattern::exact("PV1READ")],
        )
        .optional(
            SemanticField::SubjectScore(Subject::Science),
            vec![ColumnPattern::exact("PV1SCIE")],
        );

    SurveyConfig::new(
        name,
        SurveyFamily::InternationalAssessment,
        candidates,
        strategy,
    )
    .with_composite(CompositeMethod::SubjectMeans)
    .with_accepted_countries(["BRA", "BRAZIL", "76"])
}

/// Student extract whose stratum labels carry state names.
pub fn international_assessment_states() -> SurveyConfig {
    international_assessment(
        "pisa_states",
        vec![
            ColumnPattern::exact("STRATUM_TEXT"),
            ColumnPattern::exact("STRATUM"),
            ColumnPattern::exact("SUBNATIO"),
            ColumnPattern::exact("REGION"),
        ],
        GeoStrategy::TextName,
    )
}

/// Student extract with structured stratum codes (`BRA` + region + substratum).
pub fn international_assessment_regions() -> SurveyConfig {
    international_assessment(
        "pisa_regions",
        vec![ColumnPattern::exact("STRATUM")],
        GeoStrategy::StratumPrefix {
            offset: 3,
            width: 2,
            prefix: Some("BRA".to_string()),
        },
    )
}

/// Student extract with free-text stratum descriptions naming the region.
pub fn international_assessment_keywords() -> SurveyConfig {
    international_assessment(
        "pisa_keywords",
        vec![
            ColumnPattern::exact("STRATUM"),
            ColumnPattern::contains("STRAT"),
        ],
        GeoStrategy::RegionKeyword,
    )
}
