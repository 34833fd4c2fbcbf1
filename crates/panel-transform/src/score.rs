//! Score normalization.
//!
//! Published files mix locale conventions (`"612,4"`, `"1.234,5"`) and use
//! an exact zero to mark absent or disqualified tests. Both are normalized
//! here before anything is aggregated.

use panel_model::ScoreTally;

/// Why a raw score carries no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissingReason {
    Empty,
    /// Exactly zero: absent or eliminated, not a real score.
    ZeroSentinel,
    /// Not a finite number.
    Unparseable,
}

/// A normalized score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreValue {
    Present(f64),
    Missing(MissingReason),
}

impl ScoreValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            ScoreValue::Present(value) => Some(*value),
            ScoreValue::Missing(_) => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, ScoreValue::Present(_))
    }
}

/// Parses a decimal with either `.` or `,` as separator.
///
/// When both appear, the last one is the decimal separator and the other is
/// a grouping mark. Returns `None` for empty or non-numeric input.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cleaned: String = match (trimmed.rfind(','), trimmed.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => trimmed.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => trimmed.replace(',', ""),
        (Some(_), None) => trimmed.replace(',', "."),
        _ => trimmed.to_string(),
    };

    cleaned.parse::<f64>().ok()
}

/// Normalizes one raw cell.
pub fn normalize(raw: &str) -> ScoreValue {
    if raw.trim().is_empty() {
        return ScoreValue::Missing(MissingReason::Empty);
    }
    match parse_decimal(raw) {
        Some(value) if !value.is_finite() => ScoreValue::Missing(MissingReason::Unparseable),
        Some(value) if value == 0.0 => ScoreValue::Missing(MissingReason::ZeroSentinel),
        Some(value) => ScoreValue::Present(value),
        None => ScoreValue::Missing(MissingReason::Unparseable),
    }
}

/// Normalizes scores and keeps a running tally of outcomes.
#[derive(Debug, Clone, Default)]
pub struct ScoreNormalizer {
    tally: ScoreTally,
}

impl ScoreNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, raw: &str) -> ScoreValue {
        let value = normalize(raw);
        match value {
            ScoreValue::Present(_) => self.tally.present += 1,
            ScoreValue::Missing(MissingReason::Empty) => self.tally.empty += 1,
            ScoreValue::Missing(MissingReason::ZeroSentinel) => self.tally.zero_sentinel += 1,
            ScoreValue::Missing(MissingReason::Unparseable) => self.tally.unparseable += 1,
        }
        value
    }

    pub fn tally(&self) -> &ScoreTally {
        &self.tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_decimals() {
        assert_eq!(parse_decimal("612,4"), Some(612.4));
        assert_eq!(parse_decimal("612.4"), Some(612.4));
        assert_eq!(parse_decimal("1.234,5"), Some(1234.5));
        assert_eq!(parse_decimal("1,234.5"), Some(1234.5));
        assert_eq!(parse_decimal("  250  "), Some(250.0));
    }

    #[test]
    fn test_zero_is_a_sentinel() {
        assert_eq!(normalize("0"), ScoreValue::Missing(MissingReason::ZeroSentinel));
        assert_eq!(normalize("0,0"), ScoreValue::Missing(MissingReason::ZeroSentinel));
        assert_eq!(normalize("-0.0"), ScoreValue::Missing(MissingReason::ZeroSentinel));
        assert_eq!(normalize("0.1"), ScoreValue::Present(0.1));
    }

    #[test]
    fn test_missing_reasons() {
        assert_eq!(normalize(""), ScoreValue::Missing(MissingReason::Empty));
        assert_eq!(normalize("   "), ScoreValue::Missing(MissingReason::Empty));
        assert_eq!(normalize("abc"), ScoreValue::Missing(MissingReason::Unparseable));
        assert_eq!(normalize("NaN"), ScoreValue::Missing(MissingReason::Unparseable));
        assert_eq!(normalize("inf"), ScoreValue::Missing(MissingReason::Unparseable));
        assert_eq!(normalize("1,2,3"), ScoreValue::Missing(MissingReason::Unparseable));
    }

    #[test]
    fn test_tally_counts_each_outcome() {
        let mut normalizer = ScoreNormalizer::new();
        for raw in ["500", "", "0", "x", "480,5"] {
            normalizer.normalize(raw);
        }
        let tally = normalizer.tally();
        assert_eq!(tally.present, 2);
        assert_eq!(tally.empty, 1);
        assert_eq!(tally.zero_sentinel, 1);
        assert_eq!(tally.unparseable, 1);
    }
}
