//! Geographic resolution of raw values to canonical units.

use panel_model::{GeoStrategy, Granularity, Region, State};

use crate::score::parse_decimal;

/// Result of resolving one raw geographic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoResolution {
    Resolved {
        /// State abbreviation or region name, depending on granularity.
        key: &'static str,
        region: Region,
        granularity: Granularity,
    },
    Unresolved,
}

impl GeoResolution {
    fn state(state: State) -> Self {
        GeoResolution::Resolved {
            key: state.code(),
            region: state.region(),
            granularity: Granularity::State,
        }
    }

    fn region(region: Region) -> Self {
        GeoResolution::Resolved {
            key: region.name(),
            region,
            granularity: Granularity::Region,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, GeoResolution::Resolved { .. })
    }
}

/// Region keywords, multi-word first so `CENTRO-OESTE` is never read as
/// `OESTE`, and `NORDESTE`/`SUDESTE` are tested before `NORTE`/`SUL`.
/// A bare `CENTRO` is not a region.
const REGION_KEYWORDS: [(&str, Region); 6] = [
    ("CENTRO-OESTE", Region::CenterWest),
    ("CENTRO OESTE", Region::CenterWest),
    ("NORDESTE", Region::Northeast),
    ("SUDESTE", Region::Southeast),
    ("NORTE", Region::North),
    ("SUL", Region::South),
];

/// Resolves raw values under one strategy. Build once per file.
#[derive(Debug, Clone)]
pub struct GeoResolver {
    strategy: GeoStrategy,
    names: Vec<(&'static str, State)>,
}

impl GeoResolver {
    pub fn new(strategy: GeoStrategy) -> Self {
        let names = match strategy {
            GeoStrategy::TextName => state_names_longest_first(),
            _ => Vec::new(),
        };
        Self { strategy, names }
    }

    pub fn resolve(&self, raw: &str) -> GeoResolution {
        let raw = raw.trim();
        if raw.is_empty() {
            return GeoResolution::Unresolved;
        }
        match &self.strategy {
            GeoStrategy::NumericCode => resolve_numeric(raw),
            GeoStrategy::TextName => self.resolve_text(raw),
            GeoStrategy::StratumPrefix {
                offset,
                width,
                prefix,
            } => resolve_stratum(raw, *offset, *width, prefix.as_deref()),
            GeoStrategy::RegionKeyword => resolve_keyword(raw),
        }
    }

    fn resolve_text(&self, raw: &str) -> GeoResolution {
        let upper = raw.to_uppercase();
        self.names
            .iter()
            .find(|(name, _)| upper.contains(name))
            .map_or(GeoResolution::Unresolved, |(_, state)| {
                GeoResolution::state(*state)
            })
    }
}

/// Every spelling of every state, longest first, ties alphabetical.
fn state_names_longest_first() -> Vec<(&'static str, State)> {
    let mut names: Vec<(&'static str, State)> = State::ALL
        .into_iter()
        .flat_map(|state| state.names().iter().map(move |name| (*name, state)))
        .collect();
    names.sort_by(|a, b| {
        b.0.chars()
            .count()
            .cmp(&a.0.chars().count())
            .then_with(|| a.0.cmp(b.0))
    });
    names
}

/// Two-digit statistics code, possibly padded (`035`), decimal (`35.0`),
/// or leading a longer municipal code. Abbreviations pass through.
fn resolve_numeric(raw: &str) -> GeoResolution {
    if let Some(state) = State::from_code(raw) {
        return GeoResolution::state(state);
    }
    let Some(value) = parse_decimal(raw) else {
        return GeoResolution::Unresolved;
    };
    if !value.is_finite() || value.fract() != 0.0 || value < 0.0 {
        return GeoResolution::Unresolved;
    }
    let digits = format!("{}", value as u64);
    let code = if digits.len() <= 2 {
        digits.parse::<u8>().ok()
    } else {
        digits[..2].parse::<u8>().ok()
    };
    code.and_then(State::from_ibge)
        .map_or(GeoResolution::Unresolved, GeoResolution::state)
}

fn resolve_stratum(raw: &str, offset: usize, width: usize, prefix: Option<&str>) -> GeoResolution {
    let upper = raw.to_uppercase();
    if let Some(prefix) = prefix
        && !upper.starts_with(&prefix.to_uppercase())
    {
        return GeoResolution::Unresolved;
    }
    let segment: String = upper.chars().skip(offset).take(width).collect();
    if width == 0 || segment.chars().count() != width || !segment.chars().all(|c| c.is_ascii_digit())
    {
        return GeoResolution::Unresolved;
    }
    // Wider segments such as `002` still name a two-digit region code.
    let Ok(code) = segment.parse::<u32>() else {
        return GeoResolution::Unresolved;
    };
    Region::from_stratum_code(&format!("{code:02}"))
        .map_or(GeoResolution::Unresolved, GeoResolution::region)
}

fn resolve_keyword(raw: &str) -> GeoResolution {
    let upper = raw.to_uppercase();
    REGION_KEYWORDS
        .iter()
        .find(|(keyword, _)| upper.contains(keyword))
        .map_or(GeoResolution::Unresolved, |(_, region)| {
            GeoResolution::region(*region)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(resolution: GeoResolution) -> Option<&'static str> {
        match resolution {
            GeoResolution::Resolved { key, .. } => Some(key),
            GeoResolution::Unresolved => None,
        }
    }

    #[test]
    fn numeric_codes_in_many_shapes() {
        let resolver = GeoResolver::new(GeoStrategy::NumericCode);
        assert_eq!(key(resolver.resolve("35")), Some("SP"));
        assert_eq!(key(resolver.resolve("35.0")), Some("SP"));
        assert_eq!(key(resolver.resolve("035")), Some("SP"));
        assert_eq!(key(resolver.resolve("3550308")), Some("SP"));
        assert_eq!(key(resolver.resolve("rj")), Some("RJ"));
        assert_eq!(key(resolver.resolve("99")), None);
        assert_eq!(key(resolver.resolve("")), None);
        assert_eq!(key(resolver.resolve("XX")), None);
    }

    #[test]
    fn numeric_code_yields_state_granularity() {
        let resolver = GeoResolver::new(GeoStrategy::NumericCode);
        assert_eq!(
            resolver.resolve("53"),
            GeoResolution::Resolved {
                key: "DF",
                region: Region::CenterWest,
                granularity: Granularity::State,
            }
        );
    }

    #[test]
    fn text_names_prefer_longest_match() {
        let resolver = GeoResolver::new(GeoStrategy::TextName);
        assert_eq!(key(resolver.resolve("SÃO PAULO - CAPITAL")), Some("SP"));
        assert_eq!(key(resolver.resolve("Sao Paulo")), Some("SP"));
        assert_eq!(key(resolver.resolve("BRA - Mato Grosso do Sul")), Some("MS"));
        assert_eq!(key(resolver.resolve("MATO GROSSO: interior")), Some("MT"));
        assert_eq!(key(resolver.resolve("Rio Grande do Norte")), Some("RN"));
        assert_eq!(key(resolver.resolve("PARAÍBA")), Some("PB"));
        assert_eq!(key(resolver.resolve("Paraná")), Some("PR"));
        assert_eq!(key(resolver.resolve("Pará")), Some("PA"));
        assert_eq!(key(resolver.resolve("Lisboa")), None);
    }

    #[test]
    fn stratum_prefix_decodes_region_digits() {
        let resolver = GeoResolver::new(GeoStrategy::StratumPrefix {
            offset: 3,
            width: 2,
            prefix: Some("BRA".to_string()),
        });
        assert_eq!(
            resolver.resolve("BRA0213"),
            GeoResolution::Resolved {
                key: "Northeast",
                region: Region::Northeast,
                granularity: Granularity::Region,
            }
        );
        assert_eq!(key(resolver.resolve("bra0501")), Some("Center-West"));
        assert_eq!(key(resolver.resolve("BRA0713")), None);
        assert_eq!(key(resolver.resolve("ARG0213")), None);
        assert_eq!(key(resolver.resolve("BRA0")), None);
        assert_eq!(key(resolver.resolve("BRAX213")), None);
    }

    #[test]
    fn keywords_check_compound_names_first() {
        let resolver = GeoResolver::new(GeoStrategy::RegionKeyword);
        assert_eq!(key(resolver.resolve("Região Centro-Oeste")), Some("Center-West"));
        assert_eq!(key(resolver.resolve("BRA: Nordeste - rural")), Some("Northeast"));
        assert_eq!(key(resolver.resolve("Sudeste")), Some("Southeast"));
        assert_eq!(key(resolver.resolve("Norte")), Some("North"));
        assert_eq!(key(resolver.resolve("Sul")), Some("South"));
        assert_eq!(key(resolver.resolve("unknown")), None);
    }

    #[test]
    fn bare_centro_is_not_a_region() {
        let resolver = GeoResolver::new(GeoStrategy::RegionKeyword);
        assert_eq!(key(resolver.resolve("CENTRO URBANO")), None);
        assert_eq!(key(resolver.resolve("Centro Oeste")), Some("Center-West"));
    }

    #[test]
    fn wide_stratum_segments_are_padded_codes() {
        let resolver = GeoResolver::new(GeoStrategy::StratumPrefix {
            offset: 3,
            width: 3,
            prefix: None,
        });
        assert_eq!(key(resolver.resolve("BRA00213")), Some("Northeast"));
        assert_eq!(key(resolver.resolve("BRA01013")), None);
    }

    #[test]
    fn every_state_resolves_and_has_a_region() {
        let by_code = GeoResolver::new(GeoStrategy::NumericCode);
        let by_name = GeoResolver::new(GeoStrategy::TextName);
        let map = panel_model::state_region_map();
        for state in State::ALL {
            let resolved = by_code.resolve(&state.ibge_code().to_string());
            let GeoResolution::Resolved { key, region, .. } = resolved else {
                panic!("{state} did not resolve");
            };
            assert_eq!(map.get(key).map(String::as_str), Some(region.name()));
            for name in state.names() {
                assert_eq!(by_name.resolve(name), resolved, "{name}");
            }
        }
    }
}
