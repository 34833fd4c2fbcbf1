//! Canonical geographic units and macro-regions.
//!
//! The lookup tables here are constant data. Every state belongs to exactly
//! one region, so a state key can always be raised to region granularity.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Geographic level of a summary row or panel key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    State,
    Region,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::State => "state",
            Granularity::Region => "region",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "state" | "uf" => Ok(Granularity::State),
            "region" => Ok(Granularity::Region),
            other => Err(format!("unknown granularity: {other}")),
        }
    }
}

/// Macro-region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    North,
    Northeast,
    Southeast,
    South,
    CenterWest,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::North,
        Region::Northeast,
        Region::Southeast,
        Region::South,
        Region::CenterWest,
    ];

    /// Key used in summary tables.
    pub fn name(&self) -> &'static str {
        match self {
            Region::North => "North",
            Region::Northeast => "Northeast",
            Region::Southeast => "Southeast",
            Region::South => "South",
            Region::CenterWest => "Center-West",
        }
    }

    /// Two-digit region segment used in stratum codes such as `BRA0213`.
    pub fn stratum_code(&self) -> &'static str {
        match self {
            Region::North => "01",
            Region::Northeast => "02",
            Region::Southeast => "03",
            Region::South => "04",
            Region::CenterWest => "05",
        }
    }

    pub fn from_stratum_code(code: &str) -> Option<Region> {
        Region::ALL
            .into_iter()
            .find(|region| region.stratum_code() == code)
    }

    /// Uppercase keyword for this region in stratum descriptions.
    pub fn keyword(&self) -> &'static str {
        match self {
            Region::North => "NORTE",
            Region::Northeast => "NORDESTE",
            Region::Southeast => "SUDESTE",
            Region::South => "SUL",
            Region::CenterWest => "CENTRO-OESTE",
        }
    }

    pub fn states(&self) -> impl Iterator<Item = State> + '_ {
        State::ALL
            .into_iter()
            .filter(move |state| state.region() == *self)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace([' ', '_'], "-");
        Region::ALL
            .into_iter()
            .find(|region| {
                region.name().to_uppercase() == normalized || region.keyword() == normalized
            })
            .ok_or_else(|| format!("unknown region: {s}"))
    }
}

/// Federative unit (26 states plus the Federal District).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum State {
    RO,
    AC,
    AM,
    RR,
    PA,
    AP,
    TO,
    MA,
    PI,
    CE,
    RN,
    PB,
    PE,
    AL,
    SE,
    BA,
    MG,
    ES,
    RJ,
    SP,
    PR,
    SC,
    RS,
    MS,
    MT,
    GO,
    DF,
}

impl State {
    pub const ALL: [State; 27] = [
        State::RO,
        State::AC,
        State::AM,
        State::RR,
        State::PA,
        State::AP,
        State::TO,
        State::MA,
        State::PI,
        State::CE,
        State::RN,
        State::PB,
        State::PE,
        State::AL,
        State::SE,
        State::BA,
        State::MG,
        State::ES,
        State::RJ,
        State::SP,
        State::PR,
        State::SC,
        State::RS,
        State::MS,
        State::MT,
        State::GO,
        State::DF,
    ];

    /// Two-letter abbreviation.
    pub fn code(&self) -> &'static str {
        match self {
            State::RO => "RO",
            State::AC => "AC",
            State::AM => "AM",
            State::RR => "RR",
            State::PA => "PA",
            State::AP => "AP",
            State::TO => "TO",
            State::MA => "MA",
            State::PI => "PI",
            State::CE => "CE",
            State::RN => "RN",
            State::PB => "PB",
            State::PE => "PE",
            State::AL => "AL",
            State::SE => "SE",
            State::BA => "BA",
            State::MG => "MG",
            State::ES => "ES",
            State::RJ => "RJ",
            State::SP => "SP",
            State::PR => "PR",
            State::SC => "SC",
            State::RS => "RS",
            State::MS => "MS",
            State::MT => "MT",
            State::GO => "GO",
            State::DF => "DF",
        }
    }

    /// Two-digit national statistics code.
    pub fn ibge_code(&self) -> u8 {
        match self {
            State::RO => 11,
            State::AC => 12,
            State::AM => 13,
            State::RR => 14,
            State::PA => 15,
            State::AP => 16,
            State::TO => 17,
            State::MA => 21,
            State::PI => 22,
            State::CE => 23,
            State::RN => 24,
            State::PB => 25,
            State::PE => 26,
            State::AL => 27,
            State::SE => 28,
            State::BA => 29,
            State::MG => 31,
            State::ES => 32,
            State::RJ => 33,
            State::SP => 35,
            State::PR => 41,
            State::SC => 42,
            State::RS => 43,
            State::MS => 50,
            State::MT => 51,
            State::GO => 52,
            State::DF => 53,
        }
    }

    /// The first digit of the statistics code identifies the region.
    pub fn region(&self) -> Region {
        match self.ibge_code() / 10 {
            1 => Region::North,
            2 => Region::Northeast,
            3 => Region::Southeast,
            4 => Region::South,
            _ => Region::CenterWest,
        }
    }

    /// Uppercase spellings, accented first when one exists.
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            State::RO => &["RONDÔNIA", "RONDONIA"],
            State::AC => &["ACRE"],
            State::AM => &["AMAZONAS"],
            State::RR => &["RORAIMA"],
            State::PA => &["PARÁ", "PARA"],
            State::AP => &["AMAPÁ", "AMAPA"],
            State::TO => &["TOCANTINS"],
            State::MA => &["MARANHÃO", "MARANHAO"],
            State::PI => &["PIAUÍ", "PIAUI"],
            State::CE => &["CEARÁ", "CEARA"],
            State::RN => &["RIO GRANDE DO NORTE"],
            State::PB => &["PARAÍBA", "PARAIBA"],
            State::PE => &["PERNAMBUCO"],
            State::AL => &["ALAGOAS"],
            State::SE => &["SERGIPE"],
            State::BA => &["BAHIA"],
            State::MG => &["MINAS GERAIS"],
            State::ES => &["ESPÍRITO SANTO", "ESPIRITO SANTO"],
            State::RJ => &["RIO DE JANEIRO"],
            State::SP => &["SÃO PAULO", "SAO PAULO"],
            State::PR => &["PARANÁ", "PARANA"],
            State::SC => &["SANTA CATARINA"],
            State::RS => &["RIO GRANDE DO SUL"],
            State::MS => &["MATO GROSSO DO SUL"],
            State::MT => &["MATO GROSSO"],
            State::GO => &["GOIÁS", "GOIAS"],
            State::DF => &["DISTRITO FEDERAL"],
        }
    }

    pub fn from_code(code: &str) -> Option<State> {
        let code = code.trim();
        State::ALL
            .into_iter()
            .find(|state| state.code().eq_ignore_ascii_case(code))
    }

    pub fn from_ibge(code: u8) -> Option<State> {
        State::ALL
            .into_iter()
            .find(|state| state.ibge_code() == code)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for State {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        State::from_code(s).ok_or_else(|| format!("unknown state: {s}"))
    }
}

/// State key to region name, for raising state tables to region level.
pub fn state_region_map() -> BTreeMap<String, String> {
    State::ALL
        .into_iter()
        .map(|state| (state.code().to_string(), state.region().name().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_state_has_one_region() {
        let covered: usize = Region::ALL.iter().map(|region| region.states().count()).sum();
        assert_eq!(covered, State::ALL.len());
        assert_eq!(State::SP.region(), Region::Southeast);
        assert_eq!(State::DF.region(), Region::CenterWest);
        assert_eq!(State::TO.region(), Region::North);
    }

    #[test]
    fn codes_are_unique() {
        for state in State::ALL {
            assert_eq!(State::from_ibge(state.ibge_code()), Some(state));
            assert_eq!(State::from_code(state.code()), Some(state));
        }
    }

    #[test]
    fn region_parses_names_and_keywords() {
        assert_eq!("Center-West".parse::<Region>(), Ok(Region::CenterWest));
        assert_eq!("centro oeste".parse::<Region>(), Ok(Region::CenterWest));
        assert_eq!("NORDESTE".parse::<Region>(), Ok(Region::Northeast));
        assert_eq!(Region::from_stratum_code("04"), Some(Region::South));
        assert_eq!(Region::from_stratum_code("06"), None);
    }

    #[test]
    fn state_region_map_covers_all_states() {
        let map = state_region_map();
        assert_eq!(map.len(), 27);
        assert_eq!(map.get("RJ").map(String::as_str), Some("Southeast"));
    }
}
