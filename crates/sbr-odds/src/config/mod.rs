//! Reference data: sports, leagues, teams, markets and sportsbooks
//!
//! # Components
//! - `ResourceLoader`: named YAML tables, bundled or from a directory
//! - `SportConfig` / `LeagueConfig`: market and team catalogues with the
//!   identifier resolvers
//! - `Sportsbooks`: sportsbook id <-> display name
//!
//! Everything here is read-only once loaded.

mod loader;
pub mod sport;
pub mod sportsbook;

use std::str::FromStr;

pub use loader::ResourceLoader;
pub use sport::{
    LeagueConfig, Market, MarketTerm, MarketType, SportConfig, Team, TeamAliasKind, TeamIndex, TeamTerm,
};
pub use sportsbook::Sportsbooks;

use crate::error::SbrError;

/// Sports with a bundled market catalogue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sport {
    Soccer,
    Baseball,
    Football,
    Basketball,
    Hockey,
    Tennis,
    Fighting,
}

impl Sport {
    pub const ALL: [Sport; 7] = [
        Sport::Soccer,
        Sport::Baseball,
        Sport::Football,
        Sport::Basketball,
        Sport::Hockey,
        Sport::Tennis,
        Sport::Fighting,
    ];

    /// Service sport id
    pub fn id(self) -> i64 {
        match self {
            Sport::Soccer => 1,
            Sport::Baseball => 3,
            Sport::Football => 4,
            Sport::Basketball => 5,
            Sport::Hockey => 6,
            Sport::Tennis => 8,
            Sport::Fighting => 9,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    /// Name of the reference table holding this sport's markets
    pub fn resource_name(self) -> &'static str {
        match self {
            Sport::Soccer => "soccer",
            Sport::Baseball => "baseball",
            Sport::Football => "football",
            Sport::Basketball => "basketball",
            Sport::Hockey => "hockey",
            Sport::Tennis => "tennis",
            Sport::Fighting => "fighting",
        }
    }
}

/// Leagues with a bundled reference table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum League {
    Nfl,
    Ncaaf,
    Nba,
    Ncaab,
    Mlb,
    Nhl,
    Epl,
    LaLiga,
    Bundesliga,
    Ucl,
    UefaNationsLeague,
    Atp,
    Ufc,
}

impl League {
    pub const ALL: [League; 13] = [
        League::Nfl,
        League::Ncaaf,
        League::Nba,
        League::Ncaab,
        League::Mlb,
        League::Nhl,
        League::Epl,
        League::LaLiga,
        League::Bundesliga,
        League::Ucl,
        League::UefaNationsLeague,
        League::Atp,
        League::Ufc,
    ];

    /// Service league id
    pub fn id(self) -> i64 {
        match self {
            League::Nfl => 16,
            League::Ncaaf => 6,
            League::Nba => 5,
            League::Ncaab => 14,
            League::Mlb => 3,
            League::Nhl => 7,
            League::Epl => 2,
            League::LaLiga => 17,
            League::Bundesliga => 11,
            League::Ucl => 8,
            League::UefaNationsLeague => 1911,
            League::Atp => 23,
            League::Ufc => 26,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.id() == id)
    }

    pub fn sport(self) -> Sport {
        match self {
            League::Nfl | League::Ncaaf => Sport::Football,
            League::Nba | League::Ncaab => Sport::Basketball,
            League::Mlb => Sport::Baseball,
            League::Nhl => Sport::Hockey,
            League::Epl | League::LaLiga | League::Bundesliga | League::Ucl | League::UefaNationsLeague => {
                Sport::Soccer
            }
            League::Atp => Sport::Tennis,
            League::Ufc => Sport::Fighting,
        }
    }

    /// Name of the league's reference table
    pub fn resource_name(self) -> &'static str {
        match self {
            League::Nfl => "nfl",
            League::Ncaaf => "ncaaf",
            League::Nba => "nba",
            League::Ncaab => "ncaab",
            League::Mlb => "mlb",
            League::Nhl => "nhl",
            League::Epl => "epl",
            League::LaLiga => "laliga",
            League::Bundesliga => "bundesliga",
            League::Ucl => "ucl",
            League::UefaNationsLeague => "uefanationsleague",
            League::Atp => "atp",
            League::Ufc => "ufc",
        }
    }
}

impl FromStr for League {
    type Err = SbrError;

    /// Accepts the table name plus a few common spellings, case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s.to_lowercase().chars().filter(|c| !matches!(c, ' ' | '-' | '_')).collect();
        let league = match key.as_str() {
            "nfl" => League::Nfl,
            "ncaaf" | "cfb" => League::Ncaaf,
            "nba" => League::Nba,
            "ncaab" | "cbb" => League::Ncaab,
            "mlb" => League::Mlb,
            "nhl" => League::Nhl,
            "epl" | "premierleague" => League::Epl,
            "laliga" => League::LaLiga,
            "bundesliga" => League::Bundesliga,
            "ucl" | "championsleague" => League::Ucl,
            "uefanationsleague" | "nationsleague" => League::UefaNationsLeague,
            "atp" => League::Atp,
            "ufc" => League::Ufc,
            _ => return Err(SbrError::UnknownLeague(s.to_string())),
        };
        Ok(league)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip() {
        for league in League::ALL {
            assert_eq!(League::from_id(league.id()), Some(league));
        }
        for sport in Sport::ALL {
            assert_eq!(Sport::from_id(sport.id()), Some(sport));
        }
        assert_eq!(League::from_id(999), None);
    }

    #[test]
    fn test_league_from_str() {
        assert_eq!("NFL".parse::<League>().unwrap(), League::Nfl);
        assert_eq!("La Liga".parse::<League>().unwrap(), League::LaLiga);
        assert_eq!("uefa-nations-league".parse::<League>().unwrap(), League::UefaNationsLeague);
        assert!(matches!("cricket".parse::<League>(), Err(SbrError::UnknownLeague(_))));
    }
}
