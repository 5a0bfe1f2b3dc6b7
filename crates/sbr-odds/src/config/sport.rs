//! Sport and league reference configs, and the Identifier Resolver
//!
//! A sport config carries the market catalogue; a league config adds the
//! league identity and its team table on top of its sport's markets.
//!
//! # Market lookup
//! Markets are grouped by scope ("full game", "1st half", ...). A scope is
//! addressed by its name or url, a market inside it by its alias, name or url.
//! All keys are lower-cased. Casual phrasing ("1h", "ats", "o/u") is mapped to
//! canonical terms through the `search_dictionary` table first.
//!
//! # Team lookup
//! See [`TeamIndex::first_match`] for the ambiguity policy.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::loader::ResourceLoader;
use super::{League, Sport};
use crate::error::{Result, SbrError};

/// Scope used when a market term names no scope
pub const DEFAULT_SCOPE: &str = "full game";

/// How a market is settled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Spread,
    Total,
    Moneyline,
    /// Any type string this crate does not know; settled like a spread
    #[serde(other)]
    Other,
}

/// One bettable market inside a scope
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Market {
    #[serde(rename = "market id")]
    pub market_id: i64,
    pub name: String,
    pub alias: String,
    pub url: String,
    #[serde(rename = "type", default)]
    pub market_type: Option<MarketType>,
    /// `[first, last]`: periods `first <= p < last` count toward settlement.
    /// Absent means every period counts; a single entry means none do.
    #[serde(default)]
    pub periods: Option<Vec<i64>>,
}

impl Market {
    /// Whether a score in `period` counts toward this market
    pub fn covers_period(&self, period: i64) -> bool {
        match self.periods.as_deref() {
            Some([first, .., last]) => *first <= period && period < *last,
            Some(_) => false,
            None => true,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct MarketScope {
    name: String,
    url: String,
    #[serde(default)]
    alias: Option<String>,
    #[serde(rename = "market types")]
    market_types: Vec<Market>,
}

#[derive(Debug, Deserialize)]
struct SportFile {
    #[serde(rename = "sport id")]
    sport_id: i64,
    name: String,
    #[serde(rename = "default market id")]
    default_market_id: i64,
    markets: Vec<MarketScope>,
}

/// A team as listed in a league table
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Team {
    #[serde(rename = "team id")]
    pub team_id: i64,
    pub name: String,
    pub nickname: String,
    pub location: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(rename = "sbr abbreviation", default)]
    pub sbr_abbreviation: Option<String>,
}

impl Team {
    /// `location nickname`, lower-cased
    pub fn full_name(&self) -> String {
        format!("{} {}", self.location.to_lowercase(), self.nickname.to_lowercase())
    }
}

#[derive(Debug, Deserialize)]
struct LeagueFile {
    #[serde(rename = "league id")]
    league_id: i64,
    name: String,
    alias: String,
    #[serde(default)]
    teams: Vec<Team>,
}

// ============================================================================
// Search terms
// ============================================================================

/// A market reference as a caller writes it
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarketTerm {
    /// Already a market id
    Id(i64),
    /// Market alias in the default "full game" scope, e.g. `"spread"`
    Alias(String),
    /// `(scope, alias)`, e.g. `("1st half", "total")`
    Scoped(String, String),
}

impl fmt::Display for MarketTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketTerm::Id(id) => write!(f, "{}", id),
            MarketTerm::Alias(alias) => write!(f, "{}", alias),
            MarketTerm::Scoped(scope, alias) => write!(f, "({}, {})", scope, alias),
        }
    }
}

impl From<i64> for MarketTerm {
    fn from(id: i64) -> Self {
        MarketTerm::Id(id)
    }
}

impl From<&str> for MarketTerm {
    fn from(alias: &str) -> Self {
        MarketTerm::Alias(alias.to_string())
    }
}

impl From<String> for MarketTerm {
    fn from(alias: String) -> Self {
        MarketTerm::Alias(alias)
    }
}

impl From<(&str, &str)> for MarketTerm {
    fn from((scope, alias): (&str, &str)) -> Self {
        MarketTerm::Scoped(scope.to_string(), alias.to_string())
    }
}

/// A team reference as a caller writes it
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TeamTerm {
    Id(i64),
    /// Any alias: abbreviation, name, nickname, location or "location nickname"
    Name(String),
}

impl From<i64> for TeamTerm {
    fn from(id: i64) -> Self {
        TeamTerm::Id(id)
    }
}

impl From<&str> for TeamTerm {
    fn from(name: &str) -> Self {
        TeamTerm::Name(name.to_string())
    }
}

impl From<String> for TeamTerm {
    fn from(name: String) -> Self {
        TeamTerm::Name(name)
    }
}

// ============================================================================
// Sport config
// ============================================================================

/// Market catalogue of one sport
#[derive(Clone, Debug)]
pub struct SportConfig {
    pub sport_id: i64,
    pub name: String,
    pub default_market_id: i64,
    /// scope key -> market key -> market id
    market_ids: HashMap<String, HashMap<String, i64>>,
    markets: HashMap<i64, Market>,
    synonyms: HashMap<String, String>,
}

impl SportConfig {
    pub fn load(loader: &ResourceLoader, sport: Sport) -> Result<Self> {
        let file: SportFile = loader.load(sport.resource_name())?;
        let synonyms: HashMap<String, String> = loader.load("search_dictionary")?;

        if file.sport_id != sport.id() {
            warn!(
                "Sport table {} declares id {}, expected {}",
                sport.resource_name(),
                file.sport_id,
                sport.id()
            );
        }

        let synonyms = synonyms.into_iter().map(|(k, v)| (k.to_lowercase(), v.to_lowercase())).collect();

        Ok(Self {
            sport_id: file.sport_id,
            name: file.name,
            default_market_id: file.default_market_id,
            market_ids: build_market_ids(&file.markets),
            markets: file
                .markets
                .into_iter()
                .flat_map(|scope| scope.market_types)
                .map(|m| (m.market_id, m))
                .collect(),
            synonyms,
        })
    }

    pub fn market(&self, market_id: i64) -> Option<&Market> {
        self.markets.get(&market_id)
    }

    pub fn market_name(&self, market_id: i64) -> Option<&str> {
        self.market(market_id).map(|m| m.name.as_str())
    }

    pub fn market_type(&self, market_id: i64) -> Option<MarketType> {
        self.market(market_id).and_then(|m| m.market_type)
    }

    pub fn market_periods(&self, market_id: i64) -> Option<&[i64]> {
        self.market(market_id).and_then(|m| m.periods.as_deref())
    }

    /// market id -> market name
    pub fn market_names(&self) -> HashMap<i64, String> {
        self.markets.iter().map(|(id, m)| (*id, m.name.clone())).collect()
    }

    fn synonym<'a>(&'a self, term: &'a str) -> &'a str {
        self.synonyms.get(term).map(String::as_str).unwrap_or(term)
    }

    /// Resolve market terms to market ids, preserving order
    ///
    /// Ids pass through untouched. A bare alias is looked up in the
    /// "full game" scope.
    pub fn market_ids(&self, terms: &[MarketTerm]) -> Result<Vec<i64>> {
        terms
            .iter()
            .map(|term| {
                let (scope, alias) = match term {
                    MarketTerm::Id(id) => return Ok(*id),
                    MarketTerm::Alias(alias) => (DEFAULT_SCOPE.to_string(), alias.to_lowercase()),
                    MarketTerm::Scoped(scope, alias) => (scope.to_lowercase(), alias.to_lowercase()),
                };
                let scope = self.synonym(&scope);
                let alias = self.synonym(&alias);

                self.market_ids
                    .get(scope)
                    .and_then(|m| m.get(alias))
                    .copied()
                    .ok_or_else(|| SbrError::MarketNotFound(term.to_string()))
            })
            .collect()
    }
}

fn build_market_ids(scopes: &[MarketScope]) -> HashMap<String, HashMap<String, i64>> {
    let mut index: HashMap<String, HashMap<String, i64>> = HashMap::new();
    for scope in scopes {
        let mut inner = HashMap::new();
        for m in &scope.market_types {
            for key in [&m.alias, &m.name, &m.url] {
                inner.insert(key.to_lowercase(), m.market_id);
            }
        }
        let scope_keys = [Some(&scope.url), Some(&scope.name), scope.alias.as_ref()];
        for key in scope_keys.into_iter().flatten() {
            index.entry(key.to_lowercase()).or_default().extend(inner.clone());
        }
    }
    index
}

// ============================================================================
// Team index
// ============================================================================

/// Which team field an alias came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeamAliasKind {
    Abbreviation,
    SbrAbbreviation,
    Name,
    Nickname,
    Location,
    FullName,
}

impl TeamAliasKind {
    /// Lookup order for team aliases
    pub const PRIORITY: [TeamAliasKind; 6] = [
        TeamAliasKind::Abbreviation,
        TeamAliasKind::SbrAbbreviation,
        TeamAliasKind::Name,
        TeamAliasKind::Nickname,
        TeamAliasKind::Location,
        TeamAliasKind::FullName,
    ];

    fn alias_of(self, team: &Team) -> Option<String> {
        match self {
            TeamAliasKind::Abbreviation => team.abbreviation.as_ref().map(|s| s.to_lowercase()),
            TeamAliasKind::SbrAbbreviation => team.sbr_abbreviation.as_ref().map(|s| s.to_lowercase()),
            TeamAliasKind::Name => Some(team.name.to_lowercase()),
            TeamAliasKind::Nickname => Some(team.nickname.to_lowercase()),
            TeamAliasKind::Location => Some(team.location.to_lowercase()),
            TeamAliasKind::FullName => Some(team.full_name()),
        }
    }
}

/// Alias indices over a league's teams, one per [`TeamAliasKind`]
#[derive(Clone, Debug, Default)]
pub struct TeamIndex {
    indices: Vec<(TeamAliasKind, HashMap<String, i64>)>,
}

impl TeamIndex {
    /// Within one index a repeated alias keeps the team listed last
    pub fn build(teams: &[Team]) -> Self {
        let indices = TeamAliasKind::PRIORITY
            .iter()
            .map(|kind| {
                let map = teams
                    .iter()
                    .filter_map(|t| kind.alias_of(t).map(|alias| (alias, t.team_id)))
                    .collect();
                (*kind, map)
            })
            .collect();
        Self { indices }
    }

    /// Every index containing `alias`, in priority order
    pub fn matches(&self, alias: &str) -> Vec<(TeamAliasKind, i64)> {
        let alias = alias.to_lowercase();
        self.indices
            .iter()
            .filter_map(|(kind, map)| map.get(&alias).map(|id| (*kind, *id)))
            .collect()
    }

    /// First index in [`TeamAliasKind::PRIORITY`] order that contains `alias`
    ///
    /// An alias present under several indices is not an error: the earliest
    /// index wins, even when the later ones point at a different team.
    pub fn first_match(&self, alias: &str) -> Option<(TeamAliasKind, i64)> {
        let found = self.matches(alias);
        if found.iter().any(|(_, id)| *id != found[0].1) {
            debug!("Team alias '{}' is ambiguous: {:?}; using {:?}", alias, found, found[0]);
        }
        found.into_iter().next()
    }
}

// ============================================================================
// League config
// ============================================================================

/// A league: identity, teams, and its sport's markets
#[derive(Clone, Debug)]
pub struct LeagueConfig {
    pub league: League,
    pub league_id: i64,
    pub name: String,
    pub alias: String,
    sport: SportConfig,
    teams: Vec<Team>,
    team_index: TeamIndex,
}

impl LeagueConfig {
    pub fn load(loader: &ResourceLoader, league: League) -> Result<Self> {
        let sport = SportConfig::load(loader, league.sport())?;
        let file: LeagueFile = loader.load(league.resource_name())?;

        if file.league_id != league.id() {
            warn!(
                "League table {} declares id {}, expected {}",
                league.resource_name(),
                file.league_id,
                league.id()
            );
        }

        let team_index = TeamIndex::build(&file.teams);

        Ok(Self {
            league,
            league_id: file.league_id,
            name: file.name,
            alias: file.alias,
            sport,
            teams: file.teams,
            team_index,
        })
    }

    pub fn sport(&self) -> &SportConfig {
        &self.sport
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team_index(&self) -> &TeamIndex {
        &self.team_index
    }

    /// See [`SportConfig::market_ids`]
    pub fn market_ids(&self, terms: &[MarketTerm]) -> Result<Vec<i64>> {
        self.sport.market_ids(terms)
    }

    /// Resolve team terms to team ids, preserving order
    pub fn team_ids(&self, terms: &[TeamTerm]) -> Result<Vec<i64>> {
        terms
            .iter()
            .map(|term| match term {
                TeamTerm::Id(id) => Ok(*id),
                TeamTerm::Name(name) => self
                    .team_index
                    .first_match(name)
                    .map(|(_, id)| id)
                    .ok_or_else(|| SbrError::TeamNotFound(name.clone())),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nfl() -> LeagueConfig {
        LeagueConfig::load(&ResourceLoader::Bundled, League::Nfl).unwrap()
    }

    fn patriots_id(cfg: &LeagueConfig) -> i64 {
        cfg.teams().iter().find(|t| t.nickname == "Patriots").unwrap().team_id
    }

    #[test]
    fn test_market_ids_pass_through() {
        assert_eq!(nfl().market_ids(&[MarketTerm::Id(16)]).unwrap(), vec![16]);
    }

    #[test]
    fn test_bare_alias_uses_full_game_scope() {
        let cfg = nfl();
        let ids = cfg.market_ids(&["spread".into()]).unwrap();
        assert_eq!(ids, vec![cfg.sport().default_market_id]);
        assert_eq!(cfg.sport().market_type(ids[0]), Some(MarketType::Spread));
    }

    #[test]
    fn test_scoped_alias_and_synonyms() {
        let cfg = nfl();
        let direct = cfg.market_ids(&[("1st half", "total").into()]).unwrap();
        let casual = cfg.market_ids(&[("1H", "o/u").into()]).unwrap();
        assert_eq!(direct, casual);
        assert_eq!(cfg.sport().market_periods(direct[0]), Some(&[1, 3][..]));

        let mixed = cfg
            .market_ids(&[MarketTerm::Id(83), "ML".into(), ("full game", "point spread").into()])
            .unwrap();
        assert_eq!(mixed, vec![83, 83, 401]);
    }

    #[test]
    fn test_market_not_found() {
        let err = nfl().market_ids(&[("1st half", "corner kicks").into()]).unwrap_err();
        assert!(matches!(err, SbrError::MarketNotFound(ref t) if t == "(1st half, corner kicks)"));
    }

    #[test]
    fn test_team_ids() {
        let cfg = nfl();
        let pats = patriots_id(&cfg);
        assert_eq!(cfg.team_ids(&["patriots".into()]).unwrap(), vec![pats]);
        assert_eq!(cfg.team_ids(&["NE".into()]).unwrap(), vec![pats]);
        assert_eq!(cfg.team_ids(&["New England Patriots".into()]).unwrap(), vec![pats]);
        assert_eq!(cfg.team_ids(&[TeamTerm::Id(7)]).unwrap(), vec![7]);
    }

    #[test]
    fn test_team_not_found() {
        let err = nfl().team_ids(&["nonexistent team".into()]).unwrap_err();
        assert!(matches!(err, SbrError::TeamNotFound(ref t) if t == "nonexistent team"));
    }

    #[test]
    fn test_first_index_wins_on_ambiguity() {
        let teams = vec![
            Team {
                team_id: 1,
                name: "Dallas".into(),
                nickname: "Stars".into(),
                location: "Dallas".into(),
                abbreviation: Some("DAL".into()),
                sbr_abbreviation: None,
            },
            Team {
                team_id: 2,
                name: "Texas".into(),
                nickname: "Dal".into(),
                location: "Arlington".into(),
                abbreviation: Some("TEX".into()),
                sbr_abbreviation: None,
            },
        ];
        let index = TeamIndex::build(&teams);

        // "dal" is team 1's abbreviation and team 2's nickname
        assert_eq!(
            index.matches("dal"),
            vec![(TeamAliasKind::Abbreviation, 1), (TeamAliasKind::Nickname, 2)]
        );
        assert_eq!(index.first_match("DAL"), Some((TeamAliasKind::Abbreviation, 1)));
        assert_eq!(index.first_match("arlington dal"), Some((TeamAliasKind::FullName, 2)));
        assert_eq!(index.first_match("houston"), None);
    }

    #[test]
    fn test_covers_period() {
        let mut m = Market {
            market_id: 1,
            name: "1st half total".into(),
            alias: "total".into(),
            url: "totals".into(),
            market_type: Some(MarketType::Total),
            periods: Some(vec![1, 3]),
        };
        assert!(m.covers_period(1));
        assert!(m.covers_period(2));
        assert!(!m.covers_period(3));
        m.periods = Some(vec![2]);
        assert!(!m.covers_period(2));
        m.periods = None;
        assert!(m.covers_period(5));
    }

    #[test]
    fn test_unknown_market_type_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("search_dictionary.yaml"), "ats: spread\n").unwrap();
        std::fs::write(
            dir.path().join("football.yaml"),
            "sport id: 4
name: football
default market id: 401
markets:
  - name: full game
    url: full-game
    market types:
      - {market id: 401, name: point spread, alias: spread, url: pointspread, type: spread}
      - {market id: 999, name: alternate spread, alias: alt, url: alternate, type: alternate}
",
        )
        .unwrap();

        let cfg = SportConfig::load(&ResourceLoader::from_dir(dir.path()), Sport::Football).unwrap();
        assert_eq!(cfg.market_type(999), Some(MarketType::Other));
        assert_eq!(cfg.market_type(401), Some(MarketType::Spread));
        assert_eq!(cfg.market_ids(&[MarketTerm::from("ATS")]).unwrap(), vec![401]);
    }

    #[test]
    fn test_every_league_loads() {
        for league in League::ALL {
            let cfg = LeagueConfig::load(&ResourceLoader::Bundled, league).unwrap();
            assert_eq!(cfg.league_id, league.id());
            assert_eq!(cfg.sport().sport_id, league.sport().id());
            assert!(cfg.sport().market(cfg.sport().default_market_id).is_some());
        }
    }
}
