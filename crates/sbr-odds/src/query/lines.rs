//! Lines Post-Processor
//!
//! Betting-line records are cross-referenced with a caller-supplied event
//! list to attach readable fields:
//! - `event`: the event description
//! - `market`: the market name from the event's league (or sport) config
//! - `result` / `profit`: settlement of a 100-unit stake against final scores
//! - `sportsbook`: the sportsbook display name
//! - `participant`: team label, or "over" / "under"
//!
//! A field that cannot be derived (unplayed event, league without a config,
//! unknown sportsbook) is left out of the record. Only a missing or malformed
//! reference table is an error.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::base::{Query, QueryPhase, QuerySpec};
use crate::config::{League, LeagueConfig, Market, MarketType, ResourceLoader, Sport, SportConfig, Sportsbooks};
use crate::error::{Result, SbrError};
use crate::graphql::SbrClient;
use crate::table::Table;
use crate::translate::translated;

/// Participant id the service uses for the over side of a total
pub const OVER_PARTICIPANT_ID: i64 = 15143;
/// Participant id the service uses for the under side of a total
pub const UNDER_PARTICIPANT_ID: i64 = 15144;

/// Internal keys the service attaches to line records
pub const BOOKKEEPING_KEYS: [&str; 11] =
    ["boid", "lineid", "sequence", "dp", "bs", "iof", "sbid", "sid", "fpd", "fpn", "sort"];

const STAKE: f64 = 100.0;

/// Settlement of one line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BetResult {
    Win,
    Loss,
}

impl BetResult {
    pub fn as_str(self) -> &'static str {
        match self {
            BetResult::Win => "W",
            BetResult::Loss => "L",
        }
    }
}

/// Points scored by one participant in one period
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodScore {
    pub participant_id: Option<i64>,
    pub period: Option<i64>,
    /// `None` when the service reported something non-numeric
    pub points: Option<f64>,
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn integer(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// ============================================================================
// Event context
// ============================================================================

#[derive(Clone, Debug, Default)]
struct EventInfo {
    description: Option<String>,
    league_id: Option<i64>,
    sport_id: Option<i64>,
    scores: Vec<PeriodScore>,
}

/// Lookup tables built from an event list
#[derive(Clone, Debug)]
pub struct EventContext {
    events: HashMap<i64, EventInfo>,
    participants: HashMap<i64, String>,
}

impl EventContext {
    /// Accepts events in raw or translated form
    pub fn from_events(events: &[Value]) -> Self {
        let mut participants = HashMap::from([
            (OVER_PARTICIPANT_ID, "over".to_string()),
            (UNDER_PARTICIPANT_ID, "under".to_string()),
        ]);
        let mut table = HashMap::new();

        for event in events.iter().map(translated) {
            let Some(event_id) = integer(event.get("event id")) else {
                debug!("Skipping event without id");
                continue;
            };

            for p in event.get("participants").and_then(Value::as_array).into_iter().flatten() {
                let Some(pid) = integer(p.get("participant id")) else {
                    continue;
                };
                let source = p.get("source");
                let label = ["last name", "abbreviation", "name"]
                    .iter()
                    .find_map(|k| source.and_then(|s| s.get(*k)).and_then(Value::as_str));
                if let Some(label) = label {
                    participants.insert(pid, label.to_string());
                }
            }

            let scores = event
                .get("scores")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .map(|s| PeriodScore {
                    participant_id: integer(s.get("participant id")),
                    period: integer(s.get("period")),
                    points: s.get("points scored").and_then(number),
                })
                .collect();

            table.insert(
                event_id,
                EventInfo {
                    description: event.get("description").and_then(Value::as_str).map(str::to_string),
                    league_id: integer(event.get("league id")),
                    sport_id: integer(event.get("sport id")),
                    scores,
                },
            );
        }

        Self { events: table, participants }
    }

    pub fn description(&self, event_id: i64) -> Option<&str> {
        self.events.get(&event_id)?.description.as_deref()
    }

    pub fn scores(&self, event_id: i64) -> &[PeriodScore] {
        self.events.get(&event_id).map(|e| e.scores.as_slice()).unwrap_or_default()
    }

    pub fn participant_label(&self, participant_id: i64) -> Option<&str> {
        self.participants.get(&participant_id).map(String::as_str)
    }
}

// ============================================================================
// Settlement
// ============================================================================

/// Settle a line against final scores
///
/// Scores outside the market's periods are ignored. Returns `None` when there
/// are no scores, the market has no type or a malformed period range, the
/// line value is missing (except moneylines, which settle at 0), or a counted
/// score is non-numeric. Unknown market types settle like spreads.
pub fn evaluate(market: &Market, participant_id: i64, line_value: Option<f64>, scores: &[PeriodScore]) -> Option<BetResult> {
    if scores.is_empty() {
        return None;
    }
    let market_type = market.market_type?;
    if market.periods.as_ref().is_some_and(|p| p.len() < 2) {
        return None;
    }

    let counted: Vec<&PeriodScore> = scores
        .iter()
        .filter(|s| s.period.map_or(market.periods.is_none(), |p| market.covers_period(p)))
        .collect();

    let won = match market_type {
        MarketType::Total => {
            let line = line_value?;
            let total = counted.iter().map(|s| s.points).sum::<Option<f64>>()?;
            match participant_id {
                OVER_PARTICIPANT_ID => total > line,
                UNDER_PARTICIPANT_ID => total < line,
                _ => return None,
            }
        }
        MarketType::Spread | MarketType::Moneyline | MarketType::Other => {
            let line = match market_type {
                MarketType::Moneyline => line_value.unwrap_or(0.0),
                _ => line_value?,
            };
            if !scores.iter().any(|s| s.participant_id == Some(participant_id)) {
                return None;
            }
            let mut own = 0.0;
            let mut opponent = 0.0;
            for s in counted {
                let points = s.points?;
                match s.participant_id {
                    Some(pid) if pid == participant_id => own += points,
                    Some(_) => opponent += points,
                    None => {}
                }
            }
            own + line > opponent
        }
    };

    Some(if won { BetResult::Win } else { BetResult::Loss })
}

/// Profit on a 100-unit stake; a win needs decimal odds
pub fn profit(result: BetResult, decimal_odds: Option<f64>) -> Option<f64> {
    match result {
        BetResult::Win => decimal_odds.map(|d| round2((d - 1.0) * STAKE)),
        BetResult::Loss => Some(-STAKE),
    }
}

// ============================================================================
// Config cache
// ============================================================================

/// League and sport configs, loaded on first sight of their id
struct ConfigCache<'a> {
    loader: &'a ResourceLoader,
    leagues: HashMap<i64, Option<LeagueConfig>>,
    sports: HashMap<i64, Option<SportConfig>>,
}

fn absent_on_not_found<T>(loaded: Result<T>, what: &str) -> Result<Option<T>> {
    match loaded {
        Ok(config) => Ok(Some(config)),
        Err(SbrError::ConfigNotFound { name }) => {
            warn!("No reference table {} for {}", name, what);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl<'a> ConfigCache<'a> {
    fn new(loader: &'a ResourceLoader) -> Self {
        Self { loader, leagues: HashMap::new(), sports: HashMap::new() }
    }

    fn prepare(&mut self, league_id: Option<i64>, sport_id: Option<i64>) -> Result<()> {
        if let Some(id) = league_id {
            if !self.leagues.contains_key(&id) {
                let config = match League::from_id(id) {
                    Some(league) => absent_on_not_found(LeagueConfig::load(self.loader, league), league.resource_name())?,
                    None => None,
                };
                self.leagues.insert(id, config);
            }
        }
        if let Some(id) = sport_id {
            if !self.sports.contains_key(&id) {
                let config = match Sport::from_id(id) {
                    Some(sport) => absent_on_not_found(SportConfig::load(self.loader, sport), sport.resource_name())?,
                    None => None,
                };
                self.sports.insert(id, config);
            }
        }
        Ok(())
    }

    /// League config first, then sport config
    fn markets(&self, league_id: Option<i64>, sport_id: Option<i64>) -> Option<&SportConfig> {
        league_id
            .and_then(|id| self.leagues.get(&id))
            .and_then(Option::as_ref)
            .map(LeagueConfig::sport)
            .or_else(|| sport_id.and_then(|id| self.sports.get(&id)).and_then(Option::as_ref))
    }
}

// ============================================================================
// Augmentation
// ============================================================================

fn line_mut(record: &mut Value) -> Option<&mut Map<String, Value>> {
    let map = record.as_object_mut()?;
    if map.get("line").is_some_and(Value::is_object) {
        return map.get_mut("line").and_then(Value::as_object_mut);
    }
    Some(map)
}

fn augment_line(line: &mut Map<String, Value>, ctx: &EventContext, configs: &ConfigCache, books: &Sportsbooks) {
    let event_id = integer(line.get("event id"));
    let participant_id = integer(line.get("participant id"));

    let mut derived: Vec<(&str, Value)> = Vec::new();

    if let Some(event_id) = event_id {
        if let Some(desc) = ctx.description(event_id) {
            derived.push(("event", Value::from(desc)));
        }

        let info = ctx.events.get(&event_id);
        let markets = info.and_then(|i| configs.markets(i.league_id, i.sport_id));
        let market = markets.zip(integer(line.get("market id"))).and_then(|(m, id)| m.market(id));

        if let Some(market) = market {
            derived.push(("market", Value::from(market.name.as_str())));

            let outcome = participant_id.and_then(|pid| {
                evaluate(market, pid, line.get("spread / total").and_then(number), ctx.scores(event_id))
            });
            if let Some(result) = outcome {
                derived.push(("result", Value::from(result.as_str())));
                if let Some(p) = profit(result, line.get("decimal odds").and_then(number)) {
                    derived.push(("profit", Value::from(p)));
                }
            }
        }
    }

    if let Some(name) = integer(line.get("sportsbook id")).and_then(|id| books.name(id)) {
        derived.push(("sportsbook", Value::from(name)));
    }
    if let Some(label) = participant_id.and_then(|id| ctx.participant_label(id)) {
        derived.push(("participant", Value::from(label)));
    }

    for (k, v) in derived {
        line.insert(k.to_string(), v);
    }
}

/// Attach derived fields to translated line records
pub fn augment_lines(mut records: Vec<Value>, events: &[Value], loader: &ResourceLoader) -> Result<Vec<Value>> {
    let ctx = EventContext::from_events(events);
    let books = Sportsbooks::load(loader)?;
    let mut configs = ConfigCache::new(loader);

    for record in records.iter_mut() {
        let Some(line) = line_mut(record) else {
            continue;
        };
        if let Some(info) = integer(line.get("event id")).and_then(|id| ctx.events.get(&id)) {
            configs.prepare(info.league_id, info.sport_id)?;
        }
    }

    for record in records.iter_mut() {
        if let Some(line) = line_mut(record) {
            augment_line(line, &ctx, &configs, &books);
        }
    }
    debug!("Augmented {} line records against {} events", records.len(), ctx.events.len());
    Ok(records)
}

// ============================================================================
// Lines query
// ============================================================================

/// A query over betting lines
pub struct LinesQuery {
    query: Query,
    loader: ResourceLoader,
}

impl LinesQuery {
    pub fn new(client: SbrClient, spec: QuerySpec, loader: ResourceLoader) -> Self {
        Self { query: Query::new(client, spec), loader }
    }

    pub fn spec(&self) -> &QuerySpec {
        self.query.spec()
    }

    pub fn phase(&self) -> QueryPhase {
        self.query.phase()
    }

    pub async fn raw(&mut self) -> Result<&Value> {
        self.query.raw().await
    }

    /// Translated lines; with `events`, also the derived fields
    ///
    /// The first augmented result is kept: later calls with different events
    /// return it unchanged.
    pub async fn list(&mut self, events: Option<&[Value]>) -> Result<Vec<Value>> {
        match events {
            None => self.query.list().await,
            Some(events) => {
                let loader = &self.loader;
                self.query.augmented(|records| augment_lines(records, events, loader)).await
            }
        }
    }

    pub async fn table(&mut self, events: Option<&[Value]>) -> Result<Table> {
        let records = self.list(events).await?;
        Ok(self.query.tabulate(records))
    }
}
