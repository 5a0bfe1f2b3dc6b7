//! Query catalogue
//!
//! `SbrOdds` bundles the executor with the reference data source and builds
//! the supported queries. Inputs are validated here, before anything is sent.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use serde_json::Value;
use tracing::debug;

use super::base::{Query, QuerySpec};
use super::lines::{LinesQuery, BOOKKEEPING_KEYS};
use crate::config::{League, LeagueConfig, ResourceLoader, Sport, SportConfig, Sportsbooks};
use crate::error::{Result, SbrError};
use crate::graphql::{build_arguments, SbrClient};

/// Entry point: reference data plus query constructors
#[derive(Clone)]
pub struct SbrOdds {
    client: SbrClient,
    loader: ResourceLoader,
}

fn require_ids(what: &str, ids: &[i64]) -> Result<()> {
    if ids.is_empty() {
        return Err(SbrError::InvalidArgument(format!("{} must not be empty", what)));
    }
    Ok(())
}

struct Args(BTreeMap<String, Value>);

impl Args {
    fn new() -> Self {
        Args(BTreeMap::new())
    }

    fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }
}

impl SbrOdds {
    /// Public endpoint with the bundled reference tables
    pub fn new() -> Result<Self> {
        Ok(Self::with_parts(SbrClient::new()?, ResourceLoader::Bundled))
    }

    pub fn with_parts(client: SbrClient, loader: ResourceLoader) -> Self {
        Self { client, loader }
    }

    pub fn client(&self) -> &SbrClient {
        &self.client
    }

    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }

    pub fn league(&self, league: League) -> Result<LeagueConfig> {
        LeagueConfig::load(&self.loader, league)
    }

    pub fn sport(&self, sport: Sport) -> Result<SportConfig> {
        SportConfig::load(&self.loader, sport)
    }

    pub fn sportsbooks(&self) -> Result<Arc<Sportsbooks>> {
        Sportsbooks::load(&self.loader)
    }

    /// Resolve sportsbook names or aliases to ids
    pub fn sportsbook_ids<S: AsRef<str>>(&self, terms: &[S]) -> Result<Vec<i64>> {
        self.sportsbooks()?.ids(terms)
    }

    fn spec(&self, name: &str, arguments: &str, args: Args, fields: Option<&str>) -> Result<QuerySpec> {
        let template = self.loader.argument_template(arguments)?;
        let mut spec = QuerySpec::new(name).arguments(build_arguments(&template, &args.0)?);
        if let Some(key) = fields {
            spec = spec.fields(self.loader.field_template(key)?);
        }
        debug!("Built {} query", name);
        Ok(spec)
    }

    fn events_spec(&self, name: &str, arguments: &str, args: Args) -> Result<QuerySpec> {
        Ok(self
            .spec(name, arguments, args, Some("event"))?
            .subpath(&["events"])
            .sublists(&["participants"])
            .id_key("event id"))
    }

    fn query(&self, spec: QuerySpec) -> Query {
        Query::new(self.client.clone(), spec)
    }

    fn lines(&self, spec: QuerySpec) -> LinesQuery {
        LinesQuery::new(self.client.clone(), spec, self.loader.clone())
    }

    // ------------------------------------------------------------------------
    // Events and leagues
    // ------------------------------------------------------------------------

    /// Events in a league starting within 24 hours of `date`
    pub fn events_by_date<Tz: TimeZone>(&self, league_id: i64, date: DateTime<Tz>) -> Result<Query> {
        let args = Args::new().set("lids", vec![league_id]).set("timestamp", date.timestamp_millis());
        Ok(self.query(self.events_spec("eventsByDateNew", "date", args)?))
    }

    /// Events in a league between `start` and `end`
    pub fn events_by_date_range<Tz: TimeZone>(
        &self,
        league_id: i64,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<Query> {
        let (start, end) = (start.timestamp_millis(), end.timestamp_millis());
        if start > end {
            return Err(SbrError::InvalidArgument("start must not be after end".to_string()));
        }
        let args = Args::new().set("lids", vec![league_id]).set("start", start).set("end", end);
        Ok(self.query(self.events_spec("eventsV2", "date_range", args)?))
    }

    pub fn events_by_event_ids(&self, event_ids: &[i64]) -> Result<Query> {
        require_ids("event ids", event_ids)?;
        let args = Args::new().set("eids", event_ids.to_vec());
        Ok(self.query(self.events_spec("eventsByEventIds", "event_ids", args)?))
    }

    /// Seasons, weeks and other groupings of a league's events
    pub fn event_groups_by_league(&self, league_id: i64) -> Result<Query> {
        let args = Args::new().set("lid", league_id);
        let spec = self.spec("eventGroupsByLeague", "league_id", args, Some("event_group"))?.id_key("event group id");
        Ok(self.query(spec))
    }

    /// Leagues matching a search term
    ///
    /// The service only answers with a handful of leagues that have upcoming
    /// events.
    pub fn search_leagues(&self, term: &str) -> Result<Query> {
        if term.trim().is_empty() {
            return Err(SbrError::InvalidArgument("search term must not be empty".to_string()));
        }
        let args = Args::new().set("search_term", vec![term.to_string()]);
        let spec = self
            .spec("multipleSearch", "multiple_search", args, Some("search_league"))?
            .subpath(&["leagues"])
            .id_key("league id");
        Ok(self.query(spec))
    }

    // ------------------------------------------------------------------------
    // Lines
    // ------------------------------------------------------------------------

    /// Betting consensus per participant
    pub fn consensus(&self, event_ids: &[i64], market_ids: &[i64]) -> Result<LinesQuery> {
        require_ids("event ids", event_ids)?;
        require_ids("market ids", market_ids)?;
        let args = Args::new().set("eids", event_ids.to_vec()).set("mtids", market_ids.to_vec());
        Ok(self.lines(self.spec("consensus", "lines", args, Some("consensus"))?))
    }

    pub fn current_lines(&self, event_ids: &[i64], market_ids: &[i64], sportsbook_ids: &[i64]) -> Result<LinesQuery> {
        require_ids("event ids", event_ids)?;
        require_ids("market ids", market_ids)?;
        require_ids("sportsbook ids", sportsbook_ids)?;
        let args = Args::new()
            .set("eids", event_ids.to_vec())
            .set("mtids", market_ids.to_vec())
            .set("paids", sportsbook_ids.to_vec());
        let spec = self.spec("currentLines", "lines_with_sportsbooks", args, None)?.strip(&BOOKKEEPING_KEYS);
        Ok(self.lines(spec))
    }

    pub fn opening_lines(&self, event_ids: &[i64], market_ids: &[i64], sportsbook_id: i64) -> Result<LinesQuery> {
        require_ids("event ids", event_ids)?;
        require_ids("market ids", market_ids)?;
        let args = Args::new()
            .set("eids", event_ids.to_vec())
            .set("mtids", market_ids.to_vec())
            .set("paid", sportsbook_id);
        let spec = self.spec("openingLines", "opening_lines", args, None)?.strip(&BOOKKEEPING_KEYS);
        Ok(self.lines(spec))
    }

    /// Best available price across sportsbooks
    pub fn best_lines(&self, event_ids: &[i64], market_ids: &[i64]) -> Result<LinesQuery> {
        require_ids("event ids", event_ids)?;
        require_ids("market ids", market_ids)?;
        let args = Args::new().set("eids", event_ids.to_vec()).set("mtids", market_ids.to_vec());
        let spec = self.spec("bestLines", "lines", args, None)?.strip(&BOOKKEEPING_KEYS);
        Ok(self.lines(spec))
    }

    /// Line movements of one market at one sportsbook
    pub fn line_history(
        &self,
        event_id: i64,
        market_id: i64,
        sportsbook_id: i64,
        participant_ids: &[i64],
    ) -> Result<LinesQuery> {
        require_ids("participant ids", participant_ids)?;
        let args = Args::new()
            .set("eid", event_id)
            .set("mtid", market_id)
            .set("paid", sportsbook_id)
            .set("partids", participant_ids.to_vec());
        let spec = self.spec("lineHistory", "line_history", args, None)?.strip(&BOOKKEEPING_KEYS);
        Ok(self.lines(spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryPhase;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn odds(endpoint: &str) -> SbrOdds {
        SbrOdds::with_parts(SbrClient::with_endpoint(endpoint).unwrap(), ResourceLoader::Bundled)
    }

    #[test]
    fn test_events_by_date_text() {
        let date = Utc.with_ymd_and_hms(2020, 9, 13, 0, 0, 0).unwrap();
        let query = odds("http://localhost").events_by_date(16, date).unwrap();
        let text = query.spec().text().unwrap();

        assert!(text.contains("eventsByDateNew("));
        assert!(text.contains("lid: [16]"));
        assert!(text.contains(&format!("startDate: {}", date.timestamp_millis())));
        assert!(!text.contains('\''));
        assert_eq!(query.phase(), QueryPhase::Unexecuted);
    }

    #[test]
    fn test_search_term_is_quoted_list() {
        let query = odds("http://localhost").search_leagues("nfl").unwrap();
        assert!(query.spec().text().unwrap().contains("searchText: [\"nfl\"]"));
    }

    #[test]
    fn test_validation_happens_before_any_request() {
        let odds = odds("http://localhost");
        let start = Utc.with_ymd_and_hms(2020, 9, 14, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 9, 13, 0, 0, 0).unwrap();

        assert!(matches!(odds.events_by_date_range(16, start, end), Err(SbrError::InvalidArgument(_))));
        assert!(matches!(odds.events_by_event_ids(&[]), Err(SbrError::InvalidArgument(_))));
        assert!(matches!(odds.consensus(&[1], &[]), Err(SbrError::InvalidArgument(_))));
        assert!(matches!(odds.current_lines(&[1], &[401], &[]), Err(SbrError::InvalidArgument(_))));
        assert!(matches!(odds.search_leagues("  "), Err(SbrError::InvalidArgument(_))));
        assert!(odds.events_by_date_range(16, end, start).is_ok());
    }

    #[test]
    fn test_sportsbook_ids() {
        let odds = odds("http://localhost");
        assert_eq!(odds.sportsbook_ids(&["pinnacle", "BOV"]).unwrap(), vec![20, 9]);
        assert!(matches!(odds.sportsbook_ids(&["nowhere"]), Err(SbrError::SportsbookNotFound(_))));
    }

    #[test]
    fn test_missing_template_directory() {
        let dir = tempfile::tempdir().unwrap();
        let odds = SbrOdds::with_parts(SbrClient::with_endpoint("http://localhost").unwrap(), ResourceLoader::from_dir(dir.path()));
        assert!(matches!(odds.event_groups_by_league(16), Err(SbrError::ConfigNotFound { .. })));
    }

    #[tokio::test]
    async fn test_events_then_consensus() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("eventsByEventIds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"eventsByEventIds": {"events": [
                {"eid": 100, "des": "Baltimore @ New England", "lid": 16, "spid": 4, "dt": 1600041600000i64,
                 "participants": [
                    {"partid": 1557, "ih": true, "source": {"nam": "New England", "nn": "Patriots", "abbr": "NE"}},
                    {"partid": 1538, "ih": false, "source": {"nam": "Baltimore", "nn": "Ravens", "abbr": "BAL"}}],
                 "scores": [{"partid": 1557, "perid": 1, "val": 21}, {"partid": 1538, "perid": 1, "val": 14}]}
            ]}}})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("consensus"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"consensus": [
                {"eid": 100, "mtid": 83, "partid": 1538, "bb": 120, "bp": 40.0},
                {"eid": 100, "mtid": 83, "partid": 1557, "bb": 180, "bp": 60.0}
            ]}})))
            .mount(&server)
            .await;

        let odds = odds(&server.uri());
        let mut events = odds.events_by_event_ids(&[100]).unwrap();
        let event_list = events.list().await.unwrap();
        assert_eq!(events.ids().await.unwrap(), vec![100]);
        assert!(event_list[0]["datetime"].is_string());

        let mut consensus = odds.consensus(&events.ids().await.unwrap(), &[83]).unwrap();
        let lines = consensus.list(Some(&event_list)).await.unwrap();

        assert_eq!(lines[0]["consensus bets"], json!(120));
        assert_eq!(lines[0]["participant"], json!("BAL"));
        assert_eq!(lines[0]["market"], json!("money line"));
        assert_eq!(lines[0]["result"], json!("L"));
        assert_eq!(lines[0]["profit"], json!(-100.0));
        assert_eq!(lines[1]["result"], json!("W"));
        assert!(lines[1].get("profit").is_none());
        assert!(lines[1].get("sportsbook").is_none());

        let table = events.table().await.unwrap();
        assert_eq!(table.get(0, "participants.1.source.abbreviation"), Some(&json!("NE")));
    }
}
