//! Query object
//!
//! # State Machine
//! Unexecuted -> Executed (first accessor call, one remote request)
//! Executed -> Translated (records located and keys renamed)
//! Translated -> Augmented (lines queries only, when events are supplied)
//!
//! Every accessor advances the state as far as it needs and reads the cached
//! value afterwards. A failed remote call leaves the query Unexecuted; the
//! next accessor call sends the request again. States are written once and
//! never invalidated, so a query object belongs to one caller at a time.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{RemoteQueryError, Result, SbrError};
use crate::graphql::{build_query, SbrClient};
use crate::table::Table;
use crate::translate::translate;

/// What a query asks for and where its records sit in the response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuerySpec {
    /// GraphQL field name, also the top-level key of the response
    pub name: String,
    /// Field-selection block
    pub fields: Option<String>,
    /// Argument block, already substituted
    pub arguments: Option<String>,
    /// Keys below `name` leading to the records
    pub subpath: Vec<String>,
    /// List-valued keys expanded into numbered columns by [`Query::table`]
    pub sublist_keys: Vec<String>,
    /// Translated key collected by [`Query::ids`]
    pub id_key: Option<String>,
    /// Keys removed from every record before translation
    pub strip_keys: Vec<String>,
}

impl QuerySpec {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    pub fn arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }

    pub fn subpath(mut self, path: &[&str]) -> Self {
        self.subpath = path.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn sublists(mut self, keys: &[&str]) -> Self {
        self.sublist_keys = keys.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn id_key(mut self, key: &str) -> Self {
        self.id_key = Some(key.to_string());
        self
    }

    pub fn strip(mut self, keys: &[&str]) -> Self {
        self.strip_keys = keys.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Full query text sent to the service
    pub fn text(&self) -> Result<String> {
        build_query(&self.name, self.fields.as_deref(), self.arguments.as_deref())
    }
}

#[derive(Clone, Debug)]
enum QueryState {
    Unexecuted,
    Executed { raw: Value },
    Translated { raw: Value, records: Vec<Value> },
    Augmented { raw: Value, records: Vec<Value>, augmented: Vec<Value> },
}

impl QueryState {
    fn raw(&self) -> Option<&Value> {
        match self {
            QueryState::Unexecuted => None,
            QueryState::Executed { raw }
            | QueryState::Translated { raw, .. }
            | QueryState::Augmented { raw, .. } => Some(raw),
        }
    }

    fn records(&self) -> Option<&[Value]> {
        match self {
            QueryState::Translated { records, .. } | QueryState::Augmented { records, .. } => Some(records),
            _ => None,
        }
    }
}

/// Observable phase of a [`Query`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryPhase {
    Unexecuted,
    Executed,
    Translated,
    Augmented,
}

/// A lazily executed query against the odds service
pub struct Query {
    client: SbrClient,
    spec: QuerySpec,
    state: QueryState,
}

/// Remove `keys` from a record, and from the object under its `"line"` key
pub fn strip_keys(record: &mut Value, keys: &[String]) {
    let Value::Object(map) = record else {
        return;
    };
    for key in keys {
        map.remove(key);
    }
    if let Some(Value::Object(line)) = map.get_mut("line") {
        for key in keys {
            line.remove(key);
        }
    }
}

/// Expand each list under `keys` into `key.1`, `key.2`, ...
fn expand_sublists(records: &mut [Value], keys: &[String]) {
    for record in records.iter_mut() {
        let Value::Object(map) = record else {
            continue;
        };
        for key in keys {
            if let Some(Value::Array(items)) = map.remove(key) {
                for (i, item) in items.into_iter().enumerate() {
                    map.insert(format!("{}.{}", key, i + 1), item);
                }
            }
        }
    }
}

impl Query {
    pub fn new(client: SbrClient, spec: QuerySpec) -> Self {
        Self { client, spec, state: QueryState::Unexecuted }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn phase(&self) -> QueryPhase {
        match self.state {
            QueryState::Unexecuted => QueryPhase::Unexecuted,
            QueryState::Executed { .. } => QueryPhase::Executed,
            QueryState::Translated { .. } => QueryPhase::Translated,
            QueryState::Augmented { .. } => QueryPhase::Augmented,
        }
    }

    async fn ensure_executed(&mut self) -> Result<()> {
        if matches!(self.state, QueryState::Unexecuted) {
            info!("Executing {}", self.spec.name);
            let text = self.spec.text()?;
            let raw = self.client.execute(&text).await?;
            self.state = QueryState::Executed { raw };
        }
        Ok(())
    }

    async fn ensure_translated(&mut self) -> Result<()> {
        self.ensure_executed().await?;
        let next = match std::mem::replace(&mut self.state, QueryState::Unexecuted) {
            QueryState::Executed { raw } => {
                let records = self.extract_records(&raw);
                debug!("{}: {} records", self.spec.name, records.len());
                QueryState::Translated { raw, records }
            }
            other => other,
        };
        self.state = next;
        Ok(())
    }

    /// Locate the records under `name` and `subpath`, strip and translate them
    fn extract_records(&self, raw: &Value) -> Vec<Value> {
        let mut node = raw.get(&self.spec.name);
        for key in &self.spec.subpath {
            node = node.and_then(|n| n.get(key));
        }

        let mut records = match node {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => {
                warn!("{}: no records at {:?}", self.spec.name, self.spec.subpath);
                Vec::new()
            }
            Some(single) => vec![single.clone()],
        };

        for record in records.iter_mut() {
            if !self.spec.strip_keys.is_empty() {
                strip_keys(record, &self.spec.strip_keys);
            }
            translate(record);
        }
        records
    }

    /// The untouched `data` object of the response
    pub async fn raw(&mut self) -> Result<&Value> {
        self.ensure_executed().await?;
        self.state.raw().ok_or(SbrError::RemoteQuery(RemoteQueryError::MissingData))
    }

    /// Translated records; a single object result becomes a one-element list
    pub async fn list(&mut self) -> Result<Vec<Value>> {
        self.ensure_translated().await?;
        Ok(self.state.records().map(<[Value]>::to_vec).unwrap_or_default())
    }

    /// Tabular view of [`Query::list`]
    pub async fn table(&mut self) -> Result<Table> {
        let records = self.list().await?;
        Ok(self.tabulate(records))
    }

    /// Distinct values of the id key, ascending
    pub async fn ids(&mut self) -> Result<Vec<i64>> {
        let Some(id_key) = self.spec.id_key.clone() else {
            return Err(SbrError::InvalidArgument(format!("{} has no id key", self.spec.name)));
        };
        self.ensure_translated().await?;
        let ids: BTreeSet<i64> = self
            .state
            .records()
            .unwrap_or_default()
            .iter()
            .filter_map(|r| r.get(&id_key).and_then(Value::as_i64))
            .collect();
        Ok(ids.into_iter().collect())
    }

    pub(crate) fn tabulate(&self, mut records: Vec<Value>) -> Table {
        expand_sublists(&mut records, &self.spec.sublist_keys);
        Table::from_records(&records)
    }

    /// Augmented records, computed by `augment` on first demand
    ///
    /// A failed augmentation leaves the query Translated.
    pub(crate) async fn augmented<F>(&mut self, augment: F) -> Result<Vec<Value>>
    where
        F: FnOnce(Vec<Value>) -> Result<Vec<Value>>,
    {
        self.ensure_translated().await?;
        let next = match std::mem::replace(&mut self.state, QueryState::Unexecuted) {
            QueryState::Translated { raw, records } => match augment(records.clone()) {
                Ok(augmented) => QueryState::Augmented { raw, records, augmented },
                Err(e) => {
                    self.state = QueryState::Translated { raw, records };
                    return Err(e);
                }
            },
            other => other,
        };
        self.state = next;
        match &self.state {
            QueryState::Augmented { augmented, .. } => Ok(augmented.clone()),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_query(data: Value, spec: QuerySpec) -> (MockServer, Query) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
            .expect(1)
            .mount(&server)
            .await;
        let client = SbrClient::with_endpoint(&server.uri()).unwrap();
        (server, Query::new(client, spec))
    }

    #[test]
    fn test_strip_keys_under_line_wrapper() {
        let keys = vec!["boid".to_string(), "sort".to_string()];
        let mut record = json!({"boid": 1, "eid": 2, "line": {"sort": 3, "ap": -110}});
        strip_keys(&mut record, &keys);
        assert_eq!(record, json!({"eid": 2, "line": {"ap": -110}}));
    }

    #[test]
    fn test_spec_text() {
        let spec = QuerySpec::new("eventGroupsByLeague").fields("{ egid }").arguments("lid: 16");
        let text = spec.text().unwrap();
        assert!(text.contains("eventGroupsByLeague("));
        assert!(text.contains("lid: 16"));
        assert!(text.contains("egid"));
    }

    #[tokio::test]
    async fn test_single_request_and_phases() {
        let data = json!({"eventsByDateNew": {"events": [
            {"eid": 2, "des": "A @ B", "participants": [{"partid": 1}, {"partid": 2}]},
            {"eid": 1, "des": "C @ D"},
            {"eid": 2, "des": "A @ B"}
        ]}});
        let spec = QuerySpec::new("eventsByDateNew")
            .subpath(&["events"])
            .sublists(&["participants"])
            .id_key("event id");
        let (_server, mut query) = mock_query(data, spec).await;

        assert_eq!(query.phase(), QueryPhase::Unexecuted);
        assert!(query.raw().await.unwrap().get("eventsByDateNew").is_some());
        assert_eq!(query.phase(), QueryPhase::Executed);

        let records = query.list().await.unwrap();
        assert_eq!(query.phase(), QueryPhase::Translated);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["description"], json!("A @ B"));

        assert_eq!(query.ids().await.unwrap(), vec![1, 2]);

        let table = query.table().await.unwrap();
        assert_eq!(table.get(0, "participants.2.participant id"), Some(&json!(2)));
        // MockServer verifies the single request on drop
    }

    #[tokio::test]
    async fn test_single_object_is_wrapped() {
        let data = json!({"eventGroupsByLeague": {"egid": 7, "nam": "Week 1"}});
        let (_server, mut query) = mock_query(data, QuerySpec::new("eventGroupsByLeague")).await;
        let records = query.list().await.unwrap();
        assert_eq!(records, vec![json!({"event group id": 7, "name": "Week 1"})]);
        assert!(matches!(query.ids().await, Err(SbrError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_failed_request_stays_unexecuted() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(502)).mount(&server).await;
        let client = SbrClient::with_endpoint(&server.uri()).unwrap();
        let mut query = Query::new(client, QuerySpec::new("eventsV2"));

        assert!(matches!(query.list().await, Err(SbrError::RemoteQuery(RemoteQueryError::Http { status: 502, .. }))));
        assert_eq!(query.phase(), QueryPhase::Unexecuted);
    }

    #[tokio::test]
    async fn test_augmentation_is_memoized() {
        let data = json!({"bestLines": [{"eid": 1}]});
        let (_server, mut query) = mock_query(data, QuerySpec::new("bestLines")).await;

        let first = query
            .augmented(|mut r| {
                r[0]["tag"] = json!("first");
                Ok(r)
            })
            .await
            .unwrap();
        let second = query.augmented(|_| Ok(Vec::new())).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(query.phase(), QueryPhase::Augmented);
        assert_eq!(query.list().await.unwrap(), vec![json!({"event id": 1})]);
    }
}
