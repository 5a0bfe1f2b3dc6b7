//! Query Executor
//!
//! POSTs literal GraphQL text to the odds service and hands back the `data`
//! object. No retries and no timeout policy of our own: failures surface as
//! `RemoteQueryError` and the HTTP client's defaults apply.
//!
//! # Wire format
//! - Request: `{"query": "<text>"}`
//! - Response: `{"data": {...}}` or `{"errors": [{"message": "..."}]}`

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::error::{RemoteQueryError, Result, SbrError};
use crate::SBR_GRAPHQL_ENDPOINT;

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

/// GraphQL client for the odds service
#[derive(Clone)]
pub struct SbrClient {
    client: Client,
    endpoint: String,
}

impl SbrClient {
    /// Create a client pointed at the public endpoint
    pub fn new() -> Result<Self> {
        Self::with_endpoint(SBR_GRAPHQL_ENDPOINT)
    }

    /// Create a client with a custom endpoint (tests, proxies)
    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        let parsed = Url::parse(endpoint)
            .map_err(|e| SbrError::InvalidArgument(format!("endpoint '{}': {}", endpoint, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SbrError::InvalidArgument(format!(
                "endpoint '{}' must be http or https",
                endpoint
            )));
        }

        let client = Client::builder().gzip(true).build()?;

        Ok(Self { client, endpoint: endpoint.trim_end_matches('/').to_string() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send query text and return the parsed `data` object
    pub async fn execute(&self, query: &str) -> Result<Value> {
        debug!("POST {}\n{}", self.endpoint, query);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&GraphQlRequest { query })
            .send()
            .await
            .map_err(RemoteQueryError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteQueryError::Http { status: status.as_u16(), body }.into());
        }

        let body: GraphQlResponse = response.json().await.map_err(RemoteQueryError::Transport)?;

        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            return Err(RemoteQueryError::GraphQl(errors.into_iter().map(|e| e.message).collect()).into());
        }

        match body.data {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(RemoteQueryError::MissingData.into()),
        }
    }

    /// Test connectivity with a trivial introspection query
    pub async fn test_connectivity(&self) -> Result<()> {
        info!("Testing connectivity to {}", self.endpoint);
        self.execute("query { __typename }").await?;
        info!("Connectivity: OK");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_creation() {
        let client = SbrClient::new();
        assert!(client.is_ok());
    }

    #[test]
    fn test_custom_endpoint() {
        let client = SbrClient::with_endpoint("https://example.com/graphql/").unwrap();
        assert_eq!(client.endpoint(), "https://example.com/graphql");
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        assert!(matches!(SbrClient::with_endpoint("not a url"), Err(SbrError::InvalidArgument(_))));
        assert!(matches!(
            SbrClient::with_endpoint("ftp://example.com"),
            Err(SbrError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_execute_returns_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({"query": "query { a }"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"a": 1}})))
            .mount(&server)
            .await;

        let client = SbrClient::with_endpoint(&server.uri()).unwrap();
        let data = client.execute("query { a }").await.unwrap();
        assert_eq!(data, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_execute_graphql_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{"message": "Syntax Error: Unexpected Name"}],
                "data": null
            })))
            .mount(&server)
            .await;

        let client = SbrClient::with_endpoint(&server.uri()).unwrap();
        let err = client.execute("query { ").await.unwrap_err();
        match err {
            SbrError::RemoteQuery(RemoteQueryError::GraphQl(msgs)) => {
                assert_eq!(msgs, vec!["Syntax Error: Unexpected Name".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_execute_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = SbrClient::with_endpoint(&server.uri()).unwrap();
        let err = client.execute("query { a }").await.unwrap_err();
        assert!(matches!(
            err,
            SbrError::RemoteQuery(RemoteQueryError::Http { status: 502, ref body }) if body == "bad gateway"
        ));
    }

    #[tokio::test]
    async fn test_execute_missing_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = SbrClient::with_endpoint(&server.uri()).unwrap();
        let err = client.execute("query { a }").await.unwrap_err();
        assert!(matches!(err, SbrError::RemoteQuery(RemoteQueryError::MissingData)));
    }

    #[test]
    fn test_connectivity_blocking() {
        tokio_test::block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"__typename": "Query"}})))
                .mount(&server)
                .await;

            let client = SbrClient::with_endpoint(&server.uri()).unwrap();
            tokio_test::assert_ok!(client.test_connectivity().await);
        });
    }
}
