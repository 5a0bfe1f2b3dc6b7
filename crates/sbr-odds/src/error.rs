//! Error taxonomy for the odds client
//!
//! Fatal errors (missing reference data, bad templates, bad arguments) surface
//! immediately. Remote failures are wrapped without retry. Derived fields that
//! cannot be computed never produce an error; they are simply left out.

use thiserror::Error;

/// Failure reported by the remote GraphQL service or the HTTP layer under it
#[derive(Debug, Error)]
pub enum RemoteQueryError {
    /// Network failure, TLS failure, or an undecodable body
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The service answered with a GraphQL `errors` array
    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    /// The response had neither `data` nor `errors`
    #[error("response is missing the `data` object")]
    MissingData,
}

#[derive(Debug, Error)]
pub enum SbrError {
    /// A named reference table does not exist
    #[error("reference resource not found: {name}")]
    ConfigNotFound { name: String },

    /// A named reference table exists but could not be parsed
    #[error("failed to parse reference resource {name}: {source}")]
    ConfigParse {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Placeholder substitution referenced a name that was not supplied
    #[error("template error: {0}")]
    Template(String),

    #[error("remote query failed: {0}")]
    RemoteQuery(#[from] RemoteQueryError),

    #[error("could not find market {0}")]
    MarketNotFound(String),

    #[error("could not find team {0}")]
    TeamNotFound(String),

    #[error("could not find sportsbook {0}")]
    SportsbookNotFound(String),

    #[error("no reference configuration for league {0}")]
    UnknownLeague(String),

    /// Caller passed a value of the wrong shape; raised before any remote call
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("tabular export failed: {0}")]
    Export(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, SbrError>;

impl From<reqwest::Error> for SbrError {
    fn from(e: reqwest::Error) -> Self {
        SbrError::RemoteQuery(RemoteQueryError::Transport(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_errors_are_joined() {
        let err = SbrError::from(RemoteQueryError::GraphQl(vec![
            "Cannot query field \"foo\"".to_string(),
            "Syntax Error".to_string(),
        ]));
        let msg = err.to_string();
        assert!(msg.starts_with("remote query failed"));
        assert!(msg.contains("Cannot query field \"foo\"; Syntax Error"));
    }

    #[test]
    fn test_lookup_errors_echo_input() {
        assert_eq!(
            SbrError::TeamNotFound("nonexistent team".into()).to_string(),
            "could not find team nonexistent team"
        );
        assert!(SbrError::MarketNotFound("(\"1st half\", \"foo\")".into())
            .to_string()
            .contains("1st half"));
    }
}
