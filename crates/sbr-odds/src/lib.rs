//! SportsbookReview Odds Client
//!
//! Queries the SportsbookReview odds GraphQL service and hands back records
//! with readable keys:
//! - `config`: bundled sport, league, team, market and sportsbook tables, and
//!   the resolvers turning human terms into service ids
//! - `graphql`: query text assembly and the HTTP executor
//! - `translate`: field-tag renaming and timestamp formatting
//! - `query`: lazily executed query objects, the query catalogue and the
//!   lines post-processor (market names, bet settlement, profit)
//! - `table`: flattened tabular view with CSV export
//!
//! # Example
//! ```no_run
//! # async fn run() -> sbr_odds::Result<()> {
//! use sbr_odds::{League, MarketTerm, SbrOdds};
//!
//! let odds = SbrOdds::new()?;
//! let nfl = odds.league(League::Nfl)?;
//! let markets = nfl.market_ids(&[MarketTerm::from("spread"), MarketTerm::from(("1h", "o/u"))])?;
//!
//! let mut events = odds.events_by_date(nfl.league_id, chrono::Utc::now())?;
//! let event_list = events.list().await?;
//! let mut lines = odds.current_lines(&events.ids().await?, &markets, &odds.sportsbook_ids(&["pinnacle"])?)?;
//! for line in lines.list(Some(&event_list)).await? {
//!     println!("{}", line);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod graphql;
pub mod query;
pub mod table;
pub mod translate;

pub use config::{League, LeagueConfig, MarketTerm, ResourceLoader, Sport, SportConfig, Sportsbooks, TeamTerm};
pub use error::{RemoteQueryError, Result, SbrError};
pub use graphql::SbrClient;
pub use query::{LinesQuery, Query, SbrOdds};
pub use table::Table;

/// Odds service GraphQL endpoint
pub const SBR_GRAPHQL_ENDPOINT: &str = "https://www.sportsbookreview.com/ms-odds-v2/odds-v2-service";
