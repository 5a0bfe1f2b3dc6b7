//! Query objects
//!
//! # Components
//! - `Query`: lazily executed query with raw, list, table and id accessors
//! - `LinesQuery`: a `Query` over betting lines plus the Lines Post-Processor
//! - `SbrOdds`: the catalogue of supported queries

mod base;
mod catalog;
pub mod lines;

pub use base::{strip_keys, Query, QueryPhase, QuerySpec};
pub use catalog::SbrOdds;
pub use lines::{augment_lines, evaluate, profit, BetResult, EventContext, LinesQuery, PeriodScore};
