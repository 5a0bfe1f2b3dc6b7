//! GraphQL plumbing
//!
//! # Components
//! - `builder`: argument substitution and query text assembly
//! - `SbrClient`: HTTP executor for the odds service

pub mod builder;
mod client;

pub use builder::{build_arguments, build_query, str_format};
pub use client::SbrClient;
