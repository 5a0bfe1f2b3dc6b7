//! SportsbookReview Odds Smoke Test CLI
//!
//! Commands:
//! - `connectivity`: Send a trivial query to the odds service
//! - `events`: Fetch a league's events for a date
//! - `lines`: Fetch current lines for a league's events and settle them
//! - `resolve-market`: Resolve market terms against a league's catalogue
//! - `resolve-team`: Resolve team names against a league's team table
//!
//! # Usage
//! ```bash
//! sbr_smoke connectivity
//!
//! # Events of one NFL day, as CSV
//! sbr_smoke events --league nfl --date 2020-09-13 --format csv --out data/events.csv
//!
//! # Spread and first-half total lines at Pinnacle, settled against final scores
//! sbr_smoke lines --league nfl --date 2020-09-13 --market spread --market 1h:o/u --sportsbook pinnacle
//!
//! # Offline lookups
//! sbr_smoke resolve-market --league nba ml "1st half:spread"
//! sbr_smoke resolve-team --league nfl patriots NE
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

use sbr_odds::{League, MarketTerm, ResourceLoader, SbrClient, SbrOdds, Table, TeamTerm, SBR_GRAPHQL_ENDPOINT};

#[derive(Parser)]
#[command(name = "sbr_smoke")]
#[command(about = "SportsbookReview odds smoke test CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// GraphQL endpoint
    #[arg(long, default_value = SBR_GRAPHQL_ENDPOINT, global = true)]
    endpoint: String,

    /// Directory of refreshed reference tables (default: bundled tables)
    #[arg(long, global = true)]
    resources: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Test connectivity to the odds service
    Connectivity,

    /// Fetch a league's events starting within 24 hours of a date
    Events {
        /// League (nfl, nba, mlb, ...)
        #[arg(long)]
        league: String,

        /// Date (YYYY-MM-DD or RFC 3339, default: now)
        #[arg(long)]
        date: Option<String>,

        #[arg(long, value_enum, default_value = "json")]
        format: Format,

        /// Output file (optional, defaults to stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Fetch current lines for a league's events and settle them against scores
    Lines {
        #[arg(long)]
        league: String,

        #[arg(long)]
        date: Option<String>,

        /// Market term: id, alias, or scope:alias. Can specify multiple times.
        #[arg(long, required = true)]
        market: Vec<String>,

        /// Sportsbook name or alias. Can specify multiple times.
        #[arg(long, required = true)]
        sportsbook: Vec<String>,

        #[arg(long, value_enum, default_value = "json")]
        format: Format,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Resolve market terms to market ids
    ResolveMarket {
        #[arg(long)]
        league: String,

        /// Market terms: id, alias, or scope:alias
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Resolve team names to team ids
    ResolveTeam {
        #[arg(long)]
        league: String,

        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();

    let loader = match cli.resources {
        Some(dir) => ResourceLoader::from_dir(dir),
        None => ResourceLoader::Bundled,
    };
    let client = SbrClient::with_endpoint(&cli.endpoint).context("invalid endpoint")?;
    let odds = SbrOdds::with_parts(client, loader);

    match cli.command {
        Commands::Connectivity => run_connectivity(&odds).await,
        Commands::Events { league, date, format, out } => run_events(&odds, &league, date, format, out).await,
        Commands::Lines { league, date, market, sportsbook, format, out } => {
            run_lines(&odds, &league, date, market, sportsbook, format, out).await
        }
        Commands::ResolveMarket { league, terms } => run_resolve_market(&odds, &league, terms),
        Commands::ResolveTeam { league, names } => run_resolve_team(&odds, &league, names),
    }
}

fn parse_date(date: Option<&str>) -> Result<DateTime<Utc>> {
    let Some(s) = date else {
        return Ok(Utc::now());
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Invalid date '{}'", s))?;
    let midnight = day.and_hms_opt(0, 0, 0).with_context(|| format!("Invalid date '{}'", s))?;
    Ok(Utc.from_utc_datetime(&midnight))
}

/// `401`, `spread` or `1st half:spread`
fn parse_market_term(term: &str) -> MarketTerm {
    if let Ok(id) = term.parse::<i64>() {
        return MarketTerm::Id(id);
    }
    match term.split_once(':') {
        Some((scope, alias)) => MarketTerm::from((scope.trim(), alias.trim())),
        None => MarketTerm::from(term),
    }
}

fn parse_team_term(term: &str) -> TeamTerm {
    match term.parse::<i64>() {
        Ok(id) => TeamTerm::Id(id),
        Err(_) => TeamTerm::from(term),
    }
}

async fn write_output(records: &[Value], table: Table, format: Format, out: Option<PathBuf>) -> Result<()> {
    let output = match format {
        Format::Json => serde_json::to_string_pretty(records)?,
        Format::Csv => table.to_csv_string()?,
    };

    if let Some(out_path) = out {
        if let Some(parent) = out_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&out_path, &output).await?;
        info!("Output written to: {}", out_path.display());
    } else {
        println!("{}", output);
    }
    Ok(())
}

async fn run_connectivity(odds: &SbrOdds) -> Result<()> {
    info!("=== Connectivity ===");
    info!("Endpoint: {}", odds.client().endpoint());
    odds.client().test_connectivity().await.context("connectivity check failed")?;
    Ok(())
}

async fn run_events(odds: &SbrOdds, league: &str, date: Option<String>, format: Format, out: Option<PathBuf>) -> Result<()> {
    let league: League = league.parse()?;
    let date = parse_date(date.as_deref())?;

    info!("=== Events ===");
    info!("League: {:?} ({})", league, league.id());
    info!("Date: {}", date);

    let mut query = odds.events_by_date(league.id(), date)?;
    let events = query.list().await.context("events query failed")?;
    info!("Events: {}", events.len());

    let table = query.table().await?;
    write_output(&events, table, format, out).await
}

async fn run_lines(
    odds: &SbrOdds,
    league: &str,
    date: Option<String>,
    markets: Vec<String>,
    sportsbooks: Vec<String>,
    format: Format,
    out: Option<PathBuf>,
) -> Result<()> {
    let league: League = league.parse()?;
    let config = odds.league(league)?;
    let date = parse_date(date.as_deref())?;

    let terms: Vec<MarketTerm> = markets.iter().map(|m| parse_market_term(m)).collect();
    let market_ids = config.market_ids(&terms)?;
    let sportsbook_ids = odds.sportsbook_ids(sportsbooks.as_slice())?;

    info!("=== Lines ===");
    info!("League: {} ({})", config.name, config.league_id);
    info!("Markets: {:?}", market_ids);
    info!("Sportsbooks: {:?}", sportsbook_ids);

    let mut events_query = odds.events_by_date(config.league_id, date)?;
    let event_ids = events_query.ids().await.context("events query failed")?;
    if event_ids.is_empty() {
        warn!("No events for {} on {}", config.name, date);
        return Ok(());
    }
    let events = events_query.list().await?;

    let mut lines_query = odds.current_lines(&event_ids, &market_ids, &sportsbook_ids)?;
    let lines = lines_query.list(Some(&events)).await.context("lines query failed")?;
    let settled = lines.iter().filter(|l| l.get("result").is_some()).count();
    info!("Lines: {} ({} settled)", lines.len(), settled);

    let table = lines_query.table(Some(&events)).await?;
    write_output(&lines, table, format, out).await
}

fn run_resolve_market(odds: &SbrOdds, league: &str, terms: Vec<String>) -> Result<()> {
    let config = odds.league(league.parse()?)?;
    let markets = config.sport();

    for term in &terms {
        let id = config
            .market_ids(&[parse_market_term(term)])?
            .first()
            .copied()
            .context("resolver returned no id")?;
        println!("{} -> {} ({})", term, id, markets.market_name(id).unwrap_or("?"));
    }
    Ok(())
}

fn run_resolve_team(odds: &SbrOdds, league: &str, names: Vec<String>) -> Result<()> {
    let config = odds.league(league.parse()?)?;

    for name in &names {
        let id = config
            .team_ids(&[parse_team_term(name)])?
            .first()
            .copied()
            .context("resolver returned no id")?;
        let team = config.teams().iter().find(|t| t.team_id == id);
        match team {
            Some(t) => println!("{} -> {} ({})", name, id, t.full_name()),
            None => println!("{} -> {}", name, id),
        }
    }
    Ok(())
}
