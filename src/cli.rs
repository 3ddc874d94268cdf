//! Command-line interface definitions for Bubble Watch.
//!
//! Global options can be provided via command-line flags or environment
//! variables; each subcommand runs one stage (or the whole daily run) of the
//! pipeline.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for the Bubble Watch application.
///
/// # Examples
///
/// ```sh
/// # Search, analyze and export with the configured queries
/// bubble_watch search
///
/// # Daily run against Google News (no API key needed)
/// bubble_watch --source google-news collect-daily
///
/// # Two-week trend report
/// bubble_watch -d ./bubble_data trends --days 14
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding the tracker, snapshot store and exports
    #[arg(short, long, global = true, default_value = "bubble_data")]
    pub data_dir: String,

    /// Optional path to a config.yaml file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Tavily API key
    #[arg(long, env = "TAVILY_API_KEY", global = true, hide_env_values = true)]
    pub tavily_api_key: Option<String>,

    /// News search backend
    #[arg(long, value_enum, global = true, default_value_t = SourceKind::Tavily)]
    pub source: SourceKind,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Tavily,
    GoogleNews,
}

/// Longest accepted `--days` window (about ten years).
const MAX_DAYS: i64 = 3650;

fn days_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=MAX_DAYS)
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Search for news, merge into the tracker, analyze and export
    Search {
        /// Queries to run instead of the configured ones
        #[arg(short, long, num_args = 1..)]
        queries: Vec<String>,
    },
    /// Analyze tracked articles
    Analyze {
        /// Re-analyze articles that already have an analysis
        #[arg(long)]
        force: bool,
    },
    /// Print the bubble report and write bubble_report.json
    Report {
        /// Also write the Markdown report to this file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Write the dashboard CSV exports
    Export {
        /// Output directory (default: <data-dir>/exports)
        #[arg(long)]
        out_dir: Option<String>,
    },
    /// Write time_series_<days>d.csv from the snapshot store
    ExportTimeSeries {
        #[arg(long, default_value_t = 30, value_parser = days_parser())]
        days: u32,
    },
    /// Run the daily collection: search, analyze, snapshot, export
    CollectDaily {
        /// Use the articles already tracked instead of searching
        #[arg(long)]
        skip_search: bool,
        /// Re-analyze articles that already have an analysis
        #[arg(long)]
        force: bool,
        /// Window for the time-series export and trend summary
        #[arg(long, default_value_t = 30, value_parser = days_parser())]
        days: u32,
    },
    /// Print trend analysis over recent snapshots
    Trends {
        #[arg(long, default_value_t = 30, value_parser = days_parser())]
        days: u32,
    },
    /// Print daily snapshots for the last N days or an explicit date range
    History {
        #[arg(long, default_value_t = 30, value_parser = days_parser())]
        days: u32,
        /// First date (YYYY-MM-DD); overrides --days
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last date (YYYY-MM-DD, default: today)
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
    },
    /// Print tracker and snapshot store status
    Status,
    /// Remove tracked articles older than the given number of days
    Clean {
        #[arg(long, default_value_t = 7, value_parser = days_parser())]
        days: u32,
    },
}
