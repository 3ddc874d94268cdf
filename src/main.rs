//! # Bubble Watch
//!
//! Tracks news coverage of the AI market and scores it for signs of a
//! speculative bubble.
//!
//! ## Features
//!
//! - Searches news through the Tavily API or the Google News RSS feed
//! - Keeps the top-N most relevant articles in a JSON tracker store
//! - Scores each article on five keyword-derived bubble indicators plus a
//!   lexicon sentiment, and aggregates them into a bubble report
//! - Appends one snapshot per daily run to a longitudinal store and
//!   analyzes trends across snapshots
//! - Writes CSV exports for dashboard tools and prints Markdown reports
//!
//! ## Usage
//!
//! ```sh
//! bubble_watch collect-daily
//! bubble_watch trends --days 14
//! ```
//!
//! ## Architecture
//!
//! 1. **Search**: Run each query against the selected source (with retry)
//! 2. **Track**: Merge results into the tracker, keep the top N by score
//! 3. **Analyze**: Score unanalyzed articles and build the bubble report
//! 4. **Snapshot**: Append the day's aggregate to the snapshot store
//! 5. **Output**: CSV exports, `bubble_report.json` and Markdown on stdout

use chrono::{DateTime, Local};
use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analysis;
mod cli;
mod config;
mod lexicon;
mod models;
mod outputs;
mod search;
mod timeseries;
mod tracker;
mod utils;

use analysis::BubbleAnalyzer;
use cli::{Cli, Command, SourceKind};
use config::{Settings, preview_secret};
use models::{BubbleReport, DailySnapshot};
use outputs::{dashboard, json, markdown};
use search::google_news::GoogleNewsRss;
use search::tavily::TavilySearcher;
use search::{NewsSource, RetrySearch, SearchSource, collect_news};
use timeseries::{SnapshotStore, TrendReport, window_start};
use tracker::{NewsTracker, TRACKED_NEWS_FILE};
use utils::{ensure_writable_dir, truncate_for_log};

/// Data source label for snapshots built without a fresh search.
const TRACKED_ONLY_SOURCE: &str = "tracked_news";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    // .env must be loaded before clap reads TAVILY_API_KEY
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "Loaded .env");
    }

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(
        data_dir = %args.data_dir,
        source = ?args.source,
        command = ?args.command,
        "Parsed CLI arguments"
    );

    let settings = Settings::load(args.config.as_deref()).await?;
    let data_dir = PathBuf::from(&args.data_dir);

    if let Err(e) = ensure_writable_dir(&data_dir).await {
        error!(
            path = %data_dir.display(),
            error = %e,
            "Data directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let analyzer = BubbleAnalyzer::new();
    let tracker_file = data_dir.join(TRACKED_NEWS_FILE);
    let mut tracker = NewsTracker::load(tracker_file, settings.max_tracked_articles).await;

    match args.command {
        Command::Search { ref queries } => {
            let queries = if queries.is_empty() {
                settings.queries.clone()
            } else {
                queries.clone()
            };
            let source = build_source(&args, &settings)?;
            let now = Local::now();
            search_and_track(&source, &queries, &settings, &mut tracker, now).await?;
            tracker.analyze(&analyzer, false, now).await?;
            write_outputs(&tracker, &analyzer, &data_dir, &data_dir.join("exports"), now).await?;
            print_report(tracker.bubble_report(&analyzer, now).as_ref());
        }
        Command::Analyze { force } => {
            let outcome = tracker.analyze(&analyzer, force, Local::now()).await?;
            println!(
                "Analyzed {} article(s); {} tracked article(s) have an analysis.",
                outcome.analyzed_count, outcome.total_analyses
            );
        }
        Command::Report { ref output } => {
            let Some(report) = tracker.bubble_report(&analyzer, Local::now()) else {
                println!("No analyzed articles yet. Run `bubble_watch search` first.");
                return Ok(());
            };
            json::write_report(&report, &data_dir).await?;
            let md = markdown::report_to_markdown(&report);
            if let Some(path) = output {
                tokio::fs::write(path, &md).await?;
                info!(%path, "Wrote Markdown report");
            }
            print!("{md}");
        }
        Command::Export { ref out_dir } => {
            let out_dir = out_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("exports"));
            let summary =
                write_outputs(&tracker, &analyzer, &data_dir, &out_dir, Local::now()).await?;
            println!(
                "Exported {} article row(s) to {} and {} indicator row(s) to {}.",
                summary.articles_rows,
                summary.articles_file.display(),
                summary.indicators_rows,
                summary.indicators_file.display()
            );
        }
        Command::ExportTimeSeries { days } => {
            let store = SnapshotStore::open(&data_dir).await?;
            let snapshots = store.latest(days, Local::now().date_naive());
            let (path, rows) = dashboard::write_time_series(&snapshots, days, &data_dir).await?;
            println!(
                "Exported {} snapshot(s) as {rows} row(s) to {}.",
                snapshots.len(),
                path.display()
            );
        }
        Command::CollectDaily {
            skip_search,
            force,
            days,
        } => {
            let source = if skip_search {
                None
            } else {
                Some(build_source(&args, &settings)?)
            };
            let run = collect_daily(
                source.as_ref(),
                &settings,
                &mut tracker,
                &analyzer,
                &data_dir,
                force,
                days,
                Local::now(),
            )
            .await?;
            println!(
                "Recorded snapshot for {} from {}; time series has {} row(s).\n",
                run.snapshot.date, run.snapshot.data_source, run.time_series_rows
            );
            match &run.trends {
                Some(trends) => print!("{}", markdown::trends_to_markdown(trends)),
                None => print_report(Some(&run.report)),
            }
        }
        Command::Trends { days } => {
            let store = SnapshotStore::open(&data_dir).await?;
            match store.trends(days, Local::now().date_naive()) {
                Some(trends) => print!("{}", markdown::trends_to_markdown(&trends)),
                None => println!(
                    "Not enough snapshots for trend analysis \
                     (need at least 2 in the last {days} days)."
                ),
            }
        }
        Command::History { days, start, end } => {
            let today = Local::now().date_naive();
            let (start, end) = match start {
                Some(start) => (start, end.unwrap_or(today)),
                None => (window_start(days, today), today),
            };
            if start > end {
                return Err(format!("--start {start} is after --end {end}").into());
            }
            let store = SnapshotStore::open(&data_dir).await?;
            let snapshots = store.in_range(start, end);
            print!("{}", markdown::history_to_markdown(&snapshots, start, end));
        }
        Command::Status => {
            let store = SnapshotStore::open(&data_dir).await?;
            print!(
                "{}",
                markdown::status_to_markdown(&tracker.status(), &store.status())
            );
        }
        Command::Clean { days } => {
            let removed = tracker.remove_older_than(days, Local::now()).await?;
            println!("Removed {removed} article(s) older than {days} day(s).");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Build the selected search source wrapped in retries.
fn build_source(args: &Cli, settings: &Settings) -> Result<NewsSource, Box<dyn Error>> {
    let client = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(60))
        .build()?;

    let source = match args.source {
        SourceKind::Tavily => {
            let api_key = args
                .tavily_api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or(
                    "TAVILY_API_KEY is not set \
                     (use --tavily-api-key, the environment, or --source google-news)",
                )?;
            info!(
                api_key = %preview_secret(&api_key),
                depth = %settings.search_depth,
                "Using Tavily search"
            );
            NewsSource::Tavily(RetrySearch::new(
                TavilySearcher::new(api_key, client, settings.search_depth.clone()),
                settings.max_retries,
                settings.retry_base_delay(),
            ))
        }
        SourceKind::GoogleNews => {
            info!("Using Google News RSS search");
            NewsSource::GoogleNews(RetrySearch::new(
                GoogleNewsRss::new(client),
                settings.max_retries,
                settings.retry_base_delay(),
            ))
        }
    };
    Ok(source)
}

#[instrument(level = "info", skip_all, fields(source = source.name()))]
async fn search_and_track<S: SearchSource>(
    source: &S,
    queries: &[String],
    settings: &Settings,
    tracker: &mut NewsTracker,
    now: DateTime<Local>,
) -> Result<(), Box<dyn Error>> {
    let articles = collect_news(
        source,
        queries,
        settings.max_results_per_query,
        settings.request_delay(),
    )
    .await;
    if articles.is_empty() {
        warn!("Search returned no articles; tracker left unchanged");
        return Ok(());
    }
    let outcome = tracker.add_articles(articles, now).await?;
    info!(
        added = outcome.added_articles,
        tracked = outcome.total_tracked,
        "Tracker updated"
    );
    if let Some(top) = tracker.articles().first() {
        debug!(
            title = %truncate_for_log(&top.title, 80),
            score = top.score,
            "Top tracked article"
        );
    }
    Ok(())
}

/// Write `bubble_report.json` (when there is a report) and the dashboard
/// CSVs.
async fn write_outputs(
    tracker: &NewsTracker,
    analyzer: &BubbleAnalyzer,
    data_dir: &Path,
    exports_dir: &Path,
    now: DateTime<Local>,
) -> Result<dashboard::ExportSummary, Box<dyn Error>> {
    let report = tracker.bubble_report(analyzer, now);
    if let Some(report) = &report {
        json::write_report(report, data_dir).await?;
    }
    let records = tracker.indicator_records(analyzer);
    dashboard::write_dashboard_exports(report.as_ref(), &records, exports_dir).await
}

fn print_report(report: Option<&BubbleReport>) {
    match report {
        Some(report) => print!("{}", markdown::report_to_markdown(report)),
        None => println!("No analyzed articles yet."),
    }
}

/// What one daily collection run produced.
#[derive(Debug)]
struct DailyRun {
    report: BubbleReport,
    snapshot: DailySnapshot,
    time_series_rows: usize,
    /// `None` until the window holds two snapshots.
    trends: Option<TrendReport>,
}

/// Run the daily pipeline: search, track, analyze, snapshot, export.
///
/// # Arguments
///
/// * `source` - Search source, or `None` to reuse the tracked articles as-is
/// * `force` - Re-analyze articles that already carry an analysis
/// * `days` - Window for the time-series export and the trend summary
/// * `now` - Run time; its local date becomes the snapshot date
///
/// # Returns
///
/// The bubble report, the appended snapshot, the time-series row count and
/// the trend report over the window.
///
/// # Errors
///
/// Fails before any search when the snapshot store cannot be opened, and
/// after analysis when no tracked article has an analysis.
#[allow(clippy::too_many_arguments)]
#[instrument(level = "info", skip_all, fields(force = force, days = days))]
async fn collect_daily<S: SearchSource>(
    source: Option<&S>,
    settings: &Settings,
    tracker: &mut NewsTracker,
    analyzer: &BubbleAnalyzer,
    data_dir: &Path,
    force: bool,
    days: u32,
    now: DateTime<Local>,
) -> Result<DailyRun, Box<dyn Error>> {
    let mut store = SnapshotStore::open(data_dir).await?;

    let data_source = match source {
        Some(source) => {
            search_and_track(source, &settings.queries, settings, tracker, now).await?;
            source.name()
        }
        None => TRACKED_ONLY_SOURCE,
    };

    let analyzed = tracker.analyze(analyzer, force, now).await?;
    let Some(report) = tracker.bubble_report(analyzer, now) else {
        return Err("no analyzed articles; nothing to snapshot".into());
    };

    let snapshot =
        SnapshotStore::build_snapshot(&report, analyzed.analyzed_count, now, data_source);
    info!(
        date = %snapshot.date,
        assessment = %snapshot.market_assessment,
        bubble_risk = snapshot.average_bubble_risk,
        sentiment = snapshot.average_sentiment,
        concerning = snapshot.concerning_articles,
        "Daily snapshot collected"
    );
    store.append(snapshot.clone()).await?;

    write_outputs(tracker, analyzer, data_dir, &data_dir.join("exports"), now).await?;

    let today = now.date_naive();
    let window = store.latest(days, today);
    let (path, time_series_rows) = dashboard::write_time_series(&window, days, data_dir).await?;
    info!(path = %path.display(), rows = time_series_rows, "Time-series export written");

    let trends = store.trends(days, today);
    match &trends {
        Some(trends) => info!(
            direction = %trends.bubble_risk.direction,
            change_percent = trends.bubble_risk.change_percent,
            volatility = trends.bubble_risk_volatility,
            "Bubble risk trend"
        ),
        None => warn!("Not enough snapshots for trend analysis yet"),
    }

    Ok(DailyRun {
        report,
        snapshot,
        time_series_rows,
        trends,
    })
}
