//! Longitudinal store of daily snapshots and trend analysis over it.
//!
//! Snapshots live in `daily_snapshots.json` inside the data directory. The
//! list only ever grows: collecting twice on the same day appends a second
//! snapshot, and readers use the latest one per date (the "effective"
//! snapshot). Trend analysis fits a least-squares line through each series
//! of effective snapshots.

use crate::analysis::mean;
use crate::models::{
    BubbleReport, DailySnapshot, Direction, IndicatorKind, MarketAssessment, RiskLevel,
};
use crate::utils::write_atomically;
use chrono::{DateTime, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

pub const SNAPSHOTS_FILE: &str = "daily_snapshots.json";

/// Slopes with an absolute value at or below this count as stable.
const STABLE_SLOPE: f64 = 0.01;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    last_updated: DateTime<Local>,
    #[serde(default)]
    snapshots: Vec<DailySnapshot>,
}

/// Least-squares trend over an evenly spaced series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendStats {
    pub direction: Direction,
    pub slope: f64,
    /// Percent change from the first to the last value; 0 when the first is 0.
    pub change_percent: f64,
    pub start_value: f64,
    pub end_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskChange {
    Increased,
    Decreased,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskLevelChange {
    pub start_level: RiskLevel,
    pub end_level: RiskLevel,
    pub change: RiskChange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub period_days: u32,
    pub snapshots_count: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bubble_risk: TrendStats,
    pub sentiment: TrendStats,
    pub concerning_articles: TrendStats,
    pub indicator_trends: BTreeMap<IndicatorKind, TrendStats>,
    /// Sample standard deviation of the daily bubble risk.
    pub bubble_risk_volatility: f64,
    pub latest_assessment: MarketAssessment,
    pub risk_level_change: RiskLevelChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub total_snapshots: usize,
    pub distinct_days: usize,
    pub latest_snapshot: Option<NaiveDate>,
    pub snapshots_file: String,
}

/// Append-only store of [`DailySnapshot`]s backed by `daily_snapshots.json`.
///
/// Every collection run appends one snapshot. Nothing is ever removed or
/// rewritten in place; when a date has several snapshots, the one with the
/// latest timestamp is the effective snapshot for that date.
///
/// # Examples
///
/// ```ignore
/// let mut store = SnapshotStore::open("bubble_data").await?;
/// store.append(SnapshotStore::build_snapshot(&report, 8, Local::now(), "tavily_api")).await?;
/// if let Some(trends) = store.trends(30, Local::now().date_naive()) {
///     println!("{}", trends.bubble_risk.direction);
/// }
/// ```
#[derive(Debug)]
pub struct SnapshotStore {
    snapshots_file: PathBuf,
    snapshots: Vec<DailySnapshot>,
}

impl SnapshotStore {
    /// Open (creating `data_dir` if needed) the snapshot store.
    ///
    /// Unlike the tracker, a corrupt snapshot file is an error: the history
    /// cannot be rebuilt, so it must not be silently overwritten.
    #[instrument(level = "info", skip_all, fields(data_dir = %data_dir.as_ref().display()))]
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).await?;
        let snapshots_file = data_dir.join(SNAPSHOTS_FILE);

        let snapshots = match fs::read_to_string(&snapshots_file).await {
            Ok(raw) => serde_json::from_str::<SnapshotFile>(&raw)
                .map_err(|e| {
                    format!("{} is not a valid snapshot file: {e}", snapshots_file.display())
                })?
                .snapshots,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        info!(count = snapshots.len(), "Loaded snapshots");

        Ok(Self {
            snapshots_file,
            snapshots,
        })
    }

    /// Build a snapshot for `now.date_naive()` from a bubble report.
    ///
    /// # Arguments
    ///
    /// * `report` - The current bubble report over all tracked analyses
    /// * `analyzed_articles` - Articles newly analyzed in this run
    /// * `now` - Snapshot timestamp; its local date becomes the snapshot date
    /// * `data_source` - Label of the search source used for this run
    pub fn build_snapshot(
        report: &BubbleReport,
        analyzed_articles: usize,
        now: DateTime<Local>,
        data_source: &str,
    ) -> DailySnapshot {
        DailySnapshot {
            date: now.date_naive(),
            timestamp: now,
            total_articles: report.total_articles,
            analyzed_articles,
            average_sentiment: report.average_sentiment,
            average_bubble_risk: report.average_bubble_risk,
            market_assessment: report.market_assessment,
            concerning_articles: report.concerning_articles,
            indicator_scores: report.indicator_averages.clone(),
            top_articles: report.individual_analyses.clone(),
            data_source: data_source.to_string(),
        }
    }

    /// Append a snapshot and persist the store.
    #[instrument(level = "info", skip_all, fields(date = %snapshot.date))]
    pub async fn append(&mut self, snapshot: DailySnapshot) -> Result<(), Box<dyn Error>> {
        if self.by_date(snapshot.date).is_some() {
            warn!("A snapshot for this date already exists; the new one supersedes it");
        }
        self.snapshots.push(snapshot);
        self.save().await?;
        info!(total = self.snapshots.len(), "Snapshot appended");
        Ok(())
    }

    async fn save(&self) -> Result<(), Box<dyn Error>> {
        let file = SnapshotFile {
            last_updated: Local::now(),
            snapshots: self.snapshots.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        write_atomically(&self.snapshots_file, json.as_bytes()).await
    }

    /// The latest-timestamp snapshot per date, sorted by date.
    pub fn effective(&self) -> Vec<&DailySnapshot> {
        let mut by_date: BTreeMap<NaiveDate, &DailySnapshot> = BTreeMap::new();
        for snapshot in &self.snapshots {
            let newer = by_date
                .get(&snapshot.date)
                .is_none_or(|prev| snapshot.timestamp >= prev.timestamp);
            if newer {
                by_date.insert(snapshot.date, snapshot);
            }
        }
        by_date.into_values().collect()
    }

    pub fn by_date(&self, date: NaiveDate) -> Option<&DailySnapshot> {
        self.effective().into_iter().find(|s| s.date == date)
    }

    /// Effective snapshots with `start <= date <= end`.
    pub fn in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<&DailySnapshot> {
        self.effective()
            .into_iter()
            .filter(|s| s.date >= start && s.date <= end)
            .collect()
    }

    /// Effective snapshots from the last `days` days up to and including `today`.
    pub fn latest(&self, days: u32, today: NaiveDate) -> Vec<&DailySnapshot> {
        self.in_range(window_start(days, today), today)
    }

    /// Trend analysis over the last `days` days.
    ///
    /// # Returns
    ///
    /// `None` when the window holds fewer than two effective snapshots,
    /// otherwise a [`TrendReport`] with a least-squares trend per series.
    pub fn trends(&self, days: u32, today: NaiveDate) -> Option<TrendReport> {
        let window = self.latest(days, today);
        if window.len() < 2 {
            return None;
        }
        let first = window.first()?;
        let last = window.last()?;

        let risk: Vec<f64> = window.iter().map(|s| s.average_bubble_risk).collect();
        let sentiment: Vec<f64> = window.iter().map(|s| s.average_sentiment).collect();
        let concerning: Vec<f64> = window.iter().map(|s| s.concerning_articles as f64).collect();

        let mut indicator_trends = BTreeMap::new();
        for kind in IndicatorKind::ALL {
            let values: Vec<f64> = window
                .iter()
                .map(|s| s.indicator_scores.get(&kind).copied().unwrap_or(0.0))
                .collect();
            indicator_trends.insert(kind, linear_trend(&values)?);
        }

        Some(TrendReport {
            period_days: days,
            snapshots_count: window.len(),
            start_date: first.date,
            end_date: last.date,
            bubble_risk: linear_trend(&risk)?,
            sentiment: linear_trend(&sentiment)?,
            concerning_articles: linear_trend(&concerning)?,
            indicator_trends,
            bubble_risk_volatility: volatility(&risk),
            latest_assessment: last.market_assessment,
            risk_level_change: risk_level_change(
                first.average_bubble_risk,
                last.average_bubble_risk,
            ),
        })
    }

    pub fn status(&self) -> StoreStatus {
        let effective = self.effective();
        StoreStatus {
            total_snapshots: self.snapshots.len(),
            distinct_days: effective.len(),
            latest_snapshot: effective.last().map(|s| s.date),
            snapshots_file: self.snapshots_file.display().to_string(),
        }
    }
}

/// First date of a `days`-long window ending at `today`.
///
/// Saturates at the earliest representable date instead of overflowing.
pub fn window_start(days: u32, today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(days.into()))
        .unwrap_or(NaiveDate::MIN)
}

/// Least-squares slope over `x = 0..n`; `None` for fewer than two values.
pub fn linear_trend(values: &[f64]) -> Option<TrendStats> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(values.iter().copied());

    let (numerator, denominator) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    let slope = if denominator != 0.0 { numerator / denominator } else { 0.0 };

    let start_value = values[0];
    let end_value = values[values.len() - 1];
    let change_percent = if start_value != 0.0 {
        (end_value - start_value) / start_value * 100.0
    } else {
        0.0
    };

    let direction = if slope > STABLE_SLOPE {
        Direction::Increasing
    } else if slope < -STABLE_SLOPE {
        Direction::Decreasing
    } else {
        Direction::Stable
    };

    Some(TrendStats {
        direction,
        slope,
        change_percent,
        start_value,
        end_value,
    })
}

/// Sample standard deviation; 0 for fewer than two values.
pub fn volatility(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values.iter().copied());
    let variance = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Compare the risk levels of two bubble risk scores.
///
/// Levels are ordered `LOW < MODERATE < HIGH`, so moving from MODERATE to
/// HIGH is an increase.
pub fn risk_level_change(start_risk: f64, end_risk: f64) -> RiskLevelChange {
    let start_level = RiskLevel::from_score(start_risk);
    let end_level = RiskLevel::from_score(end_risk);
    let change = match end_level.cmp(&start_level) {
        std::cmp::Ordering::Greater => RiskChange::Increased,
        std::cmp::Ordering::Less => RiskChange::Decreased,
        std::cmp::Ordering::Equal => RiskChange::Stable,
    };
    RiskLevelChange {
        start_level,
        end_level,
        change,
    }
}
