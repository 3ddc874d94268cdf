//! CSV exports for dashboard tools.
//!
//! # Output Structure
//!
//! ```text
//! <data-dir>/exports/
//! ├── articles_data.csv        # one row per analyzed article
//! ├── indicators_data.csv      # one row per article × indicator
//! └── summary_metrics.csv      # report KPIs
//! <data-dir>/
//! └── time_series_30d.csv      # one row per snapshot × indicator, plus a summary row
//! ```
//!
//! Rows are serialized with `csv` into memory and written in one go. An
//! empty record set produces an empty file (no header).

use crate::models::{BubbleReport, DailySnapshot, IndicatorKind, IndicatorRecord};
use itertools::Itertools;
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const ARTICLES_CSV: &str = "articles_data.csv";
pub const INDICATORS_CSV: &str = "indicators_data.csv";
pub const SUMMARY_CSV: &str = "summary_metrics.csv";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleRecord {
    pub article_id: u64,
    pub title: String,
    pub url: String,
    pub analysis_date: String,
    pub sentiment_score: f64,
    pub overall_bubble_risk: f64,
    pub market_impact: String,
    pub key_phrases_count: usize,
}

impl From<&IndicatorRecord> for ArticleRecord {
    fn from(r: &IndicatorRecord) -> Self {
        Self {
            article_id: r.article_id,
            title: r.title.clone(),
            url: r.url.clone(),
            analysis_date: r.analysis_date.clone(),
            sentiment_score: r.sentiment_score,
            overall_bubble_risk: r.overall_bubble_risk,
            market_impact: r.market_impact.clone(),
            key_phrases_count: r.key_phrases_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Indicator,
    Summary,
}

/// One row of the time-series export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesRecord {
    pub timestamp: String,
    pub date: String,
    pub total_articles: usize,
    pub analyzed_articles: usize,
    pub average_sentiment: f64,
    pub average_bubble_risk: f64,
    pub concerning_articles: usize,
    pub market_assessment: String,
    /// An indicator name, or `summary` for the per-snapshot summary row.
    pub indicator_name: String,
    pub indicator_value: f64,
    pub metric_type: MetricType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetric {
    pub metric_name: String,
    pub metric_value: String,
    pub metric_type: &'static str,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub articles_file: PathBuf,
    pub articles_rows: usize,
    pub indicators_file: PathBuf,
    pub indicators_rows: usize,
    pub summary_file: Option<PathBuf>,
}

/// First record per article id, in record order.
pub fn article_records(records: &[IndicatorRecord]) -> Vec<ArticleRecord> {
    records
        .iter()
        .unique_by(|r| r.article_id)
        .map(ArticleRecord::from)
        .collect()
}

pub fn time_series_records(snapshots: &[&DailySnapshot]) -> Vec<TimeSeriesRecord> {
    let mut rows = Vec::new();
    for s in snapshots {
        let base = |indicator_name: String, indicator_value: f64, metric_type| TimeSeriesRecord {
            timestamp: s.timestamp.to_rfc3339(),
            date: s.date.to_string(),
            total_articles: s.total_articles,
            analyzed_articles: s.analyzed_articles,
            average_sentiment: s.average_sentiment,
            average_bubble_risk: s.average_bubble_risk,
            concerning_articles: s.concerning_articles,
            market_assessment: s.market_assessment.to_string(),
            indicator_name,
            indicator_value,
            metric_type,
        };
        for (kind, value) in &s.indicator_scores {
            rows.push(base(kind.to_string(), *value, MetricType::Indicator));
        }
        rows.push(base("summary".to_string(), s.average_bubble_risk, MetricType::Summary));
    }
    rows
}

pub fn summary_metrics(report: &BubbleReport) -> Vec<SummaryMetric> {
    let metric = |name: &str, value: String, kind, description: &str| SummaryMetric {
        metric_name: name.to_string(),
        metric_value: value,
        metric_type: kind,
        description: description.to_string(),
    };
    let mut rows = vec![
        metric(
            "Total Articles",
            report.total_articles.to_string(),
            "count",
            "Total number of analyzed articles",
        ),
        metric(
            "Average Sentiment",
            report.average_sentiment.to_string(),
            "score",
            "Average sentiment score across all articles",
        ),
        metric(
            "Average Bubble Risk",
            report.average_bubble_risk.to_string(),
            "score",
            "Average bubble risk score across all articles",
        ),
        metric(
            "Concerning Articles",
            report.concerning_articles.to_string(),
            "count",
            "Number of articles with bubble risk above 0.6",
        ),
        metric(
            "Market Assessment",
            report.market_assessment.to_string(),
            "text",
            "Overall market assessment based on analysis",
        ),
    ];
    for kind in IndicatorKind::ALL {
        if let Some(value) = report.indicator_averages.get(&kind) {
            rows.push(SummaryMetric {
                metric_name: format!("{} Average", indicator_title(kind)),
                metric_value: value.to_string(),
                metric_type: "score",
                description: format!("Average {kind} score across all articles"),
            });
        }
    }
    rows
}

/// `hype_level` -> `Hype Level`
pub(crate) fn indicator_title(kind: IndicatorKind) -> String {
    kind.as_str()
        .split('_')
        .map(crate::utils::upcase)
        .join(" ")
}

fn to_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

async fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let bytes = to_csv(rows)?;
    fs::write(path, bytes).await?;
    info!(path = %path.display(), rows = rows.len(), "Wrote CSV");
    Ok(())
}

/// Write the articles, indicators and (when a report exists) summary CSVs
/// into `out_dir`.
#[instrument(level = "info", skip_all, fields(out_dir = %out_dir.display()))]
pub async fn write_dashboard_exports(
    report: Option<&BubbleReport>,
    records: &[IndicatorRecord],
    out_dir: &Path,
) -> Result<ExportSummary, Box<dyn Error>> {
    fs::create_dir_all(out_dir).await?;

    let articles = article_records(records);
    let articles_file = out_dir.join(ARTICLES_CSV);
    write_csv(&articles_file, &articles).await?;

    let indicators_file = out_dir.join(INDICATORS_CSV);
    write_csv(&indicators_file, records).await?;

    let summary_file = match report {
        Some(report) => {
            let path = out_dir.join(SUMMARY_CSV);
            write_csv(&path, &summary_metrics(report)).await?;
            Some(path)
        }
        None => None,
    };

    Ok(ExportSummary {
        articles_file,
        articles_rows: articles.len(),
        indicators_file,
        indicators_rows: records.len(),
        summary_file,
    })
}

/// Write the time-series export for a window of snapshots.
///
/// # Arguments
///
/// * `snapshots` - Effective snapshots in date order
/// * `days` - Window length, used in the file name `time_series_{days}d.csv`
/// * `data_dir` - Directory the file is written into
///
/// # Returns
///
/// The path of the written file and its row count (six rows per snapshot:
/// one per indicator plus the summary row).
#[instrument(level = "info", skip_all, fields(days = days, data_dir = %data_dir.display()))]
pub async fn write_time_series(
    snapshots: &[&DailySnapshot],
    days: u32,
    data_dir: &Path,
) -> Result<(PathBuf, usize), Box<dyn Error>> {
    fs::create_dir_all(data_dir).await?;
    let rows = time_series_records(snapshots);
    let path = data_dir.join(format!("time_series_{days}d.csv"));
    write_csv(&path, &rows).await?;
    Ok((path, rows.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::BubbleAnalyzer;
    use crate::models::{MarketAssessment, NewsAnalysis};
    use chrono::{Local, NaiveDate, TimeZone};
    use std::collections::BTreeMap;

    fn analyses() -> Vec<NewsAnalysis> {
        let analyzer = BubbleAnalyzer::new();
        let now = Local::now();
        vec![
            analyzer.analyze_article(
                "AI bubble fears",
                "Investors pour billions into AI startups amid hype and speculation.",
                "https://example.com/a",
                now,
            ),
            analyzer.analyze_article(
                "Regulators circle",
                "The SEC opened an investigation, raising concern.",
                "https://example.com/b",
                now,
            ),
        ]
    }

    fn snapshot(day: u32) -> DailySnapshot {
        let date = NaiveDate::from_ymd_opt(2025, 10, day).unwrap();
        let timestamp = Local
            .from_local_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
            .earliest()
            .unwrap();
        let mut indicator_scores = BTreeMap::new();
        indicator_scores.insert(IndicatorKind::HypeLevel, 0.5);
        indicator_scores.insert(IndicatorKind::RegulatoryConcern, 0.1);
        DailySnapshot {
            date,
            timestamp,
            total_articles: 10,
            analyzed_articles: 10,
            average_sentiment: 0.2,
            average_bubble_risk: 0.45,
            market_assessment: MarketAssessment::NeutralMarket,
            concerning_articles: 2,
            indicator_scores,
            top_articles: vec![],
            data_source: "tavily_api".to_string(),
        }
    }

    #[test]
    fn test_article_records_one_per_article() {
        let records = BubbleAnalyzer::new().indicator_records(&analyses());
        assert_eq!(records.len(), 10);
        let articles = article_records(&records);
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].url, "https://example.com/a");
        assert_eq!(articles[1].url, "https://example.com/b");
    }

    #[test]
    fn test_time_series_rows() {
        let (a, b) = (snapshot(1), snapshot(2));
        let rows = time_series_records(&[&a, &b]);
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].indicator_name, "hype_level");
        assert_eq!(rows[0].metric_type, MetricType::Indicator);
        assert_eq!(rows[2].indicator_name, "summary");
        assert_eq!(rows[2].metric_type, MetricType::Summary);
        assert_eq!(rows[2].indicator_value, 0.45);
        assert_eq!(rows[3].date, "2025-10-02");
    }

    #[test]
    fn test_summary_metrics() {
        let report = BubbleAnalyzer::new()
            .generate_report(&analyses(), Local::now())
            .unwrap();
        let rows = summary_metrics(&report);
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].metric_name, "Total Articles");
        assert_eq!(rows[0].metric_value, "2");
        assert_eq!(rows[5].metric_name, "Hype Level Average");
        assert_eq!(rows[5].metric_type, "score");
    }

    #[test]
    fn test_csv_header_and_enum_cells() {
        let a = snapshot(1);
        let bytes = to_csv(&time_series_records(&[&a])).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,date,total_articles,analyzed_articles,average_sentiment,average_bubble_risk,\
             concerning_articles,market_assessment,indicator_name,indicator_value,metric_type"
        );
        let first = lines.next().unwrap();
        assert!(first.contains(",NEUTRAL MARKET,hype_level,0.5,indicator"));
        assert!(text.trim_end().ends_with("summary,0.45,summary"));
    }

    #[tokio::test]
    async fn test_write_dashboard_exports() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = BubbleAnalyzer::new();
        let analyses = analyses();
        let report = analyzer.generate_report(&analyses, Local::now());
        let records = analyzer.indicator_records(&analyses);

        let out = dir.path().join("exports");
        let summary = write_dashboard_exports(report.as_ref(), &records, &out).await.unwrap();
        assert_eq!(summary.articles_rows, 2);
        assert_eq!(summary.indicators_rows, 10);

        let indicators = std::fs::read_to_string(out.join(INDICATORS_CSV)).unwrap();
        assert!(indicators.starts_with("article_id,title,url,analysis_date"));
        assert_eq!(indicators.lines().count(), 11);
        assert!(out.join(SUMMARY_CSV).exists());
    }

    #[tokio::test]
    async fn test_write_empty_exports() {
        let dir = tempfile::tempdir().unwrap();
        let summary = write_dashboard_exports(None, &[], dir.path()).await.unwrap();
        assert_eq!(summary.articles_rows, 0);
        assert!(summary.summary_file.is_none());
        assert_eq!(std::fs::read_to_string(dir.path().join(ARTICLES_CSV)).unwrap(), "");

        let (path, rows) = write_time_series(&[], 30, dir.path()).await.unwrap();
        assert_eq!(rows, 0);
        assert!(path.ends_with("time_series_30d.csv"));
    }
}
