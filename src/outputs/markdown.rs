//! Markdown renderings printed by the CLI.

use super::dashboard::indicator_title;
use crate::models::{BubbleReport, DailySnapshot, RiskLevel};
use crate::timeseries::{StoreStatus, TrendReport, TrendStats};
use crate::tracker::TrackerStatus;
use crate::utils::source_host;
use chrono::NaiveDate;
use std::fmt::Write;

fn trend_row(md: &mut String, label: &str, t: &TrendStats) {
    writeln!(
        md,
        "| {} | {} | {:+.4} | {:.3} | {:.3} | {:+.1}% |",
        label, t.direction, t.slope, t.start_value, t.end_value, t.change_percent
    )
    .unwrap();
}

pub fn report_to_markdown(report: &BubbleReport) -> String {
    let mut md = String::new();
    writeln!(md, "# AI Bubble Report").unwrap();
    writeln!(
        md,
        "\n_Generated {}_\n",
        report.analysis_date.format("%Y-%m-%d %H:%M")
    )
    .unwrap();

    writeln!(md, "**Market assessment:** {}\n", report.market_assessment).unwrap();
    writeln!(md, "| Metric | Value |").unwrap();
    writeln!(md, "|---|---|").unwrap();
    writeln!(md, "| Articles analyzed | {} |", report.total_articles).unwrap();
    writeln!(md, "| Average sentiment | {:.3} |", report.average_sentiment).unwrap();
    writeln!(
        md,
        "| Average bubble risk | {:.3} ({}) |",
        report.average_bubble_risk,
        RiskLevel::from_score(report.average_bubble_risk)
    )
    .unwrap();
    writeln!(md, "| Concerning articles | {} |", report.concerning_articles).unwrap();

    writeln!(md, "\n## Indicators\n").unwrap();
    writeln!(md, "| Indicator | Average | Threshold | Weight |").unwrap();
    writeln!(md, "|---|---|---|---|").unwrap();
    for (kind, value) in &report.indicator_averages {
        let flag = if *value > kind.threshold() { " ⚠" } else { "" };
        writeln!(
            md,
            "| {} | {:.3}{} | {:.2} | {:.2} |",
            indicator_title(*kind),
            value,
            flag,
            kind.threshold(),
            kind.weight()
        )
        .unwrap();
    }

    writeln!(md, "\n## Articles\n").unwrap();
    let mut articles: Vec<_> = report.individual_analyses.iter().collect();
    articles.sort_by(|a, b| b.bubble_risk.total_cmp(&a.bubble_risk));
    for article in articles {
        let source_tag = source_host(&article.url)
            .map(|host| format!(" <small>`{host}`</small>"))
            .unwrap_or_default();
        writeln!(md, "### [{}]({}){}\n", article.title, article.url, source_tag).unwrap();
        writeln!(
            md,
            "- Bubble risk: {:.3}\n- Sentiment: {:.3}\n- Impact: {}",
            article.bubble_risk, article.sentiment_score, article.market_impact
        )
        .unwrap();
        if !article.key_phrases.is_empty() {
            writeln!(md, "- Key phrases: {}", article.key_phrases.join(", ")).unwrap();
        }
        md.push('\n');
    }
    md
}

pub fn trends_to_markdown(trends: &TrendReport) -> String {
    let mut md = String::new();
    writeln!(md, "# Bubble Trends ({} days)\n", trends.period_days).unwrap();
    writeln!(
        md,
        "{} snapshots from {} to {}. Latest assessment: **{}**.\n",
        trends.snapshots_count, trends.start_date, trends.end_date, trends.latest_assessment
    )
    .unwrap();

    writeln!(md, "| Series | Direction | Slope | Start | End | Change |").unwrap();
    writeln!(md, "|---|---|---|---|---|---|").unwrap();
    trend_row(&mut md, "Bubble risk", &trends.bubble_risk);
    trend_row(&mut md, "Sentiment", &trends.sentiment);
    trend_row(&mut md, "Concerning articles", &trends.concerning_articles);
    for (kind, stats) in &trends.indicator_trends {
        trend_row(&mut md, &indicator_title(*kind), stats);
    }

    let change = &trends.risk_level_change;
    writeln!(
        md,
        "\n**Risk level:** {} → {} ({:?})",
        change.start_level, change.end_level, change.change
    )
    .unwrap();
    writeln!(
        md,
        "\n**Bubble risk volatility:** {:.3}",
        trends.bubble_risk_volatility
    )
    .unwrap();
    md
}

/// Table of effective snapshots between `start` and `end`.
pub fn history_to_markdown(
    snapshots: &[&DailySnapshot],
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    let mut md = String::new();
    writeln!(md, "# Snapshot History ({start} to {end})\n").unwrap();
    if snapshots.is_empty() {
        writeln!(md, "No snapshots in this period.").unwrap();
        return md;
    }
    writeln!(
        md,
        "| Date | Assessment | Bubble risk | Sentiment | Concerning | Articles | New | Source |"
    )
    .unwrap();
    writeln!(md, "|---|---|---|---|---|---|---|---|").unwrap();
    for s in snapshots {
        writeln!(
            md,
            "| {} | {} | {:.3} | {:.3} | {} | {} | {} | {} |",
            s.date,
            s.market_assessment,
            s.average_bubble_risk,
            s.average_sentiment,
            s.concerning_articles,
            s.total_articles,
            s.analyzed_articles,
            s.data_source
        )
        .unwrap();
    }
    md
}

pub fn status_to_markdown(tracker: &TrackerStatus, store: &StoreStatus) -> String {
    let mut md = String::new();
    writeln!(md, "# Status\n").unwrap();
    writeln!(md, "## Tracked news\n").unwrap();
    writeln!(md, "- File: `{}`", tracker.data_file).unwrap();
    writeln!(md, "- Articles: {}", tracker.total_articles).unwrap();
    writeln!(md, "- Analyzed: {}", tracker.analyzed_articles).unwrap();
    writeln!(md, "- Pending analysis: {}", tracker.pending_analysis).unwrap();
    writeln!(md, "\n## Snapshots\n").unwrap();
    writeln!(md, "- File: `{}`", store.snapshots_file).unwrap();
    writeln!(md, "- Snapshots: {}", store.total_snapshots).unwrap();
    writeln!(md, "- Days covered: {}", store.distinct_days).unwrap();
    match store.latest_snapshot {
        Some(date) => writeln!(md, "- Latest: {date}").unwrap(),
        None => writeln!(md, "- Latest: none").unwrap(),
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleSummary, IndicatorKind, MarketAssessment, MarketImpact};
    use crate::timeseries::{linear_trend, risk_level_change};
    use chrono::{Local, NaiveDate};
    use std::collections::BTreeMap;

    fn report() -> BubbleReport {
        let mut indicator_averages = BTreeMap::new();
        indicator_averages.insert(IndicatorKind::HypeLevel, 0.8);
        indicator_averages.insert(IndicatorKind::RegulatoryConcern, 0.1);
        BubbleReport {
            analysis_date: Local::now(),
            total_articles: 2,
            average_sentiment: 0.25,
            average_bubble_risk: 0.55,
            concerning_articles: 1,
            market_assessment: MarketAssessment::ModerateBubbleRisk,
            indicator_averages,
            individual_analyses: vec![
                ArticleSummary {
                    title: "Calm day".to_string(),
                    url: "https://example.org/calm".to_string(),
                    sentiment_score: 0.1,
                    bubble_risk: 0.2,
                    market_impact: MarketImpact::Neutral,
                    key_phrases: vec![],
                },
                ArticleSummary {
                    title: "Frenzy".to_string(),
                    url: "https://www.example.com/frenzy".to_string(),
                    sentiment_score: 0.4,
                    bubble_risk: 0.9,
                    market_impact: MarketImpact::HighRisk,
                    key_phrases: vec!["hype".to_string(), "ipo".to_string()],
                },
            ],
        }
    }

    #[test]
    fn test_report_markdown() {
        let md = report_to_markdown(&report());
        assert!(md.starts_with("# AI Bubble Report"));
        assert!(md.contains("**Market assessment:** MODERATE BUBBLE RISK"));
        assert!(md.contains("| Average bubble risk | 0.550 (MODERATE) |"));
        assert!(md.contains("| Hype Level | 0.800 ⚠ | 0.70 | 0.25 |"));
        assert!(md.contains("| Regulatory Concern | 0.100 | 0.40 | 0.20 |"));
        assert!(md.contains("<small>`example.com`</small>"));
        assert!(md.contains("- Key phrases: hype, ipo"));
        // riskiest article first
        assert!(md.find("Frenzy").unwrap() < md.find("Calm day").unwrap());
    }

    #[test]
    fn test_trends_markdown() {
        let mut indicator_trends = BTreeMap::new();
        indicator_trends.insert(
            IndicatorKind::InvestmentFrenzy,
            linear_trend(&[0.1, 0.3]).unwrap(),
        );
        let trends = TrendReport {
            period_days: 30,
            snapshots_count: 2,
            start_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 10, 2).unwrap(),
            bubble_risk: linear_trend(&[0.3, 0.8]).unwrap(),
            sentiment: linear_trend(&[0.2, 0.2]).unwrap(),
            concerning_articles: linear_trend(&[1.0, 3.0]).unwrap(),
            indicator_trends,
            bubble_risk_volatility: 0.354,
            latest_assessment: MarketAssessment::HighBubbleRisk,
            risk_level_change: risk_level_change(0.3, 0.8),
        };
        let md = trends_to_markdown(&trends);
        assert!(md.contains("# Bubble Trends (30 days)"));
        assert!(md.contains("| Bubble risk | increasing | +0.5000 | 0.300 | 0.800 | +166.7% |"));
        assert!(md.contains("| Sentiment | stable |"));
        assert!(md.contains("| Investment Frenzy | increasing |"));
        assert!(md.contains("LOW → HIGH (Increased)"));
        assert!(md.contains("volatility:** 0.354"));
    }

    #[test]
    fn test_history_markdown_empty() {
        let day = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let md = history_to_markdown(&[], day, day);
        assert!(md.contains("No snapshots in this period."));
    }

    #[test]
    fn test_history_shows_total_and_new_articles() {
        let report = report();
        let date = NaiveDate::from_ymd_opt(2025, 10, 2).unwrap();
        let snapshot = DailySnapshot {
            date,
            timestamp: Local::now(),
            total_articles: 12,
            analyzed_articles: 0,
            average_sentiment: report.average_sentiment,
            average_bubble_risk: report.average_bubble_risk,
            market_assessment: report.market_assessment,
            concerning_articles: 3,
            indicator_scores: report.indicator_averages.clone(),
            top_articles: vec![],
            data_source: "tracked_news".to_string(),
        };
        let start = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let md = history_to_markdown(&[&snapshot], start, date);
        assert!(md.starts_with("# Snapshot History (2025-10-01 to 2025-10-02)"));
        assert!(md.contains("| Articles | New | Source |"));
        assert!(md.contains(
            "| 2025-10-02 | MODERATE BUBBLE RISK | 0.550 | 0.250 | 3 | 12 | 0 | tracked_news |"
        ));
    }

    #[test]
    fn test_status_markdown() {
        let tracker = TrackerStatus {
            total_articles: 10,
            analyzed_articles: 8,
            pending_analysis: 2,
            data_file: "bubble_data/tracked_news.json".to_string(),
        };
        let store = StoreStatus {
            total_snapshots: 3,
            distinct_days: 2,
            latest_snapshot: None,
            snapshots_file: "bubble_data/daily_snapshots.json".to_string(),
        };
        let md = status_to_markdown(&tracker, &store);
        assert!(md.contains("- Pending analysis: 2"));
        assert!(md.contains("- Days covered: 2"));
        assert!(md.contains("- Latest: none"));
    }
}
