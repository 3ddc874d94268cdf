//! Data models for search results, bubble analyses and daily snapshots.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Article`]: A raw search result as returned by a news source
//! - [`TrackedArticle`]: A persisted article together with its analysis
//! - [`IndicatorKind`] / [`BubbleIndicator`]: The five keyword-derived indicators
//! - [`NewsAnalysis`]: The scored result for a single article
//! - [`BubbleReport`]: Aggregate over all analyzed articles
//! - [`DailySnapshot`]: One day's aggregated result, stored in the time series
//!
//! Field names are snake_case on the wire so the JSON stores and CSV exports
//! can be consumed directly by dashboard tools.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A news article as returned by a search source.
///
/// Articles are ephemeral: they are fetched per run and deduplicated by
/// `url`, keeping the entry with the highest relevance `score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// The article headline.
    pub title: String,
    /// The canonical article URL, used as the deduplication key.
    pub url: String,
    /// The text snippet or body returned by the source.
    #[serde(default)]
    pub content: String,
    /// Relevance score assigned by the source (higher is better).
    #[serde(default)]
    pub score: f64,
    /// The query that surfaced this article.
    #[serde(default)]
    pub source_query: String,
}

/// The five fixed bubble indicators.
///
/// Each indicator carries a fixed weight (the weights sum to 1.0), a
/// threshold above which it is considered concerning, and a description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    HypeLevel,
    InvestmentFrenzy,
    MarketSpeculation,
    CompetitiveIntensity,
    RegulatoryConcern,
}

impl IndicatorKind {
    /// All indicators in reporting order.
    pub const ALL: [IndicatorKind; 5] = [
        IndicatorKind::HypeLevel,
        IndicatorKind::InvestmentFrenzy,
        IndicatorKind::MarketSpeculation,
        IndicatorKind::CompetitiveIntensity,
        IndicatorKind::RegulatoryConcern,
    ];

    pub fn weight(self) -> f64 {
        match self {
            IndicatorKind::HypeLevel => 0.25,
            IndicatorKind::InvestmentFrenzy => 0.20,
            IndicatorKind::MarketSpeculation => 0.20,
            IndicatorKind::CompetitiveIntensity => 0.15,
            IndicatorKind::RegulatoryConcern => 0.20,
        }
    }

    pub fn threshold(self) -> f64 {
        match self {
            IndicatorKind::HypeLevel => 0.7,
            IndicatorKind::InvestmentFrenzy => 0.6,
            IndicatorKind::MarketSpeculation => 0.5,
            IndicatorKind::CompetitiveIntensity => 0.6,
            IndicatorKind::RegulatoryConcern => 0.4,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            IndicatorKind::HypeLevel => "Level of hype and superlative language in the article",
            IndicatorKind::InvestmentFrenzy => "Intensity of investment and funding discussions",
            IndicatorKind::MarketSpeculation => {
                "Level of market speculation and future predictions"
            }
            IndicatorKind::CompetitiveIntensity => "Intensity of competitive dynamics mentioned",
            IndicatorKind::RegulatoryConcern => "Level of regulatory concerns and risks mentioned",
        }
    }

    /// The snake_case name used in JSON and CSV output.
    pub fn as_str(self) -> &'static str {
        match self {
            IndicatorKind::HypeLevel => "hype_level",
            IndicatorKind::InvestmentFrenzy => "investment_frenzy",
            IndicatorKind::MarketSpeculation => "market_speculation",
            IndicatorKind::CompetitiveIntensity => "competitive_intensity",
            IndicatorKind::RegulatoryConcern => "regulatory_concern",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a value relative to a reference (a threshold or a trend line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Increasing => "increasing",
            Direction::Decreasing => "decreasing",
            Direction::Stable => "stable",
        };
        f.write_str(s)
    }
}

/// A single scored indicator for one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleIndicator {
    pub name: IndicatorKind,
    /// Score in `[0, 1]`.
    pub value: f64,
    pub weight: f64,
    pub trend: Direction,
    pub description: String,
    pub threshold: f64,
    pub is_concerning: bool,
}

/// Per-article market impact classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketImpact {
    HighRisk,
    ModerateRisk,
    Optimistic,
    Pessimistic,
    Neutral,
}

impl fmt::Display for MarketImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketImpact::HighRisk => "High Risk - Multiple bubble indicators present",
            MarketImpact::ModerateRisk => "Moderate Risk - Some concerning indicators",
            MarketImpact::Optimistic => "Optimistic - High sentiment but few concerning indicators",
            MarketImpact::Pessimistic => "Pessimistic - Low sentiment and market concerns",
            MarketImpact::Neutral => "Neutral - Balanced market sentiment",
        };
        f.write_str(s)
    }
}

/// Aggregate market assessment for a report or snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketAssessment {
    #[serde(rename = "HIGH BUBBLE RISK")]
    HighBubbleRisk,
    #[serde(rename = "MODERATE BUBBLE RISK")]
    ModerateBubbleRisk,
    #[serde(rename = "OPTIMISTIC MARKET")]
    OptimisticMarket,
    #[serde(rename = "NEUTRAL MARKET")]
    NeutralMarket,
}

impl fmt::Display for MarketAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketAssessment::HighBubbleRisk => "HIGH BUBBLE RISK",
            MarketAssessment::ModerateBubbleRisk => "MODERATE BUBBLE RISK",
            MarketAssessment::OptimisticMarket => "OPTIMISTIC MARKET",
            MarketAssessment::NeutralMarket => "NEUTRAL MARKET",
        };
        f.write_str(s)
    }
}

/// Coarse risk bucket used when comparing the start and end of a period.
///
/// Variants are ordered `Low < Moderate < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_score(bubble_risk: f64) -> Self {
        if bubble_risk > 0.7 {
            RiskLevel::High
        } else if bubble_risk > 0.4 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
        };
        f.write_str(s)
    }
}

/// The scored result for a single article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsAnalysis {
    pub title: String,
    pub url: String,
    /// Sentiment in `[-1, 1]`.
    pub sentiment_score: f64,
    pub bubble_indicators: Vec<BubbleIndicator>,
    /// Overall bubble risk in `[0, 1]`.
    pub overall_bubble_risk: f64,
    pub key_phrases: Vec<String>,
    pub market_impact: MarketImpact,
    pub analysis_date: DateTime<Local>,
}

impl NewsAnalysis {
    pub fn indicator(&self, kind: IndicatorKind) -> Option<&BubbleIndicator> {
        self.bubble_indicators.iter().find(|i| i.name == kind)
    }
}

/// An article kept in the tracker store, with its analysis once scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedArticle {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub source_query: String,
    #[serde(default)]
    pub score: f64,
    pub added_date: DateTime<Local>,
    #[serde(default)]
    pub is_analyzed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<NewsAnalysis>,
}

impl TrackedArticle {
    pub fn from_article(article: Article, added_date: DateTime<Local>) -> Self {
        Self {
            title: article.title,
            url: article.url,
            content: article.content,
            source_query: article.source_query,
            score: article.score,
            added_date,
            is_analyzed: false,
            analysis: None,
        }
    }
}

/// Condensed view of one analysis, used in reports and snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub title: String,
    pub url: String,
    pub sentiment_score: f64,
    pub bubble_risk: f64,
    pub market_impact: MarketImpact,
    #[serde(default)]
    pub key_phrases: Vec<String>,
}

/// Aggregate over all analyzed articles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleReport {
    pub analysis_date: DateTime<Local>,
    pub total_articles: usize,
    pub average_sentiment: f64,
    pub average_bubble_risk: f64,
    /// Articles whose overall risk exceeds 0.6.
    pub concerning_articles: usize,
    pub market_assessment: MarketAssessment,
    pub indicator_averages: BTreeMap<IndicatorKind, f64>,
    pub individual_analyses: Vec<ArticleSummary>,
}

/// One day's aggregated analysis result.
///
/// Snapshots are only ever appended to the store. When several share a
/// `date`, the one with the latest `timestamp` is the effective one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub timestamp: DateTime<Local>,
    pub total_articles: usize,
    pub analyzed_articles: usize,
    pub average_sentiment: f64,
    pub average_bubble_risk: f64,
    pub market_assessment: MarketAssessment,
    pub concerning_articles: usize,
    pub indicator_scores: BTreeMap<IndicatorKind, f64>,
    #[serde(default)]
    pub top_articles: Vec<ArticleSummary>,
    #[serde(default)]
    pub data_source: String,
}

/// Flat one-row-per-(article, indicator) record for dashboard export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRecord {
    pub article_id: u64,
    pub title: String,
    pub url: String,
    pub analysis_date: String,
    pub sentiment_score: f64,
    pub overall_bubble_risk: f64,
    pub market_impact: String,
    pub key_phrases_count: usize,
    pub indicator_name: IndicatorKind,
    pub indicator_value: f64,
    pub indicator_weight: f64,
    pub indicator_trend: Direction,
    pub indicator_threshold: f64,
    pub is_concerning: bool,
    pub indicator_description: String,
}
