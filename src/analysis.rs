//! Keyword-based bubble scoring for individual articles and article sets.
//!
//! Each article gets five indicator scores in `[0, 1]`, a lexicon-based
//! sentiment in `[-1, 1]`, an overall bubble risk and a market impact
//! label. [`BubbleAnalyzer::generate_report`] averages a set of analyses
//! into a [`BubbleReport`].
//!
//! # Indicator formulas
//!
//! | Indicator | Score |
//! |-----------|-------|
//! | hype_level | `(3 * title_hits + content_hits) / 10` |
//! | investment_frenzy | `(investment_hits + market_hits + 2 * large_numbers) / 15` |
//! | market_speculation | `(speculation_hits + 0.5 * future_hits) / 8` |
//! | competitive_intensity | `(competition_hits + min(0.1 * names, 3)) / 10` |
//! | regulatory_concern | `(regulatory_hits + 0.5 * concern_hits) / 8` |
//!
//! Every score is capped at 1.0.

use crate::lexicon::{CAPITALIZED_NAME, LARGE_NUMBER, LEXICON, count_present};
use crate::models::{
    ArticleSummary, BubbleIndicator, BubbleReport, Direction, IndicatorKind, IndicatorRecord,
    MarketAssessment, MarketImpact, NewsAnalysis,
};
use chrono::{DateTime, Local};
use itertools::Itertools;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Maximum number of key phrases kept per article.
pub const MAX_KEY_PHRASES: usize = 10;
/// Number of content characters considered for sentiment.
const SENTIMENT_WINDOW: usize = 2000;
/// Articles above this overall risk count as concerning in a report.
const CONCERNING_ARTICLE_RISK: f64 = 0.6;

/// Stateless scorer over the static [`LEXICON`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BubbleAnalyzer;

impl BubbleAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Score a single article.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub fn analyze_article(
        &self,
        title: &str,
        content: &str,
        url: &str,
        now: DateTime<Local>,
    ) -> NewsAnalysis {
        let key_phrases = self.extract_key_phrases(content);
        let sentiment_score = self.sentiment(title, content);
        let bubble_indicators = self.indicators(title, content);
        let overall_bubble_risk = overall_bubble_risk(&bubble_indicators);
        let market_impact = market_impact(&bubble_indicators, sentiment_score);

        debug!(
            sentiment = sentiment_score,
            risk = overall_bubble_risk,
            phrases = key_phrases.len(),
            "Analyzed article"
        );

        NewsAnalysis {
            title: title.to_string(),
            url: url.to_string(),
            sentiment_score,
            bubble_indicators,
            overall_bubble_risk,
            key_phrases,
            market_impact,
            analysis_date: now,
        }
    }

    /// Lower-cased context snippets around every bubble keyword present in
    /// `content`: at most two per keyword, unique, at most [`MAX_KEY_PHRASES`].
    pub fn extract_key_phrases(&self, content: &str) -> Vec<String> {
        let lower = content.to_lowercase();
        LEXICON
            .bubble_categories()
            .into_iter()
            .flatten()
            .filter(|term| term.is_in(&lower))
            .flat_map(|term| term.contexts(&lower, 2))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unique()
            .take(MAX_KEY_PHRASES)
            .collect()
    }

    /// Lexicon sentiment over the title and the start of the content.
    ///
    /// `(pos - neg) / (pos + neg)` damped by `hits / (hits + 2)` so that a
    /// single matching word does not swing the score to an extreme.
    pub fn sentiment(&self, title: &str, content: &str) -> f64 {
        let window: String = content.chars().take(SENTIMENT_WINDOW).collect();
        let text = format!("{title}\n{window}");

        let pos = count_present(&LEXICON.positive, &text) as f64;
        let neg = count_present(&LEXICON.negative, &text) as f64;
        let hits = pos + neg;
        if hits == 0.0 {
            return 0.0;
        }
        let polarity = (pos - neg) / hits;
        let confidence = hits / (hits + 2.0);
        (polarity * confidence).clamp(-1.0, 1.0)
    }

    /// All five indicators for one article.
    pub fn indicators(&self, title: &str, content: &str) -> Vec<BubbleIndicator> {
        IndicatorKind::ALL
            .into_iter()
            .map(|kind| {
                let value = self.indicator_value(kind, title, content);
                let threshold = kind.threshold();
                BubbleIndicator {
                    name: kind,
                    value,
                    weight: kind.weight(),
                    trend: direction_vs_threshold(value, threshold),
                    description: kind.description().to_string(),
                    threshold,
                    is_concerning: value > threshold,
                }
            })
            .collect()
    }

    /// Raw score in `[0, 1]` for one indicator.
    pub fn indicator_value(&self, kind: IndicatorKind, title: &str, content: &str) -> f64 {
        let score = match kind {
            IndicatorKind::HypeLevel => {
                let title_hits = count_present(&LEXICON.hype, title) as f64;
                let content_hits = count_present(&LEXICON.hype, content) as f64;
                (title_hits * 3.0 + content_hits) / 10.0
            }
            IndicatorKind::InvestmentFrenzy => {
                let investment = count_present(&LEXICON.investment, content) as f64;
                let market = count_present(&LEXICON.market, content) as f64;
                let large_numbers = LARGE_NUMBER.find_iter(content).count() as f64;
                (investment + market + large_numbers * 2.0) / 15.0
            }
            IndicatorKind::MarketSpeculation => {
                let speculation = count_present(&LEXICON.speculation, content) as f64;
                let future = count_present(&LEXICON.future, content) as f64;
                (speculation + future * 0.5) / 8.0
            }
            IndicatorKind::CompetitiveIntensity => {
                let competition = count_present(&LEXICON.competition, content) as f64;
                let names = CAPITALIZED_NAME.find_iter(content).count() as f64;
                (competition + (names * 0.1).min(3.0)) / 10.0
            }
            IndicatorKind::RegulatoryConcern => {
                let regulatory = count_present(&LEXICON.regulatory, content) as f64;
                let concern = count_present(&LEXICON.concern, content) as f64;
                (regulatory + concern * 0.5) / 8.0
            }
        };
        score.min(1.0)
    }

    /// Aggregate a set of analyses. Returns `None` for an empty set.
    ///
    /// Averages are computed over sorted values so the result does not
    /// depend on the order of `analyses`.
    pub fn generate_report(
        &self,
        analyses: &[NewsAnalysis],
        now: DateTime<Local>,
    ) -> Option<BubbleReport> {
        if analyses.is_empty() {
            return None;
        }

        let average_sentiment = mean(analyses.iter().map(|a| a.sentiment_score));
        let average_bubble_risk = mean(analyses.iter().map(|a| a.overall_bubble_risk));
        let concerning_articles = analyses
            .iter()
            .filter(|a| a.overall_bubble_risk > CONCERNING_ARTICLE_RISK)
            .count();

        let mut indicator_averages = BTreeMap::new();
        for kind in IndicatorKind::ALL {
            let values: Vec<f64> = analyses
                .iter()
                .filter_map(|a| a.indicator(kind))
                .map(|i| i.value)
                .collect();
            if !values.is_empty() {
                indicator_averages.insert(kind, mean(values));
            }
        }

        Some(BubbleReport {
            analysis_date: now,
            total_articles: analyses.len(),
            average_sentiment: round3(average_sentiment),
            average_bubble_risk: round3(average_bubble_risk),
            concerning_articles,
            market_assessment: assess_market(average_bubble_risk, average_sentiment),
            indicator_averages,
            individual_analyses: analyses
                .iter()
                .map(|a| ArticleSummary {
                    title: a.title.clone(),
                    url: a.url.clone(),
                    sentiment_score: a.sentiment_score,
                    bubble_risk: a.overall_bubble_risk,
                    market_impact: a.market_impact,
                    key_phrases: a.key_phrases.iter().take(5).cloned().collect(),
                })
                .collect(),
        })
    }

    /// Flatten analyses into one record per (article, indicator).
    pub fn indicator_records(&self, analyses: &[NewsAnalysis]) -> Vec<IndicatorRecord> {
        analyses
            .iter()
            .flat_map(|a| {
                a.bubble_indicators.iter().map(move |ind| IndicatorRecord {
                    article_id: article_id(&a.url),
                    title: a.title.clone(),
                    url: a.url.clone(),
                    analysis_date: a.analysis_date.to_rfc3339(),
                    sentiment_score: a.sentiment_score,
                    overall_bubble_risk: a.overall_bubble_risk,
                    market_impact: a.market_impact.to_string(),
                    key_phrases_count: a.key_phrases.len(),
                    indicator_name: ind.name,
                    indicator_value: ind.value,
                    indicator_weight: ind.weight,
                    indicator_trend: ind.trend,
                    indicator_threshold: ind.threshold,
                    is_concerning: ind.is_concerning,
                    indicator_description: ind.description.clone(),
                })
            })
            .collect()
    }
}

/// Weighted indicator sum plus 0.1 per concerning indicator, capped at 1.0.
pub fn overall_bubble_risk(indicators: &[BubbleIndicator]) -> f64 {
    let weighted: f64 = indicators.iter().map(|i| i.value * i.weight).sum();
    let concerning = indicators.iter().filter(|i| i.is_concerning).count() as f64;
    (weighted + concerning * 0.1).min(1.0)
}

/// Classify an article's likely market impact.
///
/// Four or more concerning indicators mean high risk and two or more mean
/// moderate risk. Otherwise the sentiment decides: above 0.7 is optimistic,
/// below -0.3 pessimistic, anything else neutral.
pub fn market_impact(indicators: &[BubbleIndicator], sentiment: f64) -> MarketImpact {
    let concerning = indicators.iter().filter(|i| i.is_concerning).count();
    if concerning >= 4 {
        MarketImpact::HighRisk
    } else if concerning >= 2 {
        MarketImpact::ModerateRisk
    } else if sentiment > 0.7 {
        MarketImpact::Optimistic
    } else if sentiment < -0.3 {
        MarketImpact::Pessimistic
    } else {
        MarketImpact::Neutral
    }
}

/// Overall market assessment from report averages; risk outranks sentiment.
pub fn assess_market(average_bubble_risk: f64, average_sentiment: f64) -> MarketAssessment {
    if average_bubble_risk > 0.7 {
        MarketAssessment::HighBubbleRisk
    } else if average_bubble_risk > 0.5 {
        MarketAssessment::ModerateBubbleRisk
    } else if average_sentiment > 0.5 {
        MarketAssessment::OptimisticMarket
    } else {
        MarketAssessment::NeutralMarket
    }
}

/// `Increasing` above 120% of the threshold, `Decreasing` below 80%.
pub fn direction_vs_threshold(value: f64, threshold: f64) -> Direction {
    if value > threshold * 1.2 {
        Direction::Increasing
    } else if value < threshold * 0.8 {
        Direction::Decreasing
    } else {
        Direction::Stable
    }
}

/// Order-independent arithmetic mean; 0.0 for no values.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut values: Vec<f64> = values.into_iter().collect();
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    values.iter().sum::<f64>() / values.len() as f64
}

/// Round to three decimals.
pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Stable six-digit id for an article url (FNV-1a).
pub fn article_id(url: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in url.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash % 1_000_000
}
