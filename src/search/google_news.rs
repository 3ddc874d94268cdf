//! Google News RSS search feed.
//!
//! A key-less source: `https://news.google.com/rss/search?q=<query>` returns
//! an RSS 2.0 document whose `<item>` descriptions are small HTML fragments.
//! Descriptions are reduced to plain text, and since the feed carries no
//! relevance score, items are scored by rank: the first of `n` items gets
//! 1.0 and the last gets `1/n`.

use super::SearchSource;
use crate::models::Article;
use reqwest::Client;
use scraper::Html;
use serde::Deserialize;
use std::error::Error;
use tracing::{info, instrument};

const GOOGLE_NEWS_RSS: &str = "https://news.google.com/rss/search";

#[derive(Debug, Clone)]
pub struct GoogleNewsRss {
    client: Client,
    locale: String,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    description: String,
}

impl GoogleNewsRss {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            locale: "hl=en-US&gl=US&ceid=US:en".to_string(),
        }
    }

    fn feed_url(&self, query: &str) -> String {
        format!(
            "{}?q={}&{}",
            GOOGLE_NEWS_RSS,
            urlencoding::encode(query),
            self.locale
        )
    }
}

impl SearchSource for GoogleNewsRss {
    fn name(&self) -> &'static str {
        "google_news_rss"
    }

    #[instrument(level = "info", skip_all, fields(%query, max_results = max_results))]
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Article>, Box<dyn Error>> {
        let url = self.feed_url(query);
        let xml = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let articles = parse_feed(&xml, query, max_results)?;
        info!(count = articles.len(), "Google News feed parsed");
        Ok(articles)
    }
}

/// Parse an RSS document into at most `max_results` rank-scored articles.
fn parse_feed(xml: &str, query: &str, max_results: usize) -> Result<Vec<Article>, Box<dyn Error>> {
    let rss: Rss = quick_xml::de::from_str(xml)?;
    let items: Vec<RssItem> = rss
        .channel
        .items
        .into_iter()
        .filter(|item| !item.link.trim().is_empty())
        .take(max_results)
        .collect();

    let n = items.len() as f64;
    Ok(items
        .into_iter()
        .enumerate()
        .map(|(rank, item)| Article {
            title: item.title.trim().to_string(),
            url: item.link.trim().to_string(),
            content: html_to_text(&item.description),
            score: 1.0 - rank as f64 / n,
            source_query: query.to_string(),
        })
        .collect())
}

/// Visible text of an HTML fragment with whitespace collapsed.
fn html_to_text(fragment: &str) -> String {
    let html = Html::parse_fragment(fragment);
    let text = html.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
