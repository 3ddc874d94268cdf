//! Tavily search API client.
//!
//! Sends one POST per query to `https://api.tavily.com/search` and maps the
//! `results` array onto [`Article`]s. No generated answer is requested; only
//! the ranked result list is used.

use super::SearchSource;
use crate::models::Article;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, instrument};

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

#[derive(Clone)]
pub struct TavilySearcher {
    api_key: String,
    client: reqwest::Client,
    search_depth: String,
}

impl fmt::Debug for TavilySearcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TavilySearcher")
            .field("api_key", &"<redacted>")
            .field("search_depth", &self.search_depth)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct TavilySearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilySearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f64>,
}

impl TavilySearcher {
    pub fn new(api_key: String, client: reqwest::Client, search_depth: String) -> Self {
        Self {
            api_key,
            client,
            search_depth,
        }
    }
}

impl SearchSource for TavilySearcher {
    fn name(&self) -> &'static str {
        "tavily_api"
    }

    #[instrument(level = "info", skip_all, fields(%query, max_results = max_results))]
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Article>, Box<dyn Error>> {
        let t0 = Instant::now();
        let request = TavilySearchRequest {
            api_key: &self.api_key,
            query,
            max_results,
            search_depth: &self.search_depth,
            include_answer: false,
        };

        let resp: TavilySearchResponse = self
            .client
            .post(TAVILY_SEARCH_URL)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let articles = into_articles(resp, query, max_results);
        info!(
            count = articles.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Tavily search completed"
        );
        debug!(urls = ?articles.iter().map(|a| &a.url).collect::<Vec<_>>(), "Tavily URLs");
        Ok(articles)
    }
}

fn into_articles(resp: TavilySearchResponse, query: &str, max_results: usize) -> Vec<Article> {
    resp.results
        .into_iter()
        .take(max_results)
        .map(|r| Article {
            title: r.title,
            url: r.url,
            content: r.content,
            score: r.score.unwrap_or(0.0),
            source_query: query.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = TavilySearchRequest {
            api_key: "tvly-key",
            query: "AI bubble",
            max_results: 8,
            search_depth: "advanced",
            include_answer: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["query"], "AI bubble");
        assert_eq!(json["max_results"], 8);
        assert_eq!(json["search_depth"], "advanced");
        assert_eq!(json["include_answer"], false);
    }

    #[test]
    fn test_response_mapping() {
        let body = r#"{
            "query": "AI bubble",
            "results": [
                {"title": "Chips rally", "url": "https://a.example/1", "content": "Nvidia soars", "score": 0.91},
                {"title": "No score", "url": "https://a.example/2", "content": "text"},
                {"title": "Third", "url": "https://a.example/3", "content": "more", "score": 0.2}
            ],
            "response_time": 1.2
        }"#;
        let resp: TavilySearchResponse = serde_json::from_str(body).unwrap();
        let articles = into_articles(resp, "AI bubble", 2);

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].score, 0.91);
        assert_eq!(articles[1].score, 0.0);
        assert!(articles.iter().all(|a| a.source_query == "AI bubble"));
    }

    #[test]
    fn test_missing_results_is_empty() {
        let resp: TavilySearchResponse = serde_json::from_str("{}").unwrap();
        assert!(into_articles(resp, "q", 8).is_empty());
    }

    #[test]
    fn test_debug_redacts_key() {
        let searcher = TavilySearcher::new(
            "tvly-secret".to_string(),
            reqwest::Client::new(),
            "basic".to_string(),
        );
        let dbg = format!("{searcher:?}");
        assert!(!dbg.contains("tvly-secret"));
        assert!(dbg.contains("basic"));
    }
}
