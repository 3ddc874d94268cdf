//! News search sources with retry and rate-limited collection.
//!
//! # Architecture
//!
//! - [`SearchSource`]: Core trait, one query in, a list of [`Article`]s out
//! - [`tavily::TavilySearcher`]: Tavily search API (requires an API key)
//! - [`google_news::GoogleNewsRss`]: Google News RSS search feed (no key)
//! - [`RetrySearch`]: Decorator that adds exponential backoff to any source
//!
//! [`collect_news`] runs queries one at a time with a fixed delay between
//! them, skips queries that fail, and deduplicates the results by url.
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
//! ```

pub mod google_news;
pub mod tavily;

use crate::models::Article;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use rand::{Rng, rng};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// A source of news articles for a free-text query.
pub trait SearchSource {
    /// Short label stored with snapshots (e.g. `"tavily_api"`).
    fn name(&self) -> &'static str;

    /// Run one query and return at most `max_results` articles.
    ///
    /// Every returned article carries `query` as its `source_query`.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Article>, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`SearchSource`].
pub struct RetrySearch<T> {
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Upper bound on the exponential part of the delay.
    max_delay: StdDuration,
    /// Upper bound on the random jitter added to every delay.
    max_jitter: StdDuration,
}

impl<T> RetrySearch<T>
where
    T: SearchSource,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
            max_jitter: StdDuration::from_millis(250),
        }
    }

    #[cfg(test)]
    pub fn with_max_jitter(mut self, max_jitter: StdDuration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=self.max_jitter.as_millis() as u64);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetrySearch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySearch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> SearchSource for RetrySearch<T>
where
    T: SearchSource,
{
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    #[instrument(level = "info", skip_all, fields(%query))]
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Article>, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.search(query, max_results).await {
                Ok(articles) => return Ok(articles),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "search exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "search attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// The source selected on the command line, each wrapped in retries.
#[derive(Debug)]
pub enum NewsSource {
    Tavily(RetrySearch<tavily::TavilySearcher>),
    GoogleNews(RetrySearch<google_news::GoogleNewsRss>),
}

impl SearchSource for NewsSource {
    fn name(&self) -> &'static str {
        match self {
            NewsSource::Tavily(s) => s.name(),
            NewsSource::GoogleNews(s) => s.name(),
        }
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Article>, Box<dyn Error>> {
        match self {
            NewsSource::Tavily(s) => s.search(query, max_results).await,
            NewsSource::GoogleNews(s) => s.search(query, max_results).await,
        }
    }
}

/// Run `queries` one after another against `source`.
///
/// Waits `delay` between consecutive queries. A query that fails is logged
/// and contributes nothing.
///
/// # Arguments
///
/// * `source` - Any [`SearchSource`], usually wrapped in [`RetrySearch`]
/// * `queries` - Queries to run, in order
/// * `max_results` - Results requested per query
/// * `delay` - Pause before every query except the first
///
/// # Returns
///
/// The combined results passed through [`dedupe_by_url`]. An empty list when
/// every query failed.
///
/// # Examples
///
/// ```ignore
/// let queries = vec!["AI bubble".to_string(), "AI hype".to_string()];
/// let articles = collect_news(&source, &queries, 8, Duration::from_secs(1)).await;
/// ```
#[instrument(level = "info", skip_all, fields(source = source.name(), queries = queries.len()))]
pub async fn collect_news<S>(
    source: &S,
    queries: &[String],
    max_results: usize,
    delay: StdDuration,
) -> Vec<Article>
where
    S: SearchSource,
{
    let batches: Vec<Vec<Article>> = stream::iter(queries.iter().enumerate())
        .then(move |(i, query)| async move {
            if i > 0 && !delay.is_zero() {
                sleep(delay).await;
            }
            match source.search(query, max_results).await {
                Ok(articles) => {
                    info!(%query, count = articles.len(), "Query returned articles");
                    articles
                }
                Err(e) => {
                    warn!(%query, error = %e, "Query failed; skipping");
                    Vec::new()
                }
            }
        })
        .collect()
        .await;

    let total: usize = batches.iter().map(Vec::len).sum();
    let articles = dedupe_by_url(batches.into_iter().flatten());
    info!(raw = total, unique = articles.len(), "Collected news");
    articles
}

/// Keep one article per url and sort by score.
///
/// The highest score wins and the first seen wins on ties. Articles with a
/// blank url are dropped. The output is sorted by score descending with url
/// as the tie-breaker, so deduplicating twice changes nothing.
///
/// # Examples
///
/// ```ignore
/// let deduped = dedupe_by_url(vec![low_a, high_a, b]);
/// assert_eq!(deduped.len(), 2);
/// assert_eq!(deduped[0].url, high_a_url);
/// ```
pub fn dedupe_by_url(articles: impl IntoIterator<Item = Article>) -> Vec<Article> {
    let mut by_url: HashMap<String, Article> = HashMap::new();
    for article in articles {
        if article.url.trim().is_empty() {
            continue;
        }
        let better = by_url
            .get(&article.url)
            .is_none_or(|prev| article.score > prev.score);
        if better {
            by_url.insert(article.url.clone(), article);
        }
    }

    by_url
        .into_values()
        .sorted_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.url.cmp(&b.url)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn article(url: &str, score: f64, query: &str) -> Article {
        Article {
            title: format!("Title for {url}"),
            url: url.to_string(),
            content: String::new(),
            score,
            source_query: query.to_string(),
        }
    }

    /// Fails the first `failures` calls, then succeeds.
    #[derive(Debug)]
    struct FlakySource {
        failures: usize,
        calls: Cell<usize>,
    }

    impl SearchSource for FlakySource {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn search(&self, query: &str, _max: usize) -> Result<Vec<Article>, Box<dyn Error>> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            if n < self.failures {
                return Err("temporary failure".into());
            }
            Ok(vec![article("https://example.com/a", 0.5, query)])
        }
    }

    /// Fails for queries containing "bad".
    #[derive(Debug)]
    struct ScriptedSource;

    impl SearchSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn search(&self, query: &str, _max: usize) -> Result<Vec<Article>, Box<dyn Error>> {
            if query.contains("bad") {
                return Err("upstream 500".into());
            }
            Ok(vec![
                article(
                    "https://example.com/shared",
                    if query == "one" { 0.4 } else { 0.9 },
                    query,
                ),
                article(&format!("https://example.com/{query}"), 0.5, query),
            ])
        }
    }

    #[test]
    fn test_dedupe_keeps_max_score() {
        let deduped = dedupe_by_url(vec![
            article("https://x.com/1", 0.2, "q1"),
            article("https://x.com/1", 0.7, "q2"),
            article("https://x.com/2", 0.5, "q1"),
            article("https://x.com/1", 0.3, "q3"),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].url, "https://x.com/1");
        assert_eq!(deduped[0].score, 0.7);
        assert_eq!(deduped[0].source_query, "q2");
        assert_eq!(deduped[1].url, "https://x.com/2");
    }

    #[test]
    fn test_dedupe_first_wins_on_tie_and_drops_empty_urls() {
        let deduped = dedupe_by_url(vec![
            article("https://x.com/1", 0.5, "first"),
            article("https://x.com/1", 0.5, "second"),
            article("", 0.9, "first"),
            article("   ", 0.9, "first"),
        ]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].source_query, "first");
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let input = vec![
            article("https://x.com/b", 0.5, "q"),
            article("https://x.com/a", 0.5, "q"),
            article("https://x.com/c", 0.9, "q"),
            article("https://x.com/a", 0.1, "q"),
        ];
        let once = dedupe_by_url(input);
        let twice = dedupe_by_url(once.clone());
        assert_eq!(once, twice);
        let urls: Vec<&str> = once.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["https://x.com/c", "https://x.com/a", "https://x.com/b"]);
    }

    #[tokio::test]
    async fn test_retry_recovers_after_failures() {
        let source = RetrySearch::new(
            FlakySource { failures: 2, calls: Cell::new(0) },
            3,
            StdDuration::from_millis(1),
        )
        .with_max_jitter(StdDuration::ZERO);

        let articles = source.search("ai bubble", 5).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(source.inner.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let source = RetrySearch::new(
            FlakySource { failures: 10, calls: Cell::new(0) },
            2,
            StdDuration::from_millis(1),
        )
        .with_max_jitter(StdDuration::ZERO);

        assert!(source.search("ai bubble", 5).await.is_err());
        assert_eq!(source.inner.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_collect_news_skips_failed_queries_and_dedupes() {
        let queries = vec!["one".to_string(), "bad query".to_string(), "two".to_string()];
        let articles = collect_news(&ScriptedSource, &queries, 8, StdDuration::ZERO).await;

        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0].url, "https://example.com/shared");
        assert_eq!(articles[0].score, 0.9);
        assert_eq!(articles[0].source_query, "two");
        assert!(articles.iter().all(|a| !a.source_query.contains("bad")));
    }
}
