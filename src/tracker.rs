//! The tracked-news store: the current top-N most relevant articles.
//!
//! The store is a single JSON file (`tracked_news.json`) holding at most
//! `max_articles` entries ranked by relevance score. New search results are
//! merged in by url, each article is analyzed once (unless a re-analysis is
//! forced), and the resulting analyses feed the bubble report and the
//! dashboard exports.
//!
//! # File layout
//!
//! ```text
//! {
//!   "last_updated": "2025-10-13T09:00:00+02:00",
//!   "articles": [ { "title": ..., "url": ..., "analysis": { ... } }, ... ]
//! }
//! ```

use crate::analysis::BubbleAnalyzer;
use crate::models::{Article, BubbleReport, IndicatorRecord, NewsAnalysis, TrackedArticle};
use crate::utils::write_atomically;
use chrono::{DateTime, Days, Local};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

pub const TRACKED_NEWS_FILE: &str = "tracked_news.json";

#[derive(Debug, Serialize, Deserialize)]
struct TrackerFile {
    last_updated: DateTime<Local>,
    #[serde(default)]
    articles: Vec<TrackedArticle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// Results whose url was not tracked before the merge.
    pub added_articles: usize,
    pub total_tracked: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzeOutcome {
    /// Articles scored during this call.
    pub analyzed_count: usize,
    /// Tracked articles that now carry an analysis.
    pub total_analyses: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerStatus {
    pub total_articles: usize,
    pub analyzed_articles: usize,
    pub pending_analysis: usize,
    pub data_file: String,
}

/// The tracked set of the top `max_articles` articles by relevance score.
///
/// Every mutating operation saves the whole set back to its JSON file.
///
/// # Examples
///
/// ```ignore
/// let mut tracker = NewsTracker::load("bubble_data/tracked_news.json", 10).await;
/// tracker.add_articles(articles, Local::now()).await?;
/// tracker.analyze(&BubbleAnalyzer::new(), false, Local::now()).await?;
/// let report = tracker.bubble_report(&BubbleAnalyzer::new(), Local::now());
/// ```
#[derive(Debug)]
pub struct NewsTracker {
    data_file: PathBuf,
    articles: Vec<TrackedArticle>,
    max_articles: usize,
}

impl NewsTracker {
    /// Open the store at `data_file`.
    ///
    /// A missing file yields an empty tracker. An unreadable or corrupt file
    /// is logged and also yields an empty tracker; it is overwritten on the
    /// next save.
    #[instrument(level = "info", skip_all, fields(path = %data_file.as_ref().display()))]
    pub async fn load(data_file: impl AsRef<Path>, max_articles: usize) -> Self {
        let data_file = data_file.as_ref().to_path_buf();
        let articles = match fs::read_to_string(&data_file).await {
            Ok(raw) => match serde_json::from_str::<TrackerFile>(&raw) {
                Ok(file) => file.articles,
                Err(e) => {
                    error!(error = %e, "Tracked news file is corrupt; starting empty");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No tracked news file yet");
                Vec::new()
            }
            Err(e) => {
                error!(error = %e, "Failed to read tracked news file; starting empty");
                Vec::new()
            }
        };
        info!(count = articles.len(), "Loaded tracked articles");

        Self {
            data_file,
            articles,
            max_articles,
        }
    }

    /// Write the store, creating the parent directory when needed.
    #[instrument(level = "info", skip_all, fields(path = %self.data_file.display()))]
    pub async fn save(&self) -> Result<(), Box<dyn Error>> {
        if let Some(parent) = self.data_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let file = TrackerFile {
            last_updated: Local::now(),
            articles: self.articles.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        write_atomically(&self.data_file, json.as_bytes()).await?;
        debug!(count = self.articles.len(), "Saved tracked articles");
        Ok(())
    }

    pub fn articles(&self) -> &[TrackedArticle] {
        &self.articles
    }

    /// Merge search results by url, keep the top `max_articles` by score,
    /// and save.
    ///
    /// An already tracked article is replaced only by a strictly higher
    /// scoring result, which also discards its previous analysis.
    ///
    /// # Returns
    ///
    /// How many results were new urls and how many articles are tracked
    /// after truncation.
    #[instrument(level = "info", skip_all, fields(results = results.len()))]
    pub async fn add_articles(
        &mut self,
        results: Vec<Article>,
        now: DateTime<Local>,
    ) -> Result<AddOutcome, Box<dyn Error>> {
        let mut added_articles = 0;
        for result in results {
            if result.url.trim().is_empty() {
                continue;
            }
            match self.articles.iter().position(|a| a.url == result.url) {
                None => {
                    added_articles += 1;
                    self.articles.push(TrackedArticle::from_article(result, now));
                }
                Some(i) if result.score > self.articles[i].score => {
                    self.articles[i] = TrackedArticle::from_article(result, now);
                }
                Some(_) => {}
            }
        }

        self.articles.sort_by(|a, b| b.score.total_cmp(&a.score));
        self.articles.truncate(self.max_articles);
        self.save().await?;

        let outcome = AddOutcome {
            added_articles,
            total_tracked: self.articles.len(),
        };
        info!(added = outcome.added_articles, total = outcome.total_tracked, "Merged articles");
        Ok(outcome)
    }

    /// Analyze pending articles (all articles when `force` is set) and save.
    #[instrument(level = "info", skip_all, fields(force = force))]
    pub async fn analyze(
        &mut self,
        analyzer: &BubbleAnalyzer,
        force: bool,
        now: DateTime<Local>,
    ) -> Result<AnalyzeOutcome, Box<dyn Error>> {
        let mut analyzed_count = 0;
        for article in self.articles.iter_mut() {
            if article.is_analyzed && article.analysis.is_some() && !force {
                continue;
            }
            let analysis =
                analyzer.analyze_article(&article.title, &article.content, &article.url, now);
            debug!(
                url = %article.url,
                risk = analysis.overall_bubble_risk,
                "Analyzed tracked article"
            );
            article.analysis = Some(analysis);
            article.is_analyzed = true;
            analyzed_count += 1;
        }
        self.save().await?;

        let outcome = AnalyzeOutcome {
            analyzed_count,
            total_analyses: self.analyses().len(),
        };
        info!(
            analyzed = outcome.analyzed_count,
            total = outcome.total_analyses,
            "Analysis pass complete"
        );
        Ok(outcome)
    }

    /// Analyses of all tracked articles that have one, in tracking order.
    pub fn analyses(&self) -> Vec<NewsAnalysis> {
        self.articles.iter().filter_map(|a| a.analysis.clone()).collect()
    }

    pub fn bubble_report(
        &self,
        analyzer: &BubbleAnalyzer,
        now: DateTime<Local>,
    ) -> Option<BubbleReport> {
        analyzer.generate_report(&self.analyses(), now)
    }

    pub fn indicator_records(&self, analyzer: &BubbleAnalyzer) -> Vec<IndicatorRecord> {
        analyzer.indicator_records(&self.analyses())
    }

    /// Drop articles added more than `days` days before `now`.
    ///
    /// # Arguments
    ///
    /// * `days` - Age limit in days. A limit that reaches past the earliest
    ///   representable date keeps every article.
    /// * `now` - Reference time for the cutoff.
    ///
    /// # Returns
    ///
    /// The number of removed articles. The store is saved only when that
    /// number is non-zero.
    #[instrument(level = "info", skip_all, fields(days = days))]
    pub async fn remove_older_than(
        &mut self,
        days: u32,
        now: DateTime<Local>,
    ) -> Result<usize, Box<dyn Error>> {
        let Some(cutoff) = now.checked_sub_days(Days::new(days.into())) else {
            warn!("Cutoff is before the earliest representable date; nothing to remove");
            return Ok(0);
        };
        let before = self.articles.len();
        self.articles.retain(|a| a.added_date > cutoff);
        let removed = before - self.articles.len();
        if removed > 0 {
            self.save().await?;
            info!(removed, "Removed old articles");
        } else {
            warn!("No articles older than the cutoff");
        }
        Ok(removed)
    }

    pub fn status(&self) -> TrackerStatus {
        let analyzed_articles = self.articles.iter().filter(|a| a.is_analyzed).count();
        TrackerStatus {
            total_articles: self.articles.len(),
            analyzed_articles,
            pending_analysis: self.articles.len() - analyzed_articles,
            data_file: self.data_file.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn article(url: &str, score: f64, content: &str) -> Article {
        Article {
            title: format!("Story {url}"),
            url: url.to_string(),
            content: content.to_string(),
            score,
            source_query: "AI bubble".to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = NewsTracker::load(dir.path().join(TRACKED_NEWS_FILE), 10).await;
        assert!(tracker.articles().is_empty());
        assert_eq!(tracker.status().total_articles, 0);
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TRACKED_NEWS_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        let tracker = NewsTracker::load(&path, 10).await;
        assert!(tracker.articles().is_empty());
    }

    #[tokio::test]
    async fn test_add_keeps_top_n_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(TRACKED_NEWS_FILE);
        let mut tracker = NewsTracker::load(&path, 2).await;

        let outcome = tracker
            .add_articles(
                vec![
                    article("https://a", 0.3, ""),
                    article("https://b", 0.9, ""),
                    article("https://c", 0.6, ""),
                ],
                Local::now(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, AddOutcome { added_articles: 3, total_tracked: 2 });

        let urls: Vec<&str> = tracker.articles().iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b", "https://c"]);

        let reloaded = NewsTracker::load(&path, 2).await;
        assert_eq!(reloaded.articles(), tracker.articles());
    }

    #[tokio::test]
    async fn test_merge_replaces_only_higher_scores() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = NewsTracker::load(dir.path().join(TRACKED_NEWS_FILE), 10).await;
        let now = Local::now();
        let analyzer = BubbleAnalyzer::new();

        tracker
            .add_articles(vec![article("https://a", 0.5, "old bubble")], now)
            .await
            .unwrap();
        tracker.analyze(&analyzer, false, now).await.unwrap();

        let outcome = tracker
            .add_articles(vec![article("https://a", 0.4, "lower")], now)
            .await
            .unwrap();
        assert_eq!(outcome.added_articles, 0);
        assert_eq!(tracker.articles()[0].content, "old bubble");
        assert!(tracker.articles()[0].is_analyzed);

        tracker
            .add_articles(vec![article("https://a", 0.8, "higher")], now)
            .await
            .unwrap();
        assert_eq!(tracker.articles().len(), 1);
        assert_eq!(tracker.articles()[0].content, "higher");
        assert!(!tracker.articles()[0].is_analyzed);
        assert!(tracker.articles()[0].analysis.is_none());
    }

    #[tokio::test]
    async fn test_analyze_skips_analyzed_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = NewsTracker::load(dir.path().join(TRACKED_NEWS_FILE), 10).await;
        let analyzer = BubbleAnalyzer::new();
        let now = Local::now();

        tracker
            .add_articles(
                vec![
                    article(
                        "https://a",
                        0.9,
                        "A revolutionary AI bubble with billion dollar funding",
                    ),
                    article("https://b", 0.8, "Regulation and safety concerns grow"),
                ],
                now,
            )
            .await
            .unwrap();

        let first = tracker.analyze(&analyzer, false, now).await.unwrap();
        assert_eq!(first, AnalyzeOutcome { analyzed_count: 2, total_analyses: 2 });

        let second = tracker.analyze(&analyzer, false, now).await.unwrap();
        assert_eq!(second.analyzed_count, 0);
        assert_eq!(second.total_analyses, 2);

        let forced = tracker.analyze(&analyzer, true, now).await.unwrap();
        assert_eq!(forced.analyzed_count, 2);

        let status = tracker.status();
        assert_eq!(status.analyzed_articles, 2);
        assert_eq!(status.pending_analysis, 0);

        let report = tracker.bubble_report(&analyzer, now).unwrap();
        assert_eq!(report.total_articles, 2);
        assert_eq!(tracker.indicator_records(&analyzer).len(), 10);
    }

    #[tokio::test]
    async fn test_report_requires_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = NewsTracker::load(dir.path().join(TRACKED_NEWS_FILE), 10).await;
        tracker
            .add_articles(vec![article("https://a", 0.9, "text")], Local::now())
            .await
            .unwrap();
        assert!(tracker.bubble_report(&BubbleAnalyzer::new(), Local::now()).is_none());
        assert_eq!(tracker.status().pending_analysis, 1);
    }

    #[tokio::test]
    async fn test_remove_older_than() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TRACKED_NEWS_FILE);
        let mut tracker = NewsTracker::load(&path, 10).await;
        let now = Local::now();

        tracker
            .add_articles(vec![article("https://old", 0.9, "")], now - Duration::days(10))
            .await
            .unwrap();
        tracker
            .add_articles(vec![article("https://new", 0.5, "")], now - Duration::days(1))
            .await
            .unwrap();

        assert_eq!(tracker.remove_older_than(7, now).await.unwrap(), 1);
        assert_eq!(tracker.articles().len(), 1);
        assert_eq!(tracker.articles()[0].url, "https://new");
        assert_eq!(tracker.remove_older_than(7, now).await.unwrap(), 0);

        let reloaded = NewsTracker::load(&path, 10).await;
        assert_eq!(reloaded.articles().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_older_than_huge_limit_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = NewsTracker::load(dir.path().join(TRACKED_NEWS_FILE), 10).await;
        let now = Local::now();
        tracker
            .add_articles(vec![article("https://a", 0.9, "")], now - Duration::days(400))
            .await
            .unwrap();

        assert_eq!(tracker.remove_older_than(u32::MAX, now).await.unwrap(), 0);
        assert_eq!(tracker.articles().len(), 1);
    }
}
