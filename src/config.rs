//! Runtime settings.
//!
//! Settings are layered: built-in defaults, then an optional YAML file
//! (`--config`), then command-line flags applied by `main`. API keys never
//! live in the file; they come from the environment (a `.env` file is
//! honored) or the command line.
//!
//! ```yaml
//! queries:
//!   - AI bubble
//!   - AI startup valuations
//! max_results_per_query: 8
//! max_tracked_articles: 10
//! request_delay_ms: 1000
//! search_depth: advanced
//! ```

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Default search queries for bubble tracking.
pub const DEFAULT_QUERIES: &[&str] = &[
    "AI bubble",
    "AI market speculation",
    "AI investment frenzy",
    "AI startup valuations",
    "AI industry hype",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Queries run on every search.
    pub queries: Vec<String>,
    /// Results requested per query.
    pub max_results_per_query: usize,
    /// Size of the tracked article set (top N by relevance).
    pub max_tracked_articles: usize,
    /// Pause between consecutive search requests.
    pub request_delay_ms: u64,
    /// Tavily `search_depth` ("basic" or "advanced").
    pub search_depth: String,
    /// Retries per query after the first failed attempt.
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            queries: DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect(),
            max_results_per_query: 8,
            max_tracked_articles: 10,
            request_delay_ms: 1000,
            search_depth: "advanced".to_string(),
            max_retries: 3,
            retry_base_delay_ms: 1000,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults when no path is given.
    ///
    /// Keys missing from the file keep their default values.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = tokio::fs::read_to_string(Path::new(path)).await?;
        let settings = Self::from_yaml(&raw)?;
        info!(
            path,
            queries = settings.queries.len(),
            max_tracked = settings.max_tracked_articles,
            "Loaded configuration"
        );
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, Box<dyn Error>> {
        let settings: Settings = serde_yaml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.queries.iter().all(|q| q.trim().is_empty()) {
            return Err("configuration must list at least one non-empty query".into());
        }
        if self.max_results_per_query == 0 {
            return Err("max_results_per_query must be at least 1".into());
        }
        if self.max_tracked_articles == 0 {
            return Err("max_tracked_articles must be at least 1".into());
        }
        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Short, safe preview of a secret for logging.
pub fn preview_secret(value: &str) -> String {
    let prefix: String = value.chars().take(5).collect();
    format!("{}...({} chars)", prefix, value.chars().count())
}
