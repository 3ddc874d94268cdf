//! JSON report output.
//!
//! The bubble report is written as pretty-printed JSON next to the stores:
//! ```text
//! <data-dir>/
//! ├── tracked_news.json
//! ├── daily_snapshots.json
//! └── bubble_report.json
//! ```

use crate::models::BubbleReport;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub const BUBBLE_REPORT_FILE: &str = "bubble_report.json";

/// Write a [`BubbleReport`] to `{output_dir}/bubble_report.json`.
///
/// Creates `output_dir` if needed and returns the path written.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_report(
    report: &BubbleReport,
    output_dir: &Path,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(error = %e, "Failed to create report dir");
        return Err(e.into());
    }

    let path = output_dir.join(BUBBLE_REPORT_FILE);
    fs::write(&path, json).await?;
    info!(path = %path.display(), articles = report.total_articles, "Wrote bubble report");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::BubbleAnalyzer;
    use chrono::Local;

    #[tokio::test]
    async fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = BubbleAnalyzer::new();
        let analysis = analyzer.analyze_article(
            "AI valuations soar",
            "A record funding round values the AI startup at 80 billion dollars.",
            "https://example.com/x",
            Local::now(),
        );
        let report = analyzer.generate_report(&[analysis], Local::now()).unwrap();

        let path = write_report(&report, &dir.path().join("nested")).await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["total_articles"], 1);
        assert!(value["indicator_averages"]["hype_level"].is_number());
        assert_eq!(value["individual_analyses"][0]["url"], "https://example.com/x");

        let back: BubbleReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, report);
    }
}
