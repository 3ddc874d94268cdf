//! Output generation: dashboard CSV exports, the JSON report and Markdown
//! renderings.
//!
//! # Submodules
//!
//! - [`dashboard`]: Flat CSV tables for dashboard tools
//! - [`json`]: Writes the bubble report as JSON
//! - [`markdown`]: Human-readable report, trends, history and status views

pub mod dashboard;
pub mod json;
pub mod markdown;
