//! Report assembly and rendering.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report};

use crate::views::View;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about a rendered report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Description of the data source.
    pub data_source: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Year selection, if any.
    pub year: Option<i64>,
    /// State selection, if any.
    pub state: Option<String>,
    /// Rows shown in top/bottom rankings.
    pub top_n: usize,
    /// Time spent building the views, in seconds.
    pub duration_seconds: f64,
}

/// The complete dashboard report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub views: Vec<View>,
}
