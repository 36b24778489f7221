//! JSON report output
//!
//! A popularity run can be summarized as JSON for downstream tooling
//! (notebooks, dashboards). The report carries per-category summaries only;
//! the full ranked table goes to CSV.

use crate::stats::{CategorySummary, PopularityReport};
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Serialized popularity report
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub version: &'static str,
    /// Table the statistics were computed from
    pub input: String,
    pub top_fraction: f64,
    pub total_rows: usize,
    pub skipped_rows: usize,
    pub categories: &'a [CategorySummary],
}

impl<'a> JsonReport<'a> {
    pub fn new(report: &'a PopularityReport, input: &Path) -> Self {
        Self {
            generated_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
            input: input.display().to_string(),
            top_fraction: report.top_fraction,
            total_rows: report.ranked.entries.len(),
            skipped_rows: report.ranked.skipped,
            categories: &report.summaries,
        }
    }
}

/// Write the JSON report for `report` to `path`
pub fn write_json_report(path: &Path, report: &PopularityReport, input: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create JSON report: {}", path.display()))?;

    serde_json::to_writer_pretty(BufWriter::new(file), &JsonReport::new(report, input))
        .with_context(|| format!("Failed to write JSON report: {}", path.display()))?;

    Ok(())
}
