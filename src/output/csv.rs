//! CSV table output
//!
//! Tables land in `{dir}/{destination}.csv`. Overwrite truncates the file and
//! writes the header; append keeps existing rows and only writes the header
//! when the file is new or empty, so a series of per-chunk writes produces
//! one well-formed table.

use super::{RecordSink, Table, WriteMode};
use crate::Result;
use anyhow::Context;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;

/// CSV writer for analysis tables
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a destination is written to
    pub fn path_for(&self, destination: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", destination))
    }
}

impl RecordSink for CsvSink {
    fn write_table(&mut self, destination: &str, table: &dyn Table, mode: WriteMode) -> Result<()> {
        let path = self.path_for(destination);
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create output directory: {}", self.dir.display()))?;

        let file = match mode {
            WriteMode::Overwrite => OpenOptions::new().write(true).create(true).truncate(true).open(&path),
            WriteMode::Append => OpenOptions::new().append(true).create(true).open(&path),
        }
        .with_context(|| format!("Failed to open {}", path.display()))?;

        let needs_header = match mode {
            WriteMode::Overwrite => true,
            WriteMode::Append => file.metadata()?.len() == 0,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(table.columns())?;
        }
        for i in 0..table.len() {
            writer.write_record(table.row(i))?;
        }

        // Flush to ensure data is written
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::debug!(path = %path.display(), rows = table.len(), ?mode, "table written");
        Ok(())
    }
}
