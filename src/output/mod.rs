//! Output: table persistence and reports
//!
//! - **Tables**: anything implementing [`Table`] can be persisted through a
//!   [`RecordSink`] (CSV files, or memory in tests)
//! - **Reports**: human-readable text ([`text`]) and JSON ([`json`]) summaries
//!   of a popularity run

pub mod csv;
pub mod json;
pub mod text;

pub use self::csv::CsvSink;

use crate::Result;
use std::collections::HashMap;

/// Row-oriented table with named columns
///
/// Cells are pre-formatted; an empty string is an absent value.
pub trait Table {
    fn columns(&self) -> Vec<&'static str>;

    fn len(&self) -> usize;

    fn row(&self, index: usize) -> Vec<String>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether a write replaces or extends its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create or truncate, then write header and rows
    Overwrite,
    /// Add rows to the end; the header is written only for a new destination
    Append,
}

impl WriteMode {
    /// Mode for the `index`-th write of a series into one destination
    pub fn for_part(index: usize) -> Self {
        if index == 0 {
            WriteMode::Overwrite
        } else {
            WriteMode::Append
        }
    }
}

/// Durable table storage
///
/// Failures are storage faults and are fatal to the run.
pub trait RecordSink {
    fn write_table(&mut self, destination: &str, table: &dyn Table, mode: WriteMode) -> Result<()>;
}

/// Sink that keeps tables in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: HashMap<String, StoredTable>,
}

/// A table held by [`MemorySink`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, destination: &str) -> Option<&StoredTable> {
        self.tables.get(destination)
    }
}

impl RecordSink for MemorySink {
    fn write_table(&mut self, destination: &str, table: &dyn Table, mode: WriteMode) -> Result<()> {
        let stored = self.tables.entry(destination.to_string()).or_default();
        if mode == WriteMode::Overwrite || stored.columns.is_empty() {
            stored.columns = table.columns().into_iter().map(String::from).collect();
        }
        if mode == WriteMode::Overwrite {
            stored.rows.clear();
        }
        stored.rows.extend((0..table.len()).map(|i| table.row(i)));
        Ok(())
    }
}
