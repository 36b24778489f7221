//! Error types
//!
//! Library operations that have a well-defined failure surface return
//! [`AnalysisError`]. Orchestration code (pipeline, CLI) wraps these in
//! `anyhow` with context, the same way the rest of the crate reports errors.

use crate::stats::powerlaw::FitError;
use crate::trace::Category;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the analysis core and its storage adapters
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The storage behind a chunk identifier does not exist
    #[error("chunk {chunk} not found at {}", location.display())]
    ChunkNotFound { chunk: usize, location: PathBuf },

    /// A requested category has no rows in the aggregated table
    #[error("category '{category}' has no entries")]
    EmptyCategory { category: Category },

    /// A requested category has rows but their counts sum to zero
    #[error("category '{category}' has a total reference count of zero")]
    ZeroTotal { category: Category },

    /// Power-law fitting failed for a category
    #[error("power-law fit failed for category '{category}'")]
    Fit {
        category: Category,
        #[source]
        source: FitError,
    },

    /// A table did not have the expected shape
    #[error("malformed table {}: {reason}", location.display())]
    MalformedTable { location: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
