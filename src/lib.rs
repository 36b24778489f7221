//! blocktrace - block popularity analysis for chunked memory-access traces
//!
//! blocktrace reads memory-access traces split into numbered chunks, assigns
//! every distinct block address a stable dense identity across the whole
//! trace, and measures how concentrated block popularity is.
//!
//! # Architecture
//!
//! - **Trace sources**: CSV chunk files or in-memory chunks behind one trait
//! - **Block identity**: cross-chunk first-seen numbering, then per-chunk
//!   projection into `blk_readi` / `blk_readd` / `blk_write` columns
//! - **Popularity**: fractional ranks, Pareto curves and power-law fits per
//!   access category (`read`, `write`, `read&write`)
//! - **Sinks**: CSV tables plus text and JSON reports
//! - **Synthetic traces**: Zipf or uniform block popularity for testing

pub mod config;
pub mod distribution;
pub mod error;
pub mod identity;
pub mod output;
pub mod pipeline;
pub mod stats;
pub mod synth;
pub mod trace;

// Re-export commonly used types
pub use config::Config;
pub use error::AnalysisError;

/// Result type used throughout blocktrace
pub type Result<T> = anyhow::Result<T>;
