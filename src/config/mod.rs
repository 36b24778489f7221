//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! The analysis core only ever sees the plain structs defined here.

pub mod cli;
pub mod toml;
pub mod validator;

use crate::stats::pareto::DEFAULT_TOP_FRACTION;
use crate::stats::powerlaw::{FitOptions, DEFAULT_MAX_EVALUATIONS, DEFAULT_TOLERANCE};
use crate::trace::{Category, Subtype};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub popularity: PopularityConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the chunked trace lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory holding the chunk files
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    /// Chunk file prefix: chunk `i` is `{prefix}_{i}.csv`
    #[serde(default = "default_input_prefix")]
    pub prefix: String,
    /// Number of chunks to scan
    #[serde(default = "default_chunk_count")]
    pub chunk_count: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            prefix: default_input_prefix(),
            chunk_count: default_chunk_count(),
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_input_prefix() -> String {
    "input".to_string()
}

fn default_chunk_count() -> usize {
    100
}

/// Identity assignment and projection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Subtypes that get a projected id column
    #[serde(default = "default_subtypes")]
    pub subtypes: Vec<Subtype>,
    /// Reuse a previously saved identity table instead of scanning
    #[serde(default)]
    pub blk_num: Option<PathBuf>,
    /// Project chunks on a thread pool
    #[serde(default)]
    pub parallel: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            subtypes: default_subtypes(),
            blk_num: None,
            parallel: false,
        }
    }
}

fn default_subtypes() -> Vec<Subtype> {
    Subtype::ALL.to_vec()
}

/// Popularity statistics settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularityConfig {
    /// Categories to rank, in report order
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,
    /// Fraction of top blocks used for the concentration summary [0.0, 1.0)
    #[serde(default = "default_top_fraction")]
    pub top_fraction: f64,
    /// Evaluation budget of the power-law solver
    #[serde(default = "default_fit_max_evaluations")]
    pub fit_max_evaluations: usize,
    /// Abort the run when a fit does not converge
    #[serde(default = "default_strict_fit")]
    pub strict_fit: bool,
}

impl PopularityConfig {
    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            max_evaluations: self.fit_max_evaluations,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl Default for PopularityConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            top_fraction: default_top_fraction(),
            fit_max_evaluations: default_fit_max_evaluations(),
            strict_fit: default_strict_fit(),
        }
    }
}

fn default_categories() -> Vec<Category> {
    Category::ALL.to_vec()
}

fn default_top_fraction() -> f64 {
    DEFAULT_TOP_FRACTION
}

fn default_fit_max_evaluations() -> usize {
    DEFAULT_MAX_EVALUATIONS
}

fn default_strict_fit() -> bool {
    true
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory output tables are written to
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    /// Base name of output tables
    #[serde(default = "default_output_name")]
    pub name: String,
    /// Also write the Pareto curves as `{name}_pareto.csv`
    #[serde(default)]
    pub pareto_table: bool,
    /// Write a JSON report to this path
    #[serde(default)]
    pub json_report: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            name: default_output_name(),
            pareto_table: false,
            json_report: None,
        }
    }
}

fn default_output_name() -> String {
    "output".to_string()
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Input:")?;
        writeln!(f, "  Chunks:      {}/{}_<0..{}>.csv", self.input.dir.display(), self.input.prefix, self.input.chunk_count)?;
        writeln!(f, "Output:")?;
        writeln!(f, "  Tables:      {}/{}*.csv", self.output.dir.display(), self.output.name)?;
        let categories: Vec<String> = self.popularity.categories.iter().map(|c| c.to_string()).collect();
        writeln!(f, "Popularity:")?;
        writeln!(f, "  Categories:  {}", categories.join(", "))?;
        writeln!(f, "  Top share:   {:.0}%", self.popularity.top_fraction * 100.0)?;
        write!(f, "  Fit budget:  {} evaluations", self.popularity.fit_max_evaluations)
    }
}
