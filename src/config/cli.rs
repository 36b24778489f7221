//! CLI argument parsing using clap

use crate::trace::{Category, Subtype};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// blocktrace - memory block access trace analysis
#[derive(Parser, Debug)]
#[command(name = "blocktrace")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file (CLI options take precedence)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Only log warnings and errors
    #[arg(short = 'q', long, global = true, conflicts_with = "debug")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Chunked trace location
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Chunk file prefix: chunk i is read from <PREFIX>_<i>.csv
    #[arg(short = 'i', long = "input", value_name = "PREFIX")]
    pub input: Option<String>,

    /// Directory holding the chunk files
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Number of chunks to scan
    #[arg(short = 'c', long)]
    pub chunk_count: Option<usize>,
}

/// Output location
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Base name of the output tables
    #[arg(short = 'o', long = "output", value_name = "NAME")]
    pub output: Option<String>,

    /// Directory output tables are written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Write a JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Assign access-ordered block ids across all chunks and project them onto each chunk
    Assign {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Subtypes to project (repeatable; default: readi, readd, write)
        #[arg(long = "subtype", value_enum, value_delimiter = ',')]
        subtypes: Vec<Subtype>,

        /// Reuse an identity table saved by an earlier run
        #[arg(short = 'b', long, value_name = "FILE")]
        blk_num: Option<PathBuf>,

        /// Project chunks in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Aggregate raw chunks into per-category reference counts
    Aggregate {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Rank blocks by popularity, build Pareto summaries and fit power laws
    Popularity {
        /// Aggregated (blockaddress, count, type) CSV table
        #[arg(short = 'i', long = "input", value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        /// Categories to analyze (repeatable; default: read, write, read&write)
        #[arg(long = "category", value_enum, value_delimiter = ',')]
        categories: Vec<Category>,

        /// Fraction of top blocks for the concentration summary
        #[arg(long)]
        top_fraction: Option<f64>,

        /// Evaluation budget of the power-law solver
        #[arg(long)]
        max_evaluations: Option<usize>,

        /// Record fit failures in the report instead of aborting
        #[arg(long)]
        lenient_fit: bool,

        /// Also write the Pareto curves as <NAME>_pareto.csv
        #[arg(short = 'p', long)]
        pareto_table: bool,
    },

    /// Generate a synthetic chunked trace
    Synth {
        /// Directory to write chunk files into
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Chunk file prefix
        #[arg(short = 'o', long = "output", default_value = "synth")]
        prefix: String,

        /// Number of chunks
        #[arg(short = 'c', long, default_value = "4")]
        chunks: usize,

        /// Accesses per chunk
        #[arg(long, default_value = "10000")]
        records_per_chunk: usize,

        /// Number of distinct blocks in the address space
        #[arg(long, default_value = "4096")]
        blocks: u64,

        /// Block popularity distribution
        #[arg(long, value_enum, default_value = "zipf")]
        distribution: SynthDistribution,

        /// Zipf theta parameter (0.0-3.0)
        #[arg(long, default_value = "1.2")]
        zipf_theta: f64,

        /// Write percentage (0-100); reads are split evenly between readi and readd
        #[arg(long, default_value = "30")]
        write_percent: u8,

        /// Seed for reproducible traces
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Popularity distribution of synthetic traces
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SynthDistribution {
    Uniform,
    Zipf,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments that do not go through [`Config`](super::Config)
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Command::Synth { chunks, blocks, zipf_theta, write_percent, .. } = &self.command {
            if *chunks == 0 {
                anyhow::bail!("synth needs at least 1 chunk");
            }
            if *blocks == 0 {
                anyhow::bail!("synth needs at least 1 block");
            }
            if !(0.0..=3.0).contains(zipf_theta) {
                anyhow::bail!("zipf_theta must be between 0.0 and 3.0, got {}", zipf_theta);
            }
            if *write_percent > 100 {
                anyhow::bail!("write_percent must be between 0 and 100, got {}", write_percent);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assign() {
        let cli = Cli::parse_from([
            "blocktrace", "assign", "-i", "trace", "-o", "out", "-c", "8", "--subtype", "readi,write",
        ]);
        match cli.command {
            Command::Assign { input, output, subtypes, blk_num, parallel } => {
                assert_eq!(input.input.as_deref(), Some("trace"));
                assert_eq!(input.chunk_count, Some(8));
                assert_eq!(output.output.as_deref(), Some("out"));
                assert_eq!(subtypes, vec![Subtype::ReadI, Subtype::Write]);
                assert!(blk_num.is_none());
                assert!(!parallel);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_categories() {
        let cli = Cli::parse_from([
            "blocktrace", "popularity", "-i", "agg.csv", "--category", "read&write", "--category", "read",
        ]);
        match cli.command {
            Command::Popularity { categories, .. } => {
                assert_eq!(categories, vec![Category::ReadWrite, Category::Read]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_validate_synth() {
        let cli = Cli::parse_from(["blocktrace", "synth", "--zipf-theta", "4.0"]);
        assert!(cli.validate().is_err());

        let cli = Cli::parse_from(["blocktrace", "synth", "--seed", "7"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_debug_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["blocktrace", "--debug", "-q", "aggregate"]).is_err());
    }
}
