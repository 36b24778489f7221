//! blocktrace CLI entry point

use anyhow::{Context, Result};
use blocktrace::config::cli::{Cli, Command, SynthDistribution};
use blocktrace::config::toml::{merge_cli_with_config, parse_toml_file};
use blocktrace::config::validator::validate_config;
use blocktrace::config::Config;
use blocktrace::distribution::uniform::UniformSampler;
use blocktrace::distribution::zipf::ZipfSampler;
use blocktrace::distribution::BlockSampler;
use blocktrace::output::{text, CsvSink};
use blocktrace::pipeline;
use blocktrace::synth::{self, SynthSpec};
use blocktrace::trace::CsvChunkSource;
use std::time::Instant;
use tracing::Level;

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli.validate()?;

    init_logging(&cli);

    println!("blocktrace v{}", env!("CARGO_PKG_VERSION"));
    println!();

    let start = Instant::now();

    match &cli.command {
        Command::Assign { .. } => run_assign(&load_config(&cli)?)?,
        Command::Aggregate { .. } => run_aggregate(&load_config(&cli)?)?,
        Command::Popularity { input, .. } => run_popularity(&load_config(&cli)?, input)?,
        Command::Synth { .. } => run_synth(&cli)?,
    }

    tracing::debug!(elapsed_secs = start.elapsed().as_secs_f64(), "run finished");
    Ok(())
}

fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// TOML file (if any) with CLI overrides applied, validated and displayed
fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    let config = merge_cli_with_config(cli, config);
    validate_config(&config).context("Configuration validation failed")?;

    println!("{}", config);
    println!();
    Ok(config)
}

fn run_assign(config: &Config) -> Result<()> {
    let source = CsvChunkSource::new(&config.input.dir, &config.input.prefix);
    let mut sink = CsvSink::new(&config.output.dir);

    let outcome = pipeline::run_assign(config, &source, &mut sink)?;

    text::print_identity_results(&outcome);
    println!("Wrote {}", sink.path_for(&config.output.name).display());
    if config.identity.blk_num.is_none() {
        let name = pipeline::identity_table_name(&config.output.name);
        println!("Wrote {}", sink.path_for(&name).display());
    }
    Ok(())
}

fn run_aggregate(config: &Config) -> Result<()> {
    let source = CsvChunkSource::new(&config.input.dir, &config.input.prefix);
    let mut sink = CsvSink::new(&config.output.dir);

    let counts = pipeline::run_aggregate(config, &source, &mut sink)?;

    text::print_aggregate_results(&counts);
    println!("Wrote {}", sink.path_for(&config.output.name).display());
    Ok(())
}

fn run_popularity(config: &Config, input: &std::path::Path) -> Result<()> {
    let mut sink = CsvSink::new(&config.output.dir);

    let report = pipeline::run_popularity(config, input, &mut sink)?;

    text::print_popularity_results(&report);
    println!("Wrote {}", sink.path_for(&config.output.name).display());
    if config.output.pareto_table {
        println!("Wrote {}", sink.path_for(&format!("{}_pareto", config.output.name)).display());
    }
    if let Some(ref path) = config.output.json_report {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_synth(cli: &Cli) -> Result<()> {
    let Command::Synth {
        output_dir,
        prefix,
        chunks,
        records_per_chunk,
        blocks,
        distribution,
        zipf_theta,
        write_percent,
        seed,
    } = &cli.command
    else {
        anyhow::bail!("not a synth command");
    };

    let seed = seed.unwrap_or_else(rand::random);
    let spec = SynthSpec {
        chunks: *chunks,
        records_per_chunk: *records_per_chunk,
        write_percent: *write_percent,
        seed,
        ..SynthSpec::default()
    };

    let mut sampler: Box<dyn BlockSampler> = match distribution {
        SynthDistribution::Uniform => Box::new(UniformSampler::with_seed(*blocks, seed)),
        SynthDistribution::Zipf => Box::new(ZipfSampler::with_seed(*zipf_theta, *blocks, seed)),
    };

    println!("Synthetic trace:");
    println!("  Distribution: {:?} over {} blocks", distribution, blocks);
    println!("  Chunks:       {} x {} accesses", chunks, records_per_chunk);
    println!("  Writes:       {}%", write_percent);
    println!("  Seed:         {}", seed);
    println!();

    let source = synth::generate(&spec, sampler.as_mut());
    let mut sink = CsvSink::new(output_dir);
    synth::write_chunks(&source, &mut sink, prefix)?;

    println!("Wrote {}", sink.path_for(&format!("{}_<0..{}>", prefix, chunks)).display());
    Ok(())
}
