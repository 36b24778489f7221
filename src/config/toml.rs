//! TOML configuration file parsing

use super::cli::{Cli, Command, InputArgs, OutputArgs};
use super::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Config {
    match &cli.command {
        Command::Assign { input, output, subtypes, blk_num, parallel } => {
            merge_input(input, &mut config.input);
            merge_output(output, &mut config.output);
            if !subtypes.is_empty() {
                config.identity.subtypes = subtypes.clone();
            }
            if let Some(path) = blk_num {
                config.identity.blk_num = Some(path.clone());
            }
            if *parallel {
                config.identity.parallel = true;
            }
        }
        Command::Aggregate { input, output } => {
            merge_input(input, &mut config.input);
            merge_output(output, &mut config.output);
        }
        Command::Popularity { output, categories, top_fraction, max_evaluations, lenient_fit, pareto_table, .. } => {
            merge_output(output, &mut config.output);
            if !categories.is_empty() {
                config.popularity.categories = categories.clone();
            }
            if let Some(fraction) = top_fraction {
                config.popularity.top_fraction = *fraction;
            }
            if let Some(budget) = max_evaluations {
                config.popularity.fit_max_evaluations = *budget;
            }
            if *lenient_fit {
                config.popularity.strict_fit = false;
            }
            if *pareto_table {
                config.output.pareto_table = true;
            }
        }
        Command::Synth { .. } => {}
    }

    config
}

fn merge_input(args: &InputArgs, input: &mut InputConfig) {
    if let Some(ref dir) = args.input_dir {
        input.dir = dir.clone();
    }
    if let Some(ref prefix) = args.input {
        input.prefix = prefix.clone();
    }
    if let Some(count) = args.chunk_count {
        input.chunk_count = count;
    }
}

fn merge_output(args: &OutputArgs, output: &mut OutputConfig) {
    if let Some(ref dir) = args.output_dir {
        output.dir = dir.clone();
    }
    if let Some(ref name) = args.output {
        output.name = name.clone();
    }
    if let Some(ref path) = args.json {
        output.json_report = Some(path.clone());
    }
}
