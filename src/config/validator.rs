//! Configuration validation

use super::*;
use anyhow::Result;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_input(&config.input)?;
    validate_identity(&config.identity)?;
    validate_popularity(&config.popularity)?;
    validate_output(&config.output)?;

    Ok(())
}

/// Validate input configuration
pub fn validate_input(input: &InputConfig) -> Result<()> {
    if input.chunk_count == 0 {
        anyhow::bail!("chunk_count must be at least 1");
    }

    if input.prefix.is_empty() {
        anyhow::bail!("input prefix must not be empty");
    }

    Ok(())
}

/// Validate identity configuration
pub fn validate_identity(identity: &IdentityConfig) -> Result<()> {
    if identity.subtypes.is_empty() {
        anyhow::bail!("at least one subtype must be projected");
    }

    let mut seen = Vec::with_capacity(identity.subtypes.len());
    for subtype in &identity.subtypes {
        if seen.contains(subtype) {
            anyhow::bail!("subtype '{}' listed more than once", subtype);
        }
        seen.push(*subtype);
    }

    if let Some(ref path) = identity.blk_num {
        if !path.is_file() {
            anyhow::bail!("identity table not found: {}", path.display());
        }
    }

    Ok(())
}

/// Validate popularity configuration
pub fn validate_popularity(popularity: &PopularityConfig) -> Result<()> {
    if popularity.categories.is_empty() {
        anyhow::bail!("at least one category must be analyzed");
    }

    let fraction = popularity.top_fraction;
    if !(0.0..1.0).contains(&fraction) {
        anyhow::bail!("top_fraction must be in [0.0, 1.0), got {}", fraction);
    }

    if popularity.fit_max_evaluations == 0 {
        anyhow::bail!("fit_max_evaluations must be at least 1");
    }

    let mut seen = Vec::with_capacity(popularity.categories.len());
    for category in &popularity.categories {
        if seen.contains(category) {
            anyhow::bail!("category '{}' listed more than once", category);
        }
        seen.push(*category);
    }

    Ok(())
}

/// Validate output configuration
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if output.name.is_empty() {
        anyhow::bail!("output name must not be empty");
    }

    if output.dir.exists() && !output.dir.is_dir() {
        anyhow::bail!("output directory is not a directory: {}", output.dir.display());
    }

    Ok(())
}
