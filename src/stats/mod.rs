//! Popularity statistics
//!
//! This module turns an aggregated `(blockaddress, count, type)` table into
//! per-category popularity statistics.
//!
//! # Pipeline
//!
//! - [`aggregator`]: raw chunks -> per-category reference counts
//! - [`popularity`]: counts -> rank, share and percentile rank
//! - [`pareto`]: shares -> cumulative share curve and top-fraction summary
//! - [`powerlaw`]: counts -> Zipf exponent and scale
//!
//! [`analyze_popularity`] runs the last three for every requested category
//! and collects the results in a [`PopularityReport`].

pub mod aggregator;
pub mod pareto;
pub mod popularity;
pub mod powerlaw;
pub mod rank;

use crate::config::PopularityConfig;
use crate::error::AnalysisError;
use crate::trace::{AccessRecord, Category};
use pareto::ParetoCurve;
use popularity::{rank_popularity, RankedTable};
use powerlaw::{fit_power_law, PowerLawFit};
use serde::Serialize;

/// Outcome of fitting one category
///
/// A failed fit is a statement about the data (the category has no
/// power-law shape the solver could find), so it is kept alongside the
/// successful ones instead of being thrown away.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FitOutcome {
    Converged(PowerLawFit),
    Failed { reason: String },
}

impl FitOutcome {
    pub fn fit(&self) -> Option<&PowerLawFit> {
        match self {
            FitOutcome::Converged(fit) => Some(fit),
            FitOutcome::Failed { .. } => None,
        }
    }
}

/// Statistics of one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub blocks: usize,
    pub total_references: u64,
    /// Share of references going to the top `top_fraction` of blocks
    pub top_share: f64,
    pub fit: FitOutcome,
}

/// Everything a popularity run produces
#[derive(Debug, Clone)]
pub struct PopularityReport {
    pub ranked: RankedTable,
    pub curves: Vec<ParetoCurve>,
    pub summaries: Vec<CategorySummary>,
    pub top_fraction: f64,
}

/// Rank, build Pareto curves and fit power laws for each configured category
///
/// Empty categories are fatal. Fit failures are fatal when
/// `config.strict_fit` is set, and recorded in the summary otherwise.
pub fn analyze_popularity(records: &[AccessRecord], config: &PopularityConfig) -> Result<PopularityReport, AnalysisError> {
    let ranked = rank_popularity(records, &config.categories)?;
    let fit_options = config.fit_options();

    let mut curves = Vec::with_capacity(config.categories.len());
    let mut summaries = Vec::with_capacity(config.categories.len());

    for &category in &config.categories {
        let curve = ParetoCurve::from_shares(category, &ranked.shares(category));
        let counts = ranked.counts(category);

        let fit = match fit_power_law(&counts, &fit_options) {
            Ok(fit) => {
                tracing::debug!(%category, exponent = fit.exponent, scale = fit.scale, "power law fitted");
                FitOutcome::Converged(fit)
            }
            Err(source) if config.strict_fit => {
                return Err(AnalysisError::Fit { category, source });
            }
            Err(e) => {
                tracing::warn!(%category, error = %e, "power-law fit failed");
                FitOutcome::Failed { reason: e.to_string() }
            }
        };

        summaries.push(CategorySummary {
            category,
            blocks: curve.len(),
            total_references: ranked.category(category).map(|e| e.count).sum(),
            top_share: curve.top_share(config.top_fraction).unwrap_or(0.0),
            fit,
        });
        curves.push(curve);
    }

    Ok(PopularityReport {
        ranked,
        curves,
        summaries,
        top_fraction: config.top_fraction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::AccessType;

    fn zipf_table(category: AccessType, n: u64) -> Vec<AccessRecord> {
        (1..=n)
            .map(|r| AccessRecord::new(1000 + r, category, (10_000.0 / r as f64).round() as u64))
            .collect()
    }

    #[test]
    fn test_analyze_all_categories() {
        let mut records = zipf_table(AccessType::Read, 100);
        records.extend(zipf_table(AccessType::Write, 50));
        records.extend(zipf_table(AccessType::ReadWrite, 100));

        let report = analyze_popularity(&records, &PopularityConfig::default()).unwrap();
        assert_eq!(report.summaries.len(), 3);
        assert_eq!(report.curves.len(), 3);

        for summary in &report.summaries {
            let fit = summary.fit.fit().expect("zipf data should fit");
            assert!((fit.exponent + 1.0).abs() < 0.01, "{}: {}", summary.category, fit.exponent);
            assert!(summary.top_share > 0.5 && summary.top_share <= 1.0);
        }
        assert_eq!(report.summaries[1].blocks, 50);
    }

    #[test]
    fn test_lenient_fit_failure_is_recorded() {
        let records = vec![AccessRecord::new(1, AccessType::Read, 5)];
        let config = PopularityConfig {
            categories: vec![Category::Read],
            strict_fit: false,
            ..PopularityConfig::default()
        };

        let report = analyze_popularity(&records, &config).unwrap();
        assert!(matches!(report.summaries[0].fit, FitOutcome::Failed { .. }));
        assert_eq!(report.summaries[0].top_share, 1.0);
    }

    #[test]
    fn test_strict_fit_failure_names_category() {
        let records = vec![AccessRecord::new(1, AccessType::Write, 5)];
        let config = PopularityConfig {
            categories: vec![Category::Write],
            strict_fit: true,
            ..PopularityConfig::default()
        };

        match analyze_popularity(&records, &config) {
            Err(AnalysisError::Fit { category, .. }) => assert_eq!(category, Category::Write),
            other => panic!("expected fit error, got {:?}", other.map(|r| r.summaries)),
        }
    }

    #[test]
    fn test_idempotent() {
        let records = zipf_table(AccessType::Read, 40);
        let config = PopularityConfig {
            categories: vec![Category::Read],
            ..PopularityConfig::default()
        };
        let a = analyze_popularity(&records, &config).unwrap();
        let b = analyze_popularity(&records, &config).unwrap();
        assert_eq!(a.ranked, b.ranked);
        assert_eq!(a.curves, b.curves);
        assert_eq!(a.summaries, b.summaries);
    }
}
