//! Human-readable text output

use crate::identity::ScanStop;
use crate::pipeline::{AssignOutcome, IdentityOrigin};
use crate::stats::{FitOutcome, PopularityReport};
use crate::stats::aggregator::AggregatedCounts;

const RULE: &str = "═══════════════════════════════════════════════════════════";

fn print_header(title: &str) {
    println!("{}", RULE);
    println!("{:^59}", title);
    println!("{}", RULE);
    println!();
}

/// Print the outcome of identity assignment and projection
pub fn print_identity_results(outcome: &AssignOutcome) {
    print_header("BLOCK IDENTITY");

    match &outcome.identity {
        IdentityOrigin::Scanned(scan) => {
            println!("Chunks scanned:   {} / {}", scan.chunks_read, scan.chunks_requested);
            if let ScanStop::MissingChunk { chunk, location } = &scan.stop {
                println!("  Stopped at missing chunk {} ({})", chunk, location.display());
            }
        }
        IdentityOrigin::Loaded { path, .. } => {
            println!("Identity table:   {}", path.display());
        }
    }
    println!("Distinct blocks:  {}", format_number(outcome.identity.table().len() as u64));
    println!("Chunks projected: {}", outcome.projected.len());
    if !outcome.missing.is_empty() {
        println!("Chunks missing:   {}", outcome.missing.len());
    }
    if outcome.unresolved > 0 {
        println!("Unresolved rows:  {}", format_number(outcome.unresolved as u64));
    }
    println!();
}

/// Print the outcome of count aggregation
pub fn print_aggregate_results(counts: &AggregatedCounts) {
    print_header("REFERENCE COUNTS");

    println!("Chunks read: {}", counts.chunks_read);
    println!("Rows:        {}", format_number(counts.records.len() as u64));
    if counts.ignored > 0 {
        println!("Ignored:     {} (read&write rows in raw input)", format_number(counts.ignored as u64));
    }
    println!();
}

/// Print per-category popularity statistics
pub fn print_popularity_results(report: &PopularityReport) {
    print_header("POPULARITY");

    println!(
        "{:<12} {:>12} {:>16} {:>10} {:>12} {:>12}",
        "Category",
        "Blocks",
        "References",
        format!("Top {:.0}%", report.top_fraction * 100.0),
        "Exponent",
        "Scale"
    );
    for s in &report.summaries {
        let (exponent, scale) = match &s.fit {
            FitOutcome::Converged(fit) => (format!("{:.5}", fit.exponent), format!("{:.3}", fit.scale)),
            FitOutcome::Failed { .. } => ("-".to_string(), "-".to_string()),
        };
        println!(
            "{:<12} {:>12} {:>16} {:>9.2}% {:>12} {:>12}",
            s.category.to_string(),
            format_number(s.blocks as u64),
            format_number(s.total_references),
            s.top_share * 100.0,
            exponent,
            scale
        );
    }

    for s in &report.summaries {
        if let FitOutcome::Failed { reason } = &s.fit {
            println!();
            println!("  {}: power-law fit failed: {}", s.category, reason);
        }
    }

    if report.ranked.skipped > 0 {
        println!();
        println!("Skipped rows: {}", format_number(report.ranked.skipped as u64));
    }
    println!();
}

/// Format an integer with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }
}
