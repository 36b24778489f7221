//! Run orchestration
//!
//! Wires sources, the analysis core and sinks together for the three kinds
//! of run the CLI exposes:
//!
//! - [`run_assign`]: identity assignment, then per-chunk projection
//! - [`run_aggregate`]: raw chunks -> per-category count table
//! - [`run_popularity`]: count table -> ranked table, Pareto curves, fits
//!
//! Identity assignment always reads chunks sequentially. Projection may run
//! on the rayon pool once the identity table is frozen; results are still
//! written in chunk order.

use crate::config::Config;
use crate::error::AnalysisError;
use crate::identity::persist::load_identity_table;
use crate::identity::{assign_identities, project_chunk, IdentityScan, IdentityTable, ProjectedChunk};
use crate::output::json::write_json_report;
use crate::output::{RecordSink, WriteMode};
use crate::stats::aggregator::{aggregate_counts, AggregatedCounts};
use crate::stats::pareto::ParetoTable;
use crate::stats::{analyze_popularity, PopularityReport};
use crate::trace::{read_table, with_records, AccessRecord, RecordSource, Subtype};
use crate::Result;
use anyhow::Context;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Where the identity table of an assign run came from
#[derive(Debug, Clone)]
pub enum IdentityOrigin {
    Scanned(IdentityScan),
    Loaded { table: IdentityTable, path: PathBuf },
}

impl IdentityOrigin {
    pub fn table(&self) -> &IdentityTable {
        match self {
            IdentityOrigin::Scanned(scan) => &scan.table,
            IdentityOrigin::Loaded { table, .. } => table,
        }
    }
}

/// Result of an assign run
#[derive(Debug, Clone)]
pub struct AssignOutcome {
    pub identity: IdentityOrigin,
    /// Chunks projected and written, in order
    pub projected: Vec<usize>,
    /// Chunks that did not exist at projection time
    pub missing: Vec<usize>,
    /// Rows whose address is not in the identity table
    pub unresolved: usize,
}

/// Name of the identity table written next to the projected output
pub fn identity_table_name(output_name: &str) -> String {
    format!("{}_blk-num", output_name)
}

/// Assign block identities and project them onto every chunk
///
/// Writes `{name}_blk-num` (unless a saved table is reused) and `{name}`,
/// the projected chunks concatenated in chunk order.
pub fn run_assign<S>(config: &Config, source: &S, sink: &mut dyn RecordSink) -> Result<AssignOutcome>
where
    S: RecordSource + Sync,
{
    let chunk_count = config.input.chunk_count;
    let name = &config.output.name;

    let identity = match &config.identity.blk_num {
        Some(path) => {
            let table = load_identity_table(path)
                .with_context(|| format!("Failed to load identity table: {}", path.display()))?;
            tracing::info!(path = %path.display(), blocks = table.len(), "identity table loaded");
            IdentityOrigin::Loaded { table, path: path.clone() }
        }
        None => {
            let scan = assign_identities(source, chunk_count).context("Identity assignment failed")?;
            sink.write_table(&identity_table_name(name), &scan.table, WriteMode::Overwrite)
                .context("Failed to write identity table")?;
            IdentityOrigin::Scanned(scan)
        }
    };

    let mut tally = ProjectionTally::default();
    let table = identity.table();
    let subtypes = &config.identity.subtypes;

    if config.identity.parallel {
        // Project one pool-sized window of chunks at a time, then write it in order
        let window = rayon::current_num_threads().max(1);
        let mut start = 0;
        while start < chunk_count {
            let end = (start + window).min(chunk_count);
            let projections: Vec<(usize, Projection)> = (start..end)
                .into_par_iter()
                .map(|chunk| (chunk, project_one(source, chunk, table, subtypes)))
                .collect();
            for (chunk, projection) in projections {
                record_projection(&mut tally, sink, name, chunk, projection)?;
            }
            start = end;
        }
    } else {
        for chunk in 0..chunk_count {
            let projection = project_one(source, chunk, table, subtypes);
            record_projection(&mut tally, sink, name, chunk, projection)?;
        }
    }

    tracing::info!(
        projected = tally.projected.len(),
        missing = tally.missing.len(),
        "projection complete"
    );
    Ok(AssignOutcome {
        identity,
        projected: tally.projected,
        missing: tally.missing,
        unresolved: tally.unresolved,
    })
}

#[derive(Default)]
struct ProjectionTally {
    projected: Vec<usize>,
    missing: Vec<usize>,
    unresolved: usize,
}

/// Write one chunk's projection, or note it as missing
fn record_projection(
    tally: &mut ProjectionTally,
    sink: &mut dyn RecordSink,
    name: &str,
    chunk: usize,
    projection: Projection,
) -> Result<()> {
    match projection {
        Ok(projected) => {
            let mode = WriteMode::for_part(tally.projected.len());
            sink.write_table(name, &projected, mode)
                .with_context(|| format!("Failed to write projection of chunk {}", chunk))?;
            tally.unresolved += projected.unresolved;
            tally.projected.push(chunk);
            tracing::debug!(chunk, rows = projected.rows.len(), "chunk projected");
            Ok(())
        }
        Err(AnalysisError::ChunkNotFound { chunk, location }) => {
            tracing::warn!(chunk, location = %location.display(), "chunk missing, not projected");
            tally.missing.push(chunk);
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to project chunk {}", chunk)),
    }
}

type Projection = std::result::Result<ProjectedChunk, AnalysisError>;

fn project_one<S>(source: &S, chunk: usize, table: &IdentityTable, subtypes: &[Subtype]) -> Projection
where
    S: RecordSource,
{
    let records = source.open(chunk)?;
    with_records(records, |records| project_chunk(chunk, records, table, subtypes))
}

/// Aggregate raw chunks into the `{name}` count table
pub fn run_aggregate<S>(config: &Config, source: &S, sink: &mut dyn RecordSink) -> Result<AggregatedCounts>
where
    S: RecordSource,
{
    let counts = aggregate_counts(source, config.input.chunk_count).context("Aggregation failed")?;
    sink.write_table(&config.output.name, &counts, WriteMode::Overwrite)
        .context("Failed to write count table")?;
    Ok(counts)
}

/// Compute popularity statistics for an in-memory count table
///
/// Writes the ranked table to `{name}` and, if configured, the Pareto curves
/// to `{name}_pareto`.
pub fn run_popularity_records(
    config: &Config,
    records: &[AccessRecord],
    sink: &mut dyn RecordSink,
) -> Result<PopularityReport> {
    let report = analyze_popularity(records, &config.popularity).context("Popularity analysis failed")?;

    sink.write_table(&config.output.name, &report.ranked, WriteMode::Overwrite)
        .context("Failed to write ranked table")?;

    if config.output.pareto_table {
        let name = format!("{}_pareto", config.output.name);
        sink.write_table(&name, &ParetoTable(&report.curves), WriteMode::Overwrite)
            .context("Failed to write Pareto table")?;
    }

    Ok(report)
}

/// Compute popularity statistics for the count table stored at `input`
pub fn run_popularity(config: &Config, input: &Path, sink: &mut dyn RecordSink) -> Result<PopularityReport> {
    let records: Vec<AccessRecord> = read_table(input)
        .and_then(|records| records.collect::<std::result::Result<Vec<_>, _>>())
        .with_context(|| format!("Failed to read count table: {}", input.display()))?;
    tracing::info!(rows = records.len(), input = %input.display(), "count table loaded");

    let report = run_popularity_records(config, &records, sink)?;

    if let Some(ref path) = config.output.json_report {
        write_json_report(path, &report, input)?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ScanStop;
    use crate::output::{MemorySink, Table};
    use crate::trace::{AccessType, Category, MemorySource};
    use std::sync::{Arc, Mutex};

    type EventLog = Arc<Mutex<Vec<String>>>;

    struct LoggedSource {
        inner: MemorySource,
        log: EventLog,
    }

    impl RecordSource for LoggedSource {
        type Records<'a> = <MemorySource as RecordSource>::Records<'a>;

        fn open(&self, chunk: usize) -> std::result::Result<Self::Records<'_>, AnalysisError> {
            self.log.lock().unwrap().push(format!("open {}", chunk));
            self.inner.open(chunk)
        }
    }

    struct LoggedSink {
        inner: MemorySink,
        log: EventLog,
    }

    impl RecordSink for LoggedSink {
        fn write_table(&mut self, destination: &str, table: &dyn Table, mode: WriteMode) -> Result<()> {
            self.log.lock().unwrap().push(format!("write {} {}", destination, table.len()));
            self.inner.write_table(destination, table, mode)
        }
    }

    fn config(chunks: usize) -> Config {
        let mut config = Config::default();
        config.input.chunk_count = chunks;
        config.output.name = "out".to_string();
        config
    }

    fn source() -> MemorySource {
        MemorySource::new(vec![
            vec![
                AccessRecord::access(0xA0, AccessType::ReadI),
                AccessRecord::access(0xB0, AccessType::Write),
            ],
            vec![
                AccessRecord::access(0xC0, AccessType::ReadD),
                AccessRecord::access(0xA0, AccessType::Write),
            ],
        ])
    }

    #[test]
    fn test_assign_writes_identity_and_projection() {
        let mut sink = MemorySink::new();
        let outcome = run_assign(&config(2), &source(), &mut sink).unwrap();

        assert_eq!(outcome.projected, vec![0, 1]);
        assert!(outcome.missing.is_empty());

        let ids = sink.get("out_blk-num").unwrap();
        assert_eq!(ids.columns, vec!["blockaddress", "acc_blk_num"]);
        assert_eq!(ids.rows.len(), 3);

        let projected = sink.get("out").unwrap();
        assert_eq!(projected.columns, vec!["blk_readi", "blk_readd", "blk_write"]);
        let rows: Vec<Vec<&str>> = projected
            .rows
            .iter()
            .map(|r| r.iter().map(String::as_str).collect())
            .collect();
        assert_eq!(
            rows,
            vec![
                vec!["0", "", ""],
                vec!["", "", "1"],
                vec!["", "2", ""],
                vec!["", "", "0"],
            ]
        );
    }

    #[test]
    fn test_parallel_projection_matches_sequential() {
        let mut cfg = config(2);
        let mut sequential = MemorySink::new();
        run_assign(&cfg, &source(), &mut sequential).unwrap();

        cfg.identity.parallel = true;
        let mut parallel = MemorySink::new();
        run_assign(&cfg, &source(), &mut parallel).unwrap();

        assert_eq!(sequential.get("out"), parallel.get("out"));
        assert_eq!(sequential.get("out_blk-num"), parallel.get("out_blk-num"));
    }

    #[test]
    fn test_each_chunk_written_before_the_next_is_opened() {
        let log = EventLog::default();
        let source = LoggedSource { inner: source(), log: log.clone() };
        let mut sink = LoggedSink { inner: MemorySink::new(), log: log.clone() };

        run_assign(&config(2), &source, &mut sink).unwrap();

        let events = log.lock().unwrap().clone();
        let projection_start = events.iter().position(|e| e.starts_with("write out_blk-num")).unwrap() + 1;
        assert_eq!(
            events[projection_start..].to_vec(),
            vec!["open 0", "write out 2", "open 1", "write out 2"]
        );
    }

    #[test]
    fn test_assign_short_run() {
        let mut sink = MemorySink::new();
        let outcome = run_assign(&config(4), &source(), &mut sink).unwrap();

        match &outcome.identity {
            IdentityOrigin::Scanned(scan) => {
                assert_eq!(scan.chunks_read, 2);
                assert!(matches!(scan.stop, ScanStop::MissingChunk { chunk: 2, .. }));
            }
            other => panic!("unexpected origin {:?}", other),
        }
        assert_eq!(outcome.missing, vec![2, 3]);
        assert_eq!(sink.get("out").unwrap().rows.len(), 4);
    }

    #[test]
    fn test_aggregate_then_popularity() {
        let mut cfg = config(2);
        cfg.popularity.strict_fit = false;
        let mut sink = MemorySink::new();
        let counts = run_aggregate(&cfg, &source(), &mut sink).unwrap();
        assert!(!counts.records.is_empty());

        let report = run_popularity_records(&cfg, &counts.records, &mut sink).unwrap();
        assert_eq!(report.summaries.len(), 3);
        let ranked = sink.get("out").unwrap();
        assert_eq!(ranked.columns.len(), 6);
        assert_eq!(ranked.rows.len(), counts.records.len());
        assert!(report.summaries.iter().any(|s| s.category == Category::ReadWrite));
    }
}
