//! Reference count aggregation
//!
//! Folds raw chunks (one row per logged access) into the per-category count
//! table the popularity ranker consumes:
//!
//! - **read**: `readi` + `readd` (+ rows already tagged `read`)
//! - **write**: `write`
//! - **read&write**: read + write
//!
//! Rows come out grouped by category (read, write, read&write), each group
//! in the order addresses were first seen. Blocks with no references in a
//! category get no row there.
//!
//! # Example
//!
//! ```
//! use blocktrace::stats::aggregator::aggregate_counts;
//! use blocktrace::trace::{AccessRecord, AccessType, MemorySource};
//!
//! let source = MemorySource::new(vec![vec![
//!     AccessRecord::access(1, AccessType::ReadI),
//!     AccessRecord::access(1, AccessType::Write),
//!     AccessRecord::access(2, AccessType::ReadD),
//! ]]);
//!
//! let counts = aggregate_counts(&source, 1).unwrap();
//! assert_eq!(counts.records.len(), 5); // 2 read, 1 write, 2 read&write
//! ```

use crate::error::AnalysisError;
use crate::identity::ScanStop;
use crate::output::Table;
use crate::trace::{AccessRecord, AccessType, BlockAddress, Category, RecordSource};
use std::collections::HashMap;

/// Per-block read and write reference counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct BlockCounts {
    read: u64,
    write: u64,
}

impl BlockCounts {
    fn get(&self, category: Category) -> u64 {
        match category {
            Category::Read => self.read,
            Category::Write => self.write,
            Category::ReadWrite => self.read.saturating_add(self.write),
        }
    }
}

/// Aggregated `(blockaddress, count, type)` table
#[derive(Debug, Clone)]
pub struct AggregatedCounts {
    pub records: Vec<AccessRecord>,
    pub chunks_read: usize,
    pub stop: ScanStop,
    /// Raw rows tagged `read&write`, which cannot be split into read/write
    pub ignored: usize,
}

/// Running aggregation state
#[derive(Debug, Default)]
pub struct CountAggregator {
    order: Vec<BlockAddress>,
    counts: HashMap<BlockAddress, BlockCounts>,
    ignored: usize,
}

impl CountAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one raw record
    pub fn record(&mut self, record: &AccessRecord) {
        if record.access_type == AccessType::ReadWrite {
            self.ignored += 1;
            return;
        }

        let order = &mut self.order;
        let counts = self.counts.entry(record.blockaddress).or_insert_with(|| {
            order.push(record.blockaddress);
            BlockCounts::default()
        });

        // Counts pin at u64::MAX instead of wrapping
        if record.access_type.is_read() {
            counts.read = counts.read.saturating_add(record.count);
        } else {
            counts.write = counts.write.saturating_add(record.count);
        }
    }

    /// Number of distinct blocks seen
    pub fn blocks(&self) -> usize {
        self.order.len()
    }

    /// Emit the aggregated rows
    pub fn finish(&self) -> Vec<AccessRecord> {
        let mut records = Vec::new();
        for category in Category::ALL {
            for addr in &self.order {
                let count = self.counts[addr].get(category);
                if count > 0 {
                    records.push(AccessRecord::new(*addr, category.access_type(), count));
                }
            }
        }
        records
    }
}

/// Aggregate chunks `0..chunk_count`, stopping at the first missing chunk
pub fn aggregate_counts<S>(source: &S, chunk_count: usize) -> Result<AggregatedCounts, AnalysisError>
where
    S: RecordSource + ?Sized,
{
    let mut aggregator = CountAggregator::new();
    let mut stop = ScanStop::Exhausted;
    let mut chunks_read = 0;

    for chunk in 0..chunk_count {
        let records = match source.open(chunk) {
            Ok(records) => records,
            Err(AnalysisError::ChunkNotFound { chunk, location }) => {
                tracing::warn!(chunk, location = %location.display(), "chunk missing, aggregation stopped");
                stop = ScanStop::MissingChunk { chunk, location };
                break;
            }
            Err(e) => return Err(e),
        };
        for record in records {
            aggregator.record(&record?);
        }
        chunks_read += 1;
    }

    if aggregator.ignored > 0 {
        tracing::warn!(rows = aggregator.ignored, "raw rows tagged read&write ignored");
    }
    tracing::info!(chunks = chunks_read, blocks = aggregator.blocks(), "aggregation complete");

    Ok(AggregatedCounts {
        records: aggregator.finish(),
        chunks_read,
        stop,
        ignored: aggregator.ignored,
    })
}

impl Table for AggregatedCounts {
    fn columns(&self) -> Vec<&'static str> {
        vec!["blockaddress", "count", "type"]
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn row(&self, index: usize) -> Vec<String> {
        let r = &self.records[index];
        vec![r.blockaddress.to_string(), r.count.to_string(), r.access_type.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::MemorySource;

    #[test]
    fn test_category_totals() {
        let source = MemorySource::new(vec![
            vec![
                AccessRecord::access(7, AccessType::ReadI),
                AccessRecord::access(7, AccessType::ReadD),
                AccessRecord::access(9, AccessType::Write),
            ],
            vec![
                AccessRecord::access(9, AccessType::ReadD),
                AccessRecord::access(7, AccessType::Write),
                AccessRecord::access(9, AccessType::Write),
            ],
        ]);
        let counts = aggregate_counts(&source, 2).unwrap();

        assert_eq!(
            counts.records,
            vec![
                AccessRecord::new(7, AccessType::Read, 2),
                AccessRecord::new(9, AccessType::Read, 1),
                AccessRecord::new(7, AccessType::Write, 1),
                AccessRecord::new(9, AccessType::Write, 2),
                AccessRecord::new(7, AccessType::ReadWrite, 3),
                AccessRecord::new(9, AccessType::ReadWrite, 3),
            ]
        );
        assert_eq!(counts.chunks_read, 2);
        assert_eq!(counts.stop, ScanStop::Exhausted);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let mut aggregator = CountAggregator::new();
        aggregator.record(&AccessRecord::new(3, AccessType::Read, u64::MAX - 1));
        aggregator.record(&AccessRecord::new(3, AccessType::Read, 5));
        aggregator.record(&AccessRecord::new(3, AccessType::Write, 10));

        assert_eq!(
            aggregator.finish(),
            vec![
                AccessRecord::new(3, AccessType::Read, u64::MAX),
                AccessRecord::new(3, AccessType::Write, 10),
                AccessRecord::new(3, AccessType::ReadWrite, u64::MAX),
            ]
        );
    }

    #[test]
    fn test_zero_counts_omitted() {
        let source = MemorySource::new(vec![vec![AccessRecord::access(1, AccessType::ReadI)]]);
        let counts = aggregate_counts(&source, 1).unwrap();
        let types: Vec<AccessType> = counts.records.iter().map(|r| r.access_type).collect();
        assert_eq!(types, vec![AccessType::Read, AccessType::ReadWrite]);
    }

    #[test]
    fn test_preaggregated_counts_are_summed() {
        let source = MemorySource::new(vec![vec![
            AccessRecord::new(4, AccessType::Read, 10),
            AccessRecord::new(4, AccessType::ReadI, 5),
            AccessRecord::new(4, AccessType::ReadWrite, 99),
        ]]);
        let counts = aggregate_counts(&source, 1).unwrap();
        assert_eq!(counts.records[0], AccessRecord::new(4, AccessType::Read, 15));
        assert_eq!(counts.ignored, 1);
    }

    #[test]
    fn test_stops_at_missing_chunk() {
        let source = MemorySource::new(vec![vec![AccessRecord::access(1, AccessType::Write)]]);
        let counts = aggregate_counts(&source, 3).unwrap();
        assert_eq!(counts.chunks_read, 1);
        assert!(matches!(counts.stop, ScanStop::MissingChunk { chunk: 1, .. }));
    }
}
