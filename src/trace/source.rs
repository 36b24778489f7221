//! Record source abstraction
//!
//! A record source hands out the records of a named chunk as a lazy iterator.
//! Opening the same chunk again restarts the sequence from the beginning.

use super::AccessRecord;
use crate::error::AnalysisError;
use std::path::PathBuf;

/// Per-chunk record provider
///
/// Implementations must return [`AnalysisError::ChunkNotFound`] when the
/// storage behind `chunk` does not exist; callers rely on that variant to
/// detect the end of a short chunk run. Malformed rows are the source's
/// business: they are skipped, and only well-formed records are yielded. A
/// storage failure part-way through a chunk is yielded as an `Err` item and
/// ends the chunk.
pub trait RecordSource {
    /// Iterator over one chunk's records
    type Records<'a>: Iterator<Item = Result<AccessRecord, AnalysisError>> + 'a
    where
        Self: 'a;

    /// Open chunk `chunk` for reading
    fn open(&self, chunk: usize) -> Result<Self::Records<'_>, AnalysisError>;
}

/// In-memory record source
///
/// Chunk `i` is `chunks[i]`; indices past the end report `ChunkNotFound`.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    chunks: Vec<Vec<AccessRecord>>,
}

impl MemorySource {
    pub fn new(chunks: Vec<Vec<AccessRecord>>) -> Self {
        Self { chunks }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn push_chunk(&mut self, records: Vec<AccessRecord>) {
        self.chunks.push(records);
    }
}

type MemoryRecord = fn(&AccessRecord) -> Result<AccessRecord, AnalysisError>;

impl RecordSource for MemorySource {
    type Records<'a> = std::iter::Map<std::slice::Iter<'a, AccessRecord>, MemoryRecord>;

    fn open(&self, chunk: usize) -> Result<Self::Records<'_>, AnalysisError> {
        let records = self.chunks.get(chunk).ok_or_else(|| AnalysisError::ChunkNotFound {
            chunk,
            location: PathBuf::from(format!("memory chunk {}", chunk)),
        })?;
        Ok(records.iter().map(memory_record as MemoryRecord))
    }
}

fn memory_record(record: &AccessRecord) -> Result<AccessRecord, AnalysisError> {
    Ok(*record)
}
