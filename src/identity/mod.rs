//! Cross-chunk block identity
//!
//! Every distinct block address referenced anywhere in a chunked trace gets a
//! dense sequential id (`acc_blk_num`), ordered by where the address was first
//! observed: earlier chunk first, then earlier position within the chunk.
//!
//! # Assignment
//!
//! Assignment is a left fold over the chunks in index order:
//!
//! ```text
//! state_0 = {}
//! state_i = dedupe(state_{i-1} ++ dedupe_within(chunk_i))
//! ```
//!
//! The fold stops at the first chunk that does not exist (a short chunk run)
//! and keeps everything accumulated so far. Once the fold completes the
//! ordered address set is enumerated into an [`IdentityTable`], which is
//! read-only from then on and can be shared freely between projection
//! workers.
//!
//! # Example
//!
//! ```
//! use blocktrace::identity::assign_identities;
//! use blocktrace::trace::{AccessRecord, AccessType, MemorySource};
//!
//! let a = AccessRecord::access(0xA, AccessType::Read);
//! let b = AccessRecord::access(0xB, AccessType::Read);
//! let source = MemorySource::new(vec![vec![a], vec![b, a]]);
//!
//! let scan = assign_identities(&source, 2).unwrap();
//! assert_eq!(scan.table.get(0xA), Some(0));
//! assert_eq!(scan.table.get(0xB), Some(1));
//! ```

pub mod persist;
pub mod projector;

pub use projector::{project_chunk, ProjectedChunk, ProjectedRow};

use crate::error::AnalysisError;
use crate::trace::{with_records, AccessRecord, BlockAddress, RecordSource};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// One row of the identity table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockIdentity {
    pub blockaddress: BlockAddress,
    pub acc_blk_num: u64,
}

/// First-seen-ordered set of block addresses
///
/// This is the fold state of identity assignment.
#[derive(Debug, Clone, Default)]
pub struct AddressSet {
    order: Vec<BlockAddress>,
    seen: HashSet<BlockAddress>,
}

impl AddressSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Merge addresses in, keeping only the first occurrence of each
    ///
    /// Returns the number of addresses that were new.
    pub fn merge<I>(&mut self, addresses: I) -> usize
    where
        I: IntoIterator<Item = BlockAddress>,
    {
        let before = self.order.len();
        for addr in addresses {
            if self.seen.insert(addr) {
                self.order.push(addr);
            }
        }
        self.order.len() - before
    }

    /// Enumerate into the final identity table
    pub fn freeze(self) -> IdentityTable {
        let ids = self
            .order
            .iter()
            .enumerate()
            .map(|(id, &addr)| (addr, id as u64))
            .collect();
        IdentityTable {
            addresses: self.order,
            ids,
        }
    }
}

/// Addresses of one chunk in first-occurrence order, duplicates removed
pub fn dedupe_within<I>(records: I) -> Vec<BlockAddress>
where
    I: IntoIterator<Item = AccessRecord>,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .map(|r| r.blockaddress)
        .filter(|addr| seen.insert(*addr))
        .collect()
}

/// Frozen mapping between block addresses and `acc_blk_num`
///
/// Ids form the dense range `0..len()`; `addresses[id]` is the address with
/// that id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityTable {
    addresses: Vec<BlockAddress>,
    ids: HashMap<BlockAddress, u64>,
}

impl IdentityTable {
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Id of `addr`, or `None` if the address was never observed
    pub fn get(&self, addr: BlockAddress) -> Option<u64> {
        self.ids.get(&addr).copied()
    }

    /// Address holding `id`
    pub fn address(&self, id: u64) -> Option<BlockAddress> {
        usize::try_from(id).ok().and_then(|i| self.addresses.get(i).copied())
    }

    /// Rows in id order
    pub fn iter(&self) -> impl Iterator<Item = BlockIdentity> + '_ {
        self.addresses
            .iter()
            .enumerate()
            .map(|(id, &blockaddress)| BlockIdentity {
                blockaddress,
                acc_blk_num: id as u64,
            })
    }

    /// Rebuild a table from stored rows
    ///
    /// Rows may come in any order but must form a bijection onto `0..N`.
    pub fn from_identities(rows: Vec<BlockIdentity>) -> Result<Self, String> {
        let n = rows.len();
        let mut slots: Vec<Option<BlockAddress>> = vec![None; n];
        let mut ids = HashMap::with_capacity(n);

        for row in rows {
            let slot = usize::try_from(row.acc_blk_num)
                .ok()
                .filter(|&i| i < n)
                .ok_or_else(|| format!("acc_blk_num {} outside 0..{}", row.acc_blk_num, n))?;
            if slots[slot].is_some() {
                return Err(format!("acc_blk_num {} assigned twice", row.acc_blk_num));
            }
            if ids.insert(row.blockaddress, row.acc_blk_num).is_some() {
                return Err(format!("blockaddress {} has more than one id", row.blockaddress));
            }
            slots[slot] = Some(row.blockaddress);
        }

        // n rows, n distinct in-range ids: every slot is filled
        let addresses = slots.into_iter().flatten().collect();
        Ok(Self { addresses, ids })
    }
}

/// How an identity scan ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStop {
    /// Every requested chunk was read
    Exhausted,
    /// The scan stopped early because this chunk does not exist
    MissingChunk { chunk: usize, location: PathBuf },
}

/// Result of identity assignment
#[derive(Debug, Clone)]
pub struct IdentityScan {
    pub table: IdentityTable,
    /// Number of chunks folded into the table
    pub chunks_read: usize,
    /// Number of chunks the caller asked for
    pub chunks_requested: usize,
    pub stop: ScanStop,
}

impl IdentityScan {
    /// Whether fewer chunks were read than requested
    pub fn is_short(&self) -> bool {
        self.chunks_read < self.chunks_requested
    }
}

/// Build the global identity table from chunks `0..chunk_count`
///
/// A missing chunk ends the scan without error. Any other source failure is
/// propagated.
pub fn assign_identities<S>(source: &S, chunk_count: usize) -> Result<IdentityScan, AnalysisError>
where
    S: RecordSource + ?Sized,
{
    let mut state = AddressSet::new();
    let mut stop = ScanStop::Exhausted;
    let mut chunks_read = 0;

    for chunk in 0..chunk_count {
        let records = match source.open(chunk) {
            Ok(records) => records,
            Err(AnalysisError::ChunkNotFound { chunk, location }) => {
                stop = ScanStop::MissingChunk { chunk, location };
                break;
            }
            Err(e) => return Err(e),
        };

        let added = with_records(records, |records| state.merge(dedupe_within(records)))?;
        chunks_read += 1;
        tracing::debug!(chunk, new_blocks = added, total_blocks = state.len(), "chunk merged");
    }

    if let ScanStop::MissingChunk { chunk, location } = &stop {
        tracing::warn!(
            chunk,
            location = %location.display(),
            requested = chunk_count,
            "chunk missing, identity table built from the first {} chunk(s)",
            chunks_read
        );
    }

    let table = state.freeze();
    tracing::info!(chunks = chunks_read, blocks = table.len(), "identity assignment complete");

    Ok(IdentityScan {
        table,
        chunks_read,
        chunks_requested: chunk_count,
        stop,
    })
}
