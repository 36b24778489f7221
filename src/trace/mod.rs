//! Trace records and access types
//!
//! A trace is a sequence of chunks, each holding [`AccessRecord`]s. Raw chunks
//! carry one row per access tagged with a fine-grained subtype (`readi`,
//! `readd`, `write`); aggregated tables carry one row per (address, category)
//! with a reference count.
//!
//! # Access types
//!
//! - **Subtypes** (`readi`, `readd`, `write`): what the tracer logged
//! - **Categories** (`read`, `write`, `read&write`): what popularity
//!   statistics are computed over
//!
//! `write` belongs to both sets.

pub mod csv_source;
pub mod source;

pub use csv_source::{read_table, CsvChunkSource};
pub use source::{MemorySource, RecordSource};

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Block address as logged by the tracer
pub type BlockAddress = u64;

/// Access type tag of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessType {
    #[serde(rename = "readi")]
    ReadI,
    #[serde(rename = "readd")]
    ReadD,
    #[serde(rename = "write")]
    Write,
    #[serde(rename = "read")]
    Read,
    #[serde(rename = "read&write")]
    ReadWrite,
}

impl AccessType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessType::ReadI => "readi",
            AccessType::ReadD => "readd",
            AccessType::Write => "write",
            AccessType::Read => "read",
            AccessType::ReadWrite => "read&write",
        }
    }

    /// Popularity category this tag names directly, if any
    pub fn category(self) -> Option<Category> {
        match self {
            AccessType::Read => Some(Category::Read),
            AccessType::Write => Some(Category::Write),
            AccessType::ReadWrite => Some(Category::ReadWrite),
            AccessType::ReadI | AccessType::ReadD => None,
        }
    }

    /// Projection subtype this tag names directly, if any
    pub fn subtype(self) -> Option<Subtype> {
        match self {
            AccessType::ReadI => Some(Subtype::ReadI),
            AccessType::ReadD => Some(Subtype::ReadD),
            AccessType::Write => Some(Subtype::Write),
            AccessType::Read | AccessType::ReadWrite => None,
        }
    }

    /// Whether a raw access of this type counts as a read
    pub fn is_read(self) -> bool {
        matches!(self, AccessType::ReadI | AccessType::ReadD | AccessType::Read)
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown access type tag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown access type '{0}'")]
pub struct UnknownAccessType(pub String);

impl FromStr for AccessType {
    type Err = UnknownAccessType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "readi" => Ok(AccessType::ReadI),
            "readd" => Ok(AccessType::ReadD),
            "write" => Ok(AccessType::Write),
            "read" => Ok(AccessType::Read),
            "read&write" => Ok(AccessType::ReadWrite),
            other => Err(UnknownAccessType(other.to_string())),
        }
    }
}

/// Popularity category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
pub enum Category {
    #[serde(rename = "read")]
    #[value(name = "read")]
    Read,
    #[serde(rename = "write")]
    #[value(name = "write")]
    Write,
    #[serde(rename = "read&write")]
    #[value(name = "read&write")]
    ReadWrite,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Read, Category::Write, Category::ReadWrite];

    pub fn as_str(self) -> &'static str {
        self.access_type().as_str()
    }

    pub fn access_type(self) -> AccessType {
        match self {
            Category::Read => AccessType::Read,
            Category::Write => AccessType::Write,
            Category::ReadWrite => AccessType::ReadWrite,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fine-grained access subtype that gets its own projected identity column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Subtype {
    #[value(name = "readi")]
    ReadI,
    #[value(name = "readd")]
    ReadD,
    Write,
}

impl Subtype {
    pub const ALL: [Subtype; 3] = [Subtype::ReadI, Subtype::ReadD, Subtype::Write];

    /// Name of the projected column holding this subtype's block id
    pub fn column(self) -> &'static str {
        match self {
            Subtype::ReadI => "blk_readi",
            Subtype::ReadD => "blk_readd",
            Subtype::Write => "blk_write",
        }
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Subtype::ReadI => "readi",
            Subtype::ReadD => "readd",
            Subtype::Write => "write",
        })
    }
}

/// One trace row
///
/// In raw chunks `count` is 1 (one logged access); in aggregated tables it is
/// the number of references to `blockaddress` within `access_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRecord {
    pub blockaddress: BlockAddress,
    pub access_type: AccessType,
    pub count: u64,
}

impl AccessRecord {
    pub fn new(blockaddress: BlockAddress, access_type: AccessType, count: u64) -> Self {
        Self {
            blockaddress,
            access_type,
            count,
        }
    }

    /// A single raw access
    pub fn access(blockaddress: BlockAddress, access_type: AccessType) -> Self {
        Self::new(blockaddress, access_type, 1)
    }
}

/// Parse a block address in decimal or `0x`-prefixed hexadecimal
pub fn parse_block_address(s: &str) -> Option<BlockAddress> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

/// Run `f` over the records of one chunk, failing if the chunk could not be
/// read to the end
///
/// `f` sees the records up to the first read error; its result is discarded
/// when one occurs.
pub fn with_records<I, T, F>(records: I, f: F) -> Result<T, AnalysisError>
where
    I: IntoIterator<Item = Result<AccessRecord, AnalysisError>>,
    F: FnOnce(&mut dyn Iterator<Item = AccessRecord>) -> T,
{
    let mut error = None;
    let out = {
        let mut records = records.into_iter().map_while(|r| match r {
            Ok(record) => Some(record),
            Err(e) => {
                error = Some(e);
                None
            }
        });
        f(&mut records)
    };
    match error {
        Some(e) => Err(e),
        None => Ok(out),
    }
}
