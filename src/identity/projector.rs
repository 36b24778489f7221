//! Chunk projection
//!
//! Joins the frozen [`IdentityTable`] onto one chunk and fans each record's
//! `acc_blk_num` out into the column of its subtype (`blk_readi`, `blk_readd`
//! or `blk_write`). At most one of the three columns is set per row.
//!
//! Projection is pure: chunks can be projected in any order, or in parallel,
//! once the identity table is built.

use super::IdentityTable;
use crate::output::Table;
use crate::trace::{AccessRecord, Subtype};

/// Projected identity columns of one record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectedRow {
    pub blk_readi: Option<u64>,
    pub blk_readd: Option<u64>,
    pub blk_write: Option<u64>,
}

impl ProjectedRow {
    pub fn get(&self, subtype: Subtype) -> Option<u64> {
        match subtype {
            Subtype::ReadI => self.blk_readi,
            Subtype::ReadD => self.blk_readd,
            Subtype::Write => self.blk_write,
        }
    }

    fn set(&mut self, subtype: Subtype, id: u64) {
        match subtype {
            Subtype::ReadI => self.blk_readi = Some(id),
            Subtype::ReadD => self.blk_readd = Some(id),
            Subtype::Write => self.blk_write = Some(id),
        }
    }
}

/// One chunk with identity columns attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedChunk {
    pub chunk: usize,
    /// Subtypes projected (and written) for this chunk
    pub subtypes: Vec<Subtype>,
    pub rows: Vec<ProjectedRow>,
    /// Records whose address is not in the identity table
    pub unresolved: usize,
}

/// Project one chunk's records onto the identity table
///
/// Records of a subtype not listed in `subtypes`, and records of an
/// aggregated category type (`read`, `read&write`), produce an empty row.
/// Addresses missing from the table (only possible past the end of a short
/// chunk run) also produce an empty row and are counted in `unresolved`.
pub fn project_chunk<I>(chunk: usize, records: I, table: &IdentityTable, subtypes: &[Subtype]) -> ProjectedChunk
where
    I: IntoIterator<Item = AccessRecord>,
{
    let mut unresolved = 0;
    let rows = records
        .into_iter()
        .map(|record| {
            let mut row = ProjectedRow::default();
            let id = table.get(record.blockaddress);
            if id.is_none() {
                unresolved += 1;
            }
            if let (Some(id), Some(subtype)) = (id, record.access_type.subtype()) {
                if subtypes.contains(&subtype) {
                    row.set(subtype, id);
                }
            }
            row
        })
        .collect();

    if unresolved > 0 {
        tracing::warn!(chunk, unresolved, "records reference blocks outside the identity table");
    }

    ProjectedChunk {
        chunk,
        subtypes: subtypes.to_vec(),
        rows,
        unresolved,
    }
}

impl Table for ProjectedChunk {
    fn columns(&self) -> Vec<&'static str> {
        self.subtypes.iter().map(|s| s.column()).collect()
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn row(&self, index: usize) -> Vec<String> {
        let row = &self.rows[index];
        self.subtypes
            .iter()
            .map(|&s| row.get(s).map(|id| id.to_string()).unwrap_or_default())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::assign_identities;
    use crate::trace::{AccessType, MemorySource};

    fn chunk_records() -> Vec<AccessRecord> {
        vec![
            AccessRecord::access(100, AccessType::ReadI),
            AccessRecord::access(200, AccessType::ReadD),
            AccessRecord::access(100, AccessType::Write),
            AccessRecord::access(300, AccessType::Read),
        ]
    }

    #[test]
    fn test_fan_out_is_exclusive() {
        let source = MemorySource::new(vec![chunk_records()]);
        let table = assign_identities(&source, 1).unwrap().table;
        let projected = project_chunk(0, chunk_records(), &table, &Subtype::ALL);

        assert_eq!(
            projected.rows,
            vec![
                ProjectedRow { blk_readi: Some(0), blk_readd: None, blk_write: None },
                ProjectedRow { blk_readi: None, blk_readd: Some(1), blk_write: None },
                ProjectedRow { blk_readi: None, blk_readd: None, blk_write: Some(0) },
                ProjectedRow::default(),
            ]
        );
        assert_eq!(projected.unresolved, 0);
    }

    #[test]
    fn test_unknown_address_yields_empty_row() {
        let table = IdentityTable::default();
        let projected = project_chunk(3, chunk_records(), &table, &Subtype::ALL);

        assert!(projected.rows.iter().all(|r| *r == ProjectedRow::default()));
        assert_eq!(projected.unresolved, 4);
    }

    #[test]
    fn test_subtype_selection_limits_columns() {
        let source = MemorySource::new(vec![chunk_records()]);
        let table = assign_identities(&source, 1).unwrap().table;
        let projected = project_chunk(0, chunk_records(), &table, &[Subtype::Write]);

        assert_eq!(projected.columns(), vec!["blk_write"]);
        assert_eq!(projected.row(0), vec![String::new()]);
        assert_eq!(projected.row(2), vec!["0".to_string()]);
        assert_eq!(projected.rows[0].blk_readi, None);
    }
}
