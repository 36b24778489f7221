//! Identity table persistence
//!
//! The table is stored as CSV with columns `blockaddress,acc_blk_num`, so a
//! later run can project chunks without rescanning the whole trace.

use super::{BlockIdentity, IdentityTable};
use crate::error::AnalysisError;
use crate::output::Table;
use std::path::Path;

impl Table for IdentityTable {
    fn columns(&self) -> Vec<&'static str> {
        vec!["blockaddress", "acc_blk_num"]
    }

    fn len(&self) -> usize {
        IdentityTable::len(self)
    }

    fn row(&self, index: usize) -> Vec<String> {
        vec![self.addresses[index].to_string(), index.to_string()]
    }
}

/// Load an identity table written by a previous run
pub fn load_identity_table(path: &Path) -> Result<IdentityTable, AnalysisError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let rows = reader
        .deserialize::<BlockIdentity>()
        .collect::<Result<Vec<_>, _>>()?;

    IdentityTable::from_identities(rows).map_err(|reason| AnalysisError::MalformedTable {
        location: path.to_path_buf(),
        reason,
    })
}
