//! Popularity ranking
//!
//! Ranks an aggregated `(blockaddress, count, type)` table within each access
//! category:
//!
//! - `type_rank`: descending fractional rank of `count`
//! - `type_pcnt`: `count` as a share of the category's total references
//! - `type_pcnt_rank`: descending fractional rank of `type_pcnt`, divided by
//!   the category size
//!
//! Output rows keep the input order.

use super::rank::{fractional_rank_desc, percentile_rank_desc};
use crate::error::AnalysisError;
use crate::output::Table;
use crate::trace::{AccessRecord, BlockAddress, Category};
use serde::Serialize;
use std::collections::BTreeMap;

/// One ranked row
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedEntry {
    pub blockaddress: BlockAddress,
    pub count: u64,
    #[serde(rename = "type")]
    pub category: Category,
    pub type_rank: f64,
    pub type_pcnt: f64,
    pub type_pcnt_rank: f64,
}

/// Ranked table over one or more categories
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedTable {
    pub entries: Vec<RankedEntry>,
    /// Input rows dropped because their type is not a requested category
    pub skipped: usize,
}

impl RankedTable {
    /// Rows of one category, in input order
    pub fn category(&self, category: Category) -> impl Iterator<Item = &RankedEntry> + '_ {
        self.entries.iter().filter(move |e| e.category == category)
    }

    /// Reference shares of one category
    pub fn shares(&self, category: Category) -> Vec<f64> {
        self.category(category).map(|e| e.type_pcnt).collect()
    }

    /// Reference counts of one category
    pub fn counts(&self, category: Category) -> Vec<f64> {
        self.category(category).map(|e| e.count as f64).collect()
    }
}

impl Table for RankedTable {
    fn columns(&self) -> Vec<&'static str> {
        vec!["blockaddress", "count", "type", "type_rank", "type_pcnt", "type_pcnt_rank"]
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn row(&self, index: usize) -> Vec<String> {
        let e = &self.entries[index];
        vec![
            e.blockaddress.to_string(),
            e.count.to_string(),
            e.category.to_string(),
            e.type_rank.to_string(),
            e.type_pcnt.to_string(),
            e.type_pcnt_rank.to_string(),
        ]
    }
}

/// Rank `records` within each of `categories`
///
/// Every requested category must have at least one row with a non-zero
/// count; otherwise the run fails naming the category.
pub fn rank_popularity(records: &[AccessRecord], categories: &[Category]) -> Result<RankedTable, AnalysisError> {
    let mut partitions: BTreeMap<Category, Vec<usize>> =
        categories.iter().map(|&c| (c, Vec::new())).collect();
    let mut skipped = 0;

    for (idx, record) in records.iter().enumerate() {
        match record.access_type.category().and_then(|c| partitions.get_mut(&c)) {
            Some(rows) => rows.push(idx),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::warn!(skipped, "rows outside the requested categories ignored");
    }

    let mut ranked: Vec<Option<RankedEntry>> = vec![None; records.len()];

    for (&category, rows) in &partitions {
        if rows.is_empty() {
            return Err(AnalysisError::EmptyCategory { category });
        }

        let counts: Vec<f64> = rows.iter().map(|&i| records[i].count as f64).collect();
        let total: f64 = counts.iter().sum();
        if total == 0.0 {
            return Err(AnalysisError::ZeroTotal { category });
        }

        let type_rank = fractional_rank_desc(&counts);
        let type_pcnt: Vec<f64> = counts.iter().map(|c| c / total).collect();
        let type_pcnt_rank = percentile_rank_desc(&type_pcnt);

        for (j, &i) in rows.iter().enumerate() {
            ranked[i] = Some(RankedEntry {
                blockaddress: records[i].blockaddress,
                count: records[i].count,
                category,
                type_rank: type_rank[j],
                type_pcnt: type_pcnt[j],
                type_pcnt_rank: type_pcnt_rank[j],
            });
        }

        tracing::debug!(%category, blocks = rows.len(), total_refs = total, "category ranked");
    }

    Ok(RankedTable {
        entries: ranked.into_iter().flatten().collect(),
        skipped,
    })
}
