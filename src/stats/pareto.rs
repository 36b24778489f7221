//! Pareto (cumulative share) curves
//!
//! For a category, shares are sorted from most to least referenced block and
//! summed cumulatively. Point `i` of the curve is
//!
//! ```text
//! x_i = i / N                       (fraction of blocks ranked before entry i)
//! y_i = share_0 + ... + share_i     (cumulative share including entry i)
//! ```
//!
//! The summary statistic is `y` at index `floor(top_fraction * N)`, the share
//! of all references that go to the top `top_fraction` of blocks (the classic
//! 80/20 check uses `top_fraction = 0.2`).

use crate::output::Table;
use crate::trace::Category;
use serde::Serialize;

/// Default fraction of blocks used for the concentration summary
pub const DEFAULT_TOP_FRACTION: f64 = 0.2;

/// One point of a cumulative share curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParetoPoint {
    pub x: f64,
    pub y: f64,
}

/// Cumulative share curve of one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoCurve {
    pub category: Category,
    pub points: Vec<ParetoPoint>,
}

impl ParetoCurve {
    /// Build a curve from a category's reference shares (any order)
    pub fn from_shares(category: Category, shares: &[f64]) -> Self {
        let mut sorted = shares.to_vec();
        sorted.sort_by(|a, b| b.total_cmp(a));

        let n = sorted.len() as f64;
        let mut cumulative = 0.0;
        let points = sorted
            .iter()
            .enumerate()
            .map(|(i, share)| {
                cumulative += share;
                ParetoPoint {
                    x: i as f64 / n,
                    // Shares sum to 1; keep rounding error from overshooting
                    y: cumulative.min(1.0),
                }
            })
            .collect();

        Self { category, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Cumulative share captured by the top `fraction` of blocks
    ///
    /// Returns `None` for an empty curve.
    pub fn top_share(&self, fraction: f64) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        let idx = ((fraction * self.points.len() as f64).floor() as usize).min(self.points.len() - 1);
        Some(self.points[idx].y)
    }
}

/// Curves of several categories as one table (`type,x,y`)
#[derive(Debug, Clone, Copy)]
pub struct ParetoTable<'a>(pub &'a [ParetoCurve]);

impl ParetoTable<'_> {
    fn locate(&self, mut index: usize) -> (&ParetoCurve, usize) {
        for curve in self.0 {
            if index < curve.len() {
                return (curve, index);
            }
            index -= curve.len();
        }
        panic!("row index out of range");
    }
}

impl Table for ParetoTable<'_> {
    fn columns(&self) -> Vec<&'static str> {
        vec!["type", "x", "y"]
    }

    fn len(&self) -> usize {
        self.0.iter().map(ParetoCurve::len).sum()
    }

    fn row(&self, index: usize) -> Vec<String> {
        let (curve, i) = self.locate(index);
        let p = curve.points[i];
        vec![curve.category.to_string(), p.x.to_string(), p.y.to_string()]
    }
}
