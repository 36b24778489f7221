//! Fractional ranking
//!
//! Ranks are 1-based and descending (largest value gets rank 1). Tied values
//! share the average of the positions they occupy, and the next distinct
//! value resumes after the whole tied span:
//!
//! ```
//! use blocktrace::stats::rank::fractional_rank_desc;
//!
//! let ranks = fractional_rank_desc(&[10.0, 10.0, 5.0]);
//! assert_eq!(ranks, vec![1.5, 1.5, 3.0]);
//! ```

/// Descending average rank of each value, in input order
pub fn fractional_rank_desc(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start+1 ..= end share their mean
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

/// Descending average rank as a fraction of the number of values
///
/// The largest value gets `1/n` (or the tie average over `n`), the smallest
/// gets `1.0`.
pub fn percentile_rank_desc(values: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    fractional_rank_desc(values).into_iter().map(|r| r / n).collect()
}
