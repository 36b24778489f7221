//! Block popularity models
//!
//! Samplers used by the synthetic trace generator to decide which block each
//! generated access touches. Blocks are numbered by popularity rank:
//! block 0 is the hottest under a skewed model.
//!
//! # Models
//!
//! - **Uniform**: every block equally likely (no concentration)
//! - **Zipf**: `P(k) ∝ 1 / k^theta` (long-tailed, hot/cold blocks)
//!
//! # Example
//!
//! ```
//! use blocktrace::distribution::{BlockSampler, zipf::ZipfSampler};
//!
//! let mut sampler = ZipfSampler::with_seed(1.2, 1024, 7);
//! let block = sampler.sample();
//! assert!(block < 1024);
//! ```

pub mod uniform;
pub mod zipf;

/// Source of block numbers in `[0, num_blocks)`
///
/// Samplers are seeded and deterministic: the same seed yields the same
/// sequence, which keeps generated traces reproducible.
pub trait BlockSampler: Send {
    /// Size of the block space
    fn num_blocks(&self) -> u64;

    /// Draw the next block number
    fn sample(&mut self) -> u64;
}
