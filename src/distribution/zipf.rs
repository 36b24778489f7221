//! Zipf block popularity
//!
//! Block `k` (0-based) is drawn with probability
//! `(k+1)^(-theta) / H(N, theta)` where `H(N, theta) = sum_{i=1..N} i^(-theta)`.
//! A trace drawn this way has a rank-frequency curve with exponent close to
//! `-theta`, which makes it a reference input for the power-law fitter.
//!
//! Sampling is inverse transform over a precomputed CDF (O(log N) per draw).

use super::BlockSampler;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Largest block space with an exact CDF; larger spaces are scaled onto it
const MAX_CDF_LEN: u64 = 1_000_000;

/// Zipf sampler over `[0, num_blocks)`
pub struct ZipfSampler {
    num_blocks: u64,
    /// cdf[k] = P(block <= k) over the (possibly capped) rank space
    cdf: Vec<f64>,
    rng: Xoshiro256PlusPlus,
}

impl ZipfSampler {
    /// Create a sampler with a random seed
    pub fn new(theta: f64, num_blocks: u64) -> Self {
        Self::build(theta, num_blocks, Xoshiro256PlusPlus::from_entropy())
    }

    /// Create a sampler with a specific seed
    pub fn with_seed(theta: f64, num_blocks: u64, seed: u64) -> Self {
        Self::build(theta, num_blocks, Xoshiro256PlusPlus::seed_from_u64(seed))
    }

    fn build(theta: f64, num_blocks: u64, rng: Xoshiro256PlusPlus) -> Self {
        assert!((0.0..=3.0).contains(&theta), "Theta must be in range [0.0, 3.0]");

        let n = num_blocks.min(MAX_CDF_LEN) as usize;
        let weights: Vec<f64> = (1..=n).map(|i| (i as f64).powf(-theta)).collect();
        let h_n_theta: f64 = weights.iter().sum();

        let mut cumulative = 0.0;
        let cdf = weights
            .iter()
            .map(|w| {
                cumulative += w / h_n_theta;
                cumulative
            })
            .collect();

        Self {
            num_blocks,
            cdf,
            rng,
        }
    }
}

impl BlockSampler for ZipfSampler {
    fn num_blocks(&self) -> u64 {
        self.num_blocks
    }

    fn sample(&mut self) -> u64 {
        if self.cdf.is_empty() {
            return 0;
        }

        let u: f64 = self.rng.gen();
        // First rank whose cumulative probability reaches u
        let rank = self.cdf.partition_point(|&c| c < u).min(self.cdf.len() - 1) as u64;

        // Scale capped rank space onto the full block space
        let block = rank * self.num_blocks / self.cdf.len() as u64;
        block.min(self.num_blocks - 1)
    }
}
