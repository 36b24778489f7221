//! Uniform block popularity
//!
//! Every block is equally likely, so the generated trace has no access
//! concentration: its Pareto curve is close to the diagonal and its
//! power-law exponent close to zero.

use super::BlockSampler;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Uniform sampler over `[0, num_blocks)`
pub struct UniformSampler {
    num_blocks: u64,
    rng: Xoshiro256PlusPlus,
}

impl UniformSampler {
    /// Create a sampler with a random seed
    pub fn new(num_blocks: u64) -> Self {
        Self {
            num_blocks,
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Create a sampler with a specific seed
    pub fn with_seed(num_blocks: u64, seed: u64) -> Self {
        Self {
            num_blocks,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl BlockSampler for UniformSampler {
    fn num_blocks(&self) -> u64 {
        self.num_blocks
    }

    #[inline(always)]
    fn sample(&mut self) -> u64 {
        if self.num_blocks == 0 {
            return 0;
        }
        self.rng.gen_range(0..self.num_blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_in_range() {
        let mut sampler = UniformSampler::new(1000);
        for _ in 0..100 {
            assert!(sampler.sample() < 1000);
        }
    }

    #[test]
    fn test_uniform_seeded() {
        let mut a = UniformSampler::with_seed(1000, 12345);
        let mut b = UniformSampler::with_seed(1000, 12345);
        for _ in 0..10 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn test_uniform_coverage() {
        let mut sampler = UniformSampler::with_seed(100, 42);
        let mut buckets = [0u32; 10];
        for _ in 0..10000 {
            buckets[(sampler.sample() / 10) as usize] += 1;
        }

        // ~1000 per bucket; allow 20% deviation
        for count in buckets {
            assert!(count > 800 && count < 1200, "bucket count {} outside expected range", count);
        }
    }

    #[test]
    fn test_uniform_empty_space() {
        let mut sampler = UniformSampler::with_seed(0, 1);
        assert_eq!(sampler.sample(), 0);
    }
}
