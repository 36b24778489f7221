//! Synthetic chunked traces
//!
//! Generates raw traces (one row per access, subtypes `readi`, `readd`,
//! `write`) whose block popularity follows a [`BlockSampler`]. Useful to
//! exercise the whole pipeline without a tracer, and to sanity-check the
//! statistics: a Zipf trace must come out with a clearly negative power-law
//! exponent and a top-20% share well above 20%.

use crate::distribution::BlockSampler;
use crate::output::{RecordSink, Table, WriteMode};
use crate::trace::{AccessRecord, AccessType, MemorySource};
use crate::Result;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Shape of a synthetic trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthSpec {
    pub chunks: usize,
    pub records_per_chunk: usize,
    /// Percentage of accesses that are writes (0-100)
    pub write_percent: u8,
    /// Address of block 0
    pub base_address: u64,
    /// Distance between consecutive block addresses
    pub block_size: u64,
    pub seed: u64,
}

impl Default for SynthSpec {
    fn default() -> Self {
        Self {
            chunks: 4,
            records_per_chunk: 10_000,
            write_percent: 30,
            base_address: 0x1000_0000,
            block_size: 4096,
            seed: 0,
        }
    }
}

/// Generate a trace held in memory
pub fn generate(spec: &SynthSpec, sampler: &mut dyn BlockSampler) -> MemorySource {
    // Separate stream for access types so the block sequence only depends
    // on the sampler
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(spec.seed.wrapping_add(1));
    let write_fraction = f64::from(spec.write_percent.min(100)) / 100.0;
    tracing::debug!(blocks = sampler.num_blocks(), chunks = spec.chunks, "generating synthetic trace");

    let mut source = MemorySource::default();
    for _ in 0..spec.chunks {
        let chunk = (0..spec.records_per_chunk)
            .map(|_| {
                let block = sampler.sample();
                let access_type = if rng.gen_bool(write_fraction) {
                    AccessType::Write
                } else if rng.gen_bool(0.5) {
                    AccessType::ReadI
                } else {
                    AccessType::ReadD
                };
                AccessRecord::access(spec.base_address + block * spec.block_size, access_type)
            })
            .collect();
        source.push_chunk(chunk);
    }
    source
}

/// Raw chunk as a `blockaddress,type` table
pub struct RawChunk<'a>(pub &'a [AccessRecord]);

impl Table for RawChunk<'_> {
    fn columns(&self) -> Vec<&'static str> {
        vec!["blockaddress", "type"]
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn row(&self, index: usize) -> Vec<String> {
        let r = &self.0[index];
        vec![r.blockaddress.to_string(), r.access_type.to_string()]
    }
}

/// Write each chunk of `source` to `{prefix}_{i}`
pub fn write_chunks(source: &MemorySource, sink: &mut dyn RecordSink, prefix: &str) -> Result<()> {
    use crate::trace::RecordSource;

    for chunk in 0..source.chunk_count() {
        let records: Vec<AccessRecord> = source.open(chunk)?.collect::<std::result::Result<_, _>>()?;
        sink.write_table(&format!("{}_{}", prefix, chunk), &RawChunk(&records), WriteMode::Overwrite)?;
    }
    tracing::info!(chunks = source.chunk_count(), prefix, "synthetic trace written");
    Ok(())
}
