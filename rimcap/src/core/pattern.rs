// SPDX-License-Identifier: MIT

//! Test pattern generation.
//!
//! One pattern of `block_size_max` bytes is drawn per session and reused for
//! every block of the run. Bytes are uniform over `1..=254`:
//! - `0` never appears, so blank or sparse storage cannot pass for data;
//! - `255` stays free for the trailer sentinel written by the initializer.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::plan::BlockInfo;

/// Byte written at the last offset of every test file.
pub const SENTINEL: u8 = 0xFF;

/// Reproducible-per-run pseudo-random template for all block data.
#[derive(Clone)]
pub struct Pattern {
    bytes: Vec<u8>,
    seed: u64,
}

impl Pattern {
    /// Generates `len` bytes from an explicit seed.
    pub fn generate(len: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let bytes = (0..len).map(|_| rng.gen_range(1..SENTINEL)).collect();
        Self { bytes, seed }
    }

    /// Generates `len` bytes from a clock-derived seed.
    pub fn from_clock(len: usize) -> Self {
        Self::generate(len, clock_seed())
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Fills `out` with the data of `block`: the pattern truncated to the
    /// block size, its leading bytes replaced by the block tag.
    ///
    /// `out` is reused across calls to avoid one allocation per block.
    pub fn fill_block(&self, block: &BlockInfo, out: &mut Vec<u8>) {
        let size = block.size as usize;
        debug_assert!(size > 0 && size <= self.bytes.len());

        out.clear();
        out.extend_from_slice(&self.bytes[..size]);
        let tag = block.tag.as_slice();
        if tag.len() <= size {
            out[..tag.len()].copy_from_slice(tag);
        }
    }

    pub fn block_data(&self, block: &BlockInfo) -> Vec<u8> {
        let mut out = Vec::with_capacity(block.size as usize);
        self.fill_block(block, &mut out);
        out
    }
}

impl core::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pattern")
            .field("len", &self.bytes.len())
            .field("seed", &self.seed)
            .finish()
    }
}

/// Nanoseconds since the Unix epoch, folded to 64 bits.
pub fn clock_seed() -> u64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos() as u128;
    (nanos as u64) ^ ((nanos >> 64) as u64)
}
