//! Random number generation for variation operators.
//!
//! Every algorithm in this crate is defined over a sequential stream of draws,
//! so each worker owns its own [`GenomeRng`] and a seed reproduces the output.

use rand::prelude::*;
use rand_distr::StandardNormal;

const STREAM_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Random number generator wrapper for genome operations.
#[derive(Debug, Clone)]
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Independent generator for worker or individual `stream` under `seed`.
    ///
    /// The same `(seed, stream)` pair always yields the same sequence, which
    /// keeps parallel population helpers independent of thread scheduling.
    pub fn for_stream(seed: u64, stream: u64) -> Self {
        Self::new(seed ^ stream.wrapping_add(1).wrapping_mul(STREAM_MIX))
    }

    /// Split off a child generator seeded from this one.
    pub fn fork(&mut self) -> Self {
        Self::new(self.next_seed())
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }

    /// Uniform in `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.rng.r#gen()
    }

    /// Bernoulli trial with probability `p`.
    #[inline]
    pub fn coin(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            false
        } else if p >= 1.0 {
            true
        } else {
            self.rng.gen_bool(p)
        }
    }

    /// Fair coin.
    #[inline]
    pub fn flip(&mut self) -> bool {
        self.rng.r#gen()
    }

    /// Standard normal sample.
    #[inline]
    pub fn gaussian(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    /// Uniform index in `[0, n)`. `n` must be non-zero.
    #[inline]
    pub fn below(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// Uniform count in `[min, max]`. Valid up to `max == usize::MAX`.
    #[inline]
    pub fn between(&mut self, min: usize, max: usize) -> usize {
        self.rng.gen_range(min..=max)
    }

    /// Uniform real in `[min, max]`.
    #[inline]
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        (min + self.unit() * (max - min)).min(max)
    }

    /// Uniform integer in `[min, max]`, computed in 64 bits so spans such as
    /// `i32::MIN..=i32::MAX` never overflow.
    #[inline]
    pub fn uniform_int(&mut self, min: i64, max: i64) -> i64 {
        self.rng.gen_range(min..=max)
    }
}

impl RngCore for GenomeRng {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}
