//! Deterministic random number generation for draw pipelines.
//!
//! ## Key Features
//!
//! - **Deterministic**: Same seed produces identical draw sequences
//! - **Forkable**: Duplicated pipelines get independent streams
//! - **Context streams**: Pools derive their own stream from a shared seed
//!
//! ## Usage
//!
//! ```
//! use wish_engine::core::{RandomSource, WishRng};
//!
//! let mut rng = WishRng::new(42);
//!
//! // Fork for a duplicated pipeline
//! let mut forked = rng.fork();
//!
//! // Both stay inside the requested bound
//! assert!(rng.next_below(10_000) < 10_000);
//! assert!(forked.next_below(10_000) < 10_000);
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::hash::{Hash, Hasher};

/// A source of uniformly distributed integers.
///
/// Every random decision in the engine goes through this trait so tests can
/// inject scripted sequences.
pub trait RandomSource {
    /// Return a value in `0..bound`. `bound` is never zero.
    fn next_below(&mut self, bound: u64) -> u64;
}

/// Deterministic RNG used by draw pipelines.
///
/// Uses ChaCha8 for speed while keeping good statistical quality over
/// millions of simulated draws.
#[derive(Clone, Debug)]
pub struct WishRng {
    inner: ChaCha8Rng,
    seed: u64,
    fork_counter: u64,
}

impl WishRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
            fork_counter: 0,
        }
    }

    /// The seed this stream was created from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fork this RNG to create an independent branch.
    ///
    /// Each fork produces a different but deterministic sequence.
    #[must_use]
    pub fn fork(&mut self) -> Self {
        self.fork_counter += 1;
        let fork_seed = self.seed.wrapping_add(self.fork_counter.wrapping_mul(0x9E3779B97F4A7C15));
        Self {
            inner: ChaCha8Rng::seed_from_u64(fork_seed),
            seed: fork_seed,
            fork_counter: 0,
        }
    }

    /// Create an independent stream for a named context, such as a pool.
    ///
    /// The same context always produces the same stream from the same seed.
    #[must_use]
    pub fn for_context(&self, context: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;

        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        context.hash(&mut hasher);
        let context_seed = hasher.finish();

        Self::new(context_seed)
    }
}

impl RandomSource for WishRng {
    fn next_below(&mut self, bound: u64) -> u64 {
        self.inner.gen_range(0..bound)
    }
}
