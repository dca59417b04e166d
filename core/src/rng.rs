//! Deterministic random number generation for synthetic ledgers.
//!
//! RULE: The synthetic generator never calls any platform RNG.
//! Every stream is seeded from (master_seed XOR stream_index), so:
//!   - Adding a new stream never changes existing streams.
//!   - Each stream is fully reproducible in isolation.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A deterministic RNG for a single generator stream.
pub struct LedgerRng {
    inner: Pcg64Mcg,
}

impl LedgerRng {
    pub fn new(master_seed: u64, stream: LedgerStream) -> Self {
        let derived_seed = master_seed ^ ((stream as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n). `n` of zero yields zero.
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        if n == 0 {
            return 0;
        }
        self.inner.next_u64() % n
    }

    /// Roll an i64 in [lo, hi].
    pub fn range_i64(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        lo + self.next_u64_below((hi - lo + 1) as u64) as i64
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform pick from a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.next_u64_below(items.len() as u64) as usize]
    }

    /// A string of `len` random decimal digits.
    pub fn digits(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| char::from(b'0' + self.next_u64_below(10) as u8))
            .collect()
    }
}

/// Stable stream assignments.
/// NEVER reorder or remove entries. Only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum LedgerStream {
    Customers = 0,
    Contracts = 1,
    Noise = 2,
}
