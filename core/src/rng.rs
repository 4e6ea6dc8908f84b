//! Deterministic random number generation.
//!
//! RULE: Nothing in the engine may call any platform RNG.
//! All randomness flows through StreamRng instances derived
//! from the single master seed of the run.
//!
//! Each (product, role) pair gets its own stream, seeded from
//! master_seed XOR a stable hash of the SKU XOR the role slot. This means:
//!   - Adding or removing a product never changes other products' streams.
//!   - Each product's curves are fully reproducible in isolation.

use crate::types::Role;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// A named, deterministic RNG stream for one product and role.
pub struct StreamRng {
    pub name: String,
    inner: Pcg64Mcg,
}

impl StreamRng {
    /// Create a stream from the master seed and a stable stream key.
    pub fn new(master_seed: u64, stream_key: u64) -> Self {
        let derived_seed = master_seed ^ stream_key.wrapping_mul(GOLDEN_GAMMA);
        Self {
            name: "unnamed".to_string(),
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

impl RngCore for StreamRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

/// Hands out per-product streams for a single run.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_product(&self, sku: &str, role: Role) -> StreamRng {
        let key = stable_hash(sku) ^ (role as u64).wrapping_add(1).wrapping_mul(GOLDEN_GAMMA);
        StreamRng::new(self.master_seed, key).with_name(format!("{sku}/{role}"))
    }
}

/// FNV-1a. Stable across platforms and releases, unlike `DefaultHasher`.
pub fn stable_hash(value: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    value
        .bytes()
        .fold(OFFSET, |hash, byte| (hash ^ byte as u64).wrapping_mul(PRIME))
}
