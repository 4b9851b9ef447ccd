//! Deterministic random number generation.
//!
//! RULE: Nothing in the generator may call any platform RNG.
//! All randomness flows through EngineRng instances derived from
//! the single master seed supplied at engine construction.
//!
//! Each engine gets its own stream per simulated year, seeded
//! deterministically from (master_seed XOR slot XOR year). This means:
//!   - Adding a new engine never changes existing engines' streams.
//!   - Any single (engine, year) stream is reproducible in isolation.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

use crate::types::Year;

const SLOT_MIX: u64 = 0x9e37_79b9_7f4a_7c15;
const YEAR_MIX: u64 = 0xc2b2_ae3d_27d4_eb4f;

/// A named, deterministic RNG for a single engine in a single year.
pub struct EngineRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl EngineRng {
    /// Derive an RNG from the master seed, a stable engine slot, and
    /// the simulation year. The slot value must never change once
    /// assigned.
    pub fn new(master_seed: u64, slot_index: u64, year: Year) -> Self {
        let derived_seed = master_seed
            ^ slot_index.wrapping_mul(SLOT_MIX)
            ^ (year as i64 as u64).wrapping_mul(YEAR_MIX);
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        use rand::RngCore;
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick one index from a weighted table via a cumulative scan.
    /// Weights need not sum to 1.0. A table whose weights are all
    /// zero resolves to the last index.
    pub fn pick_weighted(&mut self, weights: &[f64]) -> usize {
        assert!(!weights.is_empty(), "weights must be non-empty");
        let total: f64 = weights.iter().sum();
        let roll = self.next_f64() * total;
        let mut cumulative = 0.0;
        for (i, w) in weights.iter().enumerate() {
            cumulative += w;
            if roll < cumulative {
                return i;
            }
        }
        weights.len() - 1
    }
}

/// All engine RNG streams for a single run, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_engine(&self, slot: EngineSlot, year: Year) -> EngineRng {
        EngineRng::new(self.master_seed, slot as u64, year).with_name(slot.name())
    }
}

/// Stable engine slot assignments.
/// NEVER reorder or remove entries — only append.
/// Reordering changes every engine's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum EngineSlot {
    Seeding = 0,
    Mortality = 1,
    Marriage = 2,
    Fertility = 3,
    // Add new engines here — append only.
}

impl EngineSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Seeding => "seeding",
            Self::Mortality => "mortality",
            Self::Marriage => "marriage",
            Self::Fertility => "fertility",
        }
    }
}
