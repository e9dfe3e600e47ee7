//! Chain statistics of a pass run.

use std::fmt;

/// Which scan seeded a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
    Store,
    Load,
}

/// Counters accumulated over one module run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    /// Chains by number of pairs.
    pub size_1: u64,
    pub size_2: u64,
    pub size_3: u64,
    pub size_4: u64,
    pub size_5_plus: u64,

    /// Non-empty chains seeded by a store pair.
    pub store_chains: u64,

    /// Non-empty chains seeded by a load pair.
    pub load_chains: u64,

    /// Chains rewritten into vector code.
    pub vectorized_chains: u64,

    /// Chains whose synthesis was abandoned, leaving the scalars in place.
    pub aborted_chains: u64,

    /// Instructions inserted by the synthesizer that survived the sweep.
    pub emitted_instructions: u64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one chain of `size` pairs. Empty chains are not counted.
    pub fn record_chain(&mut self, size: usize, seed: SeedKind) {
        match size {
            0 => return,
            1 => self.size_1 += 1,
            2 => self.size_2 += 1,
            3 => self.size_3 += 1,
            4 => self.size_4 += 1,
            _ => self.size_5_plus += 1,
        }
        match seed {
            SeedKind::Store => self.store_chains += 1,
            SeedKind::Load => self.load_chains += 1,
        }
    }

    pub fn total_chains(&self) -> u64 {
        self.store_chains + self.load_chains
    }

    /// Add the counters of another run.
    pub fn merge(&mut self, other: &Statistics) {
        self.size_1 += other.size_1;
        self.size_2 += other.size_2;
        self.size_3 += other.size_3;
        self.size_4 += other.size_4;
        self.size_5_plus += other.size_5_plus;
        self.store_chains += other.store_chains;
        self.load_chains += other.load_chains;
        self.vectorized_chains += other.vectorized_chains;
        self.aborted_chains += other.aborted_chains;
        self.emitted_instructions += other.emitted_instructions;
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SLP Results:")?;
        writeln!(f, "Size: Count")?;
        writeln!(f, " 1: {}", self.size_1)?;
        writeln!(f, " 2: {}", self.size_2)?;
        writeln!(f, " 3: {}", self.size_3)?;
        writeln!(f, " 4: {}", self.size_4)?;
        writeln!(f, ">5: {}", self.size_5_plus)?;
        writeln!(f, "Store-chain: {}", self.store_chains)?;
        writeln!(f, "Load-chain: {}", self.load_chains)
    }
}
