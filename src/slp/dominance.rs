//! Instruction-level dominance.

use crate::core::analyzer::DominanceOracle;
use crate::ir::{Function, InstId};

/// Answers "does instruction `a` dominate instruction `b`?".
///
/// Instructions in different blocks are decided by the block-level oracle.
/// Inside one block the answer comes from a forward scan starting at `a`, so
/// an instruction dominates itself and every instruction after it. The scan
/// never looks backwards from `b`.
#[derive(Clone, Copy)]
pub struct Dominance<'o> {
    oracle: &'o dyn DominanceOracle,
}

impl<'o> Dominance<'o> {
    pub fn new(oracle: &'o dyn DominanceOracle) -> Self {
        Self { oracle }
    }

    pub fn dominates(&self, func: &Function, a: InstId, b: InstId) -> bool {
        let (block_a, block_b) = (func.parent(a), func.parent(b));
        if block_a != block_b {
            return self.oracle.dominates_block(func, block_a, block_b);
        }
        let insts = func.block_insts(block_a);
        match insts.iter().position(|&inst| inst == a) {
            Some(start) => insts[start..].contains(&b),
            None => false,
        }
    }
}
