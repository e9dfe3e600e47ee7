// This module implements the block-level dominance analysis the vectorizer consults when
// two candidate instructions live in different basic blocks. It performs two steps:
// 1) a Reverse Post-Order (RPO) traversal of the control flow graph from the entry block,
// using an explicit stack so deep graphs cannot overflow the native stack, and 2) the
// iterative immediate-dominator computation of Cooper, Harvey and Kennedy, which walks
// the RPO repeatedly, intersecting the dominator chains of already-processed predecessors
// until nothing changes. Blocks not reachable from the entry have no immediate dominator;
// they dominate nothing and are dominated by nothing apart from themselves. The CFG never
// changes while the pass runs, so one tree per function serves the whole run.

use hashbrown::HashSet;

use crate::ir::{BlockId, Function};

/// Answers block-level dominance queries for a function.
pub trait DominanceOracle {
    /// Whether every path from the entry to `b` passes through `a`.
    fn dominates_block(&self, func: &Function, a: BlockId, b: BlockId) -> bool;
}

/// Immediate dominators of every block in a function.
#[derive(Debug, Default, Clone)]
pub struct DominatorTree {
    order: Vec<BlockId>,
    rpo_index: Vec<Option<usize>>,
    idom: Vec<Option<BlockId>>,
}

impl DominatorTree {
    /// Build the tree for the given function.
    pub fn compute(func: &Function) -> Self {
        let mut tree = Self::default();
        tree.switch_func(func);
        tree
    }

    /// Sequence of reachable blocks in reverse post order.
    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    pub fn idom(&self, block: BlockId) -> Option<BlockId> {
        let idom = self.idom.get(block.0 as usize).copied().flatten()?;
        (idom != block).then_some(idom)
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.rpo_index.get(block.0 as usize).copied().flatten().is_some()
    }

    /// Recompute the tree for another function.
    pub fn switch_func(&mut self, func: &Function) {
        self.order.clear();
        self.rpo_index = vec![None; func.block_count()];
        self.idom = vec![None; func.block_count()];

        let Some(entry) = func.entry_block() else {
            return;
        };

        // -------- build RPO order ---------
        let mut post = Vec::new();
        let mut stack = vec![(entry, false)];
        let mut visited = HashSet::new();
        while let Some((block, processed)) = stack.pop() {
            if processed {
                post.push(block);
                continue;
            }
            if !visited.insert(block) {
                continue;
            }
            stack.push((block, true));
            for succ in func.successors(block).into_iter().rev() {
                if !visited.contains(&succ) {
                    stack.push((succ, false));
                }
            }
        }
        post.reverse();
        self.order = post;
        for (idx, b) in self.order.iter().enumerate() {
            self.rpo_index[b.0 as usize] = Some(idx);
        }

        // -------- predecessors ---------
        let mut preds: Vec<Vec<BlockId>> = vec![Vec::new(); func.block_count()];
        for &block in &self.order {
            for succ in func.successors(block) {
                preds[succ.0 as usize].push(block);
            }
        }

        // -------- immediate dominators ---------
        self.idom[entry.0 as usize] = Some(entry);
        let mut changed = true;
        while changed {
            changed = false;
            for &block in self.order.iter().skip(1) {
                let mut new_idom = None;
                for &pred in &preds[block.0 as usize] {
                    if self.idom[pred.0 as usize].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => self.intersect(pred, current),
                    });
                }
                if new_idom.is_some() && self.idom[block.0 as usize] != new_idom {
                    self.idom[block.0 as usize] = new_idom;
                    changed = true;
                }
            }
        }
    }

    fn intersect(&self, mut a: BlockId, mut b: BlockId) -> BlockId {
        let rpo = |block: BlockId| self.rpo_index[block.0 as usize].unwrap_or(usize::MAX);
        while a != b {
            while rpo(a) > rpo(b) {
                a = self.idom[a.0 as usize].unwrap_or(b);
            }
            while rpo(b) > rpo(a) {
                b = self.idom[b.0 as usize].unwrap_or(a);
            }
        }
        a
    }

    /// Reflexive block dominance.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }
        let mut current = b;
        while let Some(up) = self.idom(current) {
            if up == a {
                return true;
            }
            current = up;
        }
        false
    }
}

impl DominanceOracle for DominatorTree {
    fn dominates_block(&self, _func: &Function, a: BlockId, b: BlockId) -> bool {
        self.dominates(a, b)
    }
}
