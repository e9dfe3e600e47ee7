//! Chain growth from a seed pair.

use log::trace;

use super::dominance::Dominance;
use super::eligibility::should_vectorize;
use super::isomorphism::isomorphic;
use super::pair_list::{InstPair, OrderedPairList};
use crate::ir::{Function, InstId, Value};

/// Grows a seed pair into the maximal chain of isomorphic operand pairs.
pub struct ChainCollector<'f, 'o> {
    func: &'f Function,
    dom: Dominance<'o>,
}

impl<'f, 'o> ChainCollector<'f, 'o> {
    pub fn new(func: &'f Function, dom: Dominance<'o>) -> Self {
        Self { func, dom }
    }

    /// Add `(i, j)` and, transitively, every pair of operands at the same
    /// position that are isomorphic to each other.
    ///
    /// Pairs are visited seed first, then operand by operand in index order,
    /// each operand subtree finished before the next one starts. A pair is
    /// skipped if it fails the eligibility filter, pairs an instruction with
    /// itself, or touches an instruction the list has already claimed.
    /// Returns the number of pairs added.
    pub fn collect(&self, list: &mut OrderedPairList<'_>, i: InstId, j: InstId) -> usize {
        let func = self.func;
        let before = list.len();
        let mut stack = vec![(i, j)];

        while let Some((i, j)) = stack.pop() {
            if i == j || !should_vectorize(func, i, j) {
                continue;
            }
            if list.is_claimed(i) || list.is_claimed(j) {
                trace!("skip {}: lane already claimed", func.display_inst(i));
                continue;
            }

            trace!(
                "pair [{}] with [{}]",
                func.display_inst(i),
                func.display_inst(j)
            );
            list.append_pair(func, &self.dom, InstPair::new(i, j));

            let (ops_i, ops_j) = (&func.inst(i).operands, &func.inst(j).operands);
            for (&a, &b) in ops_i.iter().zip(ops_j).rev() {
                if isomorphic(func, a, b) {
                    if let (Value::Inst(a), Value::Inst(b)) = (a, b) {
                        stack.push((a, b));
                    }
                }
            }
        }

        list.len() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analyzer::DominatorTree;
    use crate::ir::{BlockId, Module};
    use bumpalo::Bump;

    const KERNEL: &str = r#"
define void @kernel([4 x i32]* %A, [4 x i32]* %B, [4 x i32]* %C) {
entry:
  %pa0 = getelementptr [4 x i32]* %A, i64 0, i64 0
  %pb0 = getelementptr [4 x i32]* %B, i64 0, i64 0
  %pc0 = getelementptr [4 x i32]* %C, i64 0, i64 0
  %pa1 = getelementptr [4 x i32]* %A, i64 0, i64 1
  %pb1 = getelementptr [4 x i32]* %B, i64 0, i64 1
  %pc1 = getelementptr [4 x i32]* %C, i64 0, i64 1
  %a0 = load i32, i32* %pa0
  %b0 = load i32, i32* %pb0
  %s0 = add i32 %a0, %b0
  store i32 %s0, i32* %pc0
  %a1 = load i32, i32* %pa1
  %b1 = load i32, i32* %pb1
  %s1 = add i32 %a1, %b1
  store i32 %s1, i32* %pc1
  ret void
}
"#;

    #[test]
    fn test_collect_walks_operands_in_order() {
        let module = Module::parse(KERNEL).unwrap();
        let func = &module.functions[0];
        let tree = DominatorTree::compute(func);
        let dom = Dominance::new(&tree);
        let x = func.block_insts(BlockId(0));
        let (a0, b0, s0, st0) = (x[6], x[7], x[8], x[9]);
        let (a1, b1, s1, st1) = (x[10], x[11], x[12], x[13]);

        let bump = Bump::new();
        let mut list = OrderedPairList::new_in(&bump);
        let added = ChainCollector::new(func, dom).collect(&mut list, st1, st0);

        assert_eq!(added, 4);
        let pairs: Vec<InstPair> = list.iter().collect();
        // Dominance order of lane 0.
        assert_eq!(
            pairs,
            vec![
                InstPair::new(a1, a0),
                InstPair::new(b1, b0),
                InstPair::new(s1, s0),
                InstPair::new(st1, st0),
            ]
        );
    }

    #[test]
    fn test_collect_skips_claimed_and_self_pairs() {
        let module = Module::parse(KERNEL).unwrap();
        let func = &module.functions[0];
        let tree = DominatorTree::compute(func);
        let dom = Dominance::new(&tree);
        let x = func.block_insts(BlockId(0));
        let collector = ChainCollector::new(func, dom);
        let bump = Bump::new();

        let mut list = OrderedPairList::new_in(&bump);
        assert_eq!(collector.collect(&mut list, x[8], x[8]), 0);

        // A reserved operand stops growth below it but not beside it.
        list.reserve(x[6]);
        assert_eq!(collector.collect(&mut list, x[13], x[9]), 3);
        assert!(list.not_vector(x[6]));
        assert!(!list.not_vector(x[7]));

        // Seeding again from a claimed lane adds nothing.
        assert_eq!(collector.collect(&mut list, x[13], x[9]), 0);
    }
}
