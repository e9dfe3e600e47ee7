// This module implements the ordered pair list the vectorizer accumulates accepted
// instruction pairs in. Nodes live in a bumpalo vector owned by the per-block arena and
// are doubly linked by index, so inserting in the middle never moves or reallocates
// existing nodes and dropping the whole list at the end of a block is free. The list
// keeps its pairs ordered by dominance of lane 0: an insert walks from the head past
// every node whose lane 0 dominates the new lane 0 and links the new node in there,
// which is what lets the synthesizer emit definitions before their uses by iterating
// front to back. A visited set records every instruction used as a lane, and a separate
// reserved set holds instructions another list already claimed; the chain collector
// refuses pairs touching either set. Both sets are hashbrown tables allocated in the
// same arena through the allocator-api2 bridge.

//! Dominance-ordered list of instruction pairs.

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;
use hashbrown::DefaultHashBuilder;
use hashbrown::HashSet;

use super::dominance::Dominance;
use crate::ir::{Function, InstId};

type BumpSet<'bump> = HashSet<InstId, DefaultHashBuilder, &'bump Bump>;

/// Two instructions merged into lane 0 and lane 1 of one vector instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstPair {
    pub lane0: InstId,
    pub lane1: InstId,
}

impl InstPair {
    pub fn new(lane0: InstId, lane1: InstId) -> Self {
        Self { lane0, lane1 }
    }

    pub fn lanes(&self) -> [InstId; 2] {
        [self.lane0, self.lane1]
    }

    pub fn contains(&self, inst: InstId) -> bool {
        self.lane0 == inst || self.lane1 == inst
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    pair: InstPair,
    prev: Option<u32>,
    next: Option<u32>,
}

pub struct OrderedPairList<'bump> {
    nodes: BumpVec<'bump, Node>,
    head: Option<u32>,
    tail: Option<u32>,
    visited: BumpSet<'bump>,
    reserved: BumpSet<'bump>,
    size: usize,
}

impl<'bump> OrderedPairList<'bump> {
    pub fn new_in(bump: &'bump Bump) -> Self {
        Self {
            nodes: BumpVec::new_in(bump),
            head: None,
            tail: None,
            visited: HashSet::new_in(bump),
            reserved: HashSet::new_in(bump),
            size: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn head(&self) -> Option<InstPair> {
        self.head.map(|idx| self.nodes[idx as usize].pair)
    }

    pub fn tail(&self) -> Option<InstPair> {
        self.tail.map(|idx| self.nodes[idx as usize].pair)
    }

    /// Whether `inst` is a lane of a pair in this list.
    pub fn is_visited(&self, inst: InstId) -> bool {
        self.visited.contains(&inst)
    }

    /// Whether `inst` is a lane here or was reserved by another list.
    pub fn is_claimed(&self, inst: InstId) -> bool {
        self.visited.contains(&inst) || self.reserved.contains(&inst)
    }

    /// Keep `inst` out of this list without making it a lane.
    pub fn reserve(&mut self, inst: InstId) {
        self.reserved.insert(inst);
    }

    /// Instructions used as a lane, in no particular order.
    pub fn visited(&self) -> impl Iterator<Item = InstId> + '_ {
        self.visited.iter().copied()
    }

    /// True iff `inst` is neither lane of any pair in the list.
    pub fn not_vector(&self, inst: InstId) -> bool {
        !self.iter().any(|pair| pair.contains(inst))
    }

    /// Insert after every pair whose lane 0 dominates the new lane 0.
    pub fn append_pair(&mut self, func: &Function, dom: &Dominance<'_>, pair: InstPair) {
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let node = self.nodes[idx as usize];
            if !dom.dominates(func, node.pair.lane0, pair.lane0) {
                break;
            }
            prev = cursor;
            cursor = node.next;
        }

        let idx = self.nodes.len() as u32;
        self.nodes.push(Node { pair, prev, next: cursor });
        match prev {
            Some(p) => self.nodes[p as usize].next = Some(idx),
            None => self.head = Some(idx),
        }
        match cursor {
            Some(n) => self.nodes[n as usize].prev = Some(idx),
            None => self.tail = Some(idx),
        }

        self.visited.insert(pair.lane0);
        self.visited.insert(pair.lane1);
        self.size += 1;
    }

    /// Append every pair of `other`, keeping this list's order.
    pub fn merge(&mut self, func: &Function, dom: &Dominance<'_>, other: &OrderedPairList<'_>) {
        for pair in other.iter() {
            self.append_pair(func, dom, pair);
        }
    }

    /// Pairs front to back.
    pub fn iter(&self) -> Iter<'_, 'bump> {
        Iter { list: self, cursor: self.head }
    }
}

pub struct Iter<'l, 'bump> {
    list: &'l OrderedPairList<'bump>,
    cursor: Option<u32>,
}

impl Iterator for Iter<'_, '_> {
    type Item = InstPair;

    fn next(&mut self) -> Option<InstPair> {
        let node = self.list.nodes[self.cursor? as usize];
        self.cursor = node.next;
        Some(node.pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analyzer::DominatorTree;
    use crate::ir::{BlockId, Module};

    fn block() -> Module {
        Module::parse(
            r#"
define void @f(i32 %a) {
entry:
  %x0 = add i32 %a, 0
  %x1 = add i32 %a, 1
  %x2 = add i32 %a, 2
  %x3 = add i32 %a, 3
  %x4 = add i32 %a, 4
  %x5 = add i32 %a, 5
  ret void
}
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_pairs_are_kept_in_dominance_order() {
        let module = block();
        let func = &module.functions[0];
        let tree = DominatorTree::compute(func);
        let dom = Dominance::new(&tree);
        let x = func.block_insts(BlockId(0));
        let bump = Bump::new();
        let mut list = OrderedPairList::new_in(&bump);

        list.append_pair(func, &dom, InstPair::new(x[4], x[5]));
        list.append_pair(func, &dom, InstPair::new(x[0], x[1]));
        list.append_pair(func, &dom, InstPair::new(x[2], x[3]));

        let lane0: Vec<InstId> = list.iter().map(|p| p.lane0).collect();
        assert_eq!(lane0, vec![x[0], x[2], x[4]]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.head(), Some(InstPair::new(x[0], x[1])));
        assert_eq!(list.tail(), Some(InstPair::new(x[4], x[5])));
    }

    #[test]
    fn test_membership() {
        let module = block();
        let func = &module.functions[0];
        let tree = DominatorTree::compute(func);
        let dom = Dominance::new(&tree);
        let x = func.block_insts(BlockId(0));
        let bump = Bump::new();
        let mut list = OrderedPairList::new_in(&bump);
        assert!(list.is_empty());

        list.append_pair(func, &dom, InstPair::new(x[3], x[1]));
        assert!(!list.not_vector(x[1]));
        assert!(!list.not_vector(x[3]));
        assert!(list.not_vector(x[2]));
        assert!(list.is_visited(x[1]));

        list.reserve(x[2]);
        assert!(list.is_claimed(x[2]));
        assert!(!list.is_visited(x[2]));
        assert!(list.not_vector(x[2]));
    }

    #[test]
    fn test_merge_keeps_order() {
        let module = block();
        let func = &module.functions[0];
        let tree = DominatorTree::compute(func);
        let dom = Dominance::new(&tree);
        let x = func.block_insts(BlockId(0));
        let bump = Bump::new();

        let mut master = OrderedPairList::new_in(&bump);
        master.append_pair(func, &dom, InstPair::new(x[2], x[3]));
        let mut chain = OrderedPairList::new_in(&bump);
        chain.append_pair(func, &dom, InstPair::new(x[4], x[5]));
        chain.append_pair(func, &dom, InstPair::new(x[0], x[1]));

        master.merge(func, &dom, &chain);
        let lane0: Vec<InstId> = master.iter().map(|p| p.lane0).collect();
        assert_eq!(lane0, vec![x[0], x[2], x[4]]);
        assert_eq!(master.visited().count(), 6);
    }
}
