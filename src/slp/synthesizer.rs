// This module lowers a chain of scalar instruction pairs to 2-lane vector code. It works
// in two phases so a chain that cannot be lowered leaves the function exactly as it was.
// Validation walks the pairs in list order and checks that every opcode has a vector
// form, that an operand lane produced by a chain member is paired with its sibling in an
// earlier pair (so the operand vector already exists), that operand lanes agree on type,
// that no outside user of a lane sits between the two lanes, and that no conflicting memory
// access sits between the lanes of a load or store pair. Emission then inserts, before
// the later lane of each pair (the anchor), the element inserts assembling each operand
// vector, the vector instruction itself and one lane extract per original. Assembled
// operand vectors are memoized by their ordered scalar pair and reused while they still
// dominate the anchor. Uses of the originals outside the chain are redirected to the
// extracts through a use index built once per call, the originals are erased, and a
// final sweep deletes the extracts nobody ended up using.

//! Vector code synthesis for pair chains.

use hashbrown::{HashMap, HashSet};
use log::debug;

use super::dominance::Dominance;
use super::pair_list::{InstPair, OrderedPairList};
use crate::core::error::{SynthesisError, SynthesisResult};
use crate::ir::{Function, InstData, InstId, Opcode, Type, UseIndex, Value};

/// Outcome of a successful [`VectorSynthesizer::vectorize`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Vectorized {
    /// One vector instruction per pair, in list order.
    pub vectors: Vec<InstId>,
    /// Instructions inserted and still live after the sweep.
    pub emitted: usize,
    /// Scalar originals erased.
    pub erased: usize,
}

pub struct VectorSynthesizer<'o> {
    width: u32,
    dom: Dominance<'o>,
}

impl<'o> VectorSynthesizer<'o> {
    pub fn new(width: u32, dom: Dominance<'o>) -> Self {
        Self { width, dom }
    }

    /// Whether `opcode` has a vector form.
    pub fn supports(opcode: Opcode) -> bool {
        opcode.is_binary()
            || (opcode.is_cast() && opcode != Opcode::AddrSpaceCast)
            || matches!(opcode, Opcode::Alloca | Opcode::Load | Opcode::Store)
    }

    /// Build a vector holding `lanes[k]` in lane `k`.
    ///
    /// All-constant lanes fold into a constant vector. Otherwise the lanes are
    /// inserted one by one into a zero vector before `before`; the inserted
    /// instructions are appended to `created`.
    pub fn assemble_vector(
        &self,
        func: &mut Function,
        lanes: &[Value],
        before: InstId,
        created: &mut Vec<InstId>,
    ) -> Value {
        if lanes.iter().all(|lane| lane.is_const()) {
            if let Some(constant) = func.const_vector(lanes) {
                return constant;
            }
        }

        let elem_ty = func.value_type(lanes[0]).clone();
        let vec_ty = Type::vector_of(elem_ty, lanes.len() as u32);
        let mut acc = func.const_zero(vec_ty.clone());
        for (lane, &value) in lanes.iter().enumerate() {
            let index = func.const_int(Type::i32(), lane as i64);
            let name = func.fresh_name("v.ie");
            let insert = InstData::new(Opcode::InsertElement, vec_ty.clone(), vec![acc, value, index])
                .named(name);
            let id = func.insert_before(before, insert);
            created.push(id);
            acc = Value::Inst(id);
        }
        acc
    }

    /// Emit the vector form of `template` over already assembled operand
    /// vectors, before `before`.
    pub fn synthesize(
        &self,
        func: &mut Function,
        template: InstId,
        operands: &[Value],
        before: InstId,
    ) -> SynthesisResult<InstId> {
        let inst = func.inst(template);
        let opcode = inst.opcode;
        let ty = match opcode {
            op if op.is_binary() => Type::vector_of(inst.ty.clone(), self.width),
            Opcode::Alloca => {
                let slot = inst.ty.pointee().cloned().unwrap_or(Type::i32());
                Type::ptr_to(Type::vector_of(slot, self.width))
            }
            Opcode::Load => Type::vector_of(inst.ty.clone(), self.width),
            Opcode::Store => Type::Void,
            op if Self::supports(op) => Type::vector_of(inst.ty.clone(), self.width),
            _ => return Err(SynthesisError::Unsupported { opcode }),
        };
        if operands.len() != inst.operands.len() {
            return Err(SynthesisError::LaneMismatch {
                lane0: inst.operands.len(),
                lane1: operands.len(),
            });
        }

        let mut data = InstData::new(opcode, ty, operands.to_vec());
        if !data.ty.is_void() {
            data = data.named(func.fresh_name("v.op"));
        }
        let id = func.insert_before(before, data);
        debug!("emitted {}", func.display_inst(id));
        Ok(id)
    }

    /// Lane `lane` of `vector`: an element extract, or an address into the
    /// slot for a vectorized alloca.
    fn extract_lane(&self, func: &mut Function, vector: InstId, lane: usize, before: InstId) -> InstId {
        let vec_ty = func.inst(vector).ty.clone();
        let index = func.const_int(Type::i32(), lane as i64);
        let data = if func.inst(vector).opcode == Opcode::Alloca {
            let elem = vec_ty.pointee().and_then(Type::element).cloned().unwrap_or(Type::i32());
            let zero = func.const_int(Type::i32(), 0);
            InstData::new(Opcode::GetElementPtr, Type::ptr_to(elem), vec![Value::Inst(vector), zero, index])
                .named(func.fresh_name("v.gep"))
        } else {
            let elem = vec_ty.element().cloned().unwrap_or(Type::i32());
            InstData::new(Opcode::ExtractElement, elem, vec![Value::Inst(vector), index])
                .named(func.fresh_name("v.ee"))
        };
        func.insert_before(before, data)
    }

    /// The later lane of a pair; all code for the pair goes right before it.
    fn anchor(&self, func: &Function, pair: InstPair) -> InstId {
        if self.dom.dominates(func, pair.lane0, pair.lane1) {
            pair.lane1
        } else {
            pair.lane0
        }
    }

    fn available(&self, func: &Function, value: Value, at: InstId) -> bool {
        match value {
            Value::Inst(id) => func.is_live(id) && self.dom.dominates(func, id, at),
            _ => true,
        }
    }

    /// Rewrite every pair of `list` into vector code.
    ///
    /// On error nothing has been changed.
    pub fn vectorize(&self, func: &mut Function, list: &OrderedPairList<'_>) -> SynthesisResult<Vectorized> {
        if self.width != 2 {
            return Err(SynthesisError::Unschedulable {
                reason: format!("pairs fill 2 lanes, synthesizer is {} wide", self.width),
            });
        }
        let pairs: Vec<InstPair> = list.iter().collect();
        let uses = UseIndex::build(func);
        self.validate(func, list, &pairs, &uses)?;

        let mut memo: HashMap<(Value, Value), Value> = HashMap::new();
        let mut created = Vec::new();
        let mut extracts = Vec::new();
        let mut result = Vectorized::default();

        for &pair in &pairs {
            let anchor = self.anchor(func, pair);
            let count = func.num_operands(pair.lane0);

            let mut operands = Vec::with_capacity(count);
            for pos in 0..count {
                let key = (func.inst(pair.lane0).operands[pos], func.inst(pair.lane1).operands[pos]);
                let cached = memo.get(&key).copied().filter(|&v| self.available(func, v, anchor));
                let vector = match cached {
                    Some(vector) => vector,
                    None => {
                        let vector = self.assemble_vector(func, &[key.0, key.1], anchor, &mut created);
                        memo.insert(key, vector);
                        vector
                    }
                };
                operands.push(vector);
            }

            let vector = self.synthesize(func, pair.lane0, &operands, anchor)?;
            created.push(vector);
            result.vectors.push(vector);
            memo.insert((Value::Inst(pair.lane0), Value::Inst(pair.lane1)), Value::Inst(vector));

            if func.inst(vector).ty.is_void() {
                continue;
            }
            for (lane, original) in pair.lanes().into_iter().enumerate() {
                let extract = self.extract_lane(func, vector, lane, anchor);
                extracts.push(extract);
                for &user in uses.users(original) {
                    if !list.is_visited(user) {
                        func.replace_uses_in(user, Value::Inst(original), Value::Inst(extract));
                    }
                }
            }
        }

        for pair in &pairs {
            for original in pair.lanes() {
                func.erase(original);
                result.erased += 1;
            }
        }

        // Sweep extracts left without users.
        let uses = UseIndex::build(func);
        let mut swept = 0;
        for &extract in &extracts {
            if !uses.has_users(extract) {
                func.erase(extract);
                swept += 1;
            }
        }
        result.emitted = created.len() + extracts.len() - swept;
        Ok(result)
    }

    fn validate(
        &self,
        func: &Function,
        list: &OrderedPairList<'_>,
        pairs: &[InstPair],
        uses: &UseIndex,
    ) -> SynthesisResult<()> {
        let unschedulable = |reason: String| Err(SynthesisError::Unschedulable { reason });
        let member = |value: Value| value.as_inst().is_some_and(|id| list.is_visited(id));
        let mut emitted: HashSet<(Value, Value)> = HashSet::new();

        for &pair in pairs {
            let (inst0, inst1) = (func.inst(pair.lane0), func.inst(pair.lane1));
            if !Self::supports(inst0.opcode) {
                return Err(SynthesisError::Unsupported { opcode: inst0.opcode });
            }
            if inst0.operands.len() != inst1.operands.len() {
                return Err(SynthesisError::LaneMismatch {
                    lane0: inst0.operands.len(),
                    lane1: inst1.operands.len(),
                });
            }
            if inst0.opcode != inst1.opcode || inst0.ty != inst1.ty {
                return unschedulable(format!(
                    "lanes of {} differ in opcode or type",
                    func.display_inst(pair.lane0)
                ));
            }
            if inst0.block != inst1.block {
                return unschedulable(format!(
                    "lanes of {} live in different blocks",
                    func.display_inst(pair.lane0)
                ));
            }

            for (pos, (&a, &b)) in inst0.operands.iter().zip(&inst1.operands).enumerate() {
                if member(a) || member(b) {
                    if !emitted.contains(&(a, b)) {
                        return unschedulable(format!(
                            "operand {} of {} is not an earlier pair of the chain",
                            pos,
                            func.display_inst(pair.lane0)
                        ));
                    }
                } else if func.value_type(a) != func.value_type(b) {
                    return unschedulable(format!(
                        "operand {} of {} has lanes of different types",
                        pos,
                        func.display_inst(pair.lane0)
                    ));
                }
            }

            let anchor = self.anchor(func, pair);
            for original in pair.lanes() {
                for &user in uses.users(original) {
                    if list.is_visited(user) || func.inst(user).opcode == Opcode::Phi {
                        continue;
                    }
                    if func.parent(user) == func.parent(anchor) && !self.dom.dominates(func, anchor, user) {
                        return unschedulable(format!(
                            "{} is used by {} before the lanes meet",
                            func.display_inst(original),
                            func.display_inst(user)
                        ));
                    }
                }
            }

            if inst0.is_load() || inst0.is_store() {
                if let Some(blocker) = self.memory_between(func, pair) {
                    return unschedulable(format!(
                        "{} separates the lanes of {}",
                        func.display_inst(blocker),
                        func.display_inst(pair.lane0)
                    ));
                }
            }

            emitted.insert((Value::Inst(pair.lane0), Value::Inst(pair.lane1)));
        }
        Ok(())
    }

    /// A memory access the merged access would move across. Chain members count
    /// too: their own vector forms land at their own anchors, not here.
    fn memory_between(&self, func: &Function, pair: InstPair) -> Option<InstId> {
        let (first, last) = if self.dom.dominates(func, pair.lane0, pair.lane1) {
            (pair.lane0, pair.lane1)
        } else {
            (pair.lane1, pair.lane0)
        };
        let insts = func.block_insts(func.parent(first));
        let start = func.position(first)?;
        let end = func.position(last)?;
        let is_store = func.inst(pair.lane0).is_store();

        insts[start + 1..end].iter().copied().find(|&id| match func.inst(id).opcode {
            Opcode::Store | Opcode::Call | Opcode::Fence | Opcode::AtomicRMW | Opcode::AtomicCmpXchg => true,
            Opcode::Load => is_store,
            _ => false,
        })
    }
}
