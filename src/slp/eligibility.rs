//! Candidate filter for instruction pairs.

use log::trace;

use super::adjacency::{adjacent_loads, adjacent_stores};
use crate::ir::{Function, InstData, InstId, Opcode, Type, TypeKind};

/// Opcodes that never take part in a pair.
const EXCLUDED: &[Opcode] = &[
    Opcode::Phi,
    Opcode::Call,
    Opcode::ICmp,
    Opcode::FCmp,
    Opcode::AddrSpaceCast,
    Opcode::ExtractValue,
    Opcode::ExtractElement,
    Opcode::InsertValue,
    Opcode::AtomicCmpXchg,
    Opcode::AtomicRMW,
    Opcode::Fence,
];

/// Whether `(i, j)` may be merged into one vector instruction.
///
/// The relation is not symmetric: the result-type guard only inspects `i`.
pub fn should_vectorize(func: &Function, i: InstId, j: InstId) -> bool {
    let (inst_i, inst_j) = (func.inst(i), func.inst(j));

    if rejects_result_type(inst_i) {
        trace!("reject {}: pointer result", func.display_inst(i));
        return false;
    }
    if inst_i.block != inst_j.block {
        trace!("reject pair: lanes in different blocks");
        return false;
    }
    for (id, inst) in [(i, inst_i), (j, inst_j)] {
        if inst.is_terminator() {
            trace!("reject {}: terminator", func.display_inst(id));
            return false;
        }
        if inst.volatile && (inst.is_load() || inst.is_store()) {
            trace!("reject {}: volatile access", func.display_inst(id));
            return false;
        }
        if EXCLUDED.contains(&inst.opcode) {
            trace!("reject {}: excluded opcode", func.display_inst(id));
            return false;
        }
        if inst.opcode == Opcode::GetElementPtr {
            trace!("reject {}: address computation", func.display_inst(id));
            return false;
        }
        if lane_type(func, inst).is_vector() {
            trace!("reject {}: already a vector", func.display_inst(id));
            return false;
        }
    }

    if inst_i.is_load() && inst_j.is_load() && !adjacent_loads(func, i, j) {
        trace!("reject loads: not adjacent");
        return false;
    }
    if inst_i.is_store() && inst_j.is_store() && !adjacent_stores(func, i, j) {
        trace!("reject stores: not adjacent");
        return false;
    }
    true
}

/// Type a lane contributes to the vector: the stored value for stores.
fn lane_type<'f>(func: &'f Function, inst: &'f InstData) -> &'f Type {
    match inst.operands.first() {
        Some(&value) if inst.is_store() => func.value_type(value),
        _ => &inst.ty,
    }
}

/// Result-type guard, kept in its literal form. Both branches reduce to
/// "the result is a pointer".
#[allow(clippy::nonminimal_bool)]
fn rejects_result_type(inst: &InstData) -> bool {
    let kind = inst.ty.kind();
    if inst.is_load() {
        kind != TypeKind::Integer && kind != TypeKind::Float && kind == TypeKind::Pointer
    } else {
        kind != TypeKind::Integer
            && kind != TypeKind::Float
            && kind == TypeKind::Pointer
            && kind != TypeKind::Void
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BlockId, Module};

    const PAIRS: &str = r#"
define void @f([4 x i32]* %A, i32* %p, i64 %n, i1 %c) {
entry:
  %g0 = getelementptr [4 x i32]* %A, i64 0, i64 0
  %g1 = getelementptr [4 x i32]* %A, i64 0, i64 1
  %g3 = getelementptr [4 x i32]* %A, i64 0, i64 3
  %x0 = load i32, i32* %g0
  %x1 = load i32, i32* %g1
  %xv = load volatile i32, i32* %g1
  %x3 = load i32, i32* %g3
  %s0 = add i32 %x0, 1
  %s1 = add i32 %x1, 1
  %q0 = inttoptr i64 %n to i32*
  %q1 = trunc i64 %n to i32
  %k0 = icmp eq i32 %x0, 0
  %k1 = icmp eq i32 %x1, 0
  store i32 %s0, i32* %g0
  store volatile i32 %s1, i32* %g1
  br i1 %c, label %next, label %next
next:
  %t = add i32 %x0, 2
  ret void
}
"#;

    fn setup() -> (Module, Vec<InstId>) {
        let module = Module::parse(PAIRS).unwrap();
        let insts = module.functions[0].block_insts(BlockId(0)).to_vec();
        (module, insts)
    }

    #[test]
    fn test_arithmetic_pairs_need_no_adjacency() {
        let (module, v) = setup();
        let func = &module.functions[0];
        assert!(should_vectorize(func, v[7], v[8]));
    }

    #[test]
    fn test_memory_pairs_need_adjacency() {
        let (module, v) = setup();
        let func = &module.functions[0];
        assert!(should_vectorize(func, v[3], v[4]));
        assert!(!should_vectorize(func, v[3], v[6]));
    }

    #[test]
    fn test_volatile_rejected_on_either_lane() {
        let (module, v) = setup();
        let func = &module.functions[0];
        assert!(!should_vectorize(func, v[3], v[5]));
        assert!(!should_vectorize(func, v[5], v[3]));
        // Adjacent and isomorphic stores, one of them volatile.
        assert!(!should_vectorize(func, v[13], v[14]));
    }

    #[test]
    fn test_excluded_and_structural_opcodes() {
        let (module, v) = setup();
        let func = &module.functions[0];
        // icmp
        assert!(!should_vectorize(func, v[11], v[12]));
        // getelementptr
        assert!(!should_vectorize(func, v[0], v[1]));
        // terminator
        assert!(!should_vectorize(func, v[7], v[15]));
    }

    #[test]
    fn test_lanes_must_share_a_block() {
        let (module, v) = setup();
        let func = &module.functions[0];
        let other = func.block_insts(BlockId(1))[0];
        assert!(!should_vectorize(func, v[7], other));
    }

    #[test]
    fn test_vector_lanes_rejected() {
        let module = Module::parse(
            r#"
define void @f(<2 x i32> %a, <2 x i32> %b, [2 x <2 x i32>]* %A) {
entry:
  %g0 = getelementptr [2 x <2 x i32>]* %A, i64 0, i64 0
  %g1 = getelementptr [2 x <2 x i32>]* %A, i64 0, i64 1
  %v0 = add <2 x i32> %a, %b
  %v1 = add <2 x i32> %b, %a
  store <2 x i32> %v0, <2 x i32>* %g0
  store <2 x i32> %v1, <2 x i32>* %g1
  ret void
}
"#,
        )
        .unwrap();
        let func = &module.functions[0];
        let v = func.block_insts(BlockId(0)).to_vec();
        assert!(!should_vectorize(func, v[2], v[3]));
        assert!(!should_vectorize(func, v[5], v[4]));
    }

    #[test]
    fn test_type_guard_is_asymmetric() {
        let (module, v) = setup();
        let func = &module.functions[0];
        // Only the first lane's result type is inspected.
        assert!(!should_vectorize(func, v[9], v[10]));
        assert!(should_vectorize(func, v[10], v[9]));
    }
}
