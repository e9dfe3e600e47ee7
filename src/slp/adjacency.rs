//! Unit-stride adjacency of memory accesses.

use crate::ir::{Function, InstId, Opcode, Value};

/// Whether two stores write neighbouring elements of the same base.
pub fn adjacent_stores(func: &Function, i: InstId, j: InstId) -> bool {
    func.inst(i).is_store()
        && func.inst(j).is_store()
        && adjacent_addresses(func, func.operand(i, 1), func.operand(j, 1))
}

/// Whether two loads read neighbouring elements of the same base.
pub fn adjacent_loads(func: &Function, i: InstId, j: InstId) -> bool {
    func.inst(i).is_load()
        && func.inst(j).is_load()
        && adjacent_addresses(func, func.operand(i, 0), func.operand(j, 0))
}

/// Both addresses come from getelementptr instructions over the same base with
/// identical indices except the last, and the last indices are integer
/// constants exactly one apart (in either direction).
fn adjacent_addresses(func: &Function, a: Option<Value>, b: Option<Value>) -> bool {
    let (Some(gep_a), Some(gep_b)) = (address_computation(func, a), address_computation(func, b)) else {
        return false;
    };
    let (ops_a, ops_b) = (&func.inst(gep_a).operands, &func.inst(gep_b).operands);
    if ops_a.len() < 2 || ops_a.len() != ops_b.len() {
        return false;
    }

    let last = ops_a.len() - 1;
    if ops_a[..last] != ops_b[..last] {
        return false;
    }

    match (func.const_int_value(ops_a[last]), func.const_int_value(ops_b[last])) {
        (Some(x), Some(y)) => matches!(x.checked_sub(y), Some(1) | Some(-1)),
        _ => false,
    }
}

fn address_computation(func: &Function, value: Option<Value>) -> Option<InstId> {
    let id = value?.as_inst()?;
    (func.inst(id).opcode == Opcode::GetElementPtr).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BlockId, Module};

    const ACCESSES: &str = r#"
define void @f([8 x i32]* %A, [8 x i32]* %B, i32* %p, i64 %n) {
entry:
  %a0 = getelementptr [8 x i32]* %A, i64 0, i64 0
  %a1 = getelementptr [8 x i32]* %A, i64 0, i64 1
  %a2 = getelementptr [8 x i32]* %A, i64 0, i64 2
  %b1 = getelementptr [8 x i32]* %B, i64 0, i64 1
  %an = getelementptr [8 x i32]* %A, i64 0, i64 %n
  %an1 = getelementptr [8 x i32]* %A, i64 %n, i64 1
  store i32 1, i32* %a0
  store i32 2, i32* %a1
  store i32 3, i32* %a2
  store i32 4, i32* %b1
  store i32 5, i32* %an
  store i32 6, i32* %an1
  store i32 7, i32* %p
  %l0 = load i32, i32* %a0
  %l1 = load i32, i32* %a1
  ret void
}
"#;

    #[test]
    fn test_store_adjacency() {
        let module = Module::parse(ACCESSES).unwrap();
        let func = &module.functions[0];
        let s = &func.block_insts(BlockId(0))[6..13];

        assert!(adjacent_stores(func, s[0], s[1]));
        assert!(adjacent_stores(func, s[1], s[0]));
        assert!(adjacent_stores(func, s[1], s[2]));
        // Stride two.
        assert!(!adjacent_stores(func, s[0], s[2]));
        // Different base.
        assert!(!adjacent_stores(func, s[0], s[3]));
        // Non-constant last index.
        assert!(!adjacent_stores(func, s[0], s[4]));
        // Prefix index differs.
        assert!(!adjacent_stores(func, s[0], s[5]));
        // Address is not an address computation.
        assert!(!adjacent_stores(func, s[0], s[6]));
    }

    #[test]
    fn test_load_adjacency_and_mixed_kinds() {
        let module = Module::parse(ACCESSES).unwrap();
        let func = &module.functions[0];
        let insts = func.block_insts(BlockId(0));
        let (store0, load0, load1) = (insts[6], insts[13], insts[14]);

        assert!(adjacent_loads(func, load0, load1));
        assert!(!adjacent_loads(func, load0, store0));
        assert!(!adjacent_stores(func, store0, load1));
    }
}
