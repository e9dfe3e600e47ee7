//! Structural equality of instructions.

use crate::ir::{Function, Value};

/// Whether `a` and `b` are instructions of the same shape.
///
/// Both must be instructions with the same opcode, result type and operand
/// count. Where the two operands at one position are both instructions from
/// the same block their types must agree too; constants, arguments and
/// operands defined in different blocks are not compared here.
pub fn isomorphic(func: &Function, a: Value, b: Value) -> bool {
    let (Value::Inst(a), Value::Inst(b)) = (a, b) else {
        return false;
    };
    let (inst_a, inst_b) = (func.inst(a), func.inst(b));
    if inst_a.opcode != inst_b.opcode
        || inst_a.ty != inst_b.ty
        || inst_a.operands.len() != inst_b.operands.len()
    {
        return false;
    }

    inst_a
        .operands
        .iter()
        .zip(&inst_b.operands)
        .all(|(&x, &y)| match (x, y) {
            (Value::Inst(x), Value::Inst(y)) if func.parent(x) == func.parent(y) => {
                func.inst(x).ty == func.inst(y).ty
            }
            _ => true,
        })
}
