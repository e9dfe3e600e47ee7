//! Reverse use index.

use super::*;

/// Maps every instruction to the live instructions that use it as an operand.
///
/// The index is a snapshot: it is built once and is not updated when the
/// function is mutated afterwards.
#[derive(Debug, Default)]
pub struct UseIndex {
    users: HashMap<InstId, Vec<InstId>>,
}

impl UseIndex {
    pub fn build(func: &Function) -> Self {
        let mut users: HashMap<InstId, Vec<InstId>> = HashMap::new();
        for user in func.live_insts() {
            for op in &func.inst(user).operands {
                if let Value::Inst(def) = *op {
                    let list = users.entry(def).or_default();
                    if list.last() != Some(&user) {
                        list.push(user);
                    }
                }
            }
        }
        Self { users }
    }

    /// Users of `def`, each listed once, in program order.
    pub fn users(&self, def: InstId) -> &[InstId] {
        self.users.get(&def).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_users(&self, def: InstId) -> bool {
        !self.users(def).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_users_listed_once() {
        let module = Module::parse(
            r#"
define i32 @f(i32* %p) {
entry:
  %x = load i32, i32* %p
  %y = add i32 %x, %x
  %z = mul i32 %y, %x
  ret i32 %z
}
"#,
        )
        .unwrap();
        let func = &module.functions[0];
        let insts = func.block_insts(BlockId(0)).to_vec();
        let index = UseIndex::build(func);
        assert_eq!(index.users(insts[0]), &[insts[1], insts[2]]);
        assert_eq!(index.users(insts[2]), &[insts[3]]);
        assert!(!index.has_users(insts[3]));
    }
}
