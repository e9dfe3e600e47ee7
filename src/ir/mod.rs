//! Superword IR: a small typed SSA IR the vectorizer runs on.
//!
//! Functions own their instructions, blocks and constants in flat arenas and
//! hand out stable indices ([`InstId`], [`BlockId`], [`ConstId`]). Erasing an
//! instruction only unlinks it from its block, so ids held by analyses never
//! dangle. The textual format is LLVM flavoured:
//!
//! ```text
//! ; Comments start with semicolon
//! define void @add2(i32* %a, i32* %b) {
//! entry:
//!   %pa0 = getelementptr i32* %a, i64 0
//!   %x = load i32, i32* %pa0
//!   %y = add i32 %x, 1
//!   store i32 %y, i32* %pa0
//!   ret void
//! }
//! ```

use hashbrown::{HashMap, HashSet};

pub mod check;
pub mod opcode;
pub mod parser;
pub mod printer;
pub mod types;
pub mod uses;

pub use opcode::{OpInfo, Opcode, Predicate};
pub use types::{Type, TypeKind};
pub use uses::UseIndex;

use crate::core::error::IrResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstId(pub u32);

/// An SSA value: the result of an instruction, a uniqued constant, or a
/// function argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Inst(InstId),
    Const(ConstId),
    Arg(u32),
}

impl Value {
    pub fn as_inst(self) -> Option<InstId> {
        match self {
            Value::Inst(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_inst(self) -> bool {
        matches!(self, Value::Inst(_))
    }

    pub fn is_const(self) -> bool {
        matches!(self, Value::Const(_))
    }
}

impl From<InstId> for Value {
    fn from(id: InstId) -> Self {
        Value::Inst(id)
    }
}

/// Payload of a uniqued constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstKind {
    Int(i64),
    /// IEEE bits, widened to f64.
    Float(u64),
    Null,
    /// All-zero aggregate or vector.
    Zero,
    Vector(Vec<ConstId>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constant {
    pub ty: Type,
    pub kind: ConstKind,
}

impl Constant {
    pub fn as_int(&self) -> Option<i64> {
        match self.kind {
            ConstKind::Int(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    insts: Vec<InstId>,
}

impl Block {
    /// Live instructions in program order.
    pub fn insts(&self) -> &[InstId] {
        &self.insts
    }
}

/// One instruction. Opcode specific payload lives in the optional fields.
#[derive(Debug, Clone, PartialEq)]
pub struct InstData {
    pub opcode: Opcode,
    /// Result type; `void` for instructions that define nothing.
    pub ty: Type,
    pub operands: Vec<Value>,
    pub block: BlockId,
    pub name: Option<String>,
    pub volatile: bool,
    pub predicate: Option<Predicate>,
    /// Branch targets, or the incoming blocks of a phi (parallel to operands).
    pub targets: Vec<BlockId>,
    pub callee: Option<String>,
    /// Constant aggregate indices of extractvalue/insertvalue.
    pub indices: Vec<u32>,
    /// Fence ordering or atomicrmw operation keyword.
    pub attr: Option<String>,
    erased: bool,
}

impl InstData {
    pub fn new(opcode: Opcode, ty: Type, operands: Vec<Value>) -> Self {
        Self {
            opcode,
            ty,
            operands,
            block: BlockId(!0),
            name: None,
            volatile: false,
            predicate: None,
            targets: Vec::new(),
            callee: None,
            indices: Vec::new(),
            attr: None,
            erased: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_volatile(mut self, volatile: bool) -> Self {
        self.volatile = volatile;
        self
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_targets(mut self, targets: Vec<BlockId>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_callee(mut self, callee: impl Into<String>) -> Self {
        self.callee = Some(callee.into());
        self
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }

    pub fn with_attr(mut self, attr: impl Into<String>) -> Self {
        self.attr = Some(attr.into());
        self
    }

    pub fn is_erased(&self) -> bool {
        self.erased
    }

    pub fn is_terminator(&self) -> bool {
        self.opcode.is_terminator()
    }

    pub fn is_load(&self) -> bool {
        self.opcode == Opcode::Load
    }

    pub fn is_store(&self) -> bool {
        self.opcode == Opcode::Store
    }

    /// Address operand of a load or store.
    pub fn pointer_operand(&self) -> Option<Value> {
        match self.opcode {
            Opcode::Load => self.operands.first().copied(),
            Opcode::Store => self.operands.get(1).copied(),
            _ => None,
        }
    }
}

/// A function definition or declaration.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub ret_ty: Type,
    pub args: Vec<Argument>,
    pub declaration: bool,
    blocks: Vec<Block>,
    insts: Vec<InstData>,
    consts: Vec<Constant>,
    const_ids: HashMap<Constant, ConstId>,
    names: HashSet<String>,
    next_tmp: u32,
}

impl Function {
    pub fn new(name: impl Into<String>, ret_ty: Type, args: Vec<Argument>) -> Self {
        let names = args.iter().map(|a| a.name.clone()).collect();
        Self {
            name: name.into(),
            ret_ty,
            args,
            declaration: false,
            blocks: Vec::new(),
            insts: Vec::new(),
            consts: Vec::new(),
            const_ids: HashMap::new(),
            names,
            next_tmp: 0,
        }
    }

    pub fn declare(name: impl Into<String>, ret_ty: Type, args: Vec<Argument>) -> Self {
        let mut func = Self::new(name, ret_ty, args);
        func.declaration = true;
        func
    }

    // ---- blocks -------------------------------------------------------

    pub fn add_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block { name: name.into(), insts: Vec::new() });
        id
    }

    /// Blocks in layout order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len() as u32).map(BlockId)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, block: BlockId) -> &Block {
        &self.blocks[block.0 as usize]
    }

    pub fn block_name(&self, block: BlockId) -> &str {
        &self.blocks[block.0 as usize].name
    }

    pub fn find_block(&self, name: &str) -> Option<BlockId> {
        self.blocks.iter().position(|b| b.name == name).map(|i| BlockId(i as u32))
    }

    pub fn entry_block(&self) -> Option<BlockId> {
        if self.blocks.is_empty() {
            None
        } else {
            Some(BlockId(0))
        }
    }

    pub fn block_insts(&self, block: BlockId) -> &[InstId] {
        &self.blocks[block.0 as usize].insts
    }

    /// Successors named by the block's terminator.
    pub fn successors(&self, block: BlockId) -> Vec<BlockId> {
        match self.block_insts(block).last() {
            Some(&last) if self.inst(last).is_terminator() => self.inst(last).targets.clone(),
            _ => Vec::new(),
        }
    }

    // ---- instructions -------------------------------------------------

    pub fn inst(&self, id: InstId) -> &InstData {
        &self.insts[id.0 as usize]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut InstData {
        &mut self.insts[id.0 as usize]
    }

    pub fn is_live(&self, id: InstId) -> bool {
        !self.insts[id.0 as usize].erased
    }

    /// Live instructions of every block, in layout order.
    pub fn live_insts(&self) -> impl Iterator<Item = InstId> + '_ {
        self.blocks.iter().flat_map(|b| b.insts.iter().copied())
    }

    pub fn operand(&self, id: InstId, idx: usize) -> Option<Value> {
        self.inst(id).operands.get(idx).copied()
    }

    pub fn num_operands(&self, id: InstId) -> usize {
        self.inst(id).operands.len()
    }

    pub fn parent(&self, id: InstId) -> BlockId {
        self.inst(id).block
    }

    /// Index of a live instruction inside its block.
    pub fn position(&self, id: InstId) -> Option<usize> {
        let block = self.inst(id).block;
        self.blocks
            .get(block.0 as usize)?
            .insts
            .iter()
            .position(|&i| i == id)
    }

    pub fn prev_inst(&self, id: InstId) -> Option<InstId> {
        let pos = self.position(id)?;
        let insts = self.block_insts(self.parent(id));
        pos.checked_sub(1).map(|p| insts[p])
    }

    pub fn next_inst(&self, id: InstId) -> Option<InstId> {
        let pos = self.position(id)?;
        self.block_insts(self.parent(id)).get(pos + 1).copied()
    }

    fn push_inst(&mut self, block: BlockId, mut data: InstData) -> InstId {
        let id = InstId(self.insts.len() as u32);
        data.block = block;
        data.erased = false;
        if let Some(name) = &data.name {
            self.names.insert(name.clone());
        }
        self.insts.push(data);
        id
    }

    /// Append at the end of `block`.
    pub fn append(&mut self, block: BlockId, data: InstData) -> InstId {
        let id = self.push_inst(block, data);
        self.blocks[block.0 as usize].insts.push(id);
        id
    }

    /// Create an instruction immediately before `pos` in the same block.
    pub fn insert_before(&mut self, pos: InstId, data: InstData) -> InstId {
        let block = self.parent(pos);
        let idx = self.position(pos).unwrap_or(self.block_insts(block).len());
        let id = self.push_inst(block, data);
        self.blocks[block.0 as usize].insts.insert(idx, id);
        id
    }

    /// Unlink an instruction from its block. The id stays valid.
    pub fn erase(&mut self, id: InstId) {
        if let Some(pos) = self.position(id) {
            let block = self.parent(id);
            self.blocks[block.0 as usize].insts.remove(pos);
        }
        self.insts[id.0 as usize].erased = true;
    }

    /// Rewrite every operand of `user` equal to `old`. Returns the number of
    /// operands changed.
    pub fn replace_uses_in(&mut self, user: InstId, old: Value, new: Value) -> usize {
        let mut changed = 0;
        for op in self.insts[user.0 as usize].operands.iter_mut() {
            if *op == old {
                *op = new;
                changed += 1;
            }
        }
        changed
    }

    /// Generate a name with the given prefix that is unused in this function.
    pub fn fresh_name(&mut self, prefix: &str) -> String {
        loop {
            let name = format!("{}{}", prefix, self.next_tmp);
            self.next_tmp += 1;
            if !self.names.contains(&name) {
                return name;
            }
        }
    }

    // ---- values and constants -----------------------------------------

    pub fn value_type(&self, value: Value) -> &Type {
        match value {
            Value::Inst(id) => &self.inst(id).ty,
            Value::Const(id) => &self.constant(id).ty,
            Value::Arg(idx) => &self.args[idx as usize].ty,
        }
    }

    pub fn constant(&self, id: ConstId) -> &Constant {
        &self.consts[id.0 as usize]
    }

    /// Constant behind a value, if it is one.
    pub fn as_constant(&self, value: Value) -> Option<&Constant> {
        match value {
            Value::Const(id) => Some(self.constant(id)),
            _ => None,
        }
    }

    /// Integer value of a constant integer operand.
    pub fn const_int_value(&self, value: Value) -> Option<i64> {
        self.as_constant(value).and_then(Constant::as_int)
    }

    pub fn intern(&mut self, constant: Constant) -> ConstId {
        if let Some(&id) = self.const_ids.get(&constant) {
            return id;
        }
        let id = ConstId(self.consts.len() as u32);
        self.consts.push(constant.clone());
        self.const_ids.insert(constant, id);
        id
    }

    pub fn const_int(&mut self, ty: Type, value: i64) -> Value {
        Value::Const(self.intern(Constant { ty, kind: ConstKind::Int(value) }))
    }

    pub fn const_float(&mut self, ty: Type, value: f64) -> Value {
        let bits = value.to_bits();
        Value::Const(self.intern(Constant { ty, kind: ConstKind::Float(bits) }))
    }

    pub fn const_null(&mut self, ty: Type) -> Value {
        Value::Const(self.intern(Constant { ty, kind: ConstKind::Null }))
    }

    /// The all-zero value of `ty`.
    pub fn const_zero(&mut self, ty: Type) -> Value {
        Value::Const(self.intern(Constant { ty, kind: ConstKind::Zero }))
    }

    /// Constant vector of the given lanes, or `None` when a lane is not a
    /// constant or the lane types disagree.
    pub fn const_vector(&mut self, lanes: &[Value]) -> Option<Value> {
        let first = *lanes.first()?;
        let elem_ty = self.value_type(first).clone();
        let mut ids = Vec::with_capacity(lanes.len());
        for &lane in lanes {
            match lane {
                Value::Const(id) if self.constant(id).ty == elem_ty => ids.push(id),
                _ => return None,
            }
        }
        let ty = Type::vector_of(elem_ty, lanes.len() as u32);
        Some(Value::Const(self.intern(Constant { ty, kind: ConstKind::Vector(ids) })))
    }
}

/// A module: an ordered list of functions.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> IrResult<Self> {
        parser::parse_module(text)
    }

    pub fn add_function(&mut self, func: Function) -> usize {
        self.functions.push(func);
        self.functions.len() - 1
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> (Function, BlockId) {
        let mut func = Function::new(
            "f",
            Type::Void,
            vec![Argument { name: "p".into(), ty: Type::ptr_to(Type::i32()) }],
        );
        let entry = func.add_block("entry");
        (func, entry)
    }

    #[test]
    fn test_constants_are_uniqued() {
        let (mut func, _) = scratch();
        let a = func.const_int(Type::i32(), 7);
        let b = func.const_int(Type::i32(), 7);
        let c = func.const_int(Type::i64(), 7);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(func.const_int_value(a), Some(7));
    }

    #[test]
    fn test_const_vector_requires_constant_lanes() {
        let (mut func, entry) = scratch();
        let one = func.const_int(Type::i32(), 1);
        let two = func.const_int(Type::i32(), 2);
        let vec = func.const_vector(&[one, two]).unwrap();
        assert_eq!(func.value_type(vec), &Type::vector_of(Type::i32(), 2));

        let load = func.append(
            entry,
            InstData::new(Opcode::Load, Type::i32(), vec![Value::Arg(0)]).named("x"),
        );
        assert!(func.const_vector(&[one, Value::Inst(load)]).is_none());
    }

    #[test]
    fn test_insert_and_erase_keep_order() {
        let (mut func, entry) = scratch();
        let a = func.append(entry, InstData::new(Opcode::Load, Type::i32(), vec![Value::Arg(0)]));
        let c = func.append(entry, InstData::new(Opcode::Ret, Type::Void, vec![]));
        let b = func.insert_before(c, InstData::new(Opcode::Add, Type::i32(), vec![a.into(), a.into()]));
        assert_eq!(func.block_insts(entry), &[a, b, c]);
        assert_eq!(func.prev_inst(b), Some(a));
        assert_eq!(func.next_inst(b), Some(c));

        let d = func.insert_before(b, InstData::new(Opcode::Add, Type::i32(), vec![a.into(), a.into()]));
        assert_eq!(func.block_insts(entry), &[a, d, b, c]);

        func.erase(d);
        assert!(!func.is_live(d));
        assert_eq!(func.block_insts(entry), &[a, b, c]);
        assert_eq!(func.position(d), None);
    }

    #[test]
    fn test_replace_uses_in_one_user() {
        let (mut func, entry) = scratch();
        let a = func.append(entry, InstData::new(Opcode::Load, Type::i32(), vec![Value::Arg(0)]));
        let b = func.append(entry, InstData::new(Opcode::Load, Type::i32(), vec![Value::Arg(0)]));
        let c = func.append(entry, InstData::new(Opcode::Add, Type::i32(), vec![a.into(), a.into()]));
        let d = func.append(entry, InstData::new(Opcode::Add, Type::i32(), vec![a.into(), b.into()]));
        assert_eq!(func.replace_uses_in(c, a.into(), b.into()), 2);
        assert_eq!(func.inst(c).operands, vec![Value::Inst(b), Value::Inst(b)]);
        assert_eq!(func.inst(d).operands, vec![Value::Inst(a), Value::Inst(b)]);
    }

    #[test]
    fn test_fresh_names_avoid_existing() {
        let (mut func, entry) = scratch();
        func.append(
            entry,
            InstData::new(Opcode::Load, Type::i32(), vec![Value::Arg(0)]).named("v.ie0"),
        );
        assert_eq!(func.fresh_name("v.ie"), "v.ie1");
        assert_eq!(func.fresh_name("v.ie"), "v.ie2");
    }
}
