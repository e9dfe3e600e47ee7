//! Textual output for the superword IR.
//!
//! The printer emits the same syntax the parser reads, so a module printed
//! after the pass can be fed back into the tool.

use std::fmt;

use super::*;

/// Displays a single instruction, without indentation.
pub struct InstDisplay<'f> {
    func: &'f Function,
    id: InstId,
}

/// Displays a value as an operand (`%name` or a literal).
pub struct ValueDisplay<'f> {
    func: &'f Function,
    value: Value,
}

impl Function {
    pub fn display_inst(&self, id: InstId) -> InstDisplay<'_> {
        InstDisplay { func: self, id }
    }

    pub fn display_value(&self, value: Value) -> ValueDisplay<'_> {
        ValueDisplay { func: self, value }
    }

    /// `<ty> <value>` as it appears in operand lists.
    fn typed(&self, value: Value) -> String {
        format!("{} {}", self.value_type(value), self.display_value(value))
    }

    fn fmt_constant(&self, f: &mut fmt::Formatter<'_>, id: ConstId) -> fmt::Result {
        let constant = self.constant(id);
        match &constant.kind {
            ConstKind::Int(v) => write!(f, "{}", v),
            ConstKind::Float(bits) => {
                let v = f64::from_bits(*bits);
                if v.is_finite() {
                    write!(f, "{:?}", v)
                } else {
                    write!(f, "0x{:016X}", bits)
                }
            }
            ConstKind::Null => write!(f, "null"),
            ConstKind::Zero => write!(f, "zeroinitializer"),
            ConstKind::Vector(lanes) => {
                write!(f, "<")?;
                for (i, &lane) in lanes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} ", self.constant(lane).ty)?;
                    self.fmt_constant(f, lane)?;
                }
                write!(f, ">")
            }
        }
    }
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Inst(id) => match &self.func.inst(id).name {
                Some(name) => write!(f, "%{}", name),
                None => write!(f, "%t{}", id.0),
            },
            Value::Arg(idx) => write!(f, "%{}", self.func.args[idx as usize].name),
            Value::Const(id) => self.func.fmt_constant(f, id),
        }
    }
}

impl fmt::Display for InstDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Opcode::*;

        let func = self.func;
        let inst = func.inst(self.id);
        let ops = &inst.operands;
        let val = |i: usize| func.display_value(ops[i]);
        let typed = |i: usize| func.typed(ops[i]);
        let label = |b: BlockId| format!("label %{}", func.block_name(b));

        if inst.opcode.info().is_def && !inst.ty.is_void() {
            write!(f, "{} = ", func.display_value(Value::Inst(self.id)))?;
        }
        let name = inst.opcode.name();

        match inst.opcode {
            Ret if ops.is_empty() => write!(f, "ret void"),
            Ret => write!(f, "ret {}", typed(0)),
            Br if ops.is_empty() => write!(f, "br {}", label(inst.targets[0])),
            Br => write!(
                f,
                "br {}, {}, {}",
                typed(0),
                label(inst.targets[0]),
                label(inst.targets[1])
            ),
            Unreachable => write!(f, "unreachable"),
            op if op.is_binary() => write!(f, "{} {} {}, {}", name, inst.ty, val(0), val(1)),
            Alloca => {
                let pointee = inst.ty.pointee().unwrap_or(&inst.ty);
                write!(f, "alloca {}", pointee)
            }
            Load => {
                let volatile = if inst.volatile { "volatile " } else { "" };
                write!(f, "load {}{}, {}", volatile, inst.ty, typed(0))
            }
            Store => {
                let volatile = if inst.volatile { "volatile " } else { "" };
                write!(f, "store {}{}, {}", volatile, typed(0), typed(1))
            }
            GetElementPtr => {
                let operands: Vec<String> = (0..ops.len()).map(typed).collect();
                write!(f, "getelementptr {}", operands.join(", "))
            }
            Fence => write!(f, "fence {}", inst.attr.as_deref().unwrap_or("seq_cst")),
            AtomicCmpXchg => {
                write!(f, "cmpxchg {}, {}, {}", typed(0), typed(1), typed(2))?;
                match &inst.attr {
                    Some(orderings) => write!(f, " {}", orderings),
                    None => Ok(()),
                }
            }
            AtomicRMW => {
                let attr = inst.attr.as_deref().unwrap_or("xchg");
                let (op, orderings) = attr.split_once(' ').unwrap_or((attr, ""));
                write!(f, "atomicrmw {} {}, {}", op, typed(0), typed(1))?;
                if !orderings.is_empty() {
                    write!(f, " {}", orderings)?;
                }
                Ok(())
            }
            op if op.is_cast() => write!(f, "{} {} to {}", name, typed(0), inst.ty),
            op if op.is_compare() => {
                let pred = inst.predicate.map(Predicate::name).unwrap_or("?");
                write!(
                    f,
                    "{} {} {} {}, {}",
                    name,
                    pred,
                    func.value_type(ops[0]),
                    val(0),
                    val(1)
                )
            }
            Phi => {
                write!(f, "phi {} ", inst.ty)?;
                for (i, &block) in inst.targets.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[ {}, %{} ]", val(i), func.block_name(block))?;
                }
                Ok(())
            }
            Call => {
                let args: Vec<String> = (0..ops.len()).map(typed).collect();
                write!(
                    f,
                    "call {} @{}({})",
                    inst.ty,
                    inst.callee.as_deref().unwrap_or(""),
                    args.join(", ")
                )
            }
            Select => write!(f, "select {}, {}, {}", typed(0), typed(1), typed(2)),
            ExtractElement => write!(f, "extractelement {}, {}", typed(0), typed(1)),
            InsertElement => write!(f, "insertelement {}, {}, {}", typed(0), typed(1), typed(2)),
            ExtractValue | InsertValue => {
                let operands: Vec<String> = (0..ops.len()).map(typed).collect();
                let indices: Vec<String> = inst.indices.iter().map(u32::to_string).collect();
                write!(f, "{} {}, {}", name, operands.join(", "), indices.join(", "))
            }
            op => write!(f, "{}", op.name()),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = if self.declaration { "declare" } else { "define" };
        write!(f, "{} {} @{}(", keyword, self.ret_ty, self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if arg.name.is_empty() {
                write!(f, "{}", arg.ty)?;
            } else {
                write!(f, "{} %{}", arg.ty, arg.name)?;
            }
        }
        write!(f, ")")?;
        if self.declaration {
            return writeln!(f);
        }

        writeln!(f, " {{")?;
        for (i, block) in self.blocks().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", self.block_name(block))?;
            for &inst in self.block_insts(block) {
                writeln!(f, "  {}", self.display_inst(inst))?;
            }
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, func) in self.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", func)?;
        }
        Ok(())
    }
}
