// This module defines the opcode set of the superword IR together with a static
// OpInfo table describing each opcode: its textual name, whether it terminates a
// block, whether it produces a value, and its fixed operand count (!0 for variadic
// opcodes such as call, phi and getelementptr). The table drives both the parser,
// which looks opcodes up by name, and the vectorizer, which classifies instructions
// through the helper predicates (binary, cast, compare) instead of open-coded matches.

//! Opcodes and static opcode information.

/// Instruction opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Terminators
    Ret,
    Br,
    Unreachable,
    // Binary arithmetic and logic
    Add,
    FAdd,
    Sub,
    FSub,
    Mul,
    FMul,
    UDiv,
    SDiv,
    FDiv,
    URem,
    SRem,
    FRem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
    // Memory
    Alloca,
    Load,
    Store,
    GetElementPtr,
    Fence,
    AtomicCmpXchg,
    AtomicRMW,
    // Casts
    Trunc,
    ZExt,
    SExt,
    FPToUI,
    FPToSI,
    UIToFP,
    SIToFP,
    FPTrunc,
    FPExt,
    PtrToInt,
    IntToPtr,
    BitCast,
    AddrSpaceCast,
    // Other
    ICmp,
    FCmp,
    Phi,
    Call,
    Select,
    ExtractElement,
    InsertElement,
    ExtractValue,
    InsertValue,
}

/// Static information about an opcode.
#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub name: &'static str,
    pub is_terminator: bool,
    pub is_def: bool,
    pub op_count: u32,
}

const fn info(name: &'static str, is_terminator: bool, is_def: bool, op_count: u32) -> OpInfo {
    OpInfo { name, is_terminator, is_def, op_count }
}

impl Opcode {
    pub const ALL: &'static [Opcode] = &[
        Opcode::Ret,
        Opcode::Br,
        Opcode::Unreachable,
        Opcode::Add,
        Opcode::FAdd,
        Opcode::Sub,
        Opcode::FSub,
        Opcode::Mul,
        Opcode::FMul,
        Opcode::UDiv,
        Opcode::SDiv,
        Opcode::FDiv,
        Opcode::URem,
        Opcode::SRem,
        Opcode::FRem,
        Opcode::Shl,
        Opcode::LShr,
        Opcode::AShr,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Alloca,
        Opcode::Load,
        Opcode::Store,
        Opcode::GetElementPtr,
        Opcode::Fence,
        Opcode::AtomicCmpXchg,
        Opcode::AtomicRMW,
        Opcode::Trunc,
        Opcode::ZExt,
        Opcode::SExt,
        Opcode::FPToUI,
        Opcode::FPToSI,
        Opcode::UIToFP,
        Opcode::SIToFP,
        Opcode::FPTrunc,
        Opcode::FPExt,
        Opcode::PtrToInt,
        Opcode::IntToPtr,
        Opcode::BitCast,
        Opcode::AddrSpaceCast,
        Opcode::ICmp,
        Opcode::FCmp,
        Opcode::Phi,
        Opcode::Call,
        Opcode::Select,
        Opcode::ExtractElement,
        Opcode::InsertElement,
        Opcode::ExtractValue,
        Opcode::InsertValue,
    ];

    pub const fn info(self) -> OpInfo {
        use Opcode::*;
        match self {
            Ret => info("ret", true, false, !0),
            Br => info("br", true, false, !0),
            Unreachable => info("unreachable", true, false, 0),
            Add => info("add", false, true, 2),
            FAdd => info("fadd", false, true, 2),
            Sub => info("sub", false, true, 2),
            FSub => info("fsub", false, true, 2),
            Mul => info("mul", false, true, 2),
            FMul => info("fmul", false, true, 2),
            UDiv => info("udiv", false, true, 2),
            SDiv => info("sdiv", false, true, 2),
            FDiv => info("fdiv", false, true, 2),
            URem => info("urem", false, true, 2),
            SRem => info("srem", false, true, 2),
            FRem => info("frem", false, true, 2),
            Shl => info("shl", false, true, 2),
            LShr => info("lshr", false, true, 2),
            AShr => info("ashr", false, true, 2),
            And => info("and", false, true, 2),
            Or => info("or", false, true, 2),
            Xor => info("xor", false, true, 2),
            Alloca => info("alloca", false, true, 0),
            Load => info("load", false, true, 1),
            Store => info("store", false, false, 2),
            GetElementPtr => info("getelementptr", false, true, !0),
            Fence => info("fence", false, false, 0),
            AtomicCmpXchg => info("cmpxchg", false, true, 3),
            AtomicRMW => info("atomicrmw", false, true, 2),
            Trunc => info("trunc", false, true, 1),
            ZExt => info("zext", false, true, 1),
            SExt => info("sext", false, true, 1),
            FPToUI => info("fptoui", false, true, 1),
            FPToSI => info("fptosi", false, true, 1),
            UIToFP => info("uitofp", false, true, 1),
            SIToFP => info("sitofp", false, true, 1),
            FPTrunc => info("fptrunc", false, true, 1),
            FPExt => info("fpext", false, true, 1),
            PtrToInt => info("ptrtoint", false, true, 1),
            IntToPtr => info("inttoptr", false, true, 1),
            BitCast => info("bitcast", false, true, 1),
            AddrSpaceCast => info("addrspacecast", false, true, 1),
            ICmp => info("icmp", false, true, 2),
            FCmp => info("fcmp", false, true, 2),
            Phi => info("phi", false, true, !0),
            Call => info("call", false, true, !0),
            Select => info("select", false, true, 3),
            ExtractElement => info("extractelement", false, true, 2),
            InsertElement => info("insertelement", false, true, 3),
            ExtractValue => info("extractvalue", false, true, 1),
            InsertValue => info("insertvalue", false, true, 2),
        }
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == s)
    }

    pub fn is_terminator(self) -> bool {
        self.info().is_terminator
    }

    /// Two-operand arithmetic or logic with a 1:1 vector form.
    pub fn is_binary(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Add | FAdd
                | Sub
                | FSub
                | Mul
                | FMul
                | UDiv
                | SDiv
                | FDiv
                | URem
                | SRem
                | FRem
                | Shl
                | LShr
                | AShr
                | And
                | Or
                | Xor
        )
    }

    /// Single-operand conversion written `op <ty> %v to <ty>`.
    pub fn is_cast(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Trunc
                | ZExt
                | SExt
                | FPToUI
                | FPToSI
                | UIToFP
                | SIToFP
                | FPTrunc
                | FPExt
                | PtrToInt
                | IntToPtr
                | BitCast
                | AddrSpaceCast
        )
    }

    pub fn is_compare(self) -> bool {
        matches!(self, Opcode::ICmp | Opcode::FCmp)
    }
}

/// Comparison predicate of `icmp` and `fcmp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
    False,
    Oeq,
    Ogt,
    Oge,
    Olt,
    Ole,
    One,
    Ord,
    Uno,
    Ueq,
    Une,
    True,
}

impl Predicate {
    const NAMES: &'static [(Predicate, &'static str)] = &[
        (Predicate::Eq, "eq"),
        (Predicate::Ne, "ne"),
        (Predicate::Ugt, "ugt"),
        (Predicate::Uge, "uge"),
        (Predicate::Ult, "ult"),
        (Predicate::Ule, "ule"),
        (Predicate::Sgt, "sgt"),
        (Predicate::Sge, "sge"),
        (Predicate::Slt, "slt"),
        (Predicate::Sle, "sle"),
        (Predicate::False, "false"),
        (Predicate::Oeq, "oeq"),
        (Predicate::Ogt, "ogt"),
        (Predicate::Oge, "oge"),
        (Predicate::Olt, "olt"),
        (Predicate::Ole, "ole"),
        (Predicate::One, "one"),
        (Predicate::Ord, "ord"),
        (Predicate::Uno, "uno"),
        (Predicate::Ueq, "ueq"),
        (Predicate::Une, "une"),
        (Predicate::True, "true"),
    ];

    pub fn name(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(p, _)| *p == self)
            .map(|(_, n)| *n)
            .unwrap_or("?")
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::NAMES.iter().find(|(_, n)| *n == s).map(|(p, _)| *p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrips_every_name() {
        for &op in Opcode::ALL {
            assert_eq!(Opcode::parse(op.name()), Some(op), "{}", op.name());
        }
        assert_eq!(Opcode::parse("frobnicate"), None);
    }

    #[test]
    fn test_classification() {
        assert!(Opcode::FMul.is_binary());
        assert!(!Opcode::ICmp.is_binary());
        assert!(Opcode::AddrSpaceCast.is_cast());
        assert!(Opcode::Br.is_terminator());
        assert!(!Opcode::Store.info().is_def);
    }

    #[test]
    fn test_predicate_names() {
        assert_eq!(Predicate::parse("slt"), Some(Predicate::Slt));
        assert_eq!(Predicate::Olt.name(), "olt");
        assert_eq!(Predicate::parse("lt"), None);
    }
}
