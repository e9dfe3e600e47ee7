//! Superword IR text parser.

use super::*;
use crate::core::error::{IrError, IrResult};

pub fn parse_module(text: &str) -> IrResult<Module> {
    let parser = Parser::new(text);
    parser.parse()
}

/// Placeholder for operands naming a value defined later in the function.
const UNRESOLVED: Value = Value::Arg(u32::MAX);
const UNRESOLVED_BLOCK: BlockId = BlockId(u32::MAX);

/// Keywords that may precede the type of a binary instruction.
const BINARY_FLAGS: &[&str] = &["nsw", "nuw", "exact", "fast", "nnan", "ninf", "nsz", "arcp", "contract", "reassoc"];

enum Operand<'a> {
    Ready(Value),
    Named { name: &'a str, line: usize },
}

#[derive(Debug)]
struct Resolve<'a> {
    name: &'a str,
    inst: InstId,
    slot: usize,
    line: usize,
}

/// One instruction as read from the text, before its operands are bound.
struct Parsed<'a> {
    data: InstData,
    operands: Vec<(Operand<'a>, Type)>,
    targets: Vec<(&'a str, usize)>,
}

impl<'a> Parsed<'a> {
    fn new(data: InstData) -> Self {
        Self { data, operands: Vec::new(), targets: Vec::new() }
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    module: Module,

    // Global maps
    funcs: HashMap<&'a str, usize>,
    func_resolves: Vec<(&'a str, usize)>,

    // Per-function state
    func: Function,
    values: HashMap<&'a str, Value>,
    blocks: HashMap<&'a str, BlockId>,
    value_resolves: Vec<(Resolve<'a>, Type)>,
    block_resolves: Vec<Resolve<'a>>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            module: Module::new(),
            funcs: HashMap::new(),
            func_resolves: Vec::new(),
            func: Function::new("", Type::Void, Vec::new()),
            values: HashMap::new(),
            blocks: HashMap::new(),
            value_resolves: Vec::new(),
            block_resolves: Vec::new(),
        }
    }

    fn parse(mut self) -> IrResult<Module> {
        self.skip_whitespace(true);

        while !self.is_eof() {
            let keyword = self.read_identifier()?;
            match keyword {
                "define" => self.parse_function(false)?,
                "declare" => self.parse_function(true)?,
                other => {
                    return Err(self.error(format!(
                        "expected 'define' or 'declare' but found '{}'",
                        other
                    )))
                }
            }
            self.skip_whitespace(true);
        }

        self.resolve_all_references()?;

        Ok(self.module)
    }

    // ---- cursor -------------------------------------------------------

    fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn current_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn line(&self) -> usize {
        self.text[..self.pos].matches('\n').count() + 1
    }

    fn error(&self, message: impl Into<String>) -> IrError {
        IrError::Parse { line: self.line(), message: message.into() }
    }

    fn skip_whitespace(&mut self, skip_newlines: bool) {
        while let Some(ch) = self.current_char() {
            if ch == ';' {
                // Skip comment line
                while let Some(ch) = self.current_char() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else if ch.is_whitespace() {
                if ch == '\n' && !skip_newlines {
                    break;
                }
                self.advance();
            } else {
                break;
            }
        }
    }

    fn is_at_line_end(&self) -> bool {
        for ch in self.text[self.pos..].chars() {
            match ch {
                '\n' | ';' => return true,
                ' ' | '\t' | '\r' => continue,
                _ => return false,
            }
        }
        true
    }

    fn try_read(&mut self, ch: char) -> bool {
        self.skip_whitespace(true);
        if self.current_char() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> IrResult<()> {
        if !self.try_read(ch) {
            return Err(self.error(format!(
                "expected '{}' but found {:?}",
                ch,
                self.current_char()
            )));
        }
        Ok(())
    }

    /// Keyword or opcode: starts with a letter.
    fn read_identifier(&mut self) -> IrResult<&'a str> {
        self.skip_whitespace(true);
        match self.current_char() {
            Some(ch) if ch.is_ascii_alphabetic() => {}
            Some(ch) => return Err(self.error(format!("expected identifier but found '{}'", ch))),
            None => return Err(self.error("expected identifier but found end of input")),
        }
        self.read_name()
    }

    /// Value, block or function name: may start with a digit.
    fn read_name(&mut self) -> IrResult<&'a str> {
        let start = self.pos;
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                self.advance();
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(self.error("expected a name"));
        }
        Ok(&self.text[start..self.pos])
    }

    fn try_keyword(&mut self, keyword: &str) -> bool {
        let saved_pos = self.pos;
        match self.read_identifier() {
            Ok(word) if word == keyword => true,
            _ => {
                self.pos = saved_pos;
                false
            }
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> IrResult<()> {
        if !self.try_keyword(keyword) {
            return Err(self.error(format!("expected '{}'", keyword)));
        }
        Ok(())
    }

    fn read_number(&mut self) -> IrResult<u64> {
        self.skip_whitespace(true);
        let start = self.pos;
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(self.error("expected number"));
        }
        self.text[start..self.pos]
            .parse()
            .map_err(|e| self.error(format!("failed to parse number: {}", e)))
    }

    /// Skip a trailing `, align N`.
    fn skip_align(&mut self) -> IrResult<()> {
        let saved_pos = self.pos;
        if self.try_read(',') && self.try_keyword("align") {
            self.read_number()?;
        } else {
            self.pos = saved_pos;
        }
        Ok(())
    }

    /// Remaining keywords on the current line (atomic orderings).
    fn read_line_keywords(&mut self) -> IrResult<Vec<&'a str>> {
        let mut words = Vec::new();
        while !self.is_at_line_end() {
            words.push(self.read_identifier()?);
        }
        Ok(words)
    }

    // ---- types and values ---------------------------------------------

    fn parse_type(&mut self) -> IrResult<Type> {
        self.skip_whitespace(true);
        let mut ty = match self.current_char() {
            Some('<') => {
                self.advance();
                let lanes = self.read_number()?;
                if lanes == 0 || lanes > u64::from(u32::MAX) {
                    return Err(self.error(format!("invalid vector length {}", lanes)));
                }
                self.expect_keyword("x")?;
                let elem = self.parse_type()?;
                if elem.is_vector() || elem.is_void() || elem == Type::Label {
                    return Err(self.error(format!("invalid vector element type {}", elem)));
                }
                self.expect('>')?;
                Type::vector_of(elem, lanes as u32)
            }
            Some('[') => {
                self.advance();
                let len = self.read_number()?;
                self.expect_keyword("x")?;
                let elem = self.parse_type()?;
                self.expect(']')?;
                Type::array_of(elem, len)
            }
            _ => {
                let word = self.read_identifier()?;
                match word {
                    "void" => Type::Void,
                    "float" => Type::Float,
                    "double" => Type::Double,
                    "label" => Type::Label,
                    _ => match word.strip_prefix('i').map(str::parse::<u32>) {
                        Some(Ok(bits)) if (1..=128).contains(&bits) => Type::Int(bits),
                        _ => return Err(self.error(format!("unknown type '{}'", word))),
                    },
                }
            }
        };
        while self.try_read('*') {
            ty = Type::ptr_to(ty);
        }
        Ok(ty)
    }

    fn parse_value(&mut self, ty: &Type) -> IrResult<Operand<'a>> {
        self.skip_whitespace(true);
        let line = self.line();
        match self.current_char() {
            Some('%') => {
                self.advance();
                let name = self.read_name()?;
                Ok(Operand::Named { name, line })
            }
            Some('<') => {
                self.advance();
                let (elem, lanes) = match ty {
                    Type::Vector(elem, lanes) => ((**elem).clone(), *lanes),
                    _ => return Err(self.error(format!("vector constant for non-vector type {}", ty))),
                };
                let mut values = Vec::new();
                loop {
                    let lane_ty = self.parse_type()?;
                    self.check_same(&lane_ty, &elem)?;
                    match self.parse_value(&lane_ty)? {
                        Operand::Ready(value @ Value::Const(_)) => values.push(value),
                        _ => return Err(self.error("vector constant lanes must be constants")),
                    }
                    if self.try_read('>') {
                        break;
                    }
                    self.expect(',')?;
                }
                if values.len() != lanes as usize {
                    return Err(self.error(format!(
                        "vector constant has {} lanes, type {} expects {}",
                        values.len(),
                        ty,
                        lanes
                    )));
                }
                let value = self
                    .func
                    .const_vector(&values)
                    .ok_or_else(|| self.error("malformed vector constant"))?;
                Ok(Operand::Ready(value))
            }
            Some(ch) if ch.is_ascii_digit() || ch == '-' => self.parse_number_constant(ty),
            _ => {
                let word = self.read_identifier()?;
                let value = match word {
                    "null" if ty.is_pointer() => self.func.const_null(ty.clone()),
                    "zeroinitializer" => self.func.const_zero(ty.clone()),
                    "true" if ty.is_integer() => self.func.const_int(ty.clone(), 1),
                    "false" if ty.is_integer() => self.func.const_int(ty.clone(), 0),
                    _ => return Err(self.error(format!("invalid {} value '{}'", ty, word))),
                };
                Ok(Operand::Ready(value))
            }
        }
    }

    fn parse_number_constant(&mut self, ty: &Type) -> IrResult<Operand<'a>> {
        let start = self.pos;
        if self.text[self.pos..].starts_with("0x") {
            self.pos += 2;
            let digits = self.pos;
            while matches!(self.current_char(), Some(ch) if ch.is_ascii_hexdigit()) {
                self.advance();
            }
            let bits = u64::from_str_radix(&self.text[digits..self.pos], 16)
                .map_err(|e| self.error(format!("failed to parse hex number: {}", e)))?;
            let value = if ty.is_floating() {
                Value::Const(self.func.intern(Constant { ty: ty.clone(), kind: ConstKind::Float(bits) }))
            } else if ty.is_integer() {
                self.func.const_int(ty.clone(), bits as i64)
            } else {
                return Err(self.error(format!("numeric literal for type {}", ty)));
            };
            return Ok(Operand::Ready(value));
        }

        let mut prev = ' ';
        while let Some(ch) = self.current_char() {
            let sign_ok = (ch == '-' || ch == '+') && (self.pos == start || prev == 'e' || prev == 'E');
            if ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || sign_ok {
                prev = ch;
                self.advance();
            } else {
                break;
            }
        }
        let literal = &self.text[start..self.pos];
        let value = if ty.is_floating() {
            let v: f64 = literal
                .parse()
                .map_err(|e| self.error(format!("failed to parse float '{}': {}", literal, e)))?;
            self.func.const_float(ty.clone(), v)
        } else if ty.is_integer() {
            let v: i64 = literal
                .parse()
                .map_err(|e| self.error(format!("failed to parse integer '{}': {}", literal, e)))?;
            self.func.const_int(ty.clone(), v)
        } else {
            return Err(self.error(format!("numeric literal for type {}", ty)));
        };
        Ok(Operand::Ready(value))
    }

    fn check_same(&self, found: &Type, expected: &Type) -> IrResult<()> {
        if found != expected {
            return Err(IrError::TypeMismatch {
                line: self.line(),
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    /// A scalar access takes `T*`; a vector access may instead take one
    /// address per lane (`<N x T*>`).
    fn check_address(&self, ptr_ty: &Type, value_ty: &Type) -> IrResult<()> {
        if let Type::Vector(elem, lanes) = value_ty {
            if *ptr_ty == Type::vector_of(Type::ptr_to((**elem).clone()), *lanes) {
                return Ok(());
            }
        }
        self.check_same(ptr_ty, &Type::ptr_to(value_ty.clone()))
    }

    fn check_value_type(&self, value: Value, expected: &Type, line: usize) -> IrResult<()> {
        let found = self.func.value_type(value);
        if found != expected {
            return Err(IrError::TypeMismatch {
                line,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    /// `<ty> <value>` pair.
    fn parse_typed_value(&mut self) -> IrResult<(Operand<'a>, Type)> {
        let ty = self.parse_type()?;
        let value = self.parse_value(&ty)?;
        Ok((value, ty))
    }

    fn parse_label_ref(&mut self) -> IrResult<(&'a str, usize)> {
        self.expect_keyword("label")?;
        self.expect('%')?;
        let line = self.line();
        Ok((self.read_name()?, line))
    }

    // ---- functions and blocks -----------------------------------------

    fn parse_function(&mut self, declaration: bool) -> IrResult<()> {
        let ret_ty = self.parse_type()?;
        self.expect('@')?;
        let func_name = self.read_name()?;

        if self.funcs.contains_key(func_name) {
            return Err(self.error(format!("duplicate function definition: '@{}'", func_name)));
        }

        // Parse arguments
        self.expect('(')?;
        let mut args = Vec::new();
        let mut arg_names = Vec::new();
        if !self.try_read(')') {
            loop {
                let ty = self.parse_type()?;
                let name = if self.try_read('%') {
                    Some(self.read_name()?)
                } else if declaration {
                    None
                } else {
                    return Err(self.error("expected argument name"));
                };
                args.push(Argument { name: name.unwrap_or_default().to_string(), ty });
                arg_names.push(name);
                if self.try_read(')') {
                    break;
                }
                self.expect(',')?;
            }
        }

        if declaration {
            self.funcs.insert(func_name, self.module.functions.len());
            self.module.add_function(Function::declare(func_name, ret_ty, args));
            return Ok(());
        }

        // Reset per-function state
        self.func = Function::new(func_name, ret_ty, args);
        self.values.clear();
        self.blocks.clear();
        self.value_resolves.clear();
        self.block_resolves.clear();
        for (idx, name) in arg_names.iter().enumerate() {
            if let Some(name) = name {
                if self.values.insert(name, Value::Arg(idx as u32)).is_some() {
                    return Err(self.error(format!("duplicate argument name '%{}'", name)));
                }
            }
        }

        self.expect('{')?;
        let mut current = None;
        while !self.try_read('}') {
            if self.is_eof() {
                return Err(self.error("unexpected end of input in function body"));
            }
            if let Some(label) = self.peek_label() {
                current = Some(self.define_block(label)?);
                continue;
            }
            let block = match current {
                Some(block) => block,
                None => {
                    let block = self.define_block("entry")?;
                    current = Some(block);
                    block
                }
            };
            self.parse_instruction(block)?;
        }

        self.resolve_function_references()?;

        let func = std::mem::replace(&mut self.func, Function::new("", Type::Void, Vec::new()));
        self.funcs.insert(func_name, self.module.functions.len());
        self.module.add_function(func);
        Ok(())
    }

    /// Consume `name:` if the cursor is at a block label.
    fn peek_label(&mut self) -> Option<&'a str> {
        let saved_pos = self.pos;
        self.skip_whitespace(true);
        if let Ok(name) = self.read_name() {
            if self.current_char() == Some(':') {
                self.advance();
                return Some(name);
            }
        }
        self.pos = saved_pos;
        None
    }

    fn define_block(&mut self, name: &'a str) -> IrResult<BlockId> {
        if self.blocks.contains_key(name) {
            return Err(self.error(format!("duplicate block label '{}'", name)));
        }
        let block = self.func.add_block(name);
        self.blocks.insert(name, block);
        Ok(block)
    }

    fn parse_instruction(&mut self, block: BlockId) -> IrResult<()> {
        self.skip_whitespace(true);
        let line = self.line();

        // Check for value definition
        let result = if self.try_read('%') {
            let name = self.read_name()?;
            self.expect('=')?;
            Some(name)
        } else {
            None
        };

        let op_str = self.read_identifier()?;
        let opcode =
            Opcode::parse(op_str).ok_or_else(|| self.error(format!("unknown opcode '{}'", op_str)))?;

        // Block shape
        let insts = self.func.block_insts(block);
        if let Some(&last) = insts.last() {
            if self.func.inst(last).is_terminator() {
                return Err(self.error(format!("'{}' after block terminator", op_str)));
            }
            if opcode == Opcode::Phi && self.func.inst(last).opcode != Opcode::Phi {
                return Err(self.error("phi nodes must be at the beginning of a block"));
            }
        }

        let mut parsed = self.parse_operands(opcode)?;

        // Check consistency
        let defines = opcode.info().is_def && !parsed.data.ty.is_void();
        if result.is_some() && !defines {
            return Err(self.error(format!("'{}' does not produce a value", op_str)));
        }
        if result.is_none() && defines && opcode != Opcode::Call {
            return Err(self.error(format!("'{}' requires a result name", op_str)));
        }
        if let Some(name) = result {
            if self.values.contains_key(name) {
                return Err(IrError::Parse { line, message: format!("redefinition of '%{}'", name) });
            }
            parsed.data.name = Some(name.to_string());
        }

        parsed.data.targets = vec![UNRESOLVED_BLOCK; parsed.targets.len()];
        let id = self.func.append(block, parsed.data);

        for (slot, (operand, ty)) in parsed.operands.into_iter().enumerate() {
            let value = match operand {
                Operand::Ready(value) => value,
                Operand::Named { name, line } => match self.values.get(name) {
                    Some(&value) => {
                        self.check_value_type(value, &ty, line)?;
                        value
                    }
                    None => {
                        self.value_resolves.push((Resolve { name, inst: id, slot, line }, ty));
                        UNRESOLVED
                    }
                },
            };
            self.func.inst_mut(id).operands.push(value);
        }
        for (slot, (name, line)) in parsed.targets.into_iter().enumerate() {
            self.block_resolves.push(Resolve { name, inst: id, slot, line });
        }

        if let Some(name) = result {
            self.values.insert(name, Value::Inst(id));
        }
        Ok(())
    }

    fn parse_operands(&mut self, opcode: Opcode) -> IrResult<Parsed<'a>> {
        use Opcode::*;

        let parsed = match opcode {
            Ret => {
                let mut parsed = Parsed::new(InstData::new(Ret, Type::Void, Vec::new()));
                if !self.try_keyword("void") {
                    parsed.operands.push(self.parse_typed_value()?);
                }
                parsed
            }
            Br => {
                let mut parsed = Parsed::new(InstData::new(Br, Type::Void, Vec::new()));
                self.skip_whitespace(true);
                if self.text[self.pos..].starts_with("label") {
                    parsed.targets.push(self.parse_label_ref()?);
                } else {
                    let (cond, ty) = self.parse_typed_value()?;
                    self.check_same(&ty, &Type::i1())?;
                    parsed.operands.push((cond, ty));
                    self.expect(',')?;
                    parsed.targets.push(self.parse_label_ref()?);
                    self.expect(',')?;
                    parsed.targets.push(self.parse_label_ref()?);
                }
                parsed
            }
            Unreachable => Parsed::new(InstData::new(Unreachable, Type::Void, Vec::new())),
            op if op.is_binary() => {
                while BINARY_FLAGS.iter().any(|flag| self.try_keyword(flag)) {}
                let ty = self.parse_type()?;
                let lhs = self.parse_value(&ty)?;
                self.expect(',')?;
                let rhs = self.parse_value(&ty)?;
                let mut parsed = Parsed::new(InstData::new(op, ty.clone(), Vec::new()));
                parsed.operands = vec![(lhs, ty.clone()), (rhs, ty)];
                parsed
            }
            Alloca => {
                let ty = self.parse_type()?;
                if ty.is_void() || ty == Type::Label {
                    return Err(self.error(format!("cannot allocate {}", ty)));
                }
                self.skip_align()?;
                Parsed::new(InstData::new(Alloca, Type::ptr_to(ty), Vec::new()))
            }
            Load => {
                let volatile = self.try_keyword("volatile");
                let ty = self.parse_type()?;
                self.expect(',')?;
                let (ptr, ptr_ty) = self.parse_typed_value()?;
                self.check_address(&ptr_ty, &ty)?;
                self.skip_align()?;
                let mut parsed = Parsed::new(InstData::new(Load, ty, Vec::new()).with_volatile(volatile));
                parsed.operands.push((ptr, ptr_ty));
                parsed
            }
            Store => {
                let volatile = self.try_keyword("volatile");
                let (value, ty) = self.parse_typed_value()?;
                self.expect(',')?;
                let (ptr, ptr_ty) = self.parse_typed_value()?;
                self.check_address(&ptr_ty, &ty)?;
                self.skip_align()?;
                let mut parsed =
                    Parsed::new(InstData::new(Store, Type::Void, Vec::new()).with_volatile(volatile));
                parsed.operands = vec![(value, ty), (ptr, ptr_ty)];
                parsed
            }
            GetElementPtr => {
                self.try_keyword("inbounds");
                let (base, base_ty) = self.parse_typed_value()?;
                let mut operands = vec![(base, base_ty.clone())];
                while self.try_read(',') {
                    operands.push(self.parse_typed_value()?);
                }
                let depth = operands.len() - 1;
                let result = base_ty
                    .pointee()
                    .filter(|_| depth > 0)
                    .and_then(|pointee| pointee.indexed(depth - 1))
                    .ok_or_else(|| self.error(format!("invalid getelementptr indices into {}", base_ty)))?;
                let mut parsed =
                    Parsed::new(InstData::new(GetElementPtr, Type::ptr_to(result.clone()), Vec::new()));
                parsed.operands = operands;
                parsed
            }
            Fence => {
                let ordering = self.read_identifier()?;
                Parsed::new(InstData::new(Fence, Type::Void, Vec::new()).with_attr(ordering))
            }
            AtomicCmpXchg => {
                self.try_keyword("volatile");
                let (ptr, ptr_ty) = self.parse_typed_value()?;
                self.expect(',')?;
                let (cmp, ty) = self.parse_typed_value()?;
                self.expect(',')?;
                let (new, new_ty) = self.parse_typed_value()?;
                self.check_same(&new_ty, &ty)?;
                self.check_same(&ptr_ty, &Type::ptr_to(ty.clone()))?;
                let orderings = self.read_line_keywords()?;
                let mut data = InstData::new(AtomicCmpXchg, ty.clone(), Vec::new());
                if !orderings.is_empty() {
                    data = data.with_attr(orderings.join(" "));
                }
                let mut parsed = Parsed::new(data);
                parsed.operands = vec![(ptr, ptr_ty), (cmp, ty), (new, new_ty)];
                parsed
            }
            AtomicRMW => {
                self.try_keyword("volatile");
                let op = self.read_identifier()?;
                let (ptr, ptr_ty) = self.parse_typed_value()?;
                self.expect(',')?;
                let (value, ty) = self.parse_typed_value()?;
                self.check_same(&ptr_ty, &Type::ptr_to(ty.clone()))?;
                let mut attr = vec![op];
                attr.extend(self.read_line_keywords()?);
                let mut parsed =
                    Parsed::new(InstData::new(AtomicRMW, ty.clone(), Vec::new()).with_attr(attr.join(" ")));
                parsed.operands = vec![(ptr, ptr_ty), (value, ty)];
                parsed
            }
            op if op.is_cast() => {
                let (value, src_ty) = self.parse_typed_value()?;
                self.expect_keyword("to")?;
                let dst_ty = self.parse_type()?;
                let mut parsed = Parsed::new(InstData::new(op, dst_ty, Vec::new()));
                parsed.operands.push((value, src_ty));
                parsed
            }
            op if op.is_compare() => {
                let pred_str = self.read_identifier()?;
                let predicate = Predicate::parse(pred_str)
                    .ok_or_else(|| self.error(format!("unknown predicate '{}'", pred_str)))?;
                let ty = self.parse_type()?;
                let lhs = self.parse_value(&ty)?;
                self.expect(',')?;
                let rhs = self.parse_value(&ty)?;
                let result = match ty.lanes() {
                    Some(lanes) => Type::vector_of(Type::i1(), lanes),
                    None => Type::i1(),
                };
                let mut parsed = Parsed::new(InstData::new(op, result, Vec::new()).with_predicate(predicate));
                parsed.operands = vec![(lhs, ty.clone()), (rhs, ty)];
                parsed
            }
            Phi => {
                let ty = self.parse_type()?;
                let mut parsed = Parsed::new(InstData::new(Phi, ty.clone(), Vec::new()));
                loop {
                    self.expect('[')?;
                    let value = self.parse_value(&ty)?;
                    self.expect(',')?;
                    self.expect('%')?;
                    let line = self.line();
                    let block = self.read_name()?;
                    self.expect(']')?;
                    parsed.operands.push((value, ty.clone()));
                    parsed.targets.push((block, line));
                    if !self.try_read(',') {
                        break;
                    }
                }
                parsed
            }
            Call => {
                let ty = self.parse_type()?;
                self.expect('@')?;
                let line = self.line();
                let callee = self.read_name()?;
                self.func_resolves.push((callee, line));
                self.expect('(')?;
                let mut parsed = Parsed::new(InstData::new(Call, ty, Vec::new()).with_callee(callee));
                if !self.try_read(')') {
                    loop {
                        parsed.operands.push(self.parse_typed_value()?);
                        if self.try_read(')') {
                            break;
                        }
                        self.expect(',')?;
                    }
                }
                parsed
            }
            Select => {
                let (cond, cond_ty) = self.parse_typed_value()?;
                self.expect(',')?;
                let (lhs, ty) = self.parse_typed_value()?;
                self.expect(',')?;
                let (rhs, rhs_ty) = self.parse_typed_value()?;
                self.check_same(&rhs_ty, &ty)?;
                let mut parsed = Parsed::new(InstData::new(Select, ty.clone(), Vec::new()));
                parsed.operands = vec![(cond, cond_ty), (lhs, ty), (rhs, rhs_ty)];
                parsed
            }
            ExtractElement => {
                let (vector, vec_ty) = self.parse_typed_value()?;
                self.expect(',')?;
                let index = self.parse_typed_value()?;
                let elem = vec_ty
                    .element()
                    .filter(|_| vec_ty.is_vector())
                    .cloned()
                    .ok_or_else(|| self.error(format!("extractelement from non-vector {}", vec_ty)))?;
                let mut parsed = Parsed::new(InstData::new(ExtractElement, elem, Vec::new()));
                parsed.operands = vec![(vector, vec_ty), index];
                parsed
            }
            InsertElement => {
                let (vector, vec_ty) = self.parse_typed_value()?;
                self.expect(',')?;
                let (elem, elem_ty) = self.parse_typed_value()?;
                self.expect(',')?;
                let index = self.parse_typed_value()?;
                match vec_ty.element() {
                    Some(expected) if vec_ty.is_vector() => self.check_same(&elem_ty, expected)?,
                    _ => return Err(self.error(format!("insertelement into non-vector {}", vec_ty))),
                }
                let mut parsed = Parsed::new(InstData::new(InsertElement, vec_ty.clone(), Vec::new()));
                parsed.operands = vec![(vector, vec_ty), (elem, elem_ty), index];
                parsed
            }
            ExtractValue => {
                let (agg, agg_ty) = self.parse_typed_value()?;
                let mut indices = Vec::new();
                while self.try_read(',') {
                    indices.push(self.read_number()? as u32);
                }
                let result = agg_ty
                    .indexed(indices.len())
                    .filter(|_| !indices.is_empty())
                    .cloned()
                    .ok_or_else(|| self.error(format!("invalid extractvalue indices into {}", agg_ty)))?;
                let mut parsed =
                    Parsed::new(InstData::new(ExtractValue, result, Vec::new()).with_indices(indices));
                parsed.operands.push((agg, agg_ty));
                parsed
            }
            InsertValue => {
                let (agg, agg_ty) = self.parse_typed_value()?;
                self.expect(',')?;
                let (elem, elem_ty) = self.parse_typed_value()?;
                let mut indices = Vec::new();
                while self.try_read(',') {
                    indices.push(self.read_number()? as u32);
                }
                if indices.is_empty() || agg_ty.indexed(indices.len()) != Some(&elem_ty) {
                    return Err(self.error(format!("invalid insertvalue indices into {}", agg_ty)));
                }
                let mut parsed =
                    Parsed::new(InstData::new(InsertValue, agg_ty.clone(), Vec::new()).with_indices(indices));
                parsed.operands = vec![(agg, agg_ty), (elem, elem_ty)];
                parsed
            }
            op => return Err(self.error(format!("cannot parse '{}'", op.name()))),
        };
        Ok(parsed)
    }

    fn resolve_function_references(&mut self) -> IrResult<()> {
        // Resolve value references
        for (resolve, ty) in std::mem::take(&mut self.value_resolves) {
            let value = *self.values.get(resolve.name).ok_or_else(|| IrError::UndefinedValue {
                function: self.func.name.clone(),
                name: resolve.name.to_string(),
            })?;
            self.check_value_type(value, &ty, resolve.line)?;
            self.func.inst_mut(resolve.inst).operands[resolve.slot] = value;
        }

        // Resolve block references
        for resolve in std::mem::take(&mut self.block_resolves) {
            let block = *self.blocks.get(resolve.name).ok_or_else(|| IrError::UndefinedBlock {
                function: self.func.name.clone(),
                name: resolve.name.to_string(),
            })?;
            self.func.inst_mut(resolve.inst).targets[resolve.slot] = block;
        }

        Ok(())
    }

    fn resolve_all_references(&mut self) -> IrResult<()> {
        // Resolve function references (cross-function)
        for &(name, line) in &self.func_resolves {
            if !self.funcs.contains_key(name) {
                return Err(IrError::Parse {
                    line,
                    message: format!("undefined function reference '@{}'", name),
                });
            }
        }

        Ok(())
    }
}
