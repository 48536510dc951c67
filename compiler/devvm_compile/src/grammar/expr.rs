//! Expressions, lowest precedence first.
//!
//! ```text
//! assignment  := logical_or ('=' logical_or)?
//! logical_or  := logical_and ('||' logical_and)*
//! logical_and := equality ('&&' equality)*
//! equality    := relational (('==' | '!=') relational)*
//! relational  := bit_or (('<' | '<=' | '>' | '>=') bit_or)*
//! bit_or      := bit_xor ('|' bit_xor)*
//! bit_xor     := bit_and ('^' bit_and)*
//! bit_and     := shift ('&' shift)*
//! shift       := additive (('<<' | '>>') additive)*
//! additive    := term (('+' | '-') term)*
//! term        := unary (('*' | '/' | '%') unary)*
//! unary       := ('+' | '-' | '~' | '!') unary | postfix
//! postfix     := value ('.' ident '(' args ')')*
//! ```
//!
//! A production may hand back an unloaded value (a constant, a variable
//! reference, a class name); operators call [`Body::load`] to put it on
//! the evaluation stack.

use devvm_diagnostic::CompileError;
use devvm_ir::{
    ConditionalMask, FunctionId, ObjectClass, Opcode, SuspendMask, TypeClass, TypeInfo, ValueType,
};
use devvm_lexer::TokenKind;

use super::data::check_printable;
use super::Body;
use crate::stack::ensure_sufficient_stack;
use crate::MAX_CALLS;

type Production<'p, 'c, 's> = fn(&mut Body<'p, 'c, 's>) -> Result<TypeInfo, CompileError>;

impl<'p, 'c, 's> Body<'p, 'c, 's> {
    /// One-byte slot operand.
    pub(super) fn slot_operand(&self, slot: u32) -> Result<u8, CompileError> {
        u8::try_from(slot).map_err(|_| self.internal(format!("Slot {slot} out of range")))
    }

    pub(super) fn const_operand(&self, value: u32) -> Result<i32, CompileError> {
        i32::try_from(value).map_err(|_| self.internal(format!("Constant {value} out of range")))
    }

    /// Put `ty` on the evaluation stack if it is not there already.
    pub(super) fn load(&mut self, ty: TypeInfo) -> Result<TypeInfo, CompileError> {
        if !ty.needs_load() {
            return Ok(ty);
        }
        match ty.class {
            TypeClass::IntConst => self.emit.load_const(ty.const_value()),
            TypeClass::IntLvalueGlobal | TypeClass::ObjectLvalue => {
                let slot = self.slot_operand(ty.index)?;
                self.emit.op_u8(Opcode::IVLoad, slot);
            }
            TypeClass::IntLvalueLocal => {
                let slot = self.slot_operand(ty.index)?;
                self.emit.op_u8(Opcode::ILLoad, slot);
            }
            TypeClass::StringConst => {
                let handle = self.const_operand(ty.index)?;
                self.emit.load_const(handle);
            }
            _ => {}
        }
        Ok(ty.loaded())
    }

    pub(super) fn expression(&mut self) -> Result<TypeInfo, CompileError> {
        let lhs = self.logical_or()?;
        if !self.eat(TokenKind::Assign)? {
            return Ok(lhs);
        }
        if !lhs.is_int_lvalue() {
            return Err(self.semantic("Left side of assignment must be assignable variable"));
        }
        let rhs = self.logical_or()?;
        let rhs = self.load(rhs)?;
        if rhs.class != TypeClass::Int {
            return Err(self.semantic("Right side of assignment must be integer expression"));
        }
        let store = if lhs.class == TypeClass::IntLvalueLocal {
            Opcode::ILStore
        } else {
            Opcode::IVStore
        };
        let slot = self.slot_operand(lhs.index)?;
        self.emit.op_u8(store, slot);
        Ok(TypeInfo::VOID)
    }

    /// An expression whose loaded value is an integer.
    pub(super) fn int_expression(&mut self) -> Result<(), CompileError> {
        let ty = self.expression()?;
        let ty = self.load(ty)?;
        if ty.class != TypeClass::Int {
            return Err(self.semantic("Integer expression required"));
        }
        Ok(())
    }

    fn logical_or(&mut self) -> Result<TypeInfo, CompileError> {
        self.short_circuit(TokenKind::OrOr, Opcode::Ljnz, Self::logical_and)
    }

    fn logical_and(&mut self) -> Result<TypeInfo, CompileError> {
        self.short_circuit(TokenKind::AndAnd, Opcode::Ljz, Self::equality)
    }

    /// `a || b` and `a && b`. The left value stays on the stack as the
    /// result when it decides the outcome; otherwise it is popped and the
    /// right side's value replaces it.
    fn short_circuit(
        &mut self,
        token: TokenKind,
        decided: Opcode,
        operand: Production<'p, 'c, 's>,
    ) -> Result<TypeInfo, CompileError> {
        let mut lhs = operand(self)?;
        while self.eat(token)? {
            let left = self.load(lhs)?;
            if left.class != TypeClass::Int {
                return Err(self.semantic("Logical operator can only be applied to integer arguments"));
            }
            self.emit.op(Opcode::Dup);
            let done = self.emit.placeholder(decided);
            self.emit.op(Opcode::Pop);
            let rhs = operand(self)?;
            let right = self.load(rhs)?;
            if right.class != TypeClass::Int {
                return Err(self.semantic("Logical operator can only be applied to integer arguments"));
            }
            self.emit.patch_to_here(done);
            lhs = TypeInfo::INT;
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<TypeInfo, CompileError> {
        let mut lhs = self.relational()?;
        loop {
            let tok = self.next()?;
            let op = match tok.kind {
                TokenKind::EqEq => Opcode::IntEq,
                TokenKind::NotEq => Opcode::IntNe,
                _ => {
                    self.push_back(tok);
                    return Ok(lhs);
                }
            };
            let left = self.load(lhs)?;
            let rhs = self.relational()?;
            let right = self.load(rhs)?;
            let comparable = matches!(
                left.class,
                TypeClass::Int | TypeClass::String | TypeClass::Object | TypeClass::FunctionPointer
            );
            let same_class = match (left.object_class, right.object_class) {
                (Some(a), Some(b)) => ObjectClass::same(a, b),
                (None, None) => true,
                _ => false,
            };
            if !comparable || left.class != right.class || !same_class {
                return Err(self.semantic(
                    "Equality operator can only be applied to arguments of same type",
                ));
            }
            self.emit.op(op);
            lhs = TypeInfo::INT;
        }
    }

    fn relational(&mut self) -> Result<TypeInfo, CompileError> {
        self.int_binary(
            Self::bit_or,
            &[
                (TokenKind::Lt, Opcode::IntLt),
                (TokenKind::LtEq, Opcode::IntLe),
                (TokenKind::Gt, Opcode::IntGt),
                (TokenKind::GtEq, Opcode::IntGe),
            ],
            "Relational",
        )
    }

    fn bit_or(&mut self) -> Result<TypeInfo, CompileError> {
        self.int_binary(Self::bit_xor, &[(TokenKind::Pipe, Opcode::IntOr)], "Bitwise")
    }

    fn bit_xor(&mut self) -> Result<TypeInfo, CompileError> {
        self.int_binary(Self::bit_and, &[(TokenKind::Caret, Opcode::IntXor)], "Bitwise")
    }

    fn bit_and(&mut self) -> Result<TypeInfo, CompileError> {
        self.int_binary(Self::shift, &[(TokenKind::Amp, Opcode::IntAnd)], "Bitwise")
    }

    fn shift(&mut self) -> Result<TypeInfo, CompileError> {
        self.int_binary(
            Self::additive,
            &[(TokenKind::Shl, Opcode::IntAsl), (TokenKind::Shr, Opcode::IntAsr)],
            "Shift",
        )
    }

    fn additive(&mut self) -> Result<TypeInfo, CompileError> {
        self.int_binary(
            Self::term,
            &[(TokenKind::Plus, Opcode::IntAdd), (TokenKind::Minus, Opcode::IntSub)],
            "Additive",
        )
    }

    fn term(&mut self) -> Result<TypeInfo, CompileError> {
        self.int_binary(
            Self::unary,
            &[
                (TokenKind::Star, Opcode::IntMul),
                (TokenKind::Slash, Opcode::IntDiv),
                (TokenKind::Percent, Opcode::IntMod),
            ],
            "Multiplicative",
        )
    }

    /// Left-associative integer operators of one precedence level.
    fn int_binary(
        &mut self,
        operand: Production<'p, 'c, 's>,
        ops: &[(TokenKind, Opcode)],
        what: &str,
    ) -> Result<TypeInfo, CompileError> {
        let mut lhs = operand(self)?;
        loop {
            let tok = self.next()?;
            let Some(&(_, op)) = ops.iter().find(|(kind, _)| tok.is(*kind)) else {
                self.push_back(tok);
                return Ok(lhs);
            };
            let left = self.load(lhs)?;
            let rhs = operand(self)?;
            let right = self.load(rhs)?;
            if left.class != TypeClass::Int || right.class != TypeClass::Int {
                return Err(self.semantic(format!(
                    "{what} operator can only be applied to integer arguments"
                )));
            }
            self.emit.op(op);
            lhs = TypeInfo::INT;
        }
    }

    fn unary(&mut self) -> Result<TypeInfo, CompileError> {
        let tok = self.next()?;
        let op = match tok.kind {
            TokenKind::Increment | TokenKind::Decrement => {
                return Err(self.semantic("Preincrement/decrement operators not supported"))
            }
            TokenKind::Plus => None,
            TokenKind::Minus => Some(Opcode::IntNeg),
            TokenKind::Tilde => Some(Opcode::IntNot),
            TokenKind::Bang => Some(Opcode::Not),
            _ => {
                self.push_back(tok);
                return self.postfix();
            }
        };
        let ty = ensure_sufficient_stack(|| self.unary())?;
        let ty = self.load(ty)?;
        if ty.class != TypeClass::Int {
            return Err(self.semantic("Unary operator can only be applied to integers"));
        }
        if let Some(op) = op {
            self.emit.op(op);
        }
        Ok(TypeInfo::INT)
    }

    fn postfix(&mut self) -> Result<TypeInfo, CompileError> {
        let mut ty = self.value()?;
        loop {
            let tok = self.next()?;
            match tok.kind {
                TokenKind::Increment | TokenKind::Decrement => {
                    return Err(self.semantic("Postincrement/decrement operators not supported"))
                }
                TokenKind::Dot => ty = self.method_call(ty)?,
                _ => {
                    self.push_back(tok);
                    return Ok(ty);
                }
            }
        }
    }

    /// `.name(args)` on an object or a class name.
    fn method_call(&mut self, receiver: TypeInfo) -> Result<TypeInfo, CompileError> {
        let receiver = self.load(receiver)?;
        let (on_class, class) = match (receiver.class, receiver.object_class) {
            (TypeClass::Object, Some(class)) => (false, class),
            (TypeClass::ObjectClass, Some(class)) => (true, class),
            _ => return Err(self.semantic("'.' operator can only be used on object")),
        };

        let name_tok = self.next()?;
        if !name_tok.is(TokenKind::Ident) {
            return Err(CompileError::syntax(
                "Expected method name after '.' operator",
                name_tok.span.start,
            ));
        }
        let name = self.p.text(&name_tok);
        let Some(method) = class.method(name) else {
            return Err(self.semantic(format!(
                "Class '{}' does not have method called '{name}'",
                class.name
            )));
        };
        if method.is_static() && !on_class {
            return Err(self.semantic(format!(
                "Static method '{name}' must be called on a class instance"
            )));
        }
        if !method.is_static() && on_class {
            return Err(self.semantic(format!(
                "Instance method '{name}' must be called on an object instance"
            )));
        }
        self.check_suspend(name, method.suspends)?;
        self.p.c.effects.require(self.id, method.suspends);

        self.expect(TokenKind::LParen, "Expected '(' after method name")?;
        let mut argc = 0usize;
        if !self.eat(TokenKind::RParen)? {
            loop {
                let arg = ensure_sufficient_stack(|| self.expression())?;
                let arg = self.load(arg)?;
                argc += 1;
                if let Some(expected) = method.args.get(argc - 1) {
                    if !expected.accepts(&arg) {
                        return Err(self.semantic(format!(
                            "Argument type mismatch on argument {argc}"
                        )));
                    }
                }
                let tok = self.next()?;
                match tok.kind {
                    TokenKind::Comma => {}
                    TokenKind::RParen => break,
                    _ => {
                        return Err(CompileError::syntax(
                            "Expected ',' or ')' after method argument",
                            tok.span.start,
                        ))
                    }
                }
            }
        }
        if argc != method.args.len() {
            return Err(self.semantic(format!(
                "Method {}.{}() expects {} arguments, {argc} provided",
                class.name,
                method.name,
                method.args.len()
            )));
        }
        if self.methods.len() >= MAX_CALLS {
            return Err(self.semantic("External method call limit exceeded"));
        }
        let index = self.slot_operand(u32::try_from(self.methods.len()).unwrap_or(u32::MAX))?;
        self.methods.push(method.entry);

        let returns_value = method.return_type != ValueType::Void;
        let op = match (on_class, returns_value) {
            (false, false) => Opcode::MethodCallVoid,
            (false, true) => Opcode::MethodCallInt,
            (true, false) => Opcode::StaticMethodCallVoid,
            (true, true) => Opcode::StaticMethodCallInt,
        };
        // argc <= the method's declared arity, which is small
        let argc = self.slot_operand(u32::try_from(argc).unwrap_or(u32::MAX))?;
        self.emit.call(op, argc, index);
        Ok(method.return_type.type_info())
    }

    /// Names, special variables, constants and parenthesized expressions.
    fn value(&mut self) -> Result<TypeInfo, CompileError> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::Ident => {
                let name = self.p.text(&tok);
                if let Some(ty) = self.locals.lookup(name) {
                    return Ok(ty);
                }
                if let Some(ty) = self.p.c.symbols.variable(name) {
                    return Ok(ty);
                }
                if let Some(entry) = self.p.c.symbols.class(name) {
                    return Ok(TypeInfo::class_name(entry.class));
                }
                if let Some(callee) = self.p.c.symbols.function(name) {
                    return self.function_reference(name, callee);
                }
                Err(self.semantic(format!("Unknown variable or function '{name}'")))
            }
            TokenKind::SpecialIdent => {
                let name = self.p.text(&tok);
                if let Some(special) = self.p.c.symbols.special(name) {
                    if let Some(referenced) = self
                        .p
                        .c
                        .special_referenced
                        .get_mut(usize::from(special.slot))
                    {
                        *referenced = true;
                    }
                    self.emit.op_u8(Opcode::ISLoad, special.slot);
                    return Ok(special.class.map_or(TypeInfo::INT, TypeInfo::object));
                }
                if let Some(thread) = self.p.c.symbols.thread(name) {
                    self.emit.op_u8(Opcode::ITLoad, thread.slot);
                    return Ok(TypeInfo::INT);
                }
                Err(self.semantic(format!("Unknown special variable '${name}'")))
            }
            TokenKind::Integer(_)
            | TokenKind::StringLiteral
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Function => {
                self.push_back(tok);
                self.constant()
            }
            TokenKind::LParen => {
                let ty = ensure_sufficient_stack(|| self.logical_or())?;
                self.expect(TokenKind::RParen, "Expected ')'")?;
                Ok(ty)
            }
            _ => Err(CompileError::syntax("Expected expression value", tok.span.start)),
        }
    }

    /// `f()` calls; a bare `f` is a pointer to it.
    fn function_reference(
        &mut self,
        name: &str,
        callee: FunctionId,
    ) -> Result<TypeInfo, CompileError> {
        let Some(return_type) = self.p.c.domain.function(callee).map(|f| f.return_type) else {
            return Err(self.internal("Function table out of step"));
        };

        if !self.eat(TokenKind::LParen)? {
            let signature = self.p.c.fn_ptr_signature(return_type);
            let value = self.const_operand(callee.0)?;
            self.emit.load_const(value);
            return Ok(TypeInfo::function_pointer(signature));
        }
        self.expect(TokenKind::RParen, "Expected ')' after function name")?;

        self.check_suspend(name, self.p.c.effects.required(callee))?;
        self.p.c.effects.add_call(self.id, callee);

        let index = self.slot_operand(callee.0)?;
        if return_type == ValueType::Void {
            self.emit.call(Opcode::FunctionCallVoid, 0, index);
            Ok(TypeInfo::VOID)
        } else {
            self.emit.call(Opcode::FunctionCallInt, 0, index);
            Ok(TypeInfo::INT)
        }
    }

    fn constant(&mut self) -> Result<TypeInfo, CompileError> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::Integer(v) => Ok(TypeInfo::int_const(v)),
            TokenKind::True => Ok(TypeInfo::int_const(1)),
            TokenKind::False => Ok(TypeInfo::int_const(0)),
            TokenKind::StringLiteral => {
                let text = self.p.text(&tok);
                check_printable(text, tok.span.start)?;
                Ok(TypeInfo::string_const(self.p.c.domain.intern_string(text)))
            }
            TokenKind::Function => {
                let fragment = self.p.inline_script()?;
                let id = self.p.c.defer_compile(
                    ValueType::Void,
                    fragment,
                    SuspendMask::all(),
                    ConditionalMask::empty(),
                );
                let value = self.const_operand(id.0)?;
                self.emit.load_const(value);
                Ok(TypeInfo::function_pointer(0))
            }
            _ => Err(CompileError::syntax("Expected constant value", tok.span.start)),
        }
    }
}
