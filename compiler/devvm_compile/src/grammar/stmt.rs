//! Statements.
//!
//! Each statement returns whether every path through it ends the function
//! (`return`, `break`, or a void function's endless `loop`). A block ends
//! the function once any of its statements does.

use devvm_diagnostic::CompileError;
use devvm_ir::{ConditionalMask, Opcode, TypeClass, ValueType};
use devvm_lexer::TokenKind;

use super::Body;
use crate::stack::ensure_sufficient_stack;

impl Body<'_, '_, '_> {
    /// Statements up to a `}` (left unconsumed) or the end of input.
    pub(super) fn block(&mut self) -> Result<bool, CompileError> {
        let mut terminates = false;
        loop {
            let tok = self.peek()?;
            if tok.is(TokenKind::RBrace) || tok.is(TokenKind::End) {
                return Ok(terminates);
            }
            terminates |= self.statement()?;
        }
    }

    /// Nested blocks, `if` arms and loop bodies all recurse through here.
    fn statement(&mut self) -> Result<bool, CompileError> {
        ensure_sufficient_stack(|| self.statement_inner())
    }

    fn statement_inner(&mut self) -> Result<bool, CompileError> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::LBracket => self.attributed(),
            TokenKind::If => self.if_statement(),
            TokenKind::Return => self.return_statement(),
            TokenKind::Loop => self.loop_statement(),
            TokenKind::Do => self.do_while_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Break => self.break_statement(),
            TokenKind::Int => self.declaration().map(|()| false),
            TokenKind::LBrace => self.nested_block(),
            _ => {
                self.push_back(tok);
                self.expression_statement().map(|()| false)
            }
        }
    }

    /// `[attr] stmt` / `[!attr] stmt`
    fn attributed(&mut self) -> Result<bool, CompileError> {
        let negate = self.eat(TokenKind::Bang)?;
        let tok = self.next()?;
        if !tok.is(TokenKind::Ident) {
            return Err(CompileError::syntax("Expected attribute name", tok.span.start));
        }
        let name = self.p.text(&tok);
        let (condition, needs_allowed) = match (name, negate) {
            ("debug_read", false) => (ConditionalMask::DEBUG_READ_ENABLED, true),
            ("debug_read", true) => (ConditionalMask::NON_DEBUG_READ_ENABLED, true),
            ("debug", false) => (ConditionalMask::DEBUG_ENABLED, false),
            ("debug", true) => (ConditionalMask::NON_DEBUG_ENABLED, false),
            _ => return Err(self.semantic(format!("Unrecognized attribute '{name}'"))),
        };
        self.expect(TokenKind::RBracket, "Expected ']' after attribute name")?;

        if needs_allowed && !self.conditional.contains(ConditionalMask::ALLOWED) {
            return Err(self.semantic("Conditional attributes not supported in this function"));
        }
        if self.conditional.contains(condition) {
            return self.statement();
        }
        self.skip_statement()?;
        Ok(false)
    }

    /// Skip a statement without parsing it.
    ///
    /// Ends at a `;` outside braces, or at a `}` that closes the outermost
    /// brace unless an `else` follows it.
    fn skip_statement(&mut self) -> Result<(), CompileError> {
        let mut depth = 0u32;
        loop {
            let tok = self.next()?;
            match tok.kind {
                TokenKind::End => {
                    return Err(CompileError::syntax(
                        "Encountered end of file while looking for end of statement",
                        tok.span.start,
                    ))
                }
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth == 0 => {
                    // closes the enclosing block
                    self.push_back(tok);
                    return Ok(());
                }
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 && !self.eat(TokenKind::Else)? {
                        return Ok(());
                    }
                }
                TokenKind::Semicolon if depth == 0 => return Ok(()),
                _ => {}
            }
        }
    }

    /// `if (cond) stmt [else stmt]`
    fn if_statement(&mut self) -> Result<bool, CompileError> {
        self.expect(TokenKind::LParen, "Expected '(' before if condition")?;
        self.int_expression()?;
        self.expect(TokenKind::RParen, "Expected ')' after if condition")?;

        let skip_then = self.emit.placeholder(Opcode::Ljz);
        let then_terminates = self.statement()?;

        if !self.eat(TokenKind::Else)? {
            self.emit.patch_to_here(skip_then);
            return Ok(false);
        }
        let skip_else = self.emit.placeholder(Opcode::Ljmp);
        self.emit.patch_to_here(skip_then);
        let else_terminates = self.statement()?;
        self.emit.patch_to_here(skip_else);
        Ok(then_terminates && else_terminates)
    }

    /// `return;` or `return expr;`
    fn return_statement(&mut self) -> Result<bool, CompileError> {
        if self.eat(TokenKind::Semicolon)? {
            if self.return_type != ValueType::Void {
                return Err(self.semantic("Return value required"));
            }
            self.emit.op(Opcode::ReturnVoid);
            return Ok(true);
        }

        let ty = self.expression()?;
        let ty = self.load(ty)?;
        let expected = self.return_type.type_info();
        let class_mismatch = ty.class == TypeClass::Object
            && !matches!(
                (ty.object_class, expected.object_class),
                (Some(a), Some(b)) if devvm_ir::ObjectClass::same(a, b)
            );
        if ty.class != expected.class || class_mismatch {
            return Err(self.semantic("Return type mismatch"));
        }
        match ty.class {
            TypeClass::Void => self.emit.op(Opcode::ReturnVoid),
            TypeClass::Int => self.emit.op(Opcode::ReturnInt),
            _ => return Err(self.semantic("Cannot return expression type")),
        }
        self.end_statement()?;
        Ok(true)
    }

    /// `loop stmt`: runs until `break`, checking in with the VM each pass.
    fn loop_statement(&mut self) -> Result<bool, CompileError> {
        let top = self.emit.offset();
        self.emit.begin_loop();
        self.statement()?;
        self.emit.op(Opcode::LoopChk);
        self.emit.jump_to(Opcode::Ljmp, top);
        let had_break = self.emit.end_loop();
        Ok(!had_break && self.return_type == ValueType::Void)
    }

    /// `do stmt while (cond);`
    fn do_while_statement(&mut self) -> Result<bool, CompileError> {
        self.emit.begin_loop();
        let top = self.emit.offset();
        self.statement()?;
        self.expect(
            TokenKind::While,
            "Expected 'while' after 'do' and do-while loop body",
        )?;
        self.expect(TokenKind::LParen, "Expected '(' after 'while'")?;
        self.int_expression()?;
        self.expect(TokenKind::RParen, "Expected ')' after while condition")?;
        self.emit.jump_to(Opcode::Ljnz, top);
        self.emit.end_loop();
        self.end_statement()?;
        Ok(false)
    }

    /// `while (cond) stmt`
    fn while_statement(&mut self) -> Result<bool, CompileError> {
        let exit = self.emit.begin_loop();
        self.expect(TokenKind::LParen, "Expected '(' after 'while'")?;
        let top = self.emit.offset();
        self.int_expression()?;
        self.expect(TokenKind::RParen, "Expected ')' after while condition")?;
        self.emit.branch_to_label(Opcode::Ljz, exit);
        self.statement()?;
        self.emit.jump_to(Opcode::Ljmp, top);
        self.emit.end_loop();
        Ok(false)
    }

    fn break_statement(&mut self) -> Result<bool, CompileError> {
        let Some(exit) = self.emit.current_loop() else {
            return Err(self.semantic("No loop for break statement"));
        };
        self.emit.branch_to_label(Opcode::Ljmp, exit);
        self.end_statement()?;
        Ok(true)
    }

    /// `int a [= expr], b ...;`
    fn declaration(&mut self) -> Result<(), CompileError> {
        loop {
            let tok = self.next()?;
            if !tok.is(TokenKind::Ident) {
                return Err(CompileError::syntax("Expected variable name", tok.span.start));
            }
            let name = self.p.text(&tok);
            let slot = self
                .locals
                .declare(name)
                .map_err(|e| CompileError::semantic(e.to_string(), tok.span.start))?;

            if self.eat(TokenKind::Assign)? {
                self.int_expression()?;
                let slot = self.slot_operand(slot)?;
                self.emit.op_u8(Opcode::ILStore, slot);
            }

            let tok = self.next()?;
            match tok.kind {
                TokenKind::Semicolon => return Ok(()),
                TokenKind::Comma => {}
                _ => {
                    return Err(CompileError::syntax(
                        "Expected ';' or ',' after variable name",
                        tok.span.start,
                    ))
                }
            }
        }
    }

    /// `{ ... }`: locals declared inside go out of scope at the `}`.
    fn nested_block(&mut self) -> Result<bool, CompileError> {
        let mark = self.locals.open_block();
        let terminates = self.block()?;
        self.expect(TokenKind::RBrace, "Expected '}' at end of block")?;
        self.locals.close_block(mark);
        Ok(terminates)
    }

    fn expression_statement(&mut self) -> Result<(), CompileError> {
        let ty = self.expression()?;
        // Only values already on the stack need discarding.
        if matches!(
            ty.class,
            TypeClass::Int | TypeClass::Object | TypeClass::String | TypeClass::FunctionPointer
        ) {
            self.emit.op(Opcode::Pop);
        }
        self.end_statement()
    }

    fn end_statement(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::Semicolon, "Expected ';' at end of statement")?;
        Ok(())
    }
}
