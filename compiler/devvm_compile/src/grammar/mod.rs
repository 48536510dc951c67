//! Recursive-descent grammar.
//!
//! [`Parser`] handles everything outside function bodies: top-level items
//! and data values. [`Body`] borrows the parser while one function body is
//! compiled and owns that body's emitter, local table and method-call
//! table. Every production emits code as it goes and hands back a
//! [`TypeInfo`](devvm_ir::TypeInfo) describing what it left behind.

mod data;
mod expr;
mod item;
mod stmt;

use std::rc::Rc;

use devvm_diagnostic::{CompileError, HostError};
use devvm_ir::{
    ConditionalMask, FunctionBody, FunctionId, NativeEntry, Span, SuspendMask, ValueType,
};
use devvm_lexer::{Lexer, Token, TokenKind};
use tracing::debug;

use crate::deferred::DeferredCompile;
use crate::emit::{Emitter, FinishError};
use crate::symbols::Locals;
use crate::Compiler;

pub(crate) struct Parser<'c, 's> {
    c: &'c mut Compiler,
    lex: Lexer<'s>,
    /// Shared text of the unit; captured inline scripts keep a handle to it.
    source: Rc<str>,
}

impl<'c, 's> Parser<'c, 's> {
    pub(crate) fn new(c: &'c mut Compiler, source: &'s Rc<str>, range: Span) -> Self {
        Parser {
            c,
            lex: Lexer::with_range(source, range),
            source: Rc::clone(source),
        }
    }

    /// Compile a queued body; the fragment must hold nothing else.
    pub(crate) fn deferred_body(&mut self, item: &DeferredCompile) -> Result<(), CompileError> {
        self.compile_body(item.function, item.return_type, item.conditional)?;
        let tok = self.next()?;
        if !tok.is(TokenKind::End) {
            return Err(CompileError::syntax("Expected end of script", tok.span.start));
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Token, CompileError> {
        self.lex.next()
    }

    fn peek(&mut self) -> Result<Token, CompileError> {
        self.lex.peek()
    }

    fn push_back(&mut self, tok: Token) {
        self.lex.push_back(tok);
    }

    /// Consume the next token if it is `kind`.
    fn eat(&mut self, kind: TokenKind) -> Result<bool, CompileError> {
        let tok = self.next()?;
        if tok.is(kind) {
            Ok(true)
        } else {
            self.push_back(tok);
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token, CompileError> {
        let tok = self.next()?;
        if tok.is(kind) {
            Ok(tok)
        } else {
            Err(CompileError::syntax(message, tok.span.start))
        }
    }

    fn text(&self, tok: &Token) -> &'s str {
        self.lex.text(tok)
    }

    /// Semantic error at the most recent token.
    fn semantic(&self, message: impl Into<String>) -> CompileError {
        CompileError::semantic(message, self.lex.last_span().start)
    }

    fn internal(&self, message: impl Into<String>) -> CompileError {
        CompileError::internal(message, self.lex.last_span().start)
    }

    /// Surface the outcome of a host callback.
    ///
    /// The callback had the whole compiler, so it may have failed a nested
    /// compile; that error wins over its own return value.
    fn host_result(&self, result: Result<(), HostError>, offset: u32) -> Result<(), CompileError> {
        if let Some(latched) = &self.c.error {
            return Err(latched.error.clone());
        }
        result.map_err(|e| e.into_compile_error(offset))
    }

    fn definition_offset(&self, id: FunctionId) -> u32 {
        self.c
            .effects
            .info(id)
            .and_then(|i| i.definition.as_ref())
            .map_or(0, |d| d.offset)
    }

    /// Compile one function body, from after its `{` up to (not including)
    /// the closing `}` or the end of input, and store it in the domain.
    #[tracing::instrument(level = "debug", skip(self, return_type, conditional))]
    fn compile_body(
        &mut self,
        id: FunctionId,
        return_type: ValueType,
        conditional: ConditionalMask,
    ) -> Result<(), CompileError> {
        let conditional = conditional | ConditionalMask::for_debug(self.c.debug);
        let mut body = Body {
            p: self,
            id,
            return_type,
            conditional,
            emit: Emitter::new(),
            methods: Vec::new(),
            locals: Locals::default(),
        };
        let terminates = body.block()?;
        body.finish(terminates)
    }
}

/// State of the function body being compiled.
struct Body<'p, 'c, 's> {
    p: &'p mut Parser<'c, 's>,
    id: FunctionId,
    return_type: ValueType,
    conditional: ConditionalMask,
    emit: Emitter,
    /// Native entry points, indexed by the call opcodes' index operand.
    methods: Vec<NativeEntry>,
    locals: Locals,
}

impl Body<'_, '_, '_> {
    fn next(&mut self) -> Result<Token, CompileError> {
        self.p.next()
    }

    fn peek(&mut self) -> Result<Token, CompileError> {
        self.p.peek()
    }

    fn push_back(&mut self, tok: Token) {
        self.p.push_back(tok);
    }

    fn eat(&mut self, kind: TokenKind) -> Result<bool, CompileError> {
        self.p.eat(kind)
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token, CompileError> {
        self.p.expect(kind, message)
    }

    fn semantic(&self, message: impl Into<String>) -> CompileError {
        self.p.semantic(message)
    }

    fn internal(&self, message: impl Into<String>) -> CompileError {
        self.p.internal(message)
    }

    fn allowed(&self) -> SuspendMask {
        self.p.c.effects.allowed(self.id)
    }

    /// Fail unless this function may suspend in every mode in `modes`.
    fn check_suspend(&self, name: &str, modes: SuspendMask) -> Result<(), CompileError> {
        let allowed = self.allowed();
        if modes.difference(allowed).is_empty() {
            return Ok(());
        }
        Err(self.semantic(if allowed.is_empty() {
            format!("Cannot call '{name}' as it can suspend, which is not supported by the current context")
        } else {
            format!("Cannot call '{name}' as it can suspend in a mode not supported by the current context")
        }))
    }

    fn finish(mut self, terminates: bool) -> Result<(), CompileError> {
        if !terminates {
            if self.return_type != ValueType::Void {
                return Err(self.semantic("No return at end of function"));
            }
            self.emit.op(devvm_ir::Opcode::ReturnVoid);
        }

        let offset = self.p.definition_offset(self.id);
        let local_slots = self.locals.slots_used();
        let bytecode = self.emit.finish().map_err(|e| {
            CompileError::internal(
                match e {
                    FinishError::UnresolvedBranches(_) => "Unresolved branch targets",
                    FinishError::OpenLoops(_) => "Break stack invalid after function",
                },
                offset,
            )
        })?;
        let verified = devvm_verify::verify(&bytecode, local_slots)
            .map_err(|e| CompileError::internal(e.to_string(), offset))?;

        debug!(
            function = %self.id,
            bytes = bytecode.len(),
            calls = self.methods.len(),
            stack_slots = verified.stack_slots,
            "function compiled"
        );
        let function = self
            .p
            .c
            .domain
            .function_mut(self.id)
            .ok_or_else(|| CompileError::internal("Function table out of step", offset))?;
        function.body = Some(FunctionBody {
            bytecode,
            method_table: self.methods,
            stack_slots: verified.stack_slots,
            local_slots,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests;
