//! Top-level items: variables, functions, event bindings and options.

use std::rc::Rc;

use devvm_diagnostic::CompileError;
use devvm_ir::{ConditionalMask, DataValue, Function, SuspendMask, ValueType};
use devvm_lexer::{Token, TokenKind};
use tracing::debug;

use super::Parser;
use crate::effects::Definition;
use crate::host::InstantiateFn;
use crate::MAX_FUNCTIONS;

impl Parser<'_, '_> {
    /// file := item*
    pub(crate) fn file(&mut self) -> Result<(), CompileError> {
        loop {
            let tok = self.next()?;
            match tok.kind {
                TokenKind::End => return Ok(()),
                TokenKind::Function => self.function()?,
                TokenKind::Int | TokenKind::Void | TokenKind::Ident => self.variables(tok)?,
                TokenKind::Event => self.event()?,
                TokenKind::Option => self.option()?,
                _ => {
                    return Err(CompileError::syntax(
                        "Function or variable definition expected",
                        tok.span.start,
                    ))
                }
            }
        }
    }

    /// `int a, b;` or `Class x: value, y;`
    fn variables(&mut self, type_tok: Token) -> Result<(), CompileError> {
        let instantiate: Option<Rc<InstantiateFn>> = match type_tok.kind {
            TokenKind::Void => return Err(self.semantic("Variables cannot be of type void")),
            TokenKind::Int => None,
            _ => {
                let name = self.text(&type_tok);
                let Some(entry) = self.c.symbols.class(name) else {
                    return Err(self.semantic(format!("Unknown type '{name}'")));
                };
                let Some(instantiate) = entry.instantiate.clone() else {
                    return Err(self.semantic(format!(
                        "Cannot instantiate instances of class type '{name}'"
                    )));
                };
                Some(instantiate)
            }
        };

        loop {
            let tok = self.next()?;
            if !tok.is(TokenKind::Ident) {
                return Err(CompileError::syntax("Expected variable name", tok.span.start));
            }
            let name = self.text(&tok);
            let offset = tok.span.start;

            match &instantiate {
                None => {
                    self.c
                        .define_integer_variable(name)
                        .map_err(|e| CompileError::semantic(e.to_string(), offset))?;
                }
                Some(instantiate) => {
                    self.c
                        .symbols
                        .check_new_variable(name)
                        .map_err(|e| CompileError::semantic(e.to_string(), offset))?;
                    let init = if self.eat(TokenKind::Colon)? {
                        Some(self.data_value()?)
                    } else {
                        None
                    };
                    let result = instantiate(self.c, name, init.as_ref());
                    self.host_result(result, offset)?;
                }
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

    /// `function <int|void> name() ;` or `function <int|void> name() { ... }`
    fn function(&mut self) -> Result<(), CompileError> {
        let tok = self.next()?;
        let return_type = match tok.kind {
            TokenKind::Int => ValueType::Int,
            TokenKind::Void => ValueType::Void,
            _ => {
                return Err(CompileError::syntax(
                    "Return type expected (int or void)",
                    tok.span.start,
                ))
            }
        };

        let name_tok = self.next()?;
        if !name_tok.is(TokenKind::Ident) {
            return Err(CompileError::syntax("Function name expected", name_tok.span.start));
        }
        let name = self.text(&name_tok);
        let offset = name_tok.span.start;

        let (id, already_defined) = match self.c.symbols.function(name) {
            Some(id) => {
                let Some(existing) = self.c.domain.function(id) else {
                    return Err(CompileError::internal("Function table out of step", offset));
                };
                if existing.return_type != return_type {
                    return Err(self.semantic(format!(
                        "Function '{name}' previously declared with different return type"
                    )));
                }
                (id, existing.is_defined())
            }
            None => {
                if self.c.domain.functions.len() >= MAX_FUNCTIONS {
                    return Err(self.semantic("Named function count limit exceeded (256 max)"));
                }
                if self.c.symbols.variable(name).is_some() {
                    return Err(self.semantic("Variable with same name has already been declared"));
                }
                let id = self.c.domain.add_function(Function::new(name, return_type));
                self.c.effects.add_function(id, SuspendMask::all());
                self.c.symbols.insert_function(name, id);
                (id, false)
            }
        };

        self.expect(TokenKind::LParen, "Expected '('")?;
        self.expect(TokenKind::RParen, "Expected ')'")?;

        let tok = self.next()?;
        let definition = Definition {
            source: Rc::clone(&self.source),
            offset,
        };
        if tok.is(TokenKind::Semicolon) {
            if let Some(info) = self.c.effects.info_mut(id) {
                info.definition.get_or_insert(definition);
            }
            return Ok(());
        }
        if already_defined {
            return Err(self.semantic(format!("Function '{name}' has already been declared")));
        }
        if !tok.is(TokenKind::LBrace) {
            return Err(CompileError::syntax("Expected '{'", tok.span.start));
        }
        if let Some(info) = self.c.effects.info_mut(id) {
            info.definition = Some(definition);
        }

        self.compile_body(id, return_type, ConditionalMask::empty())?;
        self.expect(TokenKind::RBrace, "Expected '}' at end of function")?;
        Ok(())
    }

    /// `event "name": function { ... };`
    fn event(&mut self) -> Result<(), CompileError> {
        let tok = self.next()?;
        if !tok.is(TokenKind::StringLiteral) {
            return Err(CompileError::syntax("Event name expected", tok.span.start));
        }
        let name = self.text(&tok);
        self.expect(TokenKind::Colon, "Expected ':' after event name")?;

        let value = self.data_value()?;
        let Some(fragment) = value.as_script() else {
            return Err(CompileError::semantic("Expected inline script", value.offset));
        };
        self.expect(TokenKind::Semicolon, "Expected ';' at end of event binding")?;

        let Some(mut handler) = self.c.handlers.event.take() else {
            return Err(CompileError::semantic(
                format!("No handler for event '{name}'"),
                tok.span.start,
            ));
        };
        debug!(event = name, "binding event");
        let result = handler(self.c, name, fragment);
        self.c.handlers.event.get_or_insert(handler);
        self.host_result(result, value.offset)
    }

    /// `option "name": value;`
    fn option(&mut self) -> Result<(), CompileError> {
        let tok = self.next()?;
        if !tok.is(TokenKind::StringLiteral) {
            return Err(CompileError::syntax("Option name expected", tok.span.start));
        }
        let name = self.text(&tok);
        self.expect(TokenKind::Colon, "Expected ':' after option name")?;
        let value = self.data_value()?;
        self.expect(TokenKind::Semicolon, "Expected ';' at end of option")?;

        if name == "debug" {
            return self.debug_option(&value, tok.span.start);
        }

        let Some(mut handler) = self.c.handlers.option.take() else {
            return Err(CompileError::semantic(
                format!("Unknown option '{name}'"),
                tok.span.start,
            ));
        };
        let result = handler(self.c, name, &value);
        self.c.handlers.option.get_or_insert(handler);
        self.host_result(result, value.offset)
    }

    fn debug_option(&mut self, value: &DataValue, offset: u32) -> Result<(), CompileError> {
        if !self.c.domain.functions.is_empty() || self.c.deferred.has_queued() {
            return Err(CompileError::semantic(
                "Option 'debug' must be set before any functions are declared",
                offset,
            ));
        }
        let Some(v) = value.as_int() else {
            return Err(CompileError::semantic(
                "Option 'debug' value must be an integer",
                value.offset,
            ));
        };
        self.c.debug = v != 0;
        debug!(debug = self.c.debug, "debug code generation");
        Ok(())
    }
}
