//! Data values and inline scripts.
//!
//! ```text
//! value  := array | object | 'function' '{' ... '}' | constant | ident
//! array  := '[' (value (',' value)*)? ']'
//! object := '{' (ident ':' value (',' ident ':' value)*)? '}'
//! ```
//!
//! Inline scripts are not parsed here: the tokens between the braces are
//! only scanned for brace balance and captured as a [`ScriptFragment`].

use std::rc::Rc;

use devvm_diagnostic::CompileError;
use devvm_ir::{
    hash_member_name, DataMember, DataValue, DataValueKind, ScriptFragment, Span, TypeClass,
};
use devvm_lexer::TokenKind;
use rustc_hash::FxHashSet;

use super::Parser;
use crate::stack::ensure_sufficient_stack;

impl Parser<'_, '_> {
    pub(crate) fn data_value(&mut self) -> Result<DataValue, CompileError> {
        ensure_sufficient_stack(|| self.data_value_inner())
    }

    fn data_value_inner(&mut self) -> Result<DataValue, CompileError> {
        let tok = self.next()?;
        let offset = tok.span.start;
        let kind = match tok.kind {
            TokenKind::LBracket => DataValueKind::Array(self.data_array()?),
            TokenKind::LBrace => DataValueKind::Object(self.data_object()?),
            TokenKind::Function => DataValueKind::Script(self.inline_script()?),
            TokenKind::Integer(v) => DataValueKind::Int(v),
            TokenKind::True => DataValueKind::Int(1),
            TokenKind::False => DataValueKind::Int(0),
            TokenKind::StringLiteral => {
                let text = self.text(&tok);
                check_printable(text, offset)?;
                DataValueKind::String(text.to_owned())
            }
            TokenKind::Ident => {
                let name = self.text(&tok);
                let Some(ty) = self.c.symbols.variable(name) else {
                    return Err(self.semantic(format!("Unknown variable '{name}'")));
                };
                let (TypeClass::ObjectLvalue, Some(class)) = (ty.class, ty.object_class) else {
                    return Err(self.semantic("Expected constant value"));
                };
                let handle = self
                    .c
                    .domain
                    .globals
                    .get(ty.index as usize)
                    .map_or(0, |&v| u32::from_ne_bytes(v.to_ne_bytes()));
                DataValueKind::RuntimeObject { class, handle }
            }
            _ => {
                return Err(CompileError::semantic(
                    "Cannot use this type in a data object",
                    offset,
                ))
            }
        };
        Ok(DataValue::new(kind, offset))
    }

    fn data_array(&mut self) -> Result<Vec<DataValue>, CompileError> {
        let mut items = Vec::new();
        if self.eat(TokenKind::RBracket)? {
            return Ok(items);
        }
        loop {
            items.push(self.data_value()?);
            let tok = self.next()?;
            match tok.kind {
                TokenKind::RBracket => return Ok(items),
                TokenKind::Comma => {}
                _ => {
                    return Err(CompileError::syntax(
                        "Expected ',' or ']' after data array element",
                        tok.span.start,
                    ))
                }
            }
        }
    }

    fn data_object(&mut self) -> Result<Vec<DataMember>, CompileError> {
        let mut members: Vec<DataMember> = Vec::new();
        let mut seen: FxHashSet<(u32, &str)> = FxHashSet::default();
        if self.eat(TokenKind::RBrace)? {
            return Ok(members);
        }
        loop {
            let tok = self.next()?;
            if !tok.is(TokenKind::Ident) {
                return Err(CompileError::syntax("Expected data member name", tok.span.start));
            }
            let name = self.text(&tok);
            self.expect(TokenKind::Colon, "Expected ':' after data member name")?;

            let name_hash = hash_member_name(name);
            if !seen.insert((name_hash, name)) {
                return Err(CompileError::semantic(
                    format!("Member '{name}' has already been defined in this object"),
                    tok.span.start,
                ));
            }
            let value = self.data_value()?;
            members.push(DataMember {
                name_hash,
                name: name.to_owned(),
                value,
            });

            let sep = self.next()?;
            match sep.kind {
                TokenKind::RBrace => return Ok(members),
                TokenKind::Comma => {}
                _ => {
                    return Err(CompileError::syntax(
                        format!("Expected ',' or '}}' after data object member '{name}'"),
                        sep.span.start,
                    ))
                }
            }
        }
    }

    /// Capture `{ ... }` after `function`, balancing braces.
    ///
    /// Lexical errors inside the braces surface now; anything else waits
    /// until the fragment is compiled.
    pub(super) fn inline_script(&mut self) -> Result<ScriptFragment, CompileError> {
        let open = self.expect(TokenKind::LBrace, "Expected '{' after 'function'")?;
        let mut depth = 1u32;
        loop {
            let tok = self.next()?;
            match tok.kind {
                TokenKind::End => {
                    return Err(CompileError::syntax(
                        "End of file encountered while parsing inline function",
                        tok.span.start,
                    ))
                }
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        let span = Span::new(open.span.end, tok.span.start);
                        return Ok(ScriptFragment::new(Rc::clone(&self.source), span));
                    }
                }
                _ => {}
            }
        }
    }
}

/// String literals are restricted to printable ASCII. The lexer accepts
/// tabs inside quotes, so this is where the character rule is enforced.
pub(super) fn check_printable(text: &str, offset: u32) -> Result<(), CompileError> {
    if text.bytes().all(|b| (0x20..0x7F).contains(&b)) {
        Ok(())
    } else {
        Err(CompileError::lexical(
            "String literals can only contain printable ASCII characters",
            offset,
        ))
    }
}
