//! Pull-based lexer with one token of pushback.

use devvm_diagnostic::CompileError;
use devvm_ir::Span;
use logos::Logos;

use crate::raw_token::{RawToken, Sigil};
use crate::{Token, TokenKind};

/// Lexer over a byte range of a compile unit.
///
/// Offsets in returned tokens are absolute in the unit's full source, so a
/// lexer started on an inline function body reports positions in the
/// original file.
pub struct Lexer<'s> {
    source: &'s str,
    raw: logos::Lexer<'s, RawToken>,
    base: u32,
    end: u32,
    pushback: Option<Token>,
    last: Span,
    error: Option<CompileError>,
}

impl<'s> Lexer<'s> {
    /// Lex the whole of `source`.
    pub fn new(source: &'s str) -> Self {
        Self::with_range(source, Span::from_range(0..source.len()))
    }

    /// Lex `range` of `source`. An out-of-bounds range lexes as empty.
    pub fn with_range(source: &'s str, range: Span) -> Self {
        let text = source.get(range.to_range()).unwrap_or("");
        Lexer {
            source,
            raw: RawToken::lexer(text),
            base: range.start,
            end: range.start + Span::from_range(0..text.len()).end,
            pushback: None,
            last: Span::point(range.start),
            error: None,
        }
    }

    /// Next token. `TokenKind::End` repeats once input is exhausted.
    pub fn next(&mut self) -> Result<Token, CompileError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if let Some(tok) = self.pushback.take() {
            self.last = tok.span;
            return Ok(tok);
        }

        let Some(raw) = self.raw.next() else {
            let tok = Token {
                kind: TokenKind::End,
                span: Span::point(self.end),
            };
            self.last = tok.span;
            return Ok(tok);
        };

        let span = Span::from_range(self.raw.span()).offset_by(self.base);
        self.last = span;
        match raw {
            Ok(raw) => Ok(Token {
                kind: convert(raw),
                span,
            }),
            Err(()) => {
                let err = self.classify_error(span);
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&mut self) -> Result<Token, CompileError> {
        let last = self.last;
        let tok = self.next()?;
        self.push_back(tok);
        self.last = last;
        Ok(tok)
    }

    /// Return `tok` to the stream. Only one token can be pending.
    pub fn push_back(&mut self, tok: Token) {
        debug_assert!(self.pushback.is_none(), "lexer pushback slot already in use");
        self.pushback = Some(tok);
    }

    /// Span of the most recently returned token.
    pub fn last_span(&self) -> Span {
        self.last
    }

    /// Source text covered by `span`.
    pub fn slice(&self, span: Span) -> &'s str {
        self.source.get(span.to_range()).unwrap_or("")
    }

    /// Identifier text: the name for `Ident`, the name without `$` for
    /// `SpecialIdent`, the content without quotes for `StringLiteral`.
    pub fn text(&self, tok: &Token) -> &'s str {
        let s = self.slice(tok.span);
        match tok.kind {
            TokenKind::SpecialIdent => s.get(1..).unwrap_or(""),
            TokenKind::StringLiteral => s.get(1..s.len().saturating_sub(1)).unwrap_or(""),
            _ => s,
        }
    }

    fn classify_error(&self, span: Span) -> CompileError {
        let text = self.slice(span);
        let offset = span.start;
        match text.chars().next() {
            Some('"' | '\'') => CompileError::lexical("Unterminated string literal", offset),
            Some('$') => CompileError::lexical(
                "Expected hex constant or special variable name after '$'",
                offset,
            ),
            Some(c) if (' '..='~').contains(&c) => {
                CompileError::lexical(format!("Unexpected character '{c}'"), offset)
            }
            _ => {
                let byte = text.bytes().next().unwrap_or(0);
                CompileError::lexical(format!("Unexpected character 0x{byte:02X}"), offset)
            }
        }
    }
}

fn convert(raw: RawToken) -> TokenKind {
    match raw {
        RawToken::If => TokenKind::If,
        RawToken::Return => TokenKind::Return,
        RawToken::Int => TokenKind::Int,
        RawToken::Void => TokenKind::Void,
        RawToken::Function => TokenKind::Function,
        RawToken::Else => TokenKind::Else,
        RawToken::True => TokenKind::True,
        RawToken::False => TokenKind::False,
        RawToken::Loop => TokenKind::Loop,
        RawToken::Break => TokenKind::Break,
        RawToken::Do => TokenKind::Do,
        RawToken::While => TokenKind::While,
        RawToken::Event => TokenKind::Event,
        RawToken::Option => TokenKind::Option,
        RawToken::Shl => TokenKind::Shl,
        RawToken::Shr => TokenKind::Shr,
        RawToken::LtEq => TokenKind::LtEq,
        RawToken::GtEq => TokenKind::GtEq,
        RawToken::EqEq => TokenKind::EqEq,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::AndAnd => TokenKind::AndAnd,
        RawToken::OrOr => TokenKind::OrOr,
        RawToken::Increment => TokenKind::Increment,
        RawToken::Decrement => TokenKind::Decrement,
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::Lt => TokenKind::Lt,
        RawToken::Gt => TokenKind::Gt,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::Assign => TokenKind::Assign,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Semicolon => TokenKind::Semicolon,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Amp => TokenKind::Amp,
        RawToken::Caret => TokenKind::Caret,
        RawToken::Pipe => TokenKind::Pipe,
        RawToken::Tilde => TokenKind::Tilde,
        RawToken::Percent => TokenKind::Percent,
        RawToken::Bang => TokenKind::Bang,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Integer(v) | RawToken::Dollar(Sigil::Hex(v)) => {
            TokenKind::Integer(i32::from_ne_bytes(v.to_ne_bytes()))
        }
        RawToken::Dollar(Sigil::Special) => TokenKind::SpecialIdent,
        RawToken::String => TokenKind::StringLiteral,
        RawToken::Ident => TokenKind::Ident,
    }
}
