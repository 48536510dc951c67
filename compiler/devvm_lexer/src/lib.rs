//! Lexer for the device-script language.
//!
//! Tokenization is done by a logos-derived scanner (`raw_token`); this
//! crate wraps it with what the parser needs:
//! - absolute source offsets, even when lexing a fragment of a larger unit
//! - one token of pushback
//! - a latched first error: once a lexical error is hit, every later call
//!   returns the same error

mod lexer;
mod raw_token;

pub use lexer::Lexer;

use std::fmt;

use devvm_ir::Span;

/// Token kinds.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TokenKind {
    /// End of input.
    End,

    /// Decimal or `$`-hex integer constant.
    Integer(i32),
    /// Quoted string; the token span covers the quotes.
    StringLiteral,
    Ident,
    /// `$name`; the token span covers the `$`.
    SpecialIdent,

    If,
    Return,
    Int,
    Void,
    Function,
    Else,
    True,
    False,
    Loop,
    Break,
    Do,
    While,
    Event,
    Option,

    Shl,
    Shr,
    LtEq,
    GtEq,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    /// `++`: recognized so it can be rejected with a clear message.
    Increment,
    /// `--`: recognized so it can be rejected with a clear message.
    Decrement,

    LParen,
    RParen,
    Lt,
    Gt,
    LBracket,
    RBracket,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Semicolon,
    LBrace,
    RBrace,
    Dot,
    Comma,
    Amp,
    Caret,
    Pipe,
    Tilde,
    Percent,
    Bang,
    Colon,
}

impl TokenKind {
    /// How the token is written, for "expected X" messages.
    pub fn display_name(self) -> &'static str {
        match self {
            TokenKind::End => "end of script",
            TokenKind::Integer(_) => "integer",
            TokenKind::StringLiteral => "string literal",
            TokenKind::Ident => "identifier",
            TokenKind::SpecialIdent => "special variable",
            TokenKind::If => "if",
            TokenKind::Return => "return",
            TokenKind::Int => "int",
            TokenKind::Void => "void",
            TokenKind::Function => "function",
            TokenKind::Else => "else",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Loop => "loop",
            TokenKind::Break => "break",
            TokenKind::Do => "do",
            TokenKind::While => "while",
            TokenKind::Event => "event",
            TokenKind::Option => "option",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::LtEq => "<=",
            TokenKind::GtEq => ">=",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Increment => "++",
            TokenKind::Decrement => "--",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Assign => "=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Semicolon => ";",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Dot => ".",
            TokenKind::Comma => ",",
            TokenKind::Amp => "&",
            TokenKind::Caret => "^",
            TokenKind::Pipe => "|",
            TokenKind::Tilde => "~",
            TokenKind::Percent => "%",
            TokenKind::Bang => "!",
            TokenKind::Colon => ":",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Integer(v) => write!(f, "{v}"),
            _ => f.write_str(self.display_name()),
        }
    }
}

/// A token and where it is in the compile unit.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[inline]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}
