//! Logos-derived tokenizer output, before conversion to `TokenKind`.

use logos::Logos;

/// What followed a `$`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Sigil {
    /// Only hex digits: a hex constant.
    Hex(u32),
    /// Any other identifier characters: a special variable name.
    Special,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\r\n]*")]
pub(crate) enum RawToken {
    #[token("if")]
    If,
    #[token("return")]
    Return,
    #[token("int")]
    Int,
    #[token("void")]
    Void,
    #[token("function")]
    Function,
    #[token("else")]
    Else,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("loop")]
    Loop,
    #[token("break")]
    Break,
    #[token("do")]
    Do,
    #[token("while")]
    While,
    #[token("event")]
    Event,
    #[token("option")]
    Option,

    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("++")]
    Increment,
    #[token("--")]
    Decrement,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token(";")]
    Semicolon,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("&")]
    Amp,
    #[token("^")]
    Caret,
    #[token("|")]
    Pipe,
    #[token("~")]
    Tilde,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token(":")]
    Colon,

    // Decimal integer; overflow wraps like the VM's 32-bit arithmetic
    #[regex(r"[0-9]+", |lex| parse_decimal(lex.slice()))]
    Integer(u32),

    // `$` alone has no payload and is rejected by the callback
    #[regex(r"\$[0-9A-Za-z_]*", |lex| parse_sigil(lex.slice()))]
    Dollar(Sigil),

    #[regex(r#""[^"\r\n]*""#)]
    #[regex(r"'[^'\r\n]*'")]
    String,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

fn parse_decimal(digits: &str) -> u32 {
    digits.bytes().fold(0u32, |acc, b| {
        acc.wrapping_mul(10).wrapping_add(u32::from(b - b'0'))
    })
}

fn parse_sigil(slice: &str) -> Option<Sigil> {
    let name = slice.get(1..)?;
    if name.is_empty() {
        return None;
    }
    let mut value = 0u32;
    for c in name.chars() {
        match c.to_digit(16) {
            Some(d) => value = (value << 4).wrapping_add(d),
            None => return Some(Sigil::Special),
        }
    }
    Some(Sigil::Hex(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_wraps() {
        assert_eq!(parse_decimal("42"), 42);
        assert_eq!(parse_decimal("4294967296"), 0);
    }

    #[test]
    fn sigil_classification() {
        assert_eq!(parse_sigil("$D01F"), Some(Sigil::Hex(0xD01F)));
        assert_eq!(parse_sigil("$ff"), Some(Sigil::Hex(0xFF)));
        assert_eq!(parse_sigil("$pc"), Some(Sigil::Special));
        assert_eq!(parse_sigil("$"), None);
    }
}
