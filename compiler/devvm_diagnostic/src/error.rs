//! Error types.

use std::fmt;

use devvm_ir::DataValue;

use crate::span_utils;

/// Broad category of a compile error.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorKind {
    /// Bad character, unterminated string, malformed `$` sigil.
    Lexical,
    /// Unexpected token or missing punctuation.
    Syntax,
    /// Well-formed input that breaks a language rule.
    Semantic,
    /// A compiler defect: unresolved branch label or bytecode the verifier
    /// rejected.
    Internal,
}

impl ErrorKind {
    /// Text rendered before the message.
    pub const fn prefix(self) -> &'static str {
        match self {
            ErrorKind::Internal => "Internal compiler error: ",
            _ => "",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Lexical => "lexical",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Semantic => "semantic",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// The error that aborted a compile unit.
#[derive(Clone, Eq, PartialEq, Debug, thiserror::Error)]
#[error("{}{}", .kind.prefix(), .message)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    /// Absolute byte offset into the compile unit's source.
    pub offset: u32,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, offset: u32) -> Self {
        CompileError {
            kind,
            message: message.into(),
            offset,
        }
    }

    pub fn lexical(message: impl Into<String>, offset: u32) -> Self {
        Self::new(ErrorKind::Lexical, message, offset)
    }

    pub fn syntax(message: impl Into<String>, offset: u32) -> Self {
        Self::new(ErrorKind::Syntax, message, offset)
    }

    pub fn semantic(message: impl Into<String>, offset: u32) -> Self {
        Self::new(ErrorKind::Semantic, message, offset)
    }

    pub fn internal(message: impl Into<String>, offset: u32) -> Self {
        Self::new(ErrorKind::Internal, message, offset)
    }

    /// 1-based (line, column) of the error in `source`.
    pub fn line_col(&self, source: &str) -> (u32, u32) {
        span_utils::offset_to_line_col(source, self.offset)
    }
}

/// Failure reported by a host callback.
#[derive(Clone, Eq, PartialEq, Debug, thiserror::Error)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
    /// Where the problem is, when the host knows better than the parser.
    pub offset: Option<u32>,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        HostError {
            message: message.into(),
            offset: None,
        }
    }

    /// An error pointing at a specific source offset.
    pub fn at(message: impl Into<String>, offset: u32) -> Self {
        HostError {
            message: message.into(),
            offset: Some(offset),
        }
    }

    /// An error pointing at a rejected data value.
    pub fn for_value(message: impl Into<String>, value: &DataValue) -> Self {
        Self::at(message, value.offset)
    }

    /// Convert into a compile error, defaulting to `fallback_offset` when
    /// the host gave no position.
    pub fn into_compile_error(self, fallback_offset: u32) -> CompileError {
        CompileError::semantic(self.message, self.offset.unwrap_or(fallback_offset))
    }
}

#[cfg(test)]
mod tests;
