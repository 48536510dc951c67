//! Diagnostics for the device-script compiler.
//!
//! A compile unit reports at most one error: the first one raised, with
//! the byte offset it was raised at. `span_utils` turns that offset into a
//! 1-based (line, column) pair for display.

mod error;
pub mod span_utils;

pub use error::{CompileError, ErrorKind, HostError};
