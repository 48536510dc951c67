//! Device-script IR - shared data model.
//!
//! This crate contains the types every phase of the device-script compiler
//! agrees on:
//! - Spans for source locations
//! - Opcodes, their encoding and the static stack-effect table
//! - `TypeInfo`, the short-lived type tag threaded through the grammar
//! - Host class tables (external methods, suspension masks)
//! - Compiled `Function` artifacts and the `Domain` that owns them
//! - `DataValue` trees for configuration values
//!
//! Nothing here knows how to parse or execute; the lexer, compiler and
//! verifier crates build on these definitions and the (external) VM
//! consumes the artifacts.

/// Compile-time assertion that a type has a specific size.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod class;
mod data;
pub mod disasm;
mod domain;
mod flags;
mod function;
pub mod opcode;
mod span;
mod types;

pub use class::{ExternalMethod, NativeEntry, ObjectClass};
pub use data::{hash_member_name, DataMember, DataValue, DataValueKind, ScriptFragment};
pub use domain::{Domain, GlobalObject, HostObject};
pub use flags::{ConditionalMask, MethodFlags, SuspendMask};
pub use function::{Function, FunctionBody, FunctionId};
pub use opcode::{Opcode, PopCount, PushKind, StackEffect};
pub use span::Span;
pub use types::{TypeClass, TypeInfo, ValueType};
