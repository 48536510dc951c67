//! Host class tables.
//!
//! The host exposes its objects to scripts through classes: a name plus a
//! fixed table of native methods. Tables are built by the host once and
//! live for the whole program, so the compiler refers to them by
//! `&'static` reference and compares classes by identity.

use std::fmt;

use crate::flags::{MethodFlags, SuspendMask};
use crate::types::ValueType;

/// Opaque handle of a native method implementation.
///
/// The compiler copies it into a function's call table; only the VM knows
/// what it designates.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct NativeEntry(pub u32);

/// One native method of a host class.
#[derive(Debug)]
pub struct ExternalMethod {
    pub name: &'static str,
    pub return_type: ValueType,
    pub args: &'static [ValueType],
    pub flags: MethodFlags,
    /// Suspension categories the method may use.
    pub suspends: SuspendMask,
    pub entry: NativeEntry,
}

impl ExternalMethod {
    #[inline]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }
}

/// A host class.
pub struct ObjectClass {
    pub name: &'static str,
    pub methods: &'static [ExternalMethod],
}

impl ObjectClass {
    /// Look up a method by name.
    pub fn method(&self, name: &str) -> Option<&'static ExternalMethod> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Identity comparison.
    #[inline]
    pub fn same(a: &ObjectClass, b: &ObjectClass) -> bool {
        std::ptr::eq(a, b)
    }
}

// Method tables point back at classes through argument types; print names
// only to keep the output finite.
impl fmt::Debug for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectClass")
            .field("name", &self.name)
            .field("methods", &self.methods.len())
            .finish()
    }
}
