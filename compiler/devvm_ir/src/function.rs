//! Compiled function artifacts.

use std::fmt;

use crate::class::NativeEntry;
use crate::types::ValueType;

/// Index of a function in its domain's function table.
///
/// Named functions occupy the low indices so a call instruction can encode
/// the index in one byte.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
pub struct FunctionId(pub u32);

impl FunctionId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Finished body of a function.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FunctionBody {
    pub bytecode: Vec<u8>,
    /// Native methods referenced by the body's method-call instructions.
    pub method_table: Vec<NativeEntry>,
    /// Evaluation stack cells plus local slots the VM must reserve.
    pub stack_slots: u32,
    pub local_slots: u32,
}

/// A script function.
///
/// Created empty when first declared or referenced and filled exactly once
/// when its body is compiled.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub return_type: ValueType,
    pub body: Option<FunctionBody>,
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: ValueType) -> Self {
        Function {
            name: name.into(),
            return_type,
            body: None,
        }
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        self.body.is_some()
    }
}
