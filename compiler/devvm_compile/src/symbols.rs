//! Name tables.
//!
//! Globals, classes, functions, special and thread variables live for the
//! whole compile unit. Locals live in their own table, reset per function
//! and trimmed whenever a block closes.

use std::rc::Rc;

use devvm_ir::{FunctionId, ObjectClass, TypeInfo};
use rustc_hash::FxHashMap;

use crate::host::InstantiateFn;

/// Slots available in each variable bank; slot operands are one byte.
pub(crate) const SLOT_LIMIT: usize = 256;

/// Why a name could not be defined.
#[derive(Clone, Eq, PartialEq, Debug, thiserror::Error)]
pub enum DefineError {
    #[error("Invalid variable name '{0}'")]
    InvalidName(String),
    #[error("'{0}' cannot be declared as a variable because it is a class name")]
    ClassName(String),
    #[error("Variable '{0}' has already been defined")]
    VariableDefined(String),
    #[error("Special variable '${0}' has already been defined")]
    SpecialDefined(String),
    #[error("Local variable '{0}' already declared")]
    LocalDeclared(String),
    #[error("{0} limit exceeded (256 max)")]
    LimitExceeded(&'static str),
}

pub(crate) struct ClassEntry {
    pub(crate) class: &'static ObjectClass,
    pub(crate) instantiate: Option<Rc<InstantiateFn>>,
}

/// A special or thread variable.
#[derive(Copy, Clone, Debug)]
pub(crate) struct BankSlot {
    pub(crate) slot: u8,
    pub(crate) class: Option<&'static ObjectClass>,
}

#[derive(Default)]
pub(crate) struct Symbols {
    variables: FxHashMap<String, TypeInfo>,
    classes: FxHashMap<String, ClassEntry>,
    functions: FxHashMap<String, FunctionId>,
    specials: FxHashMap<String, BankSlot>,
    threads: FxHashMap<String, BankSlot>,
}

impl Symbols {
    pub(crate) fn variable(&self, name: &str) -> Option<TypeInfo> {
        self.variables.get(name).copied()
    }

    pub(crate) fn class(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    pub(crate) fn function(&self, name: &str) -> Option<FunctionId> {
        self.functions.get(name).copied()
    }

    pub(crate) fn special(&self, name: &str) -> Option<BankSlot> {
        self.specials.get(name).copied()
    }

    pub(crate) fn thread(&self, name: &str) -> Option<BankSlot> {
        self.threads.get(name).copied()
    }

    /// Check that `name` can become a new global variable.
    pub(crate) fn check_new_variable(&self, name: &str) -> Result<(), DefineError> {
        if !is_valid_name(name) {
            return Err(DefineError::InvalidName(name.to_owned()));
        }
        if self.classes.contains_key(name) {
            return Err(DefineError::ClassName(name.to_owned()));
        }
        if self.variables.contains_key(name) {
            return Err(DefineError::VariableDefined(name.to_owned()));
        }
        Ok(())
    }

    /// Check that `name` can become a new special or thread variable.
    ///
    /// Both banks share the `$name` namespace.
    pub(crate) fn check_new_bank_name(&self, name: &str) -> Result<(), DefineError> {
        if !is_valid_name(name) {
            return Err(DefineError::InvalidName(name.to_owned()));
        }
        if self.specials.contains_key(name) || self.threads.contains_key(name) {
            return Err(DefineError::SpecialDefined(name.to_owned()));
        }
        Ok(())
    }

    pub(crate) fn insert_variable(&mut self, name: &str, ty: TypeInfo) {
        self.variables.insert(name.to_owned(), ty);
    }

    /// Register `class`, or update its instantiation callback.
    pub(crate) fn define_class(
        &mut self,
        class: &'static ObjectClass,
        instantiate: Option<Rc<InstantiateFn>>,
    ) {
        let entry = self
            .classes
            .entry(class.name.to_owned())
            .or_insert(ClassEntry {
                class,
                instantiate: None,
            });
        debug_assert!(ObjectClass::same(entry.class, class), "class name registered twice");
        if instantiate.is_some() {
            entry.instantiate = instantiate;
        }
    }

    pub(crate) fn insert_function(&mut self, name: &str, id: FunctionId) {
        self.functions.insert(name.to_owned(), id);
    }

    pub(crate) fn insert_special(&mut self, name: &str, slot: BankSlot) {
        self.specials.insert(name.to_owned(), slot);
    }

    pub(crate) fn insert_thread(&mut self, name: &str, slot: BankSlot) {
        self.threads.insert(name.to_owned(), slot);
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Local variables of the function being compiled.
///
/// Slots are handed out in declaration order and never reused within a
/// function, even after the declaring block closes: there is no liveness
/// analysis, so a reused slot could expose a dead local's stale value.
#[derive(Default, Debug)]
pub(crate) struct Locals {
    names: FxHashMap<String, u32>,
    slots_used: u32,
}

impl Locals {
    pub(crate) fn lookup(&self, name: &str) -> Option<TypeInfo> {
        self.names.get(name).map(|&slot| TypeInfo::local_lvalue(slot))
    }

    /// Declare `name` in the current block and return its slot.
    pub(crate) fn declare(&mut self, name: &str) -> Result<u32, DefineError> {
        if self.names.contains_key(name) {
            return Err(DefineError::LocalDeclared(name.to_owned()));
        }
        if self.slots_used as usize >= SLOT_LIMIT {
            return Err(DefineError::LimitExceeded("Local variable"));
        }
        let slot = self.slots_used;
        self.slots_used += 1;
        self.names.insert(name.to_owned(), slot);
        Ok(slot)
    }

    /// Mark for [`Locals::close_block`].
    pub(crate) fn open_block(&self) -> u32 {
        self.slots_used
    }

    /// Forget locals declared since `mark`; their slots stay allocated.
    pub(crate) fn close_block(&mut self, mark: u32) {
        if self.slots_used != mark {
            self.names.retain(|_, slot| *slot < mark);
        }
    }

    pub(crate) fn slots_used(&self) -> u32 {
        self.slots_used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(is_valid_name("a"));
        assert!(is_valid_name("_tmp2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("2x"));
        assert!(!is_valid_name("a-b"));
    }

    #[test]
    fn sibling_blocks_may_reuse_names_but_not_slots() {
        let mut locals = Locals::default();
        let mark = locals.open_block();
        assert_eq!(locals.declare("i"), Ok(0));
        assert!(locals.declare("i").is_err());
        locals.close_block(mark);
        assert!(locals.lookup("i").is_none());

        let mark = locals.open_block();
        assert_eq!(locals.declare("i"), Ok(1));
        locals.close_block(mark);
        assert_eq!(locals.slots_used(), 2);
    }

    #[test]
    fn outer_locals_stay_visible() {
        let mut locals = Locals::default();
        assert_eq!(locals.declare("a"), Ok(0));
        let mark = locals.open_block();
        assert_eq!(locals.declare("b"), Ok(1));
        locals.close_block(mark);
        assert_eq!(locals.lookup("a"), Some(TypeInfo::local_lvalue(0)));
        assert!(locals.declare("a").is_err());
    }

    #[test]
    fn class_names_are_reserved() {
        static PORT: ObjectClass = ObjectClass {
            name: "Port",
            methods: &[],
        };
        let mut symbols = Symbols::default();
        symbols.define_class(&PORT, None);
        assert_eq!(
            symbols.check_new_variable("Port").unwrap_err().to_string(),
            "'Port' cannot be declared as a variable because it is a class name"
        );
        assert!(symbols.check_new_variable("port").is_ok());
    }

    #[test]
    fn local_slot_limit() {
        let mut locals = Locals::default();
        for i in 0..SLOT_LIMIT {
            assert!(locals.declare(&format!("v{i}")).is_ok());
        }
        let err = locals.declare("overflow").unwrap_err();
        assert_eq!(err.to_string(), "Local variable limit exceeded (256 max)");
    }
}
