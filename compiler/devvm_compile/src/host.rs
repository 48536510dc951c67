//! Callbacks into the embedding application.
//!
//! Each callback receives the compiler itself, so a handler can register
//! more symbols or queue a deferred compile (the usual response to an
//! event binding) before returning.

use devvm_diagnostic::HostError;
use devvm_ir::{DataValue, ScriptFragment};

use crate::Compiler;

/// Called for each variable declared with a class type:
/// `(compiler, variable name, optional initializer)`.
pub type InstantiateFn =
    dyn Fn(&mut Compiler, &str, Option<&DataValue>) -> Result<(), HostError>;

/// Called for `event "name": function { ... };`.
pub type EventHandler =
    Box<dyn FnMut(&mut Compiler, &str, &ScriptFragment) -> Result<(), HostError>>;

/// Called for `option "name": value;` except options the compiler handles
/// itself.
pub type OptionHandler = Box<dyn FnMut(&mut Compiler, &str, &DataValue) -> Result<(), HostError>>;

#[derive(Default)]
pub(crate) struct Handlers {
    pub(crate) event: Option<EventHandler>,
    pub(crate) option: Option<OptionHandler>,
}
