//! Single-pass compiler for the device-script language.
//!
//! The grammar emits bytecode as it parses; there is no syntax tree. A
//! compile unit goes through:
//! 1. host registration: classes, global/special/thread variables, and the
//!    event and option handlers
//! 2. [`Compiler::compile_file`]: top-level declarations, with named
//!    function bodies compiled in place
//! 3. [`Compiler::compile_deferred`]: queued inline bodies, the check for
//!    functions that were declared but never defined, and suspension-effect
//!    propagation over the call graph
//!
//! Each finished body is checked by `devvm_verify` before it is stored in
//! the [`Domain`]. The first error stops the unit and is latched: every
//! later call returns it again.

mod deferred;
mod effects;
mod emit;
mod grammar;
mod host;
mod stack;
mod symbols;

use std::rc::Rc;

use devvm_ir::{
    ConditionalMask, Domain, Function, FunctionId, GlobalObject, HostObject, ObjectClass,
    ScriptFragment, Span, SuspendMask, TypeInfo, ValueType,
};
use tracing::{debug, info};

use crate::deferred::{DeferredCompile, DeferredQueue};
use crate::effects::{Definition, Effects};
use crate::grammar::Parser;
use crate::host::Handlers;
use crate::symbols::{BankSlot, Symbols, SLOT_LIMIT};

pub use crate::host::{EventHandler, InstantiateFn, OptionHandler};
pub use crate::symbols::DefineError;
pub use devvm_diagnostic::{CompileError, ErrorKind, HostError};

/// Named functions per compile unit; call operands are one byte.
pub const MAX_FUNCTIONS: usize = 256;
/// External method call sites per function.
pub const MAX_CALLS: usize = 256;

/// Compiler configuration.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct CompileOptions {
    /// Keep `[debug]` statements and drop `[!debug]` ones. Scripts can
    /// override this with `option "debug": N;` before any function.
    pub debug: bool,
}

/// The first error of the unit and the text its offset refers to.
struct Latched {
    error: CompileError,
    source: Option<Rc<str>>,
}

/// A compile unit in progress.
pub struct Compiler {
    domain: Domain,
    symbols: Symbols,
    effects: Effects,
    deferred: DeferredQueue,
    /// Interned function-pointer signatures, by return type. Index 0 is
    /// always `void()`.
    fn_ptr_signatures: Vec<ValueType>,
    special_referenced: Vec<bool>,
    debug: bool,
    anonymous_count: u32,
    handlers: Handlers,
    /// Source being parsed, for error positions.
    current_source: Option<Rc<str>>,
    error: Option<Latched>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Compiler {
            domain: Domain::new(),
            symbols: Symbols::default(),
            effects: Effects::default(),
            deferred: DeferredQueue::default(),
            fn_ptr_signatures: vec![ValueType::Void],
            special_referenced: Vec::new(),
            debug: options.debug,
            anonymous_count: 0,
            handlers: Handlers::default(),
            current_source: None,
            error: None,
        }
    }

    /// `[A-Za-z_][A-Za-z0-9_]*`
    pub fn is_valid_variable_name(name: &str) -> bool {
        symbols::is_valid_name(name)
    }

    /// Reserve a global integer variable, initially 0. Returns its slot.
    pub fn define_integer_variable(&mut self, name: &str) -> Result<u32, DefineError> {
        self.symbols.check_new_variable(name)?;
        let slot = self.reserve_global(0)?;
        self.symbols.insert_variable(name, TypeInfo::global_lvalue(slot));
        Ok(slot)
    }

    /// Bind a host object to a new global variable. The slot's initial
    /// value is the object's handle in the domain object table.
    pub fn define_object_variable(
        &mut self,
        name: &str,
        object: HostObject,
    ) -> Result<u32, DefineError> {
        self.symbols.check_new_variable(name)?;
        let slot = self.reserve_global(0)?;
        self.define_class(object.class);
        let handle = self.domain.add_object(GlobalObject::Host(object));
        if let Some(value) = self.domain.globals.get_mut(slot as usize) {
            *value = handle_value(handle);
        }
        self.symbols
            .insert_variable(name, TypeInfo::object_lvalue(slot, object.class));
        Ok(slot)
    }

    /// Reserve a special variable (`$name`), initially 0.
    pub fn define_special_variable(&mut self, name: &str) -> Result<u32, DefineError> {
        self.symbols.check_new_bank_name(name)?;
        let slot = self.reserve_special(0)?;
        self.symbols.insert_special(
            name,
            BankSlot {
                slot: bank_slot(slot),
                class: None,
            },
        );
        Ok(slot)
    }

    /// Bind a host object to a new special variable.
    pub fn define_special_object_variable(
        &mut self,
        name: &str,
        object: HostObject,
    ) -> Result<u32, DefineError> {
        self.symbols.check_new_bank_name(name)?;
        let slot = self.reserve_special(0)?;
        self.define_class(object.class);
        let handle = self.domain.add_object(GlobalObject::Host(object));
        if let Some(value) = self.domain.special_vars.get_mut(slot as usize) {
            *value = handle_value(handle);
        }
        self.symbols.insert_special(
            name,
            BankSlot {
                slot: bank_slot(slot),
                class: Some(object.class),
            },
        );
        Ok(slot)
    }

    /// Reserve a per-thread variable (`$name`).
    pub fn define_thread_variable(&mut self, name: &str) -> Result<u32, DefineError> {
        self.symbols.check_new_bank_name(name)?;
        let slot = self.domain.thread_var_count;
        if slot as usize >= SLOT_LIMIT {
            return Err(DefineError::LimitExceeded("Thread variable"));
        }
        self.domain.thread_var_count += 1;
        self.symbols.insert_thread(
            name,
            BankSlot {
                slot: bank_slot(slot),
                class: None,
            },
        );
        Ok(slot)
    }

    /// Register `class` so scripts can name it. Registering the same class
    /// again is harmless.
    pub fn define_class(&mut self, class: &'static ObjectClass) {
        self.symbols.define_class(class, None);
    }

    /// Register `class` and attach (or replace) the callback run for each
    /// script variable declared with it.
    pub fn define_class_with<F>(&mut self, class: &'static ObjectClass, instantiate: F)
    where
        F: Fn(&mut Compiler, &str, Option<&devvm_ir::DataValue>) -> Result<(), HostError>
            + 'static,
    {
        let instantiate: Rc<InstantiateFn> = Rc::new(instantiate);
        self.symbols.define_class(class, Some(instantiate));
    }

    /// Type of a global variable.
    pub fn variable(&self, name: &str) -> Option<TypeInfo> {
        self.symbols.variable(name)
    }

    /// Whether compiled code reads the special variable `name`.
    pub fn is_special_variable_referenced(&self, name: &str) -> bool {
        self.symbols
            .special(name)
            .and_then(|s| self.special_referenced.get(usize::from(s.slot)))
            .copied()
            .unwrap_or(false)
    }

    pub fn set_event_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Compiler, &str, &ScriptFragment) -> Result<(), HostError> + 'static,
    {
        self.handlers.event = Some(Box::new(handler));
    }

    pub fn set_option_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Compiler, &str, &devvm_ir::DataValue) -> Result<(), HostError> + 'static,
    {
        self.handlers.option = Some(Box::new(handler));
    }

    /// Queue `fragment` to be compiled as a new anonymous function.
    ///
    /// `allowed` limits the suspension modes the body may use; `conditional`
    /// enables `[debug_read]` attributes (see [`ConditionalMask`]).
    pub fn defer_compile(
        &mut self,
        return_type: ValueType,
        fragment: ScriptFragment,
        allowed: SuspendMask,
        conditional: ConditionalMask,
    ) -> FunctionId {
        self.anonymous_count += 1;
        let name = format!("<anonymous function {}>", self.anonymous_count);
        let id = self.domain.add_function(Function::new(name, return_type));
        self.effects.add_function(id, allowed);
        if let Some(info) = self.effects.info_mut(id) {
            info.definition = Some(Definition {
                source: Rc::clone(fragment.source()),
                offset: fragment.span().start,
            });
        }
        let span = fragment.span();
        self.deferred.push(DeferredCompile {
            function: id,
            return_type,
            fragment,
            conditional,
        });
        debug!(function = %id, %span, pending = self.deferred.pending(), "compile deferred");
        id
    }

    /// Compile the top-level declarations of `source`.
    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    pub fn compile_file(&mut self, source: &str) -> Result<(), CompileError> {
        self.check_latched()?;
        let source: Rc<str> = Rc::from(source);
        self.current_source = Some(Rc::clone(&source));
        let result = Parser::new(self, &source, Span::from_range(0..source.len())).file();
        self.latch(result)
    }

    /// Compile every queued body, then check the unit as a whole.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn compile_deferred(&mut self) -> Result<(), CompileError> {
        self.check_latched()?;
        let result = self.run_deferred();
        self.latch(result)
    }

    /// The latched error, if compilation failed.
    pub fn error(&self) -> Option<&CompileError> {
        self.error.as_ref().map(|l| &l.error)
    }

    /// 1-based line and column of the latched error.
    pub fn error_line_col(&self) -> Option<(u32, u32)> {
        let latched = self.error.as_ref()?;
        let source = latched.source.as_deref().unwrap_or("");
        Some(latched.error.line_col(source))
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn into_domain(self) -> Domain {
        self.domain
    }

    /// Suspension modes `id` was found to need.
    pub fn required_suspend_modes(&self, id: FunctionId) -> SuspendMask {
        self.effects.required(id)
    }

    /// Suspension modes the contexts calling `id` permit.
    pub fn allowed_suspend_modes(&self, id: FunctionId) -> SuspendMask {
        self.effects.allowed(id)
    }

    fn run_deferred(&mut self) -> Result<(), CompileError> {
        let mut compiled = 0u32;
        while let Some(item) = self.deferred.pop() {
            let source = Rc::clone(item.fragment.source());
            self.current_source = Some(Rc::clone(&source));
            Parser::new(self, &source, item.fragment.span()).deferred_body(&item)?;
            compiled += 1;
        }
        debug!(compiled, "deferred queue drained");

        let undefined = self
            .domain
            .functions
            .iter()
            .position(|f| !f.is_defined())
            .map(|index| FunctionId(table_slot(index)));
        if let Some(id) = undefined {
            let offset = self.definition_offset(id);
            return Err(CompileError::semantic(
                format!("Function '{}' declared but not defined", self.function_name(id)),
                offset,
            ));
        }

        match self.effects.propagate() {
            Ok(rounds) => {
                info!(
                    functions = self.domain.functions.len(),
                    rounds, "compile unit complete"
                );
                Ok(())
            }
            Err(conflict) => {
                debug!(
                    caller = %conflict.caller,
                    callee = %conflict.callee,
                    modes = %conflict.modes.describe(),
                    "suspension conflict"
                );
                let offset = self.definition_offset(conflict.caller);
                Err(CompileError::semantic(
                    format!(
                        "Function {}() can suspend in a mode not allowed by calling function {}()",
                        self.function_name(conflict.callee),
                        self.function_name(conflict.caller),
                    ),
                    offset,
                ))
            }
        }
    }

    /// Offset of `id`'s body (or declaration), switching the error source
    /// to the text it lives in.
    fn definition_offset(&mut self, id: FunctionId) -> u32 {
        match self.effects.info(id).and_then(|i| i.definition.clone()) {
            Some(def) => {
                self.current_source = Some(def.source);
                def.offset
            }
            None => 0,
        }
    }

    fn function_name(&self, id: FunctionId) -> &str {
        self.domain.function(id).map_or("?", |f| f.name.as_str())
    }

    fn check_latched(&self) -> Result<(), CompileError> {
        match &self.error {
            Some(latched) => Err(latched.error.clone()),
            None => Ok(()),
        }
    }

    fn latch<T>(&mut self, result: Result<T, CompileError>) -> Result<T, CompileError> {
        if let Err(err) = &result {
            if self.error.is_none() {
                debug!(offset = err.offset, "compile failed: {err}");
                self.error = Some(Latched {
                    error: err.clone(),
                    source: self.current_source.clone(),
                });
            }
        }
        result
    }

    fn reserve_global(&mut self, value: i32) -> Result<u32, DefineError> {
        let slot = self.domain.globals.len();
        if slot >= SLOT_LIMIT {
            return Err(DefineError::LimitExceeded("Global variable"));
        }
        self.domain.globals.push(value);
        Ok(table_slot(slot))
    }

    fn reserve_special(&mut self, value: i32) -> Result<u32, DefineError> {
        let slot = self.domain.special_vars.len();
        if slot >= SLOT_LIMIT {
            return Err(DefineError::LimitExceeded("Special variable"));
        }
        self.domain.special_vars.push(value);
        self.special_referenced.push(false);
        Ok(table_slot(slot))
    }

    /// Signature index for a pointer to a function returning `ret`.
    fn fn_ptr_signature(&mut self, ret: ValueType) -> u32 {
        let index = match self.fn_ptr_signatures.iter().position(|&t| t == ret) {
            Some(index) => index,
            None => {
                self.fn_ptr_signatures.push(ret);
                self.fn_ptr_signatures.len() - 1
            }
        };
        table_slot(index)
    }
}

#[allow(clippy::cast_possible_truncation)] // bounded by SLOT_LIMIT or the function table
fn table_slot(index: usize) -> u32 {
    index as u32
}

#[allow(clippy::cast_possible_truncation)] // bounded by SLOT_LIMIT
fn bank_slot(slot: u32) -> u8 {
    slot as u8
}

/// Object handles are stored in integer variable slots as raw bits.
fn handle_value(handle: u32) -> i32 {
    i32::from_ne_bytes(handle.to_ne_bytes())
}
