//! Function bodies waiting to be compiled.
//!
//! Inline `function { ... }` literals and host-requested compiles are not
//! parsed where they appear: the fragment is captured and queued, and
//! [`crate::Compiler::compile_deferred`] drains the queue once every
//! top-level declaration is visible. Compiling a queued body may queue
//! more (nested literals), so the queue is drained by index, not by
//! iterator.

use devvm_ir::{ConditionalMask, FunctionId, ScriptFragment, ValueType};

#[derive(Clone, Debug)]
pub(crate) struct DeferredCompile {
    pub(crate) function: FunctionId,
    pub(crate) return_type: ValueType,
    pub(crate) fragment: ScriptFragment,
    pub(crate) conditional: ConditionalMask,
}

#[derive(Default, Debug)]
pub(crate) struct DeferredQueue {
    items: Vec<DeferredCompile>,
    next: usize,
}

impl DeferredQueue {
    pub(crate) fn push(&mut self, item: DeferredCompile) {
        self.items.push(item);
    }

    /// Next body to compile, in the order they were queued.
    pub(crate) fn pop(&mut self) -> Option<DeferredCompile> {
        let item = self.items.get(self.next).cloned()?;
        self.next += 1;
        Some(item)
    }

    /// Whether anything was ever queued, compiled or not.
    pub(crate) fn has_queued(&self) -> bool {
        !self.items.is_empty()
    }

    pub(crate) fn pending(&self) -> usize {
        self.items.len() - self.next
    }
}
