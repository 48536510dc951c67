//! Bytecode buffer with branch patching.
//!
//! Structured control flow always uses the long (4-byte) branch forms.
//! Forward branches are resolved in one of two ways:
//! - a [`Patch`] for targets known a few instructions later (`if`/`else`,
//!   short-circuit operators): emit a zero placeholder, then
//!   [`Emitter::patch_to_here`] once the target is reached
//! - a [`Label`] for targets known only when an enclosing construct closes
//!   (loop exits, `break`): [`Emitter::branch_to_label`] records a pending
//!   patch, [`Emitter::resolve_label`] fixes all of them at once
//!
//! A body is not finished while any pending patch remains.

use devvm_ir::Opcode;

/// Forward branch target resolved when a loop closes.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) struct Label(u32);

/// Placeholder displacement awaiting [`Emitter::patch_to_here`].
#[derive(Debug)]
#[must_use = "an unpatched branch jumps to the next instruction"]
pub(crate) struct Patch {
    /// Offset just past the 4-byte operand; displacements are relative to it.
    anchor: usize,
}

#[derive(Debug)]
struct PendingPatch {
    label: Label,
    anchor: usize,
}

/// Why a body could not be finished.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum FinishError {
    UnresolvedBranches(usize),
    OpenLoops(usize),
}

#[derive(Debug, Default)]
pub(crate) struct Emitter {
    code: Vec<u8>,
    pending: Vec<PendingPatch>,
    next_label: u32,
    /// Exit labels of the enclosing loops, innermost last.
    loops: Vec<Label>,
}

impl Emitter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn offset(&self) -> usize {
        self.code.len()
    }

    pub(crate) fn op(&mut self, op: Opcode) {
        debug_assert_eq!(op.len(), 1);
        self.code.push(op.byte());
    }

    pub(crate) fn op_u8(&mut self, op: Opcode, operand: u8) {
        debug_assert_eq!(op.len(), 2);
        self.code.extend_from_slice(&[op.byte(), operand]);
    }

    pub(crate) fn call(&mut self, op: Opcode, argc: u8, index: u8) {
        debug_assert_eq!(op.len(), 3);
        self.code.extend_from_slice(&[op.byte(), argc, index]);
    }

    /// Push an integer constant, using the one-byte form when it fits.
    pub(crate) fn load_const(&mut self, value: i32) {
        if let Ok(short) = i8::try_from(value) {
            self.code
                .extend_from_slice(&[Opcode::IntConst8.byte(), short.to_le_bytes()[0]]);
        } else {
            self.code.push(Opcode::IntConst.byte());
            self.code.extend_from_slice(&value.to_le_bytes());
        }
    }

    /// Emit a long branch with a zero displacement to be patched later.
    pub(crate) fn placeholder(&mut self, op: Opcode) -> Patch {
        self.emit_long_branch(op);
        Patch {
            anchor: self.offset(),
        }
    }

    /// Point `patch` at the current offset.
    pub(crate) fn patch_to_here(&mut self, patch: Patch) {
        let disp = displacement(self.offset(), patch.anchor);
        self.write_disp(patch.anchor, disp);
    }

    /// Emit a long branch to an already-known offset.
    pub(crate) fn jump_to(&mut self, op: Opcode, target: usize) {
        self.emit_long_branch(op);
        let anchor = self.offset();
        self.write_disp(anchor, displacement(target, anchor));
    }

    pub(crate) fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    /// Emit a long branch to `label`, resolved by [`Emitter::resolve_label`].
    pub(crate) fn branch_to_label(&mut self, op: Opcode, label: Label) {
        self.emit_long_branch(op);
        self.pending.push(PendingPatch {
            label,
            anchor: self.offset(),
        });
    }

    /// Point every pending branch to `label` at the current offset.
    ///
    /// Returns whether any branch referenced the label.
    pub(crate) fn resolve_label(&mut self, label: Label) -> bool {
        let here = self.offset();
        let mut resolved = false;
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].label == label {
                let patch = self.pending.swap_remove(i);
                self.write_disp(patch.anchor, displacement(here, patch.anchor));
                resolved = true;
            } else {
                i += 1;
            }
        }
        resolved
    }

    /// Enter a loop; `break` branches to the returned exit label.
    pub(crate) fn begin_loop(&mut self) -> Label {
        let label = self.new_label();
        self.loops.push(label);
        label
    }

    /// Leave the innermost loop, resolving its exit to the current offset.
    ///
    /// Returns whether anything branched to the exit.
    pub(crate) fn end_loop(&mut self) -> bool {
        match self.loops.pop() {
            Some(label) => self.resolve_label(label),
            None => false,
        }
    }

    /// Exit label of the innermost enclosing loop.
    pub(crate) fn current_loop(&self) -> Option<Label> {
        self.loops.last().copied()
    }

    /// Hand over the finished bytecode.
    pub(crate) fn finish(self) -> Result<Vec<u8>, FinishError> {
        if !self.pending.is_empty() {
            return Err(FinishError::UnresolvedBranches(self.pending.len()));
        }
        if !self.loops.is_empty() {
            return Err(FinishError::OpenLoops(self.loops.len()));
        }
        Ok(self.code)
    }

    fn emit_long_branch(&mut self, op: Opcode) {
        debug_assert!(matches!(op, Opcode::Ljz | Opcode::Ljnz | Opcode::Ljmp));
        self.code.push(op.byte());
        self.code.extend_from_slice(&[0; 4]);
    }

    fn write_disp(&mut self, anchor: usize, disp: i32) {
        if let Some(operand) = self.code.get_mut(anchor - 4..anchor) {
            operand.copy_from_slice(&disp.to_le_bytes());
        }
    }
}

/// Displacement from `anchor` to `target`.
fn displacement(target: usize, anchor: usize) -> i32 {
    let target = i64::try_from(target).unwrap_or(i64::MAX);
    let anchor = i64::try_from(anchor).unwrap_or(i64::MAX);
    i32::try_from(target - anchor).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests;
