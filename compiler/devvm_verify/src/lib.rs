//! Bytecode verifier.
//!
//! Walks a function's bytecode from offset 0, following both successors of
//! conditional branches, and tracks an abstract evaluation stack at every
//! reached offset. Stacks are hash-consed: a state is `(parent, top kind)`,
//! so two paths that push the same kinds in the same order land on the same
//! state id, and comparing stacks at a join point is an integer compare.
//!
//! Every reachable instruction must be entered with exactly one stack
//! state. The verifier also rejects stack underflow, branches or
//! fallthrough leaving the code, unknown opcodes and local-slot operands
//! outside the function's declared locals.
//!
//! On success it reports the deepest stack reached; the VM reserves that
//! many cells plus one per local slot.

mod state;

use devvm_ir::opcode::{decode, DecodeError, Operand};
use devvm_ir::{PopCount, PushKind};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::state::{StackGraph, StateId, ValueKind};

/// Why bytecode was rejected.
#[derive(Copy, Clone, Eq, PartialEq, Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Bytecode validation failed (invalid branch target {target} from offset {offset})")]
    InvalidBranchTarget { offset: usize, target: i64 },
    #[error("Bytecode validation failed (stack mismatch at offset {offset})")]
    StackMismatch { offset: usize },
    #[error("Bytecode validation failed (stack underflow at offset {offset})")]
    StackUnderflow { offset: usize },
    #[error("Bytecode validation failed (unhandled opcode 0x{byte:02X} at offset {offset})")]
    UnhandledOpcode { offset: usize, byte: u8 },
    #[error("Bytecode validation failed (truncated instruction at offset {offset})")]
    Truncated { offset: usize },
    #[error("Bytecode validation failed (invalid local index {index} at offset {offset})")]
    InvalidLocalIndex { offset: usize, index: u8 },
}

/// Resource requirements of verified bytecode.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Verified {
    /// Deepest evaluation stack reached on any path.
    pub max_depth: u32,
    /// `max_depth` plus the local slots.
    pub stack_slots: u32,
}

/// Verify `code`, a function body declaring `local_slots` locals.
#[tracing::instrument(level = "debug", skip(code), fields(len = code.len()))]
pub fn verify(code: &[u8], local_slots: u32) -> Result<Verified, VerifyError> {
    let mut graph = StackGraph::new();
    // offset -> state the instruction there is entered with
    let mut entry_state: Vec<Option<StateId>> = vec![None; code.len()];
    // (target, entry state, offset of the branch that produced it)
    let mut work: SmallVec<[(i64, StateId, usize); 8]> = SmallVec::new();
    work.push((0, StateId::EMPTY, 0));

    while let Some((start, mut state, mut from)) = work.pop() {
        let mut ip = start;
        loop {
            let offset = match usize::try_from(ip) {
                Ok(offset) if offset < code.len() => offset,
                _ => {
                    return Err(VerifyError::InvalidBranchTarget {
                        offset: from,
                        target: ip,
                    })
                }
            };

            match entry_state[offset] {
                Some(seen) if seen == state => break,
                Some(_) => return Err(VerifyError::StackMismatch { offset }),
                None => entry_state[offset] = Some(state),
            }

            let insn = match decode(code, offset) {
                Some(Ok(insn)) => insn,
                Some(Err(DecodeError::UnknownOpcode(byte))) => {
                    return Err(VerifyError::UnhandledOpcode { offset, byte })
                }
                Some(Err(DecodeError::Truncated(_))) | None => {
                    return Err(VerifyError::Truncated { offset })
                }
            };
            trace!(offset, opcode = %insn.opcode, depth = graph.depth(state), "verify");

            let effect = insn.opcode.stack_effect();
            let argc = match insn.operand {
                Operand::Call { argc, .. } => u32::from(argc),
                _ => 0,
            };
            let pops = match effect.pops {
                PopCount::Fixed(n) => u32::from(n),
                PopCount::Args => argc,
                PopCount::ArgsAndReceiver => argc + 1,
            };

            let pushed = match effect.push {
                None => None,
                Some(PushKind::Int) => Some(ValueKind::Int),
                Some(PushKind::CopyTop) => match graph.top(state) {
                    Some(kind) => Some(kind),
                    None => return Err(VerifyError::StackUnderflow { offset }),
                },
            };

            for _ in 0..pops {
                state = graph
                    .parent(state)
                    .ok_or(VerifyError::StackUnderflow { offset })?;
            }
            if let Some(kind) = pushed {
                state = graph.push(state, kind);
            }

            if let Operand::Slot(index) = insn.operand {
                if insn.opcode.uses_local_slot() && u32::from(index) >= local_slots {
                    return Err(VerifyError::InvalidLocalIndex { offset, index });
                }
            }

            from = offset;
            if let Some(target) = insn.branch_target(offset) {
                if insn.opcode.ends_path() {
                    ip = target;
                    continue;
                }
                work.push((target, state, offset));
            } else if insn.opcode.ends_path() {
                break;
            }

            ip = i64::try_from(offset + insn.opcode.len()).unwrap_or(i64::MAX);
        }
    }

    let max_depth = graph.max_depth();
    let verified = Verified {
        max_depth,
        stack_slots: max_depth + local_slots,
    };
    debug!(max_depth, states = graph.len(), "bytecode verified");
    Ok(verified)
}

#[cfg(test)]
mod tests;
