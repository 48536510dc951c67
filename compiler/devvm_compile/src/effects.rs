//! Suspension-effect inference across the call graph.
//!
//! Every function carries two masks:
//! - `required`: suspension modes the function or anything it calls may use
//! - `allowed`: modes its calling context permits
//!
//! Method calls are folded into `required` as bodies are compiled. Calls
//! between script functions are only recorded as edges here, because a
//! callee's body may not have been compiled yet. Once every body exists,
//! [`Effects::propagate`] runs both rules over the edges until nothing
//! changes. Masks only grow (`required`) or shrink (`allowed`) and each has
//! a handful of bits, so the loop always terminates.

use std::rc::Rc;

use devvm_ir::{FunctionId, SuspendMask};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

/// Where a function's body starts.
#[derive(Clone, Debug)]
pub(crate) struct Definition {
    pub(crate) source: Rc<str>,
    pub(crate) offset: u32,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct FunctionInfo {
    pub(crate) required: SuspendMask,
    pub(crate) allowed: SuspendMask,
    pub(crate) definition: Option<Definition>,
}

/// A call that needs a suspension mode its caller cannot provide.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) struct EffectConflict {
    pub(crate) caller: FunctionId,
    pub(crate) callee: FunctionId,
    pub(crate) modes: SuspendMask,
}

/// Per-function masks plus the recorded call edges.
///
/// `infos` is indexed in step with the domain's function table.
#[derive(Default, Debug)]
pub(crate) struct Effects {
    infos: Vec<FunctionInfo>,
    edges: Vec<(FunctionId, FunctionId)>,
    seen: FxHashSet<(FunctionId, FunctionId)>,
}

impl Effects {
    pub(crate) fn add_function(&mut self, id: FunctionId, allowed: SuspendMask) {
        debug_assert_eq!(id.index(), self.infos.len(), "function info out of step");
        self.infos.push(FunctionInfo {
            allowed,
            ..FunctionInfo::default()
        });
    }

    pub(crate) fn info(&self, id: FunctionId) -> Option<&FunctionInfo> {
        self.infos.get(id.index())
    }

    pub(crate) fn info_mut(&mut self, id: FunctionId) -> Option<&mut FunctionInfo> {
        self.infos.get_mut(id.index())
    }

    pub(crate) fn required(&self, id: FunctionId) -> SuspendMask {
        self.info(id).map(|i| i.required).unwrap_or_default()
    }

    pub(crate) fn allowed(&self, id: FunctionId) -> SuspendMask {
        self.info(id).map(|i| i.allowed).unwrap_or_default()
    }

    pub(crate) fn require(&mut self, id: FunctionId, modes: SuspendMask) {
        if let Some(info) = self.info_mut(id) {
            info.required |= modes;
        }
    }

    /// Record that `caller` calls `callee`. Repeated calls add one edge.
    pub(crate) fn add_call(&mut self, caller: FunctionId, callee: FunctionId) {
        if self.seen.insert((caller, callee)) {
            self.edges.push((caller, callee));
        }
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Push masks along the call edges until they settle.
    ///
    /// Upward, a caller inherits every mode its callees require. Downward,
    /// a callee may only use modes every caller allows.
    #[tracing::instrument(level = "debug", skip_all, fields(edges = self.edges.len()))]
    pub(crate) fn propagate(&mut self) -> Result<u32, EffectConflict> {
        let mut rounds = 0;
        let mut changed = true;
        while changed {
            changed = false;
            rounds += 1;

            for &(caller, callee) in &self.edges {
                let (Some(caller_info), Some(callee_info)) =
                    (self.infos.get(caller.index()), self.infos.get(callee.index()))
                else {
                    continue;
                };

                let missing = callee_info.required - caller_info.required;
                if !missing.is_empty() {
                    let forbidden = missing - caller_info.allowed;
                    if !forbidden.is_empty() {
                        return Err(EffectConflict {
                            caller,
                            callee,
                            modes: forbidden,
                        });
                    }
                    trace!(%caller, %callee, modes = %missing.describe(), "required mode raised");
                    if let Some(info) = self.infos.get_mut(caller.index()) {
                        info.required |= missing;
                    }
                    changed = true;
                }

                let caller_allowed = self.allowed(caller);
                let Some(callee_info) = self.infos.get_mut(callee.index()) else {
                    continue;
                };
                let narrowed = callee_info.allowed & caller_allowed;
                if narrowed != callee_info.allowed {
                    callee_info.allowed = narrowed;
                    let forbidden = callee_info.required - narrowed;
                    if !forbidden.is_empty() {
                        return Err(EffectConflict {
                            caller,
                            callee,
                            modes: forbidden,
                        });
                    }
                    trace!(%caller, %callee, allowed = %narrowed.describe(), "allowed mode narrowed");
                    changed = true;
                }
            }
        }
        debug!(rounds, edges = self.edge_count(), "effects settled");
        Ok(rounds)
    }
}

#[cfg(test)]
mod tests;
