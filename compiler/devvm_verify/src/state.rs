//! Hash-consed abstract stack states.

use rustc_hash::FxHashMap;

/// Kind of value held in a stack cell.
///
/// Every cell is a 32-bit word at run time; object, string and function
/// handles travel as integers.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) enum ValueKind {
    Int,
}

/// Index of an interned stack state.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) struct StateId(u32);

impl StateId {
    pub(crate) const EMPTY: StateId = StateId(0);
}

struct StackState {
    parent: StateId,
    top: Option<ValueKind>,
    depth: u32,
}

/// Shared graph of stack states; each state is its parent plus one cell.
pub(crate) struct StackGraph {
    states: Vec<StackState>,
    lookup: FxHashMap<(StateId, ValueKind), StateId>,
    max_depth: u32,
}

impl StackGraph {
    pub(crate) fn new() -> Self {
        StackGraph {
            states: vec![StackState {
                parent: StateId::EMPTY,
                top: None,
                depth: 0,
            }],
            lookup: FxHashMap::default(),
            max_depth: 0,
        }
    }

    fn get(&self, id: StateId) -> &StackState {
        &self.states[id.0 as usize]
    }

    /// The state after popping one cell, or `None` if `id` is empty.
    pub(crate) fn parent(&self, id: StateId) -> Option<StateId> {
        if id == StateId::EMPTY {
            None
        } else {
            Some(self.get(id).parent)
        }
    }

    pub(crate) fn top(&self, id: StateId) -> Option<ValueKind> {
        self.get(id).top
    }

    pub(crate) fn depth(&self, id: StateId) -> u32 {
        self.get(id).depth
    }

    /// The state after pushing `kind` onto `id`, interned.
    pub(crate) fn push(&mut self, id: StateId, kind: ValueKind) -> StateId {
        if let Some(&existing) = self.lookup.get(&(id, kind)) {
            return existing;
        }
        let depth = self.depth(id) + 1;
        // bounded by the number of distinct (state, kind) transitions, which
        // is bounded by the code length
        #[allow(clippy::cast_possible_truncation)]
        let new = StateId(self.states.len() as u32);
        self.states.push(StackState {
            parent: id,
            top: Some(kind),
            depth,
        });
        self.lookup.insert((id, kind), new);
        self.max_depth = self.max_depth.max(depth);
        new
    }

    pub(crate) fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }
}
