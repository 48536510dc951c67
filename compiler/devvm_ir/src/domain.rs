//! Everything a compile unit produces.

use rustc_hash::FxHashMap;

use crate::class::ObjectClass;
use crate::function::{Function, FunctionId};

/// A host object bound to a script variable.
#[derive(Copy, Clone, Debug)]
pub struct HostObject {
    pub class: &'static ObjectClass,
    /// Host-side identifier, opaque to the compiler.
    pub id: u32,
}

/// Entry of the domain object table.
#[derive(Clone, Debug)]
pub enum GlobalObject {
    Host(HostObject),
    /// Interned string literal.
    String(String),
}

/// Program state shared between the compiler and the VM.
///
/// Global and special variable cells hold their initial values; object
/// handles stored in them are indices into `objects`.
#[derive(Default, Debug)]
pub struct Domain {
    pub globals: Vec<i32>,
    pub special_vars: Vec<i32>,
    pub thread_var_count: u32,
    pub objects: Vec<GlobalObject>,
    pub functions: Vec<Function>,
    strings: FxHashMap<String, u32>,
}

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an object and return its handle.
    pub fn add_object(&mut self, object: GlobalObject) -> u32 {
        let handle = table_index(self.objects.len());
        self.objects.push(object);
        handle
    }

    /// Handle of a string object with this content, creating it once.
    pub fn intern_string(&mut self, text: &str) -> u32 {
        if let Some(&handle) = self.strings.get(text) {
            return handle;
        }
        let handle = self.add_object(GlobalObject::String(text.to_owned()));
        self.strings.insert(text.to_owned(), handle);
        handle
    }

    pub fn object(&self, handle: u32) -> Option<&GlobalObject> {
        self.objects.get(handle as usize)
    }

    pub fn add_function(&mut self, function: Function) -> FunctionId {
        let id = FunctionId(table_index(self.functions.len()));
        self.functions.push(function);
        id
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.index())
    }

    pub fn function_mut(&mut self, id: FunctionId) -> Option<&mut Function> {
        self.functions.get_mut(id.index())
    }

    /// Find a function by name.
    pub fn function_named(&self, name: &str) -> Option<(FunctionId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
            .map(|(i, f)| (FunctionId(table_index(i)), f))
    }
}

// Tables are bounded far below u32::MAX by the compiler's limits.
#[allow(clippy::cast_possible_truncation)]
fn table_index(len: usize) -> u32 {
    len as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueType;

    #[test]
    fn strings_are_interned_once() {
        let mut domain = Domain::new();
        let a = domain.intern_string("hello");
        let b = domain.intern_string("world");
        let c = domain.intern_string("hello");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(domain.objects.len(), 2);
        assert!(matches!(domain.object(b), Some(GlobalObject::String(s)) if s == "world"));
    }

    #[test]
    fn functions_are_indexed_in_order() {
        let mut domain = Domain::new();
        let f = domain.add_function(Function::new("f", ValueType::Void));
        let g = domain.add_function(Function::new("g", ValueType::Int));
        assert_eq!(f, FunctionId(0));
        assert_eq!(g, FunctionId(1));
        assert_eq!(domain.function_named("g").map(|(id, _)| id), Some(g));
        assert!(domain.function(g).is_some_and(|f| !f.is_defined()));
    }
}
