//! Configuration data values.
//!
//! Option values and object-variable initializers are parsed into
//! `DataValue` trees and handed to host callbacks. Each node keeps the
//! source offset it was parsed at so a host can report an error against it.

use std::hash::Hasher;
use std::rc::Rc;

use rustc_hash::FxHasher;

use crate::class::ObjectClass;
use crate::span::Span;

/// 32-bit hash of an object member name.
pub fn hash_member_name(name: &str) -> u32 {
    let mut hasher = FxHasher::default();
    hasher.write(name.as_bytes());
    let h = hasher.finish();
    // Fold the high half in so short names still spread over all 32 bits.
    #[allow(clippy::cast_possible_truncation)]
    let folded = (h ^ (h >> 32)) as u32;
    folded
}

/// Raw, unparsed source text of an inline function body.
///
/// Shares the compile unit's source and records the body's byte range
/// within it, so diagnostics from compiling it later map to the original
/// file.
#[derive(Clone, Debug)]
pub struct ScriptFragment {
    source: Rc<str>,
    span: Span,
}

impl ScriptFragment {
    /// A fragment covering `span` of `source`.
    pub fn new(source: Rc<str>, span: Span) -> Self {
        ScriptFragment { source, span }
    }

    /// A fragment covering the whole of `text`.
    pub fn from_text(text: &str) -> Self {
        let span = Span::from_range(0..text.len());
        ScriptFragment {
            source: Rc::from(text),
            span,
        }
    }

    /// The whole source this fragment points into.
    pub fn source(&self) -> &Rc<str> {
        &self.source
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// The fragment's own text.
    pub fn text(&self) -> &str {
        self.source.get(self.span.to_range()).unwrap_or("")
    }
}

/// Named member of an object value.
#[derive(Clone, Debug)]
pub struct DataMember {
    pub name_hash: u32,
    pub name: String,
    pub value: DataValue,
}

#[derive(Clone, Debug)]
pub enum DataValueKind {
    Int(i32),
    String(String),
    Array(Vec<DataValue>),
    Object(Vec<DataMember>),
    Script(ScriptFragment),
    /// Reference to a global object variable.
    RuntimeObject {
        class: &'static ObjectClass,
        handle: u32,
    },
}

/// A parsed configuration value and where it came from.
#[derive(Clone, Debug)]
pub struct DataValue {
    pub kind: DataValueKind,
    /// Absolute source offset of the value.
    pub offset: u32,
}

impl DataValue {
    pub fn new(kind: DataValueKind, offset: u32) -> Self {
        DataValue { kind, offset }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self.kind {
            DataValueKind::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            DataValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DataValue]> {
        match &self.kind {
            DataValueKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_script(&self) -> Option<&ScriptFragment> {
        match &self.kind {
            DataValueKind::Script(fragment) => Some(fragment),
            _ => None,
        }
    }

    /// Look up an object member by name.
    pub fn member(&self, name: &str) -> Option<&DataValue> {
        let DataValueKind::Object(members) = &self.kind else {
            return None;
        };
        let hash = hash_member_name(name);
        members
            .iter()
            .find(|m| m.name_hash == hash && m.name == name)
            .map(|m| &m.value)
    }

    /// Short name of the value's kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            DataValueKind::Int(_) => "integer",
            DataValueKind::String(_) => "string",
            DataValueKind::Array(_) => "array",
            DataValueKind::Object(_) => "object",
            DataValueKind::Script(_) => "script",
            DataValueKind::RuntimeObject { .. } => "object reference",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, value: i32) -> DataMember {
        DataMember {
            name_hash: hash_member_name(name),
            name: name.to_owned(),
            value: DataValue::new(DataValueKind::Int(value), 0),
        }
    }

    #[test]
    fn member_lookup_by_name() {
        let obj = DataValue::new(
            DataValueKind::Object(vec![member("base", 0xD300), member("size", 32)]),
            4,
        );
        assert_eq!(obj.member("size").and_then(DataValue::as_int), Some(32));
        assert!(obj.member("Size").is_none());
        assert!(obj.member("missing").is_none());
    }

    #[test]
    fn fragment_text_is_a_slice_of_source() {
        let source: Rc<str> = Rc::from("event \"x\": function { a = 1; };");
        let fragment = ScriptFragment::new(source, Span::new(21, 29));
        assert_eq!(fragment.text(), " a = 1; ");
        assert_eq!(ScriptFragment::from_text("b = 2;").text(), "b = 2;");
    }

    #[test]
    fn hash_is_stable_for_equal_names() {
        assert_eq!(hash_member_name("irq"), hash_member_name("irq"));
        assert_ne!(hash_member_name("irq"), hash_member_name("nmi"));
    }
}
