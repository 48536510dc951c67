//! Type tags for values on the compile-time evaluation stack.
//!
//! Every expression production hands a `TypeInfo` back to its caller
//! describing what it left behind: a loaded value on the stack, or a
//! reference (constant, lvalue, class name) that has not been loaded yet.

use crate::class::ObjectClass;

/// What a `TypeInfo` refers to.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeClass {
    Void,
    /// Integer value on the stack.
    Int,
    /// Integer constant not yet loaded; `index` holds the bit pattern.
    IntConst,
    /// Global integer variable; `index` is its slot.
    IntLvalueGlobal,
    /// Local integer variable; `index` is its slot.
    IntLvalueLocal,
    /// Object handle on the stack.
    Object,
    /// Global object variable not yet loaded; `index` is its slot.
    ObjectLvalue,
    /// String handle on the stack.
    String,
    /// String constant not yet loaded; `index` is the domain object handle.
    StringConst,
    /// Function pointer on the stack; `index` is the signature id.
    FunctionPointer,
    /// A class name used as a value (static call receiver).
    ObjectClass,
}

/// Type of a value produced by a grammar production.
#[derive(Copy, Clone, Debug)]
pub struct TypeInfo {
    pub class: TypeClass,
    pub index: u32,
    pub object_class: Option<&'static ObjectClass>,
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class
            && self.index == other.index
            && match (self.object_class, other.object_class) {
                (Some(a), Some(b)) => ObjectClass::same(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl Eq for TypeInfo {}

impl TypeInfo {
    const fn plain(class: TypeClass, index: u32) -> Self {
        TypeInfo {
            class,
            index,
            object_class: None,
        }
    }

    pub const VOID: TypeInfo = TypeInfo::plain(TypeClass::Void, 0);
    pub const INT: TypeInfo = TypeInfo::plain(TypeClass::Int, 0);
    pub const STRING: TypeInfo = TypeInfo::plain(TypeClass::String, 0);

    #[allow(clippy::cast_sign_loss)] // stored as raw bit pattern
    pub const fn int_const(value: i32) -> Self {
        TypeInfo::plain(TypeClass::IntConst, value as u32)
    }

    pub const fn global_lvalue(slot: u32) -> Self {
        TypeInfo::plain(TypeClass::IntLvalueGlobal, slot)
    }

    pub const fn local_lvalue(slot: u32) -> Self {
        TypeInfo::plain(TypeClass::IntLvalueLocal, slot)
    }

    pub const fn string_const(handle: u32) -> Self {
        TypeInfo::plain(TypeClass::StringConst, handle)
    }

    pub const fn function_pointer(signature: u32) -> Self {
        TypeInfo::plain(TypeClass::FunctionPointer, signature)
    }

    pub const fn object(class: &'static ObjectClass) -> Self {
        TypeInfo {
            class: TypeClass::Object,
            index: 0,
            object_class: Some(class),
        }
    }

    pub const fn object_lvalue(slot: u32, class: &'static ObjectClass) -> Self {
        TypeInfo {
            class: TypeClass::ObjectLvalue,
            index: slot,
            object_class: Some(class),
        }
    }

    pub const fn class_name(class: &'static ObjectClass) -> Self {
        TypeInfo {
            class: TypeClass::ObjectClass,
            index: 0,
            object_class: Some(class),
        }
    }

    /// The constant value of an `IntConst`.
    #[allow(clippy::cast_possible_wrap)] // stored as raw bit pattern
    pub const fn const_value(&self) -> i32 {
        self.index as i32
    }

    /// Whether this names something the evaluation stack does not hold yet.
    pub const fn needs_load(&self) -> bool {
        matches!(
            self.class,
            TypeClass::IntConst
                | TypeClass::IntLvalueGlobal
                | TypeClass::IntLvalueLocal
                | TypeClass::ObjectLvalue
                | TypeClass::StringConst
        )
    }

    pub const fn is_int_lvalue(&self) -> bool {
        matches!(
            self.class,
            TypeClass::IntLvalueGlobal | TypeClass::IntLvalueLocal
        )
    }

    /// The type of this value once loaded onto the stack.
    pub const fn loaded(self) -> TypeInfo {
        match self.class {
            TypeClass::IntConst | TypeClass::IntLvalueGlobal | TypeClass::IntLvalueLocal => {
                TypeInfo::INT
            }
            TypeClass::StringConst => TypeInfo::STRING,
            TypeClass::ObjectLvalue => TypeInfo {
                class: TypeClass::Object,
                index: 0,
                object_class: self.object_class,
            },
            _ => self,
        }
    }
}

/// Declared type of a host method argument or return value, and of a
/// function's return value.
#[derive(Copy, Clone, Debug)]
pub enum ValueType {
    Void,
    Int,
    String,
    /// Function pointer to a `void()` function.
    FunctionPointer,
    Object(&'static ObjectClass),
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueType::Object(a), ValueType::Object(b)) => ObjectClass::same(a, b),
            (ValueType::Void, ValueType::Void)
            | (ValueType::Int, ValueType::Int)
            | (ValueType::String, ValueType::String)
            | (ValueType::FunctionPointer, ValueType::FunctionPointer) => true,
            _ => false,
        }
    }
}

impl Eq for ValueType {}

impl ValueType {
    /// The loaded stack type carrying a value of this type.
    pub const fn type_info(self) -> TypeInfo {
        match self {
            ValueType::Void => TypeInfo::VOID,
            ValueType::Int => TypeInfo::INT,
            ValueType::String => TypeInfo::STRING,
            ValueType::FunctionPointer => TypeInfo::function_pointer(0),
            ValueType::Object(class) => TypeInfo::object(class),
        }
    }

    /// Whether a loaded value of type `ty` can be passed where this type is
    /// expected.
    pub fn accepts(self, ty: &TypeInfo) -> bool {
        let ty = ty.loaded();
        match self {
            ValueType::Void => false,
            ValueType::Int => ty.class == TypeClass::Int,
            ValueType::String => ty.class == TypeClass::String,
            ValueType::FunctionPointer => ty.class == TypeClass::FunctionPointer && ty.index == 0,
            ValueType::Object(class) => {
                ty.class == TypeClass::Object && ty.object_class.is_some_and(|c| ObjectClass::same(c, class))
            }
        }
    }
}
