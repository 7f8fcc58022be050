use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::context::WeakRef;
use crate::reflect::{BoundMethod, ObjectRef};

/// A value crossing the boundary between the host and a script engine.
///
/// Addresses and memory contents are carried as `U32` regardless of the
/// underlying access width; native objects are shared single-threaded
/// handles; `Weak` entries observe an arena slot without keeping it alive.
#[derive(Clone)]
pub enum ScriptValue {
    Null,
    Bool(bool),
    I32(i32),
    U32(u32),
    String(String),
    List(Vec<ScriptValue>),
    Table(BTreeMap<String, ScriptValue>),
    Object(ObjectRef),
    Weak(WeakRef),
    Method(BoundMethod),
}

impl ScriptValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::I32(_) => "i32",
            Self::U32(_) => "u32",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Table(_) => "table",
            Self::Object(_) => "object",
            Self::Weak(_) => "weakref",
            Self::Method(_) => "method",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Signed view of a numeric value; `U32` values convert when they fit.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(value) => Some(*value),
            Self::U32(value) => i32::try_from(*value).ok(),
            _ => None,
        }
    }

    /// Unsigned view of a numeric value; non-negative `I32` values convert.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(value) => Some(*value),
            Self::I32(value) => u32::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ScriptValue]> {
        match self {
            Self::List(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&BTreeMap<String, ScriptValue>> {
        match self {
            Self::Table(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_weak(&self) -> Option<WeakRef> {
        match self {
            Self::Weak(weak) => Some(*weak),
            _ => None,
        }
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::U32(a), Self::U32(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Table(a), Self::Table(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Weak(a), Self::Weak(b)) => a == b,
            (Self::Method(a), Self::Method(b)) => {
                Rc::ptr_eq(&a.receiver, &b.receiver) && std::ptr::eq(a.def, b.def)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(value) => write!(f, "Bool({value})"),
            Self::I32(value) => write!(f, "I32({value})"),
            Self::U32(value) => write!(f, "U32({value:#x})"),
            Self::String(value) => write!(f, "String({value:?})"),
            Self::List(values) => f.debug_tuple("List").field(values).finish(),
            Self::Table(values) => f.debug_tuple("Table").field(values).finish(),
            Self::Object(object) => write!(f, "Object({})", object.borrow().type_name()),
            Self::Weak(weak) => write!(f, "Weak({weak:?})"),
            Self::Method(method) => write!(f, "Method({})", method.def.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_views_convert_between_signs_when_in_range() {
        assert_eq!(ScriptValue::I32(7).as_u32(), Some(7));
        assert_eq!(ScriptValue::U32(7).as_i32(), Some(7));
        assert_eq!(ScriptValue::I32(-1).as_u32(), None);
        assert_eq!(ScriptValue::U32(u32::MAX).as_i32(), None);
    }

    #[test]
    fn accessors_reject_mismatched_variants() {
        let value = ScriptValue::String("rom".to_string());
        assert_eq!(value.as_str(), Some("rom"));
        assert_eq!(value.as_u32(), None);
        assert!(!value.is_null());
        assert!(ScriptValue::Null.is_null());
    }

    #[test]
    fn type_names_cover_every_variant() {
        assert_eq!(ScriptValue::Null.type_name(), "null");
        assert_eq!(ScriptValue::Bool(true).type_name(), "bool");
        assert_eq!(ScriptValue::List(Vec::new()).type_name(), "list");
        assert_eq!(
            ScriptValue::Table(std::collections::BTreeMap::new()).type_name(),
            "table"
        );
    }
}
