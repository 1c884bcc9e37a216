//! Runtime value representation
//!
//! Values are tagged and type-safe; raw byte storage is never modeled. A
//! pointer value tracks *what* it points at (an object, an array element,
//! null, or nothing valid) rather than a raw address, so the engine can
//! detect dangling and out-of-bounds use instead of silently reading
//! through it. Addresses still exist on objects for display and pointer
//! comparison.
//!
//! The `Uninitialized` variant marks indeterminate storage; reading it
//! through an atomic slot yields an invalid value and an undefined-behavior
//! event, never a silent default.

use super::ObjectId;

/// What a pointer designates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerValue {
    Null,
    /// Indeterminate or dangling; any use except overwriting is undefined
    Invalid,
    ToObject(ObjectId),
    /// Element `index` of an array object; may sit one past the end, where
    /// comparison is defined but dereference is not
    ArrayElement { array: ObjectId, index: i64 },
}

/// Runtime values
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Bool(bool),
    Char(i8),
    Int(i64),
    SizeT(u64),
    Float(f32),
    Double(f64),
    Ptr(PointerValue),
    #[default]
    Uninitialized,
}

impl Value {
    pub fn is_initialized(&self) -> bool {
        !matches!(self, Value::Uninitialized)
    }

    /// Zero of the given shape, used by value initialization
    pub fn zero_like(ty: &crate::types::Type) -> Value {
        use crate::types::TypeKind;
        match &ty.kind {
            TypeKind::Bool => Value::Bool(false),
            TypeKind::Char => Value::Char(0),
            TypeKind::Int => Value::Int(0),
            TypeKind::SizeT => Value::SizeT(0),
            TypeKind::Float => Value::Float(0.0),
            TypeKind::Double => Value::Double(0.0),
            TypeKind::Pointer(_) => Value::Ptr(PointerValue::Null),
            _ => Value::Uninitialized,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<PointerValue> {
        match self {
            Value::Ptr(p) => Some(*p),
            _ => None,
        }
    }

    /// The value viewed as a signed integer, when it has one
    pub fn integral(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(*b as i64),
            Value::Char(c) => Some(*c as i64),
            Value::Int(n) => Some(*n),
            Value::SizeT(n) => Some(*n as i64),
            _ => None,
        }
    }

    /// The value viewed as a double, when it is numeric
    pub fn floating(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f as f64),
            Value::Double(d) => Some(*d),
            other => other.integral().map(|n| n as f64),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Char(c) => write!(f, "'{}'", (*c as u8) as char),
            Value::Int(n) => write!(f, "{}", n),
            Value::SizeT(n) => write!(f, "{}", n),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Ptr(PointerValue::Null) => write!(f, "nullptr"),
            Value::Ptr(PointerValue::Invalid) => write!(f, "<invalid pointer>"),
            Value::Ptr(PointerValue::ToObject(id)) => write!(f, "&<object#{}>", id),
            Value::Ptr(PointerValue::ArrayElement { array, index }) => {
                write!(f, "&<object#{}>[{}]", array, index)
            }
            Value::Uninitialized => write!(f, "<uninitialized>"),
        }
    }
}
