//! Built-in instance types: the concrete payloads behind every
//! non-primitive `__type` id the registry seeds at construction.

use std::any::Any;
use std::fmt;

use crate::core::value::{Instance, Value};

macro_rules! simple_instance {
    ($ty:ident, $name:literal) => {
        impl Instance for $ty {
            fn type_name(&self) -> &'static str {
                $name
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
            fn clone_boxed(&self) -> Box<dyn Instance> {
                Box::new(self.clone())
            }
        }
    };
}

/// An ISO-8601 instant. Kept as validated text rather than parsed into a
/// calendar type — the wire payload *is* the ISO-8601 string, and the codec
/// never needs to do date arithmetic on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateValue(pub String);
simple_instance!(DateValue, "Date");

/// A regular expression: pattern text plus flag letters, unvalidated until
/// it passes through [`crate::core::regexp_validator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegExpValue {
    pub pattern: String,
    pub flags: String,
}
simple_instance!(RegExpValue, "RegExp");

/// Ordered key/value container. Ref-strategy: a shared `Map` instance keeps
/// its identity across the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct MapValue(pub Vec<(Value, Value)>);

impl MapValue {
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k.structurally_eq(key)).map(|(_, v)| v)
    }
}
simple_instance!(MapValue, "Map");

/// Ordered set container. Ref-strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct SetValue(pub Vec<Value>);
simple_instance!(SetValue, "Set");

/// An exception-like value. Ref-strategy; unsafe/shadowing keys are
/// stripped from `custom_fields` on both encode and decode.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
    pub cause: Option<Box<Value>>,
    pub custom_fields: Vec<(String, Value)>,
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}
simple_instance!(ErrorValue, "Error");

/// An absolute URL, stored as its `href`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlValue(pub String);
simple_instance!(UrlValue, "URL");

/// A `key=value&...` query string container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlSearchParamsValue(pub String);
simple_instance!(UrlSearchParamsValue, "URLSearchParams");

/// Raw bytes backing `ArrayBuffer`, `DataView`, and the runtime `Buffer`
/// type. These three JS types share one byte-level wire shape (an array of
/// 0..255 integers) and differ only in which view the host language places
/// over the bytes, so they share one Rust instance type distinguished by
/// `kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteBufferKind {
    ArrayBuffer,
    DataView,
    Buffer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteBufferValue {
    pub kind: ByteBufferKind,
    pub bytes: Vec<u8>,
}

impl Instance for ByteBufferValue {
    fn type_name(&self) -> &'static str {
        match self.kind {
            ByteBufferKind::ArrayBuffer => "ArrayBuffer",
            ByteBufferKind::DataView => "DataView",
            ByteBufferKind::Buffer => "Buffer",
        }
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn clone_boxed(&self) -> Box<dyn Instance> {
        Box::new(self.clone())
    }
}

/// The eleven JS typed-array flavors, each sharing the byte-level wire
/// shape (array of 0..255 integers whose length must be a multiple of the
/// element size).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedArrayKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

impl TypedArrayKind {
    pub fn element_size(&self) -> usize {
        match self {
            TypedArrayKind::Int8 | TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => 1,
            TypedArrayKind::Int16 | TypedArrayKind::Uint16 => 2,
            TypedArrayKind::Int32 | TypedArrayKind::Uint32 | TypedArrayKind::Float32 => 4,
            TypedArrayKind::Float64 | TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64 => 8,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            TypedArrayKind::Int8 => "Int8Array",
            TypedArrayKind::Uint8 => "Uint8Array",
            TypedArrayKind::Uint8Clamped => "Uint8ClampedArray",
            TypedArrayKind::Int16 => "Int16Array",
            TypedArrayKind::Uint16 => "Uint16Array",
            TypedArrayKind::Int32 => "Int32Array",
            TypedArrayKind::Uint32 => "Uint32Array",
            TypedArrayKind::Float32 => "Float32Array",
            TypedArrayKind::Float64 => "Float64Array",
            TypedArrayKind::BigInt64 => "BigInt64Array",
            TypedArrayKind::BigUint64 => "BigUint64Array",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        use TypedArrayKind::*;
        Some(match id {
            "Int8Array" => Int8,
            "Uint8Array" => Uint8,
            "Uint8ClampedArray" => Uint8Clamped,
            "Int16Array" => Int16,
            "Uint16Array" => Uint16,
            "Int32Array" => Int32,
            "Uint32Array" => Uint32,
            "Float32Array" => Float32,
            "Float64Array" => Float64,
            "BigInt64Array" => BigInt64,
            "BigUint64Array" => BigUint64,
            _ => return None,
        })
    }

    pub fn all() -> &'static [TypedArrayKind] {
        use TypedArrayKind::*;
        &[
            Int8, Uint8, Uint8Clamped, Int16, Uint16, Int32, Uint32, Float32, Float64, BigInt64,
            BigUint64,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedArrayValue {
    pub kind: TypedArrayKind,
    pub bytes: Vec<u8>,
}

impl Instance for TypedArrayValue {
    fn type_name(&self) -> &'static str {
        self.kind.id()
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn clone_boxed(&self) -> Box<dyn Instance> {
        Box::new(self.clone())
    }
}
