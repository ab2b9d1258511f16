//! Special-value codec: undefined, non-finite numbers, big integers, symbols.
//!
//! These are the non-JSON primitives the spec requires lossy-free encoding
//! for. Each is realized as a small `Instance` type, registered as a
//! value-strategy built-in by [`crate::core::registry::TypeRegistry::new`].

use std::any::Any;
use std::fmt;

use crate::core::errors::CodecError;
use crate::core::value::Instance;

/// `NaN` / `+Infinity` / `-Infinity`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NonFiniteTag {
    NaN,
    Infinity,
    NegInfinity,
}

impl NonFiniteTag {
    pub fn from_f64(n: f64) -> Option<Self> {
        if n.is_nan() {
            Some(NonFiniteTag::NaN)
        } else if n == f64::INFINITY {
            Some(NonFiniteTag::Infinity)
        } else if n == f64::NEG_INFINITY {
            Some(NonFiniteTag::NegInfinity)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NonFiniteTag::NaN => "NaN",
            NonFiniteTag::Infinity => "Infinity",
            NonFiniteTag::NegInfinity => "-Infinity",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CodecError> {
        match s {
            "NaN" => Ok(NonFiniteTag::NaN),
            "Infinity" => Ok(NonFiniteTag::Infinity),
            "-Infinity" => Ok(NonFiniteTag::NegInfinity),
            _ => Err(CodecError::InvalidNonFiniteNumberPayload),
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            NonFiniteTag::NaN => f64::NAN,
            NonFiniteTag::Infinity => f64::INFINITY,
            NonFiniteTag::NegInfinity => f64::NEG_INFINITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NonFiniteNumber(pub NonFiniteTag);

impl Instance for NonFiniteNumber {
    fn type_name(&self) -> &'static str {
        "NonFiniteNumber"
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

/// Arbitrary-precision integer, stored as a validated decimal string.
///
/// Rust has no native bignum type in `core`/`std`; rather than pull in a
/// bignum crate the teacher's dependency stack never reaches for, the value
/// is kept as the wire's own decimal-string representation and only parsed
/// down to a machine integer on demand via [`BigIntValue::to_i128`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigIntValue(String);

impl BigIntValue {
    pub fn parse(s: &str) -> Result<Self, CodecError> {
        if is_valid_bigint_literal(s) {
            Ok(BigIntValue(normalize_bigint_literal(s)))
        } else {
            Err(CodecError::InvalidBigIntPayload(s.to_string()))
        }
    }

    pub fn from_i128(n: i128) -> Self {
        BigIntValue(n.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_i128(&self) -> Option<i128> {
        self.0.parse().ok()
    }
}

fn is_valid_bigint_literal(s: &str) -> bool {
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit())
}

fn normalize_bigint_literal(s: &str) -> String {
    if let Some(rest) = s.strip_prefix('+') {
        rest.to_string()
    } else {
        s.to_string()
    }
}

impl fmt::Display for BigIntValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Instance for BigIntValue {
    fn type_name(&self) -> &'static str {
        "BigInt"
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

/// The handful of JS well-known symbols this crate recognizes by name.
pub const WELL_KNOWN_SYMBOLS: &[&str] = &[
    "iterator",
    "asyncIterator",
    "hasInstance",
    "toPrimitive",
    "toStringTag",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    /// `Symbol.for(key)` — globally registered, always round-trippable.
    For(String),
    /// `Symbol.iterator` and friends.
    WellKnown(String),
    /// A unique, unregistered symbol. Never representable on the wire; kept
    /// only so callers can construct one and observe `UnsupportedUniqueSymbol`.
    Unique(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolValue(pub SymbolKind);

impl Instance for SymbolValue {
    fn type_name(&self) -> &'static str {
        "Symbol"
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

/// Deserialization-time policy for how permissive the decoder is about
/// accepting `Symbol` payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolPolicy {
    #[default]
    AllowAll,
    WellKnownOnly,
    Disabled,
}
