//! valuegraph Error Classes
//!
//! Every failure mode an encoder or decoder can raise is a variant of
//! [`CodecError`]. Callers abort the current call on the first error; no
//! partial output or mutation is ever observed outside a failing call.

use thiserror::Error;

/// Discriminated error type returned by every public entry point on [`crate::Codec`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    // ---- input errors ----
    /// The wire text did not parse as JSON at all.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("invalid RegExp payload")]
    InvalidRegExpPayload,

    #[error("invalid RegExp flags: {0}")]
    InvalidRegExpFlags(String),

    #[error("invalid BigInt payload: {0:?}")]
    InvalidBigIntPayload(String),

    #[error("invalid Symbol payload")]
    InvalidSymbolPayload,

    #[error("invalid non-finite number payload")]
    InvalidNonFiniteNumberPayload,

    #[error("invalid object node payload for `{0}`")]
    InvalidObjectNodePayload(String),

    #[error("invalid array node payload for `{0}`")]
    InvalidArrayNodePayload(String),

    // ---- policy violations ----
    /// Deserialization-time allowlist rejected a registered type.
    #[error("type `{0}` is not in the allowlist")]
    TypeNotAllowed(String),

    #[error("symbols are disabled by the active policy")]
    SymbolsDisabled,

    #[error("global symbols are disabled by the active policy")]
    GlobalSymbolsDisabled,

    #[error("unique symbols cannot be serialized")]
    UnsupportedUniqueSymbol,

    #[error("RegExp pattern rejected as unsafe: /{0}/")]
    UnsafeRegExpPattern(String),

    #[error("RegExp pattern length {len} exceeds the configured limit of {limit}")]
    RegExpPatternTooLong { len: usize, limit: usize },

    /// Raised by `assert_depth`, the single guard invoked at every recursive
    /// entry point of every serializer/deserializer path.
    #[error("maximum recursion depth {0} exceeded")]
    DepthExceeded(usize),

    // ---- graph integrity ----
    #[error("unknown type id `{0}`")]
    UnknownType(String),

    #[error("unsupported graph node kind `{0}`")]
    UnsupportedNodeKind(String),

    #[error("unresolved reference to node `{0}`")]
    UnresolvedReference(String),

    #[error("cycle detected while serializing in tree mode")]
    CircularInTreeMode,

    /// A cycle crossed a node whose type provides no `create` factory, so no
    /// placeholder could be constructed ahead of resolving the payload.
    #[error("cycle crosses a node without a create factory")]
    CircularWithoutFactory,

    // ---- feature / runtime ----
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("unsupported well-known symbol `{0}`")]
    UnsupportedWellKnownSymbol(String),

    #[error("functions cannot be serialized")]
    UnsupportedFunction,

    #[error("type registry error: {0}")]
    TypeRegistry(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
