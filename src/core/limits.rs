//! Validation & limits: unsafe-key set, depth counter, marker-key escaping.
//!
//! A single [`assert_depth`] guard is invoked at every recursive entry of
//! every serializer/deserializer path, and a single [`is_unsafe_key`] check
//! gates every write into a freshly constructed mapping, per the spec's
//! "one guard, many call sites" requirement.

use crate::core::errors::CodecError;

/// Default unsafe-key set: prototype-chain targets in the ambient (JS) host.
pub const DEFAULT_UNSAFE_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];

pub const MARKER_TYPE: &str = "__type";
pub const MARKER_GRAPH: &str = "__graph";
pub const MARKER_REF: &str = "__ref";
pub const ESCAPE_PREFIX: &str = "$runner.escape::";

pub fn is_unsafe_key(key: &str, unsafe_keys: &[String]) -> bool {
    unsafe_keys.iter().any(|k| k == key)
}

/// `max` of 0 rejects any non-primitive; negative depth is impossible in
/// `usize` so "treated as default" is handled at config-construction time
/// instead; `None` disables the cap (the Rust rendition of `+∞`).
pub fn assert_depth(current: usize, max: Option<usize>) -> Result<(), CodecError> {
    match max {
        Some(max) if current > max => Err(CodecError::DepthExceeded(max)),
        _ => Ok(()),
    }
}

/// Escape a literal data key that collides with a reserved marker key.
/// Idempotent in the sense that escaping an already-escaped key prepends
/// another copy of the prefix, so repeated round-trips are lossless.
pub fn escape_marker_key(key: &str) -> String {
    if key == MARKER_TYPE || key == MARKER_GRAPH || key.starts_with(ESCAPE_PREFIX) {
        format!("{ESCAPE_PREFIX}{key}")
    } else {
        key.to_string()
    }
}

/// Strip exactly one escape prefix, leaving any further copies intact.
pub fn unescape_marker_key(key: &str) -> String {
    match key.strip_prefix(ESCAPE_PREFIX) {
        Some(rest) => rest.to_string(),
        None => key.to_string(),
    }
}
