//! Codec configuration: every option the public surface accepts, with the
//! defaults documented in the spec's external-interfaces table.

use crate::core::special::SymbolPolicy;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Config {
    /// Indent JSON output with two spaces.
    pub pretty: bool,
    /// Maximum recursion depth in both directions. `None` disables the cap.
    pub max_depth: Option<usize>,
    /// Allowlist of type ids permitted during deserialization. `None` means
    /// allow every registered type.
    pub allowed_types: Option<HashSet<String>>,
    pub symbol_policy: SymbolPolicy,
    /// Maximum RegExp pattern length accepted on deserialize. `None` disables the cap.
    pub max_regexp_pattern_length: Option<usize>,
    /// Bypass the nested-quantifier/overlapping-alternation heuristic.
    pub allow_unsafe_regexp: bool,
    /// Keys stripped from every freshly constructed mapping, on both sides.
    pub unsafe_keys: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pretty: false,
            max_depth: Some(1000),
            allowed_types: None,
            symbol_policy: SymbolPolicy::AllowAll,
            max_regexp_pattern_length: Some(1024),
            allow_unsafe_regexp: false,
            unsafe_keys: crate::core::limits::DEFAULT_UNSAFE_KEYS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
