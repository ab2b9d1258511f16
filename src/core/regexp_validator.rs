//! RegExp safety validator.
//!
//! A syntactic heuristic that rejects patterns likely to trigger
//! catastrophic backtracking in a typical backtracking regex engine: nested
//! quantifiers, and quantified groups whose top-level alternation branches
//! overlap (one is a prefix of another, either branch is empty, or the
//! branches are equal).
//!
//! This is a static, character-by-character walk — it never compiles the
//! pattern. Rust's `regex` crate is deliberately not used here: it rejects
//! backreferences and lookaround outright, so compiling would reject valid
//! input the heuristic is supposed to merely classify.

use crate::core::errors::CodecError;

const VALID_FLAGS: &[char] = &['d', 'g', 'i', 'm', 's', 'u', 'v', 'y'];

pub fn validate_flags(flags: &str) -> Result<(), CodecError> {
    let mut seen = std::collections::HashSet::new();
    for ch in flags.chars() {
        if !VALID_FLAGS.contains(&ch) || !seen.insert(ch) {
            return Err(CodecError::InvalidRegExpFlags(flags.to_string()));
        }
    }
    Ok(())
}

pub fn check_length(pattern: &str, max_len: Option<usize>) -> Result<(), CodecError> {
    match max_len {
        Some(limit) if pattern.len() > limit => Err(CodecError::RegExpPatternTooLong {
            len: pattern.len(),
            limit,
        }),
        _ => Ok(()),
    }
}

/// `true` for a non-empty span of identifier characters only — the shape a
/// named-group name must have. A span containing `(`, `)`, `|`, or any
/// quantifier character is not a name; it means `?<` was not introducing a
/// named group header at all, and the `(` must be treated as an ordinary
/// capturing group so its contents are still scanned as body text.
fn is_group_name(span: &[char]) -> bool {
    !span.is_empty() && span.iter().all(|c| c.is_ascii_alphanumeric() || *c == '_')
}

/// Prefixes that introduce a non-matching or assertion group; stripped
/// before a group body is analyzed for ambiguous alternation. `(?<name>`
/// (a *named capturing* group) is also stripped here since its header is
/// not part of the matched body either — but only when the span up to the
/// closing `>` is actually a valid identifier.
fn strip_group_header(body: &str) -> &str {
    for marker in ["?:", "?=", "?!", "?>", "?<=", "?<!"] {
        if let Some(rest) = body.strip_prefix(marker) {
            return rest;
        }
    }
    if let Some(rest) = body.strip_prefix("?<") {
        if let Some(close) = rest.find('>') {
            let name: Vec<char> = rest[..close].chars().collect();
            if is_group_name(&name) {
                return &rest[close + 1..];
            }
        }
    }
    body
}

/// Length, in chars, of a non-capturing/lookaround/named-group header
/// immediately following a just-consumed `(`, so the main walk never
/// mistakes a header character (the `?` in `(?:`, `(?<name>`, ...) for a
/// bare quantifier. Returns 0 (no header) when `?<...>` doesn't bound a
/// valid identifier, so the `(` is walked as an ordinary capturing group
/// and whatever it actually contains — including a nested `(a+)+` shape —
/// is visited by the main scan instead of being swallowed whole.
fn group_header_len(after_paren: &[char]) -> usize {
    for marker in ["?:", "?=", "?!", "?>", "?<=", "?<!"] {
        let marker_chars: Vec<char> = marker.chars().collect();
        if after_paren.starts_with(&marker_chars[..]) {
            return marker_chars.len();
        }
    }
    if after_paren.starts_with(&['?', '<']) {
        if let Some(close) = after_paren[2..].iter().position(|&c| c == '>') {
            let name = &after_paren[2..2 + close];
            if is_group_name(name) {
                return close + 3;
            }
        }
    }
    0
}

/// Split a (header-stripped) group body into its top-level alternation
/// branches, respecting nested groups and character classes.
fn top_level_branches(body: &str) -> Vec<&str> {
    let mut branches = Vec::new();
    let mut depth = 0i32;
    let mut in_class = false;
    let mut escape = false;
    let mut start = 0usize;
    for (i, ch) in body.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' => escape = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => depth -= 1,
            '|' if !in_class && depth == 0 => {
                branches.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    branches.push(&body[start..]);
    branches
}

/// Two branches are "overlapping" if one is a (possibly equal) prefix of
/// the other, or either is empty — the classic `(a|aa)+` / `(a|)+` shapes
/// that defeat a backtracking engine's memoization.
fn branches_overlap(branches: &[&str]) -> bool {
    for i in 0..branches.len() {
        for j in 0..branches.len() {
            if i == j {
                continue;
            }
            let (a, b) = (branches[i], branches[j]);
            if a.is_empty() || b.is_empty() || a == b || b.starts_with(a) {
                return true;
            }
        }
    }
    false
}

struct Group {
    has_quantifier: bool,
}

/// Walk the pattern tracking escape state, character classes, and a stack
/// of groups. When a group closes and is immediately followed by a
/// quantifier, the group is unsafe if its body already contains a
/// quantifier, or if its top-level alternation branches overlap.
/// "Has a quantifier" propagates up the group stack so nesting is caught
/// even when the inner quantified group isn't itself re-quantified.
pub fn is_regexp_pattern_safe(pattern: &str) -> bool {
    let bytes: Vec<char> = pattern.chars().collect();
    let mut i = 0usize;
    let mut class_depth = 0u32;
    let mut stack: Vec<Group> = vec![Group { has_quantifier: false }];
    // group_start[k] = index (in `bytes`) just after the '(' of the group
    // that pushed stack level k+1.
    let mut group_start: Vec<usize> = Vec::new();

    while i < bytes.len() {
        let ch = bytes[i];
        match ch {
            '\\' => {
                i += 2;
                continue;
            }
            '[' if class_depth == 0 => {
                class_depth = 1;
                i += 1;
                continue;
            }
            ']' if class_depth > 0 => {
                class_depth = 0;
                i += 1;
                continue;
            }
            '(' if class_depth == 0 => {
                stack.push(Group { has_quantifier: false });
                let header_len = group_header_len(&bytes[i + 1..]);
                group_start.push(i + 1 + header_len);
                i += 1 + header_len;
                continue;
            }
            ')' if class_depth == 0 => {
                let closed = stack.pop().unwrap_or(Group { has_quantifier: false });
                let start = group_start.pop().unwrap_or(i);
                let body: String = bytes[start..i].iter().collect();

                let quantified_next = matches!(bytes.get(i + 1), Some('*' | '+' | '?'))
                    || matches!(bytes.get(i + 1), Some('{'))
                        && find_brace_quantifier_end(&bytes, i + 1).is_some();

                if quantified_next {
                    let analyzed = strip_group_header(&body);
                    let branches = top_level_branches(analyzed);
                    if closed.has_quantifier || (branches.len() > 1 && branches_overlap(&branches)) {
                        return false;
                    }
                    if let Some(parent) = stack.last_mut() {
                        parent.has_quantifier = true;
                    }
                } else if closed.has_quantifier {
                    if let Some(parent) = stack.last_mut() {
                        parent.has_quantifier = true;
                    }
                }

                i += 1;
                continue;
            }
            '*' | '+' | '?' if class_depth == 0 => {
                if let Some(top) = stack.last_mut() {
                    top.has_quantifier = true;
                }
                i += 1;
                continue;
            }
            '{' if class_depth == 0 => {
                if let Some(end) = find_brace_quantifier_end(&bytes, i) {
                    if let Some(top) = stack.last_mut() {
                        top.has_quantifier = true;
                    }
                    i = end + 1;
                    continue;
                }
                i += 1;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    true
}

/// If `{` at `start` opens a valid `{n}`/`{n,}`/`{n,m}` quantifier, return
/// the index of the matching `}`.
fn find_brace_quantifier_end(bytes: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    let mut saw_digit = false;
    while j < bytes.len() && bytes[j].is_ascii_digit() {
        saw_digit = true;
        j += 1;
    }
    if j < bytes.len() && bytes[j] == ',' {
        j += 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
    }
    if saw_digit && j < bytes.len() && bytes[j] == '}' {
        Some(j)
    } else {
        None
    }
}

pub struct ValidateOptions {
    pub allow_unsafe: bool,
    pub max_pattern_length: Option<usize>,
}

pub fn validate_for_deserialize(
    pattern: &str,
    flags: &str,
    opts: &ValidateOptions,
) -> Result<(), CodecError> {
    validate_flags(flags)?;
    check_length(pattern, opts.max_pattern_length)?;
    if !opts.allow_unsafe && !is_regexp_pattern_safe(pattern) {
        return Err(CodecError::UnsafeRegExpPattern(pattern.to_string()));
    }
    Ok(())
}
