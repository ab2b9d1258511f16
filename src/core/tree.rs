//! Tree serializer (`stringify`) and the legacy-path deserializer.
//!
//! Tree form never allocates node ids: every value is inlined directly,
//! shared subtrees are duplicated on the wire, and an actual cycle (a value
//! revisited while still being encoded) fails with `CircularInTreeMode`
//! rather than silently looping forever.

use serde_json::{Map as JsonMap, Value as Json};

use crate::core::config::Config;
use crate::core::errors::CodecError;
use crate::core::graph::{identity_ptr, is_type_shape};
use crate::core::limits::{assert_depth, escape_marker_key, is_unsafe_key, unescape_marker_key};
use crate::core::registry::TypeRegistry;
use crate::core::value::Value;

pub fn stringify(value: &Value, registry: &TypeRegistry, config: &Config) -> Result<Json, CodecError> {
    let mut visiting = Vec::new();
    encode(value, 0, &[], &mut visiting, registry, config)
}

fn encode(
    value: &Value,
    depth: usize,
    excluded: &[String],
    visiting: &mut Vec<usize>,
    registry: &TypeRegistry,
    config: &Config,
) -> Result<Json, CodecError> {
    assert_depth(depth, config.max_depth)?;

    let ptr = identity_ptr(value);
    if let Some(ptr) = ptr {
        if visiting.contains(&ptr) {
            return Err(CodecError::CircularInTreeMode);
        }
    }

    match value {
        Value::Null => return Ok(Json::Null),
        Value::Bool(b) => return Ok(Json::Bool(*b)),
        Value::Number(n) => return Ok(serde_json::json!(n)),
        Value::String(s) => return Ok(Json::String(s.clone())),
        _ => {}
    }

    if let Some(def) = registry.find(value, excluded) {
        let payload = (def.to_payload)(value)?;
        let mut nested_excluded = excluded.to_vec();
        if registry.should_exclude_from_payload(def, &payload) {
            nested_excluded.push(def.id.clone());
        }
        if let Some(ptr) = ptr {
            visiting.push(ptr);
        }
        let payload_json = encode(&payload, depth + 1, &nested_excluded, visiting, registry, config);
        if ptr.is_some() {
            visiting.pop();
        }
        let payload_json = payload_json?;
        return Ok(serde_json::json!({ crate::core::limits::MARKER_TYPE: def.id, "value": payload_json }));
    }

    match value {
        Value::Array(items) => {
            assert_depth(depth + 1, config.max_depth)?;
            let ptr = ptr.expect("arrays are always identity-bearing");
            visiting.push(ptr);
            let mut out = Vec::with_capacity(items.borrow().len());
            for item in items.borrow().iter() {
                out.push(encode(item, depth + 1, excluded, visiting, registry, config)?);
            }
            visiting.pop();
            Ok(Json::Array(out))
        }
        Value::Object(fields) => {
            assert_depth(depth + 1, config.max_depth)?;
            let ptr = ptr.expect("objects are always identity-bearing");
            visiting.push(ptr);
            let mut map = JsonMap::new();
            for (key, val) in fields.borrow().iter() {
                if is_unsafe_key(key, &config.unsafe_keys) {
                    continue;
                }
                let wire_key = escape_marker_key(key);
                map.insert(wire_key, encode(val, depth + 1, excluded, visiting, registry, config)?);
            }
            visiting.pop();
            Ok(Json::Object(map))
        }
        Value::Undefined | Value::Instance(_) | Value::InstanceValue(_) => Err(CodecError::UnsupportedFeature(
            "value has no matching registered type".into(),
        )),
        _ => unreachable!("primitives handled above"),
    }
}

/// Walks a JSON value recursively, recognizing `{"__type","value"}` type
/// records and unescaping marker keys on mappings. Used both for the
/// legacy (non-graph) top-level form and, inline, for nested non-graph
/// structures reached while decoding.
pub fn parse_legacy(json: &Json, depth: usize, registry: &TypeRegistry, config: &Config) -> Result<Value, CodecError> {
    assert_depth(depth, config.max_depth)?;
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => Ok(Value::Number(n.as_f64().unwrap_or(f64::NAN))),
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(parse_legacy(item, depth + 1, registry, config)?);
            }
            Ok(Value::array(out))
        }
        Json::Object(_) => {
            if let Some((type_id, value_json)) = is_type_shape(json) {
                let def = registry.get_by_id(&type_id, config.allowed_types.as_ref())?;
                let payload = parse_legacy(&value_json, depth + 1, registry, config)?;
                return registry.deserialize_type(def, payload, config);
            }
            let obj = json.as_object().expect("matched Object variant");
            let mut fields = Vec::with_capacity(obj.len());
            for (key, val) in obj {
                if is_unsafe_key(key, &config.unsafe_keys) {
                    continue;
                }
                let safe_key = unescape_marker_key(key);
                fields.push((safe_key, parse_legacy(val, depth + 1, registry, config)?));
            }
            Ok(Value::object(fields))
        }
    }
}
