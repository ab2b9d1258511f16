//! `parse` / `deserialize`: envelope sniff, graph reference resolution, and
//! the placeholder/merge protocol for cyclic ref-strategy nodes.
//!
//! Both public entry points funnel through [`decode`] — the spec's own
//! composition diagram describes one pipeline ("JSON decode → envelope
//! sniff → graph or legacy path → registry type resolution") shared by
//! both method names; they differ only in which serializer produced the
//! input, not in how it is read back.

use std::collections::{HashMap, HashSet};

use serde_json::Value as Json;

use crate::core::config::Config;
use crate::core::errors::CodecError;
use crate::core::graph::{is_ref_shape, Envelope, GraphNode};
use crate::core::limits::{assert_depth, is_unsafe_key};
use crate::core::registry::TypeDefinition;
use crate::core::registry::TypeRegistry;
use crate::core::tree;
use crate::core::value::Value;

pub fn decode(text: &str, registry: &TypeRegistry, config: &Config) -> Result<Value, CodecError> {
    let json: Json = serde_json::from_str(text).map_err(|e| CodecError::InvalidJson(e.to_string()))?;
    if Envelope::looks_like_envelope(&json) {
        let envelope = Envelope::from_json(&json)?;
        decode_graph(envelope, registry, config)
    } else {
        tree::parse_legacy(&json, 0, registry, config)
    }
}

fn decode_graph(envelope: Envelope, registry: &TypeRegistry, config: &Config) -> Result<Value, CodecError> {
    let nodes: HashMap<String, GraphNode> = envelope.nodes.into_iter().collect();
    let mut ctx = DeserializationContext {
        registry,
        config,
        nodes,
        cells: HashMap::new(),
        resolving: HashSet::new(),
        resolving_refs: HashSet::new(),
    };
    ctx.decode_value(&envelope.root, 0)
}

struct DeserializationContext<'a> {
    registry: &'a TypeRegistry,
    config: &'a Config,
    nodes: HashMap<String, GraphNode>,
    cells: HashMap<String, Value>,
    resolving: HashSet<String>,
    resolving_refs: HashSet<String>,
}

impl<'a> DeserializationContext<'a> {
    /// Decodes one `<Value>` position: a JSON primitive, a `{"__ref":id}`
    /// back-reference, or an inlined value-strategy `{"__type","value"}`
    /// record. Arrays and mappings never appear inline in graph form — they
    /// are always their own node, reached only through a reference.
    fn decode_value(&mut self, json: &Json, depth: usize) -> Result<Value, CodecError> {
        assert_depth(depth, self.config.max_depth)?;
        match json {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(n) => Ok(Value::Number(n.as_f64().unwrap_or(f64::NAN))),
            Json::String(s) => Ok(Value::String(s.clone())),
            Json::Object(_) => {
                if let Some(id) = is_ref_shape(json) {
                    return self.resolve(&id, depth);
                }
                if let Some((type_id, value_json)) = crate::core::graph::is_type_shape(json) {
                    let def = self.registry.get_by_id(&type_id, self.config.allowed_types.as_ref())?;
                    let payload = self.decode_value(&value_json, depth + 1)?;
                    return self.registry.deserialize_type(def, payload, self.config);
                }
                Err(CodecError::UnsupportedNodeKind("inline object in graph value position".into()))
            }
            Json::Array(_) => Err(CodecError::UnsupportedNodeKind("inline array in graph value position".into())),
        }
    }

    fn resolve(&mut self, id: &str, depth: usize) -> Result<Value, CodecError> {
        if is_unsafe_key(id, &self.config.unsafe_keys) {
            return Err(CodecError::UnresolvedReference(id.to_string()));
        }
        if let Some(v) = self.cells.get(id) {
            if self.resolving.contains(id) {
                self.resolving_refs.insert(id.to_string());
            }
            return Ok(v.clone());
        }
        let node = self
            .nodes
            .get(id)
            .cloned()
            .ok_or_else(|| CodecError::UnresolvedReference(id.to_string()))?;
        self.resolving.insert(id.to_string());
        let result = self.dispatch_node(id, node, depth)?;
        self.resolving.remove(id);
        Ok(result)
    }

    fn dispatch_node(&mut self, id: &str, node: GraphNode, depth: usize) -> Result<Value, CodecError> {
        match node {
            GraphNode::Array(items_json) => {
                assert_depth(depth + 1, self.config.max_depth)?;
                let placeholder = Value::array(Vec::new());
                self.cells.insert(id.to_string(), placeholder.clone());
                let mut built = Vec::with_capacity(items_json.len());
                for item in &items_json {
                    built.push(self.decode_value(item, depth + 1)?);
                }
                if let Value::Array(cell) = &placeholder {
                    *cell.borrow_mut() = built;
                }
                Ok(placeholder)
            }
            GraphNode::Object(fields_json) => {
                assert_depth(depth + 1, self.config.max_depth)?;
                let placeholder = Value::object(Vec::new());
                self.cells.insert(id.to_string(), placeholder.clone());
                let mut built = Vec::with_capacity(fields_json.len());
                for (key, val) in &fields_json {
                    if is_unsafe_key(key, &self.config.unsafe_keys) {
                        continue;
                    }
                    let safe_key = crate::core::limits::unescape_marker_key(key);
                    built.push((safe_key, self.decode_value(val, depth + 1)?));
                }
                if let Value::Object(cell) = &placeholder {
                    *cell.borrow_mut() = built;
                }
                Ok(placeholder)
            }
            GraphNode::Type { type_id, value } => {
                let def = self.registry.get_by_id(&type_id, self.config.allowed_types.as_ref())?;
                let placeholder = match &def.create {
                    Some(factory) => factory(),
                    None => Value::object(Vec::new()),
                };
                self.cells.insert(id.to_string(), placeholder.clone());
                let payload = self.decode_value(&value, depth + 1)?;
                let result = self.registry.deserialize_type(def, payload, self.config)?;
                let merged = self.merge(id, def, placeholder, result)?;
                self.cells.insert(id.to_string(), merged.clone());
                Ok(merged)
            }
        }
    }

    /// Merge protocol: a `TypeDefinition` with `create` always pairs it with
    /// `merge`, which mutates the placeholder in place (Map/Set/Error and
    /// any custom ref-strategy type). Types without a `create` factory fall
    /// back to the generic object-to-object copy, or fail
    /// `CircularWithoutFactory` when a cycle actually depended on the
    /// placeholder and the result can't be adopted in place.
    fn merge(&mut self, id: &str, def: &TypeDefinition, placeholder: Value, result: Value) -> Result<Value, CodecError> {
        if let Some(merge_fn) = &def.merge {
            return merge_fn(&placeholder, result);
        }
        match (&placeholder, &result) {
            (Value::Object(dst), Value::Object(src)) => {
                let safe: Vec<(String, Value)> = src
                    .borrow()
                    .iter()
                    .filter(|(k, _)| !is_unsafe_key(k, &self.config.unsafe_keys))
                    .cloned()
                    .collect();
                *dst.borrow_mut() = safe;
                Ok(placeholder)
            }
            _ if self.resolving_refs.contains(id) => Err(CodecError::CircularWithoutFactory),
            _ => Ok(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::TypeRegistry;

    fn ctx() -> (TypeRegistry, Config) {
        (TypeRegistry::new(), Config::default())
    }

    #[test]
    fn unresolved_reference_fails() {
        let (reg, cfg) = ctx();
        let text = r#"{"__graph":true,"version":1,"root":{"__ref":"obj_1"},"nodes":{}}"#;
        let err = decode(text, &reg, &cfg).unwrap_err();
        assert!(matches!(err, CodecError::UnresolvedReference(_)));
    }

    #[test]
    fn self_referencing_object_resolves_to_itself() {
        let (reg, cfg) = ctx();
        let text = r#"{"__graph":true,"version":1,"root":{"__ref":"obj_1"},"nodes":{"obj_1":{"kind":"object","value":{"self":{"__ref":"obj_1"}}}}}"#;
        let value = decode(text, &reg, &cfg).unwrap();
        let Value::Object(fields) = &value else { panic!("expected object") };
        let (_, self_ref) = &fields.borrow()[0];
        let Value::Object(inner) = self_ref else { panic!("expected object") };
        assert!(std::rc::Rc::ptr_eq(fields, inner));
    }

    #[test]
    fn proto_pollution_key_is_dropped() {
        let (reg, cfg) = ctx();
        let text = r#"{"__proto__":{"polluted":true},"safe":1}"#;
        let value = decode(text, &reg, &cfg).unwrap();
        let Value::Object(fields) = &value else { panic!("expected object") };
        let fields = fields.borrow();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "safe");
    }

    #[test]
    fn unsafe_regexp_payload_is_rejected() {
        let (reg, cfg) = ctx();
        let text = r#"{"__type":"RegExp","value":{"pattern":"(a+)+","flags":""}}"#;
        let err = decode(text, &reg, &cfg).unwrap_err();
        assert!(matches!(err, CodecError::UnsafeRegExpPattern(_)));
    }
}
