//! Graph envelope: node/reference shapes and the `serialize` algorithm.
//!
//! The graph form never inlines an array or mapping directly in a `<Value>`
//! position — every one becomes its own node and is referenced by id. Only
//! JSON primitives, `{"__ref":id}`, and an inlined value-strategy
//! `{"__type","value"}` record may appear where the grammar calls for a
//! `<Value>`.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map as JsonMap, Value as Json};

use crate::core::config::Config;
use crate::core::errors::CodecError;
use crate::core::limits::{assert_depth, escape_marker_key, is_unsafe_key, MARKER_GRAPH, MARKER_REF, MARKER_TYPE};
use crate::core::registry::{Strategy, TypeRegistry};
use crate::core::value::Value;

#[derive(Debug, Clone)]
pub enum GraphNode {
    Array(Vec<Json>),
    Object(Vec<(String, Json)>),
    Type { type_id: String, value: Json },
}

impl GraphNode {
    fn to_json(&self) -> Json {
        match self {
            GraphNode::Array(items) => serde_json::json!({"kind": "array", "value": items}),
            GraphNode::Object(fields) => {
                let mut map = JsonMap::new();
                for (k, v) in fields {
                    map.insert(k.clone(), v.clone());
                }
                serde_json::json!({"kind": "object", "value": Json::Object(map)})
            }
            GraphNode::Type { type_id, value } => {
                serde_json::json!({"kind": "type", "type": type_id, "value": value})
            }
        }
    }

    fn from_json(json: &Json) -> Result<GraphNode, CodecError> {
        let obj = json
            .as_object()
            .ok_or_else(|| CodecError::UnsupportedNodeKind("node must be an object".into()))?;
        let kind = obj
            .get("kind")
            .and_then(Json::as_str)
            .ok_or_else(|| CodecError::UnsupportedNodeKind("node missing `kind`".into()))?;
        match kind {
            "array" => {
                let items = obj
                    .get("value")
                    .and_then(Json::as_array)
                    .ok_or_else(|| CodecError::InvalidArrayNodePayload("array node".into()))?;
                Ok(GraphNode::Array(items.clone()))
            }
            "object" => {
                let value = obj
                    .get("value")
                    .and_then(Json::as_object)
                    .ok_or_else(|| CodecError::InvalidObjectNodePayload("object node".into()))?;
                Ok(GraphNode::Object(value.iter().map(|(k, v)| (k.clone(), v.clone())).collect()))
            }
            "type" => {
                let type_id = obj
                    .get("type")
                    .and_then(Json::as_str)
                    .ok_or_else(|| CodecError::InvalidObjectNodePayload("type node".into()))?;
                let value = obj
                    .get("value")
                    .cloned()
                    .ok_or_else(|| CodecError::InvalidObjectNodePayload("type node".into()))?;
                Ok(GraphNode::Type { type_id: type_id.to_string(), value })
            }
            other => Err(CodecError::UnsupportedNodeKind(other.to_string())),
        }
    }
}

/// The full `{"__graph","version","root","nodes"}` document. Parsed and
/// emitted through explicit field-by-field logic rather than a derived
/// `#[serde(tag = ...)]`, so the exact shape (no extra/missing keys) is
/// enforced uniformly, matching the spec's "`__ref` shape strictness" note.
pub struct Envelope {
    pub version: u64,
    pub root: Json,
    pub nodes: Vec<(String, GraphNode)>,
}

impl Envelope {
    pub fn to_json(&self) -> Json {
        let mut nodes = JsonMap::new();
        for (id, node) in &self.nodes {
            nodes.insert(id.clone(), node.to_json());
        }
        serde_json::json!({
            MARKER_GRAPH: true,
            "version": self.version,
            "root": self.root,
            "nodes": Json::Object(nodes),
        })
    }

    /// `true` iff `json` is a mapping with `__graph === true`, a `root` key,
    /// and a `nodes` key holding a mapping — the exact envelope sniff.
    pub fn looks_like_envelope(json: &Json) -> bool {
        json.as_object()
            .map(|obj| obj.get(MARKER_GRAPH) == Some(&Json::Bool(true)) && obj.contains_key("root") && obj.get("nodes").map(Json::is_object).unwrap_or(false))
            .unwrap_or(false)
    }

    pub fn from_json(json: &Json) -> Result<Envelope, CodecError> {
        let obj = json
            .as_object()
            .ok_or_else(|| CodecError::InvalidJson("envelope must be an object".into()))?;
        let version = obj
            .get("version")
            .and_then(Json::as_u64)
            .filter(|v| *v >= 1)
            .ok_or_else(|| CodecError::InvalidJson("envelope `version` must be a positive integer".into()))?;
        let root = obj
            .get("root")
            .cloned()
            .ok_or_else(|| CodecError::InvalidJson("envelope missing `root`".into()))?;
        let nodes_obj = obj
            .get("nodes")
            .and_then(Json::as_object)
            .ok_or_else(|| CodecError::InvalidJson("envelope `nodes` must be an object".into()))?;
        let mut nodes = Vec::with_capacity(nodes_obj.len());
        for (id, node_json) in nodes_obj {
            nodes.push((id.clone(), GraphNode::from_json(node_json)?));
        }
        Ok(Envelope { version, root, nodes })
    }
}

/// `{"__ref": id}` with exactly one own key. Returns the id when `json`
/// matches that shape exactly.
pub fn is_ref_shape(json: &Json) -> Option<String> {
    let obj = json.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    obj.get(MARKER_REF).and_then(Json::as_str).map(str::to_string)
}

/// `{"__type": id, "value": <Value>}` with exactly those two own keys.
pub fn is_type_shape(json: &Json) -> Option<(String, Json)> {
    let obj = json.as_object()?;
    if obj.len() != 2 {
        return None;
    }
    let type_id = obj.get(MARKER_TYPE).and_then(Json::as_str)?;
    let value = obj.get("value")?;
    Some((type_id.to_string(), value.clone()))
}

pub(crate) fn identity_ptr(value: &Value) -> Option<usize> {
    match value {
        Value::Array(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
        Value::Object(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
        Value::Instance(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
        _ => None,
    }
}

struct SerializationContext<'a> {
    registry: &'a TypeRegistry,
    config: &'a Config,
    ids: HashMap<usize, String>,
    nodes: Vec<(String, GraphNode)>,
    counter: u64,
}

impl<'a> SerializationContext<'a> {
    fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("obj_{}", self.counter)
    }
}

fn ref_json(id: &str) -> Json {
    serde_json::json!({ MARKER_REF: id })
}

/// Encodes one value into a `<Value>` position of the graph grammar.
fn encode(value: &Value, depth: usize, excluded: &[String], ctx: &mut SerializationContext) -> Result<Json, CodecError> {
    assert_depth(depth, ctx.config.max_depth)?;

    if let Some(ptr) = identity_ptr(value) {
        if let Some(id) = ctx.ids.get(&ptr) {
            return Ok(ref_json(id));
        }
    }

    match value {
        Value::Null => return Ok(Json::Null),
        Value::Bool(b) => return Ok(Json::Bool(*b)),
        Value::Number(n) => return Ok(serde_json::json!(n)),
        Value::String(s) => return Ok(Json::String(s.clone())),
        _ => {}
    }

    if let Some(def) = ctx.registry.find(value, excluded) {
        let payload = (def.to_payload)(value)?;
        let mut nested_excluded = excluded.to_vec();
        if ctx.registry.should_exclude_from_payload(def, &payload) {
            nested_excluded.push(def.id.clone());
        }
        return match def.strategy {
            Strategy::Value => {
                let payload_json = encode(&payload, depth + 1, &nested_excluded, ctx)?;
                Ok(serde_json::json!({ MARKER_TYPE: def.id, "value": payload_json }))
            }
            Strategy::Ref => {
                let id = ctx.next_id();
                if let Some(ptr) = identity_ptr(value) {
                    ctx.ids.insert(ptr, id.clone());
                }
                let payload_json = encode(&payload, depth + 1, &nested_excluded, ctx)?;
                ctx.nodes.push((id.clone(), GraphNode::Type { type_id: def.id.clone(), value: payload_json }));
                Ok(ref_json(&id))
            }
        };
    }

    match value {
        Value::Array(items) => {
            assert_depth(depth + 1, ctx.config.max_depth)?;
            let id = ctx.next_id();
            ctx.ids.insert(Rc::as_ptr(items) as *const () as usize, id.clone());
            let mut encoded = Vec::with_capacity(items.borrow().len());
            for item in items.borrow().iter() {
                encoded.push(encode(item, depth + 1, excluded, ctx)?);
            }
            ctx.nodes.push((id.clone(), GraphNode::Array(encoded)));
            Ok(ref_json(&id))
        }
        Value::Object(fields) => {
            assert_depth(depth + 1, ctx.config.max_depth)?;
            let id = ctx.next_id();
            ctx.ids.insert(Rc::as_ptr(fields) as *const () as usize, id.clone());
            let mut encoded = Vec::new();
            for (key, val) in fields.borrow().iter() {
                if is_unsafe_key(key, &ctx.config.unsafe_keys) {
                    continue;
                }
                let wire_key = escape_marker_key(key);
                encoded.push((wire_key, encode(val, depth + 1, excluded, ctx)?));
            }
            ctx.nodes.push((id.clone(), GraphNode::Object(encoded)));
            Ok(ref_json(&id))
        }
        Value::Undefined | Value::Instance(_) | Value::InstanceValue(_) => Err(CodecError::UnsupportedFeature(
            "value has no matching registered type".into(),
        )),
        _ => unreachable!("primitives handled above"),
    }
}

/// Runs the graph algorithm, collapsing to plain tree-form JSON when no
/// node was recorded and the root itself is not a reference.
pub fn serialize_graph(value: &Value, registry: &TypeRegistry, config: &Config) -> Result<Json, CodecError> {
    let mut ctx = SerializationContext { registry, config, ids: HashMap::new(), nodes: Vec::new(), counter: 0 };
    let root = encode(value, 0, &[], &mut ctx)?;

    if ctx.nodes.is_empty() && is_ref_shape(&root).is_none() {
        return Ok(root);
    }

    let envelope = Envelope { version: 1, root, nodes: ctx.nodes };
    Ok(envelope.to_json())
}
