//! valuegraph
//!
//! An identity-preserving value codec: converts in-memory object graphs to a
//! JSON-compatible textual form and back, preserving shared references and
//! cycles, losslessly encoding a handful of non-JSON primitives (undefined,
//! non-finite numbers, big integers, symbols, dates, regexes, maps, sets,
//! errors, URLs, byte buffers), and exposing a pluggable type registry for
//! application-defined types.
//!
//! Two wire forms are supported: a plain JSON tree (`stringify`/`parse`,
//! cycles rejected) and a graph envelope that preserves identity and cycles
//! through explicit reference nodes (`serialize`/`deserialize`).

pub mod core;

pub use core::builtins::{
    ByteBufferKind, ByteBufferValue, DateValue, ErrorValue, MapValue, RegExpValue, SetValue,
    TypedArrayKind, TypedArrayValue, UrlSearchParamsValue, UrlValue,
};
pub use core::config::Config;
pub use core::errors::{CodecError, Result};
pub use core::registry::{Strategy, TypeDefinition, TypeRegistry};
pub use core::special::{BigIntValue, NonFiniteNumber, NonFiniteTag, SymbolKind, SymbolPolicy, SymbolValue};
pub use core::value::{Instance, Value};

/// Owns a [`TypeRegistry`] and a [`Config`] and exposes the four public
/// entry points. Construction seeds every built-in; [`Codec::add_type`] and
/// [`Codec::add_type_simple`] append user definitions in the order called,
/// which is also their match precedence.
pub struct Codec {
    registry: TypeRegistry,
    config: Config,
}

impl Codec {
    pub fn new() -> Self {
        Codec { registry: TypeRegistry::new(), config: Config::default() }
    }

    pub fn with_config(config: Config) -> Self {
        Codec { registry: TypeRegistry::new(), config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn add_type(&mut self, def: TypeDefinition) -> Result<()> {
        self.registry.add(def)
    }

    pub fn add_type_simple<T, ToJson, FromJson>(
        &mut self,
        name: &'static str,
        to_json: ToJson,
        from_json: FromJson,
    ) -> Result<()>
    where
        T: Instance + Clone + 'static,
        ToJson: Fn(&T) -> Value + 'static,
        FromJson: Fn(Value) -> Result<T> + 'static,
    {
        self.registry.add_simple(name, to_json, from_json)
    }

    /// Tree form: a faithful JSON tree. Cycles fail with `CircularInTreeMode`.
    pub fn stringify(&self, value: &Value) -> Result<String> {
        let json = core::tree::stringify(value, &self.registry, &self.config)?;
        Ok(render(&json, self.config.pretty))
    }

    /// Tree form: recognizes the same envelope/legacy shapes `deserialize`
    /// does — the spec's own composition diagram funnels both entry points
    /// through one decode pipeline.
    pub fn parse(&self, text: &str) -> Result<Value> {
        core::deserializer::decode(text, &self.registry, &self.config)
    }

    /// Graph form: preserves identity and cycles via `{__graph,...}`.
    /// Collapses to plain tree-form JSON when no node was recorded.
    pub fn serialize(&self, value: &Value) -> Result<String> {
        let json = core::graph::serialize_graph(value, &self.registry, &self.config)?;
        Ok(render(&json, self.config.pretty))
    }

    pub fn deserialize(&self, text: &str) -> Result<Value> {
        core::deserializer::decode(text, &self.registry, &self.config)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

fn render(json: &serde_json::Value, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(json).expect("Value -> JSON never fails")
    } else {
        serde_json::to_string(json).expect("Value -> JSON never fails")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_primitives_through_tree_form() {
        let codec = Codec::new();
        for v in [Value::Null, Value::Bool(true), Value::Number(42.0), Value::String("hi".into())] {
            let text = codec.stringify(&v).unwrap();
            let back = codec.parse(&text).unwrap();
            assert!(back.structurally_eq(&v));
        }
    }

    #[test]
    fn shared_map_keeps_identity_through_graph_form() {
        let codec = Codec::new();
        let m = Value::instance(MapValue(vec![(Value::String("count".into()), Value::Number(1.0))]));
        let root = Value::object(vec![("a".into(), m.clone()), ("b".into(), m)]);

        let text = codec.serialize(&root).unwrap();
        let back = codec.deserialize(&text).unwrap();

        let core::value::Value::Object(fields) = &back else { panic!("expected object") };
        let fields = fields.borrow();
        let (_, a) = &fields[0];
        let (_, b) = &fields[1];
        let core::value::Value::Instance(a_cell) = a else { panic!("expected Map instance") };
        let core::value::Value::Instance(b_cell) = b else { panic!("expected Map instance") };
        assert!(std::rc::Rc::ptr_eq(a_cell, b_cell));
    }

    #[test]
    fn non_finite_numbers_round_trip() {
        let codec = Codec::new();
        let v = Value::instance_value(NonFiniteNumber(core::special::NonFiniteTag::NaN));
        let text = codec.stringify(&v).unwrap();
        assert!(text.contains("NonFiniteNumber"));
        let back = codec.parse(&text).unwrap();
        assert!(back.structurally_eq(&v));
    }

    #[test]
    fn cycle_through_plain_objects_round_trips_in_graph_form() {
        let codec = Codec::new();
        let obj = Value::object(vec![]);
        if let core::value::Value::Object(cell) = &obj {
            cell.borrow_mut().push(("self".to_string(), obj.clone()));
        }
        let text = codec.serialize(&obj).unwrap();
        let back = codec.deserialize(&text).unwrap();
        let core::value::Value::Object(fields) = &back else { panic!("expected object") };
        let (_, self_ref) = &fields.borrow()[0];
        let core::value::Value::Object(inner) = self_ref else { panic!("expected object") };
        assert!(std::rc::Rc::ptr_eq(fields, inner));
    }

    #[test]
    fn cycle_through_plain_objects_in_tree_form_fails() {
        let codec = Codec::new();
        let obj = Value::object(vec![]);
        if let core::value::Value::Object(cell) = &obj {
            cell.borrow_mut().push(("self".to_string(), obj.clone()));
        }
        assert!(matches!(codec.stringify(&obj), Err(CodecError::CircularInTreeMode)));
    }

    #[test]
    fn allowlist_rejects_disallowed_types_on_decode() {
        let mut config = Config::default();
        let mut allowed = std::collections::HashSet::new();
        allowed.insert("Map".to_string());
        config.allowed_types = Some(allowed);
        let codec = Codec::with_config(config);

        let text = r#"{"__type":"Date","value":"2024-01-01T00:00:00.000Z"}"#;
        assert!(matches!(codec.parse(text), Err(CodecError::TypeNotAllowed(_))));
    }
}
