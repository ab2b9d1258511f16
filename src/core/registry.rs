//! The type registry: built-in and user-registered [`TypeDefinition`]s,
//! allowlist enforcement, and the Symbol/RegExp policy wrappers the
//! deserializer routes typed payloads through.

use std::collections::HashSet;

use crate::core::builtins::*;
use crate::core::config::Config;
use crate::core::errors::CodecError;
use crate::core::regexp_validator::{self, ValidateOptions};
use crate::core::special::*;
use crate::core::value::{Instance, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Always inlined in the payload; never participates in identity tracking.
    Value,
    /// Materialized as a node whose id participates in identity tracking
    /// and may appear in cycles.
    Ref,
}

/// A single pluggable type: a runtime predicate plus the two reciprocal
/// conversions to and from a generic payload [`Value`]. The payload itself
/// is recursed into by the tree/graph serializer, not by the type
/// definition — `to_payload`/`from_payload` only reshape one instance into
/// (or out of) a structure the generic recursion already knows how to walk.
pub struct TypeDefinition {
    pub id: String,
    pub strategy: Strategy,
    pub is: Box<dyn Fn(&Value) -> bool>,
    pub to_payload: Box<dyn Fn(&Value) -> Result<Value, CodecError>>,
    pub from_payload: Box<dyn Fn(Value) -> Result<Value, CodecError>>,
    /// Ref-strategy types that can appear inside their own payload (cycles)
    /// must provide a placeholder factory.
    pub create: Option<Box<dyn Fn() -> Value>>,
    /// Mutates a placeholder built by `create` in place once the real
    /// value has been deserialized, so outstanding references converge on
    /// one shared instance. Required whenever `create` is `Some`.
    pub merge: Option<Box<dyn Fn(&Value, Value) -> Result<Value, CodecError>>>,
}

impl TypeDefinition {
    fn is_empty_id(&self) -> bool {
        self.id.is_empty()
    }
}

pub struct TypeRegistry {
    defs: Vec<TypeDefinition>,
    builtin_count: usize,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut reg = TypeRegistry {
            defs: Vec::new(),
            builtin_count: 0,
        };
        reg.seed_builtins();
        reg.builtin_count = reg.defs.len();
        reg
    }

    /// Register a custom type. Fails when `id` is empty or already present
    /// — this includes built-in ids, which can never be replaced because
    /// they are seeded first and this check runs against the full list.
    pub fn add(&mut self, def: TypeDefinition) -> Result<(), CodecError> {
        if def.is_empty_id() {
            return Err(CodecError::TypeRegistry("type id must not be empty".into()));
        }
        if self.defs.iter().any(|d| d.id == def.id) {
            return Err(CodecError::TypeRegistry(format!(
                "type id `{}` is already registered",
                def.id
            )));
        }
        if def.create.is_some() && def.merge.is_none() {
            return Err(CodecError::TypeRegistry(format!(
                "type `{}` provides `create` but no `merge`",
                def.id
            )));
        }
        self.defs.push(def);
        Ok(())
    }

    /// Convenience overload: a value-strategy type for instances exposing
    /// `type_name()`/`to_json_value()`-equivalents. The predicate matches
    /// only when the instance's `type_name()` equals `name`.
    pub fn add_simple<T, ToJson, FromJson>(
        &mut self,
        name: &'static str,
        to_json: ToJson,
        from_json: FromJson,
    ) -> Result<(), CodecError>
    where
        T: Instance + Clone + 'static,
        ToJson: Fn(&T) -> Value + 'static,
        FromJson: Fn(Value) -> Result<T, CodecError> + 'static,
    {
        self.add(TypeDefinition {
            id: name.to_string(),
            strategy: Strategy::Value,
            is: Box::new(move |v: &Value| match v {
                Value::InstanceValue(inst) => inst.type_name() == name,
                Value::Instance(inst) => inst.borrow().type_name() == name,
                _ => false,
            }),
            to_payload: Box::new(move |v: &Value| {
                let inst = downcast::<T>(v).ok_or_else(|| {
                    CodecError::TypeRegistry(format!("value is not a `{name}` instance"))
                })?;
                Ok(to_json(&inst))
            }),
            from_payload: Box::new(move |payload: Value| {
                Ok(Value::instance_value(from_json(payload)?))
            }),
            create: None,
            merge: None,
        })
    }

    /// First applicable definition for a runtime value, in insertion order,
    /// skipping any id present in `excluded`.
    pub fn find(&self, value: &Value, excluded: &[String]) -> Option<&TypeDefinition> {
        self.defs
            .iter()
            .find(|d| !excluded.iter().any(|e| e == &d.id) && (d.is)(value))
    }

    /// `shouldExcludeFromPayload`: true when this definition also matches
    /// the *serialized payload* of its own instance, which would otherwise
    /// cause the payload to be re-wrapped in an infinite loop.
    pub fn should_exclude_from_payload(&self, def: &TypeDefinition, payload: &Value) -> bool {
        (def.is)(payload)
    }

    pub fn get_by_id<'a>(
        &'a self,
        id: &str,
        allowed: Option<&HashSet<String>>,
    ) -> Result<&'a TypeDefinition, CodecError> {
        if let Some(allowed) = allowed {
            if !allowed.contains(id) {
                return Err(CodecError::TypeNotAllowed(id.to_string()));
            }
        }
        self.defs
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| CodecError::UnknownType(id.to_string()))
    }

    /// Routes Symbol/RegExp payloads through their policy/validator
    /// wrappers before delegating to `def.from_payload`.
    pub fn deserialize_type(
        &self,
        def: &TypeDefinition,
        payload: Value,
        config: &Config,
    ) -> Result<Value, CodecError> {
        match def.id.as_str() {
            "Symbol" => validate_symbol_payload(&payload, config.symbol_policy)?,
            "RegExp" => validate_regexp_payload(&payload, config)?,
            _ => {}
        }
        (def.from_payload)(payload)
    }

    pub fn is_builtin(&self, id: &str) -> bool {
        self.defs[..self.builtin_count].iter().any(|d| d.id == id)
    }

    pub fn builtin_ids(&self) -> Vec<&str> {
        self.defs[..self.builtin_count].iter().map(|d| d.id.as_str()).collect()
    }

    fn seed_builtins(&mut self) {
        self.defs.push(date_def());
        self.defs.push(regexp_def());
        self.defs.push(map_def());
        self.defs.push(set_def());
        self.defs.push(undefined_def());
        self.defs.push(non_finite_def());
        self.defs.push(bigint_def());
        self.defs.push(symbol_def());
        self.defs.push(error_def());
        self.defs.push(url_def());
        self.defs.push(url_search_params_def());
        self.defs.push(byte_buffer_def(ByteBufferKind::ArrayBuffer));
        self.defs.push(byte_buffer_def(ByteBufferKind::DataView));
        self.defs.push(byte_buffer_def(ByteBufferKind::Buffer));
        for kind in TypedArrayKind::all() {
            self.defs.push(typed_array_def(*kind));
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast<T: Clone + 'static>(value: &Value) -> Option<T> {
    match value {
        Value::InstanceValue(inst) => inst.as_any().downcast_ref::<T>().cloned(),
        Value::Instance(inst) => inst.borrow().as_any().downcast_ref::<T>().cloned(),
        _ => None,
    }
}

fn bytes_to_payload(bytes: &[u8]) -> Value {
    Value::array(bytes.iter().map(|b| Value::Number(*b as f64)).collect())
}

fn payload_to_bytes(payload: Value) -> Result<Vec<u8>, CodecError> {
    let Value::Array(items) = payload else {
        return Err(CodecError::InvalidArrayNodePayload("byte buffer".into()));
    };
    let borrowed = items.borrow();
    borrowed
        .iter()
        .map(|v| match v {
            Value::Number(n) if (0.0..=255.0).contains(n) && n.fract() == 0.0 => Ok(*n as u8),
            _ => Err(CodecError::InvalidArrayNodePayload("byte buffer".into())),
        })
        .collect()
}

fn date_def() -> TypeDefinition {
    TypeDefinition {
        id: "Date".into(),
        strategy: Strategy::Value,
        is: Box::new(|v| matches!(v, Value::InstanceValue(i) if i.type_name() == "Date")),
        to_payload: Box::new(|v| {
            let d: DateValue = downcast(v).ok_or_else(|| {
                CodecError::TypeRegistry("value is not a Date instance".into())
            })?;
            Ok(Value::String(d.0))
        }),
        from_payload: Box::new(|payload| match payload {
            Value::String(s) => Ok(Value::instance_value(DateValue(s))),
            _ => Err(CodecError::InvalidObjectNodePayload("Date".into())),
        }),
        create: None,
        merge: None,
    }
}

fn regexp_def() -> TypeDefinition {
    TypeDefinition {
        id: "RegExp".into(),
        strategy: Strategy::Value,
        is: Box::new(|v| matches!(v, Value::InstanceValue(i) if i.type_name() == "RegExp")),
        to_payload: Box::new(|v| {
            let r: RegExpValue = downcast(v).ok_or_else(|| {
                CodecError::TypeRegistry("value is not a RegExp instance".into())
            })?;
            Ok(Value::object(vec![
                ("pattern".into(), Value::String(r.pattern)),
                ("flags".into(), Value::String(r.flags)),
            ]))
        }),
        from_payload: Box::new(|payload| {
            let Value::Object(fields) = payload else {
                return Err(CodecError::InvalidRegExpPayload);
            };
            let fields = fields.borrow();
            let pattern = field_string(&fields, "pattern").ok_or(CodecError::InvalidRegExpPayload)?;
            let flags = field_string(&fields, "flags").ok_or(CodecError::InvalidRegExpPayload)?;
            Ok(Value::instance_value(RegExpValue { pattern, flags }))
        }),
        create: None,
        merge: None,
    }
}

fn validate_regexp_payload(payload: &Value, config: &Config) -> Result<(), CodecError> {
    let Value::Object(fields) = payload else {
        return Err(CodecError::InvalidRegExpPayload);
    };
    let fields = fields.borrow();
    let pattern = field_string(&fields, "pattern").ok_or(CodecError::InvalidRegExpPayload)?;
    let flags = field_string(&fields, "flags").ok_or(CodecError::InvalidRegExpPayload)?;
    regexp_validator::validate_for_deserialize(
        &pattern,
        &flags,
        &ValidateOptions {
            allow_unsafe: config.allow_unsafe_regexp,
            max_pattern_length: config.max_regexp_pattern_length,
        },
    )
}

fn field_string(fields: &[(String, Value)], key: &str) -> Option<String> {
    fields.iter().find(|(k, _)| k == key).and_then(|(_, v)| match v {
        Value::String(s) => Some(s.clone()),
        _ => None,
    })
}

fn map_def() -> TypeDefinition {
    TypeDefinition {
        id: "Map".into(),
        strategy: Strategy::Ref,
        is: Box::new(|v| matches!(v, Value::Instance(i) if i.borrow().type_name() == "Map")),
        to_payload: Box::new(|v| {
            let m: MapValue = downcast(v).ok_or_else(|| {
                CodecError::TypeRegistry("value is not a Map instance".into())
            })?;
            Ok(Value::array(
                m.0.into_iter().map(|(k, v)| Value::array(vec![k, v])).collect(),
            ))
        }),
        from_payload: Box::new(|payload| {
            let Value::Array(items) = payload else {
                return Err(CodecError::InvalidArrayNodePayload("Map".into()));
            };
            let mut pairs = Vec::new();
            for item in items.borrow().iter() {
                let Value::Array(pair) = item else {
                    return Err(CodecError::InvalidArrayNodePayload("Map".into()));
                };
                let pair = pair.borrow();
                if pair.len() != 2 {
                    return Err(CodecError::InvalidArrayNodePayload("Map".into()));
                }
                pairs.push((pair[0].clone(), pair[1].clone()));
            }
            Ok(Value::instance(MapValue(pairs)))
        }),
        create: Some(Box::new(|| Value::instance(MapValue(Vec::new())))),
        merge: Some(Box::new(|placeholder, result| {
            merge_ref_instance::<MapValue>(placeholder, result, |dst, src| dst.0 = src.0)
        })),
    }
}

fn set_def() -> TypeDefinition {
    TypeDefinition {
        id: "Set".into(),
        strategy: Strategy::Ref,
        is: Box::new(|v| matches!(v, Value::Instance(i) if i.borrow().type_name() == "Set")),
        to_payload: Box::new(|v| {
            let s: SetValue = downcast(v).ok_or_else(|| {
                CodecError::TypeRegistry("value is not a Set instance".into())
            })?;
            Ok(Value::array(s.0))
        }),
        from_payload: Box::new(|payload| {
            let Value::Array(items) = payload else {
                return Err(CodecError::InvalidArrayNodePayload("Set".into()));
            };
            let cloned = items.borrow().clone();
            Ok(Value::instance(SetValue(cloned)))
        }),
        create: Some(Box::new(|| Value::instance(SetValue(Vec::new())))),
        merge: Some(Box::new(|placeholder, result| {
            merge_ref_instance::<SetValue>(placeholder, result, |dst, src| dst.0 = src.0)
        })),
    }
}

/// Shared merge routine for ref-strategy built-ins: downcast both sides to
/// the concrete instance type and let `apply` copy the new state into the
/// placeholder in place, preserving the placeholder's `Rc` identity.
fn merge_ref_instance<T: Instance + Clone + 'static>(
    placeholder: &Value,
    result: Value,
    apply: impl FnOnce(&mut T, T),
) -> Result<Value, CodecError> {
    let Value::Instance(cell) = placeholder else {
        return Err(CodecError::CircularWithoutFactory);
    };
    let src: T = downcast(&result).ok_or(CodecError::CircularWithoutFactory)?;
    {
        let mut guard = cell.borrow_mut();
        let dst = guard
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or(CodecError::CircularWithoutFactory)?;
        apply(dst, src);
    }
    Ok(placeholder.clone())
}

fn undefined_def() -> TypeDefinition {
    TypeDefinition {
        id: "Undefined".into(),
        strategy: Strategy::Value,
        is: Box::new(|v| v.is_undefined()),
        to_payload: Box::new(|_| Ok(Value::Null)),
        from_payload: Box::new(|_| Ok(Value::Undefined)),
        create: None,
        merge: None,
    }
}

fn non_finite_def() -> TypeDefinition {
    TypeDefinition {
        id: "NonFiniteNumber".into(),
        strategy: Strategy::Value,
        is: Box::new(|v| matches!(v, Value::InstanceValue(i) if i.type_name() == "NonFiniteNumber")),
        to_payload: Box::new(|v| {
            let n: NonFiniteNumber = downcast(v).ok_or_else(|| {
                CodecError::TypeRegistry("value is not a NonFiniteNumber instance".into())
            })?;
            Ok(Value::String(n.0.as_str().to_string()))
        }),
        from_payload: Box::new(|payload| match payload {
            Value::String(s) => Ok(Value::instance_value(NonFiniteNumber(NonFiniteTag::from_str(&s)?))),
            _ => Err(CodecError::InvalidNonFiniteNumberPayload),
        }),
        create: None,
        merge: None,
    }
}

fn bigint_def() -> TypeDefinition {
    TypeDefinition {
        id: "BigInt".into(),
        strategy: Strategy::Value,
        is: Box::new(|v| matches!(v, Value::InstanceValue(i) if i.type_name() == "BigInt")),
        to_payload: Box::new(|v| {
            let b: BigIntValue = downcast(v).ok_or_else(|| {
                CodecError::TypeRegistry("value is not a BigInt instance".into())
            })?;
            Ok(Value::String(b.as_str().to_string()))
        }),
        from_payload: Box::new(|payload| match payload {
            Value::String(s) => Ok(Value::instance_value(BigIntValue::parse(&s)?)),
            _ => Err(CodecError::InvalidBigIntPayload("<non-string payload>".into())),
        }),
        create: None,
        merge: None,
    }
}

fn validate_symbol_payload(payload: &Value, policy: SymbolPolicy) -> Result<(), CodecError> {
    if policy == SymbolPolicy::Disabled {
        return Err(CodecError::SymbolsDisabled);
    }
    let Value::Object(fields) = payload else {
        return Err(CodecError::InvalidSymbolPayload);
    };
    let fields = fields.borrow();
    let kind = field_string(&fields, "kind").ok_or(CodecError::InvalidSymbolPayload)?;
    let key = field_string(&fields, "key").ok_or(CodecError::InvalidSymbolPayload)?;
    match kind.as_str() {
        "For" => {
            if policy == SymbolPolicy::WellKnownOnly {
                return Err(CodecError::GlobalSymbolsDisabled);
            }
            Ok(())
        }
        "WellKnown" => {
            if !WELL_KNOWN_SYMBOLS.contains(&key.as_str()) {
                return Err(CodecError::UnsupportedWellKnownSymbol(key));
            }
            Ok(())
        }
        _ => Err(CodecError::InvalidSymbolPayload),
    }
}

fn symbol_def() -> TypeDefinition {
    TypeDefinition {
        id: "Symbol".into(),
        strategy: Strategy::Value,
        is: Box::new(|v| matches!(v, Value::InstanceValue(i) if i.type_name() == "Symbol")),
        to_payload: Box::new(|v| {
            let s: SymbolValue = downcast(v).ok_or_else(|| {
                CodecError::TypeRegistry("value is not a Symbol instance".into())
            })?;
            match s.0 {
                SymbolKind::Unique(_) => Err(CodecError::UnsupportedUniqueSymbol),
                SymbolKind::For(key) => Ok(Value::object(vec![
                    ("kind".into(), Value::String("For".into())),
                    ("key".into(), Value::String(key)),
                ])),
                SymbolKind::WellKnown(key) => Ok(Value::object(vec![
                    ("kind".into(), Value::String("WellKnown".into())),
                    ("key".into(), Value::String(key)),
                ])),
            }
        }),
        from_payload: Box::new(|payload| {
            let Value::Object(fields) = &payload else {
                return Err(CodecError::InvalidSymbolPayload);
            };
            let fields_ref = fields.borrow();
            let kind = field_string(&fields_ref, "kind").ok_or(CodecError::InvalidSymbolPayload)?;
            let key = field_string(&fields_ref, "key").ok_or(CodecError::InvalidSymbolPayload)?;
            let kind = match kind.as_str() {
                "For" => SymbolKind::For(key),
                "WellKnown" => SymbolKind::WellKnown(key),
                _ => return Err(CodecError::InvalidSymbolPayload),
            };
            Ok(Value::instance_value(SymbolValue(kind)))
        }),
        create: None,
        merge: None,
    }
}

const ERROR_SHADOWING_KEYS: &[&str] = &["name", "message", "stack", "cause"];

fn error_def() -> TypeDefinition {
    TypeDefinition {
        id: "Error".into(),
        strategy: Strategy::Ref,
        is: Box::new(|v| matches!(v, Value::Instance(i) if i.borrow().type_name() == "Error")),
        to_payload: Box::new(|v| {
            let e: ErrorValue = downcast(v).ok_or_else(|| {
                CodecError::TypeRegistry("value is not an Error instance".into())
            })?;
            let mut fields = vec![
                ("name".into(), Value::String(e.name)),
                ("message".into(), Value::String(e.message)),
            ];
            if let Some(stack) = e.stack {
                fields.push(("stack".into(), Value::String(stack)));
            }
            if let Some(cause) = e.cause {
                fields.push(("cause".into(), *cause));
            }
            for (k, v) in e.custom_fields {
                if !ERROR_SHADOWING_KEYS.contains(&k.as_str()) {
                    fields.push((k, v));
                }
            }
            Ok(Value::object(fields))
        }),
        from_payload: Box::new(|payload| {
            let Value::Object(fields) = payload else {
                return Err(CodecError::InvalidObjectNodePayload("Error".into()));
            };
            let fields = fields.borrow().clone();
            let name = field_string(&fields, "name").unwrap_or_else(|| "Error".to_string());
            let message = field_string(&fields, "message").unwrap_or_default();
            let stack = field_string(&fields, "stack");
            let cause = fields
                .iter()
                .find(|(k, _)| k == "cause")
                .map(|(_, v)| Box::new(v.clone()));
            let custom_fields = fields
                .into_iter()
                .filter(|(k, _)| !ERROR_SHADOWING_KEYS.contains(&k.as_str()))
                .collect();
            Ok(Value::instance(ErrorValue {
                name,
                message,
                stack,
                cause,
                custom_fields,
            }))
        }),
        create: Some(Box::new(|| {
            Value::instance(ErrorValue {
                name: "Error".into(),
                message: String::new(),
                stack: None,
                cause: None,
                custom_fields: Vec::new(),
            })
        })),
        merge: Some(Box::new(|placeholder, result| {
            merge_ref_instance::<ErrorValue>(placeholder, result, |dst, src| *dst = src)
        })),
    }
}

fn url_def() -> TypeDefinition {
    TypeDefinition {
        id: "URL".into(),
        strategy: Strategy::Value,
        is: Box::new(|v| matches!(v, Value::InstanceValue(i) if i.type_name() == "URL")),
        to_payload: Box::new(|v| {
            let u: UrlValue = downcast(v).ok_or_else(|| {
                CodecError::TypeRegistry("value is not a URL instance".into())
            })?;
            Ok(Value::String(u.0))
        }),
        from_payload: Box::new(|payload| match payload {
            Value::String(s) => Ok(Value::instance_value(UrlValue(s))),
            _ => Err(CodecError::InvalidObjectNodePayload("URL".into())),
        }),
        create: None,
        merge: None,
    }
}

fn url_search_params_def() -> TypeDefinition {
    TypeDefinition {
        id: "URLSearchParams".into(),
        strategy: Strategy::Value,
        is: Box::new(|v| matches!(v, Value::InstanceValue(i) if i.type_name() == "URLSearchParams")),
        to_payload: Box::new(|v| {
            let u: UrlSearchParamsValue = downcast(v).ok_or_else(|| {
                CodecError::TypeRegistry("value is not a URLSearchParams instance".into())
            })?;
            Ok(Value::String(u.0))
        }),
        from_payload: Box::new(|payload| match payload {
            Value::String(s) => Ok(Value::instance_value(UrlSearchParamsValue(s))),
            _ => Err(CodecError::InvalidObjectNodePayload("URLSearchParams".into())),
        }),
        create: None,
        merge: None,
    }
}

fn byte_buffer_def(kind: ByteBufferKind) -> TypeDefinition {
    let id: &'static str = match kind {
        ByteBufferKind::ArrayBuffer => "ArrayBuffer",
        ByteBufferKind::DataView => "DataView",
        ByteBufferKind::Buffer => "Buffer",
    };
    TypeDefinition {
        id: id.into(),
        strategy: Strategy::Value,
        is: Box::new(move |v| matches!(v, Value::InstanceValue(i) if i.type_name() == id)),
        to_payload: Box::new(|v| {
            let b: ByteBufferValue = downcast(v).ok_or_else(|| {
                CodecError::TypeRegistry("value is not a byte buffer instance".into())
            })?;
            Ok(bytes_to_payload(&b.bytes))
        }),
        from_payload: Box::new(move |payload| {
            Ok(Value::instance_value(ByteBufferValue {
                kind: kind.clone(),
                bytes: payload_to_bytes(payload)?,
            }))
        }),
        create: None,
        merge: None,
    }
}

fn typed_array_def(kind: TypedArrayKind) -> TypeDefinition {
    let id = kind.id();
    TypeDefinition {
        id: id.into(),
        strategy: Strategy::Value,
        is: Box::new(move |v| matches!(v, Value::InstanceValue(i) if i.type_name() == id)),
        to_payload: Box::new(|v| {
            let t: TypedArrayValue = downcast(v).ok_or_else(|| {
                CodecError::TypeRegistry("value is not a typed array instance".into())
            })?;
            Ok(bytes_to_payload(&t.bytes))
        }),
        from_payload: Box::new(move |payload| {
            let bytes = payload_to_bytes(payload)?;
            if bytes.len() % kind.element_size() != 0 {
                return Err(CodecError::InvalidArrayNodePayload(id.to_string()));
            }
            Ok(Value::instance_value(TypedArrayValue { kind, bytes }))
        }),
        create: None,
        merge: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_seeded_and_cannot_be_replaced() {
        let mut reg = TypeRegistry::new();
        assert!(reg.is_builtin("Date"));
        assert!(reg.is_builtin("Map"));

        let dup = TypeDefinition {
            id: "Date".into(),
            strategy: Strategy::Value,
            is: Box::new(|_| false),
            to_payload: Box::new(|_| Ok(Value::Null)),
            from_payload: Box::new(|_| Ok(Value::Null)),
            create: None,
            merge: None,
        };
        assert!(reg.add(dup).is_err());
    }

    #[test]
    fn get_by_id_enforces_allowlist_before_registration() {
        let reg = TypeRegistry::new();
        let mut allowed = HashSet::new();
        allowed.insert("Date".to_string());
        assert!(reg.get_by_id("Date", Some(&allowed)).is_ok());
        assert!(matches!(
            reg.get_by_id("Map", Some(&allowed)),
            Err(CodecError::TypeNotAllowed(_))
        ));
        assert!(matches!(
            reg.get_by_id("NoSuchType", None),
            Err(CodecError::UnknownType(_))
        ));
    }

    #[test]
    fn map_round_trips_through_payload() {
        let reg = TypeRegistry::new();
        let def = reg.get_by_id("Map", None).unwrap();
        let m = Value::instance(MapValue(vec![(Value::String("a".into()), Value::Number(1.0))]));
        let payload = (def.to_payload)(&m).unwrap();
        let config = Config::default();
        let back = reg.deserialize_type(def, payload, &config).unwrap();
        let back: MapValue = downcast(&back).unwrap();
        assert_eq!(back.get(&Value::String("a".into())), Some(&Value::Number(1.0)));
    }
}
