//! End-to-end round-trip tests across the full registered type corpus.

use valuegraph::{
    BigIntValue, ByteBufferKind, ByteBufferValue, Codec, Config, DateValue, ErrorValue, MapValue,
    NonFiniteNumber, NonFiniteTag, RegExpValue, SetValue, SymbolKind, SymbolPolicy, SymbolValue,
    TypedArrayKind, TypedArrayValue, UrlSearchParamsValue, UrlValue, Value,
};

fn round_trip_tree(value: &Value) -> Value {
    let codec = Codec::new();
    let text = codec.stringify(value).expect("stringify");
    codec.parse(&text).expect("parse")
}

fn round_trip_graph(value: &Value) -> Value {
    let codec = Codec::new();
    let text = codec.serialize(value).expect("serialize");
    codec.deserialize(&text).expect("deserialize")
}

#[test]
fn primitives_round_trip_in_both_modes() {
    for value in [
        Value::Null,
        Value::Bool(true),
        Value::Number(42.5),
        Value::String("hello".into()),
    ] {
        assert!(round_trip_tree(&value).structurally_eq(&value));
        assert!(round_trip_graph(&value).structurally_eq(&value));
    }
}

#[test]
fn non_finite_numbers_round_trip() {
    for tag in [NonFiniteTag::NaN, NonFiniteTag::Infinity, NonFiniteTag::NegInfinity] {
        let value = Value::instance_value(NonFiniteNumber(tag));
        assert!(round_trip_tree(&value).structurally_eq(&value));
    }
}

#[test]
fn big_integers_round_trip() {
    let value = Value::instance_value(BigIntValue::from_i128(170_141_183_460_469_231_731_687i128));
    assert!(round_trip_graph(&value).structurally_eq(&value));
}

#[test]
fn dates_round_trip() {
    let value = Value::instance_value(DateValue("2024-01-01T00:00:00.000Z".into()));
    assert!(round_trip_tree(&value).structurally_eq(&value));
}

#[test]
fn safe_regexes_round_trip() {
    let value = Value::instance_value(RegExpValue { pattern: "(ab|cd)+".into(), flags: "gi".into() });
    assert!(round_trip_tree(&value).structurally_eq(&value));
}

#[test]
fn maps_round_trip_with_shared_identity_only_in_graph_form() {
    let codec = Codec::new();
    let shared = Value::instance(MapValue(vec![(Value::String("k".into()), Value::Number(1.0))]));
    let root = Value::object(vec![("a".into(), shared.clone()), ("b".into(), shared)]);

    let text = codec.serialize(&root).expect("serialize");
    let back = codec.deserialize(&text).expect("deserialize");
    let Value::Object(fields) = &back else { panic!("expected object") };
    let fields = fields.borrow();
    let (Value::Instance(a), Value::Instance(b)) = (&fields[0].1, &fields[1].1) else {
        panic!("expected Map instances")
    };
    assert!(std::rc::Rc::ptr_eq(a, b));
}

#[test]
fn sets_round_trip() {
    let value = Value::instance(SetValue(vec![Value::Number(1.0), Value::Number(2.0)]));
    assert!(round_trip_graph(&value).structurally_eq(&value));
}

#[test]
fn errors_round_trip_with_custom_fields_and_cause() {
    let cause = Value::instance(ErrorValue {
        name: "TypeError".into(),
        message: "bad type".into(),
        stack: None,
        cause: None,
        custom_fields: Vec::new(),
    });
    let value = Value::instance(ErrorValue {
        name: "Error".into(),
        message: "outer".into(),
        stack: Some("at x.rs:1".into()),
        cause: Some(Box::new(cause)),
        custom_fields: vec![("code".into(), Value::Number(7.0))],
    });
    assert!(round_trip_graph(&value).structurally_eq(&value));
}

#[test]
fn urls_and_search_params_round_trip() {
    let url = Value::instance_value(UrlValue("https://example.com/path".into()));
    let params = Value::instance_value(UrlSearchParamsValue("a=1&b=2".into()));
    assert!(round_trip_tree(&url).structurally_eq(&url));
    assert!(round_trip_tree(&params).structurally_eq(&params));
}

#[test]
fn byte_buffers_and_typed_arrays_round_trip() {
    let buf = Value::instance_value(ByteBufferValue { kind: ByteBufferKind::ArrayBuffer, bytes: vec![1, 2, 3, 4] });
    assert!(round_trip_tree(&buf).structurally_eq(&buf));

    let arr = Value::instance_value(TypedArrayValue { kind: TypedArrayKind::Int32, bytes: vec![0, 0, 0, 0, 1, 0, 0, 0] });
    assert!(round_trip_tree(&arr).structurally_eq(&arr));
}

#[test]
fn typed_array_rejects_misaligned_byte_length() {
    let codec = Codec::new();
    let text = r#"{"__type":"Int32Array","value":[1,2,3]}"#;
    assert!(codec.deserialize(text).is_err());
}

#[test]
fn well_known_symbols_round_trip_by_default_policy() {
    let value = Value::instance_value(SymbolValue(SymbolKind::WellKnown("iterator".into())));
    assert!(round_trip_tree(&value).structurally_eq(&value));
}

#[test]
fn unique_symbols_fail_to_serialize() {
    let codec = Codec::new();
    let value = Value::instance_value(SymbolValue(SymbolKind::Unique("local".into())));
    assert!(codec.stringify(&value).is_err());
}

#[test]
fn symbol_policy_well_known_only_rejects_global_symbols_on_decode() {
    let mut config = Config::default();
    config.symbol_policy = SymbolPolicy::WellKnownOnly;
    let codec = Codec::with_config(config);
    let text = r#"{"__type":"Symbol","value":{"kind":"For","key":"shared"}}"#;
    assert!(codec.deserialize(text).is_err());
}

#[test]
fn custom_registered_type_round_trips() {
    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        x: f64,
        y: f64,
    }
    impl valuegraph::Instance for Point {
        fn type_name(&self) -> &'static str {
            "Point"
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
        fn clone_boxed(&self) -> Box<dyn valuegraph::Instance> {
            Box::new(self.clone())
        }
    }

    let mut codec = Codec::new();
    codec
        .add_type_simple::<Point, _, _>(
            "Point",
            |p: &Point| Value::object(vec![("x".into(), Value::Number(p.x)), ("y".into(), Value::Number(p.y))]),
            |payload| {
                let Value::Object(fields) = payload else {
                    return Err(valuegraph::CodecError::TypeRegistry("bad Point payload".into()));
                };
                let fields = fields.borrow();
                let get = |k: &str| fields.iter().find(|(key, _)| key == k).and_then(|(_, v)| match v {
                    Value::Number(n) => Some(*n),
                    _ => None,
                });
                Ok(Point { x: get("x").unwrap_or(0.0), y: get("y").unwrap_or(0.0) })
            },
        )
        .unwrap();

    let value = Value::instance_value(Point { x: 1.5, y: -2.5 });
    let text = codec.stringify(&value).unwrap();
    let back = codec.parse(&text).unwrap();
    assert!(back.structurally_eq(&value));
}

#[test]
fn cycle_through_plain_objects_round_trips_in_graph_form_but_fails_in_tree_form() {
    let obj = Value::object(vec![]);
    if let Value::Object(cell) = &obj {
        cell.borrow_mut().push(("self".to_string(), obj.clone()));
    }
    let codec = Codec::new();
    assert!(codec.stringify(&obj).is_err());

    let text = codec.serialize(&obj).unwrap();
    let back = codec.deserialize(&text).unwrap();
    let Value::Object(fields) = &back else { panic!("expected object") };
    let (_, self_ref) = &fields.borrow()[0];
    let Value::Object(inner) = self_ref else { panic!("expected object") };
    assert!(std::rc::Rc::ptr_eq(fields, inner));
}

#[test]
fn depth_bound_rejects_beyond_the_configured_limit() {
    let mut config = Config::default();
    config.max_depth = Some(2);
    let codec = Codec::with_config(config);

    let shallow = Value::array(vec![Value::array(vec![Value::Number(1.0)])]);
    assert!(codec.stringify(&shallow).is_ok());

    let deep = Value::array(vec![Value::array(vec![Value::array(vec![Value::Number(1.0)])])]);
    assert!(codec.stringify(&deep).is_err());
}

#[test]
fn unbounded_depth_accepts_structures_a_finite_cap_would_reject() {
    let mut value = Value::Number(0.0);
    for _ in 0..80 {
        value = Value::array(vec![value]);
    }

    let mut capped = Config::default();
    capped.max_depth = Some(50);
    assert!(Codec::with_config(capped).stringify(&value).is_err());

    let mut uncapped = Config::default();
    uncapped.max_depth = None;
    assert!(Codec::with_config(uncapped).stringify(&value).is_ok());
}

#[test]
fn proto_pollution_keys_are_dropped_on_both_sides() {
    let codec = Codec::new();
    let value = Value::object(vec![
        ("__proto__".to_string(), Value::Bool(true)),
        ("constructor".to_string(), Value::Bool(true)),
        ("safe".to_string(), Value::Number(1.0)),
    ]);
    let text = codec.stringify(&value).unwrap();
    assert!(!text.contains("__proto__"));
    assert!(!text.contains("constructor"));
    let back = codec.parse(&text).unwrap();
    let Value::Object(fields) = &back else { panic!("expected object") };
    assert_eq!(fields.borrow().len(), 1);
}

#[test]
fn unsafe_regexp_is_rejected_on_decode_unless_explicitly_allowed() {
    let codec = Codec::new();
    let text = r#"{"__type":"RegExp","value":{"pattern":"(a+)+","flags":""}}"#;
    assert!(codec.deserialize(text).is_err());

    let mut config = Config::default();
    config.allow_unsafe_regexp = true;
    let permissive = Codec::with_config(config);
    assert!(permissive.deserialize(text).is_ok());
}

#[test]
fn allowlist_rejects_disallowed_types_on_decode() {
    let mut config = Config::default();
    config.allowed_types = Some(["Date".to_string()].into_iter().collect());
    let codec = Codec::with_config(config);

    let text = r#"{"__type":"Map","value":[]}"#;
    assert!(codec.deserialize(text).is_err());

    let date_text = r#"{"__type":"Date","value":"2024-01-01T00:00:00.000Z"}"#;
    assert!(codec.deserialize(date_text).is_ok());
}

#[test]
fn two_independent_map_instances_stay_distinct_while_a_shared_one_stays_one() {
    let codec = Codec::new();
    let a = Value::instance(MapValue(vec![(Value::String("k".into()), Value::Number(1.0))]));
    let b = Value::instance(MapValue(vec![(Value::String("k".into()), Value::Number(1.0))]));
    let shared = Value::instance_value(DateValue("2024-06-01T00:00:00.000Z".into()));
    let root = Value::object(vec![
        ("a".into(), a),
        ("b".into(), b),
        ("d1".into(), shared.clone()),
        ("d2".into(), shared),
    ]);

    let text = codec.serialize(&root).unwrap();
    let back = codec.deserialize(&text).unwrap();
    let Value::Object(fields) = &back else { panic!("expected object") };
    let fields = fields.borrow();
    let (Value::Instance(a), Value::Instance(b)) = (&fields[0].1, &fields[1].1) else {
        panic!("expected Map instances")
    };
    assert!(!std::rc::Rc::ptr_eq(a, b));
}
