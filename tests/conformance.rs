//! The six concrete end-to-end scenarios and the two enumerated corpora
//! named in the codec's testable-properties list: the RegExp safety
//! heuristic and the Symbol policy matrix.

use valuegraph::{Codec, Config, DateValue, MapValue, SymbolKind, SymbolPolicy, SymbolValue, Value};

#[test]
fn scenario_shared_map_preserves_identity_and_contents() {
    let codec = Codec::new();
    let m = Value::instance(MapValue(vec![(Value::String("count".into()), Value::Number(1.0))]));
    let root = Value::object(vec![("a".into(), m.clone()), ("b".into(), m)]);

    let text = codec.serialize(&root).unwrap();
    let back = codec.deserialize(&text).unwrap();
    let Value::Object(fields) = &back else { panic!("expected object") };
    let fields = fields.borrow();
    let (Value::Instance(a), Value::Instance(b)) = (&fields[0].1, &fields[1].1) else {
        panic!("expected Map instances")
    };
    assert!(std::rc::Rc::ptr_eq(a, b));
    let map: std::cell::Ref<'_, dyn valuegraph::Instance> = a.borrow();
    let map = map.as_any().downcast_ref::<MapValue>().unwrap();
    assert_eq!(map.get(&Value::String("count".into())), Some(&Value::Number(1.0)));
}

#[test]
fn scenario_self_referencing_object_via_raw_envelope() {
    let codec = Codec::new();
    let text = r#"{"__graph":true,"version":1,"root":{"__ref":"obj_1"},"nodes":{"obj_1":{"kind":"object","value":{"self":{"__ref":"obj_1"}}}}}"#;
    let value = codec.deserialize(text).unwrap();
    let Value::Object(fields) = &value else { panic!("expected object") };
    let (_, self_ref) = &fields.borrow()[0];
    let Value::Object(inner) = self_ref else { panic!("expected object") };
    assert!(std::rc::Rc::ptr_eq(fields, inner));
}

#[test]
fn scenario_proto_pollution_payload_is_sanitized() {
    let codec = Codec::new();
    let text = r#"{"__proto__":{"polluted":true},"safe":1}"#;
    let value = codec.deserialize(text).unwrap();
    let Value::Object(fields) = &value else { panic!("expected object") };
    let fields = fields.borrow();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].0, "safe");
    assert!(fields.iter().all(|(k, _)| k != "polluted"));
}

#[test]
fn scenario_date_literal_type_marker_survives_a_tree_round_trip() {
    let codec = Codec::new();
    let date = Value::instance_value(DateValue("not-a-real-date".into()));
    let root = Value::object(vec![("literal".into(), date)]);

    let text = codec.stringify(&root).unwrap();
    assert!(!text.contains("\"__type\":\"__type\""));
    let back = codec.parse(&text).unwrap();
    assert!(back.structurally_eq(&root));
}

#[test]
fn scenario_unsafe_regexp_payload_fails_with_the_named_error() {
    let codec = Codec::new();
    let text = r#"{"__type":"RegExp","value":{"pattern":"(a+)+","flags":""}}"#;
    let err = codec.deserialize(text).unwrap_err();
    assert!(matches!(err, valuegraph::CodecError::UnsafeRegExpPattern(_)));
}

#[test]
fn scenario_date_and_map_identity_matrix() {
    let codec = Codec::new();
    let date = Value::instance_value(DateValue("2024-03-01T00:00:00.000Z".into()));
    let shared_map = Value::instance(MapValue(vec![(Value::String("k".into()), Value::Number(1.0))]));
    let independent_map = Value::instance(MapValue(vec![(Value::String("k".into()), Value::Number(1.0))]));

    let root = Value::object(vec![
        ("date".into(), date.clone()),
        ("shared1".into(), shared_map.clone()),
        ("shared2".into(), shared_map),
        ("other".into(), independent_map),
    ]);

    let text = codec.serialize(&root).unwrap();
    let back = codec.deserialize(&text).unwrap();
    let Value::Object(fields) = &back else { panic!("expected object") };
    let fields = fields.borrow();

    assert!(fields[0].1.structurally_eq(&date));

    let (Value::Instance(shared1), Value::Instance(shared2), Value::Instance(other)) =
        (&fields[1].1, &fields[2].1, &fields[3].1)
    else {
        panic!("expected Map instances")
    };
    assert!(std::rc::Rc::ptr_eq(shared1, shared2));
    assert!(!std::rc::Rc::ptr_eq(shared1, other));
}

#[test]
fn regexp_heuristic_corpus_matches_the_spec_table() {
    let safe = ["test", "(ab|cd)+", "((?:\\w+))[a-z]", "(a\\|b|aa)+", "(?<name>a|b)+"];
    let unsafe_patterns = ["(a+)+", "^(a|aa)+$", "(a|)+", "(?:a|aa)+", "(?=a|aa)+", "(?<=a|aa)+"];

    let codec = Codec::new();
    for pattern in safe {
        let text = format!(r#"{{"__type":"RegExp","value":{{"pattern":{:?},"flags":""}}}}"#, pattern);
        assert!(codec.deserialize(&text).is_ok(), "expected safe: {pattern}");
    }
    for pattern in unsafe_patterns {
        let text = format!(r#"{{"__type":"RegExp","value":{{"pattern":{:?},"flags":""}}}}"#, pattern);
        let err = codec.deserialize(&text).unwrap_err();
        assert!(matches!(err, valuegraph::CodecError::UnsafeRegExpPattern(_)), "expected unsafe: {pattern}");
    }
}

#[test]
fn regexp_pattern_length_cap_is_enforced_on_decode() {
    let mut config = Config::default();
    config.max_regexp_pattern_length = Some(8);
    let codec = Codec::with_config(config);
    let text = r#"{"__type":"RegExp","value":{"pattern":"aaaaaaaaaaaaaaaa","flags":""}}"#;
    let err = codec.deserialize(text).unwrap_err();
    assert!(matches!(err, valuegraph::CodecError::RegExpPatternTooLong { .. }));
}

#[test]
fn symbol_policy_matrix() {
    let well_known = r#"{"__type":"Symbol","value":{"kind":"WellKnown","key":"iterator"}}"#;
    let global = r#"{"__type":"Symbol","value":{"kind":"For","key":"x"}}"#;

    let mut well_known_only = Config::default();
    well_known_only.symbol_policy = SymbolPolicy::WellKnownOnly;
    let codec = Codec::with_config(well_known_only);
    assert!(codec.deserialize(well_known).is_ok());
    assert!(codec.deserialize(global).is_err());

    let mut disabled = Config::default();
    disabled.symbol_policy = SymbolPolicy::Disabled;
    let codec = Codec::with_config(disabled);
    assert!(codec.deserialize(well_known).is_err());
    assert!(codec.deserialize(global).is_err());

    let mut allow_all = Config::default();
    allow_all.symbol_policy = SymbolPolicy::AllowAll;
    let codec = Codec::with_config(allow_all);
    assert!(codec.deserialize(well_known).is_ok());
    assert!(codec.deserialize(global).is_ok());

    let unique = Value::instance_value(SymbolValue(SymbolKind::Unique("local".into())));
    assert!(Codec::new().stringify(&unique).is_err());
}

#[test]
fn reference_integrity_matrix() {
    let codec = Codec::new();

    let missing_ref = r#"{"__graph":true,"version":1,"root":{"__ref":"obj_404"},"nodes":{}}"#;
    assert!(matches!(
        codec.deserialize(missing_ref).unwrap_err(),
        valuegraph::CodecError::UnresolvedReference(_)
    ));

    // Map provides `create`, so a cycle through it resolves rather than failing.
    let cyclic_map = r#"{"__graph":true,"version":1,"root":{"__ref":"obj_1"},"nodes":{"obj_1":{"kind":"type","type":"Map","value":{"__ref":"obj_2"}},"obj_2":{"kind":"array","value":[{"__ref":"obj_3"}]},"obj_3":{"kind":"array","value":["self",{"__ref":"obj_1"}]}}}"#;
    assert!(codec.deserialize(cyclic_map).is_ok());
}

#[test]
fn circular_ref_type_without_factory_fails_with_the_named_error() {
    #[derive(Debug, Clone)]
    struct BoxValue(Value);
    impl valuegraph::Instance for BoxValue {
        fn type_name(&self) -> &'static str {
            "Box"
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
        .add_type(valuegraph::TypeDefinition {
            id: "Box".into(),
            strategy: valuegraph::Strategy::Ref,
            is: Box::new(|v| matches!(v, Value::Instance(i) if i.borrow().type_name() == "Box")),
            to_payload: Box::new(|v| {
                let Value::Instance(inst) = v else {
                    return Err(valuegraph::CodecError::TypeRegistry("not a Box".into()));
                };
                let guard = inst.borrow();
                let b = guard.as_any().downcast_ref::<BoxValue>().unwrap();
                Ok(b.0.clone())
            }),
            from_payload: Box::new(|payload| Ok(Value::instance(BoxValue(payload)))),
            // No `create` factory: a cycle through this node cannot adopt a
            // placeholder in place, so it must fail rather than silently
            // produce two distinct instances sharing no identity.
            create: None,
            merge: None,
        })
        .unwrap();

    let text = r#"{"__graph":true,"version":1,"root":{"__ref":"obj_1"},"nodes":{"obj_1":{"kind":"type","type":"Box","value":{"__ref":"obj_1"}}}}"#;
    let err = codec.deserialize(text).unwrap_err();
    assert!(matches!(err, valuegraph::CodecError::CircularWithoutFactory));
}
