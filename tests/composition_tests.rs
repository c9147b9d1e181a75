// Copyright 2025 Cowboy AI, LLC.

//! Integration tests for composing mixin chains

use std::thread;

use cim_mixin::{
    compose, BehaviorUnit, ComposerConfig, CopyPolicy, MixinBuilder, MixinError, StaticMember,
    Unit, UnitKind, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

fn walker() -> Unit {
    Unit::builder("Walker")
        .method("walk", |_, _| Ok(json!("walking")))
        .build()
}

fn swimmer() -> Unit {
    Unit::builder("Swimmer")
        .method("swim", |_, _| Ok(json!("swimming")))
        .build()
}

fn counter(name: &str, start: i64) -> Unit {
    Unit::builder(name)
        .field("count", json!(start))
        .method("increment", |this, _| {
            let next = this.field("count").and_then(Value::as_i64).unwrap_or(0) + 1;
            this.set_field("count", json!(next));
            Ok(json!(next))
        })
        .build()
}

#[test]
fn walker_and_swimmer_compose() {
    let duck = compose(None, [walker(), swimmer()]).unwrap();
    let mut instance = duck.instantiate(&[]).unwrap();

    assert_eq!(instance.call("walk", &[]).unwrap(), json!("walking"));
    assert_eq!(instance.call("swim", &[]).unwrap(), json!("swimming"));
}

#[test]
fn counter_composed_twice_takes_later_initial_value() {
    let unit = compose(None, [counter("CounterA", 0), counter("CounterB", 5)]).unwrap();
    let instance = unit.instantiate(&[]).unwrap();
    assert_eq!(instance.field("count"), Some(&json!(5)));
}

#[test]
fn chain_exposes_union_with_later_precedence() {
    let a = Unit::builder("A")
        .field("a", json!("from a"))
        .field("shared", json!("a"))
        .build();
    let b = Unit::builder("B").field("b", json!("from b")).build();
    let c = Unit::builder("C")
        .field("c", json!("from c"))
        .field("shared", json!("c"))
        .build();

    let unit = compose(None, [a, b, c]).unwrap();
    let instance = unit.instantiate(&[]).unwrap();

    assert_eq!(
        instance.to_json(),
        json!({"a": "from a", "shared": "c", "b": "from b", "c": "from c"})
    );
}

#[test]
fn later_method_wins_on_collision() {
    let loud = Unit::builder("Loud")
        .method("speak", |_, _| Ok(json!("HELLO")))
        .build();
    let quiet = Unit::builder("Quiet")
        .method("speak", |_, _| Ok(json!("hello")))
        .build();

    let mut instance = compose(None, [loud.clone(), quiet.clone()])
        .unwrap()
        .instantiate(&[])
        .unwrap();
    assert_eq!(instance.call("speak", &[]).unwrap(), json!("hello"));

    let mut instance = compose(None, [quiet, loud]).unwrap().instantiate(&[]).unwrap();
    assert_eq!(instance.call("speak", &[]).unwrap(), json!("HELLO"));
}

#[test]
fn empty_chain_instantiates_bare_base() {
    let unit = MixinBuilder::new().with(Vec::<Unit>::new()).unwrap();
    assert_eq!(unit.kind(), UnitKind::Plain);
    assert!(unit.parent().is_none());

    let instance = unit.instantiate(&[]).unwrap();
    assert_eq!(instance.to_json(), json!({}));
}

#[test]
fn empty_chain_returns_initial_unit() {
    let base = walker();
    let unit = compose(Some(base.clone()), Vec::<Unit>::new()).unwrap();
    assert!(unit.ptr_eq(&base));
}

#[test]
fn inputs_are_not_mutated() {
    let a = counter("CounterA", 1);
    let _ = compose(None, [&a, &walker()]).unwrap();

    assert!(a.parent().is_none());
    assert!(a.own_statics().is_empty());
    assert_eq!(a.prototype().keys().collect::<Vec<_>>(), vec!["increment"]);
}

#[test]
fn statics_merge_with_later_precedence() {
    let v1 = Unit::builder("V1")
        .static_value("version", json!(1))
        .static_value("origin", json!("v1"))
        .build();
    let v2 = Unit::builder("V2")
        .static_value("version", json!(2))
        .static_fn("describe", |unit, _| Ok(json!(unit.name())))
        .build();

    let unit = compose(None, [v1, v2]).unwrap();

    let value = |name: &str| unit.static_member(name).and_then(StaticMember::as_value).cloned();
    assert_eq!(value("version"), Some(json!(2)));
    assert_eq!(value("origin"), Some(json!("v1")));
    assert_eq!(unit.call_static("describe", &[]).unwrap(), json!("Base+V1+V2"));
}

#[test_case("prototype" ; "prototype slot")]
#[test_case("length" ; "constructor arity slot")]
#[test_case("name" ; "unit name slot")]
fn reserved_statics_are_never_copied(reserved: &str) {
    let mixin = Unit::builder("Identity")
        .static_value(reserved, json!("overridden"))
        .static_value("kept", json!(true))
        .build();

    let unit = compose(None, [mixin]).unwrap();

    assert!(unit.static_member(reserved).is_none());
    assert!(unit.static_member("kept").is_some());
    assert_eq!(unit.name(), "Base+Identity");
}

#[test]
fn transformer_replaces_accumulator() {
    let discarded = Unit::builder("Discarded")
        .field("discarded", json!(true))
        .build();
    let replacement = Unit::builder("Replacement")
        .method("replaced", |_, _| Ok(json!(true)))
        .build();
    let swap = {
        let replacement = replacement.clone();
        BehaviorUnit::transformer("Swap", move |_| Ok(replacement.clone()))
    };

    let unit = compose(
        None,
        [BehaviorUnit::from(discarded), swap, BehaviorUnit::from(swimmer())],
    )
    .unwrap();

    assert!(unit.parent().unwrap().ptr_eq(&replacement));

    let mut instance = unit.instantiate(&[]).unwrap();
    assert!(!instance.has_own("discarded"));
    assert_eq!(instance.call("replaced", &[]).unwrap(), json!(true));
    assert_eq!(instance.call("swim", &[]).unwrap(), json!("swimming"));
}

#[test]
fn transformer_receives_current_accumulator() {
    let wrap = BehaviorUnit::transformer("Tagged", |base| {
        Ok(Unit::builder(format!("Tagged({})", base.name()))
            .extends(&base)
            .field("tagged", json!(true))
            .build())
    });

    let unit = compose(None, [BehaviorUnit::from(walker()), wrap]).unwrap();
    assert_eq!(unit.name(), "Tagged(Base+Walker)");

    let mut instance = unit.instantiate(&[]).unwrap();
    assert_eq!(instance.field("tagged"), Some(&json!(true)));
    assert_eq!(instance.call("walk", &[]).unwrap(), json!("walking"));
}

#[test]
fn transformer_errors_propagate() {
    let failing = BehaviorUnit::transformer("Failing", |_| {
        Err(MixinError::InvalidArgument("no base accepted".to_string()))
    });
    assert_eq!(
        compose(None, [failing]).unwrap_err(),
        MixinError::InvalidArgument("no base accepted".to_string())
    );
}

#[test]
fn malformed_class_unit_fails_at_composition_time() {
    let bad = Unit::builder("Bad")
        .method("constructor", |_, _| Ok(Value::Null))
        .build();
    let err = compose(None, [walker(), bad]).unwrap_err();
    assert!(err.is_shape_error());
    assert!(err.to_string().contains("Bad"));
}

#[test]
fn mixin_method_reaches_sibling_through_composed_instance() {
    // A method declared on a unit derived from the composition runs against
    // the composed instance, so it reaches every mixin layer by name.
    let unit = compose(Some(walker()), [swimmer()]).unwrap();
    let triathlete = Unit::builder("Triathlete")
        .extends(&unit)
        .method("race", |this, _| {
            let walk = this.call("walk", &[])?;
            let swim = this.call("swim", &[])?;
            Ok(json!([walk, swim]))
        })
        .build();

    let mut instance = triathlete.instantiate(&[]).unwrap();
    assert_eq!(
        instance.call("race", &[]).unwrap(),
        json!(["walking", "swimming"])
    );
}

#[test]
fn derived_unit_overrides_mixin_method() {
    let base = compose(None, [walker()]).unwrap();
    let duck = Unit::builder("Duck")
        .extends(&base)
        .method("walk", |_, _| Ok(json!("waddling")))
        .build();

    let mut instance = duck.instantiate(&[]).unwrap();
    assert_eq!(instance.call("walk", &[]).unwrap(), json!("waddling"));

    let mut plain = base.instantiate(&[]).unwrap();
    assert_eq!(plain.call("walk", &[]).unwrap(), json!("walking"));
}

#[test]
fn derived_unit_overrides_mixin_field_and_method() {
    let paced = Unit::builder("Paced")
        .field("speed", json!(1))
        .method("walk", |this, _| {
            let speed = this.field("speed").cloned().unwrap_or(Value::Null);
            Ok(json!(format!("walking at {speed}")))
        })
        .method("rest", |_, _| Ok(json!("resting")))
        .build();
    let base = compose(None, [paced]).unwrap();
    let duck = Unit::builder("Duck")
        .extends(&base)
        .field("speed", json!(2))
        .method("walk", |this, _| {
            let speed = this.field("speed").cloned().unwrap_or(Value::Null);
            Ok(json!(format!("waddling at {speed}")))
        })
        .build();

    let mut instance = duck.instantiate(&[]).unwrap();
    assert_eq!(instance.field("speed"), Some(&json!(2)));
    assert_eq!(instance.call("walk", &[]).unwrap(), json!("waddling at 2"));
    // Methods the subclass leaves alone still run against the mixin instance.
    assert_eq!(instance.call("rest", &[]).unwrap(), json!("resting"));
}

#[test]
fn disabling_fallback_lookup_hides_mixin_methods() {
    let builder = MixinBuilder::with_config(ComposerConfig {
        fallback_lookup: false,
        ..ComposerConfig::default()
    });
    let unit = builder.with([counter("Counter", 4), walker()]).unwrap();
    let mut instance = unit.instantiate(&[]).unwrap();

    assert_eq!(instance.field("count"), Some(&json!(4)));
    assert!(!instance.responds_to("walk"));
    assert!(!instance.responds_to("increment"));
    assert!(matches!(
        instance.call("walk", &[]),
        Err(MixinError::MemberNotFound { .. })
    ));
}

#[test]
fn mixin_method_calls_sibling_mixin_by_name() {
    let namer = Unit::builder("Namer")
        .field("name", json!("Ada"))
        .method("name_of", |this, _| {
            Ok(this.field("name").cloned().unwrap_or(Value::Null))
        })
        .build();
    let greeter = Unit::builder("Greeter")
        .method("greet", |this, _| {
            let name = this.call("name_of", &[])?;
            Ok(json!(format!("hello {}", name.as_str().unwrap_or("?"))))
        })
        .build();

    let unit = compose(None, [namer, greeter]).unwrap();
    let mut instance = unit.instantiate(&[]).unwrap();
    assert_eq!(instance.call("greet", &[]).unwrap(), json!("hello Ada"));

    // Without a sibling providing it the name stays unresolved.
    let standalone = Unit::builder("Greeter")
        .method("greet", |this, _| this.call("name_of", &[]))
        .build();
    let mut alone = compose(None, [standalone]).unwrap().instantiate(&[]).unwrap();
    assert!(matches!(
        alone.call("greet", &[]),
        Err(MixinError::MemberNotFound { .. })
    ));
}

#[test]
fn nested_composition_keeps_bound_receivers() {
    let inner = compose(None, [counter("Counter", 0)]).unwrap();
    let outer = compose(None, [inner, walker()]).unwrap();

    let mut instance = outer.instantiate(&[]).unwrap();
    assert_eq!(instance.call("increment", &[]).unwrap(), json!(1));
    assert_eq!(instance.call("increment", &[]).unwrap(), json!(2));
    assert_eq!(instance.call("walk", &[]).unwrap(), json!("walking"));
}

#[test]
fn non_destructive_policy_keeps_first_writer() {
    let builder = MixinBuilder::with_config(ComposerConfig {
        copy_policy: CopyPolicy::NonDestructive,
        ..ComposerConfig::default()
    });
    let unit = builder
        .with([counter("CounterA", 0), counter("CounterB", 5)])
        .unwrap();
    assert_eq!(
        unit.instantiate(&[]).unwrap().field("count"),
        Some(&json!(0))
    );
}

#[test]
fn custom_base_name_from_config() {
    let config = ComposerConfig::from_json(r#"{"base_name": "Root"}"#).unwrap();
    let unit = MixinBuilder::with_config(config).with([walker()]).unwrap();
    assert_eq!(unit.name(), "Root+Walker");
}

#[test]
fn concurrent_compositions_are_independent() {
    let shared = counter("Counter", 0);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let shared = shared.clone();
            thread::spawn(move || {
                let extra = Unit::builder(format!("Extra{i}"))
                    .field("id", json!(i))
                    .build();
                let unit = compose(None, [shared, extra]).unwrap();
                let mut instance = unit.instantiate(&[]).unwrap();
                instance.call("increment", &[]).unwrap();
                (unit.name().to_string(), instance.field("id").cloned())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let (name, id) = handle.join().unwrap();
        assert_eq!(name, format!("Base+Counter+Extra{i}"));
        assert_eq!(id, Some(json!(i)));
    }
}
