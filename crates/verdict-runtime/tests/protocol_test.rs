//! End-to-end checks of the two-phase protocol through the driver.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use verdict_core::{keys, CallError, Callable, Class, Kind, Object, Value};
use verdict_runtime::combinators::{
    determine, equal, if_exists, if_exists_not_match, if_not_match, instance_of, validate,
};
use verdict_runtime::{
    lambda, primitives, Context, Driver, DriverConfig, Rule, RuleLike, Schema, Shape,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn payment_schema() -> Schema {
    Schema::named("Payment")
        .field("method", validate(Kind::String, "method must be text"))
        .field(
            "details",
            determine(|payment: &Object| match payment.get("method").as_str() {
                Some("card") => RuleLike::object([("number", primitives::numeric())]),
                Some("cash") => RuleLike::from(primitives::null()),
                _ => RuleLike::from(primitives::any()),
            }),
        )
        .field("note", if_exists(Kind::String))
        .field("currency", if_exists_not_match(equal("EUR"), "EUR"))
}

#[test]
fn test_determine_resolves_from_siblings() {
    init_tracing();
    let schema = payment_schema();

    let mut card = Object::new()
        .with("method", "card")
        .with("details", Object::new().with("number", "4111"));
    assert!(Driver::default().run(&schema, &mut card).is_ok());

    let mut bad_card = Object::new()
        .with("method", "card")
        .with("details", Object::new().with("number", "41-11"));
    let report = Driver::default().run(&schema, &mut bad_card);
    let error = report.first_error().unwrap();
    assert_eq!(error.path, "details.number");
    assert_eq!(error.key(), Some(keys::NUMERIC));

    let mut cash = Object::new().with("method", "cash").with("details", Value::Null);
    assert!(Driver::default().run(&schema, &mut cash).is_ok());
}

#[test]
fn test_element_errors_keep_their_path() {
    let schema = Schema::named("Queue").field(
        "jobs",
        Shape::array_of(RuleLike::object([("id", Kind::Number)])),
    );
    let mut queue = Object::new().with(
        "jobs",
        vec![Object::new().with("id", 1), Object::new().with("id", "two")],
    );

    let report = Driver::default().run(&schema, &mut queue);
    let error = report.first_error().unwrap();
    assert_eq!(error.path, "jobs[1].id");
    assert_eq!(error.key(), Some(keys::TYPE_KIND));
}

#[test]
fn test_determine_state_does_not_leak_between_containers() {
    let schema = payment_schema();
    let driver = Driver::default();
    let mut ctx = Context::new();

    let mut cash = Object::new().with("method", "cash").with("details", Value::Null);
    assert!(driver.run_with(&schema, &mut cash, &mut ctx).is_ok());

    // Same schema, same context, different container: resolution is redone.
    let mut card = Object::new()
        .with("method", "card")
        .with("details", Object::new().with("number", "12"));
    assert!(driver.run_with(&schema, &mut card, &mut ctx).is_ok());
}

#[test]
fn test_determine_unresolved_outside_driver() {
    let rule = determine(|_: &Object| Kind::Number);
    let error = rule.validate(&Value::from(1), &Context::new()).unwrap();
    assert_eq!(error.key(), Some(keys::DETERMINE_UNRESOLVED));
    assert_eq!(error.target(), &Value::from(1));
}

#[test]
fn test_if_not_match_heals_but_reports() {
    let schema = Schema::new().field("retries", if_not_match(Kind::Number, 3));
    let mut config = Object::new().with("retries", "lots");

    let report = Driver::default().run(&schema, &mut config);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.first_error().unwrap().target(), &Value::from("lots"));
    assert_eq!(config.get("retries"), &Value::from(3));

    let second = Driver::default().run(&schema, &mut config);
    assert!(second.is_ok());
    assert!(second.patches.is_empty());
}

#[test]
fn test_if_exists_not_match_leaves_missing_alone() {
    let schema = payment_schema();
    let mut payment = Object::new().with("method", "other");

    assert!(Driver::default().run(&schema, &mut payment).is_ok());
    assert!(!payment.contains_key("currency"));

    payment.insert("currency", "USD");
    let report = Driver::default().run(&schema, &mut payment);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.first_error().unwrap().path, "currency");
    assert_eq!(payment.get("currency"), &Value::from("EUR"));
}

#[test]
fn test_lambda_contract_through_driver() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let schema = Schema::new()
        .field("rate", Kind::Number)
        .field(
            "convert",
            lambda(RuleLike::tuple([Kind::Number]), Kind::Number),
        );

    let mut converter = Object::new().with("rate", 2).with(
        "convert",
        Callable::named("convert", move |this, args| {
            counter.fetch_add(1, Ordering::SeqCst);
            let rate = this.as_object().and_then(|o| o.get("rate").as_f64()).unwrap_or(1.0);
            Ok(Value::Number(args[0].as_f64().unwrap_or_default() * rate))
        }),
    );

    let report = Driver::default().run(&schema, &mut converter);
    assert!(report.is_ok());
    assert_eq!(report.patches.len(), 1);

    assert_eq!(converter.invoke("convert", &[5.into()]).unwrap(), Value::from(10));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let err = converter.invoke("convert", &["5".into()]).unwrap_err();
    assert!(matches!(err, CallError::Arguments(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A second run does not stack another adapter.
    let again = Driver::default().run(&schema, &mut converter);
    assert!(again.patches.is_empty());
}

#[test]
fn test_lambda_rejects_non_callable() {
    let schema = Schema::new().field("handler", lambda(Kind::Array, Kind::Any));
    let mut object = Object::new().with("handler", "not a function");

    let report = Driver::default().run(&schema, &mut object);
    assert_eq!(report.first_error().unwrap().key(), Some(keys::LAMBDA_FUNCTION));
    assert_eq!(object.get("handler"), &Value::from("not a function"));
}

#[test]
fn test_instance_and_equality_rules() {
    let vehicle = Class::new("Vehicle");
    let car = Class::extends("Car", &vehicle);
    let schema = Schema::new()
        .field("ride", instance_of(&vehicle))
        .field("wheels", equal(4));

    let mut ok = Object::new()
        .with("ride", car.instantiate(Object::new()))
        .with("wheels", 4);
    assert!(Driver::default().run(&schema, &mut ok).is_ok());

    let mut bad = Object::new().with("ride", Object::new()).with("wheels", "4");
    let report = Driver::default().run(&schema, &mut bad);
    let reported: Vec<Option<&str>> = report.errors.errors.iter().map(|e| e.key()).collect();
    assert_eq!(reported, vec![Some(keys::INSTANCE_OF), Some(keys::EQUAL)]);
}

#[test]
fn test_dynamic_rule_values() {
    let rule = Rule::from_values(Some("Loose"), Value::Null, Some(Value::from(1)));
    let schema = Schema::new().field("anything", rule);
    let mut object = Object::new().with("anything", 42);

    let report = Driver::new(DriverConfig::fail_fast()).run(&schema, &mut object);
    assert!(report.is_ok());
    assert_eq!(object.get("anything"), &Value::from(42));
}

#[test]
fn test_errors_render_as_json() {
    let schema = Schema::new().field("age", validate(primitives::numeric(), "age must be numeric"));
    let mut object = Object::new().with("age", "ten");

    let report = Driver::default().run(&schema, &mut object);
    let json = report.first_error().unwrap().to_json();
    assert_eq!(json["path"], "age");
    assert_eq!(json["message"], "age must be numeric");
    assert_eq!(json["rule"], "Numeric");
    assert_eq!(json["type"], "Verify");
    assert_eq!(json["keyed"], false);
}
