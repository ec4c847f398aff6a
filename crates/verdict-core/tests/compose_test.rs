//! Properties of error composition and strict equality.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use verdict_core::{compose, ErrorContext, RuleError, RuleRef, Value};

/// Data values without floats, built through the JSON conversion.
fn data_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::Bool),
        any::<i32>().prop_map(|n| serde_json::json!(n)),
        "[a-zA-Z0-9_ ]{0,20}".prop_map(serde_json::Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(serde_json::Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6).prop_map(|m| {
                serde_json::Value::Object(m.into_iter().collect())
            }),
        ]
    })
    .prop_map(Value::from)
}

fn rule_ref(id: u64) -> RuleRef {
    RuleRef {
        id,
        name: format!("Rule{}", id),
    }
}

proptest! {
    #[test]
    fn compose_of_none_is_none(target in data_value(), id in 0u64..16) {
        let context = ErrorContext::new(&target).raised_by(rule_ref(id));
        prop_assert!(compose(None, context).is_none());
    }

    #[test]
    fn compose_keeps_message_and_target(target in data_value(), other in data_value(), id in 0u64..16) {
        let error = RuleError::new("broken", &target);
        let composed = compose(Some(error), ErrorContext::new(&other).raised_by(rule_ref(id)))
            .expect("error stays an error");
        prop_assert_eq!(composed.message().as_str(), "broken");
        prop_assert!(composed.target().strict_eq(&target));
        prop_assert_eq!(composed.raised_by().map(|r| r.id), Some(id));
    }

    #[test]
    fn compose_is_idempotent(target in data_value(), ids in prop::collection::vec(0u64..8, 1..10)) {
        let mut error = Some(RuleError::new("broken", &target));
        for id in &ids {
            let context = ErrorContext::new(&target).raised_by(rule_ref(*id));
            error = compose(error, context.clone());
            error = compose(error, context);
        }
        let error = error.expect("error stays an error");

        let mut distinct = ids.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(error.trace().len() + 1, distinct.len());
        prop_assert_eq!(error.raised_by().map(|r| r.id), ids.first().copied());
    }

    #[test]
    fn strict_eq_is_reflexive_for_data(value in data_value()) {
        prop_assert!(value.strict_eq(&value.clone()));
    }

    #[test]
    fn strict_eq_never_coerces(n in any::<i32>()) {
        prop_assert!(!Value::from(n).strict_eq(&Value::from(n.to_string())));
        prop_assert!(!Value::from(n != 0).strict_eq(&Value::from(n)));
    }
}

#[test]
fn test_missing_and_null_are_distinct() {
    assert!(!Value::Missing.strict_eq(&Value::Null));
    assert!(!Value::Number(f64::NAN).strict_eq(&Value::Number(f64::NAN)));
    assert_eq!(Value::from(serde_json::Value::Null), Value::Null);
}
