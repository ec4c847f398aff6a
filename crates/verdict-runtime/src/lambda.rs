//! Function-call contracts.

use std::sync::Arc;

use tracing::{debug, trace};
use verdict_core::{keys, CallError, Callable, RuleError, Type, Value};

use crate::checker::RuleLike;
use crate::rule::{Patch, Rule};

/// Require a callable and wrap it with argument and return contracts.
///
/// The override step replaces the property with an adapter that, on every
/// call, checks the argument list (as an array value) against `input` before
/// the original function runs, then checks the returned value against
/// `output`. Violations are reported as [`CallError::Arguments`] and
/// [`CallError::Return`]. The receiver passed to the adapter is forwarded to
/// the original function. Only [`Object::invoke`](verdict_core::Object::invoke)
/// supplies the enclosing container as receiver; a direct [`Callable::call`]
/// forwards whatever receiver it is given.
///
/// Adapters are tagged with the rule's identity, so running the same rule
/// over an already wrapped property leaves it unchanged.
pub fn lambda(input: impl Into<RuleLike>, output: impl Into<RuleLike>) -> Rule {
    let input = input.into().resolve().into_type();
    let output = output.into().resolve().into_type();

    Rule::builder()
        .name("Lambda")
        .check(|_, value, _| {
            (!value.is_callable()).then(|| RuleError::keyed(keys::LAMBDA_FUNCTION, value))
        })
        .on_override(move |this, error, key, container, _| {
            if error.is_some() {
                return None;
            }
            let Value::Function(original) = container.get(key) else {
                return None;
            };
            let tag = this.id().get();
            if original.is_wrapped_by(tag) {
                trace!("{} already wraps {}", this, key);
                return None;
            }
            debug!("{} wrapping {} with {} -> {}", this, key, input.name(), output.name());
            let adapter = contract(original, tag, input.clone(), output.clone());
            Some(Patch::new(key, Value::Function(adapter), this))
        })
        .build()
}

fn contract(original: &Callable, tag: u64, input: Arc<dyn Type>, output: Arc<dyn Type>) -> Callable {
    original.wrap(tag, move |inner, receiver, args| {
        input
            .assert(&Value::Array(args.to_vec()))
            .map_err(CallError::Arguments)?;
        let result = inner.call(receiver, args)?;
        output.assert(&result).map_err(CallError::Return)?;
        Ok(result)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use verdict_core::{Kind, Object};

    fn adder(calls: Arc<AtomicUsize>) -> Callable {
        Callable::named("add", move |_, args| {
            calls.fetch_add(1, Ordering::SeqCst);
            let sum: f64 = args.iter().filter_map(Value::as_f64).sum();
            Ok(Value::Number(sum))
        })
    }

    fn wrap(rule: &Rule, container: &mut Object, key: &str) {
        let mut ctx = Context::new();
        let error = rule.validate(container.get(key), &ctx);
        if let Some(patch) = rule.apply_override(error.as_ref(), key, container, &mut ctx) {
            container.insert(patch.key, patch.value);
        }
    }

    #[test]
    fn test_non_callable_is_rejected_and_not_wrapped() {
        let rule = lambda(RuleLike::tuple([Kind::Number]), Kind::Number);
        let mut ctx = Context::new();
        let container = Object::new().with("f", 3);

        let error = rule.validate(container.get("f"), &ctx).unwrap();
        assert_eq!(error.key(), Some(keys::LAMBDA_FUNCTION));
        assert!(rule
            .apply_override(Some(&error), "f", &container, &mut ctx)
            .is_none());
    }

    #[test]
    fn test_valid_call_passes_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let rule = lambda(RuleLike::tuple([Kind::Number, Kind::Number]), Kind::Number);
        let mut container = Object::new().with("add", adder(calls.clone()));
        wrap(&rule, &mut container, "add");

        assert_eq!(container.invoke("add", &[2.into(), 3.into()]).unwrap(), Value::from(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bad_arguments_fail_before_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let rule = lambda(RuleLike::tuple([Kind::Number, Kind::Number]), Kind::Number);
        let mut container = Object::new().with("add", adder(calls.clone()));
        wrap(&rule, &mut container, "add");

        let err = container.invoke("add", &[2.into(), "3".into()]).unwrap_err();
        assert!(matches!(err, CallError::Arguments(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_bad_return_fails_after_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let rule = lambda(RuleLike::tuple([Kind::Number, Kind::Number]), Kind::String);
        let mut container = Object::new().with("add", adder(calls.clone()));
        wrap(&rule, &mut container, "add");

        match container.invoke("add", &[1.into(), 1.into()]) {
            Err(CallError::Return(error)) => assert_eq!(error.target(), &Value::from(2)),
            other => panic!("expected return violation, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wrapping_is_idempotent_per_rule() {
        let rule = lambda(Kind::Array, Kind::Any);
        let other = lambda(Kind::Array, Kind::Any);
        let mut container = Object::new().with("f", Callable::new(|_, _| Ok(Value::Null)));

        wrap(&rule, &mut container, "f");
        wrap(&rule, &mut container, "f");
        let depth = |c: &Object| c.get("f").as_callable().map(Callable::wrap_depth);
        assert_eq!(depth(&container), Some(1));

        wrap(&other, &mut container, "f");
        assert_eq!(depth(&container), Some(2));
    }

    #[test]
    fn test_receiver_is_forwarded() {
        let rule = lambda(Kind::Array, Kind::Number);
        let method = Callable::new(|this, _| {
            Ok(this.as_object().map_or(Value::Null, |o| o.get("base").clone()))
        });
        let mut container = Object::new().with("base", 10).with("get", method);
        wrap(&rule, &mut container, "get");

        assert_eq!(container.invoke("get", &[]).unwrap(), Value::from(10));
    }

    #[test]
    fn test_direct_call_keeps_caller_receiver() {
        let rule = lambda(Kind::Array, Kind::Any);
        let method = Callable::new(|this, _| Ok(this.clone()));
        let mut container = Object::new().with("base", 10).with("get", method);
        wrap(&rule, &mut container, "get");

        let adapter = container.get("get").as_callable().cloned().unwrap();
        assert_eq!(adapter.call(&Value::Null, &[]).unwrap(), Value::Null);
        assert!(container.invoke("get", &[]).unwrap().as_object().is_some());
    }
}
