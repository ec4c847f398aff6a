//! Constant rules.
//!
//! Each function returns a clone of a shared instance, so every caller sees
//! the same rule identity.

use std::sync::OnceLock;

use regex::Regex;
use verdict_core::{keys, RuleError, Value};

use crate::rule::Rule;

/// Unsigned decimal: digits, optionally one fractional group.
const NUMERIC_PATTERN: &str = r"^[0-9]+(?:\.[0-9]+)?$";

fn numeric_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(NUMERIC_PATTERN).expect("numeric pattern is valid"))
}

/// Passes only `null`.
pub fn null() -> Rule {
    static RULE: OnceLock<Rule> = OnceLock::new();
    RULE.get_or_init(|| {
        Rule::new("Null", |value| {
            (!value.is_null()).then(|| RuleError::keyed(keys::NULL, value))
        })
    })
    .clone()
}

/// Passes only the missing sentinel.
pub fn missing() -> Rule {
    static RULE: OnceLock<Rule> = OnceLock::new();
    RULE.get_or_init(|| {
        Rule::new("Undefined", |value| {
            (!value.is_missing()).then(|| RuleError::keyed(keys::UNDEFINED, value))
        })
    })
    .clone()
}

/// Passes everything.
pub fn any() -> Rule {
    static RULE: OnceLock<Rule> = OnceLock::new();
    RULE.get_or_init(|| Rule::new("Any", |_| None)).clone()
}

/// Passes numbers and text holding an unsigned decimal such as `"12"` or
/// `"12.5"`. Signs, exponents and a bare leading period are rejected.
pub fn numeric() -> Rule {
    static RULE: OnceLock<Rule> = OnceLock::new();
    RULE.get_or_init(|| Rule::new("Numeric", |value| {
        let ok = match value {
            Value::Number(_) => true,
            Value::String(text) => numeric_pattern().is_match(text),
            _ => false,
        };
        (!ok).then(|| RuleError::keyed(keys::NUMERIC, value))
    }))
    .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use verdict_core::Object;

    fn passes(rule: &Rule, value: impl Into<Value>) -> bool {
        rule.validate(&value.into(), &Context::new()).is_none()
    }

    #[test]
    fn test_null() {
        let rule = null();
        assert!(passes(&rule, Value::Null));
        assert!(!passes(&rule, Value::Missing));
        assert!(!passes(&rule, 0));
        let error = rule.validate(&Value::from(""), &Context::new()).unwrap();
        assert_eq!(error.key(), Some(keys::NULL));
        assert_eq!(error.target(), &Value::from(""));
    }

    #[test]
    fn test_missing() {
        let rule = missing();
        assert!(passes(&rule, Value::Missing));
        assert!(!passes(&rule, Value::Null));
        assert_eq!(
            rule.validate(&Value::from(false), &Context::new()).unwrap().key(),
            Some(keys::UNDEFINED)
        );
    }

    #[test]
    fn test_any() {
        let rule = any();
        for value in [Value::Missing, Value::Null, Value::from("x"), Value::Object(Object::new())] {
            assert!(passes(&rule, value));
        }
    }

    #[test]
    fn test_numeric() {
        let rule = numeric();
        assert!(passes(&rule, "12.5"));
        assert!(passes(&rule, "0"));
        assert!(passes(&rule, 7));
        assert!(passes(&rule, f64::NAN));

        for bad in ["12.5.3", ".5", "5.", "-1", "+1", "1e5", "", " 1", "١٢"] {
            assert!(!passes(&rule, bad), "{:?} should not be numeric", bad);
        }
        assert!(!passes(&rule, Value::Null));
        assert_eq!(
            rule.validate(&Value::from("x"), &Context::new()).unwrap().key(),
            Some(keys::NUMERIC)
        );
    }

    #[test]
    fn test_constants_are_shared() {
        assert_eq!(null().id(), null().id());
        assert_ne!(null().id(), missing().id());
    }
}
