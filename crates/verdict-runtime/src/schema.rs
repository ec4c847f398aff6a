//! Object schemas.

use std::any::Any;
use std::fmt;

use verdict_core::{keys, RuleError, Type, Value};

use crate::checker::{Checker, RuleLike};
use crate::driver::Driver;

/// An ordered set of property rules for an object.
///
/// As a [`Type`], a schema is pure: `catch` runs the full two-phase protocol
/// against a copy of the value, so overrides never touch the caller's data.
/// To heal an object in place, run it through a [`Driver`].
#[derive(Clone, Default)]
pub struct Schema {
    name: Option<String>,
    entries: Vec<(String, Checker)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            entries: Vec::new(),
        }
    }

    /// Attach a rule-like value to `key`. Later entries for the same key
    /// replace earlier ones.
    pub fn field(mut self, key: impl Into<String>, rule: impl Into<RuleLike>) -> Self {
        let key = key.into();
        let checker = rule.into().resolve();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = checker,
            None => self.entries.push((key, checker)),
        }
        self
    }

    pub fn entries(&self) -> &[(String, Checker)] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&Checker> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, c)| c)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Type for Schema {
    fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "Object".to_string())
    }

    fn catch(&self, value: &Value) -> Option<RuleError> {
        let Value::Object(object) = value else {
            return Some(RuleError::keyed(keys::TYPE_KIND, value).with_rule(self.name()));
        };
        let mut copy = object.clone();
        Driver::fail_fast().run(self, &mut copy).errors.errors.into_iter().next()
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("entries", &self.entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators;
    use verdict_core::{Kind, Object};

    #[test]
    fn test_field_replaces_existing_entry() {
        let schema = Schema::new()
            .field("a", Kind::Number)
            .field("b", Kind::String)
            .field("a", Kind::Bool);

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.get("a").map(Checker::describe), Some("Bool".to_string()));
        assert_eq!(schema.entries()[0].0, "a");
    }

    #[test]
    fn test_catch_does_not_mutate() {
        let schema = Schema::named("Config").field("port", combinators::if_not_match(Kind::Number, 8080));
        let value = Value::Object(Object::new().with("port", "http"));

        let error = schema.catch(&value).unwrap();
        assert_eq!(error.path, "port");
        assert_eq!(value.as_object().unwrap().get("port"), &Value::from("http"));
    }

    #[test]
    fn test_catch_rejects_non_objects() {
        let schema = Schema::named("Config");
        let error = schema.catch(&Value::from(3)).unwrap();
        assert_eq!(error.key(), Some(keys::TYPE_KIND));
        assert_eq!(error.rule(), Some("Config"));
        assert!(schema.test(&Value::Object(Object::new())));
    }
}
