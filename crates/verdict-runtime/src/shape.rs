//! Minimal structural types produced by lifting.

use std::fmt;

use verdict_core::{compose, keys, Class, ErrorContext, Kind, RuleError, Type, Value};

use crate::checker::Checker;
use crate::context::Context;

/// A structural type for non-object values.
///
/// Object shapes are [`Schema`](crate::Schema)s.
#[derive(Clone)]
pub enum Shape {
    /// Value of the given kind.
    Kind(Kind),
    /// Instance of the class or one of its subclasses.
    Class(Class),
    /// Strictly equal to the value.
    Literal(Value),
    /// Array with exactly one element per checker, in order.
    Tuple(Vec<Checker>),
    /// Array whose elements all pass the checker.
    ArrayOf(Box<Checker>),
    /// Passes if any alternative passes.
    OneOf(Vec<Checker>),
}

impl Shape {
    pub fn array_of(element: impl Into<crate::RuleLike>) -> Self {
        Shape::ArrayOf(Box::new(element.into().resolve()))
    }

    pub fn one_of<I, R>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<crate::RuleLike>,
    {
        Shape::OneOf(alternatives.into_iter().map(|r| r.into().resolve()).collect())
    }

    fn check_elements<'a, I>(&self, items: I, value: &Value) -> Option<RuleError>
    where
        I: Iterator<Item = (usize, &'a Checker, &'a Value)>,
    {
        let ctx = Context::new();
        for (index, checker, item) in items {
            if let Some(error) = checker.check(item, &ctx) {
                let error = compose(
                    Some(error),
                    ErrorContext::new(value).with_rule(checker.describe()),
                );
                return error.map(|e| {
                    let path = format!("[{}]", index);
                    if e.path.is_empty() {
                        e.at(path)
                    } else {
                        let nested = format!("{}.{}", path, e.path);
                        e.at(nested)
                    }
                });
            }
        }
        None
    }
}

impl Type for Shape {
    fn name(&self) -> String {
        match self {
            Shape::Kind(kind) => kind.to_string(),
            Shape::Class(class) => class.name().to_string(),
            Shape::Literal(value) => value.to_string(),
            Shape::Tuple(items) => {
                let names: Vec<String> = items.iter().map(Checker::describe).collect();
                format!("[{}]", names.join(", "))
            }
            Shape::ArrayOf(element) => format!("[{}...]", element.describe()),
            Shape::OneOf(alternatives) => {
                let names: Vec<String> = alternatives.iter().map(Checker::describe).collect();
                names.join(" | ")
            }
        }
    }

    fn catch(&self, value: &Value) -> Option<RuleError> {
        match self {
            Shape::Kind(kind) => (!kind.matches(value))
                .then(|| RuleError::keyed(keys::TYPE_KIND, value).with_rule(kind.to_string())),
            Shape::Class(class) => {
                let matches = value
                    .as_instance()
                    .is_some_and(|instance| instance.class().is_subclass_of(class));
                (!matches)
                    .then(|| RuleError::keyed(keys::TYPE_CLASS, value).with_rule(class.name()))
            }
            Shape::Literal(expected) => (!value.strict_eq(expected))
                .then(|| RuleError::keyed(keys::TYPE_LITERAL, value).with_rule(expected.to_string())),
            Shape::Tuple(checkers) => {
                let Value::Array(items) = value else {
                    return Some(RuleError::keyed(keys::TYPE_KIND, value).with_rule(self.name()));
                };
                if items.len() != checkers.len() {
                    return Some(
                        RuleError::keyed(keys::TYPE_TUPLE_LENGTH, value).with_rule(self.name()),
                    );
                }
                self.check_elements(
                    checkers.iter().zip(items).enumerate().map(|(i, (c, v))| (i, c, v)),
                    value,
                )
            }
            Shape::ArrayOf(element) => {
                let Value::Array(items) = value else {
                    return Some(RuleError::keyed(keys::TYPE_KIND, value).with_rule(self.name()));
                };
                self.check_elements(
                    items.iter().enumerate().map(move |(i, v)| (i, &**element, v)),
                    value,
                )
            }
            Shape::OneOf(alternatives) => {
                let ctx = Context::new();
                let matched = alternatives.iter().any(|checker| checker.test(value, &ctx));
                (!matched).then(|| RuleError::keyed(keys::TYPE_ONE_OF, value).with_rule(self.name()))
            }
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({})", self.name())
    }
}
