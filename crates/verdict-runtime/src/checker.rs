//! Resolution of rule-like values.
//!
//! Combinators accept anything rule-like: a [`Rule`], a [`Type`], or a value
//! that can be lifted into a type (a kind, a class, a literal, or a nested
//! shape). [`RuleLike`] is the input side; [`RuleLike::resolve`] turns it
//! into a [`Checker`] once, when the combinator is built, so validation never
//! re-dispatches on the input form.

use std::fmt;
use std::sync::Arc;

use verdict_core::{Class, Kind, RuleError, Type, Value};

use crate::context::Context;
use crate::rule::Rule;
use crate::schema::Schema;
use crate::shape::Shape;

/// A resolved rule-like value.
#[derive(Clone)]
pub enum Checker {
    Rule(Rule),
    Type(Arc<dyn Type>),
}

impl Checker {
    /// Rule validate or type catch.
    pub fn check(&self, value: &Value, ctx: &Context) -> Option<RuleError> {
        match self {
            Checker::Rule(rule) => rule.validate(value, ctx),
            Checker::Type(ty) => ty.catch(value),
        }
    }

    pub fn test(&self, value: &Value, ctx: &Context) -> bool {
        match self {
            Checker::Rule(rule) => rule.validate(value, ctx).is_none(),
            Checker::Type(ty) => ty.test(value),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Checker::Rule(rule) => rule.label().to_string(),
            Checker::Type(ty) => ty.name(),
        }
    }

    /// View this checker as a type, wrapping rules.
    pub fn into_type(self) -> Arc<dyn Type> {
        match self {
            Checker::Rule(rule) => Arc::new(RuleType(rule)),
            Checker::Type(ty) => ty,
        }
    }

    /// The nested object schema, when this checker is one.
    pub fn as_schema(&self) -> Option<&Schema> {
        match self {
            Checker::Type(ty) => ty.as_any()?.downcast_ref::<Schema>(),
            Checker::Rule(_) => None,
        }
    }
}

impl fmt::Debug for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checker::Rule(rule) => f.debug_tuple("Rule").field(rule).finish(),
            Checker::Type(ty) => f.debug_tuple("Type").field(ty).finish(),
        }
    }
}

impl fmt::Display for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A rule lifted into a type.
///
/// Validation happens with a fresh context, so rules that depend on an
/// override having run report their unresolved state.
#[derive(Debug, Clone)]
pub struct RuleType(pub Rule);

impl Type for RuleType {
    fn name(&self) -> String {
        self.0.label().to_string()
    }

    fn catch(&self, value: &Value) -> Option<RuleError> {
        self.0.validate(value, &Context::new())
    }
}

/// Anything a combinator accepts in rule position.
#[derive(Clone)]
pub enum RuleLike {
    Rule(Rule),
    Type(Arc<dyn Type>),
    Kind(Kind),
    Class(Class),
    Literal(Value),
    Tuple(Vec<RuleLike>),
    Object(Vec<(String, RuleLike)>),
}

impl RuleLike {
    /// Wrap any type.
    pub fn of_type<T: Type + 'static>(ty: T) -> Self {
        RuleLike::Type(Arc::new(ty))
    }

    /// Positional array shape.
    pub fn tuple<I, R>(items: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RuleLike>,
    {
        RuleLike::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Nested object shape.
    pub fn object<I, K, R>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, R)>,
        K: Into<String>,
        R: Into<RuleLike>,
    {
        RuleLike::Object(fields.into_iter().map(|(k, r)| (k.into(), r.into())).collect())
    }

    /// Resolve with fixed precedence: rules and types are used as-is,
    /// everything else is lifted into a type.
    pub fn resolve(self) -> Checker {
        match self {
            RuleLike::Rule(rule) => Checker::Rule(rule),
            RuleLike::Type(ty) => Checker::Type(ty),
            lifted => Checker::Type(lift(lifted)),
        }
    }
}

fn lift(rule_like: RuleLike) -> Arc<dyn Type> {
    match rule_like {
        RuleLike::Rule(rule) => Arc::new(RuleType(rule)),
        RuleLike::Type(ty) => ty,
        RuleLike::Kind(kind) => Arc::new(Shape::Kind(kind)),
        RuleLike::Class(class) => Arc::new(Shape::Class(class)),
        RuleLike::Literal(Value::Array(items)) => Arc::new(Shape::Tuple(
            items.into_iter().map(|v| RuleLike::Literal(v).resolve()).collect(),
        )),
        RuleLike::Literal(Value::Object(object)) => Arc::new(
            object
                .into_iter()
                .fold(Schema::new(), |schema, (key, value)| schema.field(key, RuleLike::Literal(value))),
        ),
        RuleLike::Literal(value) => Arc::new(Shape::Literal(value)),
        RuleLike::Tuple(items) => {
            Arc::new(Shape::Tuple(items.into_iter().map(RuleLike::resolve).collect()))
        }
        RuleLike::Object(fields) => Arc::new(
            fields
                .into_iter()
                .fold(Schema::new(), |schema, (key, rule)| schema.field(key, rule)),
        ),
    }
}

impl fmt::Debug for RuleLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleLike::Rule(rule) => f.debug_tuple("Rule").field(rule).finish(),
            RuleLike::Type(ty) => f.debug_tuple("Type").field(ty).finish(),
            RuleLike::Kind(kind) => f.debug_tuple("Kind").field(kind).finish(),
            RuleLike::Class(class) => f.debug_tuple("Class").field(class).finish(),
            RuleLike::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            RuleLike::Tuple(items) => f.debug_tuple("Tuple").field(items).finish(),
            RuleLike::Object(fields) => f.debug_tuple("Object").field(fields).finish(),
        }
    }
}

impl From<Rule> for RuleLike {
    fn from(rule: Rule) -> Self {
        RuleLike::Rule(rule)
    }
}

impl From<&Rule> for RuleLike {
    fn from(rule: &Rule) -> Self {
        RuleLike::Rule(rule.clone())
    }
}

impl From<Checker> for RuleLike {
    fn from(checker: Checker) -> Self {
        match checker {
            Checker::Rule(rule) => RuleLike::Rule(rule),
            Checker::Type(ty) => RuleLike::Type(ty),
        }
    }
}

impl From<Arc<dyn Type>> for RuleLike {
    fn from(ty: Arc<dyn Type>) -> Self {
        RuleLike::Type(ty)
    }
}

impl From<Shape> for RuleLike {
    fn from(shape: Shape) -> Self {
        RuleLike::of_type(shape)
    }
}

impl From<Schema> for RuleLike {
    fn from(schema: Schema) -> Self {
        RuleLike::of_type(schema)
    }
}

impl From<Kind> for RuleLike {
    fn from(kind: Kind) -> Self {
        RuleLike::Kind(kind)
    }
}

impl From<Class> for RuleLike {
    fn from(class: Class) -> Self {
        RuleLike::Class(class)
    }
}

impl From<&Class> for RuleLike {
    fn from(class: &Class) -> Self {
        RuleLike::Class(class.clone())
    }
}

impl From<Value> for RuleLike {
    fn from(value: Value) -> Self {
        RuleLike::Literal(value)
    }
}

impl From<bool> for RuleLike {
    fn from(b: bool) -> Self {
        RuleLike::Literal(b.into())
    }
}

impl From<f64> for RuleLike {
    fn from(n: f64) -> Self {
        RuleLike::Literal(n.into())
    }
}

impl From<i32> for RuleLike {
    fn from(n: i32) -> Self {
        RuleLike::Literal(n.into())
    }
}

impl From<&str> for RuleLike {
    fn from(s: &str) -> Self {
        RuleLike::Literal(s.into())
    }
}

impl From<String> for RuleLike {
    fn from(s: String) -> Self {
        RuleLike::Literal(s.into())
    }
}
