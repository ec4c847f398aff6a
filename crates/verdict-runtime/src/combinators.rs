//! Combinators that build specialized rules.
//!
//! Every combinator resolves its rule-like argument once, when it is called,
//! and returns an ordinary [`Rule`].

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use verdict_core::{compose, keys, Class, ErrorContext, Kind, Message, Object, RuleError, Type, Value};

use crate::checker::{Checker, RuleLike};
use crate::context::Context;
use crate::rule::{Patch, Rule};
use crate::schema::Schema;
use crate::shape::Shape;

/// The condition checked by [`validate`].
#[derive(Clone)]
pub enum Condition {
    Predicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
    Checker(Checker),
}

impl Condition {
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Condition::Predicate(Arc::new(predicate))
    }

    /// Resolve any rule-like value into a condition.
    pub fn like(rule: impl Into<RuleLike>) -> Self {
        Condition::Checker(rule.into().resolve())
    }

    fn holds(&self, value: &Value, ctx: &Context) -> bool {
        match self {
            Condition::Predicate(predicate) => predicate(value),
            Condition::Checker(checker) => checker.test(value, ctx),
        }
    }

    fn describe(&self) -> String {
        match self {
            Condition::Predicate(_) => "predicate".to_string(),
            Condition::Checker(checker) => checker.describe(),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Predicate(_) => f.write_str("Predicate"),
            Condition::Checker(checker) => f.debug_tuple("Checker").field(checker).finish(),
        }
    }
}

impl From<Rule> for Condition {
    fn from(rule: Rule) -> Self {
        Condition::Checker(Checker::Rule(rule))
    }
}

impl From<&Rule> for Condition {
    fn from(rule: &Rule) -> Self {
        Condition::Checker(Checker::Rule(rule.clone()))
    }
}

impl From<Arc<dyn Type>> for Condition {
    fn from(ty: Arc<dyn Type>) -> Self {
        Condition::Checker(Checker::Type(ty))
    }
}

impl From<Kind> for Condition {
    fn from(kind: Kind) -> Self {
        Condition::like(kind)
    }
}

impl From<Shape> for Condition {
    fn from(shape: Shape) -> Self {
        Condition::like(shape)
    }
}

impl From<Schema> for Condition {
    fn from(schema: Schema) -> Self {
        Condition::like(schema)
    }
}

impl From<Checker> for Condition {
    fn from(checker: Checker) -> Self {
        Condition::Checker(checker)
    }
}

/// The message reported by [`validate`].
#[derive(Clone)]
pub enum MessageSource {
    Literal(Message),
    /// Evaluated with the failing value, only when an error is produced.
    Lazy(Arc<dyn Fn(&Value) -> Message + Send + Sync>),
}

impl MessageSource {
    pub fn lazy<F, M>(render: F) -> Self
    where
        F: Fn(&Value) -> M + Send + Sync + 'static,
        M: Into<Message>,
    {
        MessageSource::Lazy(Arc::new(move |value: &Value| -> Message { render(value).into() }))
    }

    fn render(&self, value: &Value) -> Message {
        match self {
            MessageSource::Literal(message) => message.clone(),
            MessageSource::Lazy(render) => render(value),
        }
    }
}

impl fmt::Debug for MessageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageSource::Literal(message) => f.debug_tuple("Literal").field(message).finish(),
            MessageSource::Lazy(_) => f.write_str("Lazy"),
        }
    }
}

impl From<Message> for MessageSource {
    fn from(message: Message) -> Self {
        MessageSource::Literal(message)
    }
}

impl From<&'static str> for MessageSource {
    fn from(text: &'static str) -> Self {
        MessageSource::Literal(text.into())
    }
}

impl From<String> for MessageSource {
    fn from(text: String) -> Self {
        MessageSource::Literal(text.into())
    }
}

/// Delegate to `checker` and attach `{target, rule, type}` context.
fn delegate(owner: &Rule, checker: &Checker, value: &Value, ctx: &Context) -> Option<RuleError> {
    compose(
        checker.check(value, ctx),
        ErrorContext::new(value)
            .with_rule(checker.describe())
            .raised_by(owner.rule_ref()),
    )
}

fn substitute(owner: &Rule, error: Option<&RuleError>, key: &str, default: &Value) -> Option<Patch> {
    error?;
    debug!("{} substituting default for {}", owner, key);
    Some(Patch::new(key, default.clone(), owner))
}

/// A rule with a custom message.
///
/// Fails when the predicate is false, the rule reports an error, or the type
/// test fails. The underlying error is replaced by `message`.
pub fn validate(condition: impl Into<Condition>, message: impl Into<MessageSource>) -> Rule {
    let condition = condition.into();
    let message = message.into();
    Rule::builder()
        .name("Verify")
        .check(move |_, value, ctx| {
            if condition.holds(value, ctx) {
                return None;
            }
            Some(RuleError::new(message.render(value), value).with_rule(condition.describe()))
        })
        .build()
}

/// Shorthand for [`validate`] with a predicate closure.
pub fn verify<F>(predicate: F, message: impl Into<MessageSource>) -> Rule
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    validate(Condition::predicate(predicate), message)
}

/// Check `rule` only when the value is present.
pub fn if_exists(rule: impl Into<RuleLike>) -> Rule {
    let checker = rule.into().resolve();
    Rule::builder()
        .name("IfExists")
        .check(move |this, value, ctx| {
            if value.is_missing() {
                return None;
            }
            delegate(this, &checker, value, ctx)
        })
        .build()
}

/// Check `rule`; on failure, replace the property with `default`.
///
/// The failure is still reported for the pass that detected it.
pub fn if_not_match(rule: impl Into<RuleLike>, default: impl Into<Value>) -> Rule {
    let checker = rule.into().resolve();
    let default = default.into();
    Rule::builder()
        .name("IfNotMatch")
        .check(move |this, value, ctx| delegate(this, &checker, value, ctx))
        .on_override(move |this, error, key, _, _| substitute(this, error, key, &default))
        .build()
}

/// [`if_exists`] combined with [`if_not_match`]: absent values are skipped,
/// present values that fail are replaced with `default`.
pub fn if_exists_not_match(rule: impl Into<RuleLike>, default: impl Into<Value>) -> Rule {
    let checker = rule.into().resolve();
    let default = default.into();
    Rule::builder()
        .name("IfExistsNotMatch")
        .check(move |this, value, ctx| {
            if value.is_missing() {
                return None;
            }
            delegate(this, &checker, value, ctx)
        })
        .on_override(move |this, error, key, _, _| substitute(this, error, key, &default))
        .build()
}

/// Choose the rule from sibling properties.
///
/// `factory` receives the container during the override step; the checker
/// it returns is recorded in the run context for that container. Until then
/// validation reports [`keys::DETERMINE_UNRESOLVED`]. The rule revalidates,
/// so drivers report the result against the resolved checker.
pub fn determine<F, R>(factory: F) -> Rule
where
    F: Fn(&Object) -> R + Send + Sync + 'static,
    R: Into<RuleLike>,
{
    Rule::builder()
        .name("Determine")
        .check(|this, value, ctx| match ctx.resolved(this.id()) {
            Some(checker) => delegate(this, checker, value, ctx),
            None => Some(RuleError::keyed(keys::DETERMINE_UNRESOLVED, value)),
        })
        .on_override(move |this, _, key, container, ctx| {
            let checker = factory(container).into().resolve();
            debug!("{} resolved {} for {}", this, checker, ctx.child_path(key));
            ctx.resolve(this.id(), checker);
            None
        })
        .revalidate()
        .build()
}

/// Instance of `class` or one of its subclasses. Plain objects never match.
pub fn instance_of(class: &Class) -> Rule {
    let class = class.clone();
    Rule::builder()
        .name("InstanceOf")
        .check(move |_, value, _| {
            let matches = value
                .as_instance()
                .is_some_and(|instance| instance.class().is_subclass_of(&class));
            (!matches).then(|| RuleError::keyed(keys::INSTANCE_OF, value).with_rule(class.name()))
        })
        .build()
}

/// Strictly identical to `expected`, without coercion.
pub fn equal(expected: impl Into<Value>) -> Rule {
    let expected = expected.into();
    Rule::builder()
        .name("Equal")
        .check(move |_, value, _| {
            (!value.strict_eq(&expected))
                .then(|| RuleError::keyed(keys::EQUAL, value).with_rule(expected.to_string()))
        })
        .build()
}
