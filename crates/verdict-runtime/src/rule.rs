//! The rule abstraction and its two-phase protocol.
//!
//! A [`Rule`] pairs a pure validate step with an optional override step.
//! Drivers call them in a fixed order for each property:
//!
//! 1. `validate(value, ctx)` reports an error or `None`.
//! 2. `apply_override(error, key, container, ctx)` runs with that result and
//!    may return a [`Patch`] for the property or record resolution state in
//!    the context.
//! 3. If the rule [revalidates](Rule::revalidates), `validate` runs again on
//!    the (possibly patched) property and its result replaces the first one.
//!
//! Rules hold no mutable state, so one declared rule can be shared between
//! runs and threads.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use verdict_core::{compose, keys, ErrorContext, Message, Object, RuleError, RuleRef, Value};

use crate::context::Context;

static NEXT_RULE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a rule instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u64);

impl RuleId {
    fn next() -> Self {
        Self(NEXT_RULE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

pub type ValidateFn = dyn Fn(&Rule, &Value, &Context) -> Option<RuleError> + Send + Sync;
pub type OverrideFn =
    dyn Fn(&Rule, Option<&RuleError>, &str, &Object, &mut Context) -> Option<Patch> + Send + Sync;

/// A replacement value for one property of a container, produced by an
/// override step and applied by the driver.
#[derive(Debug, Clone)]
pub struct Patch {
    pub key: String,
    pub value: Value,
    pub origin: RuleRef,
}

impl Patch {
    pub fn new(key: impl Into<String>, value: Value, origin: &Rule) -> Self {
        Self {
            key: key.into(),
            value,
            origin: origin.rule_ref(),
        }
    }
}

/// A unit of validation logic.
#[derive(Clone)]
pub struct Rule {
    inner: Arc<RuleInner>,
}

struct RuleInner {
    id: RuleId,
    name: Option<String>,
    validate: Arc<ValidateFn>,
    override_fn: Option<Arc<OverrideFn>>,
    revalidates: bool,
}

impl Rule {
    /// A named rule from a validate closure.
    ///
    /// Errors returned by the closure are attributed to this rule and carry
    /// the checked value as target unless they already name one.
    pub fn new<F>(name: impl Into<String>, validate: F) -> Self
    where
        F: Fn(&Value) -> Option<RuleError> + Send + Sync + 'static,
    {
        Self::builder().name(name).check(move |_, value, _| validate(value)).build()
    }

    /// An unnamed rule from a validate closure alone.
    pub fn anonymous<F>(validate: F) -> Self
    where
        F: Fn(&Value) -> Option<RuleError> + Send + Sync + 'static,
    {
        Self::builder().check(move |_, value, _| validate(value)).build()
    }

    /// A named rule with an override step.
    ///
    /// The override closure receives the validate result, the property key
    /// and the container, and may return a replacement value for the
    /// property.
    pub fn with_override<F, O>(name: impl Into<String>, validate: F, on_override: O) -> Self
    where
        F: Fn(&Value) -> Option<RuleError> + Send + Sync + 'static,
        O: Fn(Option<&RuleError>, &str, &Object) -> Option<Value> + Send + Sync + 'static,
    {
        Self::builder()
            .name(name)
            .check(move |_, value, _| validate(value))
            .on_override(move |rule, error, key, container, _| {
                on_override(error, key, container).map(|value| Patch::new(key, value, rule))
            })
            .build()
    }

    /// Build a rule from host values.
    ///
    /// Only [`Value::Function`] counts as callable. A non-callable validate
    /// yields a rule that always passes; a non-callable override is a no-op.
    ///
    /// A callable validate is invoked with the value as its single argument.
    /// Only `Missing` or `Null` means success. Non-empty text becomes the
    /// error message; every other result, including `""`, `false` and `0`,
    /// reports [`keys::INVALID`]. A raised error's text becomes the message. A callable override is invoked with the error
    /// message (or `Missing`), the key and the container; a non-missing
    /// return value replaces the property.
    pub fn from_values(name: Option<&str>, validate: Value, on_override: Option<Value>) -> Self {
        let mut builder = Self::builder();
        if let Some(name) = name {
            builder = builder.name(name);
        }

        if let Value::Function(callable) = validate {
            builder = builder.check(move |_, value, _| {
                match callable.call(&Value::Null, std::slice::from_ref(value)) {
                    Ok(Value::Missing) | Ok(Value::Null) => None,
                    Ok(Value::String(text)) => Some(RuleError::new(text, value)),
                    Ok(_) => Some(RuleError::keyed(keys::INVALID, value)),
                    Err(raised) => Some(RuleError::new(raised.to_string(), value)),
                }
            });
        }

        if let Some(Value::Function(callable)) = on_override {
            builder = builder.on_override(move |rule, error, key, container, _| {
                let error = error.map_or(Value::Missing, |e| Value::from(e.message().as_str()));
                let args = [error, Value::from(key), Value::Object(container.clone())];
                match callable.call(&Value::Null, &args) {
                    Ok(Value::Missing) => None,
                    Ok(value) => Some(Patch::new(key, value, rule)),
                    Err(raised) => {
                        tracing::debug!("override of {} raised: {}", rule, raised);
                        None
                    }
                }
            });
        }

        builder.build()
    }

    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    pub fn id(&self) -> RuleId {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Display label, `"Rule"` when unnamed.
    pub fn label(&self) -> &str {
        self.name().unwrap_or("Rule")
    }

    pub fn rule_ref(&self) -> RuleRef {
        RuleRef {
            id: self.inner.id.get(),
            name: self.label().to_string(),
        }
    }

    pub fn has_override(&self) -> bool {
        self.inner.override_fn.is_some()
    }

    /// Whether drivers must validate again after the override step.
    pub fn revalidates(&self) -> bool {
        self.inner.revalidates
    }

    /// The validate phase.
    pub fn validate(&self, value: &Value, ctx: &Context) -> Option<RuleError> {
        let error = (self.inner.validate)(self, value, ctx);
        compose(error, ErrorContext::new(value).raised_by(self.rule_ref()))
    }

    /// The override phase. Rules without an override return `None`.
    pub fn apply_override(
        &self,
        error: Option<&RuleError>,
        key: &str,
        container: &Object,
        ctx: &mut Context,
    ) -> Option<Patch> {
        let on_override = self.inner.override_fn.as_ref()?;
        on_override(self, error, key, container, ctx)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("has_override", &self.has_override())
            .field("revalidates", &self.inner.revalidates)
            .finish()
    }
}

/// Builder used by combinators that need the full validate/override
/// signatures.
#[derive(Default)]
pub struct RuleBuilder {
    name: Option<String>,
    validate: Option<Arc<ValidateFn>>,
    override_fn: Option<Arc<OverrideFn>>,
    revalidates: bool,
}

impl RuleBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn check<F>(mut self, validate: F) -> Self
    where
        F: Fn(&Rule, &Value, &Context) -> Option<RuleError> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }

    pub fn on_override<F>(mut self, on_override: F) -> Self
    where
        F: Fn(&Rule, Option<&RuleError>, &str, &Object, &mut Context) -> Option<Patch>
            + Send
            + Sync
            + 'static,
    {
        self.override_fn = Some(Arc::new(on_override));
        self
    }

    /// Request a second validate pass after the override step.
    pub fn revalidate(mut self) -> Self {
        self.revalidates = true;
        self
    }

    pub fn build(self) -> Rule {
        let validate = match self.validate {
            Some(validate) => validate,
            None => Arc::new(always_pass) as Arc<ValidateFn>,
        };
        Rule {
            inner: Arc::new(RuleInner {
                id: RuleId::next(),
                name: self.name,
                validate,
                override_fn: self.override_fn,
                revalidates: self.revalidates,
            }),
        }
    }
}

fn always_pass(_: &Rule, _: &Value, _: &Context) -> Option<RuleError> {
    None
}

/// Convenience for closures: an error with a literal message.
pub fn fail(message: impl Into<Message>, value: &Value) -> Option<RuleError> {
    Some(RuleError::new(message, value))
}
