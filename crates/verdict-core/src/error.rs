//! Diagnostic errors produced by rules.
//!
//! Validation never fails with `Err`: a rule returns `Option<RuleError>`,
//! where `None` means the value passed. A [`RuleError`] carries a message
//! (literal text or a key resolved by the renderer) and the context needed
//! to render a trace: the target value, the rule-like value that was checked,
//! and the rule that raised the error.

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

use crate::value::{Value, MISSING};

/// Stable message keys for the built-in rules.
pub mod keys {
    pub const NULL: &str = "rule.null";
    pub const UNDEFINED: &str = "rule.undefined";
    pub const NUMERIC: &str = "rule.numeric";
    pub const INSTANCE_OF: &str = "rule.instanceof";
    pub const EQUAL: &str = "rule.equal";
    pub const LAMBDA_FUNCTION: &str = "rule.lambda.function";
    pub const DETERMINE_UNRESOLVED: &str = "rule.determine.unresolved";
    /// A dynamically supplied validate function reported a failure without text.
    pub const INVALID: &str = "rule.invalid";

    pub const TYPE_KIND: &str = "type.kind";
    pub const TYPE_CLASS: &str = "type.class";
    pub const TYPE_LITERAL: &str = "type.literal";
    pub const TYPE_TUPLE_LENGTH: &str = "type.tuple.length";
    pub const TYPE_ONE_OF: &str = "type.one_of";
    pub const SCHEMA_DEPTH: &str = "schema.depth";
}

/// An error message: either literal text or a key for later rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Key(Cow<'static, str>),
    Text(String),
}

impl Message {
    pub fn key(key: &'static str) -> Self {
        Message::Key(Cow::Borrowed(key))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Message::Text(text.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Message::Key(key) => key,
            Message::Text(text) => text,
        }
    }

    pub fn is_key(&self) -> bool {
        matches!(self, Message::Key(_))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&'static str> for Message {
    fn from(text: &'static str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

/// Identifies a rule instance in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleRef {
    pub id: u64,
    pub name: String,
}

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Context attached to an error by [`compose`].
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The value that failed.
    pub target: Option<Value>,
    /// Description of the rule-like value that was checked.
    pub rule: Option<String>,
    /// The rule that raised (or re-raised) the error.
    pub raised_by: Option<RuleRef>,
}

impl ErrorContext {
    pub fn new(target: &Value) -> Self {
        Self {
            target: Some(target.clone()),
            ..Default::default()
        }
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn raised_by(mut self, rule: RuleRef) -> Self {
        self.raised_by = Some(rule);
        self
    }
}

/// A validation failure.
#[derive(Debug, Clone)]
pub struct RuleError {
    /// Path of the property that failed, filled in by the driver.
    pub path: String,
    message: Message,
    context: ErrorContext,
    /// Enclosing rules the error passed through, innermost first.
    trace: Vec<RuleRef>,
}

impl RuleError {
    /// An error with `message`. An empty message is reported as
    /// [`keys::INVALID`].
    pub fn new(message: impl Into<Message>, target: &Value) -> Self {
        let message = match message.into() {
            message if message.as_str().is_empty() => Message::key(keys::INVALID),
            message => message,
        };
        Self {
            path: String::new(),
            message,
            context: ErrorContext::new(target),
            trace: Vec::new(),
        }
    }

    /// Error keyed by one of the stable [`keys`].
    pub fn keyed(key: &'static str, target: &Value) -> Self {
        Self::new(Message::key(key), target)
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.context.rule = Some(rule.into());
        self
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The message key, if the message is keyed.
    pub fn key(&self) -> Option<&str> {
        self.message.is_key().then(|| self.message.as_str())
    }

    pub fn target(&self) -> &Value {
        self.context.target.as_ref().unwrap_or(&MISSING)
    }

    pub fn rule(&self) -> Option<&str> {
        self.context.rule.as_deref()
    }

    pub fn raised_by(&self) -> Option<&RuleRef> {
        self.context.raised_by.as_ref()
    }

    pub fn trace(&self) -> &[RuleRef] {
        &self.trace
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    /// Merge `context` into this error.
    ///
    /// Facts already present win, since they were recorded closest to the
    /// failure. An enclosing rule that differs from the raising rule is
    /// appended to the trace once.
    fn contextualize(mut self, context: ErrorContext) -> Self {
        if self.context.target.is_none() {
            self.context.target = context.target;
        }
        if self.context.rule.is_none() {
            self.context.rule = context.rule;
        }
        let Some(outer) = context.raised_by else {
            return self;
        };
        let inner_id = self.context.raised_by.as_ref().map(|r| r.id);
        match inner_id {
            None => self.context.raised_by = Some(outer),
            Some(id) if id != outer.id && !self.trace.iter().any(|r| r.id == outer.id) => {
                self.trace.push(outer);
            }
            Some(_) => {}
        }
        self
    }

    /// Render as JSON for reporting.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "path": self.path,
            "message": self.message.as_str(),
            "keyed": self.message.is_key(),
            "target": self.target().to_string(),
            "rule": self.context.rule,
            "type": self.context.raised_by.as_ref().map(|r| r.name.clone()),
            "trace": self.trace.iter().map(|r| r.name.clone()).collect::<Vec<_>>(),
        })
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.path.is_empty() {
            write!(f, "{}: ", self.path)?;
        }
        write!(f, "{} (got {})", self.message, self.target())?;
        if let Some(raised_by) = &self.context.raised_by {
            write!(f, " [{}]", raised_by)?;
        }
        Ok(())
    }
}

impl std::error::Error for RuleError {}

/// Re-contextualize an error-or-absence.
///
/// Absence stays absent. An error keeps its message and gains `context`;
/// composing the same context again, or composing through several
/// delegation layers, never nests one error inside another.
pub fn compose(error: Option<RuleError>, context: ErrorContext) -> Option<RuleError> {
    error.map(|e| e.contextualize(context))
}

/// A collection of rule errors, as reported by a validation run.
#[derive(Debug, Clone, Default)]
pub struct RuleErrors {
    pub errors: Vec<RuleError>,
}

impl RuleErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: RuleError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn first(&self) -> Option<&RuleError> {
        self.errors.first()
    }

    /// Prefix all error paths with a given path segment.
    pub fn with_path_prefix(mut self, prefix: &str) -> Self {
        for error in &mut self.errors {
            if error.path.is_empty() {
                error.path = prefix.to_string();
            } else if error.path.starts_with('[') {
                error.path = format!("{}{}", prefix, error.path);
            } else {
                error.path = format!("{}.{}", prefix, error.path);
            }
        }
        self
    }
}

impl fmt::Display for RuleErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => write!(f, "No validation errors"),
            [only] => write!(f, "Validation error: {}", only),
            errors => {
                writeln!(f, "{} validation errors:", errors.len())?;
                for (i, error) in errors.iter().enumerate() {
                    writeln!(f, "  {}. {}", i + 1, error)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for RuleErrors {}

impl From<RuleError> for RuleErrors {
    fn from(error: RuleError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl IntoIterator for RuleErrors {
    type Item = RuleError;
    type IntoIter = std::vec::IntoIter<RuleError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a RuleErrors {
    type Item = &'a RuleError;
    type IntoIter = std::slice::Iter<'a, RuleError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Failure while invoking a callable value.
#[derive(Error, Debug, Clone)]
pub enum CallError {
    #[error("value is not callable: {0}")]
    NotCallable(String),

    #[error("arguments violate contract: {0}")]
    Arguments(RuleError),

    #[error("return value violates contract: {0}")]
    Return(RuleError),

    #[error("{0}")]
    Raised(String),
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("value cannot be represented as JSON: {0}")]
    NotRepresentable(String),
}
