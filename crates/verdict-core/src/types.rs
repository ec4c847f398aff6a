//! The structural matcher contract.
//!
//! A [`Type`] checks a value as a whole. Rules delegate to types when they
//! wrap a lifted rule-like value, and the function-contract wrapper uses
//! [`Type::assert`] at call time.

use std::any::Any;
use std::fmt;

use crate::error::RuleError;
use crate::value::Value;

pub trait Type: fmt::Debug + Send + Sync {
    /// Short description used in diagnostics.
    fn name(&self) -> String;

    /// Check `value`, returning the error on mismatch. Never panics.
    fn catch(&self, value: &Value) -> Option<RuleError>;

    fn test(&self, value: &Value) -> bool {
        self.catch(value).is_none()
    }

    /// Like [`Type::catch`], but as a `Result` for `?` propagation.
    fn assert(&self, value: &Value) -> Result<(), RuleError> {
        match self.catch(value) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Downcast hook for drivers that treat some types specially.
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
}
