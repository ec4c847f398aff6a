//! Core value model and diagnostics for verdict
//!
//! - **Value**: dynamic values, objects, callables and class instances
//! - **Errors**: [`RuleError`] diagnostics and the [`compose`] contract
//! - **Type**: the structural matcher trait rules delegate to

pub mod error;
pub mod types;
pub mod value;

pub use error::{
    compose, keys, CallError, CoreError, ErrorContext, Message, RuleError, RuleErrors, RuleRef,
};
pub use types::Type;
pub use value::{Callable, Class, Instance, Kind, NativeFn, Object, Value};
