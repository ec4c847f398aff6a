//! Verdict Runtime Library
//!
//! Composable validation rules with a two-phase validate/override protocol:
//!
//! - **Rule**: a validate step plus an optional override step ([`Rule`])
//! - **Primitives**: [`primitives::null`], [`primitives::missing`],
//!   [`primitives::any`], [`primitives::numeric`]
//! - **Combinators**: custom messages, existence checks, default
//!   substitution, sibling-dependent resolution, strict equality and
//!   instance checks ([`combinators`])
//! - **Contracts**: argument and return checks for callable properties
//!   ([`lambda`])
//! - **Driver**: runs a [`Schema`] over an object and applies patches
//!
//! # Example
//!
//! ```rust
//! use verdict_runtime::{combinators::if_not_match, Driver, Schema};
//! use verdict_core::{Kind, Object, Value};
//!
//! let schema = Schema::named("Server")
//!     .field("host", Kind::String)
//!     .field("port", if_not_match(Kind::Number, 8080));
//!
//! let mut server = Object::new().with("host", "localhost").with("port", "http");
//! let report = Driver::default().run(&schema, &mut server);
//!
//! assert_eq!(report.errors.len(), 1);
//! assert_eq!(server.get("port"), &Value::from(8080));
//! ```

mod checker;
pub mod combinators;
mod config;
mod context;
mod driver;
mod lambda;
pub mod primitives;
mod rule;
mod schema;
mod shape;

pub use checker::{Checker, RuleLike, RuleType};
pub use combinators::{Condition, MessageSource};
pub use config::{ConfigError, DriverConfig, FailurePolicy};
pub use context::Context;
pub use driver::{AppliedPatch, Driver, Report};
pub use lambda::lambda;
pub use rule::{fail, OverrideFn, Patch, Rule, RuleBuilder, RuleId, ValidateFn};
pub use schema::Schema;
pub use shape::Shape;
