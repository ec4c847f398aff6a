//! Reference driver for the two-phase protocol.
//!
//! For every property of a [`Schema`], in declaration order:
//!
//! - a type is checked with `catch`;
//! - a nested object schema whose property holds an object is walked in
//!   place, so overrides inside it heal the nested object;
//! - a rule runs `validate`, then its override step, then `validate` again
//!   if it [revalidates](crate::Rule::revalidates). The last validate result
//!   is reported.
//!
//! Patches returned by overrides are applied to the container exactly once,
//! immediately after the override step that produced them.

use tracing::{debug, trace, warn};
use verdict_core::{keys, Object, RuleError, RuleErrors, Value};

use crate::checker::Checker;
use crate::config::DriverConfig;
use crate::context::Context;
use crate::rule::Patch;
use crate::schema::Schema;

/// A patch together with the path it was applied at.
#[derive(Debug, Clone)]
pub struct AppliedPatch {
    pub path: String,
    pub patch: Patch,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub errors: RuleErrors,
    pub patches: Vec<AppliedPatch>,
}

impl Report {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn first_error(&self) -> Option<&RuleError> {
        self.errors.first()
    }

    pub fn into_result(self) -> Result<(), RuleErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

#[derive(Debug, Clone, Default)]
pub struct Driver {
    config: DriverConfig,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    pub fn fail_fast() -> Self {
        Self::new(DriverConfig::fail_fast())
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Run `schema` over `container` with a fresh context.
    pub fn run(&self, schema: &Schema, container: &mut Object) -> Report {
        let mut ctx = Context::new();
        self.run_with(schema, container, &mut ctx)
    }

    /// Run with a caller-supplied context, e.g. to keep resolutions made by
    /// a previous pass over the same container.
    pub fn run_with(&self, schema: &Schema, container: &mut Object, ctx: &mut Context) -> Report {
        let mut report = Report::default();
        self.walk(schema, container, ctx, &mut report);
        debug!(
            "validation run finished: {} errors, {} patches",
            report.errors.len(),
            report.patches.len()
        );
        report
    }

    fn walk(
        &self,
        schema: &Schema,
        container: &mut Object,
        ctx: &mut Context,
        report: &mut Report,
    ) -> Flow {
        for (key, checker) in schema.entries() {
            if let Some(nested) = checker.as_schema() {
                if let Some(Value::Object(child)) = container.get_mut(key) {
                    let flow = if ctx.depth() >= self.config.max_depth {
                        warn!("schema nesting exceeds {} at {}", self.config.max_depth, ctx.child_path(key));
                        let error = RuleError::keyed(keys::SCHEMA_DEPTH, &Value::Object(child.clone()))
                            .with_rule(checker.describe())
                            .at(ctx.child_path(key));
                        self.record(error, report)
                    } else {
                        ctx.push_path(key.as_str());
                        let flow = self.walk(nested, child, ctx, report);
                        ctx.pop_path();
                        flow
                    };
                    if flow == Flow::Stop {
                        return Flow::Stop;
                    }
                    continue;
                }
            }

            if let Some(error) = self.check_property(key, checker, container, ctx, report) {
                // Paths reported by types (`[1]`, `number`) are relative to the property.
                let errors = RuleErrors::from(error).with_path_prefix(&ctx.child_path(key));
                for error in errors {
                    if self.record(error, report) == Flow::Stop {
                        return Flow::Stop;
                    }
                }
            }
        }
        Flow::Continue
    }

    fn record(&self, error: RuleError, report: &mut Report) -> Flow {
        trace!("{}", error);
        report.errors.push(error);
        if self.config.stops_at_first_error() {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    fn check_property(
        &self,
        key: &str,
        checker: &Checker,
        container: &mut Object,
        ctx: &mut Context,
        report: &mut Report,
    ) -> Option<RuleError> {
        let rule = match checker {
            Checker::Type(ty) => {
                trace!("checking {} against {}", ctx.child_path(key), ty.name());
                return ty.catch(container.get(key));
            }
            Checker::Rule(rule) => rule,
        };

        trace!("checking {} against {}", ctx.child_path(key), rule);
        let first = rule.validate(container.get(key), ctx);
        if let Some(patch) = rule.apply_override(first.as_ref(), key, container, ctx) {
            self.apply(patch, container, ctx, report);
        }

        if rule.revalidates() {
            rule.validate(container.get(key), ctx)
        } else {
            first
        }
    }

    fn apply(&self, patch: Patch, container: &mut Object, ctx: &Context, report: &mut Report) {
        let path = ctx.child_path(&patch.key);
        debug!("{} patched {}", patch.origin, path);
        container.insert(patch.key.clone(), patch.value.clone());
        if self.config.record_patches {
            report.patches.push(AppliedPatch { path, patch });
        }
    }
}
