//! Per-run validation state.
//!
//! Rules are immutable and shared; everything that changes during a run
//! lives here instead. The context tracks the path of the container being
//! walked and the rule each sibling-dependent rule resolved for that
//! container, keyed by container path and rule identity so resolutions made
//! for one container never leak into another.

use std::collections::HashMap;

use crate::checker::Checker;
use crate::rule::RuleId;

#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Path segments of the current container.
    path: Vec<String>,
    resolved: HashMap<(String, RuleId), Checker>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the current container, `""` at the root.
    pub fn current_path(&self) -> String {
        self.path.join(".")
    }

    /// Path of `key` inside the current container.
    pub fn child_path(&self, key: &str) -> String {
        let base = self.current_path();
        if base.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", base, key)
        }
    }

    pub fn push_path(&mut self, segment: impl Into<String>) {
        self.path.push(segment.into());
    }

    pub fn pop_path(&mut self) {
        self.path.pop();
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// The checker `rule` resolved for the current container, if any.
    pub fn resolved(&self, rule: RuleId) -> Option<&Checker> {
        self.resolved.get(&(self.current_path(), rule))
    }

    /// Record the checker `rule` resolved for the current container.
    pub fn resolve(&mut self, rule: RuleId, checker: Checker) {
        let key = (self.current_path(), rule);
        self.resolved.insert(key, checker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives;

    #[test]
    fn test_path_tracking() {
        let mut ctx = Context::new();
        assert_eq!(ctx.child_path("name"), "name");

        ctx.push_path("deploy");
        ctx.push_path("template");
        assert_eq!(ctx.current_path(), "deploy.template");
        assert_eq!(ctx.child_path("image"), "deploy.template.image");

        ctx.pop_path();
        assert_eq!(ctx.current_path(), "deploy");
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn test_resolutions_are_scoped_to_container() {
        let rule = primitives::any();
        let mut ctx = Context::new();

        ctx.push_path("first");
        ctx.resolve(rule.id(), Checker::Rule(primitives::null()));
        assert!(ctx.resolved(rule.id()).is_some());

        ctx.pop_path();
        ctx.push_path("second");
        assert!(ctx.resolved(rule.id()).is_none());

        ctx.pop_path();
        ctx.push_path("first");
        assert!(ctx.resolved(rule.id()).is_some());
    }
}
