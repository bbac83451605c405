//! URL path → logical module name.
//!
//! Route order is significant: prefixes overlap (`/admin` vs. `/`), and the
//! first matching entry wins.

mod mount;

pub use mount::{MountTracker, MountedSet, NO_ROUTE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMapping {
    pub pattern: String,
    pub module_name: String,
    /// Whole-path equality instead of prefix match.
    pub exact: bool,
}

impl RouteMapping {
    pub fn new(pattern: &str, module_name: &str, exact: bool) -> Self {
        Self {
            pattern: pattern.to_string(),
            module_name: module_name.to_string(),
            exact,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        if self.exact {
            path == self.pattern
        } else {
            path.starts_with(&self.pattern)
        }
    }
}

/// Ordered route table.
#[derive(Debug, Clone, Default)]
pub struct RouteResolver {
    mappings: Vec<RouteMapping>,
}

impl RouteResolver {
    pub fn new(mappings: Vec<RouteMapping>) -> Self {
        Self { mappings }
    }

    /// Module for `path`, or `None` when no entry matches.
    pub fn resolve(&self, path: &str) -> Option<&str> {
        self.mappings
            .iter()
            .find(|m| m.matches(path))
            .map(|m| m.module_name.as_str())
    }

    pub fn mappings(&self) -> &[RouteMapping] {
        &self.mappings
    }
}
