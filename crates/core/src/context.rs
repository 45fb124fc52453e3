//! Execution context: ordered variable bindings with fork/merge overlays.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::value::Value;

/// Ordered mapping from variable name to typed value, created fresh per
/// evaluation request.
///
/// `fork` produces a child overlay that sees every parent variable but whose
/// writes stay invisible to the parent until `merge` copies them back. This
/// is how sequential and workflow stages keep stage-local variables from
/// polluting sibling stages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionContext {
    vars: IndexMap<String, Value>,
    /// Names written through this context (as opposed to inherited from a
    /// parent at fork time). Only these keys travel back on merge.
    #[serde(skip)]
    written: IndexSet<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from initial request data.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut ctx = Self::new();
        for (k, v) in vars {
            ctx.set(k, v);
        }
        ctx
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        self.written.insert(name.clone());
        self.vars.insert(name, value.into());
    }

    /// Child overlay: inherits all current bindings, tracks its own writes.
    pub fn fork(&self) -> ExecutionContext {
        ExecutionContext {
            vars: self.vars.clone(),
            written: IndexSet::new(),
        }
    }

    /// Copy a child's writes back into this context. Inherited bindings the
    /// child never touched are left alone.
    pub fn merge(&mut self, child: ExecutionContext) {
        for name in child.written {
            if let Some(value) = child.vars.get(&name) {
                self.set(name, value.clone());
            }
        }
    }

    /// All bindings in insertion order.
    pub fn vars(&self) -> &IndexMap<String, Value> {
        &self.vars
    }
}
