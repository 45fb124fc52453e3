//! Evaluator port: the pluggable expression engine the core consumes.

use thiserror::Error;

use crate::context::ExecutionContext;
use crate::value::Value;

/// Error produced when an expression cannot be evaluated: an undefined
/// variable, a type mismatch, or a syntax problem inside the plugged-in
/// engine. Non-fatal per rule — the engine degrades the rule to
/// `false`/`0` and records the failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to evaluate '{expression}': {message}")]
pub struct EvalError {
    pub expression: String,
    pub message: String,
}

impl EvalError {
    pub fn new(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            message: message.into(),
        }
    }

    pub fn undefined_variable(expression: impl Into<String>, variable: &str) -> Self {
        Self::new(expression, format!("undefined variable '{}'", variable))
    }
}

/// Capability contract for the external expression engine.
///
/// The core treats expressions as opaque strings: it hands them to the
/// evaluator together with the current context and consumes the typed
/// result. `Send + Sync` because parallel rule groups evaluate members
/// concurrently against a shared evaluator.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, expression: &str, ctx: &ExecutionContext) -> Result<Value, EvalError>;
}

/// Adapter turning a closure into an [`Evaluator`].
///
/// Embedders (and this crate's tests) script expression behavior without
/// pulling in a full expression language.
pub struct FnEvaluator<F>(F);

impl<F> FnEvaluator<F>
where
    F: Fn(&str, &ExecutionContext) -> Result<Value, EvalError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Evaluator for FnEvaluator<F>
where
    F: Fn(&str, &ExecutionContext) -> Result<Value, EvalError> + Send + Sync,
{
    fn evaluate(&self, expression: &str, ctx: &ExecutionContext) -> Result<Value, EvalError> {
        (self.0)(expression, ctx)
    }
}
