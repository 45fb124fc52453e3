//! Configuration-driven rule chain execution engine.
//!
//! This crate provides:
//! - Atomic rules, AND/OR rule groups, and six chaining patterns as a
//!   closed, serde-deserializable model
//! - A pluggable expression evaluator seam ([`evaluator::Evaluator`])
//! - Pattern executors sharing a non-fatal evaluation policy: a failed
//!   expression degrades the rule, never aborts the chain
//! - A priority-ordered orchestrator with deadline handling and a
//!   queryable in-memory audit log

pub mod audit_log;
pub mod context;
pub mod evaluator;
pub mod executor;
pub mod group;
pub mod model;
pub mod orchestrator;
pub mod result;
pub mod value;

pub use context::ExecutionContext;
pub use evaluator::{EvalError, Evaluator, FnEvaluator};
pub use executor::execute_chain;
pub use group::evaluate_group;
pub use model::Registry;
pub use orchestrator::Orchestrator;
pub use result::{ChainResult, OrchestrationResult, RuleGroupResult};
pub use value::Value;
