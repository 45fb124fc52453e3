//! Pattern executors: one module per chaining pattern, sharing the
//! `execute(definition, context) -> ChainResult` contract.
//!
//! Executors never raise for business-level failures — a denied outcome is a
//! valid result. Only configuration or evaluation faults set
//! `ChainResult::error_message` (with `triggered = false`).

mod accumulative;
mod conditional;
mod fluent;
mod routing;
mod sequential;
mod workflow;

use std::time::Instant;

use tracing::debug;

use crate::context::ExecutionContext;
use crate::evaluator::Evaluator;
use crate::model::{ChainDefinition, ChainPattern, Registry, Rule};
use crate::result::ChainResult;

/// Execute a chain definition against the context.
///
/// Dispatches on the closed pattern enum; the match is exhaustive so a new
/// pattern cannot be added without an executor.
pub fn execute_chain(
    chain: &ChainDefinition,
    registry: &Registry,
    evaluator: &dyn Evaluator,
    ctx: &mut ExecutionContext,
) -> ChainResult {
    debug!(chain_id = %chain.id, pattern = chain.pattern.name(), "executing chain");
    let started = Instant::now();

    let mut result = match &chain.pattern {
        ChainPattern::ConditionalChaining(cfg) => {
            conditional::execute(&chain.id, cfg, registry, evaluator, ctx)
        }
        ChainPattern::SequentialDependency(cfg) => {
            sequential::execute(&chain.id, cfg, evaluator, ctx)
        }
        ChainPattern::ResultBasedRouting(cfg) => routing::execute(&chain.id, cfg, evaluator, ctx),
        ChainPattern::AccumulativeChaining(cfg) => {
            accumulative::execute(&chain.id, cfg, evaluator, ctx)
        }
        ChainPattern::ComplexWorkflow(cfg) => workflow::execute(&chain.id, cfg, evaluator, ctx),
        ChainPattern::FluentBuilder(cfg) => fluent::execute(&chain.id, cfg, evaluator, ctx),
    };

    result.execution_time_ms = started.elapsed().as_millis() as u64;
    result
}

/// Evaluate one rule to a boolean, recording the result.
///
/// An evaluation error degrades the rule to `false` and stores the error
/// text in the stage results, per the non-fatal evaluation policy.
fn run_rule(
    rule: &Rule,
    evaluator: &dyn Evaluator,
    ctx: &ExecutionContext,
    result: &mut ChainResult,
) -> bool {
    match evaluator.evaluate(&rule.condition, ctx) {
        Ok(value) => {
            let passed = value.truthy();
            result.record_rule(&rule.id, passed);
            result.set_stage(rule.id.clone(), passed);
            passed
        }
        Err(e) => {
            result.record_rule(&rule.id, false);
            result.set_stage(format!("{}_error", rule.id), e.to_string());
            false
        }
    }
}
