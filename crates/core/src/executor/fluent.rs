//! Fluent builder: walk a binary decision tree until a leaf is reached.

use tracing::debug;

use crate::context::ExecutionContext;
use crate::evaluator::Evaluator;
use crate::model::{DecisionNode, FluentConfig};
use crate::result::ChainResult;

use super::run_rule;

const PATTERN: &str = "fluent-builder";

/// Walk the tree from the root: each node's rule picks `on-success` or
/// `on-failure`. A missing child on the taken branch ends the walk and the
/// node's message becomes the outcome.
///
/// An evaluation error takes the failure branch, so a tree can route faults
/// to a manual-review leaf.
pub(super) fn execute(
    chain_id: &str,
    cfg: &FluentConfig,
    evaluator: &dyn Evaluator,
    ctx: &ExecutionContext,
) -> ChainResult {
    let mut result = ChainResult::new(chain_id, PATTERN);

    let mut node: &DecisionNode = &cfg.root;
    loop {
        let passed = run_rule(&node.rule, evaluator, ctx, &mut result);
        debug!(chain_id, rule_id = %node.rule.id, passed, "decision node evaluated");

        let next = if passed {
            node.on_success.as_deref()
        } else {
            node.on_failure.as_deref()
        };
        match next {
            Some(child) => node = child,
            None => {
                result.triggered = passed;
                result.final_outcome = if node.rule.message.is_empty() {
                    if passed { "PASSED" } else { "FAILED" }.to_string()
                } else {
                    node.rule.message.clone()
                };
                return result;
            }
        }
    }
}
