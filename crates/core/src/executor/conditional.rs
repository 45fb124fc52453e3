//! Conditional chaining: a trigger rule selects which branch executes.

use tracing::debug;

use crate::context::ExecutionContext;
use crate::evaluator::Evaluator;
use crate::group::evaluate_group;
use crate::model::{BranchItem, ConditionalConfig, Registry};
use crate::result::ChainResult;

use super::run_rule;

const PATTERN: &str = "conditional-chaining";

/// Evaluate the trigger rule, then execute `on-trigger` or `on-no-trigger`.
///
/// The chain outcome is the conjunction of the executed branch: inline rules
/// carry no implicit short-circuit, group references keep their own group
/// semantics.
pub(super) fn execute(
    chain_id: &str,
    cfg: &ConditionalConfig,
    registry: &Registry,
    evaluator: &dyn Evaluator,
    ctx: &ExecutionContext,
) -> ChainResult {
    let mut result = ChainResult::new(chain_id, PATTERN);

    let trigger_fired = match evaluator.evaluate(&cfg.trigger_rule.condition, ctx) {
        Ok(value) => value.truthy(),
        Err(e) => {
            return ChainResult::failure(
                chain_id,
                PATTERN,
                format!("trigger rule '{}' failed: {}", cfg.trigger_rule.id, e),
            );
        }
    };
    result.record_rule(&cfg.trigger_rule.id, trigger_fired);
    result.set_stage("trigger_fired", trigger_fired);
    debug!(chain_id, trigger = %cfg.trigger_rule.id, trigger_fired, "trigger evaluated");

    let branch = if trigger_fired {
        &cfg.on_trigger
    } else {
        &cfg.on_no_trigger
    };

    let mut conjunction = true;
    for item in branch {
        let passed = match item {
            BranchItem::Rule(rule) => run_rule(rule, evaluator, ctx, &mut result),
            BranchItem::Group { group } => match registry.group(group) {
                Some(g) => {
                    let group_result = evaluate_group(g, registry, evaluator, ctx);
                    result.execution_path.push(g.id.clone());
                    result.rules_evaluated += group_result.rules_evaluated;
                    result.set_stage(format!("group_{}", g.id), group_result.passed);
                    group_result.passed
                }
                None => {
                    return ChainResult::failure(
                        chain_id,
                        PATTERN,
                        format!("branch references unknown rule group '{}'", group),
                    );
                }
            },
        };
        conjunction &= passed;
    }

    result.triggered = conjunction;
    result.final_outcome = if conjunction { "PASSED" } else { "FAILED" }.to_string();
    result
}
