//! Sequential dependency: ordered stages, each publishing its result to all
//! later stages through the context.

use tracing::{debug, warn};

use crate::context::ExecutionContext;
use crate::evaluator::Evaluator;
use crate::model::{FailureAction, SequentialConfig};
use crate::result::ChainResult;
use crate::value::Value;

const PATTERN: &str = "sequential-dependency";

/// Run stages in order. Each stage's rule result is stored under the stage's
/// `output-variable`, visible to every later stage.
///
/// A failed stage is recorded and execution continues, unless the stage is
/// marked `failure-action: terminate`, which aborts the remaining stages and
/// marks the chain `triggered = false`.
pub(super) fn execute(
    chain_id: &str,
    cfg: &SequentialConfig,
    evaluator: &dyn Evaluator,
    ctx: &mut ExecutionContext,
) -> ChainResult {
    let mut result = ChainResult::new(chain_id, PATTERN);
    let mut terminated = false;

    for stage in &cfg.stages {
        let label = stage.label();

        let (value, failed) = match evaluator.evaluate(&stage.rule.condition, ctx) {
            Ok(value) => {
                let failed = !value.truthy();
                (value, failed)
            }
            Err(e) => {
                warn!(chain_id, stage = label, error = %e, "stage evaluation failed");
                result.set_stage(format!("{}_error", label), e.to_string());
                (Value::Null, true)
            }
        };

        result.record_rule(label, !failed);
        ctx.set(stage.output_variable.clone(), value.clone());
        result.set_stage(stage.output_variable.clone(), value);
        debug!(chain_id, stage = label, output = %stage.output_variable, failed, "stage complete");

        if failed && stage.failure_action == FailureAction::Terminate {
            warn!(chain_id, stage = label, "stage terminated the chain");
            terminated = true;
            break;
        }
    }

    result.triggered = !terminated;
    result.final_outcome = if terminated { "TERMINATED" } else { "COMPLETED" }.to_string();
    result
}
