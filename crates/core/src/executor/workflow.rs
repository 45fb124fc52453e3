//! Complex workflow: a DAG of named stages executed in dependency order.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::context::ExecutionContext;
use crate::evaluator::Evaluator;
use crate::model::{FailureAction, Rule, WorkflowConfig, WorkflowStage};
use crate::result::ChainResult;

use super::run_rule;

const PATTERN: &str = "complex-workflow";

#[derive(Debug, Clone, Copy, PartialEq)]
enum StageStatus {
    Completed { passed: bool },
    Terminated,
    Skipped,
}

impl StageStatus {
    fn label(self) -> &'static str {
        match self {
            StageStatus::Completed { .. } => "COMPLETED",
            StageStatus::Terminated => "TERMINATED",
            StageStatus::Skipped => "SKIPPED",
        }
    }
}

/// Execute the stages in topological order. Stages with equal readiness run
/// in declaration order.
///
/// A terminated stage blocks only its dependents (directly or transitively);
/// independent stages still run. Dependents of a skipped stage are skipped
/// too. Each stage publishes its pass/fail as `{name}Result` in the context.
pub(super) fn execute(
    chain_id: &str,
    cfg: &WorkflowConfig,
    evaluator: &dyn Evaluator,
    ctx: &mut ExecutionContext,
) -> ChainResult {
    let mut result = ChainResult::new(chain_id, PATTERN);

    if let Some(stage) = duplicate_stage_name(&cfg.stages) {
        return ChainResult::failure(
            chain_id,
            PATTERN,
            format!("duplicate workflow stage '{}'", stage),
        );
    }

    let order = match schedule(&cfg.stages) {
        Ok(order) => order,
        Err(message) => return ChainResult::failure(chain_id, PATTERN, message),
    };

    let mut statuses: HashMap<&str, StageStatus> = HashMap::new();
    let mut terminated_any = false;

    for idx in order {
        let stage = &cfg.stages[idx];

        let blocked = stage.depends_on.iter().any(|dep| {
            !matches!(
                statuses.get(dep.as_str()),
                Some(StageStatus::Completed { .. })
            )
        });
        if blocked {
            debug!(chain_id, stage = %stage.name, "stage skipped, dependency did not complete");
            statuses.insert(stage.name.as_str(), StageStatus::Skipped);
            result.set_stage(format!("{}_status", stage.name), "SKIPPED");
            continue;
        }

        // Stage writes are isolated until the stage completes.
        let mut fork = ctx.fork();
        let passed = run_stage(chain_id, stage, evaluator, &fork, &mut result);
        fork.set(format!("{}Result", stage.name), passed);

        let status = if !passed && stage.failure_action == FailureAction::Terminate {
            terminated_any = true;
            warn!(chain_id, stage = %stage.name, "stage terminated its dependents");
            StageStatus::Terminated
        } else {
            StageStatus::Completed { passed }
        };
        statuses.insert(stage.name.as_str(), status);
        ctx.merge(fork);
        result.set_stage(format!("{}_status", stage.name), status.label());
        result.set_stage(format!("{}Result", stage.name), passed);
    }

    result.triggered = !terminated_any;
    result.final_outcome = if terminated_any { "TERMINATED" } else { "COMPLETED" }.to_string();
    result
}

/// Run one stage's rules as a conjunction. With `conditional-execution`, the
/// condition selects the `on-true` or `on-false` list instead.
fn run_stage(
    chain_id: &str,
    stage: &WorkflowStage,
    evaluator: &dyn Evaluator,
    ctx: &ExecutionContext,
    result: &mut ChainResult,
) -> bool {
    let rules: &[Rule] = match &stage.conditional_execution {
        Some(cond) => {
            let branch = match evaluator.evaluate(&cond.condition, ctx) {
                Ok(value) => value.truthy(),
                Err(e) => {
                    warn!(chain_id, stage = %stage.name, error = %e, "stage condition failed, taking false branch");
                    result.set_stage(format!("{}_condition_error", stage.name), e.to_string());
                    false
                }
            };
            result.set_stage(format!("{}_condition", stage.name), branch);
            if branch {
                &cond.on_true
            } else {
                &cond.on_false
            }
        }
        None => &stage.rules,
    };

    let mut conjunction = true;
    for rule in rules {
        conjunction &= run_rule(rule, evaluator, ctx, result);
    }
    conjunction
}

fn duplicate_stage_name(stages: &[WorkflowStage]) -> Option<&str> {
    let mut seen = HashMap::new();
    for stage in stages {
        if seen.insert(stage.name.as_str(), ()).is_some() {
            return Some(&stage.name);
        }
    }
    None
}

/// Topological order over stage indices: repeatedly take the first declared
/// stage whose dependencies are all scheduled.
fn schedule(stages: &[WorkflowStage]) -> Result<Vec<usize>, String> {
    let names: HashMap<&str, usize> = stages
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.as_str(), i))
        .collect();
    for stage in stages {
        for dep in &stage.depends_on {
            if !names.contains_key(dep.as_str()) {
                return Err(format!(
                    "stage '{}' depends on unknown stage '{}'",
                    stage.name, dep
                ));
            }
        }
    }

    let mut order = Vec::with_capacity(stages.len());
    let mut scheduled = vec![false; stages.len()];
    while order.len() < stages.len() {
        let next = stages.iter().enumerate().position(|(i, stage)| {
            !scheduled[i]
                && stage
                    .depends_on
                    .iter()
                    .all(|dep| scheduled[names[dep.as_str()]])
        });
        match next {
            Some(i) => {
                scheduled[i] = true;
                order.push(i);
            }
            None => {
                let mut stuck: Vec<&str> = stages
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !scheduled[*i])
                    .map(|(_, s)| s.name.as_str())
                    .collect();
                stuck.sort_unstable();
                return Err(format!(
                    "circular dependency among workflow stages: {}",
                    stuck.join(", ")
                ));
            }
        }
    }
    Ok(order)
}
