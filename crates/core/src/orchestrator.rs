//! Chain orchestrator: selects chains, runs them in priority order, and
//! collects an auditable result.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::audit_log::{AuditLog, ExecutionPhase, LogLevel};
use crate::context::ExecutionContext;
use crate::evaluator::Evaluator;
use crate::executor::execute_chain;
use crate::model::{ChainDefinition, Registry};
use crate::result::{ChainResult, OrchestrationResult};

/// Runs a set of chain definitions against one execution context.
///
/// Chains execute lowest-priority-number first; equal priorities keep their
/// registration order. A failed critical chain halts the remaining chains in
/// the run. The optional deadline is checked between chains, never inside
/// one, so a chain that has started always finishes.
pub struct Orchestrator {
    registry: Arc<Registry>,
    evaluator: Arc<dyn Evaluator>,
    audit: AuditLog,
}

impl Orchestrator {
    pub fn new(registry: Arc<Registry>, evaluator: Arc<dyn Evaluator>) -> Self {
        Self {
            registry,
            evaluator,
            audit: AuditLog::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Structured log of everything this orchestrator has executed.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Run every registered chain in priority order.
    pub fn run_all(
        &self,
        ctx: &mut ExecutionContext,
        deadline: Option<Duration>,
    ) -> OrchestrationResult {
        let ids: Vec<String> = self
            .registry
            .chains_by_priority()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        self.run(&ids, ctx, deadline)
    }

    /// Run the named chains in priority order against the shared context.
    ///
    /// An unknown chain id contributes a failure result and the run
    /// continues with the remaining chains.
    pub fn run(
        &self,
        chain_ids: &[String],
        ctx: &mut ExecutionContext,
        deadline: Option<Duration>,
    ) -> OrchestrationResult {
        let started = Instant::now();
        let mut chain_results = Vec::new();
        let mut audit_trail = Vec::new();

        let mut selected: Vec<&ChainDefinition> = Vec::new();
        for id in chain_ids {
            match self.registry.chain(id) {
                Some(chain) => selected.push(chain),
                None => {
                    warn!(chain_id = %id, "unknown chain requested");
                    self.audit.log(
                        id,
                        LogLevel::Error,
                        ExecutionPhase::Selection,
                        "unknown chain id",
                    );
                    audit_trail.push(format!("{}: UNKNOWN CHAIN", id));
                    chain_results.push(ChainResult::failure(
                        id.clone(),
                        "unknown",
                        format!("unknown chain '{}'", id),
                    ));
                }
            }
        }
        selected.sort_by_key(|c| c.priority);

        let mut remaining = selected.iter().peekable();
        while let Some(chain) = remaining.next() {
            self.audit.log(
                &chain.id,
                LogLevel::Debug,
                ExecutionPhase::Execution,
                format!("executing {} chain", chain.pattern.name()),
            );

            let result = execute_chain(chain, &self.registry, self.evaluator.as_ref(), ctx);
            info!(
                chain_id = %chain.id,
                outcome = %result.final_outcome,
                triggered = result.triggered,
                elapsed_ms = result.execution_time_ms,
                "chain finished"
            );
            self.audit.log_with_details(
                &chain.id,
                if result.error_message.is_some() {
                    LogLevel::Error
                } else {
                    LogLevel::Info
                },
                ExecutionPhase::Complete,
                result.final_outcome.clone(),
                serde_json::to_value(&result).ok(),
                Some(result.execution_time_ms),
            );
            append_trail(&mut audit_trail, &result);

            let failed = !result.triggered || result.error_message.is_some();
            let halt = failed && chain.critical;
            chain_results.push(result);

            if halt {
                warn!(chain_id = %chain.id, "critical chain failed, halting run");
                self.audit.log(
                    &chain.id,
                    LogLevel::Error,
                    ExecutionPhase::CriticalHalt,
                    "critical chain failed, remaining chains not executed",
                );
                audit_trail.push(format!("{}: CRITICAL FAILURE, run halted", chain.id));
                break;
            }

            if let Some(budget) = deadline {
                if started.elapsed() >= budget && remaining.peek().is_some() {
                    for chain in remaining {
                        warn!(chain_id = %chain.id, "deadline exceeded, chain not executed");
                        self.audit.log(
                            &chain.id,
                            LogLevel::Warning,
                            ExecutionPhase::Timeout,
                            "deadline exceeded before chain execution",
                        );
                        audit_trail.push(format!("{}: TIMEOUT", chain.id));
                        chain_results.push(ChainResult::timeout(
                            chain.id.clone(),
                            chain.pattern.name(),
                        ));
                    }
                    break;
                }
            }
        }

        OrchestrationResult {
            chain_results,
            audit_trail,
            total_time_ms: started.elapsed().as_millis() as u64,
        }
    }
}

fn append_trail(trail: &mut Vec<String>, result: &ChainResult) {
    trail.push(format!(
        "{}: {} ({} rules, {}ms)",
        result.chain_id, result.final_outcome, result.rules_evaluated, result.execution_time_ms
    ));
    for (key, value) in &result.stage_results {
        trail.push(format!("  {} = {}", key, value));
    }
    if let Some(message) = &result.error_message {
        trail.push(format!("  error: {}", message));
    }
}
