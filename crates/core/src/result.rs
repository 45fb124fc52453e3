//! Result types returned by pattern executors, the group evaluator, and
//! the orchestrator.

use indexmap::IndexMap;
use serde::Serialize;

use crate::value::Value;

/// Outcome of executing one chain definition.
///
/// Business-level failure (denied, no route, stage terminated) is a valid
/// result, not an error; `error_message` is reserved for configuration and
/// evaluation faults.
#[derive(Debug, Clone, Serialize)]
pub struct ChainResult {
    pub chain_id: String,
    pub pattern: &'static str,
    /// Whether the chain's outcome is positive (pattern-specific: branch
    /// conjunction, completion without terminate, matched route, etc.).
    pub triggered: bool,
    /// Outcome label: a decision-rule label, route key, leaf message, or
    /// one of the generic `PASSED`/`FAILED`/`TIMEOUT` markers.
    pub final_outcome: String,
    /// Rule and stage ids in the order they were actually evaluated.
    pub execution_path: Vec<String>,
    /// Append-only name-to-value map of intermediate results.
    pub stage_results: IndexMap<String, Value>,
    pub rules_evaluated: usize,
    pub rules_triggered: usize,
    pub execution_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ChainResult {
    pub fn new(chain_id: impl Into<String>, pattern: &'static str) -> Self {
        Self {
            chain_id: chain_id.into(),
            pattern,
            triggered: false,
            final_outcome: String::new(),
            execution_path: Vec::new(),
            stage_results: IndexMap::new(),
            rules_evaluated: 0,
            rules_triggered: 0,
            execution_time_ms: 0,
            error_message: None,
        }
    }

    /// Configuration or evaluation fault: `triggered` stays false.
    pub fn failure(
        chain_id: impl Into<String>,
        pattern: &'static str,
        message: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(chain_id, pattern);
        result.final_outcome = "FAILED".to_string();
        result.error_message = Some(message.into());
        result
    }

    /// Deadline exceeded before this chain ran.
    pub fn timeout(chain_id: impl Into<String>, pattern: &'static str) -> Self {
        let mut result = Self::new(chain_id, pattern);
        result.final_outcome = "TIMEOUT".to_string();
        result.error_message = Some("deadline exceeded before chain execution".to_string());
        result
    }

    /// Record one rule evaluation in the path and counters.
    pub(crate) fn record_rule(&mut self, id: &str, passed: bool) {
        self.execution_path.push(id.to_string());
        self.rules_evaluated += 1;
        if passed {
            self.rules_triggered += 1;
        }
    }

    pub(crate) fn set_stage(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.stage_results.insert(key.into(), value.into());
    }
}

/// Result of one rule evaluated as a group member.
#[derive(Debug, Clone, Serialize)]
pub struct MemberResult {
    pub id: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of evaluating a rule group.
#[derive(Debug, Clone, Serialize)]
pub struct RuleGroupResult {
    pub group_id: String,
    pub passed: bool,
    /// Per-member results in evaluation order. Short-circuited members are
    /// absent unless the group runs in debug mode or parallel.
    pub member_results: Vec<MemberResult>,
    pub rules_evaluated: usize,
    pub short_circuited: bool,
}

/// Aggregated outcome of an orchestrator run.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationResult {
    pub chain_results: Vec<ChainResult>,
    /// Human-readable trail: one line per chain plus its stage results.
    pub audit_trail: Vec<String>,
    pub total_time_ms: u64,
}

impl OrchestrationResult {
    /// True when every executed chain completed without an error message.
    pub fn all_succeeded(&self) -> bool {
        self.chain_results.iter().all(|c| c.error_message.is_none())
    }
}
