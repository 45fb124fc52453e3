//! Chain definitions: one closed enum variant per chaining pattern.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::rule::{default_priority, Rule};

/// A named, pattern-typed unit of orchestration over rules and groups.
// No `deny_unknown_fields` here: serde does not support it together with
// the flattened pattern enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChainDefinition {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Lower numbers run first in the orchestrator.
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// A critical chain that fails halts the remaining chains in a run.
    #[serde(default)]
    pub critical: bool,
    #[serde(flatten)]
    pub pattern: ChainPattern,
}

/// The six chaining patterns, each carrying its own configuration payload.
///
/// Dispatch is an exhaustive match: adding or removing a pattern is a
/// compile-time-checked change, not a registry lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", content = "configuration", rename_all = "kebab-case")]
pub enum ChainPattern {
    ConditionalChaining(ConditionalConfig),
    SequentialDependency(SequentialConfig),
    ResultBasedRouting(RoutingConfig),
    AccumulativeChaining(AccumulativeConfig),
    ComplexWorkflow(WorkflowConfig),
    FluentBuilder(FluentConfig),
}

impl ChainPattern {
    pub fn name(&self) -> &'static str {
        match self {
            ChainPattern::ConditionalChaining(_) => "conditional-chaining",
            ChainPattern::SequentialDependency(_) => "sequential-dependency",
            ChainPattern::ResultBasedRouting(_) => "result-based-routing",
            ChainPattern::AccumulativeChaining(_) => "accumulative-chaining",
            ChainPattern::ComplexWorkflow(_) => "complex-workflow",
            ChainPattern::FluentBuilder(_) => "fluent-builder",
        }
    }
}

/// One entry in a conditional branch: an inline rule or a reference to a
/// registered rule group. Inline lists run as plain conjunctions; group
/// references get full rule-group semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BranchItem {
    Group { group: String },
    Rule(Rule),
}

/// Pattern 1: trigger rule selects which branch executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConditionalConfig {
    pub trigger_rule: Rule,
    #[serde(default)]
    pub on_trigger: Vec<BranchItem>,
    #[serde(default)]
    pub on_no_trigger: Vec<BranchItem>,
}

/// Pattern 2: ordered stages, each publishing its result to later stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SequentialConfig {
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Stage {
    #[serde(default)]
    pub name: Option<String>,
    pub rule: Rule,
    /// The stage result is stored under this context variable, visible to
    /// all later stages.
    pub output_variable: String,
    #[serde(default)]
    pub failure_action: FailureAction,
}

impl Stage {
    /// Stage label used in execution paths and stage results.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.rule.id)
    }
}

/// What a stage failure does to the rest of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailureAction {
    #[default]
    Continue,
    Terminate,
}

/// Pattern 3: router rule yields a route key selecting a rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RoutingConfig {
    pub router_rule: Rule,
    /// Route key to rule list. There is no implicit default route; a
    /// configuration may define one under a literal key and route to it
    /// from the router expression.
    pub routes: IndexMap<String, Vec<Rule>>,
}

/// Pattern 4: weighted score accumulation with a final decision rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AccumulativeConfig {
    #[serde(default = "default_accumulator_variable")]
    pub accumulator_variable: String,
    #[serde(default)]
    pub initial_value: f64,
    #[serde(default)]
    pub rule_selection: RuleSelection,
    pub accumulation_rules: Vec<Rule>,
    /// Maps the final numeric total to an outcome label.
    #[serde(default)]
    pub final_decision_rule: Option<Rule>,
}

fn default_accumulator_variable() -> String {
    "totalScore".to_string()
}

/// How accumulation rules are selected for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum RuleSelection {
    /// Execute every configured rule.
    #[default]
    All,
    /// Keep rules whose weight meets the threshold.
    #[serde(rename_all = "kebab-case")]
    WeightThreshold { weight_threshold: f64 },
    /// Keep the N highest-weight rules.
    #[serde(rename_all = "kebab-case")]
    TopWeighted { max_rules: usize },
    /// Keep rules at or above a priority tier (lower number = higher
    /// precedence, so `priority <= min-priority` qualifies).
    #[serde(rename_all = "kebab-case")]
    PriorityBased { min_priority: i32 },
    /// Evaluate a threshold expression against the context, then filter by
    /// weight like `WeightThreshold`.
    #[serde(rename_all = "kebab-case")]
    DynamicThreshold { threshold_expression: String },
}

/// Pattern 5: a DAG of named stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WorkflowConfig {
    pub stages: Vec<WorkflowStage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WorkflowStage {
    pub name: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// When present, a condition picks `on-true`/`on-false` sub-lists
    /// instead of `rules`.
    #[serde(default)]
    pub conditional_execution: Option<ConditionalExecution>,
    #[serde(default)]
    pub failure_action: FailureAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConditionalExecution {
    pub condition: String,
    #[serde(default)]
    pub on_true: Vec<Rule>,
    #[serde(default)]
    pub on_false: Vec<Rule>,
}

/// Pattern 6: binary decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FluentConfig {
    pub root: DecisionNode,
}

/// One decision-tree node. A missing child on the taken branch makes the
/// node a leaf; its message becomes the chain outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DecisionNode {
    pub rule: Rule,
    #[serde(default)]
    pub on_success: Option<Box<DecisionNode>>,
    #[serde(default)]
    pub on_failure: Option<Box<DecisionNode>>,
}
