//! Data model: rules, rule groups, chain definitions, and the resolved
//! registry snapshot.

mod chain;
mod group;
mod registry;
mod rule;

pub use chain::{
    AccumulativeConfig, BranchItem, ChainDefinition, ChainPattern, ConditionalConfig,
    ConditionalExecution, DecisionNode, FailureAction, FluentConfig, RoutingConfig, RuleSelection,
    SequentialConfig, Stage, WorkflowConfig, WorkflowStage,
};
pub use group::{GroupMember, GroupOperator, GroupRef, RuleGroup};
pub use registry::Registry;
pub use rule::{Rule, RuleRef, Severity};
