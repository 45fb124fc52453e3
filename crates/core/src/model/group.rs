//! Rule group definitions: AND/OR composition with execution-control flags.

use serde::{Deserialize, Serialize};

use super::rule::{default_priority, RuleRef};

/// Composition operator for a rule group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupOperator {
    And,
    Or,
}

/// One entry in a group's reference list: a rule reference (bare or
/// advanced) or a nested rule-group reference. Lists may mix all three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupMember {
    Group(GroupRef),
    Ref(RuleRef),
    Rule(String),
}

impl GroupMember {
    /// Execution order hint, when the reference carries one.
    pub fn sequence(&self) -> Option<u32> {
        match self {
            GroupMember::Group(g) => g.sequence,
            GroupMember::Ref(r) => r.sequence,
            GroupMember::Rule(_) => None,
        }
    }

    /// The referenced rule or group id.
    pub fn target(&self) -> &str {
        match self {
            GroupMember::Group(g) => &g.group,
            GroupMember::Ref(r) => &r.rule,
            GroupMember::Rule(id) => id,
        }
    }
}

/// Reference to a nested rule group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GroupRef {
    pub group: String,
    #[serde(default)]
    pub sequence: Option<u32>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// AND/OR composition of rule and rule-group references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RuleGroup {
    pub id: String,
    pub operator: GroupOperator,
    /// Short-circuit: stop after the first false (AND) or first true (OR).
    #[serde(default)]
    pub stop_on_first_failure: bool,
    /// Evaluate members concurrently; short-circuit applies to the reduction
    /// only, never to scheduling.
    #[serde(default)]
    pub parallel_execution: bool,
    /// Forces full evaluation and records every member's result.
    #[serde(default)]
    pub debug_mode: bool,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub references: Vec<GroupMember>,
}

impl RuleGroup {
    pub fn new(id: impl Into<String>, operator: GroupOperator) -> Self {
        Self {
            id: id.into(),
            operator,
            stop_on_first_failure: false,
            parallel_execution: false,
            debug_mode: false,
            priority: default_priority(),
            references: Vec::new(),
        }
    }

    pub fn with_members(mut self, members: Vec<GroupMember>) -> Self {
        self.references = members;
        self
    }

    pub fn stop_on_first_failure(mut self, stop: bool) -> Self {
        self.stop_on_first_failure = stop;
        self
    }
}
