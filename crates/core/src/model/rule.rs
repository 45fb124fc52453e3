//! Atomic rule definitions and rule references.

use serde::{Deserialize, Serialize};

/// Severity attached to a rule's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
    #[default]
    Info,
}

/// An atomic rule: condition expression plus metadata.
///
/// Immutable once registered; the only sanctioned derivation is a
/// group-scoped priority-override copy via [`Rule::with_priority_override`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Rule {
    pub id: String,
    pub condition: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
    /// Lower numbers mean higher precedence.
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Rule {
    /// Minimal constructor for programmatic rules; metadata takes defaults.
    pub fn new(id: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            condition: condition.into(),
            message: String::new(),
            severity: Severity::default(),
            priority: default_priority(),
            weight: default_weight(),
            enabled: true,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Derive a group-scoped copy with a different priority.
    ///
    /// The copy's id is `{originalId}_group_{groupId}_priority_{newPriority}`
    /// and lives only inside that group's resolved view; the original rule is
    /// left untouched.
    pub fn with_priority_override(&self, group_id: &str, new_priority: i32) -> Rule {
        let mut derived = self.clone();
        derived.id = format!("{}_group_{}_priority_{}", self.id, group_id, new_priority);
        derived.priority = new_priority;
        derived
    }
}

/// A reference to a rule from a rule group's reference list.
///
/// Either a bare id or an advanced reference carrying execution order,
/// an enabled override, and an optional priority override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RuleRef {
    pub rule: String,
    /// Execution order within the group; must be unique when specified.
    #[serde(default)]
    pub sequence: Option<u32>,
    /// Overrides the referenced rule's own `enabled` flag.
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub override_priority: Option<i32>,
}

impl RuleRef {
    pub fn bare(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            sequence: None,
            enabled: None,
            override_priority: None,
        }
    }
}

pub(crate) fn default_priority() -> i32 {
    100
}

pub(crate) fn default_weight() -> f64 {
    1.0
}

pub(crate) fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied_on_deserialize() {
        let rule: Rule = serde_yaml::from_str(
            r#"
id: high-value
condition: "amount > 100000"
"#,
        )
        .unwrap();
        assert_eq!(rule.priority, 100);
        assert_eq!(rule.weight, 1.0);
        assert!(rule.enabled);
        assert_eq!(rule.severity, Severity::Info);
    }

    #[test]
    fn priority_override_derives_new_id_and_leaves_original() {
        let original = Rule::new("kyc-check", "kycVerified").with_priority(50);
        let derived = original.with_priority_override("onboarding", 10);

        assert_eq!(derived.id, "kyc-check_group_onboarding_priority_10");
        assert_eq!(derived.priority, 10);
        assert_eq!(original.priority, 50);
        assert_eq!(original.id, "kyc-check");
    }

    #[test]
    fn advanced_reference_parses_kebab_fields() {
        let r: RuleRef = serde_yaml::from_str(
            r#"
rule: sanctions-screen
sequence: 2
enabled: false
override-priority: 5
"#,
        )
        .unwrap();
        assert_eq!(r.rule, "sanctions-screen");
        assert_eq!(r.sequence, Some(2));
        assert_eq!(r.enabled, Some(false));
        assert_eq!(r.override_priority, Some(5));
    }
}
