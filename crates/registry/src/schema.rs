//! On-disk configuration file schema.
//!
//! A configuration file is a YAML document holding any mix of rules, rule
//! groups, chain definitions, and references to further configuration files.
//! The payload types are the engine's own model types, so a file parses
//! straight into registry entries.

use ruleflow_core::model::{ChainDefinition, Rule, RuleGroup};
use serde::Deserialize;

/// One configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct RawConfig {
    pub rules: Vec<Rule>,
    pub rule_groups: Vec<RuleGroup>,
    pub rule_chains: Vec<ChainDefinition>,
    /// Other configuration files to pull in, relative to this file.
    pub rule_refs: Vec<FileRef>,
}

/// A reference to another configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileRef {
    pub path: String,
}
