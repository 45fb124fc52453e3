//! Resolved configuration snapshot shared across evaluation requests.

use indexmap::IndexMap;

use super::chain::ChainDefinition;
use super::group::RuleGroup;
use super::rule::Rule;

/// Immutable snapshot of all resolved rules, rule groups, and chain
/// definitions for one loaded configuration.
///
/// Built once at load time by the resolver, then shared by reference
/// (`Arc<Registry>`). A configuration reload produces an entirely new
/// registry swapped in atomically, never a mutation in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    rules: IndexMap<String, Rule>,
    groups: IndexMap<String, RuleGroup>,
    chains: IndexMap<String, ChainDefinition>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_rule(&mut self, rule: Rule) {
        self.rules.insert(rule.id.clone(), rule);
    }

    pub fn insert_group(&mut self, group: RuleGroup) {
        self.groups.insert(group.id.clone(), group);
    }

    pub fn insert_chain(&mut self, chain: ChainDefinition) {
        self.chains.insert(chain.id.clone(), chain);
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules.get(id)
    }

    pub fn group(&self, id: &str) -> Option<&RuleGroup> {
        self.groups.get(id)
    }

    pub fn chain(&self, id: &str) -> Option<&ChainDefinition> {
        self.chains.get(id)
    }

    pub fn rules(&self) -> &IndexMap<String, Rule> {
        &self.rules
    }

    pub fn groups(&self) -> &IndexMap<String, RuleGroup> {
        &self.groups
    }

    pub fn chains(&self) -> &IndexMap<String, ChainDefinition> {
        &self.chains
    }

    /// Chain definitions in ascending priority order (declaration order
    /// breaks ties).
    pub fn chains_by_priority(&self) -> Vec<&ChainDefinition> {
        let mut chains: Vec<&ChainDefinition> = self.chains.values().collect();
        chains.sort_by_key(|c| c.priority);
        chains
    }
}
