//! Cross-file configuration resolver.
//!
//! Loads an ordered list of configuration files, follows each file's
//! `rule-refs` one level deep (a referenced file's own `rule-refs` are
//! ignored, which guarantees termination), merges everything into one
//! [`Registry`], and validates the merged result.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use ruleflow_core::model::{BranchItem, ChainPattern, GroupMember, Registry, RuleGroup};
use tracing::{debug, info};

use crate::error::{ResolveError, Result};
use crate::loader::{ConfigSource, YamlConfigSource};
use crate::schema::RawConfig;

/// Resolve a single root configuration file from disk.
pub fn resolve_root(root: &Path) -> Result<Registry> {
    resolve_files(std::slice::from_ref(&root.to_path_buf()), &YamlConfigSource)
}

/// Resolve an ordered list of configuration files against a [`ConfigSource`].
///
/// Every file is loaded at most once per resolution pass, and resolution is
/// deterministic: the same inputs always produce an equal registry, in the
/// same declaration order.
pub fn resolve_files(roots: &[PathBuf], source: &dyn ConfigSource) -> Result<Registry> {
    let mut registry = Registry::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();

    for root in roots {
        let root = normalize(root);
        if !visited.insert(root.clone()) {
            debug!(path = %root.display(), "file already loaded, skipping");
            continue;
        }
        let cfg = source.load(&root)?;
        let refs = cfg.rule_refs.clone();
        merge(&mut registry, cfg)?;

        let dir = root.parent().map(Path::to_path_buf).unwrap_or_default();
        for file_ref in &refs {
            let target = normalize(&dir.join(&file_ref.path));
            if !visited.insert(target.clone()) {
                debug!(path = %target.display(), "file already loaded, skipping");
                continue;
            }
            let referenced = source.load(&target)?;
            if !referenced.rule_refs.is_empty() {
                debug!(
                    path = %target.display(),
                    "nested rule-refs in referenced file are not followed"
                );
            }
            merge(&mut registry, referenced)?;
        }
    }

    validate(&registry)?;
    info!(
        rules = registry.rules().len(),
        groups = registry.groups().len(),
        chains = registry.chains().len(),
        "configuration resolved"
    );
    Ok(registry)
}

/// Merge one file's entries into the registry.
///
/// A repeated id with identical content is tolerated (shared files get
/// pulled in through more than one reference); a repeated id with different
/// content is a conflict.
fn merge(registry: &mut Registry, cfg: RawConfig) -> Result<()> {
    for rule in cfg.rules {
        if rule.id.is_empty() {
            return Err(ResolveError::Configuration(
                "rule id must not be empty".to_string(),
            ));
        }
        match registry.rule(&rule.id) {
            Some(existing) if *existing != rule => {
                return Err(ResolveError::DuplicateRule { id: rule.id });
            }
            Some(_) => {}
            None => registry.insert_rule(rule),
        }
    }
    for group in cfg.rule_groups {
        if group.id.is_empty() {
            return Err(ResolveError::Configuration(
                "rule group id must not be empty".to_string(),
            ));
        }
        match registry.group(&group.id) {
            Some(existing) if *existing != group => {
                return Err(ResolveError::DuplicateGroup { id: group.id });
            }
            Some(_) => {}
            None => registry.insert_group(group),
        }
    }
    for chain in cfg.rule_chains {
        if chain.id.is_empty() {
            return Err(ResolveError::Configuration(
                "chain id must not be empty".to_string(),
            ));
        }
        match registry.chain(&chain.id) {
            Some(existing) if *existing != chain => {
                return Err(ResolveError::DuplicateChain { id: chain.id });
            }
            Some(_) => {}
            None => registry.insert_chain(chain),
        }
    }
    Ok(())
}

/// Validate the merged registry: every reference must resolve, sequence
/// numbers must be unique within a group, and group nesting must be acyclic.
fn validate(registry: &Registry) -> Result<()> {
    for group in registry.groups().values() {
        check_group_references(registry, group)?;
    }
    check_group_cycles(registry)?;

    for chain in registry.chains().values() {
        if let ChainPattern::ConditionalChaining(cfg) = &chain.pattern {
            for item in cfg.on_trigger.iter().chain(cfg.on_no_trigger.iter()) {
                if let BranchItem::Group { group } = item {
                    if registry.group(group).is_none() {
                        return Err(ResolveError::MissingReference {
                            referrer: format!("chain '{}'", chain.id),
                            kind: "rule group",
                            id: group.clone(),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

fn check_group_references(registry: &Registry, group: &RuleGroup) -> Result<()> {
    let mut sequences = HashSet::new();
    for member in &group.references {
        if let Some(sequence) = member.sequence() {
            if !sequences.insert(sequence) {
                return Err(ResolveError::Configuration(format!(
                    "group '{}' has duplicate sequence {}",
                    group.id, sequence
                )));
            }
        }
        match member {
            GroupMember::Group(nested) => {
                if registry.group(&nested.group).is_none() {
                    return Err(ResolveError::MissingReference {
                        referrer: format!("group '{}'", group.id),
                        kind: "rule group",
                        id: nested.group.clone(),
                    });
                }
            }
            GroupMember::Ref(r) => {
                if registry.rule(&r.rule).is_none() {
                    return Err(ResolveError::MissingReference {
                        referrer: format!("group '{}'", group.id),
                        kind: "rule",
                        id: r.rule.clone(),
                    });
                }
            }
            GroupMember::Rule(id) => {
                if registry.rule(id).is_none() {
                    return Err(ResolveError::MissingReference {
                        referrer: format!("group '{}'", group.id),
                        kind: "rule",
                        id: id.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Depth-first search over group nesting with an explicit stack; an edge
/// back into the current path is a cycle.
fn check_group_cycles(registry: &Registry) -> Result<()> {
    let mut done: HashSet<&str> = HashSet::new();

    for start in registry.groups().keys() {
        if done.contains(start.as_str()) {
            continue;
        }
        let mut on_path: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
        on_path.insert(start.as_str());

        while let Some(&(id, idx)) = stack.last() {
            let nested: Vec<&str> = registry
                .group(id)
                .map(|g| {
                    g.references
                        .iter()
                        .filter_map(|m| match m {
                            GroupMember::Group(nested) => Some(nested.group.as_str()),
                            _ => None,
                        })
                        .collect()
                })
                .unwrap_or_default();

            if idx < nested.len() {
                if let Some(frame) = stack.last_mut() {
                    frame.1 += 1;
                }
                let child = nested[idx];
                if on_path.contains(child) {
                    let mut path: Vec<&str> = stack.iter().map(|(id, _)| *id).collect();
                    path.push(child);
                    return Err(ResolveError::CircularReference {
                        path: path.join(" -> "),
                    });
                }
                if !done.contains(child) && registry.group(child).is_some() {
                    on_path.insert(child);
                    stack.push((child, 0));
                }
            } else {
                on_path.remove(id);
                done.insert(id);
                stack.pop();
            }
        }
    }
    Ok(())
}

/// Lexical path normalization so the same file referenced through different
/// relative spellings dedupes to one visit.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MemSource(HashMap<PathBuf, &'static str>);

    impl MemSource {
        fn new(files: &[(&str, &'static str)]) -> Self {
            Self(
                files
                    .iter()
                    .map(|(p, c)| (PathBuf::from(p), *c))
                    .collect(),
            )
        }
    }

    impl ConfigSource for MemSource {
        fn load(&self, path: &Path) -> Result<RawConfig> {
            let contents = self.0.get(path).ok_or_else(|| ResolveError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            })?;
            serde_yaml::from_str(contents).map_err(|source| ResolveError::Parse {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    fn resolve(files: &[(&str, &'static str)]) -> Result<Registry> {
        resolve_files(&[PathBuf::from("root.yml")], &MemSource::new(files))
    }

    #[test]
    fn merges_rules_across_referenced_files() {
        let registry = resolve(&[
            (
                "root.yml",
                "rules:\n  - id: local\n    condition: \"a\"\nrule-refs:\n  - path: shared/common.yml\n",
            ),
            (
                "shared/common.yml",
                "rules:\n  - id: shared\n    condition: \"b\"\n",
            ),
        ])
        .unwrap();

        assert!(registry.rule("local").is_some());
        assert!(registry.rule("shared").is_some());
    }

    #[test]
    fn mutually_referencing_files_terminate() {
        // other.yml points back at root.yml; referenced files' own refs are
        // not followed, so this terminates with both rule sets merged.
        let registry = resolve(&[
            (
                "root.yml",
                "rules:\n  - id: a\n    condition: \"a\"\nrule-refs:\n  - path: other.yml\n",
            ),
            (
                "other.yml",
                "rules:\n  - id: b\n    condition: \"b\"\nrule-refs:\n  - path: root.yml\n",
            ),
        ])
        .unwrap();

        assert_eq!(registry.rules().len(), 2);
    }

    #[test]
    fn referenced_files_refs_are_not_followed() {
        let registry = resolve(&[
            ("root.yml", "rule-refs:\n  - path: mid.yml\n"),
            (
                "mid.yml",
                "rules:\n  - id: mid\n    condition: \"m\"\nrule-refs:\n  - path: leaf.yml\n",
            ),
            ("leaf.yml", "rules:\n  - id: leaf\n    condition: \"l\"\n"),
        ])
        .unwrap();

        assert!(registry.rule("mid").is_some());
        assert!(registry.rule("leaf").is_none());
    }

    #[test]
    fn repeated_reference_loads_file_once() {
        let registry = resolve(&[
            (
                "root.yml",
                "rule-refs:\n  - path: common.yml\n  - path: ./common.yml\n",
            ),
            ("common.yml", "rules:\n  - id: shared\n    condition: \"x\"\n"),
        ])
        .unwrap();

        assert_eq!(registry.rules().len(), 1);
    }

    #[test]
    fn multiple_roots_merge_in_order() {
        let source = MemSource::new(&[
            ("a.yml", "rules:\n  - id: a\n    condition: \"a\"\n"),
            ("b.yml", "rules:\n  - id: b\n    condition: \"b\"\n"),
        ]);
        let registry = resolve_files(
            &[PathBuf::from("a.yml"), PathBuf::from("b.yml")],
            &source,
        )
        .unwrap();

        let ids: Vec<&str> = registry.rules().keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn conflicting_duplicate_rule_is_rejected() {
        let err = resolve(&[
            (
                "root.yml",
                "rules:\n  - id: dup\n    condition: \"a\"\nrule-refs:\n  - path: other.yml\n",
            ),
            ("other.yml", "rules:\n  - id: dup\n    condition: \"b\"\n"),
        ])
        .unwrap_err();

        assert!(matches!(err, ResolveError::DuplicateRule { id } if id == "dup"));
    }

    #[test]
    fn identical_duplicate_rule_is_tolerated() {
        let registry = resolve(&[
            (
                "root.yml",
                "rules:\n  - id: dup\n    condition: \"a\"\nrule-refs:\n  - path: other.yml\n",
            ),
            ("other.yml", "rules:\n  - id: dup\n    condition: \"a\"\n"),
        ])
        .unwrap();

        assert_eq!(registry.rules().len(), 1);
    }

    #[test]
    fn missing_rule_reference_is_reported() {
        let err = resolve(&[(
            "root.yml",
            "rule-groups:\n  - id: g\n    operator: AND\n    references:\n      - ghost\n",
        )])
        .unwrap_err();

        assert!(
            matches!(&err, ResolveError::MissingReference { id, kind, .. } if id == "ghost" && *kind == "rule")
        );
    }

    #[test]
    fn group_cycle_names_the_path() {
        let err = resolve(&[(
            "root.yml",
            r#"
rule-groups:
  - id: a
    operator: AND
    references:
      - group: b
  - id: b
    operator: OR
    references:
      - group: a
"#,
        )])
        .unwrap_err();

        let ResolveError::CircularReference { path } = err else {
            panic!("expected circular reference, got {err:?}");
        };
        assert!(path.contains('a') && path.contains('b'));
    }

    #[test]
    fn duplicate_sequence_in_group_is_rejected() {
        let err = resolve(&[(
            "root.yml",
            r#"
rules:
  - id: r1
    condition: "a"
  - id: r2
    condition: "b"
rule-groups:
  - id: g
    operator: AND
    references:
      - rule: r1
        sequence: 1
      - rule: r2
        sequence: 1
"#,
        )])
        .unwrap_err();

        assert!(matches!(err, ResolveError::Configuration(msg) if msg.contains("sequence")));
    }

    #[test]
    fn chain_branch_group_must_exist() {
        let err = resolve(&[(
            "root.yml",
            r#"
rule-chains:
  - id: gate
    pattern: conditional-chaining
    configuration:
      trigger-rule:
        id: t
        condition: "x"
      on-trigger:
        - group: nowhere
"#,
        )])
        .unwrap_err();

        assert!(
            matches!(&err, ResolveError::MissingReference { id, referrer, .. }
                if id == "nowhere" && referrer.contains("gate"))
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let files = [
            (
                "root.yml",
                "rules:\n  - id: a\n    condition: \"a\"\nrule-refs:\n  - path: other.yml\n",
            ),
            ("other.yml", "rules:\n  - id: b\n    condition: \"b\"\n"),
        ];
        let first = resolve(&files).unwrap();
        let second = resolve(&files).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_referenced_file_is_an_io_error() {
        let err = resolve(&[(
            "root.yml",
            "rule-refs:\n  - path: missing.yml\n",
        )])
        .unwrap_err();

        assert!(matches!(err, ResolveError::Io { .. }));
    }
}
