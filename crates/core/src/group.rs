//! Rule group evaluation: AND/OR composition with short-circuit, parallel,
//! and debug semantics.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::context::ExecutionContext;
use crate::evaluator::Evaluator;
use crate::model::{GroupMember, GroupOperator, Registry, Rule, RuleGroup};
use crate::result::{MemberResult, RuleGroupResult};

/// A group member resolved against the registry, ready to evaluate.
enum ResolvedMember<'a> {
    Rule(Rule),
    Group(&'a RuleGroup),
    /// Reference that does not resolve; evaluates to a recorded failure.
    Missing { id: String, kind: &'static str },
}

/// Evaluate a rule group against the context.
///
/// Members run in sequence order (explicit `sequence` values win,
/// declaration order breaks ties). AND groups are the conjunction of all
/// evaluated members, OR groups the disjunction; `stop-on-first-failure`
/// short-circuits sequential evaluation once the outcome is determined.
/// `debug-mode` forces full evaluation. `parallel-execution` evaluates all
/// members concurrently against a read-only context and applies the
/// reduction to the joined results only.
///
/// An empty reference list evaluates to `false` for both operators.
/// A member evaluation error counts that member as `false` and is recorded;
/// it never aborts the group.
pub fn evaluate_group(
    group: &RuleGroup,
    registry: &Registry,
    evaluator: &dyn Evaluator,
    ctx: &ExecutionContext,
) -> RuleGroupResult {
    let members = resolve_members(group, registry);

    if members.is_empty() {
        debug!(group_id = %group.id, "empty rule group evaluates to false");
        return RuleGroupResult {
            group_id: group.id.clone(),
            passed: false,
            member_results: Vec::new(),
            rules_evaluated: 0,
            short_circuited: false,
        };
    }

    if group.parallel_execution && members.len() > 1 {
        evaluate_parallel(group, &members, registry, evaluator, ctx)
    } else {
        evaluate_sequential(group, &members, registry, evaluator, ctx)
    }
}

/// Resolve the reference list into evaluation order, honoring per-reference
/// `sequence` and `enabled` overrides and materializing priority-override
/// rule copies inside this group's view.
fn resolve_members<'a>(group: &'a RuleGroup, registry: &'a Registry) -> Vec<ResolvedMember<'a>> {
    let mut ordered: Vec<(u32, usize, &GroupMember)> = group
        .references
        .iter()
        .enumerate()
        .map(|(idx, m)| (m.sequence().unwrap_or(idx as u32), idx, m))
        .collect();
    ordered.sort_by_key(|(seq, idx, _)| (*seq, *idx));

    let mut resolved = Vec::with_capacity(ordered.len());
    for (_, _, member) in ordered {
        match member {
            GroupMember::Rule(id) => match registry.rule(id) {
                Some(rule) if rule.enabled => resolved.push(ResolvedMember::Rule(rule.clone())),
                Some(_) => debug!(group_id = %group.id, rule_id = %id, "skipping disabled rule"),
                None => resolved.push(ResolvedMember::Missing {
                    id: id.clone(),
                    kind: "rule",
                }),
            },
            GroupMember::Ref(r) => {
                let Some(rule) = registry.rule(&r.rule) else {
                    resolved.push(ResolvedMember::Missing {
                        id: r.rule.clone(),
                        kind: "rule",
                    });
                    continue;
                };
                if !r.enabled.unwrap_or(rule.enabled) {
                    debug!(group_id = %group.id, rule_id = %r.rule, "skipping disabled reference");
                    continue;
                }
                let rule = match r.override_priority {
                    Some(p) => rule.with_priority_override(&group.id, p),
                    None => rule.clone(),
                };
                resolved.push(ResolvedMember::Rule(rule));
            }
            GroupMember::Group(g) => {
                if !g.enabled.unwrap_or(true) {
                    debug!(group_id = %group.id, nested = %g.group, "skipping disabled nested group");
                    continue;
                }
                match registry.group(&g.group) {
                    Some(nested) => resolved.push(ResolvedMember::Group(nested)),
                    None => resolved.push(ResolvedMember::Missing {
                        id: g.group.clone(),
                        kind: "rule group",
                    }),
                }
            }
        }
    }
    resolved
}

/// Evaluate one member to a boolean, recording evaluation faults.
fn evaluate_member(
    member: &ResolvedMember<'_>,
    group_id: &str,
    registry: &Registry,
    evaluator: &dyn Evaluator,
    ctx: &ExecutionContext,
) -> MemberResult {
    match member {
        ResolvedMember::Rule(rule) => match evaluator.evaluate(&rule.condition, ctx) {
            Ok(value) => MemberResult {
                id: rule.id.clone(),
                passed: value.truthy(),
                error: None,
            },
            Err(e) => {
                warn!(group_id = %group_id, rule_id = %rule.id, error = %e, "rule evaluation failed, treating as false");
                MemberResult {
                    id: rule.id.clone(),
                    passed: false,
                    error: Some(e.to_string()),
                }
            }
        },
        ResolvedMember::Group(nested) => {
            let result = evaluate_group(nested, registry, evaluator, ctx);
            MemberResult {
                id: nested.id.clone(),
                passed: result.passed,
                error: None,
            }
        }
        ResolvedMember::Missing { id, kind } => {
            warn!(group_id = %group_id, id = %id, "unresolved {} reference, treating as false", kind);
            MemberResult {
                id: id.clone(),
                passed: false,
                error: Some(format!("unresolved {} reference '{}'", kind, id)),
            }
        }
    }
}

fn evaluate_sequential(
    group: &RuleGroup,
    members: &[ResolvedMember<'_>],
    registry: &Registry,
    evaluator: &dyn Evaluator,
    ctx: &ExecutionContext,
) -> RuleGroupResult {
    // Debug mode records every member regardless of short-circuit config.
    let short_circuit = group.stop_on_first_failure && !group.debug_mode;

    let mut member_results = Vec::with_capacity(members.len());
    let mut short_circuited = false;

    for member in members {
        let result = evaluate_member(member, &group.id, registry, evaluator, ctx);
        let passed = result.passed;
        if group.debug_mode {
            debug!(group_id = %group.id, member = %result.id, passed, "debug-mode member result");
        }
        member_results.push(result);

        let determined = match group.operator {
            GroupOperator::And => !passed,
            GroupOperator::Or => passed,
        };
        if determined && short_circuit {
            short_circuited = true;
            break;
        }
    }

    let passed = reduce(group.operator, member_results.iter().map(|m| m.passed));
    RuleGroupResult {
        group_id: group.id.clone(),
        passed,
        rules_evaluated: member_results.len(),
        member_results,
        short_circuited,
    }
}

/// Parallel dispatch: every member is scheduled; short-circuit logic applies
/// to the reduction only. The context is shared read-only, so no member may
/// publish variables to siblings.
fn evaluate_parallel(
    group: &RuleGroup,
    members: &[ResolvedMember<'_>],
    registry: &Registry,
    evaluator: &dyn Evaluator,
    ctx: &ExecutionContext,
) -> RuleGroupResult {
    let member_results: Vec<MemberResult> = members
        .par_iter()
        .map(|member| evaluate_member(member, &group.id, registry, evaluator, ctx))
        .collect();

    let passed = reduce(group.operator, member_results.iter().map(|m| m.passed));
    RuleGroupResult {
        group_id: group.id.clone(),
        passed,
        rules_evaluated: member_results.len(),
        member_results,
        short_circuited: false,
    }
}

fn reduce(operator: GroupOperator, mut results: impl Iterator<Item = bool>) -> bool {
    match operator {
        GroupOperator::And => results.all(|r| r),
        GroupOperator::Or => results.any(|r| r),
    }
}
