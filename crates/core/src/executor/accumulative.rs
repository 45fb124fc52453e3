//! Accumulative chaining: build up a weighted score across rules, then map
//! the total to an outcome label.

use tracing::{debug, warn};

use crate::context::ExecutionContext;
use crate::evaluator::Evaluator;
use crate::model::{AccumulativeConfig, Rule, RuleSelection};
use crate::result::ChainResult;

const PATTERN: &str = "accumulative-chaining";

/// Accumulate `ruleScore * weight` over the selected rules, then evaluate
/// the final-decision rule with the total bound in the context.
///
/// A rule whose condition does not produce a number contributes 0. A
/// configuration whose condition already returns pre-scaled points is just
/// the `weight = 1.0` special case of the same computation.
pub(super) fn execute(
    chain_id: &str,
    cfg: &AccumulativeConfig,
    evaluator: &dyn Evaluator,
    ctx: &mut ExecutionContext,
) -> ChainResult {
    let mut result = ChainResult::new(chain_id, PATTERN);

    let mut total = cfg.initial_value;
    ctx.set(cfg.accumulator_variable.clone(), total);
    result.set_stage(format!("{}_initial", cfg.accumulator_variable), total);

    let selected = select_rules(cfg, evaluator, ctx);
    result.set_stage("total_rules_available", cfg.accumulation_rules.len() as f64);
    result.set_stage("rules_selected_for_execution", selected.len() as f64);

    for rule in &selected {
        let score = match evaluator.evaluate(&rule.condition, ctx) {
            Ok(value) => match value.as_number() {
                Some(n) => n,
                None => {
                    warn!(chain_id, rule_id = %rule.id, %value, "non-numeric accumulation result, using 0");
                    0.0
                }
            },
            Err(e) => {
                warn!(chain_id, rule_id = %rule.id, error = %e, "accumulation rule failed, using 0");
                result.set_stage(format!("{}_error", rule.id), e.to_string());
                0.0
            }
        };

        let weighted = score * rule.weight;
        total += weighted;
        debug!(chain_id, rule_id = %rule.id, score, weight = rule.weight, weighted, total, "accumulated");

        result.record_rule(&rule.id, weighted != 0.0);
        result.set_stage(format!("{}_score", rule.id), score);
        result.set_stage(format!("{}_weighted", rule.id), weighted);

        // Later rules (and the decision rule) see the running total.
        ctx.set(cfg.accumulator_variable.clone(), total);
    }

    result.set_stage(format!("{}_final", cfg.accumulator_variable), total);

    match &cfg.final_decision_rule {
        Some(decision) => match evaluator.evaluate(&decision.condition, ctx) {
            Ok(label) => {
                result.record_rule(&decision.id, true);
                result.triggered = true;
                result.final_outcome = label.to_string();
            }
            Err(e) => {
                return ChainResult::failure(
                    chain_id,
                    PATTERN,
                    format!("final decision rule '{}' failed: {}", decision.id, e),
                );
            }
        },
        None => {
            result.triggered = true;
            result.final_outcome = "ACCUMULATION_COMPLETED".to_string();
        }
    }

    result
}

/// Apply the configured rule-selection strategy.
///
/// Disabled rules are never selected. A dynamic-threshold expression that
/// fails to evaluate falls back to executing all rules.
fn select_rules(
    cfg: &AccumulativeConfig,
    evaluator: &dyn Evaluator,
    ctx: &ExecutionContext,
) -> Vec<Rule> {
    let enabled: Vec<&Rule> = cfg.accumulation_rules.iter().filter(|r| r.enabled).collect();

    let by_weight = |rules: &[&Rule], threshold: f64| -> Vec<Rule> {
        rules
            .iter()
            .filter(|r| r.weight >= threshold)
            .map(|r| (*r).clone())
            .collect()
    };

    match &cfg.rule_selection {
        RuleSelection::All => enabled.into_iter().cloned().collect(),
        RuleSelection::WeightThreshold { weight_threshold } => by_weight(&enabled, *weight_threshold),
        RuleSelection::TopWeighted { max_rules } => {
            let mut sorted: Vec<&Rule> = enabled;
            // Stable: equal weights keep declaration order.
            sorted.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
            sorted.into_iter().take(*max_rules).cloned().collect()
        }
        RuleSelection::PriorityBased { min_priority } => {
            let mut selected: Vec<&Rule> = enabled
                .into_iter()
                .filter(|r| r.priority <= *min_priority)
                .collect();
            selected.sort_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then(b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal))
            });
            selected.into_iter().cloned().collect()
        }
        RuleSelection::DynamicThreshold {
            threshold_expression,
        } => match evaluator
            .evaluate(threshold_expression, ctx)
            .ok()
            .and_then(|v| v.as_number())
        {
            Some(threshold) => {
                debug!(threshold, "dynamic selection threshold");
                by_weight(&enabled, threshold)
            }
            None => {
                warn!(
                    expression = %threshold_expression,
                    "dynamic threshold did not yield a number, executing all rules"
                );
                enabled.into_iter().cloned().collect()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{EvalError, FnEvaluator};
    use crate::value::Value;

    fn score_evaluator() -> impl Evaluator {
        FnEvaluator::new(|expr: &str, ctx: &ExecutionContext| {
            let total = || {
                ctx.get("totalScore")
                    .and_then(Value::as_number)
                    .ok_or_else(|| EvalError::undefined_variable(expr, "totalScore"))
            };
            match expr {
                "credit" => Ok(Value::Number(60.0)),
                "income" => Ok(Value::Number(30.0)),
                "history" => Ok(Value::Number(10.0)),
                "decision" => {
                    let t = total()?;
                    let label = if t >= 50.0 {
                        "APPROVED"
                    } else if t >= 20.0 {
                        "PARTIAL"
                    } else {
                        "MANUAL"
                    };
                    Ok(Value::from(label))
                }
                "half" => Ok(Value::Number(0.5)),
                other => Err(EvalError::new(other, "unknown expression")),
            }
        })
    }

    fn scoring_config(selection: RuleSelection) -> AccumulativeConfig {
        AccumulativeConfig {
            accumulator_variable: "totalScore".to_string(),
            initial_value: 0.0,
            rule_selection: selection,
            accumulation_rules: vec![
                Rule::new("credit", "credit").with_weight(0.6),
                Rule::new("income", "income").with_weight(0.3),
                Rule::new("history", "history").with_weight(0.1),
            ],
            final_decision_rule: Some(Rule::new("decision", "decision")),
        }
    }

    #[test]
    fn weighted_sum_maps_to_partial_outcome() {
        // 60*0.6 + 30*0.3 + 10*0.1 = 46 -> PARTIAL (>= 20, < 50).
        let eval = score_evaluator();
        let cfg = scoring_config(RuleSelection::All);

        let mut ctx = ExecutionContext::new();
        let result = execute("scoring", &cfg, &eval, &mut ctx);

        assert!(result.triggered);
        assert_eq!(result.final_outcome, "PARTIAL");
        assert_eq!(result.stage_results.get("totalScore_final"), Some(&Value::Number(46.0)));
        assert_eq!(result.stage_results.get("credit_weighted"), Some(&Value::Number(36.0)));
        assert_eq!(result.stage_results.get("credit_score"), Some(&Value::Number(60.0)));
        assert_eq!(ctx.get("totalScore"), Some(&Value::Number(46.0)));
    }

    #[test]
    fn weight_threshold_filters_rules() {
        let eval = score_evaluator();
        let cfg = scoring_config(RuleSelection::WeightThreshold {
            weight_threshold: 0.3,
        });

        let mut ctx = ExecutionContext::new();
        let result = execute("scoring", &cfg, &eval, &mut ctx);

        // history (weight 0.1) excluded: total = 36 + 9 = 45.
        assert_eq!(result.stage_results.get("totalScore_final"), Some(&Value::Number(45.0)));
        assert_eq!(
            result.stage_results.get("rules_selected_for_execution"),
            Some(&Value::Number(2.0))
        );
    }

    #[test]
    fn top_weighted_keeps_n_highest() {
        let eval = score_evaluator();
        let cfg = scoring_config(RuleSelection::TopWeighted { max_rules: 1 });

        let mut ctx = ExecutionContext::new();
        let result = execute("scoring", &cfg, &eval, &mut ctx);

        assert_eq!(result.execution_path, vec!["credit", "decision"]);
        assert_eq!(result.stage_results.get("totalScore_final"), Some(&Value::Number(36.0)));
    }

    #[test]
    fn priority_based_selection_orders_by_priority() {
        let eval = score_evaluator();
        let mut cfg = scoring_config(RuleSelection::PriorityBased { min_priority: 10 });
        cfg.accumulation_rules[0].priority = 20; // credit excluded
        cfg.accumulation_rules[1].priority = 5;
        cfg.accumulation_rules[2].priority = 1;

        let mut ctx = ExecutionContext::new();
        let result = execute("scoring", &cfg, &eval, &mut ctx);

        assert_eq!(result.execution_path, vec!["history", "income", "decision"]);
    }

    #[test]
    fn dynamic_threshold_uses_context_expression() {
        let eval = score_evaluator();
        let cfg = scoring_config(RuleSelection::DynamicThreshold {
            threshold_expression: "half".to_string(),
        });

        let mut ctx = ExecutionContext::new();
        let result = execute("scoring", &cfg, &eval, &mut ctx);

        // Only credit (0.6) clears the 0.5 threshold.
        assert_eq!(result.stage_results.get("totalScore_final"), Some(&Value::Number(36.0)));
    }

    #[test]
    fn dynamic_threshold_failure_falls_back_to_all() {
        let eval = score_evaluator();
        let cfg = scoring_config(RuleSelection::DynamicThreshold {
            threshold_expression: "nonsense".to_string(),
        });

        let mut ctx = ExecutionContext::new();
        let result = execute("scoring", &cfg, &eval, &mut ctx);
        assert_eq!(result.stage_results.get("totalScore_final"), Some(&Value::Number(46.0)));
    }

    #[test]
    fn failed_rule_contributes_zero() {
        let eval = FnEvaluator::new(|expr: &str, _: &ExecutionContext| match expr {
            "ok" => Ok(Value::Number(10.0)),
            other => Err(EvalError::undefined_variable(other, "x")),
        });
        let cfg = AccumulativeConfig {
            accumulator_variable: "total".to_string(),
            initial_value: 5.0,
            rule_selection: RuleSelection::All,
            accumulation_rules: vec![Rule::new("broken", "broken"), Rule::new("ok", "ok")],
            final_decision_rule: None,
        };

        let mut ctx = ExecutionContext::new();
        let result = execute("c", &cfg, &eval, &mut ctx);

        assert!(result.triggered);
        assert_eq!(result.final_outcome, "ACCUMULATION_COMPLETED");
        assert_eq!(result.stage_results.get("total_final"), Some(&Value::Number(15.0)));
        assert!(result.stage_results.contains_key("broken_error"));
    }
}
