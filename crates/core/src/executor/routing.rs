//! Result-based routing: a router rule's result value selects which route's
//! rules execute.

use tracing::debug;

use crate::context::ExecutionContext;
use crate::evaluator::Evaluator;
use crate::model::RoutingConfig;
use crate::result::ChainResult;

use super::run_rule;

const PATTERN: &str = "result-based-routing";

/// Evaluate the router rule, stringify its result, and run the rules of the
/// matching route as a conjunction. The route key becomes the final outcome.
///
/// A result with no matching route is a configuration-level error.
pub(super) fn execute(
    chain_id: &str,
    cfg: &RoutingConfig,
    evaluator: &dyn Evaluator,
    ctx: &ExecutionContext,
) -> ChainResult {
    let mut result = ChainResult::new(chain_id, PATTERN);

    let key = match evaluator.evaluate(&cfg.router_rule.condition, ctx) {
        Ok(value) => value.to_string(),
        Err(e) => {
            return ChainResult::failure(
                chain_id,
                PATTERN,
                format!("router rule '{}' failed: {}", cfg.router_rule.id, e),
            );
        }
    };
    result.record_rule(&cfg.router_rule.id, true);
    result.set_stage("route_key", key.clone());
    debug!(chain_id, router = %cfg.router_rule.id, route = %key, "route selected");

    let route = match cfg.routes.get(&key) {
        Some(rules) => rules,
        None => {
            return ChainResult::failure(
                chain_id,
                PATTERN,
                format!("no matching route for key '{}'", key),
            );
        }
    };

    let mut conjunction = true;
    for rule in route {
        conjunction &= run_rule(rule, evaluator, ctx, &mut result);
    }

    result.triggered = conjunction;
    result.final_outcome = key;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{EvalError, FnEvaluator};
    use crate::model::Rule;
    use crate::value::Value;
    use indexmap::IndexMap;

    fn tier_config() -> RoutingConfig {
        let mut routes = IndexMap::new();
        routes.insert(
            "premium".to_string(),
            vec![Rule::new("premium-limit", "premium-limit")],
        );
        routes.insert(
            "standard".to_string(),
            vec![
                Rule::new("standard-limit", "standard-limit"),
                Rule::new("standard-review", "standard-review"),
            ],
        );
        RoutingConfig {
            router_rule: Rule::new("tier", "tier"),
            routes,
        }
    }

    #[test]
    fn router_result_selects_route() {
        let eval = FnEvaluator::new(|expr: &str, _: &ExecutionContext| match expr {
            "tier" => Ok(Value::from("premium")),
            "premium-limit" => Ok(Value::Bool(true)),
            other => Err(EvalError::new(other, "unknown expression")),
        });

        let result = execute("c", &tier_config(), &eval, &ExecutionContext::new());

        assert!(result.triggered);
        assert_eq!(result.final_outcome, "premium");
        assert_eq!(result.execution_path, vec!["tier", "premium-limit"]);
        assert_eq!(result.stage_results.get("route_key"), Some(&Value::from("premium")));
    }

    #[test]
    fn route_rules_run_as_conjunction() {
        let eval = FnEvaluator::new(|expr: &str, _: &ExecutionContext| match expr {
            "tier" => Ok(Value::from("standard")),
            "standard-limit" => Ok(Value::Bool(false)),
            "standard-review" => Ok(Value::Bool(true)),
            other => Err(EvalError::new(other, "unknown expression")),
        });

        let result = execute("c", &tier_config(), &eval, &ExecutionContext::new());

        assert!(!result.triggered);
        assert_eq!(result.final_outcome, "standard");
        // Both route rules evaluated, no short-circuit.
        assert_eq!(result.rules_evaluated, 3);
    }

    #[test]
    fn numeric_router_result_matches_stringified_key() {
        let mut routes = IndexMap::new();
        routes.insert("2".to_string(), vec![Rule::new("r", "r")]);
        let cfg = RoutingConfig {
            router_rule: Rule::new("count", "count"),
            routes,
        };
        let eval = FnEvaluator::new(|expr: &str, _: &ExecutionContext| match expr {
            "count" => Ok(Value::Number(2.0)),
            _ => Ok(Value::Bool(true)),
        });

        let result = execute("c", &cfg, &eval, &ExecutionContext::new());
        assert_eq!(result.final_outcome, "2");
        assert!(result.triggered);
    }

    #[test]
    fn unmatched_key_is_a_failure_result() {
        let eval = FnEvaluator::new(|expr: &str, _: &ExecutionContext| match expr {
            "tier" => Ok(Value::from("vip")),
            other => Err(EvalError::new(other, "unknown expression")),
        });

        let result = execute("c", &tier_config(), &eval, &ExecutionContext::new());

        assert!(!result.triggered);
        assert_eq!(
            result.error_message.as_deref(),
            Some("no matching route for key 'vip'")
        );
    }

    #[test]
    fn router_error_is_a_failure_result() {
        let eval = FnEvaluator::new(|expr: &str, _: &ExecutionContext| {
            Err(EvalError::undefined_variable(expr, "tier"))
        });

        let result = execute("c", &tier_config(), &eval, &ExecutionContext::new());
        assert!(!result.triggered);
        assert!(result.error_message.as_deref().unwrap().contains("router rule"));
    }
}
