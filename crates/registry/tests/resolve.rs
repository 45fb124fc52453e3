//! Integration tests: resolve multi-file YAML configurations from disk and
//! execute the result.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use ruleflow_core::{
    EvalError, ExecutionContext, Evaluator, FnEvaluator, Orchestrator, Value,
};
use ruleflow_registry::{resolve_root, ResolveError, SharedRegistry};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[test]
fn resolves_rules_across_directories() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "root.yml",
        r#"
rules:
  - id: local-check
    condition: "localOk"
rule-refs:
  - path: shared/compliance.yml
"#,
    );
    write(
        dir.path(),
        "shared/compliance.yml",
        r#"
rules:
  - id: kyc
    condition: "kycVerified"
  - id: sanctions
    condition: "sanctionsClear"
rule-groups:
  - id: compliance-bundle
    operator: AND
    references:
      - kyc
      - sanctions
rule-refs:
  - path: ../root.yml
"#,
    );

    let registry = resolve_root(&dir.path().join("root.yml")).unwrap();
    assert_eq!(registry.rules().len(), 3);
    assert!(registry.group("compliance-bundle").is_some());
}

#[test]
fn cross_file_cycle_between_groups_is_rejected() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "root.yml",
        r#"
rule-groups:
  - id: outer
    operator: AND
    references:
      - group: inner
rule-refs:
  - path: inner.yml
"#,
    );
    write(
        dir.path(),
        "inner.yml",
        r#"
rule-groups:
  - id: inner
    operator: OR
    references:
      - group: outer
"#,
    );

    let err = resolve_root(&dir.path().join("root.yml")).unwrap_err();
    let ResolveError::CircularReference { path } = err else {
        panic!("expected circular reference, got {err:?}");
    };
    assert!(path.contains("outer"));
    assert!(path.contains("inner"));
}

#[test]
fn resolved_configuration_executes_end_to_end() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "root.yml",
        r#"
rule-chains:
  - id: fee-calculation
    pattern: sequential-dependency
    configuration:
      stages:
        - rule:
            id: base-fee
            condition: "amount * 0.01"
          output-variable: baseFee
        - rule:
            id: final-fee
            condition: "baseFee * 0.8"
          output-variable: finalFee
rule-refs:
  - path: checks.yml
"#,
    );
    write(
        dir.path(),
        "checks.yml",
        r#"
rule-chains:
  - id: limit-check
    priority: 1
    pattern: conditional-chaining
    configuration:
      trigger-rule:
        id: over-limit
        condition: "amount > 10000"
"#,
    );

    let registry = resolve_root(&dir.path().join("root.yml")).unwrap();

    let evaluator: Arc<dyn Evaluator> =
        Arc::new(FnEvaluator::new(|expr: &str, ctx: &ExecutionContext| {
            let number = |name: &str| {
                ctx.get(name)
                    .and_then(Value::as_number)
                    .ok_or_else(|| EvalError::undefined_variable(expr, name))
            };
            match expr {
                "amount * 0.01" => Ok(Value::Number(number("amount")? * 0.01)),
                "baseFee * 0.8" => Ok(Value::Number(number("baseFee")? * 0.8)),
                "amount > 10000" => Ok(Value::Bool(number("amount")? > 10_000.0)),
                other => Err(EvalError::new(other, "unknown expression")),
            }
        }));

    let orch = Orchestrator::new(Arc::new(registry), evaluator);
    let mut ctx = ExecutionContext::from_vars([("amount", 5_000.0)]);
    let result = orch.run_all(&mut ctx, None);

    assert!(result.all_succeeded());
    // limit-check has priority 1, fee-calculation the default 100.
    assert_eq!(result.chain_results[0].chain_id, "limit-check");
    assert_eq!(result.chain_results[1].chain_id, "fee-calculation");
    assert_eq!(ctx.get("finalFee"), Some(&Value::Number(40.0)));
}

#[test]
fn hot_reload_swaps_snapshot_without_disturbing_readers() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "root.yml",
        "rules:\n  - id: first\n    condition: \"a\"\n",
    );

    let shared = SharedRegistry::load(dir.path().join("root.yml")).unwrap();
    let held = shared.snapshot();

    write(
        dir.path(),
        "root.yml",
        "rules:\n  - id: first\n    condition: \"a\"\n  - id: second\n    condition: \"b\"\n",
    );
    shared.reload().unwrap();

    assert!(held.rule("second").is_none());
    assert!(shared.snapshot().rule("second").is_some());
}
