//! `branch` — two-way routing on a pre-evaluated boolean condition.
//! `switch` — n-way routing against a compared value, with a default.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use wf_contracts::ExecutorError;

use crate::registry::{StepExecutor, StepInput, StepResult};
use crate::truthy::is_truthy;

pub struct BranchExecutor;

#[async_trait]
impl StepExecutor for BranchExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let condition = input.resolved_config.get("condition").cloned().unwrap_or(Value::Bool(false));
        let route = if is_truthy(&condition) { "true" } else { "false" };
        Ok(json!({ "route": route, "value": input.input }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwitchMode {
    Equals,
    Contains,
    Regex,
    Expression,
}

impl SwitchMode {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "equals" => Some(Self::Equals),
            "contains" => Some(Self::Contains),
            "regex" => Some(Self::Regex),
            "expression" => Some(Self::Expression),
            _ => None,
        }
    }
}

/// Compares `value` against each case's `match` until one matches, in the
/// mode named by `mode`. `expression` mode ignores `value`: `match` is
/// itself a template expression the engine has already rendered down to a
/// value by the time it reaches here, so the case matches iff that's truthy.
fn case_matches(mode: SwitchMode, value: &Value, candidate: &Value) -> Result<bool, ExecutorError> {
    match mode {
        SwitchMode::Equals => Ok(value == candidate),
        SwitchMode::Contains => Ok(match value {
            Value::Array(items) => items.contains(candidate),
            Value::String(s) => candidate.as_str().map(|c| s.contains(c)).unwrap_or(false),
            _ => false,
        }),
        SwitchMode::Regex => {
            let haystack = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            let pattern = candidate
                .as_str()
                .ok_or_else(|| ExecutorError::new("validation_error", "switch regex mode requires a string 'match'"))?;
            let re = Regex::new(pattern)
                .map_err(|e| ExecutorError::new("validation_error", format!("invalid regex '{pattern}': {e}")))?;
            Ok(re.is_match(&haystack))
        }
        SwitchMode::Expression => Ok(is_truthy(candidate)),
    }
}

pub struct SwitchExecutor;

#[async_trait]
impl StepExecutor for SwitchExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let mode_name = input.resolved_config.get("mode").and_then(Value::as_str).unwrap_or("equals");
        let mode = SwitchMode::parse(mode_name)
            .ok_or_else(|| ExecutorError::new("validation_error", format!("unknown switch mode '{mode_name}'")))?;

        let value = input.resolved_config.get("value").cloned().unwrap_or(Value::Null);
        let cases = input
            .resolved_config
            .get("cases")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for case in &cases {
            let candidate = case.get("match").cloned().unwrap_or(Value::Null);
            if case_matches(mode, &value, &candidate)? {
                let output = case.get("output").and_then(Value::as_str).unwrap_or("default");
                return Ok(json!({ "route": output, "value": input.input }));
            }
        }

        let default_output = input
            .resolved_config
            .get("default_output")
            .and_then(Value::as_str)
            .unwrap_or("default")
            .to_string();
        Ok(json!({ "route": default_output, "value": input.input }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn branch_routes_true_on_truthy_condition() {
        let out = BranchExecutor
            .execute(StepInput {
                resolved_config: json!({ "condition": true }),
                input: json!({ "x": 1 }),
            })
            .await
            .unwrap();
        assert_eq!(out["route"], "true");
    }

    #[tokio::test]
    async fn branch_routes_false_on_falsy_condition() {
        let out = BranchExecutor
            .execute(StepInput {
                resolved_config: json!({ "condition": 0 }),
                input: json!({}),
            })
            .await
            .unwrap();
        assert_eq!(out["route"], "false");
    }

    #[tokio::test]
    async fn switch_equals_picks_first_matching_case() {
        let out = SwitchExecutor
            .execute(StepInput {
                resolved_config: json!({
                    "mode": "equals",
                    "value": "b",
                    "cases": [
                        { "match": "a", "output": "route-a" },
                        { "match": "b", "output": "route-b" },
                    ],
                    "default_output": "fallback",
                }),
                input: json!({}),
            })
            .await
            .unwrap();
        assert_eq!(out["route"], "route-b");
    }

    #[tokio::test]
    async fn switch_contains_matches_substring() {
        let out = SwitchExecutor
            .execute(StepInput {
                resolved_config: json!({
                    "mode": "contains",
                    "value": "hello world",
                    "cases": [{ "match": "world", "output": "found" }],
                }),
                input: json!({}),
            })
            .await
            .unwrap();
        assert_eq!(out["route"], "found");
    }

    #[tokio::test]
    async fn switch_regex_matches_pattern() {
        let out = SwitchExecutor
            .execute(StepInput {
                resolved_config: json!({
                    "mode": "regex",
                    "value": "user-42",
                    "cases": [{ "match": "^user-\\d+$", "output": "numeric" }],
                }),
                input: json!({}),
            })
            .await
            .unwrap();
        assert_eq!(out["route"], "numeric");
    }

    #[tokio::test]
    async fn switch_expression_mode_checks_truthiness_of_match() {
        let out = SwitchExecutor
            .execute(StepInput {
                resolved_config: json!({
                    "mode": "expression",
                    "cases": [
                        { "match": false, "output": "a" },
                        { "match": true, "output": "b" },
                    ],
                }),
                input: json!({}),
            })
            .await
            .unwrap();
        assert_eq!(out["route"], "b");
    }

    #[tokio::test]
    async fn switch_falls_back_to_default_output() {
        let out = SwitchExecutor
            .execute(StepInput {
                resolved_config: json!({ "mode": "equals", "value": "x", "cases": [], "default_output": "fallback" }),
                input: json!({}),
            })
            .await
            .unwrap();
        assert_eq!(out["route"], "fallback");
    }
}
