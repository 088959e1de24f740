//! `aggregate` — the inverse of `split`: folds a per-item fan-out back into
//! one value. One of the documented exceptions to the golden rule: it reads
//! the raw collected per-item inputs (`input.input`), not `resolved_config`,
//! since that's the whole point of aggregation.
//!
//! Each element of `input.input` is `{"value": <item output>, "error": <per-item
//! error, or null>}` — the engine's fan-out shape, mirroring `wf_contracts::Item`.

use async_trait::async_trait;
use serde_json::{json, Value};
use wf_contracts::ExecutorError;

use crate::registry::{StepExecutor, StepInput, StepResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Array,
    First,
    Last,
    GroupBy,
    Summarize,
}

impl Mode {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "array" => Some(Self::Array),
            "first" => Some(Self::First),
            "last" => Some(Self::Last),
            "group_by" => Some(Self::GroupBy),
            "summarize" => Some(Self::Summarize),
            _ => None,
        }
    }
}

pub struct AggregateExecutor;

#[async_trait]
impl StepExecutor for AggregateExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let mode_name = input.resolved_config.get("mode").and_then(Value::as_str).unwrap_or("array");
        let mode = Mode::parse(mode_name)
            .ok_or_else(|| ExecutorError::new("validation_error", format!("unknown aggregate mode '{mode_name}'")))?;
        let include_errors = input.resolved_config.get("include_errors").and_then(Value::as_bool).unwrap_or(false);

        let values: Vec<Value> = input
            .input
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|item| include_errors || item.get("error").map(Value::is_null).unwrap_or(true))
            .map(|item| item.get("value").cloned().unwrap_or(Value::Null))
            .collect();

        let result = match mode {
            Mode::Array => Value::Array(values),
            Mode::First => values.into_iter().next().unwrap_or(Value::Null),
            Mode::Last => values.into_iter().last().unwrap_or(Value::Null),
            Mode::GroupBy => {
                let field = input
                    .resolved_config
                    .get("group_by_field")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ExecutorError::new("validation_error", "group_by mode requires 'group_by_field'"))?;
                let mut groups = serde_json::Map::new();
                for value in values {
                    let key = value.get(field).map(value_as_key).unwrap_or_default();
                    match groups.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
                        Value::Array(arr) => arr.push(value),
                        _ => unreachable!(),
                    }
                }
                Value::Object(groups)
            }
            Mode::Summarize => summarize(&input.resolved_config, &values)?,
        };

        Ok(json!({ "value": result }))
    }
}

fn summarize(config: &Value, values: &[Value]) -> Result<Value, ExecutorError> {
    let field = config.get("field").and_then(Value::as_str);
    let operations: Vec<&str> = config
        .get("operations")
        .and_then(Value::as_array)
        .map(|ops| ops.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if operations.is_empty() {
        return Err(ExecutorError::new("validation_error", "summarize mode requires a non-empty 'operations'"));
    }

    let numbers: Vec<f64> = values
        .iter()
        .filter_map(|value| {
            let scoped = match field {
                Some(f) => value.get(f).cloned().unwrap_or(Value::Null),
                None => value.clone(),
            };
            scoped.as_f64()
        })
        .collect();

    let mut summary = serde_json::Map::new();
    for op in operations {
        let entry = match op {
            "count" => json!(values.len()),
            "sum" => json!(numbers.iter().sum::<f64>()),
            "avg" => {
                if numbers.is_empty() {
                    Value::Null
                } else {
                    json!(numbers.iter().sum::<f64>() / numbers.len() as f64)
                }
            }
            "min" => numbers.iter().copied().fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |m| m.min(n)))).map(|n| json!(n)).unwrap_or(Value::Null),
            "max" => numbers.iter().copied().fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |m| m.max(n)))).map(|n| json!(n)).unwrap_or(Value::Null),
            other => return Err(ExecutorError::new("validation_error", format!("unknown summarize operation '{other}'"))),
        };
        summary.insert(op.to_string(), entry);
    }

    let result = Value::Object(summary);
    Ok(match config.get("output_field").and_then(Value::as_str) {
        Some(wrapper) => json!({ wrapper: result }),
        None => result,
    })
}

fn value_as_key(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(value: Value) -> Value {
        json!({ "value": value, "error": null })
    }

    fn errored_item(value: Value, message: &str) -> Value {
        json!({ "value": value, "error": { "category": "item_error", "message": message } })
    }

    #[tokio::test]
    async fn array_mode_collects_all_items() {
        let out = AggregateExecutor
            .execute(StepInput {
                resolved_config: json!({ "mode": "array" }),
                input: Value::Array(vec![item(json!({"v": 1})), item(json!({"v": 2}))]),
            })
            .await
            .unwrap();
        assert_eq!(out["value"], json!([{"v": 1}, {"v": 2}]));
    }

    #[tokio::test]
    async fn include_errors_defaults_to_excluding_failed_items() {
        let out = AggregateExecutor
            .execute(StepInput {
                resolved_config: json!({ "mode": "array" }),
                input: Value::Array(vec![item(json!(1)), errored_item(json!(2), "boom")]),
            })
            .await
            .unwrap();
        assert_eq!(out["value"], json!([1]));
    }

    #[tokio::test]
    async fn include_errors_true_keeps_failed_items() {
        let out = AggregateExecutor
            .execute(StepInput {
                resolved_config: json!({ "mode": "array", "include_errors": true }),
                input: Value::Array(vec![item(json!(1)), errored_item(json!(2), "boom")]),
            })
            .await
            .unwrap();
        assert_eq!(out["value"], json!([1, 2]));
    }

    #[tokio::test]
    async fn group_by_buckets_items_by_field() {
        let out = AggregateExecutor
            .execute(StepInput {
                resolved_config: json!({ "mode": "group_by", "group_by_field": "kind" }),
                input: Value::Array(vec![item(json!({"kind": "a"})), item(json!({"kind": "b"})), item(json!({"kind": "a"}))]),
            })
            .await
            .unwrap();
        assert_eq!(out["value"]["a"], json!([{"kind": "a"}, {"kind": "a"}]));
    }

    #[tokio::test]
    async fn summarize_computes_requested_operations() {
        let out = AggregateExecutor
            .execute(StepInput {
                resolved_config: json!({
                    "mode": "summarize",
                    "field": "amount",
                    "operations": ["count", "sum", "avg", "min", "max"],
                }),
                input: Value::Array(vec![
                    item(json!({"amount": 10})),
                    item(json!({"amount": 20})),
                    item(json!({"amount": 30})),
                ]),
            })
            .await
            .unwrap();
        assert_eq!(out["value"]["count"], json!(3));
        assert_eq!(out["value"]["sum"], json!(60.0));
        assert_eq!(out["value"]["avg"], json!(20.0));
        assert_eq!(out["value"]["min"], json!(10.0));
        assert_eq!(out["value"]["max"], json!(30.0));
    }

    #[tokio::test]
    async fn summarize_wraps_result_in_output_field_when_set() {
        let out = AggregateExecutor
            .execute(StepInput {
                resolved_config: json!({ "mode": "summarize", "operations": ["count"], "output_field": "stats" }),
                input: Value::Array(vec![item(json!(1)), item(json!(2))]),
            })
            .await
            .unwrap();
        assert_eq!(out["value"]["stats"]["count"], json!(2));
    }

    #[tokio::test]
    async fn summarize_without_operations_is_a_validation_error() {
        let err = AggregateExecutor
            .execute(StepInput {
                resolved_config: json!({ "mode": "summarize" }),
                input: Value::Array(vec![]),
            })
            .await
            .unwrap_err();
        assert_eq!(err.category, "validation_error");
    }
}
