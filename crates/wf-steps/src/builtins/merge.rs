//! `merge` — joins multiple upstream branches back together. `mode`
//! (`wait_any`/`wait_all`/`combine`) decides which parents the engine hands
//! this executor in the first place — that bookkeeping lives in the drive
//! loop, since it needs the graph to know how many parents to expect. This
//! executor only implements `combine_strategy` over whatever parent set it
//! was handed.

use async_trait::async_trait;
use serde_json::{json, Value};
use wf_contracts::ExecutorError;

use crate::registry::{StepExecutor, StepInput, StepResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineStrategy {
    First,
    Merge,
    Append,
    Object,
}

impl CombineStrategy {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "first" => Some(Self::First),
            "merge" => Some(Self::Merge),
            "append" => Some(Self::Append),
            "object" => Some(Self::Object),
            _ => None,
        }
    }
}

/// Recursively merges `overlay` into `base`: objects merge key by key,
/// anything else (including a scalar/object type mismatch) is replaced
/// wholesale by `overlay` — the right-hand side always wins a conflict.
fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (k, v) in overlay_map {
                match base_map.get_mut(k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        base_map.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (base_slot, _) => *base_slot = overlay.clone(),
    }
}

pub struct MergeExecutor;

#[async_trait]
impl StepExecutor for MergeExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let strategy_name = input
            .resolved_config
            .get("combine_strategy")
            .and_then(Value::as_str)
            .unwrap_or("append");
        let strategy = CombineStrategy::parse(strategy_name)
            .ok_or_else(|| ExecutorError::new("validation_error", format!("unknown combine_strategy '{strategy_name}'")))?;

        // `input.input` is the engine-assembled array of parent outputs,
        // each `{ "source_step_id": ..., "value": ... }`.
        let parents = input.input.as_array().cloned().unwrap_or_default();

        let combined = match strategy {
            CombineStrategy::First => parents.first().and_then(|p| p.get("value")).cloned().unwrap_or(Value::Null),
            CombineStrategy::Append => Value::Array(
                parents
                    .iter()
                    .map(|p| p.get("value").cloned().unwrap_or(Value::Null))
                    .collect(),
            ),
            CombineStrategy::Merge => {
                let mut merged = Value::Object(serde_json::Map::new());
                for parent in &parents {
                    if let Some(value) = parent.get("value") {
                        deep_merge(&mut merged, value);
                    }
                }
                merged
            }
            CombineStrategy::Object => {
                let mut obj = serde_json::Map::new();
                for parent in &parents {
                    let key = parent.get("source_step_id").and_then(Value::as_str).unwrap_or("").to_string();
                    obj.insert(key, parent.get("value").cloned().unwrap_or(Value::Null));
                }
                Value::Object(obj)
            }
        };

        Ok(json!({ "value": combined }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent(step: &str, value: Value) -> Value {
        json!({ "source_step_id": step, "value": value })
    }

    #[tokio::test]
    async fn append_collects_values_in_order() {
        let out = MergeExecutor
            .execute(StepInput {
                resolved_config: json!({ "combine_strategy": "append" }),
                input: Value::Array(vec![parent("l", json!(1)), parent("r", json!(2))]),
            })
            .await
            .unwrap();
        assert_eq!(out["value"], json!([1, 2]));
    }

    #[tokio::test]
    async fn merge_strategy_deep_merges_nested_objects() {
        let out = MergeExecutor
            .execute(StepInput {
                resolved_config: json!({ "combine_strategy": "merge" }),
                input: Value::Array(vec![
                    parent("l", json!({"a": {"x": 1, "y": 1}, "top": 1})),
                    parent("r", json!({"a": {"y": 2, "z": 3}, "top": 2})),
                ]),
            })
            .await
            .unwrap();
        assert_eq!(out["value"], json!({ "a": { "x": 1, "y": 2, "z": 3 }, "top": 2 }));
    }

    #[tokio::test]
    async fn object_strategy_keys_by_source_step() {
        let out = MergeExecutor
            .execute(StepInput {
                resolved_config: json!({ "combine_strategy": "object" }),
                input: Value::Array(vec![parent("l", json!(1)), parent("r", json!(2))]),
            })
            .await
            .unwrap();
        assert_eq!(out["value"], json!({ "l": 1, "r": 2 }));
    }

    #[tokio::test]
    async fn first_strategy_takes_only_the_first_parent() {
        let out = MergeExecutor
            .execute(StepInput {
                resolved_config: json!({ "combine_strategy": "first" }),
                input: Value::Array(vec![parent("l", json!("a")), parent("r", json!("b"))]),
            })
            .await
            .unwrap();
        assert_eq!(out["value"], json!("a"));
    }

    #[tokio::test]
    async fn unknown_strategy_is_a_validation_error() {
        let err = MergeExecutor
            .execute(StepInput {
                resolved_config: json!({ "combine_strategy": "bogus" }),
                input: Value::Array(vec![]),
            })
            .await
            .unwrap_err();
        assert_eq!(err.category, "validation_error");
    }
}
