//! `split` — fans a list out into per-item tokens. The executor extracts
//! and shapes the items array; the engine turns the result into a
//! `Token::Items` and drives one `StepExecution` per item downstream.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use wf_contracts::ExecutorError;

use crate::registry::{StepExecutor, StepInput, StepResult};

pub struct SplitExecutor;

#[async_trait]
impl StepExecutor for SplitExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let field = input.resolved_config.get("field").cloned().unwrap_or(Value::Null);
        let raw_items = match field {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => return Err(ExecutorError::new("validation_error", format!("split 'field' must resolve to an array, got {other}"))),
        };

        let flatten = input.resolved_config.get("flatten").and_then(Value::as_bool).unwrap_or(false);
        let include_parent = input.resolved_config.get("include_parent").and_then(Value::as_bool).unwrap_or(false);
        let key_field = input.resolved_config.get("key_field").and_then(Value::as_str);

        let flat: Vec<Value> = if flatten {
            raw_items
                .into_iter()
                .flat_map(|v| match v {
                    Value::Array(inner) => inner,
                    other => vec![other],
                })
                .collect()
        } else {
            raw_items
        };

        let parent_fields = include_parent.then(|| input.input.as_object().cloned()).flatten();

        let items: Vec<Value> = flat
            .into_iter()
            .enumerate()
            .map(|(index, element)| {
                let mut obj = match element {
                    Value::Object(map) => map,
                    other => {
                        let mut map = Map::new();
                        map.insert("value".to_string(), other);
                        map
                    }
                };
                if let Some(parent) = &parent_fields {
                    for (k, v) in parent {
                        obj.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                }
                if let Some(key_field) = key_field {
                    obj.insert(key_field.to_string(), json!(index));
                }
                Value::Object(obj)
            })
            .collect();

        Ok(json!({ "items": items }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn splits_array_into_items() {
        let out = SplitExecutor
            .execute(StepInput {
                resolved_config: json!({ "field": [1, 2, 3] }),
                input: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(out["items"], json!([{"value": 1}, {"value": 2}, {"value": 3}]));
    }

    #[tokio::test]
    async fn empty_list_emits_zero_items() {
        let out = SplitExecutor
            .execute(StepInput {
                resolved_config: json!({ "field": [] }),
                input: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(out["items"], json!([]));
    }

    #[tokio::test]
    async fn non_array_field_is_a_validation_error() {
        let err = SplitExecutor
            .execute(StepInput {
                resolved_config: json!({ "field": "not-a-list" }),
                input: Value::Null,
            })
            .await
            .unwrap_err();
        assert_eq!(err.category, "validation_error");
    }

    #[tokio::test]
    async fn object_elements_pass_through_unwrapped() {
        let out = SplitExecutor
            .execute(StepInput {
                resolved_config: json!({ "field": [{"name": "a"}, {"name": "b"}] }),
                input: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(out["items"], json!([{"name": "a"}, {"name": "b"}]));
    }

    #[tokio::test]
    async fn flatten_merges_nested_arrays_before_splitting() {
        let out = SplitExecutor
            .execute(StepInput {
                resolved_config: json!({ "field": [[1, 2], [3]], "flatten": true }),
                input: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(out["items"], json!([{"value": 1}, {"value": 2}, {"value": 3}]));
    }

    #[tokio::test]
    async fn include_parent_merges_parent_fields_with_item_precedence() {
        let out = SplitExecutor
            .execute(StepInput {
                resolved_config: json!({ "field": [{"name": "a"}], "include_parent": true }),
                input: json!({ "name": "parent", "batch_id": "b1" }),
            })
            .await
            .unwrap();
        assert_eq!(out["items"], json!([{"name": "a", "batch_id": "b1"}]));
    }

    #[tokio::test]
    async fn key_field_stores_the_original_index() {
        let out = SplitExecutor
            .execute(StepInput {
                resolved_config: json!({ "field": ["a", "b"], "key_field": "source_index" }),
                input: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(out["items"][0]["source_index"], json!(0));
        assert_eq!(out["items"][1]["source_index"], json!(1));
    }
}
