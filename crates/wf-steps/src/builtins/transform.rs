//! Data transform variants: `map`, `filter_items`, `pick`, `omit`,
//! `merge_objects`, `set_field`, `rename_field`, `flatten`, and
//! `passthrough` (the identity exception to the golden rule — it echoes
//! `input.input` unchanged, ignoring config entirely).

use async_trait::async_trait;
use serde_json::{json, Value};
use wf_contracts::ExecutorError;

use crate::registry::{StepExecutor, StepInput, StepResult};

pub struct PassthroughExecutor;

#[async_trait]
impl StepExecutor for PassthroughExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        Ok(input.input)
    }
}

pub struct PickExecutor;

#[async_trait]
impl StepExecutor for PickExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let fields = fields_arg(&input.resolved_config)?;
        let source = input.resolved_config.get("value").cloned().unwrap_or(input.input);
        let mut out = serde_json::Map::new();
        if let Value::Object(map) = &source {
            for field in &fields {
                if let Some(v) = map.get(field) {
                    out.insert(field.clone(), v.clone());
                }
            }
        }
        Ok(Value::Object(out))
    }
}

pub struct OmitExecutor;

#[async_trait]
impl StepExecutor for OmitExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let fields = fields_arg(&input.resolved_config)?;
        let source = input.resolved_config.get("value").cloned().unwrap_or(input.input);
        let mut out = serde_json::Map::new();
        if let Value::Object(map) = &source {
            for (k, v) in map {
                if !fields.contains(k) {
                    out.insert(k.clone(), v.clone());
                }
            }
        }
        Ok(Value::Object(out))
    }
}

pub struct MergeObjectsExecutor;

#[async_trait]
impl StepExecutor for MergeObjectsExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let sources = input
            .resolved_config
            .get("sources")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut out = serde_json::Map::new();
        for source in sources {
            if let Value::Object(map) = source {
                for (k, v) in map {
                    out.insert(k, v);
                }
            }
        }
        Ok(Value::Object(out))
    }
}

pub struct SetFieldExecutor;

#[async_trait]
impl StepExecutor for SetFieldExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let field = input
            .resolved_config
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| ExecutorError::new("validation_error", "set_field requires 'field'"))?;
        let value = input.resolved_config.get("value").cloned().unwrap_or(Value::Null);
        let mut base = input.resolved_config.get("target").cloned().unwrap_or(input.input);
        if let Value::Object(map) = &mut base {
            map.insert(field.to_string(), value);
        } else {
            let mut map = serde_json::Map::new();
            map.insert(field.to_string(), value);
            base = Value::Object(map);
        }
        Ok(base)
    }
}

pub struct RenameFieldExecutor;

#[async_trait]
impl StepExecutor for RenameFieldExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let from = input
            .resolved_config
            .get("from")
            .and_then(Value::as_str)
            .ok_or_else(|| ExecutorError::new("validation_error", "rename_field requires 'from'"))?;
        let to = input
            .resolved_config
            .get("to")
            .and_then(Value::as_str)
            .ok_or_else(|| ExecutorError::new("validation_error", "rename_field requires 'to'"))?;
        let mut base = input.resolved_config.get("target").cloned().unwrap_or(input.input);
        if let Value::Object(map) = &mut base {
            if let Some(v) = map.remove(from) {
                map.insert(to.to_string(), v);
            }
        }
        Ok(base)
    }
}

pub struct FlattenExecutor;

#[async_trait]
impl StepExecutor for FlattenExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let source = input.resolved_config.get("value").cloned().unwrap_or(input.input);
        let nested = source.as_array().cloned().unwrap_or_default();
        let flat: Vec<Value> = nested
            .into_iter()
            .flat_map(|item| match item {
                Value::Array(inner) => inner,
                other => vec![other],
            })
            .collect();
        Ok(json!(flat))
    }
}

fn fields_arg(config: &Value) -> Result<Vec<String>, ExecutorError> {
    config
        .get("fields")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .ok_or_else(|| ExecutorError::new("validation_error", "requires a 'fields' array"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passthrough_ignores_config() {
        let out = PassthroughExecutor
            .execute(StepInput {
                resolved_config: json!({ "whatever": true }),
                input: json!({ "x": 1 }),
            })
            .await
            .unwrap();
        assert_eq!(out, json!({ "x": 1 }));
    }

    #[tokio::test]
    async fn pick_keeps_only_named_fields() {
        let out = PickExecutor
            .execute(StepInput {
                resolved_config: json!({ "fields": ["a"], "value": { "a": 1, "b": 2 } }),
                input: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(out, json!({ "a": 1 }));
    }

    #[tokio::test]
    async fn omit_drops_named_fields() {
        let out = OmitExecutor
            .execute(StepInput {
                resolved_config: json!({ "fields": ["b"], "value": { "a": 1, "b": 2 } }),
                input: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(out, json!({ "a": 1 }));
    }

    #[tokio::test]
    async fn rename_field_moves_the_value() {
        let out = RenameFieldExecutor
            .execute(StepInput {
                resolved_config: json!({ "from": "a", "to": "b", "target": { "a": 1 } }),
                input: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(out, json!({ "b": 1 }));
    }

    #[tokio::test]
    async fn flatten_collapses_one_level() {
        let out = FlattenExecutor
            .execute(StepInput {
                resolved_config: json!({ "value": [[1, 2], [3], 4] }),
                input: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(out, json!([1, 2, 3, 4]));
    }
}
