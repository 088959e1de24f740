//! `json_parser` — parses a string field into structured JSON.

use async_trait::async_trait;
use serde_json::{json, Value};
use wf_contracts::ExecutorError;

use crate::registry::{StepExecutor, StepInput, StepResult};

pub struct JsonParserExecutor;

#[async_trait]
impl StepExecutor for JsonParserExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let text = input
            .resolved_config
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| ExecutorError::new("validation_error", "json_parser requires a string 'text'"))?;
        let parsed: Value = serde_json::from_str(text)
            .map_err(|e| ExecutorError::new("validation_error", format!("invalid json: {e}")))?;
        Ok(json!({ "value": parsed }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_valid_json() {
        let out = JsonParserExecutor
            .execute(StepInput {
                resolved_config: json!({ "text": "{\"a\":1}" }),
                input: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(out["value"], json!({ "a": 1 }));
    }

    #[tokio::test]
    async fn invalid_json_is_a_validation_error() {
        let err = JsonParserExecutor
            .execute(StepInput {
                resolved_config: json!({ "text": "{not json" }),
                input: Value::Null,
            })
            .await
            .unwrap_err();
        assert_eq!(err.category, "validation_error");
    }
}
