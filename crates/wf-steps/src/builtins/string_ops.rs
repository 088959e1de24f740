//! String operations: case conversion, concatenation, split, replace, trim.

use async_trait::async_trait;
use serde_json::{json, Value};
use wf_contracts::ExecutorError;

use crate::registry::{StepExecutor, StepInput, StepResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Upcase,
    Downcase,
    Concatenate,
    Split,
    Replace,
    Trim,
}

impl Op {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "upcase" => Some(Self::Upcase),
            "downcase" => Some(Self::Downcase),
            "concatenate" => Some(Self::Concatenate),
            "split" => Some(Self::Split),
            "replace" => Some(Self::Replace),
            "trim" => Some(Self::Trim),
            _ => None,
        }
    }
}

pub struct StringOpsExecutor;

#[async_trait]
impl StepExecutor for StringOpsExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let config = &input.resolved_config;
        let op_name = config
            .get("operation")
            .and_then(Value::as_str)
            .ok_or_else(|| ExecutorError::new("validation_error", "string ops requires 'operation'"))?;
        let op = Op::parse(op_name)
            .ok_or_else(|| ExecutorError::new("validation_error", format!("unknown string operation '{op_name}'")))?;

        let value = config
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| ExecutorError::new("validation_error", "string ops requires a string 'value'"))?;

        let result = match op {
            Op::Upcase => json!(value.to_uppercase()),
            Op::Downcase => json!(value.to_lowercase()),
            Op::Trim => json!(value.trim()),
            Op::Concatenate => {
                let suffix = config.get("with").and_then(Value::as_str).unwrap_or("");
                json!(format!("{value}{suffix}"))
            }
            Op::Split => {
                let separator = config.get("separator").and_then(Value::as_str).unwrap_or(",");
                json!(value.split(separator).collect::<Vec<_>>())
            }
            Op::Replace => {
                let from = config.get("from").and_then(Value::as_str).unwrap_or("");
                let to = config.get("to").and_then(Value::as_str).unwrap_or("");
                json!(value.replace(from, to))
            }
        };

        Ok(json!({ "value": result }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn split_on_separator() {
        let out = StringOpsExecutor
            .execute(StepInput {
                resolved_config: json!({ "operation": "split", "value": "a,b,c", "separator": "," }),
                input: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(out["value"], json!(["a", "b", "c"]));
    }

    #[tokio::test]
    async fn replace_substitutes_substring() {
        let out = StringOpsExecutor
            .execute(StepInput {
                resolved_config: json!({ "operation": "replace", "value": "foo-bar", "from": "-", "to": "_" }),
                input: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(out["value"], json!("foo_bar"));
    }

    #[tokio::test]
    async fn unknown_operation_is_a_validation_error() {
        let err = StringOpsExecutor
            .execute(StepInput {
                resolved_config: json!({ "operation": "shout", "value": "x" }),
                input: Value::Null,
            })
            .await
            .unwrap_err();
        assert_eq!(err.category, "validation_error");
    }
}
