//! `math` — a single closed arithmetic operator applied to two resolved
//! operands. No expression parsing here — that's the template engine's job;
//! by the time this executor runs, `lhs`/`rhs` are already numbers.

use async_trait::async_trait;
use serde_json::{json, Value};
use wf_contracts::ExecutorError;

use crate::registry::{StepExecutor, StepInput, StepResult};

pub struct MathExecutor;

#[async_trait]
impl StepExecutor for MathExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let op = input
            .resolved_config
            .get("operator")
            .and_then(Value::as_str)
            .ok_or_else(|| ExecutorError::new("validation_error", "math requires 'operator'"))?;
        let lhs = number_arg(&input.resolved_config, "lhs")?;
        let rhs = number_arg(&input.resolved_config, "rhs")?;

        let result = match op {
            "add" => lhs + rhs,
            "subtract" => lhs - rhs,
            "multiply" => lhs * rhs,
            "divide" => {
                if rhs == 0.0 {
                    return Err(ExecutorError::new("validation_error", "division by zero"));
                }
                lhs / rhs
            }
            "modulo" => {
                if rhs == 0.0 {
                    return Err(ExecutorError::new("validation_error", "modulo by zero"));
                }
                lhs % rhs
            }
            other => return Err(ExecutorError::new("validation_error", format!("unknown math operator '{other}'"))),
        };

        Ok(json!({ "value": result }))
    }
}

fn number_arg(config: &Value, key: &str) -> Result<f64, ExecutorError> {
    config
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ExecutorError::new("validation_error", format!("math requires numeric '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn adds_two_numbers() {
        let out = MathExecutor
            .execute(StepInput {
                resolved_config: json!({ "operator": "add", "lhs": 2, "rhs": 3 }),
                input: Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(out["value"], json!(5.0));
    }

    #[tokio::test]
    async fn divide_by_zero_is_a_validation_error() {
        let err = MathExecutor
            .execute(StepInput {
                resolved_config: json!({ "operator": "divide", "lhs": 1, "rhs": 0 }),
                input: Value::Null,
            })
            .await
            .unwrap_err();
        assert_eq!(err.category, "validation_error");
    }
}
