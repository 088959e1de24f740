//! `debug` — identity passthrough that logs its input; used to inspect a
//! pipeline mid-run without altering the token flowing through it.
//! `wait` — identity passthrough after a fixed delay.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::registry::{StepExecutor, StepInput, StepResult};

pub struct DebugExecutor;

#[async_trait]
impl StepExecutor for DebugExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        tracing::debug!(input = %input.input, "debug step");
        Ok(input.input)
    }
}

pub struct WaitExecutor;

#[async_trait]
impl StepExecutor for WaitExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let ms = input.resolved_config.get("duration_ms").and_then(Value::as_u64).unwrap_or(0);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        Ok(input.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn debug_passes_input_through() {
        let out = DebugExecutor
            .execute(StepInput {
                resolved_config: Value::Null,
                input: json!({ "x": 1 }),
            })
            .await
            .unwrap();
        assert_eq!(out, json!({ "x": 1 }));
    }

    #[tokio::test]
    async fn wait_with_zero_duration_returns_immediately() {
        let out = WaitExecutor
            .execute(StepInput {
                resolved_config: json!({ "duration_ms": 0 }),
                input: json!("ok"),
            })
            .await
            .unwrap();
        assert_eq!(out, json!("ok"));
    }
}
