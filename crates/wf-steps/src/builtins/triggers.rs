//! Trigger steps — the documented exception to the golden rule: they read
//! the execution's seed input directly rather than a templated config,
//! since there's nothing upstream to template against.

use async_trait::async_trait;
use serde_json::{json, Value};
use wf_contracts::ExecutorError;

use crate::registry::{StepExecutor, StepInput, StepResult};

/// `manual_input` — echoes the execution's seed input verbatim.
pub struct ManualInputExecutor;

#[async_trait]
impl StepExecutor for ManualInputExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        Ok(input.input)
    }
}

/// `webhook` — echoes the triggering request body and records the request
/// under `execution.metadata.extras.request` (the engine populates that
/// metadata before binding this step; the executor just passes the body
/// portion of the seed input through unchanged).
pub struct WebhookExecutor;

#[async_trait]
impl StepExecutor for WebhookExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        Ok(input.input.get("body").cloned().unwrap_or(input.input))
    }
}

/// `schedule` — registered in the catalog so drafts can reference it, but
/// running one requires a cron daemon external to this process. Invoking it
/// directly always fails; a real deployment wires a scheduler that calls
/// the execution engine on a timer instead of relying on this handler.
pub struct ScheduleExecutor;

#[async_trait]
impl StepExecutor for ScheduleExecutor {
    async fn execute(&self, _input: StepInput) -> StepResult {
        Err(ExecutorError::new(
            "not_implemented",
            "schedule triggers require an external cron daemon and cannot be invoked directly",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_input_echoes_seed() {
        let out = ManualInputExecutor
            .execute(StepInput {
                resolved_config: Value::Null,
                input: json!({ "a": 1 }),
            })
            .await
            .unwrap();
        assert_eq!(out, json!({ "a": 1 }));
    }

    #[tokio::test]
    async fn webhook_unwraps_request_body() {
        let out = WebhookExecutor
            .execute(StepInput {
                resolved_config: Value::Null,
                input: json!({ "body": { "event": "ping" }, "headers": {} }),
            })
            .await
            .unwrap();
        assert_eq!(out, json!({ "event": "ping" }));
    }

    #[tokio::test]
    async fn schedule_is_not_implemented() {
        let err = ScheduleExecutor
            .execute(StepInput {
                resolved_config: Value::Null,
                input: Value::Null,
            })
            .await
            .unwrap_err();
        assert_eq!(err.category, "not_implemented");
    }
}
