//! `format_string` — substitutes named placeholders `{field}` against the
//! step's resolved config values. Distinct from the template engine's own
//! `{{ }}` syntax: this runs after templating has already resolved config,
//! over a small closed substitution map rather than the full context.

use async_trait::async_trait;
use serde_json::{json, Value};
use wf_contracts::ExecutorError;

use crate::registry::{StepExecutor, StepInput, StepResult};

pub struct FormatStringExecutor;

#[async_trait]
impl StepExecutor for FormatStringExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let template = input
            .resolved_config
            .get("template")
            .and_then(Value::as_str)
            .ok_or_else(|| ExecutorError::new("validation_error", "format_string requires 'template'"))?;
        let values = input.resolved_config.get("values").and_then(Value::as_object);

        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };
            let key = &after[..end];
            let replacement = values
                .and_then(|v| v.get(key))
                .map(value_to_text)
                .unwrap_or_default();
            out.push_str(&replacement);
            rest = &after[end + 1..];
        }
        out.push_str(rest);

        Ok(json!({ "value": out }))
    }
}

fn value_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
