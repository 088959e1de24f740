//! Builds the fixed template context and resolves a step's templated
//! config against it. `json` is the only thing populated from the
//! triggering token — everything else (`nodes`, `execution`, `workflow`,
//! `variables`, `now`, `today`) is fixed context the engine assembles once
//! per step.

use chrono::Utc;
use serde_json::{json, Map, Value};
use wf_contracts::{Execution, Step, Token, WorkflowDraft};

use crate::error::EngineError;

/// `nodes` is restricted to `upstream` — steps that cannot reach `step_id`
/// are never exposed, even if their output happens to already be known.
pub fn build_context(
    step: &Step,
    input_token: &Token,
    upstream: &std::collections::HashSet<String>,
    outputs: &std::collections::HashMap<String, Value>,
    draft: &WorkflowDraft,
    execution: &Execution,
) -> Value {
    let nodes: Map<String, Value> = outputs
        .iter()
        .filter(|(id, _)| upstream.contains(id.as_str()))
        .map(|(id, v)| (id.clone(), json!({ "json": v.clone() })))
        .collect();

    let now = Utc::now();

    json!({
        "json": input_token.as_json(),
        "nodes": Value::Object(nodes),
        "execution": {
            "id": execution.id,
            "workflow_id": execution.workflow_id,
            "trigger": execution.trigger,
            "status": execution.status,
            "metadata": execution.trigger.data.get("metadata").cloned().unwrap_or(json!({})),
        },
        "workflow": {
            "id": draft.workflow_id,
            "settings": draft.settings,
        },
        "variables": draft.settings.get("variables").cloned().unwrap_or(json!({})),
        "now": now.to_rfc3339(),
        "today": now.format("%Y-%m-%d").to_string(),
    })
}

pub fn resolve_config(step: &Step, context: &Value) -> Result<Value, EngineError> {
    let raw = Value::Object(step.config.clone());
    let resolved = wf_template::evaluate_deep_sync(&raw, context)?;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_contracts::{ExecutionType, Position, TriggerSpec};

    fn step() -> Step {
        Step {
            id: "s1".into(),
            type_id: "debug".into(),
            name: "s1".into(),
            position: Position { x: 0.0, y: 0.0 },
            config: serde_json::from_value(json!({ "echo": "{{ json.name }}" })).unwrap(),
            notes: None,
        }
    }

    #[test]
    fn resolve_config_renders_templated_fields() {
        let draft = WorkflowDraft::new("wf-1");
        let execution = Execution::new("wf-1".into(), TriggerSpec { trigger_type: "manual".into(), data: json!({}) }, ExecutionType::Production);
        let token = Token::data(json!({ "name": "Ada" }));
        let ctx = build_context(&step(), &token, &Default::default(), &Default::default(), &draft, &execution);
        let resolved = resolve_config(&step(), &ctx).unwrap();
        assert_eq!(resolved["echo"], json!("Ada"));
    }
}
