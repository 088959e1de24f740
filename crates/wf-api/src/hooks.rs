//! `POST /api/hooks/:workflow_id/:path` and `POST /api/hook-test/:workflow_id/:path` —
//! the two webhook trigger endpoints. Each workflow's webhook namespace is
//! keyed by `path` alone, but persistence has no reverse index from a path
//! back to a workflow, so this boundary addresses the workflow directly
//! and matches the step by its configured `path` (or id, if unset) within
//! it — see DESIGN.md.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use wf_contracts::{Execution, ExecutionType, TriggerSpec};

use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/hooks/:workflow_id/:path", post(trigger_production))
        .route("/api/hook-test/:workflow_id/:path", post(trigger_test))
        .with_state(state)
}

async fn trigger_production(
    State(state): State<AppState>,
    Path((workflow_id, path)): Path<(String, String)>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    trigger(state, workflow_id, path, connect_info, method, headers, body, ExecutionType::Production).await
}

async fn trigger_test(
    State(state): State<AppState>,
    Path((workflow_id, path)): Path<(String, String)>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    trigger(state, workflow_id, path, connect_info, method, headers, body, ExecutionType::Preview).await
}

async fn trigger(
    state: AppState,
    workflow_id: String,
    path: String,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
    execution_type: ExecutionType,
) -> Result<Json<Value>, StatusCode> {
    let handle = state.supervisor.get_or_start(workflow_id.clone()).await.map_err(|e| {
        tracing::error!(%workflow_id, error = %e, "failed to start session for webhook trigger");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let (draft, editor_state, _seq) = handle.snapshot().await.map_err(|_| StatusCode::NOT_FOUND)?;

    let step = draft
        .triggers
        .iter()
        .filter_map(|id| draft.step(id))
        .find(|step| step.type_id == "webhook" && webhook_path(step) == path)
        .ok_or(StatusCode::NOT_FOUND)?;

    let headers_json: Map<String, Value> = headers
        .iter()
        .map(|(name, value)| (name.to_string(), json!(value.to_str().unwrap_or(""))))
        .collect();
    let remote_addr = connect_info.map(|ConnectInfo(addr)| addr.to_string());

    let seed_input = json!({
        "body": parse_body(&headers, &body),
        "headers": Value::Object(headers_json.clone()),
        "method": method.as_str(),
        "remote_addr": remote_addr,
    });
    let trigger = TriggerSpec {
        trigger_type: "webhook".into(),
        data: json!({
            "metadata": {
                "extras": {
                    "request": {
                        "method": method.as_str(),
                        "headers": Value::Object(headers_json),
                        "remote_addr": remote_addr,
                    }
                }
            }
        }),
    };

    let mut execution = Execution::new(workflow_id, trigger, execution_type);
    let step_executions = state
        .engine
        .run(&draft, &editor_state, &mut execution, &[], seed_input)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "webhook-triggered execution failed to plan");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    state.persistence.append_step_executions(&step_executions).await.map_err(|e| {
        tracing::error!(error = %e, "failed to persist webhook step executions");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    state.persistence.update_execution(&execution).await.map_err(|e| {
        tracing::error!(error = %e, "failed to persist webhook execution record");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let output = step_executions.iter().find(|se| se.step_id == step.id).map(|se| se.output.clone());
    Ok(Json(json!({ "execution_id": execution.id, "status": execution.status, "output": output })))
}

fn webhook_path(step: &wf_contracts::Step) -> String {
    step.config.get("path").and_then(Value::as_str).map(str::to_string).unwrap_or_else(|| step.id.clone())
}

fn parse_body(headers: &HeaderMap, body: &Bytes) -> Value {
    let content_type = headers.get(axum::http::header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("");
    if content_type.contains("application/json") {
        serde_json::from_slice(body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
    } else if content_type.contains("application/x-www-form-urlencoded") {
        let map: Map<String, Value> =
            form_urlencoded::parse(body).map(|(k, v)| (k.into_owned(), json!(v.into_owned()))).collect();
        Value::Object(map)
    } else {
        Value::String(String::from_utf8_lossy(body).into_owned())
    }
}
