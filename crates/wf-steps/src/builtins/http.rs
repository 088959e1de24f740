//! `http_request` — the one step type allowed to reach outside the process.
//! Any transport failure (DNS, TLS, connection refused, timeout) is reported
//! as an executor error carrying `category: "transport_error"`, never a
//! panic or a silently-empty response. A non-2xx response is not a
//! transport failure — it's reported as `category: "http_error"` with the
//! response shape in `details`, so a downstream branch can route on it.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use wf_contracts::ExecutorError;

use crate::registry::{StepExecutor, StepInput, StepResult};

pub struct HttpRequestExecutor {
    client: reqwest::Client,
    no_redirect_client: reqwest::Client,
}

impl HttpRequestExecutor {
    pub fn new() -> Self {
        let no_redirect_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client: reqwest::Client::new(),
            no_redirect_client,
        }
    }
}

impl Default for HttpRequestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_method(config: &Value) -> Result<reqwest::Method, ExecutorError> {
    let method = config.get("method").and_then(Value::as_str).unwrap_or("GET").to_uppercase();
    reqwest::Method::from_bytes(method.as_bytes()).map_err(|e| ExecutorError::new("validation_error", format!("invalid http method: {e}")))
}

#[async_trait]
impl StepExecutor for HttpRequestExecutor {
    async fn execute(&self, input: StepInput) -> StepResult {
        let config = input.resolved_config;
        let method = resolve_method(&config)?;
        let url = config
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ExecutorError::new("validation_error", "http_request requires 'url'"))?;
        let timeout_ms = config.get("timeout_ms").and_then(Value::as_u64).unwrap_or(30_000).max(1_000);
        let follow_redirects = config.get("follow_redirects").and_then(Value::as_bool).unwrap_or(true);

        let client = if follow_redirects { &self.client } else { &self.no_redirect_client };
        let mut request = client.request(method, url).timeout(Duration::from_millis(timeout_ms));

        if let Some(headers) = config.get("headers").and_then(Value::as_object) {
            for (key, value) in headers {
                if let Some(v) = value.as_str() {
                    request = request.header(key, v);
                }
            }
        }

        if let Some(body) = config.get("body") {
            if !body.is_null() {
                request = request.json(body);
            }
        }

        let response = request.send().await.map_err(|e| ExecutorError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers: serde_json::Map<String, Value> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v.to_str().unwrap_or(""))))
            .collect();
        let bytes = response.bytes().await.map_err(|e| ExecutorError::transport(e.to_string()))?;
        let body: Value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        let ok = (200..300).contains(&status);
        let output = json!({ "status": status, "headers": Value::Object(headers), "body": body, "ok": ok });

        if ok {
            Ok(output)
        } else {
            Err(ExecutorError::new("http_error", format!("http request returned status {status}")).with_details(output))
        }
    }
}
