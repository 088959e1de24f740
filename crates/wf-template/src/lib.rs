//! Restricted templating: `{{ path | filter: arg }}` expressions and
//! `{% if %}...{% else %}...{% endif %}` / `{% for x in list %}...{% endfor %}`
//! blocks over a fixed context, with a closed filter library — no escape
//! hatch to arbitrary code.

mod ast;
mod context;
mod error;
mod eval;
mod filters;
mod lexer;
mod parser;

pub use ast::{CmpOp, Expr, FilterCall, Node};
pub use context::Context;
pub use error::TemplateError;

use serde_json::Value;
use std::time::Duration;

/// Evaluation deadline enforced by `evaluate` / `evaluate_deep` — guards
/// against a `{% for %}` over an unexpectedly large collection running away.
pub const EVAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Renders `template` against `context`, returning the concatenated text.
pub async fn evaluate(template: &str, context: Value) -> Result<String, TemplateError> {
    let template = template.to_string();
    run_with_deadline(move || render_sync(&template, &context)).await
}

/// Synchronous, non-deadlined render. Exposed for callers that already run
/// inside their own bounded worker (e.g. a step executor invoked from a
/// worker pool slot).
pub fn render_sync(template: &str, context: &Value) -> Result<String, TemplateError> {
    let nodes = parser_parse(template)?;
    let ctx = context::Context::new(context.clone());
    eval::render_nodes(&nodes, &ctx)
}

/// Walks `value` and renders any string leaf as a template. A leaf that is
/// *exactly* one `{{ expr }}` (no surrounding text) resolves to its typed
/// value instead of a string — so `"{{ json.price }}"` yields a number.
pub async fn evaluate_deep(value: Value, context: Value) -> Result<Value, TemplateError> {
    run_with_deadline(move || evaluate_deep_sync(&value, &context)).await
}

pub fn evaluate_deep_sync(value: &Value, context: &Value) -> Result<Value, TemplateError> {
    let ctx = context::Context::new(context.clone());
    deep(value, &ctx)
}

fn deep(value: &Value, ctx: &context::Context) -> Result<Value, TemplateError> {
    match value {
        Value::String(s) => {
            let nodes = parser_parse(s)?;
            eval::eval_string_leaf(&nodes, ctx)
        }
        Value::Array(items) => items.iter().map(|v| deep(v, ctx)).collect::<Result<Vec<_>, _>>().map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), deep(v, ctx)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn parser_parse(template: &str) -> Result<Vec<Node>, TemplateError> {
    parser::parse(template)
}

async fn run_with_deadline<T, F>(f: F) -> Result<T, TemplateError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, TemplateError> + Send + 'static,
{
    match tokio::time::timeout(EVAL_TIMEOUT, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(result)) => result,
        Ok(Err(_join_err)) => Err(TemplateError::Timeout),
        Err(_elapsed) => Err(TemplateError::Timeout),
    }
}
