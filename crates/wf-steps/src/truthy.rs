//! Truthiness rule shared by `branch`, `switch`, and `merge`'s
//! ancestor-resolved checks. Matches the template engine's rule so a
//! condition authored as `{{ json.count > 0 }}` behaves the same whether
//! it's rendered in text or read directly off resolved config.

use serde_json::Value;

pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
