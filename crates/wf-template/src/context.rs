//! Dotted-path resolution against the fixed context keys (`json`, `nodes`,
//! `execution`, `workflow`, `variables`, `now`, `today`) plus loop-bound
//! scopes pushed by `{% for %}`. A missing leaf resolves to `Value::Null`
//! rather than erroring — templates render blank, they don't fail, on a
//! missing optional field.

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Context {
    root: Value,
    scopes: Vec<(String, Value)>,
}

impl Context {
    pub fn new(root: Value) -> Self {
        Self { root, scopes: Vec::new() }
    }

    pub fn with_var(&self, name: &str, value: Value) -> Context {
        let mut scopes = self.scopes.clone();
        scopes.push((name.to_string(), value));
        Context {
            root: self.root.clone(),
            scopes,
        }
    }

    pub fn resolve(&self, path: &[String]) -> Value {
        let Some((head, rest)) = path.split_first() else {
            return Value::Null;
        };

        let base = self
            .scopes
            .iter()
            .rev()
            .find(|(name, _)| name == head)
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.root.get(head).cloned().unwrap_or(Value::Null));

        rest.iter().fold(base, |acc, segment| descend(&acc, segment))
    }
}

fn descend(value: &Value, segment: &str) -> Value {
    match value {
        Value::Object(map) => map.get(segment).cloned().unwrap_or(Value::Null),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
