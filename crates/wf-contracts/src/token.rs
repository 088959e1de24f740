//! Token — the in-flight value flowing between steps. A closed tagged
//! variant, never a pointer — lineage is a list of ids.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::StepId;

pub const DEFAULT_ROUTE: &str = "main";

/// One element of a fan-out expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub index: usize,
    pub value: Value,
    #[serde(default)]
    pub error: Option<crate::error::ExecutorError>,
}

impl Item {
    pub fn new(index: usize, value: Value) -> Self {
        Self {
            index,
            value,
            error: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// The closed set of shapes a Token can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Token {
    /// A scalar/map payload routed by label (default "main").
    Data {
        route: String,
        value: Value,
        lineage: Vec<StepId>,
    },
    /// A fan-out collection of items, resuming scalar mode once aggregated.
    Items {
        route: String,
        items: Vec<Item>,
        lineage: Vec<StepId>,
    },
    /// A "do not run on this branch" marker propagated to children.
    Skip {
        from_step: StepId,
        lineage: Vec<StepId>,
    },
}

impl Token {
    pub fn data(value: Value) -> Self {
        Token::Data {
            route: DEFAULT_ROUTE.to_string(),
            value,
            lineage: Vec::new(),
        }
    }

    pub fn routed(route: impl Into<String>, value: Value) -> Self {
        Token::Data {
            route: route.into(),
            value,
            lineage: Vec::new(),
        }
    }

    pub fn items(items: Vec<Item>) -> Self {
        Token::Items {
            route: DEFAULT_ROUTE.to_string(),
            items,
            lineage: Vec::new(),
        }
    }

    pub fn skip(from_step: impl Into<StepId>) -> Self {
        Token::Skip {
            from_step: from_step.into(),
            lineage: Vec::new(),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Token::Skip { .. })
    }

    pub fn route(&self) -> Option<&str> {
        match self {
            Token::Data { route, .. } | Token::Items { route, .. } => Some(route.as_str()),
            Token::Skip { .. } => None,
        }
    }

    /// The value the template context's `json` root sees for this token:
    /// the scalar value, the items as a JSON array, or `null` for a skip.
    pub fn as_json(&self) -> Value {
        match self {
            Token::Data { value, .. } => value.clone(),
            Token::Items { items, .. } => {
                Value::Array(items.iter().map(|i| i.value.clone()).collect())
            }
            Token::Skip { .. } => Value::Null,
        }
    }

    pub fn push_lineage(&mut self, step_id: StepId) {
        match self {
            Token::Data { lineage, .. }
            | Token::Items { lineage, .. }
            | Token::Skip { lineage, .. } => lineage.push(step_id),
        }
    }

    pub fn lineage(&self) -> &[StepId] {
        match self {
            Token::Data { lineage, .. } | Token::Items { lineage, .. } | Token::Skip { lineage, .. } => lineage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skip_token_as_json_is_null() {
        let t = Token::skip("s1");
        assert_eq!(t.as_json(), Value::Null);
        assert!(t.is_skip());
    }

    #[test]
    fn items_token_as_json_is_array() {
        let t = Token::items(vec![Item::new(0, json!(1)), Item::new(1, json!(2))]);
        assert_eq!(t.as_json(), json!([1, 2]));
    }

    #[test]
    fn lineage_tracks_visited_steps() {
        let mut t = Token::data(json!(1));
        t.push_lineage("a".into());
        t.push_lineage("b".into());
        assert_eq!(t.lineage(), ["a", "b"]);
    }
}
