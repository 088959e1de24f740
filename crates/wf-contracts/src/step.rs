//! Step — a vertex in the workflow DAG.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::StepId;

/// Opaque position hint (canvas coordinates); the core never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub type_id: String,
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub config: serde_json::Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Step {
    pub fn new(id: impl Into<StepId>, type_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            name: name.into(),
            position: Position { x: 0.0, y: 0.0 },
            config: serde_json::Map::new(),
            notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub source_step_id: StepId,
    #[serde(default = "default_label")]
    pub source_output: String,
    pub target_step_id: StepId,
    #[serde(default = "default_label")]
    pub target_input: String,
}

fn default_label() -> String {
    "main".to_string()
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        source_step_id: impl Into<StepId>,
        target_step_id: impl Into<StepId>,
    ) -> Self {
        Self {
            id: id.into(),
            source_step_id: source_step_id.into(),
            source_output: default_label(),
            target_step_id: target_step_id.into(),
            target_input: default_label(),
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source_step_id == self.target_step_id
    }
}
