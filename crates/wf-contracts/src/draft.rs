//! WorkflowDraft — the live, mutable authoring document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::step::{Connection, Step};

pub const LAST_PERSISTED_SEQ_KEY: &str = "last_persisted_seq";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDraft {
    pub workflow_id: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Trigger step ids — a subset of `steps` whose step type is a trigger
    /// kind. Tracked separately so the engine can find entry points without
    /// re-deriving kind from the registry on every plan build.
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub settings: serde_json::Map<String, Value>,
}

impl WorkflowDraft {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            steps: Vec::new(),
            connections: Vec::new(),
            triggers: Vec::new(),
            settings: serde_json::Map::new(),
        }
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn step_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    pub fn has_step(&self, id: &str) -> bool {
        self.steps.iter().any(|s| s.id == id)
    }

    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn last_persisted_seq(&self) -> u64 {
        self.settings
            .get(LAST_PERSISTED_SEQ_KEY)
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    pub fn set_last_persisted_seq(&mut self, seq: u64) {
        self.settings
            .insert(LAST_PERSISTED_SEQ_KEY.to_string(), Value::from(seq));
    }

    /// Remove a step and cascade to every incident connection, in one
    /// operation.
    pub fn remove_step_cascading(&mut self, step_id: &str) {
        self.steps.retain(|s| s.id != step_id);
        self.connections
            .retain(|c| c.source_step_id != step_id && c.target_step_id != step_id);
        self.triggers.retain(|t| t != step_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Step;

    #[test]
    fn remove_step_cascades_to_connections() {
        let mut draft = WorkflowDraft::new("wf-1");
        draft.steps.push(Step::new("a", "debug", "A"));
        draft.steps.push(Step::new("b", "debug", "B"));
        draft
            .connections
            .push(Connection::new("c1", "a", "b"));

        draft.remove_step_cascading("a");

        assert!(!draft.has_step("a"));
        assert!(draft.connections.is_empty());
    }
}
