//! The closed catalog of step types a draft may reference, and the trait
//! every built-in executor implements.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use wf_contracts::ExecutorError;

/// Where a step sits in the authoring palette; purely descriptive, doesn't
/// change execution semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Trigger,
    Action,
    Transform,
    ControlFlow,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepTypeInfo {
    pub type_id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub kind: StepKind,
}

/// Input handed to a step executor. Golden rule: executors read
/// `resolved_config` for everything except the exceptions named per-step
/// below (trigger steps, passthrough/identity transforms, aggregation
/// steps reading the raw collected inputs) — `input` only ever populates
/// the `json` root of the template context before this point, it never
/// leaks into executor logic directly.
#[derive(Debug, Clone)]
pub struct StepInput {
    pub resolved_config: Value,
    pub input: Value,
}

pub type StepResult = Result<Value, ExecutorError>;

#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute(&self, input: StepInput) -> StepResult;
}

#[derive(Clone)]
pub struct StepRegistry {
    info: HashMap<&'static str, StepTypeInfo>,
    executors: HashMap<&'static str, Arc<dyn StepExecutor>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self {
            info: HashMap::new(),
            executors: HashMap::new(),
        }
    }

    pub fn register(&mut self, info: StepTypeInfo, executor: Arc<dyn StepExecutor>) {
        self.executors.insert(info.type_id, executor);
        self.info.insert(info.type_id, info);
    }

    pub fn executor(&self, type_id: &str) -> Option<Arc<dyn StepExecutor>> {
        self.executors.get(type_id).cloned()
    }

    pub fn info(&self, type_id: &str) -> Option<&StepTypeInfo> {
        self.info.get(type_id)
    }

    pub fn list(&self) -> Vec<&StepTypeInfo> {
        self.info.values().collect()
    }

    pub fn is_known(&self, type_id: &str) -> bool {
        self.info.contains_key(type_id)
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        crate::builtins::register_all(&mut registry);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_built_ins() {
        let registry = StepRegistry::default();
        assert!(registry.is_known("http_request"));
        assert!(registry.is_known("branch"));
        assert!(registry.is_known("manual_input"));
    }

    #[test]
    fn unknown_type_is_not_known() {
        let registry = StepRegistry::default();
        assert!(!registry.is_known("not_a_real_type"));
    }
}
