//! Execution engine: restricts a draft's graph to one run's targets,
//! resolves each step's templated config against a fixed context, and
//! drives the DAG to completion level by level.

mod bind;
mod config;
mod drive;
mod error;
mod observability;
mod plan;
mod resource;

pub use bind::{build_context, resolve_config};
pub use config::EngineConfig;
pub use drive::{DriveResult, Driver};
pub use error::EngineError;
pub use observability::{BufferedEventSink, BufferedHooks, EngineHooks, SanitizedEvent, TracingHooks};
pub use plan::Plan;
pub use resource::{ResourceSampler, ResourceUsage};

use std::sync::Arc;

use serde_json::Value;
use wf_contracts::{EditorState, Execution, StepExecution, WorkflowDraft};
use wf_steps::StepRegistry;

/// Owns a step registry and observability hooks; `run` is the one entry
/// point a caller needs — plan, bind, and drive are internal phases.
pub struct ExecutionEngine {
    driver: Driver,
}

impl ExecutionEngine {
    pub fn new(registry: StepRegistry, hooks: Arc<dyn EngineHooks>) -> Self {
        Self::with_config(registry, hooks, EngineConfig::default())
    }

    pub fn with_config(registry: StepRegistry, hooks: Arc<dyn EngineHooks>, config: EngineConfig) -> Self {
        Self {
            driver: Driver::with_config(Arc::new(registry), hooks, config),
        }
    }

    pub async fn run(
        &self,
        draft: &WorkflowDraft,
        editor_state: &EditorState,
        execution: &mut Execution,
        targets: &[String],
        seed_input: Value,
    ) -> Result<Vec<StepExecution>, EngineError> {
        let plan = Plan::build(draft, editor_state, targets)?;
        let result = self.driver.drive(&plan, draft, editor_state, execution, seed_input).await;
        Ok(result.step_executions)
    }

    /// Snapshots resource usage under the given scope label (e.g. a session
    /// or execution id) — a CPU-work counter, process memory/heap figures,
    /// and the size of the last level this engine drove.
    pub fn resource_usage(&self, scope: impl Into<String>) -> ResourceUsage {
        self.driver.resource_usage(scope)
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new(StepRegistry::default(), Arc::new(TracingHooks))
    }
}
