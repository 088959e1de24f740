//! Shared application state, the `AppState`-over-`Arc` convention used
//! throughout this crate's route modules.

use std::sync::Arc;

use wf_engine::ExecutionEngine;
use wf_session::Supervisor;
use wf_storage::Persistence;

#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    pub persistence: Arc<dyn Persistence>,
    pub engine: Arc<ExecutionEngine>,
}
