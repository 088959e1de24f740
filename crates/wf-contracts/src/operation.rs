//! EditOperation and the operation vocabulary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{OperationId, UserId, WorkflowId};
use crate::step::{Connection, Step};

/// One JSON-patch-shaped mutation applied to a step's config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOp {
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

/// Changes carried by `update_step_metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepMetadataChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Map<String, Value>>,
}

/// Disable mode for `disable_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisableMode {
    /// Drops the step from the execution subgraph entirely.
    Exclude,
    /// Leaves the step in the graph but short-circuits it with a skip token.
    Skip,
}

impl Default for DisableMode {
    fn default() -> Self {
        DisableMode::Exclude
    }
}

/// The closed set of operation kinds a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationPayload {
    AddStep { step: Step },
    RemoveStep { step_id: String },
    UpdateStepConfig { step_id: String, patch: Vec<PatchOp> },
    UpdateStepPosition { step_id: String, position: crate::step::Position },
    UpdateStepMetadata { step_id: String, changes: StepMetadataChanges },
    AddConnection { connection: Connection },
    RemoveConnection { connection_id: String },
    PinStepOutput { step_id: String, output_data: Value },
    UnpinStepOutput { step_id: String },
    DisableStep { step_id: String, #[serde(default)] mode: DisableMode },
    EnableStep { step_id: String },
}

/// One client-originated change submitted to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditOperation {
    pub id: OperationId,
    pub workflow_id: WorkflowId,
    pub user_id: UserId,
    #[serde(default)]
    pub client_seq: Option<u64>,
    pub payload: OperationPayload,
    /// Assigned by the session authority on apply; 0 until applied.
    #[serde(default)]
    pub seq: u64,
    pub inserted_at: chrono::DateTime<chrono::Utc>,
}

/// Outcome of submitting an operation to the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationOutcome {
    Applied { seq: u64 },
    Duplicate { seq: u64 },
}
