//! Identifier types.
//!
//! Ids that originate from a client (steps, connections, workflows, users,
//! operations) are opaque strings the client is responsible for keeping
//! unique within their scope. Ids the server mints (executions, step
//! executions) are UUIDv7 so they sort by creation time.

use uuid::Uuid;

pub type WorkflowId = String;
pub type StepId = String;
pub type ConnectionId = String;
pub type UserId = String;
pub type OperationId = String;
pub type VersionTag = String;

pub type ExecutionId = Uuid;
pub type StepExecutionId = Uuid;

/// Mint a new server-assigned id, time-ordered.
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}
