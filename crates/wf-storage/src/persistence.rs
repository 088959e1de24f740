//! The core's only view of durable storage. Six operations, matching the
//! edit-session authority's and execution engine's actual write/read
//! patterns — not a general-purpose repository interface.

use async_trait::async_trait;
use wf_contracts::{EditOperation, Execution, StepExecution, WorkflowDraft};

use crate::error::StoreError;

#[async_trait]
pub trait Persistence: Send + Sync + 'static {
    /// `Ok(None)` means the workflow has never been snapshotted — a fresh
    /// draft should be created in memory and persisted on first flush.
    async fn load_draft(&self, workflow_id: &str) -> Result<Option<WorkflowDraft>, StoreError>;

    /// Draft snapshots may lag the flush interval behind; `last_persisted_seq`
    /// is stored alongside so recovery knows which operations still need
    /// replaying on top of this snapshot.
    async fn snapshot_draft(&self, draft: &WorkflowDraft, last_persisted_seq: u64) -> Result<(), StoreError>;

    /// Idempotent on `EditOperation::id` — replaying the same batch (e.g.
    /// after a flush retry) must not duplicate rows or advance `seq` twice.
    async fn append_operations(&self, ops: &[EditOperation]) -> Result<(), StoreError>;

    /// Returns the last snapshotted seq and every operation recorded after
    /// it, in seq order, so a recovering session can replay forward from
    /// the snapshot.
    async fn load_pending_ops(&self, workflow_id: &str) -> Result<(u64, Vec<EditOperation>), StoreError>;

    async fn append_step_executions(&self, batch: &[StepExecution]) -> Result<(), StoreError>;

    async fn update_execution(&self, execution: &Execution) -> Result<(), StoreError>;
}
