//! In-memory `Persistence`, primarily for tests and the single-process CLI
//! runner. Provides the same durability semantics as the Postgres backend
//! for the lifetime of the process — nothing survives a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use wf_contracts::{EditOperation, Execution, StepExecution, WorkflowDraft};

use crate::error::StoreError;
use crate::persistence::Persistence;

struct DraftSnapshot {
    draft: WorkflowDraft,
    last_persisted_seq: u64,
}

#[derive(Default)]
pub struct InMemoryPersistence {
    drafts: RwLock<HashMap<String, DraftSnapshot>>,
    operations: RwLock<HashMap<String, Vec<EditOperation>>>,
    step_executions: RwLock<Vec<StepExecution>>,
    executions: RwLock<HashMap<uuid::Uuid, Execution>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn load_draft(&self, workflow_id: &str) -> Result<Option<WorkflowDraft>, StoreError> {
        Ok(self.drafts.read().get(workflow_id).map(|s| s.draft.clone()))
    }

    async fn snapshot_draft(&self, draft: &WorkflowDraft, last_persisted_seq: u64) -> Result<(), StoreError> {
        self.drafts.write().insert(
            draft.workflow_id.clone(),
            DraftSnapshot {
                draft: draft.clone(),
                last_persisted_seq,
            },
        );
        Ok(())
    }

    async fn append_operations(&self, ops: &[EditOperation]) -> Result<(), StoreError> {
        let mut store = self.operations.write();
        for op in ops {
            let bucket = store.entry(op.workflow_id.clone()).or_default();
            if !bucket.iter().any(|existing| existing.id == op.id) {
                bucket.push(op.clone());
            }
        }
        Ok(())
    }

    async fn load_pending_ops(&self, workflow_id: &str) -> Result<(u64, Vec<EditOperation>), StoreError> {
        let last_persisted_seq = self
            .drafts
            .read()
            .get(workflow_id)
            .map(|s| s.last_persisted_seq)
            .unwrap_or(0);
        let mut pending: Vec<EditOperation> = self
            .operations
            .read()
            .get(workflow_id)
            .map(|ops| ops.iter().filter(|op| op.seq > last_persisted_seq).cloned().collect())
            .unwrap_or_default();
        pending.sort_by_key(|op| op.seq);
        Ok((last_persisted_seq, pending))
    }

    async fn append_step_executions(&self, batch: &[StepExecution]) -> Result<(), StoreError> {
        self.step_executions.write().extend_from_slice(batch);
        Ok(())
    }

    async fn update_execution(&self, execution: &Execution) -> Result<(), StoreError> {
        self.executions.write().insert(execution.id, execution.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wf_contracts::{ExecutionType, OperationPayload, TriggerSpec};

    fn op(id: &str, workflow_id: &str, seq: u64) -> EditOperation {
        EditOperation {
            id: id.into(),
            workflow_id: workflow_id.into(),
            user_id: "u1".into(),
            client_seq: None,
            payload: OperationPayload::RemoveStep { step_id: "s1".into() },
            seq,
            inserted_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn append_operations_is_idempotent_on_id() {
        let store = InMemoryPersistence::new();
        store.append_operations(&[op("op-1", "wf-1", 1)]).await.unwrap();
        store.append_operations(&[op("op-1", "wf-1", 1)]).await.unwrap();
        let (_, pending) = store.load_pending_ops("wf-1").await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn load_pending_ops_filters_by_last_persisted_seq() {
        let store = InMemoryPersistence::new();
        let draft = WorkflowDraft::new("wf-1");
        store.snapshot_draft(&draft, 2).await.unwrap();
        store
            .append_operations(&[op("op-1", "wf-1", 1), op("op-2", "wf-1", 2), op("op-3", "wf-1", 3)])
            .await
            .unwrap();

        let (last_persisted_seq, pending) = store.load_pending_ops("wf-1").await.unwrap();
        assert_eq!(last_persisted_seq, 2);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "op-3");
    }

    #[tokio::test]
    async fn load_draft_of_unknown_workflow_is_none() {
        let store = InMemoryPersistence::new();
        assert!(store.load_draft("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_execution_is_last_write_wins() {
        let store = InMemoryPersistence::new();
        let mut execution = Execution::new(
            "wf-1".into(),
            TriggerSpec { trigger_type: "manual".into(), data: json!({}) },
            ExecutionType::Production,
        );
        store.update_execution(&execution).await.unwrap();
        execution.mark_running();
        store.update_execution(&execution).await.unwrap();
        assert!(execution.started_at.is_some());
    }
}
