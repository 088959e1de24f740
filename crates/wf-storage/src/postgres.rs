//! Postgres-backed `Persistence`. Schema migration tooling is out of
//! scope for this core — the tables below are assumed provisioned by the
//! deployment's own migration runner; this module only reads and writes
//! them.
//!
//! ```sql
//! CREATE TABLE wf_drafts (
//!     workflow_id TEXT PRIMARY KEY,
//!     draft JSONB NOT NULL,
//!     last_persisted_seq BIGINT NOT NULL
//! );
//! CREATE TABLE wf_operations (
//!     id TEXT PRIMARY KEY,
//!     workflow_id TEXT NOT NULL,
//!     seq BIGINT NOT NULL,
//!     record JSONB NOT NULL
//! );
//! CREATE INDEX wf_operations_workflow_seq ON wf_operations (workflow_id, seq);
//! CREATE TABLE wf_step_executions (
//!     id UUID PRIMARY KEY,
//!     execution_id UUID NOT NULL,
//!     record JSONB NOT NULL
//! );
//! CREATE TABLE wf_executions (
//!     id UUID PRIMARY KEY,
//!     workflow_id TEXT NOT NULL,
//!     record JSONB NOT NULL
//! );
//! ```

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, error, instrument, warn};
use wf_contracts::{EditOperation, Execution, StepExecution, WorkflowDraft};

use crate::config::StorageConfig;
use crate::error::StoreError;
use crate::persistence::Persistence;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
    config: StorageConfig,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, StorageConfig::default())
    }

    pub fn with_config(pool: PgPool, config: StorageConfig) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Retries a fallible write with the configured backoff. Read paths
    /// are not retried here — a stale read just means the caller falls
    /// back to `load_pending_ops`' replay-from-zero path.
    async fn with_retry<T, F, Fut>(&self, op: &str, mut f: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 1;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if self.config.retry.has_attempts_remaining(attempt) => {
                    let delay = self.config.retry.delay_for_attempt(attempt + 1);
                    warn!(%op, attempt, ?delay, error = %e, "retrying persistence write");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Persistence for PostgresPersistence {
    #[instrument(skip(self))]
    async fn load_draft(&self, workflow_id: &str) -> Result<Option<WorkflowDraft>, StoreError> {
        let row = sqlx::query("SELECT draft FROM wf_drafts WHERE workflow_id = $1")
            .bind(workflow_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to load draft: {e}");
                StoreError::Database(e.to_string())
            })?;

        row.map(|row| {
            let value: serde_json::Value = row.get("draft");
            serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
        })
        .transpose()
    }

    #[instrument(skip(self, draft))]
    async fn snapshot_draft(&self, draft: &WorkflowDraft, last_persisted_seq: u64) -> Result<(), StoreError> {
        let payload = serde_json::to_value(draft).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.with_retry("snapshot_draft", || async {
            sqlx::query(
                r#"
                INSERT INTO wf_drafts (workflow_id, draft, last_persisted_seq)
                VALUES ($1, $2, $3)
                ON CONFLICT (workflow_id) DO UPDATE SET draft = EXCLUDED.draft, last_persisted_seq = EXCLUDED.last_persisted_seq
                "#,
            )
            .bind(&draft.workflow_id)
            .bind(&payload)
            .bind(last_persisted_seq as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to snapshot draft: {e}");
                StoreError::Database(e.to_string())
            })?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self, ops))]
    async fn append_operations(&self, ops: &[EditOperation]) -> Result<(), StoreError> {
        self.with_retry("append_operations", || async {
            let mut tx = self.pool.begin().await.map_err(|e| StoreError::Database(e.to_string()))?;
            for op in ops {
                let payload = serde_json::to_value(op).map_err(|e| StoreError::Serialization(e.to_string()))?;
                sqlx::query(
                    r#"
                    INSERT INTO wf_operations (id, workflow_id, seq, record)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (id) DO NOTHING
                    "#,
                )
                .bind(&op.id)
                .bind(&op.workflow_id)
                .bind(op.seq as i64)
                .bind(&payload)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
            }
            tx.commit().await.map_err(|e| StoreError::Database(e.to_string()))?;
            Ok(())
        })
        .await?;
        debug!(count = ops.len(), "appended operations");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_pending_ops(&self, workflow_id: &str) -> Result<(u64, Vec<EditOperation>), StoreError> {
        let last_persisted_seq: i64 = sqlx::query("SELECT last_persisted_seq FROM wf_drafts WHERE workflow_id = $1")
            .bind(workflow_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|row| row.get("last_persisted_seq"))
            .unwrap_or(0);

        let rows = sqlx::query(
            r#"
            SELECT record FROM wf_operations
            WHERE workflow_id = $1 AND seq > $2
            ORDER BY seq
            "#,
        )
        .bind(workflow_id)
        .bind(last_persisted_seq)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to load pending operations: {e}");
            StoreError::Database(e.to_string())
        })?;

        let mut ops = Vec::with_capacity(rows.len());
        for row in rows {
            let value: serde_json::Value = row.get("record");
            ops.push(serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))?);
        }
        Ok((last_persisted_seq as u64, ops))
    }

    #[instrument(skip(self, batch))]
    async fn append_step_executions(&self, batch: &[StepExecution]) -> Result<(), StoreError> {
        self.with_retry("append_step_executions", || async {
            let mut tx = self.pool.begin().await.map_err(|e| StoreError::Database(e.to_string()))?;
            for step_execution in batch {
                let payload =
                    serde_json::to_value(step_execution).map_err(|e| StoreError::Serialization(e.to_string()))?;
                sqlx::query(
                    r#"
                    INSERT INTO wf_step_executions (id, execution_id, record)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (id) DO UPDATE SET record = EXCLUDED.record
                    "#,
                )
                .bind(step_execution.id)
                .bind(step_execution.execution_id)
                .bind(&payload)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
            }
            tx.commit().await.map_err(|e| StoreError::Database(e.to_string()))?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self, execution))]
    async fn update_execution(&self, execution: &Execution) -> Result<(), StoreError> {
        let payload = serde_json::to_value(execution).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.with_retry("update_execution", || async {
            sqlx::query(
                r#"
                INSERT INTO wf_executions (id, workflow_id, record)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET record = EXCLUDED.record
                "#,
            )
            .bind(execution.id)
            .bind(&execution.workflow_id)
            .bind(&payload)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to update execution: {e}");
                StoreError::Database(e.to_string())
            })?;
            Ok(())
        })
        .await
    }
}
