//! One process-wide `Supervisor` holding a session per workflow id,
//! mirroring the in-memory runner's `HashMap<run_id, JoinHandle>` but
//! keyed by workflow and backed by `dashmap` for lock-free concurrent
//! lookups.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use wf_contracts::WorkflowId;
use wf_steps::StepRegistry;
use wf_storage::{Persistence, StoreError};

use crate::actor::SessionActor;
use crate::config::SessionConfig;
use crate::handle::SessionHandle;

struct Entry {
    handle: SessionHandle,
    task: JoinHandle<()>,
    restarted: bool,
}

pub struct Supervisor {
    sessions: DashMap<WorkflowId, Entry>,
    registry: Arc<StepRegistry>,
    persistence: Arc<dyn Persistence>,
    config: SessionConfig,
}

impl Supervisor {
    pub fn new(registry: Arc<StepRegistry>, persistence: Arc<dyn Persistence>, config: SessionConfig) -> Arc<Self> {
        Arc::new(Self { sessions: DashMap::new(), registry, persistence, config })
    }

    /// Returns the running session's handle, starting (and recovering) one
    /// if none is currently active.
    pub async fn get_or_start(self: &Arc<Self>, workflow_id: WorkflowId) -> Result<SessionHandle, StoreError> {
        if let Some(entry) = self.sessions.get(&workflow_id) {
            return Ok(entry.handle.clone());
        }
        self.spawn(workflow_id, false).await
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    async fn spawn(self: &Arc<Self>, workflow_id: WorkflowId, restarted: bool) -> Result<SessionHandle, StoreError> {
        let (tx, rx) = mpsc::channel(64);
        let actor = SessionActor::recover(
            workflow_id.clone(),
            self.registry.clone(),
            self.persistence.clone(),
            self.config.clone(),
            rx,
        )
        .await?;
        let task = tokio::spawn(actor.run());
        let handle = SessionHandle::new(tx);
        self.sessions.insert(workflow_id, Entry { handle: handle.clone(), task, restarted });
        Ok(handle)
    }

    /// Removes sessions whose task has finished, restarting exactly once
    /// any that ended in a panic rather than a clean idle shutdown.
    pub async fn reap(self: &Arc<Self>) {
        let finished: Vec<WorkflowId> =
            self.sessions.iter().filter(|e| e.value().task.is_finished()).map(|e| e.key().clone()).collect();

        for workflow_id in finished {
            let Some((_, entry)) = self.sessions.remove(&workflow_id) else { continue };
            match entry.task.await {
                Ok(()) => {
                    tracing::debug!(%workflow_id, "session exited normally");
                }
                Err(join_err) if join_err.is_panic() && !entry.restarted => {
                    tracing::error!(%workflow_id, "session task panicked, restarting once");
                    if let Err(e) = self.spawn(workflow_id.clone(), true).await {
                        tracing::error!(%workflow_id, error = %e, "failed to restart crashed session");
                    }
                }
                Err(join_err) => {
                    tracing::error!(%workflow_id, error = %join_err, "session task ended abnormally, not restarting again");
                }
            }
        }
    }

    /// Spawns the background watchdog that periodically reaps crashed
    /// sessions. The caller owns the returned handle's lifetime.
    pub fn spawn_watchdog(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let supervisor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                supervisor.reap().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_storage::InMemoryPersistence;

    #[tokio::test]
    async fn get_or_start_reuses_an_existing_session() {
        let supervisor = Supervisor::new(
            Arc::new(StepRegistry::default()),
            Arc::new(InMemoryPersistence::new()),
            SessionConfig::default(),
        );
        let a = supervisor.get_or_start("wf-1".to_string()).await.unwrap();
        let b = supervisor.get_or_start("wf-1".to_string()).await.unwrap();
        assert_eq!(supervisor.active_count(), 1);
        // Both handles address the same mailbox: a shutdown on one is
        // observable from the other.
        a.shutdown().await.unwrap();
        assert!(b.sync(0).await.is_err());
    }
}
