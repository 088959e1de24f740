//! Public, cloneable front door to a running session — every method sends
//! a `Command` and awaits its reply, hiding the mailbox and oneshot
//! plumbing from callers (`wf-api` handlers, the supervisor, tests).

use tokio::sync::{broadcast, mpsc, oneshot};
use wf_contracts::{
    EditOperation, EditorState, OperationOutcome, PresenceUpdate, StepId, SyncResponse, UserId, UserPresence,
    ValidationError, WorkflowDraft,
};

use crate::actor::Command;
use crate::events::SessionEvent;

/// Channel closed — the session task panicked or was torn down out from
/// under this handle.
#[derive(Debug, thiserror::Error)]
#[error("session actor is no longer running")]
pub struct SessionGone;

#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    pub(crate) fn new(tx: mpsc::Sender<Command>) -> Self {
        Self { tx }
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, SessionGone> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(make(reply_tx)).await.map_err(|_| SessionGone)?;
        reply_rx.await.map_err(|_| SessionGone)
    }

    pub async fn submit(&self, op: EditOperation) -> Result<Result<OperationOutcome, ValidationError>, SessionGone> {
        self.call(|reply| Command::Submit { op, reply }).await
    }

    pub async fn acquire_lock(&self, step_id: StepId, user_id: UserId) -> Result<Result<(), UserId>, SessionGone> {
        self.call(|reply| Command::AcquireLock { step_id, user_id, reply }).await
    }

    pub async fn release_lock(&self, step_id: StepId) -> Result<(), SessionGone> {
        self.call(|reply| Command::ReleaseLock { step_id, reply }).await
    }

    pub async fn join(&self, presence: UserPresence) -> Result<broadcast::Receiver<SessionEvent>, SessionGone> {
        self.call(|reply| Command::Join { presence, reply }).await
    }

    pub async fn update_presence(&self, user_id: UserId, update: PresenceUpdate) -> Result<(), SessionGone> {
        self.call(|reply| Command::UpdatePresence { user_id, update, reply }).await
    }

    pub async fn leave(&self, user_id: UserId) -> Result<(), SessionGone> {
        self.call(|reply| Command::Leave { user_id, reply }).await
    }

    pub async fn sync(&self, client_seq: u64) -> Result<SyncResponse, SessionGone> {
        self.call(|reply| Command::Sync { client_seq, reply }).await
    }

    pub async fn snapshot(&self) -> Result<(WorkflowDraft, EditorState, u64), SessionGone> {
        self.call(|reply| Command::Snapshot { reply }).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionGone> {
        self.call(|reply| Command::Shutdown { reply }).await
    }
}
