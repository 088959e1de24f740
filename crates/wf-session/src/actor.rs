//! The session authority itself: a struct owned by a dedicated `tokio`
//! task, fed through a bounded mpsc channel whose commands each carry a
//! oneshot reply sender — the same shape the worker pool uses to dispatch
//! one claim-and-execute cycle, generalized here to "apply one edit
//! operation or serve one sync/presence request".

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use wf_contracts::{
    EditOperation, EditorState, OperationId, OperationOutcome, PresenceEvent, PresenceUpdate, StepId,
    SyncResponse, UserId, UserPresence, ValidationError, WorkflowDraft, WorkflowId,
};
use wf_steps::StepRegistry;
use wf_storage::{Persistence, StoreError};

use crate::apply;
use crate::config::SessionConfig;
use crate::events::SessionEvent;
use crate::validate;

/// Events accumulate indefinitely retained back to `max(dedup_cache_min_retention, ops in the last hour)`.
const RETENTION_WINDOW: chrono::Duration = chrono::Duration::hours(1);

pub enum Command {
    Submit {
        op: EditOperation,
        reply: oneshot::Sender<Result<OperationOutcome, ValidationError>>,
    },
    AcquireLock {
        step_id: StepId,
        user_id: UserId,
        reply: oneshot::Sender<Result<(), UserId>>,
    },
    ReleaseLock {
        step_id: StepId,
        reply: oneshot::Sender<()>,
    },
    Join {
        presence: UserPresence,
        reply: oneshot::Sender<broadcast::Receiver<SessionEvent>>,
    },
    UpdatePresence {
        user_id: UserId,
        update: PresenceUpdate,
        reply: oneshot::Sender<()>,
    },
    Leave {
        user_id: UserId,
        reply: oneshot::Sender<()>,
    },
    Sync {
        client_seq: u64,
        reply: oneshot::Sender<SyncResponse>,
    },
    Snapshot {
        reply: oneshot::Sender<(WorkflowDraft, EditorState, u64)>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

pub struct SessionActor {
    workflow_id: WorkflowId,
    draft: WorkflowDraft,
    editor_state: EditorState,
    seq: u64,
    last_persisted_seq: u64,
    draft_dirty: bool,
    pending_ops: Vec<EditOperation>,
    recent_ops: VecDeque<EditOperation>,
    dedup_cache: HashMap<OperationId, u64>,
    dedup_order: VecDeque<(OperationId, DateTime<Utc>)>,
    presence: HashMap<UserId, UserPresence>,
    registry: Arc<StepRegistry>,
    persistence: Arc<dyn Persistence>,
    config: SessionConfig,
    events_tx: broadcast::Sender<SessionEvent>,
    cmd_rx: mpsc::Receiver<Command>,
    last_activity: Instant,
}

impl SessionActor {
    fn new(
        workflow_id: WorkflowId,
        draft: WorkflowDraft,
        registry: Arc<StepRegistry>,
        persistence: Arc<dyn Persistence>,
        config: SessionConfig,
        cmd_rx: mpsc::Receiver<Command>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            workflow_id,
            draft,
            editor_state: EditorState::new(),
            seq: 0,
            last_persisted_seq: 0,
            draft_dirty: false,
            pending_ops: Vec::new(),
            recent_ops: VecDeque::new(),
            dedup_cache: HashMap::new(),
            dedup_order: VecDeque::new(),
            presence: HashMap::new(),
            registry,
            persistence,
            config,
            events_tx,
            cmd_rx,
            last_activity: Instant::now(),
        }
    }

    /// Loads the stored draft (or starts a fresh one) and replays every
    /// operation recorded after the last snapshot. Replayed operations are
    /// revalidated advisorily — a failure is logged and skipped rather than
    /// aborting recovery, tolerating schema evolution. Editor state (locks)
    /// is not recovered since locks never enter the operation log.
    pub async fn recover(
        workflow_id: WorkflowId,
        registry: Arc<StepRegistry>,
        persistence: Arc<dyn Persistence>,
        config: SessionConfig,
        cmd_rx: mpsc::Receiver<Command>,
    ) -> Result<Self, StoreError> {
        let draft = persistence
            .load_draft(&workflow_id)
            .await?
            .unwrap_or_else(|| WorkflowDraft::new(workflow_id.clone()));
        let (last_persisted_seq, ops) = persistence.load_pending_ops(&workflow_id).await?;

        let mut actor = Self::new(workflow_id, draft, registry, persistence, config, cmd_rx);
        actor.seq = last_persisted_seq;
        actor.last_persisted_seq = last_persisted_seq;

        for op in ops {
            if let Err(e) = validate::validate(&actor.draft, &actor.registry, &op.payload) {
                tracing::warn!(
                    workflow_id = %actor.workflow_id,
                    op_id = %op.id,
                    error = %e,
                    "skipping operation that failed advisory revalidation on recovery"
                );
                continue;
            }
            if apply::apply_structural(&mut actor.draft, &op.payload).is_err() {
                continue;
            }
            apply::apply_editor(&mut actor.editor_state, &op.payload);
            actor.seq = actor.seq.max(op.seq);
            actor.remember(op.id.clone(), op.seq, op.inserted_at);
            actor.recent_ops.push_back(op);
        }
        actor.trim_recent_ops();
        Ok(actor)
    }

    pub async fn run(mut self) {
        let mut flush_timer = tokio::time::interval(self.config.flush_interval);
        flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                maybe_cmd = self.cmd_rx.recv() => {
                    let Some(cmd) = maybe_cmd else { break };
                    self.last_activity = Instant::now();
                    if self.handle(cmd).await {
                        break;
                    }
                }
                _ = flush_timer.tick() => {
                    if let Err(e) = self.flush().await {
                        tracing::warn!(workflow_id = %self.workflow_id, error = %e, "flush failed, operations remain buffered");
                    }
                    if self.events_tx.receiver_count() == 0
                        && self.pending_ops.is_empty()
                        && self.last_activity.elapsed() >= self.config.idle_timeout
                    {
                        tracing::info!(workflow_id = %self.workflow_id, "idle timeout reached, shutting session down");
                        break;
                    }
                }
            }
        }
        let _ = self.flush().await;
    }

    /// Returns `true` when the run loop should stop after this command.
    async fn handle(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Submit { op, reply } => {
                let _ = reply.send(self.submit(op).await);
            }
            Command::AcquireLock { step_id, user_id, reply } => {
                let result = self.editor_state.try_acquire_lock(step_id, user_id, Utc::now());
                let _ = reply.send(result);
            }
            Command::ReleaseLock { step_id, reply } => {
                self.editor_state.release_lock(&step_id);
                let _ = reply.send(());
            }
            Command::Join { presence, reply } => {
                let user_id = presence.user_id.clone();
                self.presence.insert(user_id, presence.clone());
                let _ = self.events_tx.send(SessionEvent::Presence(PresenceEvent::Joined { presence }));
                let _ = reply.send(self.events_tx.subscribe());
            }
            Command::UpdatePresence { user_id, update, reply } => {
                if let Some(entry) = self.presence.get_mut(&user_id) {
                    entry.merge(update);
                    let _ = self
                        .events_tx
                        .send(SessionEvent::Presence(PresenceEvent::Updated { presence: entry.clone() }));
                }
                let _ = reply.send(());
            }
            Command::Leave { user_id, reply } => {
                self.presence.remove(&user_id);
                let _ = self.events_tx.send(SessionEvent::Presence(PresenceEvent::Left { user_id }));
                let _ = reply.send(());
            }
            Command::Sync { client_seq, reply } => {
                let _ = reply.send(self.sync(client_seq));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send((self.draft.clone(), self.editor_state.clone(), self.seq));
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
                return true;
            }
        }
        false
    }

    async fn submit(&mut self, op: EditOperation) -> Result<OperationOutcome, ValidationError> {
        if let Some(&seq) = self.dedup_cache.get(&op.id) {
            return Ok(OperationOutcome::Duplicate { seq });
        }

        validate::validate(&self.draft, &self.registry, &op.payload)?;
        apply::apply_structural(&mut self.draft, &op.payload)?;
        apply::apply_editor(&mut self.editor_state, &op.payload);
        self.draft_dirty = self.draft_dirty || is_structural(&op.payload);

        self.seq += 1;
        let mut applied = op;
        applied.seq = self.seq;

        self.remember(applied.id.clone(), self.seq, applied.inserted_at);
        self.pending_ops.push(applied.clone());
        self.recent_ops.push_back(applied.clone());
        self.trim_recent_ops();

        let _ = self.events_tx.send(SessionEvent::OperationApplied { seq: self.seq, op: applied });
        Ok(OperationOutcome::Applied { seq: self.seq })
    }

    fn sync(&self, client_seq: u64) -> SyncResponse {
        if client_seq == self.seq {
            return SyncResponse::UpToDate;
        }
        let covered = self.recent_ops.front().map(|op| op.seq <= client_seq + 1).unwrap_or(client_seq == 0);
        if client_seq == 0 || !covered {
            return SyncResponse::FullSync {
                draft: self.draft.clone(),
                seq: self.seq,
                editor_state: self.editor_state.clone(),
            };
        }
        let operations = self.recent_ops.iter().filter(|op| op.seq > client_seq).cloned().collect();
        SyncResponse::Incremental { operations, editor_state: self.editor_state.clone() }
    }

    async fn flush(&mut self) -> Result<(), StoreError> {
        if self.pending_ops.is_empty() {
            return Ok(());
        }
        self.persistence.append_operations(&self.pending_ops).await?;
        if self.draft_dirty {
            self.persistence.snapshot_draft(&self.draft, self.seq).await?;
            self.draft_dirty = false;
        }
        self.last_persisted_seq = self.seq;
        self.pending_ops.clear();
        Ok(())
    }

    fn remember(&mut self, id: OperationId, seq: u64, at: DateTime<Utc>) {
        self.dedup_cache.insert(id.clone(), seq);
        self.dedup_order.push_back((id, at));
        let now = Utc::now();
        let min_retention = self.config.dedup_cache_min_retention;
        while self.dedup_order.len() > min_retention {
            let Some((_, oldest_at)) = self.dedup_order.front() else { break };
            if now - *oldest_at <= RETENTION_WINDOW {
                break;
            }
            let (id, _) = self.dedup_order.pop_front().unwrap();
            self.dedup_cache.remove(&id);
        }
    }

    fn trim_recent_ops(&mut self) {
        let now = Utc::now();
        let min_retention = self.config.dedup_cache_min_retention;
        while self.recent_ops.len() > min_retention {
            let Some(front) = self.recent_ops.front() else { break };
            if now - front.inserted_at <= RETENTION_WINDOW {
                break;
            }
            self.recent_ops.pop_front();
        }
    }
}

fn is_structural(payload: &wf_contracts::OperationPayload) -> bool {
    use wf_contracts::OperationPayload::*;
    !matches!(
        payload,
        PinStepOutput { .. } | UnpinStepOutput { .. } | DisableStep { .. } | EnableStep { .. }
    )
}
