//! Edit-session authority: one single-writer actor per workflow id,
//! dedup/validate/apply/advance/broadcast, step locking, presence, the
//! sync protocol, and the supervisor that owns a session per workflow.

mod actor;
mod apply;
mod config;
mod events;
mod handle;
mod supervisor;
mod validate;

pub use actor::{Command, SessionActor};
pub use config::SessionConfig;
pub use events::SessionEvent;
pub use handle::{SessionGone, SessionHandle};
pub use supervisor::Supervisor;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::sync::mpsc;
    use wf_contracts::{DisableMode, EditOperation, OperationOutcome, OperationPayload, Step};
    use wf_steps::StepRegistry;
    use wf_storage::InMemoryPersistence;

    use super::*;

    fn op(id: &str, workflow_id: &str, user_id: &str, payload: OperationPayload) -> EditOperation {
        EditOperation {
            id: id.into(),
            workflow_id: workflow_id.into(),
            user_id: user_id.into(),
            client_seq: None,
            payload,
            seq: 0,
            inserted_at: chrono::Utc::now(),
        }
    }

    async fn spawn_actor() -> (SessionHandle, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(16);
        let actor = SessionActor::recover(
            "wf-1".into(),
            Arc::new(StepRegistry::default()),
            Arc::new(InMemoryPersistence::new()),
            SessionConfig::default(),
            rx,
        )
        .await
        .unwrap();
        let task = tokio::spawn(actor.run());
        (SessionHandle::new(tx), task)
    }

    #[tokio::test]
    async fn concurrent_duplicate_submission_is_deduplicated() {
        let (handle, _task) = spawn_actor().await;
        let add = op("op-1", "wf-1", "u1", OperationPayload::AddStep { step: Step::new("a", "debug", "A") });

        let first = handle.submit(add.clone()).await.unwrap().unwrap();
        let second = handle.submit(add).await.unwrap().unwrap();

        assert_eq!(first, OperationOutcome::Applied { seq: 1 });
        assert_eq!(second, OperationOutcome::Duplicate { seq: 1 });
    }

    #[tokio::test]
    async fn add_connection_that_would_cycle_is_rejected() {
        let (handle, _task) = spawn_actor().await;
        handle
            .submit(op("op-1", "wf-1", "u1", OperationPayload::AddStep { step: Step::new("a", "debug", "A") }))
            .await
            .unwrap()
            .unwrap();
        handle
            .submit(op("op-2", "wf-1", "u1", OperationPayload::AddStep { step: Step::new("b", "debug", "B") }))
            .await
            .unwrap()
            .unwrap();
        handle
            .submit(op(
                "op-3",
                "wf-1",
                "u1",
                OperationPayload::AddConnection { connection: wf_contracts::Connection::new("c1", "a", "b") },
            ))
            .await
            .unwrap()
            .unwrap();

        let result = handle
            .submit(op(
                "op-4",
                "wf-1",
                "u1",
                OperationPayload::AddConnection { connection: wf_contracts::Connection::new("c2", "b", "a") },
            ))
            .await
            .unwrap();

        assert!(matches!(result, Err(wf_contracts::ValidationError::WouldCreateCycle { .. })));
    }

    #[tokio::test]
    async fn lock_contention_reports_the_holder() {
        let (handle, _task) = spawn_actor().await;
        handle.acquire_lock("a".into(), "u1".into()).await.unwrap().unwrap();
        let err = handle.acquire_lock("a".into(), "u2".into()).await.unwrap().unwrap_err();
        assert_eq!(err, "u1");
    }

    #[tokio::test]
    async fn disable_step_skip_mode_round_trips_through_editor_state() {
        let (handle, _task) = spawn_actor().await;
        handle
            .submit(op("op-1", "wf-1", "u1", OperationPayload::AddStep { step: Step::new("a", "debug", "A") }))
            .await
            .unwrap()
            .unwrap();
        handle
            .submit(op(
                "op-2",
                "wf-1",
                "u1",
                OperationPayload::DisableStep { step_id: "a".into(), mode: DisableMode::Skip },
            ))
            .await
            .unwrap()
            .unwrap();

        let (_, editor_state, seq) = handle.snapshot().await.unwrap();
        assert_eq!(editor_state.disabled_steps.get("a"), Some(&DisableMode::Skip));
        assert_eq!(seq, 2);
    }

    #[tokio::test]
    async fn sync_with_unknown_seq_falls_back_to_full_sync() {
        let (handle, _task) = spawn_actor().await;
        handle
            .submit(op("op-1", "wf-1", "u1", OperationPayload::AddStep { step: Step::new("a", "debug", "A") }))
            .await
            .unwrap()
            .unwrap();
        let response = handle.sync(0).await.unwrap();
        assert!(matches!(response, wf_contracts::SyncResponse::FullSync { .. }));

        let up_to_date = handle.sync(1).await.unwrap();
        assert!(matches!(up_to_date, wf_contracts::SyncResponse::UpToDate));
    }

    #[tokio::test]
    async fn pin_step_output_is_reflected_immediately() {
        let (handle, _task) = spawn_actor().await;
        handle
            .submit(op(
                "op-1",
                "wf-1",
                "u1",
                OperationPayload::PinStepOutput { step_id: "a".into(), output_data: json!(42) },
            ))
            .await
            .unwrap()
            .unwrap();
        let (_, editor_state, _) = handle.snapshot().await.unwrap();
        assert_eq!(editor_state.pinned_outputs.get("a"), Some(&json!(42)));
    }
}
