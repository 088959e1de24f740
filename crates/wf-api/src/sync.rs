//! `GET /api/workflows/:id/sync?client_seq=N` — the one read endpoint this
//! crate exposes over the session's sync protocol. A full duplex WebSocket
//! upgrade is left as a documented extension point; this handler is the
//! request/response primitive it would be built on.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use wf_contracts::SyncResponse;

use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new().route("/api/workflows/:id/sync", get(sync)).with_state(state)
}

#[derive(Debug, Deserialize)]
struct SyncParams {
    #[serde(default)]
    client_seq: u64,
}

async fn sync(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    Query(params): Query<SyncParams>,
) -> Result<Json<SyncResponse>, StatusCode> {
    let handle = state.supervisor.get_or_start(workflow_id).await.map_err(|e| {
        tracing::error!(error = %e, "failed to start session for sync request");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let response = handle.sync(params.client_seq).await.map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(Json(response))
}
