// Workflow edit-session and execution API server

mod config;
mod hooks;
mod state;
mod sync;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use config::ApiConfig;
use sqlx::PgPool;
use state::AppState;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wf_engine::{BufferedEventSink, BufferedHooks, EngineConfig, ExecutionEngine, TracingHooks};
use wf_session::{SessionConfig, Supervisor};
use wf_steps::StepRegistry;
use wf_storage::{PostgresPersistence, StorageConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "wf_api=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL environment variable required")?;
    let pool = PgPool::connect(&database_url).await.context("failed to connect to database")?;
    let persistence: Arc<dyn wf_storage::Persistence> =
        Arc::new(PostgresPersistence::with_config(pool, StorageConfig::default()));

    let supervisor = Supervisor::new(Arc::new(StepRegistry::default()), persistence.clone(), SessionConfig::from_env());
    let api_config = ApiConfig::from_env();

    let event_sink = Arc::new(BufferedEventSink::new());
    event_sink.clone().spawn_flush_loop(api_config.event_flush_interval);
    let hooks = Arc::new(BufferedHooks::new(TracingHooks, event_sink));
    let engine = Arc::new(ExecutionEngine::with_config(StepRegistry::default(), hooks, EngineConfig::from_env()));

    supervisor.spawn_watchdog(api_config.watchdog_interval);

    let state = AppState { supervisor, persistence, engine };

    let app = Router::new()
        .merge(hooks::routes(state.clone()))
        .merge(sync::routes(state))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&api_config.bind_addr).await.context("failed to bind to address")?;
    tracing::info!(addr = %api_config.bind_addr, "wf-api listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")?;

    Ok(())
}
