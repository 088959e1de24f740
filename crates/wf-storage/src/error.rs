//! Storage error taxonomy — distinct from the core's `FatalError`; the
//! engine/session layers wrap these into `FatalError::Persistence` at the
//! boundary where a storage failure becomes an execution/session outcome.

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("workflow not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
