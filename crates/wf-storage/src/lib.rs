//! Persistence adapter: the core's `Persistence` trait plus an in-memory
//! implementation (tests, single-process CLI) and a Postgres implementation
//! (`sqlx`, runtime-checked queries — no compile-time `DATABASE_URL`
//! dependency).

mod config;
mod error;
mod memory;
mod persistence;
mod postgres;

pub use config::{RetryPolicy, StorageConfig};
pub use error::StoreError;
pub use memory::InMemoryPersistence;
pub use persistence::Persistence;
pub use postgres::PostgresPersistence;
