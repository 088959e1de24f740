//! Engine-level error wrapping. A fatal error here always finalizes the
//! execution as `failed` with an `engine_error` category — it never takes
//! the owning session down; the session process keeps running and accepts
//! the next execution request.

use thiserror::Error;
use wf_contracts::{ExecutorError, ExpressionError, FatalError, ValidationError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Fatal(#[from] FatalError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

impl EngineError {
    /// Shape recorded on the terminal `StepExecution`/`Execution` error field.
    pub fn as_executor_error(&self) -> ExecutorError {
        match self {
            EngineError::Fatal(e) => ExecutorError::new("engine_error", e.to_string()),
            EngineError::Validation(e) => ExecutorError::new("validation_error", e.to_string()),
            EngineError::Expression(e) => ExecutorError::new("expression_error", e.to_string()),
            EngineError::Executor(e) => e.clone(),
        }
    }
}
