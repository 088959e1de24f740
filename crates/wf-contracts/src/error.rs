//! Error taxonomy.
//!
//! Each kind below is a distinct variant set, not a single catch-all type —
//! callers match on the kind that's relevant to them (a client-facing
//! handler cares about `ValidationError`, the engine's routing policy cares
//! about `ExecutorError`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures from applying a structural or editor operation to a draft.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("step already exists: {step_id}")]
    StepAlreadyExists { step_id: String },
    #[error("step not found: {step_id}")]
    StepNotFound { step_id: String },
    #[error("invalid step type: {type_id}")]
    InvalidStepType { type_id: String },
    #[error("connection already exists: {connection_id}")]
    ConnectionAlreadyExists { connection_id: String },
    #[error("connection not found: {connection_id}")]
    ConnectionNotFound { connection_id: String },
    #[error("source step not found: {step_id}")]
    SourceStepNotFound { step_id: String },
    #[error("target step not found: {step_id}")]
    TargetStepNotFound { step_id: String },
    #[error("self loop not allowed on step: {step_id}")]
    SelfLoopNotAllowed { step_id: String },
    #[error("would create cycle")]
    WouldCreateCycle { witness: Vec<String> },
    #[error("invalid patch operation on step {step_id}: {reason}")]
    InvalidPatch { step_id: String, reason: String },
}

/// Template parse/render failures.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpressionError {
    #[error("parse error at {line}:{column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("render error at {line}:{column}: {message}")]
    RenderError {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("template evaluation timed out")]
    Timeout,
}

/// Domain errors raised by a step handler's `execute`.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[error("{category}: {message}")]
pub struct ExecutorError {
    /// Error category, used by the engine's routing policy
    /// to match against a downstream branch's route label.
    pub category: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ExecutorError {
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new("transport_error", message)
    }

    pub fn expression(message: impl Into<String>) -> Self {
        Self::new("expression_error", message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_transport(&self) -> bool {
        self.category == "transport_error"
    }
}

/// Step lock contention.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("step locked by another user: {other}")]
pub struct ConcurrencyError {
    pub other: String,
}

/// Unrecoverable-for-this-execution errors: persistence failure,
/// unknown step type at execution time, cycle detected during plan build.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FatalError {
    #[error("cycle detected during plan build")]
    CycleDetected { witness: Vec<String> },
    #[error("unknown step type at execution time: {type_id}")]
    UnknownStepType { type_id: String },
    #[error("persistence failure: {message}")]
    Persistence { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_error_transport_round_trips() {
        let err = ExecutorError::transport("connection refused");
        assert!(err.is_transport());
        let json = serde_json::to_string(&err).unwrap();
        let back: ExecutorError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }

    #[test]
    fn validation_error_serializes_with_tag() {
        let err = ValidationError::SelfLoopNotAllowed {
            step_id: "a".into(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "self_loop_not_allowed");
    }
}
