//! StepExecution — one record per step per execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ExecutionId, StepExecutionId, StepId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepExecutionStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

impl StepExecutionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, StepExecutionStatus::Pending | StepExecutionStatus::Queued | StepExecutionStatus::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepExecution {
    pub id: StepExecutionId,
    pub execution_id: ExecutionId,
    pub step_id: StepId,
    /// `Some((index, total))` when this record belongs to a fan-out expansion.
    #[serde(default)]
    pub item: Option<(usize, usize)>,
    pub status: StepExecutionStatus,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub resolved_config: Value,
    #[serde(default)]
    pub error: Option<crate::error::ExecutorError>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_us: Option<u64>,
}

impl StepExecution {
    pub fn pending(execution_id: ExecutionId, step_id: StepId) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            execution_id,
            step_id,
            item: None,
            status: StepExecutionStatus::Pending,
            input: Value::Null,
            output: Value::Null,
            resolved_config: Value::Null,
            error: None,
            started_at: None,
            completed_at: None,
            duration_us: None,
        }
    }

    pub fn start(&mut self) {
        self.status = StepExecutionStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Mark the record terminal and compute `duration_us` when a start time
    /// was recorded — duration only exists when both terminal and started.
    pub fn finish(&mut self, status: StepExecutionStatus) {
        debug_assert!(status.is_terminal());
        self.status = status;
        let now = Utc::now();
        self.completed_at = Some(now);
        if let Some(started) = self.started_at {
            let micros = (now - started).num_microseconds().unwrap_or(0).max(0) as u64;
            self.duration_us = Some(micros);
        }
    }

    pub fn complete(&mut self, output: Value) {
        self.output = output;
        self.finish(StepExecutionStatus::Completed);
    }

    pub fn fail(&mut self, error: crate::error::ExecutorError) {
        self.error = Some(error);
        self.finish(StepExecutionStatus::Failed);
    }

    pub fn skip(&mut self) {
        self.finish(StepExecutionStatus::Skipped);
    }

    pub fn cancel(&mut self) {
        self.finish(StepExecutionStatus::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_only_set_when_started_and_terminal() {
        let mut se = StepExecution::pending(uuid::Uuid::now_v7(), "s1".into());
        assert!(se.duration_us.is_none());
        se.start();
        se.complete(Value::Null);
        assert!(se.duration_us.is_some());
        assert!(se.status.is_terminal());
    }

    #[test]
    fn pinned_completion_has_no_start_but_can_still_be_terminal() {
        let mut se = StepExecution::pending(uuid::Uuid::now_v7(), "s1".into());
        se.complete(Value::from(1));
        assert!(se.started_at.is_none());
        assert!(se.duration_us.is_none());
    }
}
