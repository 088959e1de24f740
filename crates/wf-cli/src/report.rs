//! The `--out` file a `run` writes and `inspect` reads back — persistence
//! has no read path for executions, only writes, so a saved run report is
//! the operator's own record of what happened.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use wf_contracts::{Execution, StepExecution};

#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub execution: Execution,
    pub step_executions: Vec<StepExecution>,
}

impl RunReport {
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize run report")?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("failed to parse run report from {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wf_contracts::{ExecutionType, TriggerSpec};

    #[test]
    fn save_then_load_round_trips() {
        let execution =
            Execution::new("wf-1".into(), TriggerSpec { trigger_type: "manual".into(), data: json!({}) }, ExecutionType::Production);
        let report = RunReport { execution: execution.clone(), step_executions: Vec::new() };

        let dir = std::env::temp_dir().join(format!("wf-cli-report-test-{}", execution.id));
        report.save(&dir).unwrap();
        let loaded = RunReport::load(&dir).unwrap();

        assert_eq!(loaded.execution.id, execution.id);
        std::fs::remove_file(&dir).unwrap();
    }
}
