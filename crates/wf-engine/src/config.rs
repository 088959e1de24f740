//! Execution engine timing knobs — the same `Default` + `with_*` builder
//! shape `wf-session`'s `SessionConfig` uses.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Wall-clock budget for a single step executor call before the step
    /// is failed with a timeout error.
    pub step_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { step_timeout: Duration::from_secs(30) }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Reads `WF_ENGINE_STEP_TIMEOUT_MS`, falling back to the default for
    /// anything unset or unparseable. Binary edges only — this crate never
    /// reads the environment itself.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(millis) = std::env::var("WF_ENGINE_STEP_TIMEOUT_MS") {
            if let Ok(millis) = millis.parse::<u64>() {
                config = config.with_step_timeout(Duration::from_millis(millis));
            }
        }
        config
    }
}
