//! Session authority timing knobs — builder-style `with_*` setters over a
//! `Default`-derived base, the shape the worker pool's own configuration
//! uses.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// How often buffered operations are flushed to storage.
    #[serde(with = "duration_millis")]
    pub flush_interval: Duration,

    /// How long a session with no subscribers and no pending operations
    /// sits idle before it persists and exits.
    #[serde(with = "duration_millis")]
    pub idle_timeout: Duration,

    /// How long an unrefreshed step lock stays held before it becomes
    /// reclaimable by another user.
    #[serde(with = "duration_millis")]
    pub lock_timeout: Duration,

    /// Lower bound on how many dedup-cache entries are retained regardless
    /// of age, so a burst of operations within the last hour never evicts
    /// an entry still needed for dedup.
    pub dedup_cache_min_retention: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(2),
            idle_timeout: Duration::from_secs(5 * 60),
            lock_timeout: Duration::from_secs(30),
            dedup_cache_min_retention: 1_000,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_dedup_cache_min_retention(mut self, n: usize) -> Self {
        self.dedup_cache_min_retention = n;
        self
    }

    /// Reads `WF_SESSION_FLUSH_INTERVAL_MS` / `WF_SESSION_IDLE_TIMEOUT_MS` /
    /// `WF_SESSION_LOCK_TIMEOUT_MS`, falling back to defaults for anything
    /// unset or unparseable. Binary edges only — this crate never reads
    /// the environment itself.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_millis("WF_SESSION_FLUSH_INTERVAL_MS") {
            config = config.with_flush_interval(ms);
        }
        if let Some(ms) = env_millis("WF_SESSION_IDLE_TIMEOUT_MS") {
            config = config.with_idle_timeout(ms);
        }
        if let Some(ms) = env_millis("WF_SESSION_LOCK_TIMEOUT_MS") {
            config = config.with_lock_timeout(ms);
        }
        config
    }
}

fn env_millis(var: &str) -> Option<Duration> {
    std::env::var(var).ok()?.parse::<u64>().ok().map(Duration::from_millis)
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_numbers() {
        let config = SessionConfig::default();
        assert_eq!(config.flush_interval, Duration::from_secs(2));
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.lock_timeout, Duration::from_secs(30));
    }

    #[test]
    fn builder_overrides_one_field_at_a_time() {
        let config = SessionConfig::new().with_flush_interval(Duration::from_millis(500));
        assert_eq!(config.flush_interval, Duration::from_millis(500));
        assert_eq!(config.idle_timeout, SessionConfig::default().idle_timeout);
    }
}
