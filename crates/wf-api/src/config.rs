//! Binary-edge configuration, loaded from the environment by `main` and
//! nowhere else — the same `Default` + `with_*` builder shape as the
//! session and engine configs, sized for the transport layer instead.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub watchdog_interval: Duration,
    pub event_flush_interval: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            watchdog_interval: Duration::from_secs(30),
            event_flush_interval: Duration::from_secs(2),
        }
    }
}

impl ApiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn with_watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }

    pub fn with_event_flush_interval(mut self, interval: Duration) -> Self {
        self.event_flush_interval = interval;
        self
    }

    /// Reads `WF_API_BIND_ADDR` / `WF_API_WATCHDOG_INTERVAL_MS` /
    /// `WF_API_EVENT_FLUSH_INTERVAL_MS`, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("WF_API_BIND_ADDR") {
            config = config.with_bind_addr(addr);
        }
        if let Ok(millis) = std::env::var("WF_API_WATCHDOG_INTERVAL_MS") {
            if let Ok(millis) = millis.parse::<u64>() {
                config = config.with_watchdog_interval(Duration::from_millis(millis));
            }
        }
        if let Ok(millis) = std::env::var("WF_API_EVENT_FLUSH_INTERVAL_MS") {
            if let Ok(millis) = millis.parse::<u64>() {
                config = config.with_event_flush_interval(Duration::from_millis(millis));
            }
        }
        config
    }
}
