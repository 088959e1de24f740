//! Per-scope resource usage sampling: a CPU-work counter the driver
//! increments per step it runs, the current level's queue length, and
//! process memory/heap figures read from `/proc/self/statm`. No crate in
//! the workspace covers process memory introspection, so this reads the
//! kernel's own accounting directly; on non-Linux targets it degrades to 0
//! rather than failing the run.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub scope: String,
    pub cpu_work: u64,
    pub memory_bytes: u64,
    pub heap_bytes: u64,
    pub queue_length: usize,
}

/// Cheap atomics the driver updates inline; reading `/proc/self/statm` is
/// deferred to `sample`, not done per step.
#[derive(Default)]
pub struct ResourceSampler {
    cpu_work: AtomicU64,
    queue_length: AtomicUsize,
}

impl ResourceSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_step(&self) {
        self.cpu_work.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queue_length(&self, len: usize) {
        self.queue_length.store(len, Ordering::Relaxed);
    }

    pub fn sample(&self, scope: impl Into<String>) -> ResourceUsage {
        let (memory_bytes, heap_bytes) = read_statm();
        ResourceUsage {
            scope: scope.into(),
            cpu_work: self.cpu_work.load(Ordering::Relaxed),
            memory_bytes,
            heap_bytes,
            queue_length: self.queue_length.load(Ordering::Relaxed),
        }
    }
}

#[cfg(target_os = "linux")]
fn read_statm() -> (u64, u64) {
    let page_size = 4096u64;
    let Ok(contents) = std::fs::read_to_string("/proc/self/statm") else {
        return (0, 0);
    };
    let fields: Vec<u64> = contents.split_whitespace().filter_map(|f| f.parse().ok()).collect();
    // size resident shared text lib data dt (pages) — see proc(5).
    let resident = fields.get(1).copied().unwrap_or(0);
    let data = fields.get(5).copied().unwrap_or(0);
    (resident * page_size, data * page_size)
}

#[cfg(not(target_os = "linux"))]
fn read_statm() -> (u64, u64) {
    (0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_step_increments_cpu_work() {
        let sampler = ResourceSampler::new();
        sampler.record_step();
        sampler.record_step();
        let usage = sampler.sample("session-1");
        assert_eq!(usage.cpu_work, 2);
        assert_eq!(usage.scope, "session-1");
    }

    #[test]
    fn queue_length_reflects_last_recorded_value() {
        let sampler = ResourceSampler::new();
        sampler.record_queue_length(5);
        sampler.record_queue_length(2);
        assert_eq!(sampler.sample("s").queue_length, 2);
    }
}
