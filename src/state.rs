use crate::config::AppConfig;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub price_requests: AtomicU64,
    pub path_requests: AtomicU64,
    pub paths_simulated: AtomicU64,
    pub errors: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            price_requests: AtomicU64::new(0),
            path_requests: AtomicU64::new(0),
            paths_simulated: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            price_requests: self.price_requests.load(Ordering::Relaxed),
            path_requests: self.path_requests.load(Ordering::Relaxed),
            paths_simulated: self.paths_simulated.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for PerfCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CountersSnapshot {
    pub price_requests: u64,
    pub path_requests: u64,
    pub paths_simulated: u64,
    pub errors: u64,
}

// ── Application shared state (immutable config + atomics, no locks) ──

pub struct AppState {
    pub config: AppConfig,
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            counters: PerfCounters::new(),
        })
    }
}
