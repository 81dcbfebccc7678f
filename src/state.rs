use crate::config::AppConfig;
use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

// ── Cancellation ──

/// Cooperative cancellation for one simulation. The engine polls it between
/// paths; the request handler raises it when the run times out.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub simulations_run: AtomicU64,
    pub simulations_failed: AtomicU64,
    pub paths_generated: AtomicU64,
    pub values_generated: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            simulations_run: AtomicU64::new(0),
            simulations_failed: AtomicU64::new(0),
            paths_generated: AtomicU64::new(0),
            values_generated: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_success(&self, paths: usize, values: usize) {
        self.simulations_run.fetch_add(1, Ordering::Relaxed);
        self.paths_generated.fetch_add(paths as u64, Ordering::Relaxed);
        self.values_generated.fetch_add(values as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failure(&self) {
        self.simulations_failed.fetch_add(1, Ordering::Relaxed);
    }
}

// ── Application shared state ──
//
// Read-only config plus counters. No simulation state is shared between
// requests: every run owns its own matrix and random stream.

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
