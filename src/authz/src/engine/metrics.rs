//! Decision and mutation counters for enforcer observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the enforcer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnforcerMetrics {
    /// Decisions that allowed the request (admin bypass included)
    pub allowed_decisions: u64,

    /// Decisions that denied the request
    pub denied_decisions: u64,

    /// Allowed decisions that came from the admin role
    pub admin_bypasses: u64,

    /// Policy mutations applied to store and index
    pub mutations: u64,

    /// Store calls that failed during a mutation or load
    pub store_failures: u64,
}

impl EnforcerMetrics {
    /// Total number of decisions
    pub fn total_decisions(&self) -> u64 {
        self.allowed_decisions + self.denied_decisions
    }

    /// Calculate allow rate
    pub fn allow_rate(&self) -> f64 {
        let total = self.total_decisions();
        if total == 0 {
            0.0
        } else {
            self.allowed_decisions as f64 / total as f64
        }
    }
}

/// Lock-free counters updated from the enforce hot path
#[derive(Debug, Default)]
pub struct MetricsCollector {
    allowed: AtomicU64,
    denied: AtomicU64,
    admin_bypasses: AtomicU64,
    mutations: AtomicU64,
    store_failures: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an authorization decision
    pub fn record_decision(&self, allowed: bool, admin_bypass: bool) {
        if allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied.fetch_add(1, Ordering::Relaxed);
        }
        if admin_bypass {
            self.admin_bypasses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> EnforcerMetrics {
        EnforcerMetrics {
            allowed_decisions: self.allowed.load(Ordering::Relaxed),
            denied_decisions: self.denied.load(Ordering::Relaxed),
            admin_bypasses: self.admin_bypasses.load(Ordering::Relaxed),
            mutations: self.mutations.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.allowed.store(0, Ordering::Relaxed);
        self.denied.store(0, Ordering::Relaxed);
        self.admin_bypasses.store(0, Ordering::Relaxed);
        self.mutations.store(0, Ordering::Relaxed);
        self.store_failures.store(0, Ordering::Relaxed);
    }
}
