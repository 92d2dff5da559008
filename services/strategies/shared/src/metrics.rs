//! Strategy metrics collection

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Thread-safe metrics collector for strategies
#[derive(Debug)]
pub struct MetricsCollector {
    start_time: Instant,
    cycles_run: AtomicU64,
    cycles_skipped: AtomicU64,
    signals_generated: AtomicU64,
    notifications_failed: AtomicU64,
    errors: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            cycles_run: AtomicU64::new(0),
            cycles_skipped: AtomicU64::new(0),
            signals_generated: AtomicU64::new(0),
            notifications_failed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn increment_cycles(&self) {
        self.cycles_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_skipped(&self) {
        self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_signals(&self) {
        self.signals_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_notification_failures(&self) {
        self.notifications_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self) -> super::StrategyMetrics {
        super::StrategyMetrics {
            cycles_run: self.cycles_run.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            signals_generated: self.signals_generated.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            uptime_secs: self.uptime().as_secs(),
        }
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
