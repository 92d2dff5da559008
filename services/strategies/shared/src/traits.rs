//! Strategy traits and interfaces

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Lifecycle every long-running signal strategy implements
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Strategy name for identification
    fn name(&self) -> &'static str;

    /// Start the strategy
    async fn start(&mut self) -> Result<()>;

    /// Stop the strategy and wait for its tasks to finish
    async fn stop(&mut self) -> Result<()>;

    /// Get current strategy metrics
    fn metrics(&self) -> StrategyMetrics;
}

/// Point-in-time strategy counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StrategyMetrics {
    pub cycles_run: u64,
    pub cycles_skipped: u64,
    pub signals_generated: u64,
    pub notifications_failed: u64,
    pub errors: u64,
    pub uptime_secs: u64,
}
