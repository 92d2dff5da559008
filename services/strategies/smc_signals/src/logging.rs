//! Standardized emoji logging for the SMC signals service
//!
//! Provides consistent emoji markers across scheduler, pipeline and sink
//! log lines, plus the one-time subscriber setup used by the binary.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Standard emoji set for signal service logging
pub struct LogEmoji;

impl LogEmoji {
    // Status indicators
    pub const SUCCESS: &'static str = "✅"; // Operation succeeded
    pub const ERROR: &'static str = "❌"; // Operation failed
    pub const WARNING: &'static str = "⚠️"; // Warning or caution

    // Module-specific
    pub const SEARCH: &'static str = "🔍"; // Structure analysis
    pub const CHART: &'static str = "📊"; // Data/statistics/metrics
    pub const SIGNAL: &'static str = "📡"; // Decision emitted
    pub const SKIP: &'static str = "⏭️"; // Cycle skipped
    pub const CLOCK: &'static str = "⏱️"; // Timing/cooldown
}

// Convenience macros for standardized logging
#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::SUCCESS, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        tracing::error!("{} {}", $crate::logging::LogEmoji::ERROR, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        tracing::warn!("{} {}", $crate::logging::LogEmoji::WARNING, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_search {
    ($($arg:tt)*) => {
        tracing::debug!("{} {}", $crate::logging::LogEmoji::SEARCH, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_metrics {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::CHART, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_signal {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::SIGNAL, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_skip {
    ($($arg:tt)*) => {
        tracing::warn!("{} {}", $crate::logging::LogEmoji::SKIP, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_cooldown {
    ($($arg:tt)*) => {
        tracing::debug!("{} {}", $crate::logging::LogEmoji::CLOCK, format!($($arg)*))
    };
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over `default_level` when set. Call once, from a binary.
pub fn init_logging(service: &str, default_level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid log filter '{}': {}", default_level, e))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("failed to initialise logging for {}: {}", service, e))?;

    tracing::info!("{} Logging initialised for {}", LogEmoji::SUCCESS, service);
    Ok(())
}
