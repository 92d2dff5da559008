//! Service configuration and defaults
//!
//! This module contains default configuration values and constants
//! used across Confluence services for consistency.

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "CONFLUENCE";

/// Scheduler defaults
pub mod scheduler {
    /// Forex pairs are polled every five minutes
    pub const FOREX_POLL_INTERVAL_SECS: u64 = 300;

    /// Gold and crypto move faster and are polled every two minutes
    pub const FAST_POLL_INTERVAL_SECS: u64 = 120;

    /// A feed fetch that takes longer than this drops the cycle
    pub const FETCH_TIMEOUT_SECS: u64 = 10;

    /// Minimum spacing between directional signals for one instrument
    pub const SIGNAL_COOLDOWN_SECS: u64 = 300;

    /// Interval for logging the metrics snapshot
    pub const METRICS_LOG_INTERVAL_SECS: u64 = 3600;
}

/// Notification defaults
pub mod notifications {
    /// Bounded queue between the scheduler and a channel notifier
    pub const CHANNEL_CAPACITY: usize = 1000;
}

/// Market data defaults
pub mod market_data {
    /// Bars requested per fetch when the strategy does not ask for more
    pub const DEFAULT_HISTORY_BARS: usize = 200;
}
