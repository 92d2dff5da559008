//! Error types for the SMC signals strategy

use thiserror::Error;
use types::ValidationError;

use crate::structure::LogError;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Insufficient data: {have} closed bars available, {need} required")]
    InsufficientData { have: usize, need: usize },

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotifyError),

    #[error("Structure log error: {0}")]
    Structure(#[from] LogError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StrategyError {
    pub fn configuration(message: impl Into<String>) -> Self {
        StrategyError::Configuration {
            message: message.into(),
        }
    }
}

/// Market data feed failures
#[derive(Debug, Error)]
pub enum FeedError {
    /// Fewer closed bars than requested, or no data at all
    #[error("data unavailable: {have} closed bars, {need} required")]
    DataUnavailable { have: usize, need: usize },

    #[error("transport failure: {message}")]
    Transport { message: String },

    #[error("malformed market data: {0}")]
    Malformed(#[from] ValidationError),
}

/// Journaling sink failures
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("decision {key} already journaled")]
    DuplicateDecision { key: String },

    #[error("no journaled decision for {key}")]
    UnknownDecision { key: String },

    #[error("outcome for {key} already recorded")]
    OutcomeExists { key: String },

    #[error("journal IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Notification sink failures
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel is full")]
    ChannelFull,

    #[error("notification channel is closed")]
    ChannelClosed,

    #[error("delivery failed: {message}")]
    Delivery { message: String },
}

pub type Result<T> = std::result::Result<T, StrategyError>;
