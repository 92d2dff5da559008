//! Error types for market data validation
//!
//! Every constructor in this crate that accepts untrusted input (bars from a
//! vendor feed, symbols from configuration, timeframe strings) reports failures
//! through [`ValidationError`] instead of panicking.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while validating bars, series and identifiers
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Price field is zero or negative
    #[error("{field} price must be positive, got {value}")]
    NonPositivePrice { field: &'static str, value: Decimal },

    /// High/low do not bracket open/close
    #[error("inconsistent bar range: high {high} low {low} open {open} close {close}")]
    InconsistentRange {
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    },

    /// Volume is negative
    #[error("volume must be non-negative, got {value}")]
    NegativeVolume { value: Decimal },

    /// Bars are not strictly increasing in time
    #[error("bar timestamps must be strictly increasing: {previous} is followed by {next}")]
    NonMonotonicTimestamp {
        previous: DateTime<Utc>,
        next: DateTime<Utc>,
    },

    /// An open (still updating) bar appears before the end of the series
    #[error("open bar at index {index} is not the most recent bar")]
    OpenBarNotLast { index: usize },

    /// Symbol is not in BASE/QUOTE form
    #[error("invalid instrument symbol '{symbol}' - expected BASE/QUOTE")]
    InvalidSymbol { symbol: String },

    /// Timeframe string is not recognised
    #[error("unknown timeframe '{input}'")]
    UnknownTimeframe { input: String },

    /// Custom validation failure with message
    #[error("Validation failed: {message}")]
    Custom { message: String },
}
