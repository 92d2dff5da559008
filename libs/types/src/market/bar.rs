//! OHLCV bars

use crate::common::ValidationError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a bar is final or still being updated by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarStatus {
    #[default]
    Closed,
    Open,
}

/// One OHLCV bar. Volume is absent for most forex feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub status: BarStatus,
}

impl Bar {
    /// Create a closed bar, validating prices and volume
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Option<Decimal>,
    ) -> Result<Self, ValidationError> {
        let bar = Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            status: BarStatus::Closed,
        };
        bar.validate()?;
        Ok(bar)
    }

    /// Mark this bar as still updating
    pub fn into_open(mut self) -> Self {
        self.status = BarStatus::Open;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if value <= Decimal::ZERO {
                return Err(ValidationError::NonPositivePrice { field, value });
            }
        }

        if self.high < self.open.max(self.close) || self.low > self.open.min(self.close) {
            return Err(ValidationError::InconsistentRange {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if let Some(volume) = self.volume {
            if volume < Decimal::ZERO {
                return Err(ValidationError::NegativeVolume { value: volume });
            }
        }

        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.status == BarStatus::Closed
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Absolute candle body size
    pub fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> Decimal {
        (self.high + self.low + self.close) / Decimal::from(3)
    }

    /// True range against the previous close; plain range for the first bar
    pub fn true_range(&self, previous_close: Option<Decimal>) -> Decimal {
        match previous_close {
            Some(prev) => self
                .range()
                .max((self.high - prev).abs())
                .max((self.low - prev).abs()),
            None => self.range(),
        }
    }
}
