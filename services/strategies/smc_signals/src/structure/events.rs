//! Structure event model

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic identifier within one [`super::StructureLog`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Bullish,
    Bearish,
}

impl Bias {
    pub fn opposite(self) -> Self {
        match self {
            Bias::Bullish => Bias::Bearish,
            Bias::Bearish => Bias::Bullish,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Bias::Bullish => "bullish",
            Bias::Bearish => "bearish",
        }
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prevailing swing structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStructure {
    Bullish,
    Bearish,
    #[default]
    Ranging,
}

impl MarketStructure {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketStructure::Bullish => "bullish",
            MarketStructure::Bearish => "bearish",
            MarketStructure::Ranging => "ranging",
        }
    }
}

impl fmt::Display for MarketStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakStyle {
    /// Break in the direction of the prevailing trend
    Bos,
    /// Break against it
    Choch,
}

/// Inclusive price interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceRange {
    pub low: Decimal,
    pub high: Decimal,
}

impl PriceRange {
    /// Range spanning both prices in either order
    pub fn new(a: Decimal, b: Decimal) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn point(price: Decimal) -> Self {
        Self {
            low: price,
            high: price,
        }
    }

    pub fn contains(&self, price: Decimal) -> bool {
        self.low <= price && price <= self.high
    }

    pub fn width(&self) -> Decimal {
        self.high - self.low
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}

/// First and last bar an event covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BarSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    /// A close went through the far side of an order block
    ClosedThrough,
    /// Price traded back into a fair-value gap
    Filled,
    /// Price ran the resting liquidity
    Swept,
    /// A later break of structure replaced this one
    Superseded,
}

impl InvalidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidationReason::ClosedThrough => "closed through",
            InvalidationReason::Filled => "filled",
            InvalidationReason::Swept => "swept",
            InvalidationReason::Superseded => "superseded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructureKind {
    StructureBreak {
        style: BreakStyle,
        broken_level: Decimal,
    },
    OrderBlock,
    FairValueGap,
    LiquidityZone {
        touches: usize,
    },
    Invalidation {
        target: EventId,
        reason: InvalidationReason,
    },
}

impl StructureKind {
    /// Stable name used in factor names and weight tables
    pub fn name(&self) -> &'static str {
        match self {
            StructureKind::StructureBreak {
                style: BreakStyle::Bos,
                ..
            } => "bos",
            StructureKind::StructureBreak {
                style: BreakStyle::Choch,
                ..
            } => "choch",
            StructureKind::OrderBlock => "order_block",
            StructureKind::FairValueGap => "fair_value_gap",
            StructureKind::LiquidityZone { .. } => "liquidity_zone",
            StructureKind::Invalidation { .. } => "invalidation",
        }
    }
}

/// Immutable structural fact derived from closed bars
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureEvent {
    pub id: EventId,
    pub kind: StructureKind,
    pub bias: Bias,
    pub zone: PriceRange,
    pub bars: BarSpan,
    /// Timestamp of the bar on which the event became known
    pub emitted_at: DateTime<Utc>,
}

impl StructureEvent {
    pub fn is_invalidation(&self) -> bool {
        matches!(self.kind, StructureKind::Invalidation { .. })
    }

    /// Event this one invalidates, if any
    pub fn target(&self) -> Option<EventId> {
        match self.kind {
            StructureKind::Invalidation { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Factor name used in decision reasoning, `<kind>@<timestamp>`
    pub fn factor_name(&self) -> String {
        format!(
            "{}@{}",
            self.kind.name(),
            self.bars.end.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }

    /// Short human-readable description
    pub fn describe(&self) -> String {
        match self.kind {
            StructureKind::StructureBreak {
                style,
                broken_level,
            } => {
                let style = match style {
                    BreakStyle::Bos => "break of structure",
                    BreakStyle::Choch => "change of character",
                };
                format!("{} {} through {}", self.bias, style, broken_level)
            }
            StructureKind::OrderBlock => format!("{} order block at {}", self.bias, self.zone),
            StructureKind::FairValueGap => format!("{} fair-value gap {}", self.bias, self.zone),
            StructureKind::LiquidityZone { touches } => {
                let side = match self.bias {
                    Bias::Bearish => "equal highs",
                    Bias::Bullish => "equal lows",
                };
                format!("{} at {} ({} touches)", side, self.zone, touches)
            }
            StructureKind::Invalidation { target, reason } => {
                format!("{} {}", target, reason.as_str())
            }
        }
    }
}
