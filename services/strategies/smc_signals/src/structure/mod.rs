//! Smart-money-concept structure analysis
//!
//! ## Event Types
//!
//! - **Structure break**: a close through the latest confirmed swing level,
//!   `Bos` with the trend, `Choch` against it
//! - **Order block**: last opposing candle before an ATR-sized displacement
//! - **Fair-value gap**: three-bar imbalance between bar one and bar three
//! - **Liquidity zone**: cluster of equal highs or lows
//! - **Invalidation**: append-only marker that retires one of the zones above
//!
//! Overlapping zones are all kept; the decision engine weighs them by recency.

pub mod analyzer;
pub mod events;
pub mod log;
pub mod swings;

pub use analyzer::StructureAnalyzer;
pub use events::{
    BarSpan, Bias, BreakStyle, EventId, InvalidationReason, MarketStructure, PriceRange,
    StructureEvent, StructureKind,
};
pub use log::{LogError, StructureLog};
