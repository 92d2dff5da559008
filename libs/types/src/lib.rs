//! # Confluence Market Types
//!
//! Shared market data types for the Confluence signal services.
//!
//! ## Design Philosophy
//!
//! - **No Precision Loss**: Prices and volumes are `rust_decimal::Decimal`
//! - **Validated At The Boundary**: Bars, series and symbols are checked when
//!   constructed, so downstream engines can rely on positive prices,
//!   consistent ranges and strictly increasing timestamps
//! - **Closed vs Open Bars**: The live candle is explicitly marked and never
//!   mistaken for a finalised bar
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use rust_decimal::Decimal;
//! use types::{Bar, Instrument, Series, Timeframe};
//!
//! let gold = Instrument::new("XAU/USD").unwrap();
//! let ts = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
//! let px = Decimal::from(2300);
//! let bar = Bar::new(ts, px, px + Decimal::ONE, px - Decimal::ONE, px, None).unwrap();
//!
//! let series = Series::new(gold, Timeframe::H1, vec![bar]).unwrap();
//! assert_eq!(series.closed_len(), 1);
//! ```
//!
//! ## Integration Points
//!
//! - **Market Data Feeds**: build [`Series`] values from vendor payloads
//! - **Strategy Services**: read [`Series::closed`] for indicator and structure analysis
//! - **Journaling**: [`Instrument`] and [`Timeframe`] form part of the decision join key

pub mod common;
pub mod market;

pub use common::errors::ValidationError;
pub use market::{AssetClass, Bar, BarStatus, Gap, Instrument, Series, Timeframe};

// Define Result type alias
pub type Result<T> = std::result::Result<T, ValidationError>;
