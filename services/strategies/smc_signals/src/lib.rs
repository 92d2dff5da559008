//! # SMC Signals Strategy - Indicator and Market Structure Confluence
//!
//! ## Purpose
//!
//! Scheduled signal generation for forex pairs, gold and bitcoin. Each cycle
//! pulls closed bars for an instrument and timeframe, runs a configured
//! battery of technical indicators alongside smart-money-concept structure
//! analysis, and fuses both into a BUY / SELL / HOLD decision with a
//! confidence score and an ordered reasoning trace.
//!
//! ## Integration Points
//!
//! - **Input Sources**: any [`MarketDataFeed`]; [`JsonFileFeed`] reads bar
//!   snapshots written by an external fetcher
//! - **Output Destinations**: [`JournalSink`] for every decision,
//!   [`NotificationSink`]s for directional ones
//! - **Monitoring**: [`strategy_shared::MetricsCollector`] counters logged by
//!   the scheduler, [`StructureCache`] snapshots for readers
//! - **Configuration**: `configs/smc_strategy.toml` layered with
//!   `CONFLUENCE_*` environment variables
//!
//! ## Architecture Role
//!
//! ```text
//! MarketDataFeed → Series ─┬─→ [Indicator Engine] ───→ IndicatorResult ─┐
//!                          │                                           ├─→ [Decision Engine]
//!                          └─→ [Structure Analyzer] ─→ StructureLog ───┘          │
//!                                                                          SignalDecision
//!                                                                     ┌───────────┴──────────┐
//!                                                               JournalSink       NotificationSink
//! ```
//!
//! The pipeline stages are pure functions of the series, the slot's
//! structure log and the configuration. Time only enters through bar
//! timestamps, so a replay of the same bars yields byte-identical decisions.
//!
//! ## Strategy Components
//!
//! ### Indicator Engine
//! - **Trend**: SMA, EMA, WMA, MACD, ADX, Donchian channels
//! - **Momentum**: RSI, stochastic, CCI, Williams %R, momentum, rate of change
//! - **Volatility**: Bollinger bands, ATR
//! - **Volume**: MFI, OBV, CMF, VWAP (abstain on volume-less forex bars)
//!
//! ### Structure Analyzer
//! - **Swings**: confirmed swing highs and lows, market structure
//! - **Breaks**: BOS with the trend, CHoCH against it
//! - **Zones**: order blocks, fair-value gaps, liquidity pools, each retired
//!   by an append-only invalidation event
//!
//! ## Examples
//!
//! ```rust
//! use smc_signals::{SignalPipeline, StrategyConfig, StructureLog};
//! use strategy_shared::testing::{linear_closes, series_from_closes};
//! use rust_decimal_macros::dec;
//! use types::Timeframe;
//!
//! let config = StrategyConfig::default();
//! let pipeline = SignalPipeline::new(&config);
//! let closes = linear_closes(dec!(1.08), dec!(0.0002), 120);
//! let series = series_from_closes("EUR/USD", Timeframe::M15, &closes);
//!
//! let mut log = StructureLog::new();
//! let output = pipeline.evaluate(&series, &log).unwrap();
//! output.commit(&mut log).unwrap();
//! println!("{}", smc_signals::format::format_reasoning(&output.decision));
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod format;
pub mod indicators;
pub mod journal;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod signals;
pub mod strategy;
pub mod structure;
pub mod votes;

pub use cache::{SlotKey, SlotSnapshot, StructureCache};
pub use config::{
    DecisionConfig, InstrumentConfig, SchedulerConfig, StrategyConfig, StructureConfig,
    StructureWeights, VoteThresholds,
};
pub use error::{FeedError, JournalError, NotifyError, Result, StrategyError};
pub use feed::{JsonFileFeed, MarketDataFeed, StaticFeed};
pub use indicators::{
    IndicatorEngine, IndicatorOutput, IndicatorResult, IndicatorSpec, IndicatorValue,
};
pub use journal::{
    JournalEntry, JournalSink, JsonlJournal, MemoryJournal, Outcome, PerformanceSummary,
};
pub use notify::{ChannelNotifier, LogNotifier, NotificationSink};
pub use pipeline::{PipelineOutput, SignalPipeline};
pub use signals::{
    DecisionEngine, DecisionKey, FactorVote, SignalDecision, SignalStats, SignalStrength, Verdict,
};
pub use strategy::{CycleOutcome, SignalScheduler, SlotWorker};
pub use structure::{StructureAnalyzer, StructureEvent, StructureLog};
pub use votes::Direction;

/// Re-export key market types
pub use rust_decimal::Decimal;
pub use types::{Bar, Instrument, Series, Timeframe};
