//! Strategy configuration
//!
//! Every threshold, weight and period the pipeline uses lives here. The
//! `Default` implementations form the starter profile shipped in
//! `configs/smc_strategy.toml`; none of them is a hidden constant.

use anyhow::Context;
use confluence_config::{load_layered, service, GlobalConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;
use types::{AssetClass, Instrument, Timeframe};

use crate::error::{Result, StrategyError};
use crate::indicators::IndicatorSpec;
use crate::structure::StructureKind;

/// One scheduled (instrument, timeframe) slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub symbol: Instrument,
    pub timeframe: Timeframe,
    /// Overrides the asset-class default poll interval
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

impl InstrumentConfig {
    pub fn new(symbol: Instrument, timeframe: Timeframe) -> Self {
        Self {
            symbol,
            timeframe,
            poll_interval_secs: None,
        }
    }

    /// Forex is polled every five minutes, gold and crypto every two
    pub fn poll_interval(&self) -> Duration {
        let secs = self.poll_interval_secs.unwrap_or(match self.symbol.asset_class() {
            AssetClass::Forex => service::scheduler::FOREX_POLL_INTERVAL_SECS,
            AssetClass::Metal | AssetClass::Crypto => service::scheduler::FAST_POLL_INTERVAL_SECS,
        });
        Duration::from_secs(secs)
    }
}

/// Structure analyzer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Bars on each side a swing must dominate
    pub swing_window: usize,
    /// Displacement body as a multiple of ATR
    pub displacement_atr_multiple: Decimal,
    pub atr_period: usize,
    /// Bars searched back from a displacement for the opposing candle
    pub order_block_lookback: usize,
    /// Relative distance within which highs or lows count as equal
    pub equal_level_tolerance: Decimal,
    pub min_touches: usize,
    pub liquidity_lookback: usize,
    /// Minimum gap width as a fraction of price
    pub min_gap_ratio: Decimal,
    /// Closed bars required before any event is emitted
    pub min_bars: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            swing_window: 5,
            displacement_atr_multiple: dec!(1.5),
            atr_period: 14,
            order_block_lookback: 10,
            equal_level_tolerance: dec!(0.001),
            min_touches: 3,
            liquidity_lookback: 20,
            min_gap_ratio: Decimal::ZERO,
            min_bars: 20,
        }
    }
}

/// Weight per structure event kind, plus the swing-trend vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureWeights {
    pub bos: Decimal,
    pub choch: Decimal,
    pub order_block: Decimal,
    pub fair_value_gap: Decimal,
    pub liquidity_zone: Decimal,
    /// Higher highs and higher lows vote BUY, the mirror votes SELL
    pub market_structure: Decimal,
}

impl StructureWeights {
    /// Weight for a voting event kind; invalidations never vote
    pub fn for_kind(&self, kind: &StructureKind) -> Decimal {
        match kind.name() {
            "bos" => self.bos,
            "choch" => self.choch,
            "order_block" => self.order_block,
            "fair_value_gap" => self.fair_value_gap,
            "liquidity_zone" => self.liquidity_zone,
            _ => Decimal::ZERO,
        }
    }

    fn entries(&self) -> [(&'static str, Decimal); 6] {
        [
            ("bos", self.bos),
            ("choch", self.choch),
            ("order_block", self.order_block),
            ("fair_value_gap", self.fair_value_gap),
            ("liquidity_zone", self.liquidity_zone),
            ("market_structure", self.market_structure),
        ]
    }
}

impl Default for StructureWeights {
    fn default() -> Self {
        Self {
            bos: dec!(2.0),
            choch: dec!(2.5),
            order_block: dec!(1.5),
            fair_value_gap: dec!(1.0),
            liquidity_zone: dec!(1.0),
            market_structure: dec!(1.5),
        }
    }
}

/// Indicator vote thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteThresholds {
    pub rsi_oversold: Decimal,
    pub rsi_overbought: Decimal,
    pub macd_threshold: Decimal,
    pub stochastic_oversold: Decimal,
    pub stochastic_overbought: Decimal,
    pub cci_threshold: Decimal,
    pub williams_oversold: Decimal,
    pub williams_overbought: Decimal,
    pub bollinger_lower: Decimal,
    pub bollinger_upper: Decimal,
    pub mfi_oversold: Decimal,
    pub mfi_overbought: Decimal,
    pub cmf_threshold: Decimal,
    pub adx_trend_threshold: Decimal,
    pub donchian_upper: Decimal,
    pub donchian_lower: Decimal,
}

impl Default for VoteThresholds {
    fn default() -> Self {
        Self {
            rsi_oversold: dec!(30),
            rsi_overbought: dec!(70),
            macd_threshold: dec!(0.001),
            stochastic_oversold: dec!(20),
            stochastic_overbought: dec!(80),
            cci_threshold: dec!(100),
            williams_oversold: dec!(-80),
            williams_overbought: dec!(-20),
            bollinger_lower: dec!(0.2),
            bollinger_upper: dec!(0.8),
            mfi_oversold: dec!(20),
            mfi_overbought: dec!(80),
            cmf_threshold: dec!(0.1),
            adx_trend_threshold: dec!(25),
            donchian_upper: dec!(0.75),
            donchian_lower: dec!(0.25),
        }
    }
}

/// Decision engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Weight per indicator key (`rsi`, `macd`, ...)
    pub indicator_weights: BTreeMap<String, Decimal>,
    /// Weight for indicators missing from `indicator_weights`
    pub default_indicator_weight: Decimal,
    pub structure_weights: StructureWeights,
    /// Per-bar decay applied to structure weights
    pub recency_decay: Decimal,
    pub buy_threshold: Decimal,
    pub sell_threshold: Decimal,
    /// Directional verdicts below this confidence become HOLD
    pub min_confidence: Option<Decimal>,
    pub thresholds: VoteThresholds,
}

impl DecisionConfig {
    pub fn indicator_weight(&self, key: &str) -> Decimal {
        self.indicator_weights
            .get(key)
            .copied()
            .unwrap_or(self.default_indicator_weight)
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        let indicator_weights = [
            ("rsi", dec!(1.5)),
            ("macd", dec!(1.5)),
            ("adx", dec!(1.0)),
            ("atr", Decimal::ZERO),
            ("obv", Decimal::ZERO),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            indicator_weights,
            default_indicator_weight: Decimal::ONE,
            structure_weights: StructureWeights::default(),
            recency_decay: dec!(0.95),
            buy_threshold: dec!(2),
            sell_threshold: dec!(2),
            min_confidence: Some(dec!(0.3)),
            thresholds: VoteThresholds::default(),
        }
    }
}

/// Scheduler runtime parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub fetch_timeout_secs: u64,
    /// Minimum bar-time spacing between directional signals per instrument
    pub signal_cooldown_secs: u64,
    pub history_bars: usize,
    pub notification_channel_capacity: usize,
    pub metrics_log_interval_secs: u64,
}

impl SchedulerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn signal_cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.signal_cooldown_secs).unwrap_or(i64::MAX))
    }

    pub fn metrics_log_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_log_interval_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: service::scheduler::FETCH_TIMEOUT_SECS,
            signal_cooldown_secs: service::scheduler::SIGNAL_COOLDOWN_SECS,
            history_bars: service::market_data::DEFAULT_HISTORY_BARS,
            notification_channel_capacity: service::notifications::CHANNEL_CAPACITY,
            metrics_log_interval_secs: service::scheduler::METRICS_LOG_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub instruments: Vec<InstrumentConfig>,
    pub indicators: Vec<IndicatorSpec>,
    pub structure: StructureConfig,
    pub decision: DecisionConfig,
    /// Closed bars required before the pipeline evaluates a series
    pub min_lookback_bars: usize,
    pub scheduler: SchedulerConfig,
    pub global: GlobalConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        let slot = |symbol: &str, timeframe| {
            Instrument::new(symbol)
                .ok()
                .map(|instrument| InstrumentConfig::new(instrument, timeframe))
        };
        Self {
            instruments: [
                slot("EUR/USD", Timeframe::M15),
                slot("GBP/USD", Timeframe::M15),
                slot("USD/JPY", Timeframe::M15),
                slot("XAU/USD", Timeframe::M5),
                slot("BTC/USD", Timeframe::M5),
            ]
            .into_iter()
            .flatten()
            .collect(),
            indicators: IndicatorSpec::default_battery(),
            structure: StructureConfig::default(),
            decision: DecisionConfig::default(),
            min_lookback_bars: 50,
            scheduler: SchedulerConfig::default(),
            global: GlobalConfig::default(),
        }
    }
}

impl StrategyConfig {
    /// Load base file, environment overlay and `CONFLUENCE_` variables, then validate
    pub fn load(path: &Path, environment: Option<&str>) -> anyhow::Result<Self> {
        let mut config: StrategyConfig = load_layered(path, environment, service::ENV_PREFIX)?;
        config
            .global
            .expand_env_vars()
            .context("Failed to expand configured paths")?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a single TOML file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config: StrategyConfig = strategy_shared::load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StrategyConfig = toml::from_str(content)
            .map_err(|e| StrategyError::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Largest lookback of the configured indicators
    pub fn max_indicator_lookback(&self) -> usize {
        self.indicators
            .iter()
            .map(IndicatorSpec::lookback)
            .max()
            .unwrap_or(0)
    }

    /// Reject malformed configuration before any cycle runs
    pub fn validate(&self) -> Result<()> {
        if self.instruments.is_empty() {
            return Err(StrategyError::configuration("instrument list is empty"));
        }

        let mut labels = std::collections::HashSet::new();
        for spec in &self.indicators {
            spec.validate().map_err(StrategyError::configuration)?;
            if !labels.insert(spec.label()) {
                return Err(StrategyError::configuration(format!(
                    "indicator {} is configured twice",
                    spec.label()
                )));
            }
        }

        self.validate_structure()?;
        self.validate_decision()?;

        if self.min_lookback_bars == 0 {
            return Err(StrategyError::configuration(
                "min_lookback_bars must be greater than zero",
            ));
        }
        if self.structure.min_bars > self.min_lookback_bars {
            return Err(StrategyError::configuration(format!(
                "structure.min_bars ({}) exceeds min_lookback_bars ({})",
                self.structure.min_bars, self.min_lookback_bars
            )));
        }
        let max_lookback = self.max_indicator_lookback();
        if self.min_lookback_bars < max_lookback {
            warn!(
                "min_lookback_bars {} is below the largest indicator lookback {}; \
                 some indicators will abstain",
                self.min_lookback_bars, max_lookback
            );
        }

        if self.scheduler.history_bars < self.min_lookback_bars {
            return Err(StrategyError::configuration(format!(
                "scheduler.history_bars ({}) is below min_lookback_bars ({})",
                self.scheduler.history_bars, self.min_lookback_bars
            )));
        }
        if self.scheduler.fetch_timeout_secs == 0 {
            return Err(StrategyError::configuration(
                "scheduler.fetch_timeout_secs must be greater than zero",
            ));
        }
        if self.scheduler.metrics_log_interval_secs == 0 {
            return Err(StrategyError::configuration(
                "scheduler.metrics_log_interval_secs must be greater than zero",
            ));
        }
        if self.scheduler.notification_channel_capacity == 0 {
            return Err(StrategyError::configuration(
                "scheduler.notification_channel_capacity must be greater than zero",
            ));
        }
        if self.instruments.iter().any(|i| i.poll_interval_secs == Some(0)) {
            return Err(StrategyError::configuration(
                "poll_interval_secs must be greater than zero",
            ));
        }
        Ok(())
    }

    fn validate_structure(&self) -> Result<()> {
        let s = &self.structure;
        let zero = [
            ("swing_window", s.swing_window),
            ("atr_period", s.atr_period),
            ("order_block_lookback", s.order_block_lookback),
            ("liquidity_lookback", s.liquidity_lookback),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);
        if let Some((name, _)) = zero {
            return Err(StrategyError::configuration(format!(
                "structure.{} must be greater than zero",
                name
            )));
        }
        if s.min_touches < 2 {
            return Err(StrategyError::configuration(
                "structure.min_touches must be at least 2",
            ));
        }
        if s.displacement_atr_multiple <= Decimal::ZERO {
            return Err(StrategyError::configuration(
                "structure.displacement_atr_multiple must be positive",
            ));
        }
        if s.equal_level_tolerance < Decimal::ZERO || s.min_gap_ratio < Decimal::ZERO {
            return Err(StrategyError::configuration(
                "structure tolerances must not be negative",
            ));
        }
        Ok(())
    }

    fn validate_decision(&self) -> Result<()> {
        let d = &self.decision;
        for (key, weight) in &d.indicator_weights {
            if !IndicatorSpec::KEYS.contains(&key.as_str()) {
                return Err(StrategyError::configuration(format!(
                    "unknown indicator key '{}' in decision.indicator_weights",
                    key
                )));
            }
            if *weight < Decimal::ZERO {
                return Err(StrategyError::configuration(format!(
                    "negative weight {} for indicator '{}'",
                    weight, key
                )));
            }
        }
        if d.default_indicator_weight < Decimal::ZERO {
            return Err(StrategyError::configuration(
                "decision.default_indicator_weight must not be negative",
            ));
        }
        if let Some((kind, weight)) = d
            .structure_weights
            .entries()
            .into_iter()
            .find(|(_, w)| *w < Decimal::ZERO)
        {
            return Err(StrategyError::configuration(format!(
                "negative weight {} for structure kind '{}'",
                weight, kind
            )));
        }
        if d.buy_threshold <= Decimal::ZERO || d.sell_threshold <= Decimal::ZERO {
            return Err(StrategyError::configuration(
                "decision buy/sell thresholds must be positive",
            ));
        }
        if let Some(min) = d.min_confidence {
            if min < Decimal::ZERO || min > Decimal::ONE {
                return Err(StrategyError::configuration(format!(
                    "decision.min_confidence {} is outside [0, 1]",
                    min
                )));
            }
        }
        if d.recency_decay <= Decimal::ZERO || d.recency_decay > Decimal::ONE {
            return Err(StrategyError::configuration(format!(
                "decision.recency_decay {} is outside (0, 1]",
                d.recency_decay
            )));
        }
        Ok(())
    }
}
