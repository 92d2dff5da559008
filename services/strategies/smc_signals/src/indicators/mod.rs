//! Technical indicator engine
//!
//! [`IndicatorEngine`] evaluates a configured battery of [`IndicatorSpec`]s
//! over the closed bars of a [`Series`]. Each computation only reads bars at
//! or before the evaluation point. A series shorter than an indicator's
//! lookback produces [`IndicatorValue::NotReady`], never a zero reading, and
//! every division guard resolves to a fixed boundary value documented on the
//! individual function.

pub mod momentum;
pub mod moving_average;
pub mod trend;
pub mod volatility;
pub mod volume;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use types::{Bar, Series};

pub use moving_average::{ExponentialAverage, MovingAverage};

/// One configured indicator and its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorSpec {
    Sma { period: usize },
    Ema { period: usize },
    Wma { period: usize },
    Rsi { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
    Bollinger { period: usize, std_dev: Decimal },
    Stochastic { k: usize, d: usize },
    Atr { period: usize },
    Adx { period: usize },
    Cci { period: usize },
    WilliamsR { period: usize },
    Momentum { period: usize },
    Roc { period: usize },
    Mfi { period: usize },
    Obv,
    Cmf { period: usize },
    Vwap,
    Donchian { period: usize },
}

impl IndicatorSpec {
    /// Every indicator key accepted in configuration
    pub const KEYS: [&'static str; 18] = [
        "sma",
        "ema",
        "wma",
        "rsi",
        "macd",
        "bollinger",
        "stochastic",
        "atr",
        "adx",
        "cci",
        "williams_r",
        "momentum",
        "roc",
        "mfi",
        "obv",
        "cmf",
        "vwap",
        "donchian",
    ];

    /// Indicator family key, shared by all parameterisations
    pub fn key(&self) -> &'static str {
        match self {
            IndicatorSpec::Sma { .. } => "sma",
            IndicatorSpec::Ema { .. } => "ema",
            IndicatorSpec::Wma { .. } => "wma",
            IndicatorSpec::Rsi { .. } => "rsi",
            IndicatorSpec::Macd { .. } => "macd",
            IndicatorSpec::Bollinger { .. } => "bollinger",
            IndicatorSpec::Stochastic { .. } => "stochastic",
            IndicatorSpec::Atr { .. } => "atr",
            IndicatorSpec::Adx { .. } => "adx",
            IndicatorSpec::Cci { .. } => "cci",
            IndicatorSpec::WilliamsR { .. } => "williams_r",
            IndicatorSpec::Momentum { .. } => "momentum",
            IndicatorSpec::Roc { .. } => "roc",
            IndicatorSpec::Mfi { .. } => "mfi",
            IndicatorSpec::Obv => "obv",
            IndicatorSpec::Cmf { .. } => "cmf",
            IndicatorSpec::Vwap => "vwap",
            IndicatorSpec::Donchian { .. } => "donchian",
        }
    }

    /// Unique label including parameters, e.g. `ema_20` or `macd_12_26_9`
    pub fn label(&self) -> String {
        match self {
            IndicatorSpec::Sma { period }
            | IndicatorSpec::Ema { period }
            | IndicatorSpec::Wma { period }
            | IndicatorSpec::Rsi { period }
            | IndicatorSpec::Atr { period }
            | IndicatorSpec::Adx { period }
            | IndicatorSpec::Cci { period }
            | IndicatorSpec::WilliamsR { period }
            | IndicatorSpec::Momentum { period }
            | IndicatorSpec::Roc { period }
            | IndicatorSpec::Mfi { period }
            | IndicatorSpec::Cmf { period }
            | IndicatorSpec::Donchian { period } => format!("{}_{}", self.key(), period),
            IndicatorSpec::Macd { fast, slow, signal } => {
                format!("macd_{}_{}_{}", fast, slow, signal)
            }
            IndicatorSpec::Bollinger { period, std_dev } => {
                format!("bollinger_{}_{}", period, std_dev.normalize())
            }
            IndicatorSpec::Stochastic { k, d } => format!("stochastic_{}_{}", k, d),
            IndicatorSpec::Obv | IndicatorSpec::Vwap => self.key().to_string(),
        }
    }

    /// Closed bars required before a value is produced
    pub fn lookback(&self) -> usize {
        match self {
            IndicatorSpec::Sma { period }
            | IndicatorSpec::Ema { period }
            | IndicatorSpec::Wma { period }
            | IndicatorSpec::Bollinger { period, .. }
            | IndicatorSpec::Cci { period }
            | IndicatorSpec::WilliamsR { period }
            | IndicatorSpec::Cmf { period }
            | IndicatorSpec::Donchian { period } => *period,
            IndicatorSpec::Rsi { period }
            | IndicatorSpec::Atr { period }
            | IndicatorSpec::Momentum { period }
            | IndicatorSpec::Roc { period }
            | IndicatorSpec::Mfi { period } => period + 1,
            IndicatorSpec::Macd { slow, signal, .. } => (slow + signal).saturating_sub(1),
            IndicatorSpec::Stochastic { k, d } => (k + d).saturating_sub(1),
            IndicatorSpec::Adx { period } => 2 * period + 1,
            IndicatorSpec::Obv => 2,
            IndicatorSpec::Vwap => 1,
        }
    }

    pub fn needs_volume(&self) -> bool {
        matches!(
            self,
            IndicatorSpec::Mfi { .. }
                | IndicatorSpec::Obv
                | IndicatorSpec::Cmf { .. }
                | IndicatorSpec::Vwap
        )
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), String> {
        let label = self.label();
        let zero_period = match self {
            IndicatorSpec::Sma { period }
            | IndicatorSpec::Ema { period }
            | IndicatorSpec::Wma { period }
            | IndicatorSpec::Rsi { period }
            | IndicatorSpec::Atr { period }
            | IndicatorSpec::Adx { period }
            | IndicatorSpec::Cci { period }
            | IndicatorSpec::WilliamsR { period }
            | IndicatorSpec::Momentum { period }
            | IndicatorSpec::Roc { period }
            | IndicatorSpec::Mfi { period }
            | IndicatorSpec::Cmf { period }
            | IndicatorSpec::Donchian { period }
            | IndicatorSpec::Bollinger { period, .. } => *period == 0,
            IndicatorSpec::Macd { fast, slow, signal } => *fast == 0 || *slow == 0 || *signal == 0,
            IndicatorSpec::Stochastic { k, d } => *k == 0 || *d == 0,
            IndicatorSpec::Obv | IndicatorSpec::Vwap => false,
        };
        if zero_period {
            return Err(format!("{}: periods must be greater than zero", label));
        }

        match self {
            IndicatorSpec::Macd { fast, slow, .. } if fast >= slow => Err(format!(
                "{}: fast period {} must be shorter than slow period {}",
                label, fast, slow
            )),
            IndicatorSpec::Bollinger { std_dev, .. } if *std_dev <= Decimal::ZERO => Err(format!(
                "{}: std_dev must be positive, got {}",
                label, std_dev
            )),
            _ => Ok(()),
        }
    }

    /// The indicator battery used when configuration does not list one
    pub fn default_battery() -> Vec<IndicatorSpec> {
        vec![
            IndicatorSpec::Sma { period: 20 },
            IndicatorSpec::Sma { period: 50 },
            IndicatorSpec::Ema { period: 12 },
            IndicatorSpec::Ema { period: 26 },
            IndicatorSpec::Rsi { period: 14 },
            IndicatorSpec::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
            },
            IndicatorSpec::Bollinger {
                period: 20,
                std_dev: Decimal::TWO,
            },
            IndicatorSpec::Stochastic { k: 14, d: 3 },
            IndicatorSpec::Atr { period: 14 },
            IndicatorSpec::Adx { period: 14 },
            IndicatorSpec::Cci { period: 20 },
            IndicatorSpec::WilliamsR { period: 14 },
            IndicatorSpec::Momentum { period: 10 },
            IndicatorSpec::Roc { period: 10 },
            IndicatorSpec::Mfi { period: 14 },
            IndicatorSpec::Obv,
            IndicatorSpec::Cmf { period: 20 },
            IndicatorSpec::Vwap,
            IndicatorSpec::Donchian { period: 20 },
        ]
    }
}

/// A computed indicator value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorOutput {
    Scalar {
        value: Decimal,
    },
    Macd {
        macd: Decimal,
        signal: Decimal,
        histogram: Decimal,
    },
    Bands {
        upper: Decimal,
        middle: Decimal,
        lower: Decimal,
    },
    Stochastic {
        k: Decimal,
        d: Decimal,
    },
    Directional {
        adx: Decimal,
        plus_di: Decimal,
        minus_di: Decimal,
    },
}

impl IndicatorOutput {
    pub fn scalar(value: Decimal) -> Self {
        IndicatorOutput::Scalar { value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorValue {
    NotReady,
    Ready(IndicatorOutput),
}

impl IndicatorValue {
    pub fn is_ready(&self) -> bool {
        matches!(self, IndicatorValue::Ready(_))
    }

    pub fn output(&self) -> Option<&IndicatorOutput> {
        match self {
            IndicatorValue::Ready(output) => Some(output),
            IndicatorValue::NotReady => None,
        }
    }
}

impl From<Option<IndicatorOutput>> for IndicatorValue {
    fn from(output: Option<IndicatorOutput>) -> Self {
        output.map_or(IndicatorValue::NotReady, IndicatorValue::Ready)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorReading {
    pub spec: IndicatorSpec,
    pub lookback: usize,
    pub value: IndicatorValue,
}

/// Readings for every configured indicator, keyed by label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    /// Timestamp of the bar the readings describe
    pub evaluated_at: Option<DateTime<Utc>>,
    /// Close of that bar
    pub close: Option<Decimal>,
    pub readings: BTreeMap<String, IndicatorReading>,
}

impl IndicatorResult {
    pub fn get(&self, label: &str) -> Option<&IndicatorReading> {
        self.readings.get(label)
    }

    pub fn ready_count(&self) -> usize {
        self.readings.values().filter(|r| r.value.is_ready()).count()
    }
}

/// Evaluate one indicator over closed bars
pub fn compute_indicator(spec: &IndicatorSpec, bars: &[Bar]) -> IndicatorValue {
    if bars.len() < spec.lookback() {
        return IndicatorValue::NotReady;
    }
    let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
    let scalar = |value: Option<Decimal>| value.map(IndicatorOutput::scalar);

    let output = match spec {
        IndicatorSpec::Sma { period } => scalar(moving_average::sma(&closes, *period)),
        IndicatorSpec::Ema { period } => scalar(moving_average::ema(&closes, *period)),
        IndicatorSpec::Wma { period } => scalar(moving_average::wma(&closes, *period)),
        IndicatorSpec::Rsi { period } => scalar(momentum::rsi(&closes, *period)),
        IndicatorSpec::Macd { fast, slow, signal } => {
            momentum::macd(&closes, *fast, *slow, *signal)
        }
        IndicatorSpec::Bollinger { period, std_dev } => {
            volatility::bollinger(&closes, *period, *std_dev)
        }
        IndicatorSpec::Stochastic { k, d } => momentum::stochastic(bars, *k, *d),
        IndicatorSpec::Atr { period } => scalar(volatility::atr(bars, *period)),
        IndicatorSpec::Adx { period } => trend::adx(bars, *period),
        IndicatorSpec::Cci { period } => scalar(momentum::cci(bars, *period)),
        IndicatorSpec::WilliamsR { period } => scalar(momentum::williams_r(bars, *period)),
        IndicatorSpec::Momentum { period } => scalar(momentum::momentum(&closes, *period)),
        IndicatorSpec::Roc { period } => scalar(momentum::roc(&closes, *period)),
        IndicatorSpec::Mfi { period } => scalar(volume::mfi(bars, *period)),
        IndicatorSpec::Obv => scalar(volume::obv(bars)),
        IndicatorSpec::Cmf { period } => scalar(volume::cmf(bars, *period)),
        IndicatorSpec::Vwap => scalar(volume::vwap(bars)),
        IndicatorSpec::Donchian { period } => trend::donchian(bars, *period),
    };
    output.into()
}

/// Computes a fixed indicator battery over bar series
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    specs: Vec<IndicatorSpec>,
}

impl IndicatorEngine {
    pub fn new(specs: Vec<IndicatorSpec>) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &[IndicatorSpec] {
        &self.specs
    }

    /// Largest lookback in the battery
    pub fn max_lookback(&self) -> usize {
        self.specs.iter().map(IndicatorSpec::lookback).max().unwrap_or(0)
    }

    /// Evaluate every indicator on the closed bars of `series`
    pub fn compute(&self, series: &Series) -> IndicatorResult {
        let bars = series.closed();
        let last = bars.last();
        let readings = self
            .specs
            .iter()
            .map(|spec| {
                (
                    spec.label(),
                    IndicatorReading {
                        spec: spec.clone(),
                        lookback: spec.lookback(),
                        value: compute_indicator(spec, bars),
                    },
                )
            })
            .collect();

        IndicatorResult {
            evaluated_at: last.map(|b| b.timestamp),
            close: last.map(|b| b.close),
            readings,
        }
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(IndicatorSpec::default_battery())
    }
}
