//! Indicator vote rules
//!
//! Each ready reading maps to BUY, SELL or an abstain (`None`). The detail
//! string ends up in the reasoning trace so it names the values compared.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::VoteThresholds;
use crate::indicators::{IndicatorOutput, IndicatorSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Buy => Decimal::ONE,
            Direction::Sell => Decimal::NEGATIVE_ONE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Vote = Option<(Direction, String)>;

fn buy(detail: String) -> Vote {
    Some((Direction::Buy, detail))
}

fn sell(detail: String) -> Vote {
    Some((Direction::Sell, detail))
}

/// Below `low` votes BUY, above `high` votes SELL
fn oscillator(name: &str, value: Decimal, low: Decimal, high: Decimal) -> Vote {
    if value < low {
        buy(format!("{} {} below {}", name, value.round_dp(2), low))
    } else if value > high {
        sell(format!("{} {} above {}", name, value.round_dp(2), high))
    } else {
        None
    }
}

/// Price above the line votes BUY, below votes SELL
fn price_versus(name: &str, close: Decimal, line: Decimal) -> Vote {
    if close > line {
        buy(format!("close {} above {} {}", close, name, line.round_dp(5)))
    } else if close < line {
        sell(format!("close {} below {} {}", close, name, line.round_dp(5)))
    } else {
        None
    }
}

/// Position of `close` inside a band, 0 at the bottom and 1 at the top
fn band_position(close: Decimal, lower: Decimal, upper: Decimal) -> Option<Decimal> {
    let width = upper - lower;
    if width <= Decimal::ZERO {
        return None;
    }
    Some((close - lower) / width)
}

/// Vote of one indicator reading against the close of the evaluated bar
pub fn indicator_vote(
    spec: &IndicatorSpec,
    output: &IndicatorOutput,
    close: Decimal,
    t: &VoteThresholds,
) -> Vote {
    let label = spec.label();
    match (spec, *output) {
        (
            IndicatorSpec::Sma { .. } | IndicatorSpec::Ema { .. } | IndicatorSpec::Wma { .. },
            IndicatorOutput::Scalar { value },
        ) => price_versus(&label, close, value),

        (IndicatorSpec::Rsi { .. }, IndicatorOutput::Scalar { value }) => {
            oscillator("RSI", value, t.rsi_oversold, t.rsi_overbought)
        }

        (IndicatorSpec::Macd { .. }, IndicatorOutput::Macd { macd, signal, .. }) => {
            let spread = macd - signal;
            if spread > t.macd_threshold {
                buy(format!("MACD {} above signal {}", macd.round_dp(5), signal.round_dp(5)))
            } else if spread < -t.macd_threshold {
                sell(format!("MACD {} below signal {}", macd.round_dp(5), signal.round_dp(5)))
            } else {
                None
            }
        }

        (IndicatorSpec::Stochastic { .. }, IndicatorOutput::Stochastic { k, d }) => {
            if k < t.stochastic_oversold && d < t.stochastic_oversold {
                buy(format!("stochastic %K {} %D {} oversold", k.round_dp(2), d.round_dp(2)))
            } else if k > t.stochastic_overbought && d > t.stochastic_overbought {
                sell(format!("stochastic %K {} %D {} overbought", k.round_dp(2), d.round_dp(2)))
            } else {
                None
            }
        }

        (IndicatorSpec::Cci { .. }, IndicatorOutput::Scalar { value }) => {
            oscillator("CCI", value, -t.cci_threshold, t.cci_threshold)
        }

        (IndicatorSpec::WilliamsR { .. }, IndicatorOutput::Scalar { value }) => {
            oscillator("Williams %R", value, t.williams_oversold, t.williams_overbought)
        }

        (IndicatorSpec::Bollinger { .. }, IndicatorOutput::Bands { upper, lower, .. }) => {
            let position = band_position(close, lower, upper)?;
            if position < t.bollinger_lower {
                buy(format!("close near lower Bollinger band ({})", position.round_dp(2)))
            } else if position > t.bollinger_upper {
                sell(format!("close near upper Bollinger band ({})", position.round_dp(2)))
            } else {
                None
            }
        }

        (
            IndicatorSpec::Adx { .. },
            IndicatorOutput::Directional {
                adx,
                plus_di,
                minus_di,
            },
        ) => {
            if adx < t.adx_trend_threshold {
                return None;
            }
            let detail = format!(
                "ADX {} with +DI {} / -DI {}",
                adx.round_dp(2),
                plus_di.round_dp(2),
                minus_di.round_dp(2)
            );
            if plus_di > minus_di {
                buy(detail)
            } else if minus_di > plus_di {
                sell(detail)
            } else {
                None
            }
        }

        (IndicatorSpec::Momentum { .. }, IndicatorOutput::Scalar { value }) => {
            let hundred = Decimal::ONE_HUNDRED;
            if value > hundred {
                buy(format!("momentum {} above 100", value.round_dp(2)))
            } else if value < hundred {
                sell(format!("momentum {} below 100", value.round_dp(2)))
            } else {
                None
            }
        }

        (IndicatorSpec::Roc { .. }, IndicatorOutput::Scalar { value }) => {
            if value > Decimal::ZERO {
                buy(format!("rate of change +{}%", value.round_dp(2)))
            } else if value < Decimal::ZERO {
                sell(format!("rate of change {}%", value.round_dp(2)))
            } else {
                None
            }
        }

        (IndicatorSpec::Mfi { .. }, IndicatorOutput::Scalar { value }) => {
            oscillator("MFI", value, t.mfi_oversold, t.mfi_overbought)
        }

        (IndicatorSpec::Cmf { .. }, IndicatorOutput::Scalar { value }) => {
            if value > t.cmf_threshold {
                buy(format!("CMF {} shows buying pressure", value.round_dp(3)))
            } else if value < -t.cmf_threshold {
                sell(format!("CMF {} shows selling pressure", value.round_dp(3)))
            } else {
                None
            }
        }

        (IndicatorSpec::Vwap, IndicatorOutput::Scalar { value }) => {
            price_versus("VWAP", close, value)
        }

        (IndicatorSpec::Donchian { .. }, IndicatorOutput::Bands { upper, lower, .. }) => {
            let position = band_position(close, lower, upper)?;
            if position >= t.donchian_upper {
                buy(format!("close in upper Donchian quartile ({})", position.round_dp(2)))
            } else if position <= t.donchian_lower {
                sell(format!("close in lower Donchian quartile ({})", position.round_dp(2)))
            } else {
                None
            }
        }

        // ATR and OBV carry no direction on their own
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn vote(spec: IndicatorSpec, output: IndicatorOutput, close: Decimal) -> Option<Direction> {
        indicator_vote(&spec, &output, close, &VoteThresholds::default()).map(|(d, _)| d)
    }

    #[test]
    fn test_rsi_votes() {
        let rsi = IndicatorSpec::Rsi { period: 14 };
        let reading = |value| IndicatorOutput::scalar(value);
        assert_eq!(vote(rsi.clone(), reading(dec!(25)), dec!(1)), Some(Direction::Buy));
        assert_eq!(vote(rsi.clone(), reading(dec!(75)), dec!(1)), Some(Direction::Sell));
        assert_eq!(vote(rsi, IndicatorOutput::scalar(dec!(50)), dec!(1)), None);
    }

    #[test]
    fn test_macd_needs_spread_beyond_threshold() {
        let spec = IndicatorSpec::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        };
        let macd = |m, s| IndicatorOutput::Macd {
            macd: m,
            signal: s,
            histogram: m - s,
        };
        assert_eq!(
            vote(spec.clone(), macd(dec!(0.01), dec!(0.005)), dec!(1)),
            Some(Direction::Buy)
        );
        assert_eq!(vote(spec.clone(), macd(dec!(0.0005), dec!(0)), dec!(1)), None);
        assert_eq!(vote(spec, macd(dec!(-0.01), dec!(0)), dec!(1)), Some(Direction::Sell));
    }

    #[test]
    fn test_adx_abstains_without_trend() {
        let spec = IndicatorSpec::Adx { period: 14 };
        let directional = |adx| IndicatorOutput::Directional {
            adx,
            plus_di: dec!(30),
            minus_di: dec!(10),
        };
        assert_eq!(vote(spec.clone(), directional(dec!(20)), dec!(1)), None);
        assert_eq!(vote(spec, directional(dec!(30)), dec!(1)), Some(Direction::Buy));
    }

    #[test]
    fn test_bollinger_position() {
        let spec = IndicatorSpec::Bollinger {
            period: 20,
            std_dev: dec!(2),
        };
        let bands = IndicatorOutput::Bands {
            upper: dec!(110),
            middle: dec!(100),
            lower: dec!(90),
        };
        assert_eq!(vote(spec.clone(), bands, dec!(91)), Some(Direction::Buy));
        assert_eq!(vote(spec.clone(), bands, dec!(109)), Some(Direction::Sell));
        assert_eq!(vote(spec.clone(), bands, dec!(100)), None);

        let collapsed = IndicatorOutput::Bands {
            upper: dec!(100),
            middle: dec!(100),
            lower: dec!(100),
        };
        assert_eq!(vote(spec, collapsed, dec!(100)), None);
    }

    #[test]
    fn test_moving_average_and_silent_indicators() {
        let sma = IndicatorSpec::Sma { period: 20 };
        assert_eq!(
            vote(sma.clone(), IndicatorOutput::scalar(dec!(1.1)), dec!(1.2)),
            Some(Direction::Buy)
        );
        assert_eq!(vote(sma, IndicatorOutput::scalar(dec!(1.2)), dec!(1.2)), None);
        assert_eq!(vote(IndicatorSpec::Obv, IndicatorOutput::scalar(dec!(5000)), dec!(1)), None);
        assert_eq!(
            vote(IndicatorSpec::Atr { period: 14 }, IndicatorOutput::scalar(dec!(2)), dec!(1)),
            None
        );
    }
}
