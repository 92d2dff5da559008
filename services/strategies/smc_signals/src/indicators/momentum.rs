//! Momentum oscillators

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use types::Bar;

use super::moving_average::{ema_series, mean};
use super::IndicatorOutput;

const HUNDRED: Decimal = dec!(100);

/// RSI over the last `period` close-to-close changes
///
/// Gains and losses are simple averages. A window with no losses reads 100,
/// a completely flat window reads 50.
pub fn rsi(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    let window = &closes[closes.len() - period - 1..];
    let (mut gains, mut losses) = (Decimal::ZERO, Decimal::ZERO);
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > Decimal::ZERO {
            gains += change;
        } else {
            losses -= change;
        }
    }

    let periods = Decimal::from(period);
    let (avg_gain, avg_loss) = (gains / periods, losses / periods);
    if avg_loss.is_zero() {
        return Some(if avg_gain.is_zero() { dec!(50) } else { HUNDRED });
    }
    let rs = avg_gain / avg_loss;
    Some(HUNDRED - HUNDRED / (Decimal::ONE + rs))
}

/// MACD line, signal line and histogram
pub fn macd(
    closes: &[Decimal],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Option<IndicatorOutput> {
    if fast == 0 || fast >= slow || signal == 0 || closes.len() < slow + signal - 1 {
        return None;
    }
    let fast_ema = ema_series(closes, fast);
    let slow_ema = ema_series(closes, slow);

    // Align both series on the bars where the slow EMA exists
    let offset = slow - fast;
    let line: Vec<Decimal> = slow_ema
        .iter()
        .enumerate()
        .map(|(i, slow_value)| fast_ema[i + offset] - *slow_value)
        .collect();

    let signal_line = *ema_series(&line, signal).last()?;
    let macd_line = *line.last()?;
    Some(IndicatorOutput::Macd {
        macd: macd_line,
        signal: signal_line,
        histogram: macd_line - signal_line,
    })
}

/// %K at the last bar of `bars` over `k` bars; a flat range reads 50
fn percent_k(bars: &[Bar], k: usize) -> Option<Decimal> {
    if k == 0 || bars.len() < k {
        return None;
    }
    let window = &bars[bars.len() - k..];
    let highest = window.iter().map(|b| b.high).max()?;
    let lowest = window.iter().map(|b| b.low).min()?;
    let range = highest - lowest;
    let close = window.last()?.close;
    if range.is_zero() {
        return Some(dec!(50));
    }
    Some((close - lowest) / range * HUNDRED)
}

/// Stochastic oscillator, %D being the simple average of the last `d` %K values
pub fn stochastic(bars: &[Bar], k: usize, d: usize) -> Option<IndicatorOutput> {
    if k == 0 || d == 0 || bars.len() < k + d - 1 {
        return None;
    }
    let mut ks = Vec::with_capacity(d);
    for end in bars.len() + 1 - d..=bars.len() {
        ks.push(percent_k(&bars[..end], k)?);
    }
    Some(IndicatorOutput::Stochastic {
        k: *ks.last()?,
        d: mean(&ks)?,
    })
}

/// Commodity Channel Index; zero mean deviation reads 0
pub fn cci(bars: &[Bar], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let typical: Vec<Decimal> = bars[bars.len() - period..]
        .iter()
        .map(Bar::typical_price)
        .collect();
    let average = mean(&typical)?;
    let deviations: Vec<Decimal> = typical.iter().map(|tp| (*tp - average).abs()).collect();
    let mean_deviation = mean(&deviations)?;
    if mean_deviation.is_zero() {
        return Some(Decimal::ZERO);
    }
    let last = *typical.last()?;
    Some((last - average) / (dec!(0.015) * mean_deviation))
}

/// Williams %R in [-100, 0]; a flat range reads -50
pub fn williams_r(bars: &[Bar], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let window = &bars[bars.len() - period..];
    let highest = window.iter().map(|b| b.high).max()?;
    let lowest = window.iter().map(|b| b.low).min()?;
    let range = highest - lowest;
    if range.is_zero() {
        return Some(dec!(-50));
    }
    let close = window.last()?.close;
    Some((highest - close) / range * dec!(-100))
}

/// Close as a percentage of the close `period` bars earlier
pub fn momentum(closes: &[Decimal], period: usize) -> Option<Decimal> {
    let (current, past) = endpoints(closes, period)?;
    Some(current / past * HUNDRED)
}

/// Percent change over `period` bars
pub fn roc(closes: &[Decimal], period: usize) -> Option<Decimal> {
    let (current, past) = endpoints(closes, period)?;
    Some((current - past) / past * HUNDRED)
}

fn endpoints(closes: &[Decimal], period: usize) -> Option<(Decimal, Decimal)> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    let current = *closes.last()?;
    let past = closes[closes.len() - 1 - period];
    // Validated bars never carry a zero close
    if past.is_zero() {
        return None;
    }
    Some((current, past))
}
