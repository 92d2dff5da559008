//! Moving averages: streaming calculators and batch helpers
//!
//! The streaming types keep only the window they need and are used for
//! incremental updates. The batch functions evaluate a full slice and are
//! what the indicator engine calls. Both produce identical values for the
//! same input.

use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Simple Moving Average calculator
#[derive(Debug, Clone)]
pub struct MovingAverage {
    period: usize,
    values: VecDeque<Decimal>,
    sum: Decimal,
}

impl MovingAverage {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: Decimal::ZERO,
        }
    }

    /// Add a new value and return current MA
    pub fn update(&mut self, value: Decimal) -> Option<Decimal> {
        self.values.push_back(value);
        self.sum += value;

        // Remove old values if we exceed the period
        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }

        self.current()
    }

    /// Get current moving average without adding new value
    pub fn current(&self) -> Option<Decimal> {
        if self.is_ready() {
            Some(self.sum / Decimal::from(self.period))
        } else {
            None
        }
    }

    /// Check if indicator is ready (has enough data points)
    pub fn is_ready(&self) -> bool {
        self.period > 0 && self.values.len() == self.period
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Exponential Moving Average calculator
///
/// Seeded with the simple average of the first `period` values, then
/// smoothed with `alpha = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct ExponentialAverage {
    period: usize,
    alpha: Decimal,
    seed: MovingAverage,
    current: Option<Decimal>,
}

impl ExponentialAverage {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            alpha: smoothing_factor(period),
            seed: MovingAverage::new(period),
            current: None,
        }
    }

    pub fn update(&mut self, value: Decimal) -> Option<Decimal> {
        self.current = match self.current {
            Some(previous) => Some(previous + self.alpha * (value - previous)),
            None => self.seed.update(value),
        };
        self.current
    }

    pub fn current(&self) -> Option<Decimal> {
        self.current
    }

    pub fn is_ready(&self) -> bool {
        self.current.is_some()
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

fn smoothing_factor(period: usize) -> Decimal {
    Decimal::TWO / Decimal::from(period + 1)
}

/// Mean of a non-empty slice
pub(crate) fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().sum();
    Some(sum / Decimal::from(values.len()))
}

/// Simple average of the last `period` values
pub fn sma(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }
    mean(&values[values.len() - period..])
}

/// EMA at every index from `period - 1` onward
///
/// Element `k` of the result is the EMA after `values[period - 1 + k]`.
pub fn ema_series(values: &[Decimal], period: usize) -> Vec<Decimal> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let alpha = smoothing_factor(period);
    let seed_sum: Decimal = values[..period].iter().sum();
    let mut current = seed_sum / Decimal::from(period);

    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(current);
    for value in &values[period..] {
        current += alpha * (*value - current);
        out.push(current);
    }
    out
}

/// EMA after the last value
pub fn ema(values: &[Decimal], period: usize) -> Option<Decimal> {
    ema_series(values, period).last().copied()
}

/// Linearly weighted average of the last `period` values, newest weight `period`
pub fn wma(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    let weighted: Decimal = window
        .iter()
        .enumerate()
        .map(|(i, v)| *v * Decimal::from(i + 1))
        .sum();
    let denominator = Decimal::from(period * (period + 1) / 2);
    Some(weighted / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_moving_average() {
        let mut ma = MovingAverage::new(3);

        assert_eq!(ma.update(dec!(10)), None); // Not enough data
        assert_eq!(ma.update(dec!(20)), None); // Still not enough
        assert_eq!(ma.update(dec!(30)), Some(dec!(20))); // (10+20+30)/3 = 20
        assert_eq!(ma.update(dec!(40)), Some(dec!(30))); // (20+30+40)/3 = 30
    }

    #[test]
    fn test_exponential_average_seed() {
        let mut ema = ExponentialAverage::new(3);
        assert_eq!(ema.update(dec!(2)), None);
        assert_eq!(ema.update(dec!(4)), None);
        assert_eq!(ema.update(dec!(6)), Some(dec!(4)));
        // alpha = 0.5
        assert_eq!(ema.update(dec!(8)), Some(dec!(6)));
    }

    #[test]
    fn test_streaming_matches_batch() {
        let closes: Vec<Decimal> = [
            dec!(1.0850),
            dec!(1.0861),
            dec!(1.0843),
            dec!(1.0877),
            dec!(1.0890),
            dec!(1.0868),
            dec!(1.0902),
            dec!(1.0915),
            dec!(1.0899),
            dec!(1.0921),
        ]
        .to_vec();

        let mut streaming_sma = MovingAverage::new(4);
        let mut streaming_ema = ExponentialAverage::new(4);
        for (i, close) in closes.iter().enumerate() {
            let window = &closes[..=i];
            assert_eq!(streaming_sma.update(*close), sma(window, 4));
            assert_eq!(streaming_ema.update(*close), ema(window, 4));
        }
    }

    #[test]
    fn test_wma_weights_newest_most() {
        // (1*1 + 2*2 + 3*3) / 6
        let value = wma(&[dec!(1), dec!(2), dec!(3)], 3).unwrap();
        assert_eq!(value, dec!(14) / dec!(6));
        assert_eq!(wma(&[dec!(1), dec!(2)], 3), None);
    }
}
