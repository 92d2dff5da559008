//! Volatility indicators

use rust_decimal::prelude::MathematicalOps;
use rust_decimal::Decimal;
use types::Bar;

use super::moving_average::{mean, sma};
use super::IndicatorOutput;

/// Population standard deviation
pub fn standard_deviation(values: &[Decimal]) -> Option<Decimal> {
    let average = mean(values)?;
    let variance_sum: Decimal = values
        .iter()
        .map(|&x| {
            let diff = x - average;
            diff * diff
        })
        .sum();
    let variance = variance_sum / Decimal::from(values.len());
    variance.sqrt()
}

/// Bollinger bands around the simple average of the last `period` closes
pub fn bollinger(closes: &[Decimal], period: usize, std_dev: Decimal) -> Option<IndicatorOutput> {
    let middle = sma(closes, period)?;
    let deviation = standard_deviation(&closes[closes.len() - period..])?;
    Some(IndicatorOutput::Bands {
        upper: middle + std_dev * deviation,
        middle,
        lower: middle - std_dev * deviation,
    })
}

/// Average True Range, simple mean of the last `period` true ranges
///
/// Every true range uses the previous close, so `period + 1` bars are needed.
pub fn atr(bars: &[Bar], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let window = &bars[bars.len() - period - 1..];
    let ranges: Vec<Decimal> = window
        .windows(2)
        .map(|pair| pair[1].true_range(Some(pair[0].close)))
        .collect();
    mean(&ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use strategy_shared::testing::series_from_ohlc;
    use types::Timeframe;

    #[test]
    fn test_standard_deviation_population() {
        let values = [dec!(2), dec!(4), dec!(4), dec!(4), dec!(5), dec!(5), dec!(7), dec!(9)];
        assert_eq!(standard_deviation(&values), Some(dec!(2)));
    }

    #[test]
    fn test_bollinger_flat_prices_collapse() {
        let closes = vec![dec!(1.3); 20];
        assert_eq!(
            bollinger(&closes, 20, dec!(2)),
            Some(IndicatorOutput::Bands {
                upper: dec!(1.3),
                middle: dec!(1.3),
                lower: dec!(1.3),
            })
        );
        assert_eq!(bollinger(&closes[..19], 20, dec!(2)), None);
    }

    #[test]
    fn test_atr_uses_previous_close() {
        let rows = [
            [dec!(10), dec!(11), dec!(9), dec!(10)],
            // Gap up: true range is high - previous close = 4
            [dec!(13), dec!(14), dec!(12), dec!(13)],
            [dec!(13), dec!(14), dec!(12), dec!(13)],
        ];
        let series = series_from_ohlc("EUR/USD", Timeframe::H1, &rows);
        assert_eq!(atr(series.closed(), 2), Some(dec!(3)));
        assert_eq!(atr(&series.closed()[..2], 2), None);
    }
}
