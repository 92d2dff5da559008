//! Volume-based indicators
//!
//! Every function here reads `Bar::volume` and reports `None` when any bar
//! it needs has no volume, which is the normal case for forex feeds.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use types::Bar;

fn volumes(bars: &[Bar]) -> Option<Vec<Decimal>> {
    bars.iter().map(|b| b.volume).collect()
}

/// Money Flow Index over `period` typical-price changes
///
/// No negative flow reads 100; no flow at all reads 50.
pub fn mfi(bars: &[Bar], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let window = &bars[bars.len() - period - 1..];
    let volume = volumes(window)?;

    let (mut positive, mut negative) = (Decimal::ZERO, Decimal::ZERO);
    for i in 1..window.len() {
        let typical = window[i].typical_price();
        let previous = window[i - 1].typical_price();
        let flow = typical * volume[i];
        if typical > previous {
            positive += flow;
        } else if typical < previous {
            negative += flow;
        }
    }

    if negative.is_zero() {
        return Some(if positive.is_zero() { dec!(50) } else { dec!(100) });
    }
    let ratio = positive / negative;
    Some(dec!(100) - dec!(100) / (Decimal::ONE + ratio))
}

/// On-Balance Volume accumulated over every bar
pub fn obv(bars: &[Bar]) -> Option<Decimal> {
    if bars.len() < 2 {
        return None;
    }
    let volume = volumes(bars)?;
    let mut total = Decimal::ZERO;
    for i in 1..bars.len() {
        if bars[i].close > bars[i - 1].close {
            total += volume[i];
        } else if bars[i].close < bars[i - 1].close {
            total -= volume[i];
        }
    }
    Some(total)
}

/// Chaikin Money Flow; zero volume reads 0
pub fn cmf(bars: &[Bar], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let window = &bars[bars.len() - period..];
    let volume = volumes(window)?;

    let mut flow = Decimal::ZERO;
    for (bar, vol) in window.iter().zip(&volume) {
        let range = bar.range();
        if range.is_zero() {
            continue;
        }
        let multiplier = ((bar.close - bar.low) - (bar.high - bar.close)) / range;
        flow += multiplier * *vol;
    }
    let total: Decimal = volume.iter().sum();
    if total.is_zero() {
        return Some(Decimal::ZERO);
    }
    Some(flow / total)
}

/// Volume weighted average typical price across the whole series
///
/// Undefined, and so not ready, until some volume has traded.
pub fn vwap(bars: &[Bar]) -> Option<Decimal> {
    let volume = volumes(bars)?;
    let total: Decimal = volume.iter().sum();
    if total.is_zero() {
        return None;
    }
    let weighted: Decimal = bars
        .iter()
        .zip(&volume)
        .map(|(bar, vol)| bar.typical_price() * *vol)
        .sum();
    Some(weighted / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategy_shared::testing::{series_from_closes, series_from_ohlcv};
    use types::Timeframe;

    fn rising_with_volume() -> types::Series {
        let rows: Vec<[Decimal; 5]> = (0..6)
            .map(|i| {
                let close = Decimal::from(100 + i);
                [close, close + Decimal::ONE, close - Decimal::ONE, close, Decimal::from(10)]
            })
            .collect();
        series_from_ohlcv("BTC/USD", Timeframe::H1, &rows)
    }

    #[test]
    fn test_volume_indicators_need_volume() {
        let series = series_from_closes("EUR/USD", Timeframe::M5, &[dec!(1.1); 10]);
        assert_eq!(mfi(series.closed(), 5), None);
        assert_eq!(obv(series.closed()), None);
        assert_eq!(cmf(series.closed(), 5), None);
        assert_eq!(vwap(series.closed()), None);
    }

    #[test]
    fn test_mfi_without_selling_is_100() {
        let series = rising_with_volume();
        assert_eq!(mfi(series.closed(), 5), Some(dec!(100)));
    }

    #[test]
    fn test_obv_accumulates_up_volume() {
        let series = rising_with_volume();
        assert_eq!(obv(series.closed()), Some(dec!(50)));
    }

    #[test]
    fn test_vwap_of_symmetric_bars() {
        let series = rising_with_volume();
        // Equal volume -> plain mean of typical prices 100..=105
        assert_eq!(vwap(series.closed()), Some(dec!(102.5)));
    }

    #[test]
    fn test_vwap_without_traded_volume_is_not_ready() {
        let rows: Vec<[Decimal; 5]> = (0..4)
            .map(|i| {
                let close = Decimal::from(100 + i);
                [close, close + Decimal::ONE, close - Decimal::ONE, close, Decimal::ZERO]
            })
            .collect();
        let series = series_from_ohlcv("BTC/USD", Timeframe::H1, &rows);
        assert_eq!(vwap(series.closed()), None);
        assert_eq!(vwap(&[]), None);
    }

    #[test]
    fn test_cmf_closes_mid_range_is_zero() {
        let series = rising_with_volume();
        assert_eq!(cmf(series.closed(), 5), Some(Decimal::ZERO));
    }
}
