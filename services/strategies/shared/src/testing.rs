//! Testing utilities for strategies
//!
//! Bar and series fixtures used by strategy unit tests, integration tests
//! and benches. The builders panic on invalid input since they only ever
//! run against hand-written fixtures.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use types::{Bar, Instrument, Series, Timeframe};

/// Timestamp of the first fixture bar (2024-01-01 00:00 UTC)
pub fn origin() -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Timestamp of the `index`-th bar on `timeframe`
pub fn bar_time(timeframe: Timeframe, index: usize) -> DateTime<Utc> {
    origin() + timeframe.duration() * index as i32
}

/// Build one closed bar
///
/// # Panics
/// Panics when the OHLC values are inconsistent.
pub fn bar(
    timeframe: Timeframe,
    index: usize,
    ohlc: [Decimal; 4],
    volume: Option<Decimal>,
) -> Bar {
    let [open, high, low, close] = ohlc;
    Bar::new(bar_time(timeframe, index), open, high, low, close, volume)
        .unwrap_or_else(|e| panic!("invalid fixture bar {index}: {e}"))
}

/// Series from explicit OHLC rows, one bar per timeframe step
///
/// # Panics
/// Panics on an invalid symbol or bar.
pub fn series_from_ohlc(symbol: &str, timeframe: Timeframe, rows: &[[Decimal; 4]]) -> Series {
    let bars = rows
        .iter()
        .enumerate()
        .map(|(i, row)| bar(timeframe, i, *row, None))
        .collect();
    build(symbol, timeframe, bars)
}

/// Series from OHLCV rows
///
/// # Panics
/// Panics on an invalid symbol or bar.
pub fn series_from_ohlcv(symbol: &str, timeframe: Timeframe, rows: &[[Decimal; 5]]) -> Series {
    let bars = rows
        .iter()
        .enumerate()
        .map(|(i, [o, h, l, c, v])| bar(timeframe, i, [*o, *h, *l, *c], Some(*v)))
        .collect();
    build(symbol, timeframe, bars)
}

/// Series from a close path
///
/// Each bar opens at the previous close and its wicks extend 0.1% of the
/// close beyond the body.
pub fn series_from_closes(symbol: &str, timeframe: Timeframe, closes: &[Decimal]) -> Series {
    let wick_ratio = Decimal::new(1, 3);
    let mut rows = Vec::with_capacity(closes.len());
    let mut previous: Option<Decimal> = None;
    for close in closes {
        let open = previous.unwrap_or(*close);
        let wick = *close * wick_ratio;
        rows.push([
            open,
            open.max(*close) + wick,
            open.min(*close) - wick,
            *close,
        ]);
        previous = Some(*close);
    }
    series_from_ohlc(symbol, timeframe, &rows)
}

/// Linear close path starting at `start`, moving `step` per bar
pub fn linear_closes(start: Decimal, step: Decimal, len: usize) -> Vec<Decimal> {
    (0..len).map(|i| start + step * Decimal::from(i)).collect()
}

fn build(symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) -> Series {
    let instrument =
        Instrument::new(symbol).unwrap_or_else(|e| panic!("invalid fixture symbol {symbol}: {e}"));
    Series::new(instrument, timeframe, bars)
        .unwrap_or_else(|e| panic!("invalid fixture series: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closes_fixture_is_consistent() {
        let closes = linear_closes(Decimal::from(100), Decimal::ONE, 10);
        let series = series_from_closes("EUR/USD", Timeframe::M5, &closes);
        assert_eq!(series.closed_len(), 10);
        assert_eq!(series.bars()[3].open, Decimal::from(102));
        assert_eq!(series.bars()[3].close, Decimal::from(103));
        assert_eq!(
            series.bars()[1].timestamp - series.bars()[0].timestamp,
            Timeframe::M5.duration()
        );
    }
}
