//! Instrument + timeframe scoped bar series
//!
//! A [`Series`] is the unit of exchange between the market data feed and the
//! signal pipeline. Bars are kept oldest-first with strictly increasing
//! timestamps. Only the most recent bar may be [`BarStatus::Open`]; every
//! engine evaluates [`Series::closed`] so a still-updating bar never leaks into
//! a decision.
//!
//! Spacing is not assumed to be regular. Weekend gaps in forex data and vendor
//! outages simply show up as larger timestamp deltas, reported by
//! [`Series::gaps`] for the feed to log.

use super::bar::{Bar, BarStatus};
use super::instrument::Instrument;
use super::timeframe::Timeframe;
use crate::common::ValidationError;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// A spacing between consecutive bars larger than the nominal timeframe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gap {
    pub after: DateTime<Utc>,
    pub before: DateTime<Utc>,
    pub missing: Duration,
}

/// Ordered bars for one instrument and timeframe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    instrument: Instrument,
    timeframe: Timeframe,
    bars: Vec<Bar>,
}

impl Series {
    pub fn new(
        instrument: Instrument,
        timeframe: Timeframe,
        bars: Vec<Bar>,
    ) -> Result<Self, ValidationError> {
        for bar in &bars {
            bar.validate()?;
        }
        for pair in bars.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(ValidationError::NonMonotonicTimestamp {
                    previous: pair[0].timestamp,
                    next: pair[1].timestamp,
                });
            }
        }
        if let Some(index) = bars
            .iter()
            .take(bars.len().saturating_sub(1))
            .position(|bar| bar.status == BarStatus::Open)
        {
            return Err(ValidationError::OpenBarNotLast { index });
        }

        Ok(Self {
            instrument,
            timeframe,
            bars,
        })
    }

    pub fn empty(instrument: Instrument, timeframe: Timeframe) -> Self {
        Self {
            instrument,
            timeframe,
            bars: Vec::new(),
        }
    }

    /// Append a bar. A bar carrying the same timestamp as a trailing open bar
    /// replaces it (the feed finalising or updating the live candle).
    pub fn push(&mut self, bar: Bar) -> Result<(), ValidationError> {
        bar.validate()?;

        if let Some(last) = self.bars.last() {
            if last.status == BarStatus::Open && last.timestamp == bar.timestamp {
                self.bars.pop();
            } else if last.status == BarStatus::Open {
                return Err(ValidationError::OpenBarNotLast {
                    index: self.bars.len() - 1,
                });
            } else if bar.timestamp <= last.timestamp {
                return Err(ValidationError::NonMonotonicTimestamp {
                    previous: last.timestamp,
                    next: bar.timestamp,
                });
            }
        }

        self.bars.push(bar);
        Ok(())
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// All bars including a trailing open bar
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Closed bars only
    pub fn closed(&self) -> &[Bar] {
        match self.bars.last() {
            Some(last) if last.status == BarStatus::Open => &self.bars[..self.bars.len() - 1],
            _ => &self.bars,
        }
    }

    pub fn closed_len(&self) -> usize {
        self.closed().len()
    }

    pub fn last_closed(&self) -> Option<&Bar> {
        self.closed().last()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn has_open_bar(&self) -> bool {
        self.bars
            .last()
            .map(|bar| bar.status == BarStatus::Open)
            .unwrap_or(false)
    }

    /// The first `len` bars, as the series looked at that point in time
    pub fn truncated(&self, len: usize) -> Series {
        Series {
            instrument: self.instrument.clone(),
            timeframe: self.timeframe,
            bars: self.bars[..len.min(self.bars.len())].to_vec(),
        }
    }

    /// The most recent `len` bars
    pub fn tail(&self, len: usize) -> Series {
        let start = self.bars.len().saturating_sub(len);
        Series {
            instrument: self.instrument.clone(),
            timeframe: self.timeframe,
            bars: self.bars[start..].to_vec(),
        }
    }

    /// Spacings larger than the nominal timeframe
    pub fn gaps(&self) -> Vec<Gap> {
        let expected = self.timeframe.duration();
        self.bars
            .windows(2)
            .filter_map(|pair| {
                let delta = pair[1].timestamp - pair[0].timestamp;
                (delta > expected).then(|| Gap {
                    after: pair[0].timestamp,
                    before: pair[1].timestamp,
                    missing: delta - expected,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn bar_at(minute: i64, close: Decimal) -> Bar {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() + Duration::minutes(minute);
        Bar::new(ts, close, close + dec!(1), close - dec!(1), close, None).unwrap()
    }

    fn eurusd() -> Instrument {
        Instrument::new("EUR/USD").unwrap()
    }

    #[test]
    fn test_closed_excludes_open_bar() {
        let bars = vec![bar_at(0, dec!(10)), bar_at(5, dec!(11)), bar_at(10, dec!(12)).into_open()];
        let series = Series::new(eurusd(), Timeframe::M5, bars).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closed_len(), 2);
        assert!(series.has_open_bar());
        assert_eq!(series.last_closed().unwrap().close, dec!(11));
    }

    #[test]
    fn test_rejects_open_bar_in_middle() {
        let bars = vec![bar_at(0, dec!(10)).into_open(), bar_at(5, dec!(11))];
        assert_eq!(
            Series::new(eurusd(), Timeframe::M5, bars).unwrap_err(),
            ValidationError::OpenBarNotLast { index: 0 }
        );
    }

    #[test]
    fn test_rejects_duplicate_timestamps() {
        let bars = vec![bar_at(0, dec!(10)), bar_at(0, dec!(11))];
        assert!(matches!(
            Series::new(eurusd(), Timeframe::M5, bars),
            Err(ValidationError::NonMonotonicTimestamp { .. })
        ));
    }

    #[test]
    fn test_push_replaces_open_bar_with_same_timestamp() {
        let mut series = Series::empty(eurusd(), Timeframe::M5);
        series.push(bar_at(0, dec!(10))).unwrap();
        series.push(bar_at(5, dec!(11)).into_open()).unwrap();
        series.push(bar_at(5, dec!(12))).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.closed_len(), 2);
        assert_eq!(series.bars()[1].close, dec!(12));

        // Older bar is refused
        assert!(series.push(bar_at(3, dec!(9))).is_err());
    }

    #[test]
    fn test_push_refuses_new_bar_while_open_bar_pending() {
        let mut series = Series::empty(eurusd(), Timeframe::M5);
        series.push(bar_at(0, dec!(10)).into_open()).unwrap();
        assert_eq!(
            series.push(bar_at(5, dec!(11))).unwrap_err(),
            ValidationError::OpenBarNotLast { index: 0 }
        );
    }

    #[test]
    fn test_gaps_reported_by_timestamp() {
        let bars = vec![bar_at(0, dec!(10)), bar_at(5, dec!(11)), bar_at(25, dec!(12))];
        let series = Series::new(eurusd(), Timeframe::M5, bars).unwrap();
        let gaps = series.gaps();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].missing, Duration::minutes(15));
    }

    #[test]
    fn test_truncated_keeps_prefix() {
        let bars = vec![bar_at(0, dec!(10)), bar_at(5, dec!(11)), bar_at(10, dec!(12))];
        let series = Series::new(eurusd(), Timeframe::M5, bars).unwrap();
        assert_eq!(series.truncated(2).len(), 2);
        assert_eq!(series.truncated(10).len(), 3);
    }

    #[test]
    fn test_tail_keeps_most_recent() {
        let bars = vec![bar_at(0, dec!(10)), bar_at(5, dec!(11)), bar_at(10, dec!(12))];
        let series = Series::new(eurusd(), Timeframe::M5, bars).unwrap();
        let tail = series.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.bars()[0].close, dec!(11));
        assert_eq!(series.tail(10).len(), 3);
    }
}
