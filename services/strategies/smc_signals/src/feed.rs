//! Market data feed boundary
//!
//! Vendor HTTP clients live outside this crate. The pipeline only sees the
//! [`MarketDataFeed`] trait; [`StaticFeed`] backs tests and replays and
//! [`JsonFileFeed`] reads bar snapshots written by an external fetcher.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use types::{Bar, Instrument, Series, Timeframe};

use crate::error::FeedError;

#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// Bars for one slot, oldest first, with at least `min_bars` closed bars
    async fn get_series(
        &self,
        instrument: &Instrument,
        timeframe: Timeframe,
        min_bars: usize,
    ) -> Result<Series, FeedError>;
}

fn ensure_depth(series: Series, min_bars: usize) -> Result<Series, FeedError> {
    let have = series.closed_len();
    if have < min_bars {
        return Err(FeedError::DataUnavailable {
            have,
            need: min_bars,
        });
    }
    for gap in series.gaps() {
        debug!(
            "{} {}: {} missing between {} and {}",
            series.instrument(),
            series.timeframe(),
            gap.missing,
            gap.after,
            gap.before
        );
    }
    Ok(series)
}

/// In-memory feed keyed by slot
#[derive(Default)]
pub struct StaticFeed {
    series: RwLock<HashMap<(Instrument, Timeframe), Series>>,
}

impl StaticFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the series for its slot
    pub fn insert(&self, series: Series) {
        let key = (series.instrument().clone(), series.timeframe());
        self.series.write().insert(key, series);
    }

    /// Append or update a bar on an existing slot, creating it if needed
    pub fn push_bar(
        &self,
        instrument: &Instrument,
        timeframe: Timeframe,
        bar: Bar,
    ) -> Result<(), FeedError> {
        let mut guard = self.series.write();
        let series = guard
            .entry((instrument.clone(), timeframe))
            .or_insert_with(|| Series::empty(instrument.clone(), timeframe));
        series.push(bar)?;
        Ok(())
    }
}

#[async_trait]
impl MarketDataFeed for StaticFeed {
    async fn get_series(
        &self,
        instrument: &Instrument,
        timeframe: Timeframe,
        min_bars: usize,
    ) -> Result<Series, FeedError> {
        let series = self
            .series
            .read()
            .get(&(instrument.clone(), timeframe))
            .cloned()
            .ok_or(FeedError::DataUnavailable {
                have: 0,
                need: min_bars,
            })?;
        ensure_depth(series, min_bars)
    }
}

/// Reads `<dir>/<SYMBOL>_<tf>.json` arrays of bars (e.g. `EUR_USD_15m.json`)
#[derive(Debug, Clone)]
pub struct JsonFileFeed {
    dir: PathBuf,
}

impl JsonFileFeed {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, instrument: &Instrument, timeframe: Timeframe) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", instrument.file_stem(), timeframe))
    }
}

#[async_trait]
impl MarketDataFeed for JsonFileFeed {
    async fn get_series(
        &self,
        instrument: &Instrument,
        timeframe: Timeframe,
        min_bars: usize,
    ) -> Result<Series, FeedError> {
        let path = self.path_for(instrument, timeframe);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("No bar file at {}", path.display());
                return Err(FeedError::DataUnavailable {
                    have: 0,
                    need: min_bars,
                });
            }
            Err(e) => {
                return Err(FeedError::Transport {
                    message: format!("{}: {}", path.display(), e),
                })
            }
        };

        let bars: Vec<Bar> = serde_json::from_slice(&content).map_err(|e| FeedError::Transport {
            message: format!("{}: {}", path.display(), e),
        })?;
        let series = Series::new(instrument.clone(), timeframe, bars)?;
        ensure_depth(series, min_bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use strategy_shared::testing::{bar, linear_closes, series_from_closes};

    #[tokio::test]
    async fn test_static_feed_depth() {
        let feed = StaticFeed::new();
        let eurusd = Instrument::new("EUR/USD").unwrap();
        feed.insert(series_from_closes(
            "EUR/USD",
            Timeframe::M15,
            &linear_closes(dec!(1.1), dec!(0.001), 30),
        ));

        assert_eq!(feed.get_series(&eurusd, Timeframe::M15, 20).await.unwrap().len(), 30);
        assert!(matches!(
            feed.get_series(&eurusd, Timeframe::M15, 40).await,
            Err(FeedError::DataUnavailable { have: 30, need: 40 })
        ));
        assert!(matches!(
            feed.get_series(&eurusd, Timeframe::H1, 1).await,
            Err(FeedError::DataUnavailable { have: 0, .. })
        ));
    }

    #[test]
    fn test_push_bar_rejects_out_of_order() {
        let feed = StaticFeed::new();
        let btc = Instrument::new("BTC/USD").unwrap();
        let row = [dec!(60000), dec!(60100), dec!(59900), dec!(60050)];
        feed.push_bar(&btc, Timeframe::M5, bar(Timeframe::M5, 1, row, Some(dec!(3))))
            .unwrap();
        assert!(matches!(
            feed.push_bar(&btc, Timeframe::M5, bar(Timeframe::M5, 0, row, Some(dec!(3)))),
            Err(FeedError::Malformed(_))
        ));

        let series = tokio_test::block_on(feed.get_series(&btc, Timeframe::M5, 1)).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[tokio::test]
    async fn test_json_file_feed() {
        let dir = tempfile::tempdir().unwrap();
        let feed = JsonFileFeed::new(dir.path());
        let gold = Instrument::new("XAU/USD").unwrap();

        assert!(matches!(
            feed.get_series(&gold, Timeframe::M5, 1).await,
            Err(FeedError::DataUnavailable { .. })
        ));

        let closes = linear_closes(dec!(2300), dec!(1), 25);
        let series = series_from_closes("XAU/USD", Timeframe::M5, &closes);
        let path = feed.path_for(&gold, Timeframe::M5);
        assert!(path.ends_with("XAU_USD_5m.json"));
        std::fs::write(&path, serde_json::to_vec(series.bars()).unwrap()).unwrap();

        let loaded = feed.get_series(&gold, Timeframe::M5, 20).await.unwrap();
        assert_eq!(loaded, series);

        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            feed.get_series(&gold, Timeframe::M5, 1).await,
            Err(FeedError::Transport { .. })
        ));
    }
}
