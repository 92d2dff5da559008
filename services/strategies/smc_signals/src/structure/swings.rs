//! Swing point detection and market structure classification

use rust_decimal::Decimal;
use types::Bar;

use super::events::MarketStructure;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingKind {
    High,
    Low,
}

/// A confirmed swing high or low
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swing {
    pub kind: SwingKind,
    /// Index of the swing bar
    pub index: usize,
    pub price: Decimal,
}

impl Swing {
    /// Index of the bar that confirms the swing
    pub fn confirmed_at(&self, window: usize) -> usize {
        self.index + window
    }
}

/// Bar `index` has a high strictly above the `window` bars on each side
pub fn is_swing_high(bars: &[Bar], index: usize, window: usize) -> bool {
    is_extreme(bars, index, window, |candidate, other| candidate.high > other.high)
}

/// Bar `index` has a low strictly below the `window` bars on each side
pub fn is_swing_low(bars: &[Bar], index: usize, window: usize) -> bool {
    is_extreme(bars, index, window, |candidate, other| candidate.low < other.low)
}

fn is_extreme(
    bars: &[Bar],
    index: usize,
    window: usize,
    beats: impl Fn(&Bar, &Bar) -> bool,
) -> bool {
    if window == 0 || index < window || index + window >= bars.len() {
        return false;
    }
    let candidate = &bars[index];
    bars[index - window..=index + window]
        .iter()
        .enumerate()
        .all(|(offset, other)| offset == window || beats(candidate, other))
}

/// Swings confirmed by bar `confirming`, i.e. at index `confirming - window`
pub fn swings_confirmed_at(bars: &[Bar], confirming: usize, window: usize) -> Vec<Swing> {
    let Some(index) = confirming.checked_sub(window) else {
        return Vec::new();
    };
    let mut found = Vec::with_capacity(2);
    if is_swing_high(bars, index, window) {
        found.push(Swing {
            kind: SwingKind::High,
            index,
            price: bars[index].high,
        });
    }
    if is_swing_low(bars, index, window) {
        found.push(Swing {
            kind: SwingKind::Low,
            index,
            price: bars[index].low,
        });
    }
    found
}

/// Every confirmed swing, oldest first
pub fn find_swings(bars: &[Bar], window: usize) -> Vec<Swing> {
    (0..bars.len())
        .flat_map(|i| swings_confirmed_at(bars, i, window))
        .collect()
}

/// Classify from the last two swing highs and lows
///
/// Higher high plus higher low is bullish, lower high plus lower low is
/// bearish, anything else (including too few swings) is ranging.
pub fn classify(highs: &[Decimal], lows: &[Decimal]) -> MarketStructure {
    if highs.len() < 2 || lows.len() < 2 {
        return MarketStructure::Ranging;
    }
    let (prev_high, last_high) = (highs[highs.len() - 2], highs[highs.len() - 1]);
    let (prev_low, last_low) = (lows[lows.len() - 2], lows[lows.len() - 1]);

    if last_high > prev_high && last_low > prev_low {
        MarketStructure::Bullish
    } else if last_high < prev_high && last_low < prev_low {
        MarketStructure::Bearish
    } else {
        MarketStructure::Ranging
    }
}

/// Market structure over a full bar slice
pub fn market_structure(bars: &[Bar], window: usize) -> MarketStructure {
    let swings = find_swings(bars, window);
    let prices = |kind: SwingKind| -> Vec<Decimal> {
        swings
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.price)
            .collect()
    };
    classify(&prices(SwingKind::High), &prices(SwingKind::Low))
}
