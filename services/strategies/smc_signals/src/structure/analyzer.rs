//! Structure analyzer
//!
//! The analyzer replays the closed bars of a series one bar at a time and
//! records every structural fact at the bar where it becomes known: swing
//! breaks, order blocks, fair-value gaps, liquidity pools and the later
//! invalidation of each zone. Only the most recent break stands: every new
//! break supersedes the ones before it. The replay is then reconciled with
//! the slot's [`StructureLog`]: only facts dated after the log's watermark are emitted,
//! zones already in the log keep their identifiers, and logged zones that
//! have scrolled out of the feed window are still checked for invalidation
//! against the new bars.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use types::{Bar, Series};

use super::events::{
    BarSpan, Bias, BreakStyle, EventId, InvalidationReason, MarketStructure, PriceRange,
    StructureEvent, StructureKind,
};
use super::log::{LogError, StructureLog};
use super::swings::{self, SwingKind};
use crate::config::StructureConfig;
use crate::indicators::volatility;

/// A fact found during replay, indexed by bar
#[derive(Debug, Clone)]
struct Detection {
    kind: StructureKind,
    bias: Bias,
    zone: PriceRange,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy)]
struct ZoneInvalidation {
    detection: usize,
    reason: InvalidationReason,
    at: usize,
}

#[derive(Debug, Clone, Copy)]
struct TrackedSwing {
    index: usize,
    price: Decimal,
    broken: bool,
}

#[derive(Debug, Clone, Copy)]
struct OpenZone {
    detection: usize,
    kind: StructureKind,
    bias: Bias,
    zone: PriceRange,
}

#[derive(Debug, Default)]
struct Replay {
    detections: Vec<Detection>,
    invalidations: Vec<ZoneInvalidation>,
}

/// Whether `bar` invalidates a zone of this kind and bias
fn breach(
    kind: &StructureKind,
    bias: Bias,
    zone: &PriceRange,
    bar: &Bar,
) -> Option<InvalidationReason> {
    let breached = match (kind, bias) {
        (StructureKind::OrderBlock, Bias::Bullish) => bar.close < zone.low,
        (StructureKind::OrderBlock, Bias::Bearish) => bar.close > zone.high,
        (StructureKind::FairValueGap, Bias::Bullish) => bar.low <= zone.low,
        (StructureKind::FairValueGap, Bias::Bearish) => bar.high >= zone.high,
        // Equal lows carry sell stops below, equal highs buy stops above
        (StructureKind::LiquidityZone { .. }, Bias::Bullish) => bar.low < zone.low,
        (StructureKind::LiquidityZone { .. }, Bias::Bearish) => bar.high > zone.high,
        _ => return None,
    };
    if !breached {
        return None;
    }
    Some(match kind {
        StructureKind::OrderBlock => InvalidationReason::ClosedThrough,
        StructureKind::FairValueGap => InvalidationReason::Filled,
        _ => InvalidationReason::Swept,
    })
}

fn is_break(kind: &StructureKind) -> bool {
    matches!(kind, StructureKind::StructureBreak { .. })
}

fn is_zone(kind: &StructureKind) -> bool {
    matches!(
        kind,
        StructureKind::OrderBlock
            | StructureKind::FairValueGap
            | StructureKind::LiquidityZone { .. }
    )
}

/// Level a liquidity pool rests at
fn liquidity_level(bias: Bias, zone: &PriceRange) -> Decimal {
    match bias {
        Bias::Bearish => zone.high,
        Bias::Bullish => zone.low,
    }
}

fn within_tolerance(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    if b.is_zero() {
        return a == b;
    }
    ((a - b) / b).abs() <= tolerance
}

/// Event recording that `target` no longer holds as of `end`
fn invalidation_event(
    id: EventId,
    target: EventId,
    reason: InvalidationReason,
    origin: &OpenEvent,
    end: DateTime<Utc>,
) -> StructureEvent {
    StructureEvent {
        id,
        kind: StructureKind::Invalidation { target, reason },
        bias: origin.bias,
        zone: origin.zone,
        bars: BarSpan {
            start: origin.start,
            end,
        },
        emitted_at: end,
    }
}

/// What an invalidation copies from the event it retires
#[derive(Debug, Clone, Copy)]
struct OpenEvent {
    id: EventId,
    bias: Bias,
    zone: PriceRange,
    start: DateTime<Utc>,
}

impl OpenEvent {
    fn of(event: &StructureEvent) -> Self {
        Self {
            id: event.id,
            bias: event.bias,
            zone: event.zone,
            start: event.bars.start,
        }
    }
}

/// Identity of an event across replays of shifting windows
type Identity = (&'static str, Bias, DateTime<Utc>, DateTime<Utc>);

fn identity(kind: &StructureKind, bias: Bias, bars: &BarSpan) -> Identity {
    let family = match kind {
        StructureKind::StructureBreak { .. } => "structure_break",
        other => other.name(),
    };
    (family, bias, bars.start, bars.end)
}

struct ReplayRun<'a> {
    bars: &'a [Bar],
    config: &'a StructureConfig,
    swing_highs: Vec<Decimal>,
    swing_lows: Vec<Decimal>,
    last_high: Option<TrackedSwing>,
    last_low: Option<TrackedSwing>,
    open_zones: Vec<OpenZone>,
    order_block_candles: HashSet<(usize, Bias)>,
    replay: Replay,
}

impl<'a> ReplayRun<'a> {
    fn new(bars: &'a [Bar], config: &'a StructureConfig) -> Self {
        Self {
            bars,
            config,
            swing_highs: Vec::new(),
            swing_lows: Vec::new(),
            last_high: None,
            last_low: None,
            open_zones: Vec::new(),
            order_block_candles: HashSet::new(),
            replay: Replay::default(),
        }
    }

    fn run(mut self) -> Replay {
        for i in 0..self.bars.len() {
            self.invalidate_zones(i);
            self.confirm_swings(i);
            self.detect_breaks(i);
            self.detect_order_block(i);
            self.detect_fair_value_gap(i);
            self.detect_liquidity(i);
        }
        self.replay
    }

    fn push(&mut self, detection: Detection) -> usize {
        let index = self.replay.detections.len();
        if is_zone(&detection.kind) {
            self.open_zones.push(OpenZone {
                detection: index,
                kind: detection.kind,
                bias: detection.bias,
                zone: detection.zone,
            });
        }
        self.replay.detections.push(detection);
        index
    }

    fn invalidate_zones(&mut self, i: usize) {
        let bar = &self.bars[i];
        let invalidations = &mut self.replay.invalidations;
        self.open_zones.retain(|open| {
            match breach(&open.kind, open.bias, &open.zone, bar) {
                Some(reason) => {
                    invalidations.push(ZoneInvalidation {
                        detection: open.detection,
                        reason,
                        at: i,
                    });
                    false
                }
                None => true,
            }
        });
    }

    fn confirm_swings(&mut self, i: usize) {
        for swing in swings::swings_confirmed_at(self.bars, i, self.config.swing_window) {
            let tracked = TrackedSwing {
                index: swing.index,
                price: swing.price,
                broken: false,
            };
            match swing.kind {
                SwingKind::High => {
                    self.swing_highs.push(swing.price);
                    self.last_high = Some(tracked);
                }
                SwingKind::Low => {
                    self.swing_lows.push(swing.price);
                    self.last_low = Some(tracked);
                }
            }
        }
    }

    fn detect_breaks(&mut self, i: usize) {
        let close = self.bars[i].close;
        let trend = swings::classify(&self.swing_highs, &self.swing_lows);

        if let Some(high) = self.last_high.filter(|h| !h.broken && close > h.price) {
            self.last_high = Some(TrackedSwing {
                broken: true,
                ..high
            });
            let style = if trend == MarketStructure::Bearish {
                BreakStyle::Choch
            } else {
                BreakStyle::Bos
            };
            self.push(Detection {
                kind: StructureKind::StructureBreak {
                    style,
                    broken_level: high.price,
                },
                bias: Bias::Bullish,
                zone: PriceRange::new(high.price, close),
                start: high.index,
                end: i,
            });
        }

        if let Some(low) = self.last_low.filter(|l| !l.broken && close < l.price) {
            self.last_low = Some(TrackedSwing {
                broken: true,
                ..low
            });
            let style = if trend == MarketStructure::Bullish {
                BreakStyle::Choch
            } else {
                BreakStyle::Bos
            };
            self.push(Detection {
                kind: StructureKind::StructureBreak {
                    style,
                    broken_level: low.price,
                },
                bias: Bias::Bearish,
                zone: PriceRange::new(close, low.price),
                start: low.index,
                end: i,
            });
        }
    }

    fn detect_order_block(&mut self, i: usize) {
        let bar = &self.bars[i];
        let Some(atr) = volatility::atr(&self.bars[..i], self.config.atr_period) else {
            return;
        };
        if atr.is_zero() || bar.body() < self.config.displacement_atr_multiple * atr {
            return;
        }

        let bias = if bar.is_bullish() {
            Bias::Bullish
        } else if bar.is_bearish() {
            Bias::Bearish
        } else {
            return;
        };
        let earliest = i.saturating_sub(self.config.order_block_lookback);
        let opposing = (earliest..i).rev().find(|&j| match bias {
            Bias::Bullish => self.bars[j].is_bearish(),
            Bias::Bearish => self.bars[j].is_bullish(),
        });
        let Some(j) = opposing else {
            return;
        };
        if !self.order_block_candles.insert((j, bias)) {
            return;
        }
        let zone = PriceRange::new(self.bars[j].low, self.bars[j].high);
        self.push(Detection {
            kind: StructureKind::OrderBlock,
            bias,
            zone,
            start: j,
            end: i,
        });
    }

    fn detect_fair_value_gap(&mut self, i: usize) {
        if i < 2 {
            return;
        }
        let (first, third) = (&self.bars[i - 2], &self.bars[i]);
        let min_width = self.config.min_gap_ratio * third.close;

        let gap = if first.high < third.low {
            Some((Bias::Bullish, PriceRange::new(first.high, third.low)))
        } else if first.low > third.high {
            Some((Bias::Bearish, PriceRange::new(third.high, first.low)))
        } else {
            None
        };
        if let Some((bias, zone)) = gap.filter(|(_, zone)| zone.width() >= min_width) {
            self.push(Detection {
                kind: StructureKind::FairValueGap,
                bias,
                zone,
                start: i - 2,
                end: i,
            });
        }
    }

    fn detect_liquidity(&mut self, i: usize) {
        let lookback = self.config.liquidity_lookback;
        if lookback == 0 || i + 1 < lookback {
            return;
        }
        let start = i + 1 - lookback;
        for bias in [Bias::Bearish, Bias::Bullish] {
            let price = |bar: &Bar| match bias {
                Bias::Bearish => bar.high,
                Bias::Bullish => bar.low,
            };
            let window = &self.bars[start..=i];
            let extreme = match bias {
                Bias::Bearish => window.iter().map(price).max(),
                Bias::Bullish => window.iter().map(price).min(),
            };
            let Some(level) = extreme else {
                continue;
            };
            let touching: Vec<usize> = (start..=i)
                .filter(|&j| {
                    within_tolerance(price(&self.bars[j]), level, self.config.equal_level_tolerance)
                })
                .collect();
            if touching.len() < self.config.min_touches {
                continue;
            }
            let already_open = self.open_zones.iter().any(|open| {
                matches!(open.kind, StructureKind::LiquidityZone { .. })
                    && open.bias == bias
                    && within_tolerance(
                        liquidity_level(bias, &open.zone),
                        level,
                        self.config.equal_level_tolerance,
                    )
            });
            if already_open {
                continue;
            }
            let prices = touching.iter().map(|&j| price(&self.bars[j]));
            let zone = match bias {
                Bias::Bearish => PriceRange::new(prices.min().unwrap_or(level), level),
                Bias::Bullish => PriceRange::new(level, prices.max().unwrap_or(level)),
            };
            self.push(Detection {
                kind: StructureKind::LiquidityZone {
                    touches: touching.len(),
                },
                bias,
                zone,
                start: touching[0],
                end: i,
            });
        }
    }
}

enum Op {
    Detect(usize),
    Invalidate(ZoneInvalidation),
    InvalidateLogged {
        target: EventId,
        reason: InvalidationReason,
        at: usize,
    },
}

impl Op {
    fn sort_key(&self, replay: &Replay) -> (usize, u8) {
        match self {
            Op::Detect(d) => (replay.detections[*d].end, 1),
            Op::Invalidate(inv) => (inv.at, 0),
            Op::InvalidateLogged { at, .. } => (*at, 0),
        }
    }
}

/// Derives structure events from closed bars
#[derive(Debug, Clone)]
pub struct StructureAnalyzer {
    config: StructureConfig,
}

impl StructureAnalyzer {
    pub fn new(config: StructureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StructureConfig {
        &self.config
    }

    /// Swing structure over the closed bars
    pub fn market_structure(&self, series: &Series) -> MarketStructure {
        swings::market_structure(series.closed(), self.config.swing_window)
    }

    /// New events since the log's watermark, with identifiers continuing the log
    ///
    /// Fewer than `min_bars` closed bars yields no events.
    pub fn analyze(&self, series: &Series, log: &StructureLog) -> Vec<StructureEvent> {
        let bars = series.closed();
        if bars.len() < self.config.min_bars.max(1) {
            return Vec::new();
        }
        let watermark = log.last_evaluated();
        let is_new = |i: usize| watermark.map_or(true, |w| bars[i].timestamp > w);
        let span = |d: &Detection| BarSpan {
            start: bars[d.start].timestamp,
            end: bars[d.end].timestamp,
        };

        let replay = ReplayRun::new(bars, &self.config).run();

        // Map replayed detections onto events the log already holds
        let logged: HashMap<Identity, EventId> = log
            .events()
            .iter()
            .filter(|e| !e.is_invalidation())
            .map(|e| (identity(&e.kind, e.bias, &e.bars), e.id))
            .collect();
        let mut assigned: Vec<Option<EventId>> = replay
            .detections
            .iter()
            .map(|d| logged.get(&identity(&d.kind, d.bias, &span(d))).copied())
            .collect();
        let matched: HashSet<EventId> = assigned.iter().flatten().copied().collect();

        let mut ops: Vec<Op> = (0..replay.detections.len()).map(Op::Detect).collect();
        ops.extend(replay.invalidations.iter().copied().map(Op::Invalidate));

        // Logged zones the replay cannot see any more
        for event in log.active().filter(|e| is_zone(&e.kind) && !matched.contains(&e.id)) {
            let first_breach = (0..bars.len())
                .filter(|&i| is_new(i) && bars[i].timestamp > event.emitted_at)
                .find_map(|i| {
                    breach(&event.kind, event.bias, &event.zone, &bars[i]).map(|r| (i, r))
                });
            if let Some((at, reason)) = first_breach {
                ops.push(Op::InvalidateLogged {
                    target: event.id,
                    reason,
                    at,
                });
            }
        }
        ops.sort_by_key(|op| op.sort_key(&replay));

        let mut open_liquidity: HashMap<EventId, (Bias, PriceRange)> = log
            .active()
            .filter(|e| matches!(e.kind, StructureKind::LiquidityZone { .. }))
            .map(|e| (e.id, (e.bias, e.zone)))
            .collect();
        // Only the latest break stands; each new one supersedes the rest
        let mut open_breaks: Vec<OpenEvent> = log
            .active()
            .filter(|e| is_break(&e.kind))
            .map(OpenEvent::of)
            .collect();
        let mut invalidated_now: HashSet<EventId> = HashSet::new();
        let mut emitted: Vec<StructureEvent> = Vec::new();
        let mut next_id = log.next_id().0;

        for op in ops {
            let (target, reason, at, origin) = match op {
                Op::Detect(d) => {
                    let detection = &replay.detections[d];
                    if assigned[d].is_some() || !is_new(detection.end) {
                        continue;
                    }
                    if let StructureKind::LiquidityZone { .. } = detection.kind {
                        let level = liquidity_level(detection.bias, &detection.zone);
                        let duplicate = open_liquidity.values().any(|(bias, zone)| {
                            *bias == detection.bias
                                && within_tolerance(
                                    liquidity_level(*bias, zone),
                                    level,
                                    self.config.equal_level_tolerance,
                                )
                        });
                        if duplicate {
                            continue;
                        }
                    }
                    let bars_span = span(detection);
                    if is_break(&detection.kind) {
                        for open in open_breaks.drain(..) {
                            if !invalidated_now.insert(open.id) {
                                continue;
                            }
                            emitted.push(invalidation_event(
                                EventId(next_id),
                                open.id,
                                InvalidationReason::Superseded,
                                &open,
                                bars_span.end,
                            ));
                            next_id += 1;
                        }
                    }
                    let id = EventId(next_id);
                    next_id += 1;
                    assigned[d] = Some(id);
                    match detection.kind {
                        StructureKind::LiquidityZone { .. } => {
                            open_liquidity.insert(id, (detection.bias, detection.zone));
                        }
                        StructureKind::StructureBreak { .. } => open_breaks.push(OpenEvent {
                            id,
                            bias: detection.bias,
                            zone: detection.zone,
                            start: bars_span.start,
                        }),
                        _ => {}
                    }
                    emitted.push(StructureEvent {
                        id,
                        kind: detection.kind,
                        bias: detection.bias,
                        zone: detection.zone,
                        bars: bars_span,
                        emitted_at: bars_span.end,
                    });
                    continue;
                }
                Op::Invalidate(inv) => {
                    let Some(target) = assigned[inv.detection] else {
                        continue;
                    };
                    let detection = &replay.detections[inv.detection];
                    let origin = OpenEvent {
                        id: target,
                        bias: detection.bias,
                        zone: detection.zone,
                        start: bars[detection.start].timestamp,
                    };
                    (target, inv.reason, inv.at, origin)
                }
                Op::InvalidateLogged { target, reason, at } => {
                    let Some(event) = log.get(target) else {
                        continue;
                    };
                    (target, reason, at, OpenEvent::of(event))
                }
            };

            if !is_new(at) || invalidated_now.contains(&target) {
                continue;
            }
            if target < log.next_id() && !log.is_active(target) {
                continue;
            }
            invalidated_now.insert(target);
            open_liquidity.remove(&target);
            emitted.push(invalidation_event(
                EventId(next_id),
                target,
                reason,
                &origin,
                bars[at].timestamp,
            ));
            next_id += 1;
        }

        crate::log_search!(
            "{} {}: {} new structure events over {} bars",
            series.instrument(),
            series.timeframe(),
            emitted.len(),
            bars.len()
        );
        emitted
    }

    /// Fresh log holding every event the closed bars produce
    pub fn analyze_full(&self, series: &Series) -> Result<StructureLog, LogError> {
        let mut log = StructureLog::new();
        let events = self.analyze(series, &log);
        if let Some(last) = series.last_closed() {
            log.append(events, last.timestamp)?;
        } else {
            debug!("analyze_full called on an empty series");
        }
        Ok(log)
    }
}
