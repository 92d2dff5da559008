//! Series-in, decision-out evaluation
//!
//! The pipeline is synchronous and pure: the same series, log and
//! configuration always produce the same [`PipelineOutput`]. It never
//! mutates the structure log; the caller appends `new_events` through
//! [`PipelineOutput::commit`].

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use types::{Bar, Series, Timeframe};

use crate::config::StrategyConfig;
use crate::error::{Result, StrategyError};
use crate::indicators::{IndicatorEngine, IndicatorResult};
use crate::signals::{AgedEvent, DecisionEngine, DecisionInput, SignalDecision};
use crate::structure::{EventId, LogError, StructureAnalyzer, StructureEvent, StructureLog};

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub decision: SignalDecision,
    pub indicators: IndicatorResult,
    /// Events to append to the slot's log
    pub new_events: Vec<StructureEvent>,
    /// Active events once `new_events` are applied, oldest first
    pub active_events: Vec<StructureEvent>,
    /// Timestamp of the last closed bar evaluated
    pub evaluated_through: DateTime<Utc>,
}

impl PipelineOutput {
    /// Append the new events to `log` and advance its watermark
    pub fn commit(&self, log: &mut StructureLog) -> std::result::Result<(), LogError> {
        log.append(self.new_events.clone(), self.evaluated_through)
    }
}

pub struct SignalPipeline {
    indicators: IndicatorEngine,
    analyzer: StructureAnalyzer,
    decisions: DecisionEngine,
    min_lookback_bars: usize,
}

impl SignalPipeline {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            indicators: IndicatorEngine::new(config.indicators.clone()),
            analyzer: StructureAnalyzer::new(config.structure.clone()),
            decisions: DecisionEngine::new(config.decision.clone()),
            min_lookback_bars: config.min_lookback_bars,
        }
    }

    pub fn min_lookback_bars(&self) -> usize {
        self.min_lookback_bars
    }

    pub fn analyzer(&self) -> &StructureAnalyzer {
        &self.analyzer
    }

    /// Evaluate the last closed bar of `series`
    pub fn evaluate(&self, series: &Series, log: &StructureLog) -> Result<PipelineOutput> {
        let bars = series.closed();
        let need = self.min_lookback_bars.max(1);
        let last = match bars.last() {
            Some(last) if bars.len() >= need => last,
            _ => {
                return Err(StrategyError::InsufficientData {
                    have: bars.len(),
                    need,
                })
            }
        };

        let indicators = self.indicators.compute(series);
        let new_events = self.analyzer.analyze(series, log);

        let retired: HashSet<EventId> =
            new_events.iter().filter_map(StructureEvent::target).collect();
        let active_events: Vec<StructureEvent> = log
            .active()
            .chain(new_events.iter().filter(|e| !e.is_invalidation()))
            .filter(|e| !retired.contains(&e.id))
            .cloned()
            .collect();

        let structure = active_events
            .iter()
            .map(|event| AgedEvent {
                event,
                bars_since: bars_since(bars, series.timeframe(), event.bars.end),
            })
            .collect();

        let decision = self.decisions.decide(&DecisionInput {
            instrument: series.instrument(),
            timeframe: series.timeframe(),
            timestamp: last.timestamp,
            price: last.close,
            market_structure: self.analyzer.market_structure(series),
            indicators: &indicators,
            structure,
        });

        Ok(PipelineOutput {
            decision,
            indicators,
            new_events,
            active_events,
            evaluated_through: last.timestamp,
        })
    }
}

/// Closed bars between `end` and the last closed bar
///
/// Falls back to elapsed time over the timeframe when `end` is older than
/// the window.
pub fn bars_since(bars: &[Bar], timeframe: Timeframe, end: DateTime<Utc>) -> u64 {
    let Some(last) = bars.last() else {
        return 0;
    };
    match bars.binary_search_by_key(&end, |b| b.timestamp) {
        Ok(index) => (bars.len() - 1 - index) as u64,
        Err(_) => {
            let step = timeframe.duration().num_seconds().max(1);
            let elapsed = (last.timestamp - end).num_seconds().max(0);
            u64::try_from(elapsed / step).unwrap_or(0)
        }
    }
}
