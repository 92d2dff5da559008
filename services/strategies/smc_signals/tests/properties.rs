//! Property tests for the signal pipeline

use proptest::prelude::*;
use rust_decimal::Decimal;
use smc_signals::indicators::{compute_indicator, IndicatorSpec, IndicatorValue};
use smc_signals::structure::{StructureAnalyzer, StructureKind, StructureLog};
use smc_signals::{SignalPipeline, StrategyConfig, StructureConfig};
use strategy_shared::testing::{series_from_closes, series_from_ohlcv};
use types::{Series, Timeframe};

/// Random walk starting at 100 with steps of up to half a point
fn walk(steps: &[i32]) -> Vec<Decimal> {
    let mut price = Decimal::from(100);
    steps
        .iter()
        .map(|step| {
            price += Decimal::new(*step as i64, 2);
            price
        })
        .collect()
}

fn walk_series(steps: &[i32]) -> Series {
    series_from_closes("GBP/USD", Timeframe::M15, &walk(steps))
}

fn small_structure() -> StructureConfig {
    StructureConfig {
        swing_window: 2,
        atr_period: 3,
        order_block_lookback: 5,
        equal_level_tolerance: Decimal::new(5, 3),
        min_touches: 2,
        liquidity_lookback: 10,
        min_bars: 5,
        ..StructureConfig::default()
    }
}

fn small_config() -> StrategyConfig {
    let mut config = StrategyConfig::default();
    config.structure = small_structure();
    config.min_lookback_bars = 20;
    config
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn indicators_are_not_ready_below_lookback(
        spec_index in 0usize..19,
        shortfall in 1usize..10,
    ) {
        let battery = IndicatorSpec::default_battery();
        let spec = &battery[spec_index % battery.len()];
        let len = spec.lookback().saturating_sub(shortfall);
        let rows: Vec<[Decimal; 5]> = (0..len)
            .map(|i| {
                let close = Decimal::from(100 + i as i64);
                [close, close + Decimal::ONE, close - Decimal::ONE, close, Decimal::from(1_000)]
            })
            .collect();
        let series = series_from_ohlcv("BTC/USD", Timeframe::M5, &rows);

        prop_assert_eq!(compute_indicator(spec, series.closed()), IndicatorValue::NotReady);
    }

    #[test]
    fn decisions_serialize_identically_on_replay(
        steps in prop::collection::vec(-50i32..=50, 20..80),
    ) {
        let pipeline = SignalPipeline::new(&small_config());
        let series = walk_series(&steps);

        let first = pipeline.evaluate(&series, &StructureLog::new()).unwrap();
        let second = pipeline.evaluate(&series, &StructureLog::new()).unwrap();

        prop_assert_eq!(
            serde_json::to_string(&first.decision).unwrap(),
            serde_json::to_string(&second.decision).unwrap()
        );
        prop_assert_eq!(first.new_events, second.new_events);
    }

    #[test]
    fn confidence_stays_within_unit_interval(
        steps in prop::collection::vec(-50i32..=50, 20..80),
    ) {
        let pipeline = SignalPipeline::new(&small_config());
        let output = pipeline.evaluate(&walk_series(&steps), &StructureLog::new()).unwrap();
        let confidence = output.decision.confidence;

        prop_assert!(confidence >= Decimal::ZERO && confidence <= Decimal::ONE);
        if output.decision.reasoning.is_empty() {
            prop_assert_eq!(confidence, Decimal::ZERO);
        }
    }

    #[test]
    fn incremental_analysis_matches_full_replay(
        steps in prop::collection::vec(-50i32..=50, 5..60),
    ) {
        let analyzer = StructureAnalyzer::new(small_structure());
        let series = walk_series(&steps);
        let full = analyzer.analyze_full(&series).unwrap();

        let mut log = StructureLog::new();
        for len in analyzer.config().min_bars..=series.len() {
            let window = series.truncated(len);
            let events = analyzer.analyze(&window, &log);
            log.append(events, window.bars()[len - 1].timestamp).unwrap();
        }

        prop_assert_eq!(log.events(), full.events());
    }

    #[test]
    fn sliding_window_keeps_one_standing_break(
        steps in prop::collection::vec(-50i32..=50, 80..200),
    ) {
        let analyzer = StructureAnalyzer::new(small_structure());
        let series = walk_series(&steps);

        let mut log = StructureLog::new();
        for len in 30..=series.len() {
            // The feed only ever serves the latest 30 bars
            let window = series.truncated(len).tail(30);
            let events = analyzer.analyze(&window, &log);
            log.append(events, window.bars()[29].timestamp).unwrap();

            let standing = log
                .active()
                .filter(|e| matches!(e.kind, StructureKind::StructureBreak { .. }))
                .count();
            prop_assert!(standing <= 1, "{} breaks standing at bar {}", standing, len - 1);
        }
    }

    #[test]
    fn committed_pipeline_log_stays_consistent(
        steps in prop::collection::vec(-50i32..=50, 25..60),
    ) {
        let config = small_config();
        let pipeline = SignalPipeline::new(&config);
        let series = walk_series(&steps);

        let mut log = StructureLog::new();
        for len in config.min_lookback_bars..=series.len() {
            let output = pipeline.evaluate(&series.truncated(len), &log).unwrap();
            output.commit(&mut log).unwrap();
            // Every event the decision saw is active after the commit
            for event in &output.active_events {
                prop_assert!(log.is_active(event.id));
            }
            prop_assert_eq!(log.last_evaluated(), Some(output.evaluated_through));
        }
    }
}
