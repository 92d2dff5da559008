//! Cycle cost of the signal pipeline
//!
//! A slot evaluates its full history window every poll, so these measure
//! one evaluation over the default 200-bar window.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use smc_signals::indicators::IndicatorEngine;
use smc_signals::structure::{StructureAnalyzer, StructureLog};
use smc_signals::{SignalPipeline, StrategyConfig};
use strategy_shared::testing::series_from_closes;
use types::{Series, Timeframe};

const WINDOW: usize = 200;

/// Deterministic zig-zag trend so every detector has work to do
fn history() -> Series {
    let mut price = Decimal::new(108_000, 5);
    let closes: Vec<Decimal> = (0..WINDOW)
        .map(|i| {
            let swing = if (i / 7) % 2 == 0 { 12 } else { -9 };
            price += Decimal::new(swing, 5);
            price
        })
        .collect();
    series_from_closes("EUR/USD", Timeframe::M15, &closes)
}

fn bench_indicators(c: &mut Criterion) {
    let series = history();
    let engine = IndicatorEngine::default();

    let mut group = c.benchmark_group("indicators");
    group.bench_function("default_battery", |b| {
        b.iter(|| black_box(engine.compute(black_box(&series))))
    });
    group.finish();
}

fn bench_structure(c: &mut Criterion) {
    let series = history();
    let config = StrategyConfig::default();
    let analyzer = StructureAnalyzer::new(config.structure.clone());
    let warm = analyzer.analyze_full(&series.truncated(WINDOW - 1)).unwrap_or_default();

    let mut group = c.benchmark_group("structure");
    group.bench_function("analyze_full", |b| {
        b.iter(|| black_box(analyzer.analyze_full(black_box(&series))))
    });
    group.bench_function("analyze_one_new_bar", |b| {
        b.iter(|| black_box(analyzer.analyze(black_box(&series), &warm)))
    });
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let series = history();
    let pipeline = SignalPipeline::new(&StrategyConfig::default());
    let log = StructureLog::new();

    let mut group = c.benchmark_group("pipeline");
    group.bench_function("evaluate_cold", |b| {
        b.iter(|| black_box(pipeline.evaluate(black_box(&series), &log)))
    });
    group.finish();
}

criterion_group!(benches, bench_indicators, bench_structure, bench_pipeline);
criterion_main!(benches);
