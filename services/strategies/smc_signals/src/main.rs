//! SMC Signals Strategy Main Entry Point

use anyhow::{Context, Result};
use confluence_config::resolve_config_path;
use smc_signals::logging::init_logging;
use smc_signals::{
    ChannelNotifier, JsonFileFeed, JsonlJournal, LogNotifier, SignalScheduler, StrategyConfig,
};
use std::sync::Arc;
use strategy_shared::Strategy;
use tokio::signal;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config().context("Failed to load SMC strategy configuration")?;

    init_logging("smc_signals_service", &config.global.log_level, config.global.json_logs)?;

    info!("Starting Confluence SMC Signal Strategy");
    info!(
        "Configuration loaded: {} slots, {} indicators, bars from {}",
        config.instruments.len(),
        config.indicators.len(),
        config.global.data_dir.display()
    );

    let feed = Arc::new(JsonFileFeed::new(&config.global.data_dir));
    let journal = Arc::new(
        JsonlJournal::open(&config.global.journal_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open journal at {}",
                    config.global.journal_path.display()
                )
            })?,
    );

    // In-process consumers read from the channel; the receiver logs what it sees
    let (channel, mut decisions) =
        ChannelNotifier::new(config.scheduler.notification_channel_capacity);
    let consumer = tokio::spawn(async move {
        while let Some(decision) = decisions.recv().await {
            debug!("Delivered {} to channel consumers", decision.decision_key());
        }
    });

    let mut strategy = SignalScheduler::new(config, feed, journal)
        .with_notifier(Arc::new(LogNotifier))
        .with_notifier(Arc::new(channel));

    strategy
        .start()
        .await
        .context("SMC signal strategy failed to start")?;

    info!("SMC Signal Strategy running. Press Ctrl+C to stop.");

    signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down SMC Signal Strategy");
    strategy.stop().await?;
    let metrics = strategy.metrics();
    info!(
        "Final metrics: {} cycles, {} signals, {} skipped",
        metrics.cycles_run, metrics.signals_generated, metrics.cycles_skipped
    );

    // Dropping the scheduler closes the channel
    drop(strategy);
    let _ = consumer.await;

    Ok(())
}

fn load_config() -> Result<StrategyConfig> {
    let config_path = resolve_config_path("SMC_STRATEGY_CONFIG_PATH", "configs/smc_strategy.toml");
    let environment = std::env::var("CONFLUENCE_ENV").ok();
    StrategyConfig::load(&config_path, environment.as_deref())
}
