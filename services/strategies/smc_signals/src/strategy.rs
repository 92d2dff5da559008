//! Scheduled signal generation
//!
//! [`SignalScheduler`] runs one task per (instrument, timeframe) slot. Each
//! task owns a [`SlotWorker`], which owns the slot's structure log, so cycles
//! for one slot never overlap while different slots run in parallel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use strategy_shared::{MetricsCollector, Strategy, StrategyMetrics};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use types::Instrument;

use crate::cache::{SlotKey, SlotSnapshot, StructureCache};
use crate::config::{InstrumentConfig, StrategyConfig};
use crate::error::{FeedError, JournalError, StrategyError};
use crate::feed::MarketDataFeed;
use crate::journal::JournalSink;
use crate::notify::NotificationSink;
use crate::pipeline::SignalPipeline;
use crate::signals::{SignalDecision, SignalStats, Verdict};
use crate::structure::StructureLog;

/// What a single slot cycle did
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No usable data this cycle
    Skipped { reason: String },
    /// The evaluated bar is older than the last emission
    Stale {
        timestamp: DateTime<Utc>,
        last_emitted: DateTime<Utc>,
    },
    /// The evaluated bar was already emitted, here or in the journal
    AlreadyEmitted { timestamp: DateTime<Utc> },
    /// A directional decision inside the instrument's cooldown
    CoolingDown {
        verdict: Verdict,
        timestamp: DateTime<Utc>,
    },
    Emitted(Arc<SignalDecision>),
}

/// State shared by every slot of one scheduler
#[derive(Default)]
pub struct SchedulerState {
    pub metrics: MetricsCollector,
    pub stats: RwLock<SignalStats>,
    pub cache: StructureCache,
    /// Bar time of the last directional signal per instrument
    cooldowns: RwLock<HashMap<Instrument, DateTime<Utc>>>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Runs cycles for one slot
pub struct SlotWorker {
    slot: SlotKey,
    pipeline: Arc<SignalPipeline>,
    feed: Arc<dyn MarketDataFeed>,
    journal: Arc<dyn JournalSink>,
    notifiers: Vec<Arc<dyn NotificationSink>>,
    state: Arc<SchedulerState>,
    log: StructureLog,
    last_emitted: Option<DateTime<Utc>>,
    fetch_timeout: Duration,
    cooldown: chrono::Duration,
    history_bars: usize,
}

impl SlotWorker {
    pub fn slot(&self) -> &SlotKey {
        &self.slot
    }

    pub fn log(&self) -> &StructureLog {
        &self.log
    }

    pub fn last_emitted(&self) -> Option<DateTime<Utc>> {
        self.last_emitted
    }

    /// Fetch, evaluate and route one decision
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.state.metrics.increment_cycles();

        let series = match self.fetch().await {
            Ok(series) => series,
            Err(reason) => {
                self.state.metrics.increment_skipped();
                crate::log_skip!("{}: {}", self.slot, reason);
                return CycleOutcome::Skipped { reason };
            }
        };

        let output = match self.pipeline.evaluate(&series, &self.log) {
            Ok(output) => output,
            Err(e) => {
                self.state.metrics.increment_skipped();
                crate::log_skip!("{}: {}", self.slot, e);
                return CycleOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let timestamp = output.decision.timestamp;
        if let Some(last_emitted) = self.last_emitted.filter(|last| timestamp < *last) {
            crate::log_warning!(
                "{}: dropping decision for {} older than last emission {}",
                self.slot,
                timestamp,
                last_emitted
            );
            return CycleOutcome::Stale {
                timestamp,
                last_emitted,
            };
        }
        if let Err(e) = output.commit(&mut self.log) {
            warn!("{}: structure log rejected cycle output: {}", self.slot, e);
            self.state.metrics.increment_errors();
            return CycleOutcome::Skipped {
                reason: StrategyError::from(e).to_string(),
            };
        }
        if self.last_emitted == Some(timestamp) {
            debug!("{}: bar {} already emitted", self.slot, timestamp);
            self.publish(None);
            return CycleOutcome::AlreadyEmitted { timestamp };
        }

        let verdict = output.decision.verdict;
        if verdict.is_directional() && self.cooling_down(timestamp) {
            crate::log_cooldown!(
                "{}: {} at {} suppressed by cooldown",
                self.slot,
                verdict,
                timestamp
            );
            self.publish(None);
            return CycleOutcome::CoolingDown { verdict, timestamp };
        }

        let decision = Arc::new(output.decision);
        let fresh = self.emit(decision.clone()).await;
        self.last_emitted = Some(timestamp);
        if verdict.is_directional() {
            self.state
                .cooldowns
                .write()
                .insert(self.slot.instrument.clone(), timestamp);
        }
        self.publish(Some(decision.clone()));
        if fresh {
            CycleOutcome::Emitted(decision)
        } else {
            CycleOutcome::AlreadyEmitted { timestamp }
        }
    }

    async fn fetch(&self) -> Result<types::Series, String> {
        let request = self.feed.get_series(
            &self.slot.instrument,
            self.slot.timeframe,
            self.pipeline.min_lookback_bars(),
        );
        match tokio::time::timeout(self.fetch_timeout, request).await {
            Err(_) => Err(format!("feed timed out after {:?}", self.fetch_timeout)),
            Ok(Err(e @ FeedError::DataUnavailable { .. })) => Err(e.to_string()),
            Ok(Err(e)) => {
                self.state.metrics.increment_errors();
                Err(e.to_string())
            }
            Ok(Ok(series)) if series.len() > self.history_bars => {
                Ok(series.tail(self.history_bars))
            }
            Ok(Ok(series)) => Ok(series),
        }
    }

    fn cooling_down(&self, timestamp: DateTime<Utc>) -> bool {
        self.state
            .cooldowns
            .read()
            .get(&self.slot.instrument)
            .map_or(false, |last| timestamp - *last < self.cooldown)
    }

    /// Journal, count and notify; false when the journal already held this bar
    async fn emit(&self, decision: Arc<SignalDecision>) -> bool {
        match self.journal.record_decision(decision.clone()).await {
            Ok(()) => {}
            Err(e @ JournalError::DuplicateDecision { .. }) => {
                // Journaled before a restart, and notified then
                crate::log_warning!("{}: {}", self.slot, e);
                return false;
            }
            Err(e) => {
                self.state.metrics.increment_errors();
                crate::log_error!("{}: journaling failed: {}", self.slot, e);
            }
        }
        self.state.stats.write().record_decision(&decision);

        if !decision.verdict.is_directional() {
            debug!(
                "{}: HOLD at {} (net {})",
                self.slot, decision.timestamp, decision.net_score
            );
            return true;
        }

        self.state.metrics.increment_signals();
        crate::log_signal!(
            "{} {} at {} confidence {}",
            self.slot,
            decision.verdict,
            decision.price,
            decision.confidence
        );
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(decision.clone()).await {
                self.state.metrics.increment_notification_failures();
                warn!("{}: {} notifier failed: {}", self.slot, notifier.name(), e);
            }
        }
        true
    }

    fn publish(&self, decision: Option<Arc<SignalDecision>>) {
        let last_decision = decision.or_else(|| {
            self.state
                .cache
                .get(&self.slot)
                .and_then(|snapshot| snapshot.last_decision.clone())
        });
        self.state
            .cache
            .publish(SlotSnapshot::from_log(self.slot.clone(), &self.log, last_decision));
    }
}

/// Periodic multi-slot signal scheduler
pub struct SignalScheduler {
    config: StrategyConfig,
    pipeline: Arc<SignalPipeline>,
    feed: Arc<dyn MarketDataFeed>,
    journal: Arc<dyn JournalSink>,
    notifiers: Vec<Arc<dyn NotificationSink>>,
    state: Arc<SchedulerState>,
    shutdown: Option<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
}

impl SignalScheduler {
    pub fn new(
        config: StrategyConfig,
        feed: Arc<dyn MarketDataFeed>,
        journal: Arc<dyn JournalSink>,
    ) -> Self {
        let pipeline = Arc::new(SignalPipeline::new(&config));
        Self {
            config,
            pipeline,
            feed,
            journal,
            notifiers: Vec::new(),
            state: Arc::new(SchedulerState::new()),
            shutdown: None,
            tasks: Vec::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<SchedulerState> {
        &self.state
    }

    pub fn stats(&self) -> SignalStats {
        self.state.stats.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }

    /// A worker for one slot, sharing this scheduler's sinks and state
    pub fn slot_worker(&self, slot: &InstrumentConfig) -> SlotWorker {
        SlotWorker {
            slot: SlotKey::new(slot.symbol.clone(), slot.timeframe),
            pipeline: self.pipeline.clone(),
            feed: self.feed.clone(),
            journal: self.journal.clone(),
            notifiers: self.notifiers.clone(),
            state: self.state.clone(),
            log: StructureLog::new(),
            last_emitted: None,
            fetch_timeout: self.config.scheduler.fetch_timeout(),
            cooldown: self.config.scheduler.signal_cooldown(),
            history_bars: self.config.scheduler.history_bars,
        }
    }

    fn spawn_slot(
        &self,
        slot: &InstrumentConfig,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let mut worker = self.slot_worker(slot);
        let period = slot.poll_interval();
        tokio::spawn(async move {
            info!("Slot {} polling every {:?}", worker.slot(), period);
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        worker.run_cycle().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Slot {} stopped", worker.slot());
        })
    }

    fn spawn_metrics_logger(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let state = self.state.clone();
        let period = self.config.scheduler.metrics_log_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick fires immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let m = state.metrics.get_metrics();
                        let stats = state.stats.read().clone();
                        crate::log_metrics!(
                            "cycles {} skipped {} signals {} (buy {} sell {} hold {}) \
                             notify failures {} errors {} uptime {}s",
                            m.cycles_run,
                            m.cycles_skipped,
                            m.signals_generated,
                            stats.buy_signals,
                            stats.sell_signals,
                            stats.hold_signals,
                            m.notifications_failed,
                            m.errors,
                            m.uptime_secs
                        );
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl Strategy for SignalScheduler {
    fn name(&self) -> &'static str {
        "smc_signals"
    }

    async fn start(&mut self) -> anyhow::Result<()> {
        if self.is_running() {
            anyhow::bail!("scheduler is already running");
        }
        self.config.validate()?;

        let (tx, rx) = watch::channel(false);
        let mut tasks: Vec<JoinHandle<()>> = self
            .config
            .instruments
            .iter()
            .map(|slot| self.spawn_slot(slot, rx.clone()))
            .collect();
        tasks.push(self.spawn_metrics_logger(rx));

        self.tasks = tasks;
        self.shutdown = Some(tx);
        crate::log_success!(
            "Scheduler started with {} slots",
            self.config.instruments.len()
        );
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        let Some(tx) = self.shutdown.take() else {
            return Ok(());
        };
        // Receivers may already be gone if every task exited
        let _ = tx.send(true);
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("Slot task ended abnormally: {}", e);
            }
        }
        info!("Scheduler stopped");
        Ok(())
    }

    fn metrics(&self) -> StrategyMetrics {
        self.state.metrics.get_metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::StaticFeed;
    use crate::journal::MemoryJournal;
    use rust_decimal_macros::dec;
    use strategy_shared::testing::{linear_closes, series_from_closes};
    use types::Timeframe;

    fn config() -> StrategyConfig {
        let mut config = StrategyConfig::default();
        config.instruments = vec![InstrumentConfig::new(
            Instrument::new("EUR/USD").unwrap(),
            Timeframe::M15,
        )];
        config
    }

    #[tokio::test]
    async fn test_missing_data_skips_cycle() {
        let feed = Arc::new(StaticFeed::new());
        let journal = Arc::new(MemoryJournal::new());
        let scheduler = SignalScheduler::new(config(), feed, journal.clone());
        let mut worker = scheduler.slot_worker(&scheduler.config().instruments[0]);

        assert!(matches!(worker.run_cycle().await, CycleOutcome::Skipped { .. }));
        let metrics = scheduler.metrics();
        assert_eq!(metrics.cycles_run, 1);
        assert_eq!(metrics.cycles_skipped, 1);
        assert!(journal.is_empty());
    }

    #[tokio::test]
    async fn test_same_bar_is_not_reemitted() {
        let feed = Arc::new(StaticFeed::new());
        feed.insert(series_from_closes(
            "EUR/USD",
            Timeframe::M15,
            &linear_closes(dec!(1.08), dec!(0.0001), 60),
        ));
        let journal = Arc::new(MemoryJournal::new());
        let scheduler = SignalScheduler::new(config(), feed, journal.clone());
        let mut worker = scheduler.slot_worker(&scheduler.config().instruments[0]);

        assert!(matches!(worker.run_cycle().await, CycleOutcome::Emitted(_)));
        assert!(matches!(
            worker.run_cycle().await,
            CycleOutcome::AlreadyEmitted { .. }
        ));
        assert_eq!(journal.len(), 1);
        assert!(scheduler.state().cache.get(worker.slot()).is_some());
    }

    #[tokio::test]
    async fn test_start_stop() {
        let feed = Arc::new(StaticFeed::new());
        let journal = Arc::new(MemoryJournal::new());
        let mut scheduler = SignalScheduler::new(config(), feed, journal);

        scheduler.start().await.unwrap();
        assert!(scheduler.is_running());
        assert!(scheduler.start().await.is_err());
        scheduler.stop().await.unwrap();
        assert!(!scheduler.is_running());
        scheduler.stop().await.unwrap();
    }
}
