//! Notification sinks
//!
//! Delivery failures are reported to the caller, which logs and counts them.
//! They never block journaling or the next cycle.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::info;

use crate::error::NotifyError;
use crate::format::format_notification;
use crate::signals::SignalDecision;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify(&self, decision: Arc<SignalDecision>) -> Result<(), NotifyError>;
}

/// Writes the formatted message to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, decision: Arc<SignalDecision>) -> Result<(), NotifyError> {
        info!("{}", format_notification(&decision));
        Ok(())
    }
}

/// Bounded in-process channel for downstream consumers
///
/// Sends never wait: a full channel is a delivery failure.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Arc<SignalDecision>>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Arc<SignalDecision>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationSink for ChannelNotifier {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn notify(&self, decision: Arc<SignalDecision>) -> Result<(), NotifyError> {
        self.tx.try_send(decision).map_err(|e| match e {
            TrySendError::Full(_) => NotifyError::ChannelFull,
            TrySendError::Closed(_) => NotifyError::ChannelClosed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::Verdict;
    use crate::structure::MarketStructure;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use types::{Instrument, Timeframe};

    fn decision() -> Arc<SignalDecision> {
        Arc::new(SignalDecision {
            instrument: Instrument::new("BTC/USD").unwrap(),
            timeframe: Timeframe::M5,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            verdict: Verdict::Sell,
            reasoning: Vec::new(),
            confidence: dec!(0.9),
            net_score: dec!(-4),
            price: dec!(67000),
            market_structure: MarketStructure::Bearish,
            note: None,
        })
    }

    #[tokio::test]
    async fn test_channel_full_and_closed() {
        let (notifier, mut rx) = ChannelNotifier::new(1);
        notifier.notify(decision()).await.unwrap();
        assert!(matches!(
            notifier.notify(decision()).await,
            Err(NotifyError::ChannelFull)
        ));

        assert_eq!(rx.recv().await.map(|d| d.verdict), Some(Verdict::Sell));
        drop(rx);
        assert!(matches!(
            notifier.notify(decision()).await,
            Err(NotifyError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        assert!(LogNotifier.notify(decision()).await.is_ok());
    }
}
