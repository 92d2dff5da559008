//! Decision journaling
//!
//! Every emitted [`SignalDecision`] is journaled under its [`DecisionKey`].
//! Outcomes arrive later and join on the same key. Both reference sinks
//! reject duplicate decisions and outcomes for unknown keys.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::JournalError;
use crate::signals::{DecisionKey, SignalDecision, Verdict, CONFIDENCE_DP};

/// What happened after a decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub exit_price: Decimal,
    pub bars_elapsed: u64,
    pub observed_at: DateTime<Utc>,
}

impl Outcome {
    /// Percent return of the decision's direction, `None` for HOLD
    pub fn return_pct(&self, decision: &SignalDecision) -> Option<Decimal> {
        if decision.price.is_zero() {
            return None;
        }
        let change = (self.exit_price - decision.price) / decision.price * Decimal::ONE_HUNDRED;
        match decision.verdict {
            Verdict::Buy => Some(change),
            Verdict::Sell => Some(-change),
            Verdict::Hold => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub decision: Arc<SignalDecision>,
    pub outcome: Option<Outcome>,
}

#[async_trait]
pub trait JournalSink: Send + Sync {
    async fn record_decision(&self, decision: Arc<SignalDecision>) -> Result<(), JournalError>;

    async fn record_outcome(&self, key: &DecisionKey, outcome: Outcome) -> Result<(), JournalError>;

    /// Journaled entries in key order
    async fn entries(&self) -> Vec<JournalEntry>;
}

/// Keyed entry index shared by both sinks
#[derive(Debug, Default)]
struct EntryIndex {
    entries: BTreeMap<DecisionKey, JournalEntry>,
}

impl EntryIndex {
    fn check_decision(&self, key: &DecisionKey) -> Result<(), JournalError> {
        if self.entries.contains_key(key) {
            return Err(JournalError::DuplicateDecision {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn check_outcome(&self, key: &DecisionKey) -> Result<(), JournalError> {
        match self.entries.get(key) {
            None => Err(JournalError::UnknownDecision {
                key: key.to_string(),
            }),
            Some(entry) if entry.outcome.is_some() => Err(JournalError::OutcomeExists {
                key: key.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    fn insert_decision(&mut self, decision: Arc<SignalDecision>) {
        self.entries.insert(
            decision.decision_key(),
            JournalEntry {
                decision,
                outcome: None,
            },
        );
    }

    fn insert_outcome(&mut self, key: &DecisionKey, outcome: Outcome) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.outcome = Some(outcome);
        }
    }

    fn snapshot(&self) -> Vec<JournalEntry> {
        self.entries.values().cloned().collect()
    }
}

/// Journal held in memory, used by tests and replays
#[derive(Debug, Default)]
pub struct MemoryJournal {
    index: RwLock<EntryIndex>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JournalSink for MemoryJournal {
    async fn record_decision(&self, decision: Arc<SignalDecision>) -> Result<(), JournalError> {
        let mut index = self.index.write();
        index.check_decision(&decision.decision_key())?;
        index.insert_decision(decision);
        Ok(())
    }

    async fn record_outcome(
        &self,
        key: &DecisionKey,
        outcome: Outcome,
    ) -> Result<(), JournalError> {
        let mut index = self.index.write();
        index.check_outcome(key)?;
        index.insert_outcome(key, outcome);
        Ok(())
    }

    async fn entries(&self) -> Vec<JournalEntry> {
        self.index.read().snapshot()
    }
}

/// One line of the JSONL journal
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum JournalRecord {
    Decision {
        decision: SignalDecision,
    },
    Outcome {
        key: DecisionKey,
        outcome: Outcome,
    },
}

struct JsonlState {
    file: tokio::fs::File,
    index: EntryIndex,
}

/// Append-only JSON lines journal
///
/// The file is replayed on open so duplicate detection survives restarts.
pub struct JsonlJournal {
    path: PathBuf,
    state: Mutex<JsonlState>,
}

impl JsonlJournal {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut index = EntryIndex::default();
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                for line in content.lines().filter(|l| !l.trim().is_empty()) {
                    match serde_json::from_str::<JournalRecord>(line)? {
                        JournalRecord::Decision { decision } => {
                            index.insert_decision(Arc::new(decision))
                        }
                        JournalRecord::Outcome { key, outcome } => {
                            index.insert_outcome(&key, outcome)
                        }
                    }
                }
                info!(
                    "📒 Journal {} loaded with {} decisions",
                    path.display(),
                    index.entries.len()
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Starting new journal at {}", path.display());
            }
            Err(e) => return Err(e.into()),
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            state: Mutex::new(JsonlState { file, index }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(state: &mut JsonlState, record: &JournalRecord) -> Result<(), JournalError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        state.file.write_all(&line).await?;
        state.file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl JournalSink for JsonlJournal {
    async fn record_decision(&self, decision: Arc<SignalDecision>) -> Result<(), JournalError> {
        let mut state = self.state.lock().await;
        state.index.check_decision(&decision.decision_key())?;
        let record = JournalRecord::Decision {
            decision: (*decision).clone(),
        };
        Self::append(&mut state, &record).await?;
        state.index.insert_decision(decision);
        Ok(())
    }

    async fn record_outcome(
        &self,
        key: &DecisionKey,
        outcome: Outcome,
    ) -> Result<(), JournalError> {
        let mut state = self.state.lock().await;
        state.index.check_outcome(key)?;
        let record = JournalRecord::Outcome {
            key: key.clone(),
            outcome: outcome.clone(),
        };
        Self::append(&mut state, &record).await?;
        state.index.insert_outcome(key, outcome);
        Ok(())
    }

    async fn entries(&self) -> Vec<JournalEntry> {
        self.state.lock().await.index.snapshot()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstrumentPerformance {
    pub decisions: u64,
    pub wins: u64,
    pub losses: u64,
}

/// Aggregate statistics over journal entries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub total: u64,
    pub buys: u64,
    pub sells: u64,
    pub holds: u64,
    /// Directional decisions with a recorded outcome
    pub evaluated: u64,
    pub wins: u64,
    pub losses: u64,
    pub win_rate: Option<Decimal>,
    pub avg_return_pct: Option<Decimal>,
    pub avg_confidence: Decimal,
    pub by_instrument: BTreeMap<String, InstrumentPerformance>,
}

impl PerformanceSummary {
    pub fn from_entries(entries: &[JournalEntry]) -> Self {
        let mut summary = PerformanceSummary::default();
        let mut confidence_sum = Decimal::ZERO;
        let mut return_sum = Decimal::ZERO;

        for entry in entries {
            let decision = &entry.decision;
            summary.total += 1;
            confidence_sum += decision.confidence;
            match decision.verdict {
                Verdict::Buy => summary.buys += 1,
                Verdict::Sell => summary.sells += 1,
                Verdict::Hold => summary.holds += 1,
            }
            let per_instrument = summary
                .by_instrument
                .entry(decision.instrument.to_string())
                .or_default();
            per_instrument.decisions += 1;

            let Some(ret) = entry
                .outcome
                .as_ref()
                .and_then(|outcome| outcome.return_pct(decision))
            else {
                continue;
            };
            summary.evaluated += 1;
            return_sum += ret;
            if ret > Decimal::ZERO {
                summary.wins += 1;
                per_instrument.wins += 1;
            } else {
                summary.losses += 1;
                per_instrument.losses += 1;
            }
        }

        if summary.total > 0 {
            summary.avg_confidence =
                (confidence_sum / Decimal::from(summary.total)).round_dp(CONFIDENCE_DP);
        }
        if summary.evaluated > 0 {
            let evaluated = Decimal::from(summary.evaluated);
            let win_rate = Decimal::from(summary.wins) / evaluated;
            summary.win_rate = Some(win_rate.round_dp(CONFIDENCE_DP));
            summary.avg_return_pct = Some((return_sum / evaluated).round_dp(4));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::MarketStructure;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use types::{Instrument, Timeframe};

    fn decision(minute: i64, verdict: Verdict, price: Decimal) -> Arc<SignalDecision> {
        Arc::new(SignalDecision {
            instrument: Instrument::new("EUR/USD").unwrap(),
            timeframe: Timeframe::M15,
            timestamp: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minute),
            verdict,
            reasoning: Vec::new(),
            confidence: dec!(0.5),
            net_score: dec!(2),
            price,
            market_structure: MarketStructure::Ranging,
            note: None,
        })
    }

    fn outcome(exit_price: Decimal) -> Outcome {
        Outcome {
            exit_price,
            bars_elapsed: 4,
            observed_at: Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_memory_journal_keys() {
        let journal = MemoryJournal::new();
        let buy = decision(0, Verdict::Buy, dec!(1.1));
        journal.record_decision(buy.clone()).await.unwrap();
        assert!(matches!(
            journal.record_decision(buy.clone()).await,
            Err(JournalError::DuplicateDecision { .. })
        ));

        let missing = decision(15, Verdict::Buy, dec!(1.1)).decision_key();
        assert!(matches!(
            journal.record_outcome(&missing, outcome(dec!(1.2))).await,
            Err(JournalError::UnknownDecision { .. })
        ));

        journal.record_outcome(&buy.decision_key(), outcome(dec!(1.2))).await.unwrap();
        assert!(matches!(
            journal.record_outcome(&buy.decision_key(), outcome(dec!(1.3))).await,
            Err(JournalError::OutcomeExists { .. })
        ));
        assert_eq!(journal.len(), 1);
    }

    #[tokio::test]
    async fn test_jsonl_journal_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal").join("signals.jsonl");

        let sell = decision(0, Verdict::Sell, dec!(1.1));
        {
            let journal = JsonlJournal::open(&path).await.unwrap();
            journal.record_decision(sell.clone()).await.unwrap();
            journal
                .record_outcome(&sell.decision_key(), outcome(dec!(1.05)))
                .await
                .unwrap();
        }

        let reopened = JsonlJournal::open(&path).await.unwrap();
        let entries = reopened.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(*entries[0].decision, *sell);
        assert_eq!(entries[0].outcome, Some(outcome(dec!(1.05))));
        assert!(matches!(
            reopened.record_decision(sell).await,
            Err(JournalError::DuplicateDecision { .. })
        ));

        let lines = std::fs::read_to_string(&path).unwrap();
        assert_eq!(lines.lines().count(), 2);
        assert!(lines.contains("\"record\":\"decision\""));
    }

    #[test]
    fn test_performance_summary() {
        let entry = |d: Arc<SignalDecision>, exit: Option<Decimal>| JournalEntry {
            decision: d,
            outcome: exit.map(outcome),
        };
        let entries = vec![
            entry(decision(0, Verdict::Buy, dec!(100)), Some(dec!(110))),
            entry(decision(15, Verdict::Sell, dec!(100)), Some(dec!(105))),
            entry(decision(30, Verdict::Hold, dec!(100)), Some(dec!(90))),
            entry(decision(45, Verdict::Buy, dec!(100)), None),
        ];

        let summary = PerformanceSummary::from_entries(&entries);
        assert_eq!(summary.total, 4);
        assert_eq!((summary.buys, summary.sells, summary.holds), (2, 1, 1));
        assert_eq!(summary.evaluated, 2);
        assert_eq!((summary.wins, summary.losses), (1, 1));
        assert_eq!(summary.win_rate, Some(dec!(0.5)));
        // +10% and -5%
        assert_eq!(summary.avg_return_pct, Some(dec!(2.5)));
        assert_eq!(summary.by_instrument["EUR/USD"].decisions, 4);
    }

    #[test]
    fn test_empty_summary() {
        let summary = PerformanceSummary::from_entries(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.win_rate, None);
        assert_eq!(summary.avg_confidence, Decimal::ZERO);
    }
}
