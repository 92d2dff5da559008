//! Read-side snapshots of per-slot structure state
//!
//! Each slot task is the single writer of its [`StructureLog`]. After every
//! cycle it publishes an immutable snapshot here; readers clone the `Arc`
//! and never contend with the writer for longer than a map lookup.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use types::{Instrument, Timeframe};

use crate::signals::SignalDecision;
use crate::structure::{StructureEvent, StructureLog};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SlotKey {
    pub instrument: Instrument,
    pub timeframe: Timeframe,
}

impl SlotKey {
    pub fn new(instrument: Instrument, timeframe: Timeframe) -> Self {
        Self {
            instrument,
            timeframe,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.instrument, self.timeframe)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotSnapshot {
    pub slot: SlotKey,
    pub evaluated_through: Option<DateTime<Utc>>,
    pub active_events: Vec<StructureEvent>,
    pub total_events: usize,
    pub last_decision: Option<Arc<SignalDecision>>,
}

impl SlotSnapshot {
    pub fn from_log(
        slot: SlotKey,
        log: &StructureLog,
        last_decision: Option<Arc<SignalDecision>>,
    ) -> Self {
        Self {
            slot,
            evaluated_through: log.last_evaluated(),
            active_events: log.active().cloned().collect(),
            total_events: log.len(),
            last_decision,
        }
    }
}

#[derive(Debug, Default)]
pub struct StructureCache {
    slots: RwLock<HashMap<SlotKey, Arc<SlotSnapshot>>>,
}

impl StructureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: SlotSnapshot) {
        self.slots
            .write()
            .insert(snapshot.slot.clone(), Arc::new(snapshot));
    }

    pub fn get(&self, slot: &SlotKey) -> Option<Arc<SlotSnapshot>> {
        self.slots.read().get(slot).cloned()
    }

    /// Every published snapshot, ordered by slot
    pub fn all(&self) -> Vec<Arc<SlotSnapshot>> {
        let mut snapshots: Vec<_> = self.slots.read().values().cloned().collect();
        snapshots.sort_by(|a, b| a.slot.cmp(&b.slot));
        snapshots
    }
}
