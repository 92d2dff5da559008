//! Append-only structure event log
//!
//! Events are never mutated or removed. An order block that gets closed
//! through, a gap that fills or a liquidity pool that is swept stays in the
//! log; a separate invalidation event points at it. [`StructureLog::active`]
//! is therefore always derivable from the event sequence alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use super::events::{EventId, StructureEvent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogError {
    #[error("event {found} out of sequence, expected {expected}")]
    OutOfSequence { expected: EventId, found: EventId },

    #[error("invalidation {event} targets unknown event {target}")]
    UnknownTarget { event: EventId, target: EventId },

    #[error("event {target} is already invalidated by {by}")]
    AlreadyInvalidated { target: EventId, by: EventId },

    #[error("invalidation {event} targets another invalidation {target}")]
    InvalidationTarget { event: EventId, target: EventId },

    #[error("evaluation watermark cannot move back from {current} to {requested}")]
    WatermarkRegression {
        current: DateTime<Utc>,
        requested: DateTime<Utc>,
    },
}

/// Ordered structure events for one instrument and timeframe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureLog {
    events: Vec<StructureEvent>,
    /// target -> invalidating event
    #[serde(skip)]
    invalidated: HashMap<EventId, EventId>,
    last_evaluated: Option<DateTime<Utc>>,
}

impl StructureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier the next appended event must carry
    pub fn next_id(&self) -> EventId {
        EventId(self.events.len() as u64)
    }

    /// Timestamp of the last bar the analyzer has seen
    pub fn last_evaluated(&self) -> Option<DateTime<Utc>> {
        self.last_evaluated
    }

    pub fn events(&self) -> &[StructureEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: EventId) -> Option<&StructureEvent> {
        self.events.get(usize::try_from(id.0).ok()?)
    }

    /// Invalidation event targeting `id`, if any
    pub fn superseded_by(&self, id: EventId) -> Option<&StructureEvent> {
        self.invalidated.get(&id).and_then(|by| self.get(*by))
    }

    pub fn is_active(&self, id: EventId) -> bool {
        self.get(id)
            .map(|event| !event.is_invalidation() && !self.invalidated.contains_key(&id))
            .unwrap_or(false)
    }

    /// Events not targeted by any invalidation, invalidations excluded
    pub fn active(&self) -> impl Iterator<Item = &StructureEvent> + '_ {
        self.events
            .iter()
            .filter(|event| !event.is_invalidation() && !self.invalidated.contains_key(&event.id))
    }

    /// Append analyzer output and advance the watermark
    ///
    /// Nothing is appended unless every event is valid.
    pub fn append(
        &mut self,
        events: Vec<StructureEvent>,
        evaluated_through: DateTime<Utc>,
    ) -> Result<(), LogError> {
        if let Some(current) = self.last_evaluated {
            if evaluated_through < current {
                return Err(LogError::WatermarkRegression {
                    current,
                    requested: evaluated_through,
                });
            }
        }

        let mut pending: HashMap<EventId, EventId> = HashMap::new();
        for (offset, event) in events.iter().enumerate() {
            let expected = EventId(self.events.len() as u64 + offset as u64);
            if event.id != expected {
                return Err(LogError::OutOfSequence {
                    expected,
                    found: event.id,
                });
            }
            if let Some(target) = event.target() {
                let target_event = self.get(target).or_else(|| {
                    target
                        .0
                        .checked_sub(self.events.len() as u64)
                        .and_then(|i| events.get(i as usize))
                        .filter(|e| e.id < event.id)
                });
                match target_event {
                    None => {
                        return Err(LogError::UnknownTarget {
                            event: event.id,
                            target,
                        })
                    }
                    Some(t) if t.is_invalidation() => {
                        return Err(LogError::InvalidationTarget {
                            event: event.id,
                            target,
                        })
                    }
                    Some(_) => {}
                }
                if let Some(by) = self
                    .invalidated
                    .get(&target)
                    .or_else(|| pending.get(&target))
                {
                    return Err(LogError::AlreadyInvalidated { target, by: *by });
                }
                pending.insert(target, event.id);
            }
        }

        self.invalidated.extend(pending);
        self.events.extend(events);
        self.last_evaluated = Some(evaluated_through);
        Ok(())
    }

    /// Rebuild the invalidation index after deserialization
    pub fn reindex(&mut self) {
        self.invalidated = self
            .events
            .iter()
            .filter_map(|event| event.target().map(|target| (target, event.id)))
            .collect();
    }
}
