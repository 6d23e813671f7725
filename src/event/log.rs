use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::sequencer::ClockKind;

/// What the engine did, for step highlighting and inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    ClockStarted { clock: ClockKind },
    ClockStopped { clock: ClockKind },
    StepAdvanced { clock: ClockKind, step: usize },
    /// A voice was scheduled; `voice` is a drum kind, bass type or instrument name
    VoiceTriggered { voice: String, gain: f32 },
    RecordingStopped { entries: usize },
    LoopWrapped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    /// Engine time in samples
    pub frame: u64,
    pub event: EngineEvent,
}

/// Ring buffer of recent engine events
pub struct EventLog {
    events: VecDeque<Event>,
    next_id: u64,
    max_events: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(500)
    }

    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            next_id: 1,
            max_events,
        }
    }

    pub fn push(&mut self, frame: u64, event: EngineEvent) {
        self.events.push_back(Event {
            id: self.next_id,
            frame,
            event,
        });
        self.next_id += 1;

        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
    }

    /// Get all events since a given ID
    pub fn get_events_since(&self, since_id: u64) -> Vec<Event> {
        self.events
            .iter()
            .filter(|e| e.id > since_id)
            .cloned()
            .collect()
    }

    pub fn latest_id(&self) -> u64 {
        self.events.back().map(|e| e.id).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_drops_oldest() {
        let mut log = EventLog::with_capacity(3);
        for i in 0..5 {
            log.push(i, EngineEvent::LoopWrapped);
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.latest_id(), 5);
        let since = log.get_events_since(3);
        assert_eq!(since.iter().map(|e| e.id).collect::<Vec<_>>(), vec![4, 5]);
        assert_eq!(log.iter().next().map(|e| e.frame), Some(2));
    }
}
