//! Sorted queue of score events.

use alloc::vec::Vec;

use crate::event::ScoreEvent;

/// Score events sorted by sample time.
///
/// Events at the same sample keep their insertion order. During playback
/// they are consumed through a cursor that never removes elements, so the
/// drain path does not allocate.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: Vec<ScoreEvent>,
    /// Next event index to process.
    cursor: usize,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { events: Vec::new(), cursor: 0 }
    }

    /// Insert an event, after any events already queued at the same sample.
    pub fn push(&mut self, event: ScoreEvent) {
        let pos = self.events.partition_point(|e| e.at_sample <= event.at_sample);
        self.events.insert(pos, event);
    }

    /// Next unconsumed event.
    pub fn peek(&self) -> Option<&ScoreEvent> {
        self.events.get(self.cursor)
    }

    /// Sample time of the next unconsumed event.
    pub fn next_time(&self) -> Option<u64> {
        self.peek().map(|e| e.at_sample)
    }

    /// Index range of unconsumed events at or before `at_sample`.
    ///
    /// Advances the cursor past them. Index into the queue with `get`.
    pub fn drain_until(&mut self, at_sample: u64) -> core::ops::Range<usize> {
        let start = self.cursor;
        while self.cursor < self.events.len() && self.events[self.cursor].at_sample <= at_sample {
            self.cursor += 1;
        }
        start..self.cursor
    }

    pub fn get(&self, index: usize) -> Option<&ScoreEvent> {
        self.events.get(index)
    }

    /// Time of the last event, if any.
    pub fn last_time(&self) -> Option<u64> {
        self.events.last().map(|e| e.at_sample)
    }

    /// Rewind the cursor so the queue can be played again.
    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.cursor = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether every event has been drained.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoreEvent> {
        self.events.iter()
    }
}
