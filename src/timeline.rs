// Delayed work queue. The host owns the real timers; it reports the clock and
// drains whatever has come due.

use crate::types::Timestamp;

/// Items due at a timestamp, released in due order (insertion order on ties).
#[derive(Debug, Clone)]
pub struct Timeline<T> {
    entries: Vec<(Timestamp, T)>,
}

impl<T> Timeline<T> {
    pub fn new() -> Self {
        Timeline {
            entries: Vec::new(),
        }
    }

    pub fn schedule(&mut self, now: Timestamp, delay_ms: u64, item: T) {
        let due = now.after_millis(delay_ms);
        let at = self.entries.partition_point(|(ts, _)| *ts <= due);
        self.entries.insert(at, (due, item));
    }

    /// Remove and return every item due at or before `now`.
    pub fn advance(&mut self, now: Timestamp) -> Vec<T> {
        let due = self.entries.partition_point(|(ts, _)| *ts <= now);
        self.entries.drain(..due).map(|(_, item)| item).collect()
    }

    /// Timestamp of the earliest pending item, so the host can size its timer.
    pub fn next_due(&self) -> Option<Timestamp> {
        self.entries.first().map(|(ts, _)| *ts)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self::new()
    }
}
