//! Offset-indexed publish log with per-consumer cursors.
//!
//! One lock per log; every operation is a short critical section, so
//! topics serialize their own mutations without blocking each other.

use parking_lot::Mutex;
use std::collections::HashMap;
use weft_event::PublishEvent;

/// One appended record: the publish plus whether it belongs to the
/// output channel (facade-facing) rather than node traffic.
#[derive(Debug, Clone)]
pub(crate) struct LogRecord {
    pub event: PublishEvent,
    pub output: bool,
}

#[derive(Default)]
struct LogState {
    records: Vec<LogRecord>,
    /// Consumer name -> next unread offset.
    cursors: HashMap<String, usize>,
}

/// Append-only event log backing one topic.
///
/// Invariants maintained here:
/// - a record's offset equals its index in the log, contiguous from 0
/// - cursors never exceed the log length and never move backwards
///
/// Consumers that were never registered read from offset 0; late
/// binding is intentional so a facade attached after the fact sees
/// the full history.
#[derive(Default)]
pub(crate) struct EventLog {
    state: Mutex<LogState>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a publish, assigning its offset. Returns the stored
    /// event with the offset filled in.
    pub fn append(&self, mut event: PublishEvent, output: bool) -> PublishEvent {
        let mut state = self.state.lock();
        event.offset = state.records.len();
        state.records.push(LogRecord {
            event: event.clone(),
            output,
        });
        event
    }

    /// Re-appends a stored publish verbatim, keeping its offset.
    ///
    /// Restoration replays events in their original order, so the
    /// preserved offset always equals the next index; a mismatch
    /// means the caller replayed out of order and is a logic error
    /// worth surfacing loudly in debug builds.
    pub fn restore(&self, event: PublishEvent, output: bool) {
        let mut state = self.state.lock();
        debug_assert_eq!(event.offset, state.records.len());
        state.records.push(LogRecord { event, output });
    }

    /// Moves a consumer's cursor to at least `offset + 1`.
    pub fn advance(&self, consumer: &str, offset: usize) {
        let mut state = self.state.lock();
        let len = state.records.len();
        let cursor = state.cursors.entry(consumer.to_string()).or_insert(0);
        *cursor = (*cursor).max(offset + 1).min(len);
    }

    /// Whether unread records matching the filter exist for the
    /// consumer.
    pub fn has_unread(&self, consumer: &str, include_output: bool) -> bool {
        let state = self.state.lock();
        let cursor = state.cursors.get(consumer).copied().unwrap_or(0);
        state.records[cursor.min(state.records.len())..]
            .iter()
            .any(|r| include_output || !r.output)
    }

    /// Takes every unread record, advancing the cursor to the end of
    /// the log. Records not matching the filter are skipped but still
    /// passed over by the cursor.
    ///
    /// Atomic with respect to concurrent appends on this log.
    pub fn take_unread(&self, consumer: &str, include_output: bool) -> Vec<PublishEvent> {
        let mut state = self.state.lock();
        let len = state.records.len();
        let cursor = state.cursors.entry(consumer.to_string()).or_insert(0);
        let start = (*cursor).min(len);
        *cursor = len;
        state.records[start..]
            .iter()
            .filter(|r| include_output || !r.output)
            .map(|r| r.event.clone())
            .collect()
    }

    /// Takes unread records matching the filter only, advancing the
    /// cursor past everything seen.
    pub fn take_unread_outputs(&self, consumer: &str) -> Vec<PublishEvent> {
        let mut state = self.state.lock();
        let len = state.records.len();
        let cursor = state.cursors.entry(consumer.to_string()).or_insert(0);
        let start = (*cursor).min(len);
        *cursor = len;
        state.records[start..]
            .iter()
            .filter(|r| r.output)
            .map(|r| r.event.clone())
            .collect()
    }

    /// Number of records in the log.
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Looks up a record by offset.
    pub fn get(&self, offset: usize) -> Option<LogRecord> {
        self.state.lock().records.get(offset).cloned()
    }

    /// Clones the whole log, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        self.state.lock().records.clone()
    }

    /// Drops all records and cursors.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.records.clear();
        state.cursors.clear();
    }
}
