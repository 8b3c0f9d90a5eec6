//! Offline event queue.
//!
//! Events built while the client has no connectivity are parked here and
//! replayed in FIFO order on reconnect. Replay is at-most-once: an entry the
//! backend rejects is logged and dropped, never re-queued. The queue is
//! bounded; when full the oldest entry is evicted.

use std::collections::VecDeque;

use crate::host::{Backend, CommandKind, Payload};

/// A deferred `event` dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineQueueEntry {
    pub event_name: String,
    pub parameters: Payload,
}

/// Outcome of one flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Entries kept while offline; older ones are evicted first.
pub const MAX_QUEUED_EVENTS: usize = 100;

#[derive(Debug)]
pub struct OfflineQueue {
    entries: VecDeque<OfflineQueueEntry>,
    capacity: usize,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self::with_capacity(MAX_QUEUED_EVENTS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn enqueue(&mut self, event_name: &str, parameters: Payload) {
        while self.entries.len() >= self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                log::warn!(
                    "Offline queue full ({}), dropping oldest event {}",
                    self.capacity,
                    evicted.event_name
                );
            }
        }
        self.entries.push_back(OfflineQueueEntry {
            event_name: event_name.to_string(),
            parameters,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Take every entry out, oldest first.
    pub fn drain(&mut self) -> Vec<OfflineQueueEntry> {
        self.entries.drain(..).collect()
    }
}

impl Default for OfflineQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Replay drained entries against the backend, bypassing eligibility.
/// Without a backend every entry is dropped.
pub fn replay(entries: Vec<OfflineQueueEntry>, backend: Option<&dyn Backend>) -> FlushReport {
    let mut report = FlushReport::default();
    for entry in entries {
        let result = match backend {
            Some(backend) => backend
                .dispatch(CommandKind::Event, &entry.event_name, &entry.parameters)
                .map_err(|e| e.to_string()),
            None => Err("backend not installed".to_string()),
        };
        match result {
            Ok(()) => report.delivered += 1,
            Err(reason) => {
                log::warn!("Dropping queued event {}: {}", entry.event_name, reason);
                report.dropped += 1;
            }
        }
    }
    report
}
