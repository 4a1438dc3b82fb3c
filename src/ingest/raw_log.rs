/// Rolling buffer of the most recent raw feed payloads

use std::collections::VecDeque;

use serde_json::Value;

/// Append-only diagnostic window, independent of the token store. Most recent
/// payload first.
#[derive(Debug)]
pub struct RawEventLog {
    events: VecDeque<Value>,
    capacity: usize,
}

impl RawEventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: Value) {
        self.events.push_front(event);
        self.events.truncate(self.capacity);
    }

    pub fn snapshot(&self) -> Vec<Value> {
        self.events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
