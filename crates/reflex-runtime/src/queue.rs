//! Event intake queue.
//!
//! Events accumulate between ticks and are drained in arrival order at the
//! next `ingest` step. Draining takes the whole buffer at once so a tick
//! never observes a partially consumed batch.

use crate::types::Event;

#[derive(Debug, Default)]
pub struct EventQueue {
    buf: Vec<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.buf.push(event);
    }

    /// Take every queued event, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.buf)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
