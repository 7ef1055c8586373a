//! Event Buffer
//!
//! Bounded, arrival-ordered window of recent trade events. Once capacity is
//! exceeded the oldest events are evicted first.

use argus_core::TradeEvent;
use std::collections::VecDeque;

/// Default number of events kept for windowed aggregation
pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
pub struct EventBuffer {
    events: VecDeque<TradeEvent>,
    capacity: usize,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append events in arrival order. Returns how many old events were evicted.
    pub fn append<I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = TradeEvent>,
    {
        let mut evicted = 0;
        for event in events {
            if self.events.len() == self.capacity {
                self.events.pop_front();
                evicted += 1;
            }
            self.events.push_back(event);
        }
        evicted
    }

    /// Iterate the current window, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &TradeEvent> {
        self.events.iter()
    }

    /// Owned copy of the current window, oldest first
    pub fn snapshot(&self) -> Vec<TradeEvent> {
        self.events.iter().cloned().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}
