//! Bounded fan-out hub
//!
//! Every subscriber owns its own bounded `broadcast` channel, so one slow
//! consumer only ever overruns its own queue. Publishing never waits: a full
//! channel overwrites its oldest message and the subscriber sees the gap as
//! a lag count. Dropping a [`Subscription`] deregisters it.

use dashmap::DashMap;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

pub type SubscriberId = u64;

struct HubInner<T> {
    name: &'static str,
    capacity: usize,
    subscribers: DashMap<SubscriberId, broadcast::Sender<T>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

/// Multi-subscriber broadcast with per-subscriber bounded queues
pub struct BroadcastHub<T> {
    inner: Arc<HubInner<T>>,
}

impl<T: Clone + Send + 'static> BroadcastHub<T> {
    /// `name` only labels log lines. `capacity` is clamped to at least 1.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                name,
                capacity: capacity.max(1),
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Register a new subscriber. It only sees messages published after this call.
    pub fn subscribe(&self) -> Subscription<T> {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = broadcast::channel(self.inner.capacity);

        if !self.inner.closed.load(Ordering::SeqCst) {
            self.inner.subscribers.insert(id, tx);
            // close() may have cleared the registry before the insert landed
            if self.inner.closed.load(Ordering::SeqCst) {
                self.inner.subscribers.remove(&id);
            } else {
                debug!("{} hub: subscriber {} registered", self.inner.name, id);
            }
        }

        Subscription {
            id,
            name: self.inner.name,
            rx,
            dropped: 0,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `message` to every current subscriber. Returns how many
    /// subscribers it was queued for; zero once the hub is closed.
    pub fn publish(&self, message: T) -> usize {
        if self.inner.closed.load(Ordering::SeqCst) {
            return 0;
        }

        self.inner
            .subscribers
            .iter()
            .filter(|entry| entry.value().send(message.clone()).is_ok())
            .count()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Stop accepting messages. Subscribers drain what is already queued and
    /// then observe end of stream.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // dropping the senders closes every channel
        self.inner.subscribers.clear();
        debug!("{} hub: closed", self.inner.name);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl<T> Clone for BroadcastHub<T> {
    fn clone(&self) -> Self {
        BroadcastHub {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Receiving end of a hub subscription
pub struct Subscription<T> {
    id: SubscriberId,
    name: &'static str,
    rx: broadcast::Receiver<T>,
    dropped: u64,
    hub: Weak<HubInner<T>>,
}

impl<T: Clone> Subscription<T> {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next message in publish order, or `None` once the hub is closed and the
    /// queue is drained. Overwritten messages are skipped and counted.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(n)) => self.record_lag(n),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(message) => return Some(message),
                Err(TryRecvError::Lagged(n)) => self.record_lag(n),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Messages lost to overflow so far, as observed by this subscriber
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn record_lag(&mut self, n: u64) {
        if self.dropped == 0 {
            warn!(
                "{} hub: subscriber {} is lagging, dropping oldest messages",
                self.name, self.id
            );
        }
        self.dropped += n;
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            if hub.subscribers.remove(&self.id).is_some() {
                debug!("{} hub: subscriber {} deregistered", hub.name, self.id);
            }
        }
    }
}
