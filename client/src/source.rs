//! The remote collection source contract.
//!
//! A [`CollectionSource`] is the client's view of the hosted backend: a bulk
//! snapshot read, a live change subscription, and mutation pass-throughs.
//! All operations are async and never block the caller's thread.

use crate::error::Result;
use async_trait::async_trait;
use bazaar_sync::{ChangeMessage, Filter, Record};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Sender half of a subscription's event channel.
pub type EventSender = mpsc::UnboundedSender<ChangeMessage>;

/// A capability token for an open live-event channel.
///
/// Closable exactly once per open: the first `close` unregisters the channel
/// from the source; every later call is a no-op. Cloning shares the same
/// underlying channel, so any clone may close it.
#[derive(Clone)]
pub struct SubscriptionHandle {
    id: String,
    closed: Arc<AtomicBool>,
    unregister: Arc<dyn Fn(&str) + Send + Sync>,
}

impl SubscriptionHandle {
    /// Create a handle whose close action runs `unregister` with the
    /// subscription id.
    pub fn new(id: impl Into<String>, unregister: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            id: id.into(),
            closed: Arc::new(AtomicBool::new(false)),
            unregister: Arc::new(unregister),
        }
    }

    /// The subscription id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Close the subscription. Idempotent.
    ///
    /// After this returns the source delivers no further events on the
    /// channel, and any events still queued are discarded by the receiver.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            (self.unregister)(&self.id);
        }
    }

    /// Whether the subscription has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// An open live-event channel for one (collection, filter) pair.
///
/// Owned exclusively by the consumer that created it; dropping it closes the
/// handle.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<ChangeMessage>,
    handle: SubscriptionHandle,
}

impl Subscription {
    /// Pair a receiver with its handle.
    pub fn new(events: mpsc::UnboundedReceiver<ChangeMessage>, handle: SubscriptionHandle) -> Self {
        Self { events, handle }
    }

    /// A clone of this subscription's handle.
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Receive the next change event.
    ///
    /// Returns `None` once the subscription is closed or the source dropped
    /// its sender. Events that were queued before a close are discarded, not
    /// delivered.
    pub async fn next_event(&mut self) -> Option<ChangeMessage> {
        if self.handle.is_closed() {
            return None;
        }
        match self.events.recv().await {
            Some(msg) if !self.handle.is_closed() => Some(msg),
            _ => None,
        }
    }

    /// Close the subscription and drain anything still queued.
    pub fn close(&mut self) {
        self.handle.close();
        self.events.close();
        while self.events.try_recv().is_ok() {}
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.close();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("handle", &self.handle)
            .finish()
    }
}

/// The remote collection source: snapshot reads, live subscriptions, and
/// mutation pass-throughs against the hosted backend.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Fetch the current state of a collection, filtered.
    async fn fetch_snapshot(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>>;

    /// Open a live change channel for a (collection, filter) pair.
    async fn subscribe(&self, collection: &str, filter: &Filter) -> Result<Subscription>;

    /// Insert a row. The returned record is the stored state.
    async fn insert(&self, collection: &str, row: serde_json::Value) -> Result<Record>;

    /// Update a row by identifier, merging `changes` into the stored fields.
    async fn update(&self, collection: &str, id: &str, changes: serde_json::Value)
        -> Result<Record>;

    /// Delete a row by identifier.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}
