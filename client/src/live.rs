//! Live queries: the subscription lifecycle manager.
//!
//! A [`LiveQuery`] keeps one consumer's view of a (collection, filter) pair
//! in sync with the remote source: it fetches a snapshot, seeds a
//! reconciler, opens exactly one subscription, and applies each change event
//! as it arrives. Consumers observe the sequence through a watch channel.
//!
//! Lifecycle per consumer: Idle -> Fetching -> Subscribed -> Closing -> Idle.
//! A fetch failure returns to Idle with the error surfaced and never opens a
//! subscription. Changing the filter closes the old subscription before the
//! new fetch starts, so there are never two open channels for one consumer.
//! Teardown marks the instance defunct synchronously; in-flight snapshot
//! results and already-queued events that resolve afterwards are discarded
//! instead of applied.

use crate::source::{CollectionSource, SubscriptionHandle};
use bazaar_sync::{Applied, CollectionSchema, Filter, OrderPolicy, Reconciler, Record};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Where a live query currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No snapshot, no subscription
    Idle,
    /// Snapshot fetch in flight
    Fetching,
    /// Snapshot applied, live channel open
    Subscribed,
    /// Old subscription being torn down
    Closing,
}

/// The consumer-visible state of a live query.
#[derive(Debug, Clone)]
pub struct LiveState {
    /// Current lifecycle phase
    pub phase: SyncPhase,
    /// The current ordered sequence
    pub records: Vec<Record>,
    /// The last fetch/subscribe failure, if the query is idle because of one
    pub error: Option<String>,
}

impl LiveState {
    fn idle() -> Self {
        Self {
            phase: SyncPhase::Idle,
            records: Vec::new(),
            error: None,
        }
    }

    /// Whether the initial snapshot is still loading.
    pub fn loading(&self) -> bool {
        self.phase == SyncPhase::Fetching
    }
}

struct LiveQueryInner {
    source: Arc<dyn CollectionSource>,
    schema: CollectionSchema,
    policy: OrderPolicy,
    /// Bumped on every restart/teardown; drivers from older generations
    /// discard their results instead of publishing them.
    generation: AtomicU64,
    state_tx: watch::Sender<LiveState>,
    active: Mutex<Option<SubscriptionHandle>>,
}

/// A live, self-updating view of one (collection, filter) pair.
///
/// Dropping the query closes its subscription.
pub struct LiveQuery {
    inner: Arc<LiveQueryInner>,
}

impl LiveQuery {
    /// Open a live query with arrival ordering.
    pub fn open(
        source: Arc<dyn CollectionSource>,
        schema: CollectionSchema,
        filter: Filter,
    ) -> Self {
        Self::open_with_policy(source, schema, filter, OrderPolicy::default())
    }

    /// Open a live query with an explicit ordering policy.
    pub fn open_with_policy(
        source: Arc<dyn CollectionSource>,
        schema: CollectionSchema,
        filter: Filter,
        policy: OrderPolicy,
    ) -> Self {
        let (state_tx, _) = watch::channel(LiveState::idle());
        let query = Self {
            inner: Arc::new(LiveQueryInner {
                source,
                schema,
                policy,
                generation: AtomicU64::new(0),
                state_tx,
                active: Mutex::new(None),
            }),
        };
        query.spawn_driver(filter);
        query
    }

    /// The current state (phase, sequence, error).
    pub fn state(&self) -> LiveState {
        self.inner.state_tx.borrow().clone()
    }

    /// The current sequence.
    pub fn records(&self) -> Vec<Record> {
        self.inner.state_tx.borrow().records.clone()
    }

    /// Watch the state; the receiver is notified on every mutation.
    pub fn watch(&self) -> watch::Receiver<LiveState> {
        self.inner.state_tx.subscribe()
    }

    /// Switch to a new filter: closes the current subscription, then fetches
    /// and resubscribes with the new parameters.
    pub fn set_filter(&self, filter: Filter) {
        self.shutdown_current();
        self.spawn_driver(filter);
    }

    /// Tear the query down. The old subscription is closed and the sequence
    /// discarded; late results are dropped.
    pub fn close(&self) {
        self.shutdown_current();
        self.inner.state_tx.send_replace(LiveState::idle());
    }

    /// Mark the current generation defunct and close the open subscription,
    /// if any. Synchronous, so nothing that resolves afterwards can mutate
    /// consumer-visible state.
    fn shutdown_current(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let handle = self.inner.active.lock().take();
        if let Some(handle) = handle {
            let previous = self.inner.state_tx.borrow().clone();
            self.inner.state_tx.send_replace(LiveState {
                phase: SyncPhase::Closing,
                records: previous.records,
                error: previous.error,
            });
            handle.close();
        }
    }

    fn spawn_driver(&self, filter: Filter) {
        let inner = self.inner.clone();
        let generation = inner.generation.load(Ordering::SeqCst);
        tokio::spawn(drive(inner, filter, generation));
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for LiveQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery")
            .field("collection", &self.inner.schema.name)
            .field("phase", &self.state().phase)
            .finish()
    }
}

fn stale(inner: &LiveQueryInner, generation: u64) -> bool {
    inner.generation.load(Ordering::SeqCst) != generation
}

fn publish(inner: &LiveQueryInner, generation: u64, state: LiveState) {
    if !stale(inner, generation) {
        inner.state_tx.send_replace(state);
    }
}

/// One sync pass: fetch, seed, subscribe, apply events until closed.
async fn drive(inner: Arc<LiveQueryInner>, filter: Filter, generation: u64) {
    let collection = inner.schema.name.clone();

    publish(
        &inner,
        generation,
        LiveState {
            phase: SyncPhase::Fetching,
            records: Vec::new(),
            error: None,
        },
    );

    let snapshot = match inner.source.fetch_snapshot(&collection, &filter).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(collection = %collection, error = %e, "Snapshot fetch failed");
            publish(
                &inner,
                generation,
                LiveState {
                    phase: SyncPhase::Idle,
                    records: Vec::new(),
                    error: Some(e.to_string()),
                },
            );
            return;
        }
    };

    let mut reconciler = Reconciler::with_policy(inner.policy.clone());
    reconciler.seed(snapshot);

    // The consumer may have torn down while the fetch was in flight. Checked
    // right before subscribing so a defunct driver never opens a channel.
    if stale(&inner, generation) {
        return;
    }

    let mut subscription = match inner.source.subscribe(&collection, &filter).await {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::warn!(collection = %collection, error = %e, "Subscribe failed");
            publish(
                &inner,
                generation,
                LiveState {
                    phase: SyncPhase::Idle,
                    records: Vec::new(),
                    error: Some(e.to_string()),
                },
            );
            return;
        }
    };
    let sub_id = subscription.handle().id().to_string();

    {
        let mut active = inner.active.lock();
        if stale(&inner, generation) {
            drop(active);
            subscription.close();
            return;
        }
        *active = Some(subscription.handle());
    }

    publish(
        &inner,
        generation,
        LiveState {
            phase: SyncPhase::Subscribed,
            records: reconciler.records().to_vec(),
            error: None,
        },
    );

    while let Some(message) = subscription.next_event().await {
        if stale(&inner, generation) {
            break;
        }
        match message.decode(&inner.schema) {
            Ok(event) => {
                if reconciler.apply(event) != Applied::Noop {
                    publish(
                        &inner,
                        generation,
                        LiveState {
                            phase: SyncPhase::Subscribed,
                            records: reconciler.records().to_vec(),
                            error: None,
                        },
                    );
                }
            }
            Err(e) => {
                tracing::warn!(collection = %collection, error = %e, "Dropping malformed change event");
            }
        }
    }

    subscription.close();
    let mut active = inner.active.lock();
    if active.as_ref().map(|h| h.id() == sub_id).unwrap_or(false) {
        *active = None;
    }

    tracing::debug!(collection = %collection, "Live query driver stopped");
}
