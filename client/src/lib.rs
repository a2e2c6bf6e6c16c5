//! # Bazaar Client
//!
//! Async live-sync runtime for the Bazaar marketplace client.
//!
//! This crate provides the IO half of live collection sync, over the pure
//! logic in `bazaar-sync`:
//!
//! - [`CollectionSource`]: the contract with the hosted backend (snapshot
//!   reads, live change subscriptions, mutation pass-throughs)
//! - [`LiveQuery`]: the per-consumer subscription lifecycle manager that
//!   keeps an ordered sequence in sync with one (collection, filter) pair
//! - [`QueryCache`]: read-through caching of snapshot results with a
//!   freshness threshold
//! - [`InMemorySource`]: an in-process source implementation for tests and
//!   offline demos
//!
//! ## Quick Start
//!
//! ```rust
//! use bazaar_client::{CollectionSource, InMemorySource, LiveQuery};
//! use bazaar_sync::{CollectionSchema, FieldDef, FieldType, Filter};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let schema = CollectionSchema::new(
//!     "listings",
//!     vec![FieldDef::required("title", FieldType::String)],
//! );
//! let source = InMemorySource::new_shared(vec![schema.clone()]);
//! source
//!     .insert("listings", json!({"id": "l1", "title": "Desk lamp"}))
//!     .await
//!     .unwrap();
//!
//! let query = LiveQuery::open(source.clone(), schema, Filter::all());
//! let mut states = query.watch();
//! while states.borrow().phase != bazaar_client::SyncPhase::Subscribed {
//!     states.changed().await.unwrap();
//! }
//! assert_eq!(query.records().len(), 1);
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod live;
pub mod memory;
pub mod source;

// Re-export main types at crate root
pub use cache::{now_ms, CacheStore, CachedEntry, MemoryCache, QueryCache};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, Result};
pub use live::{LiveQuery, LiveState, SyncPhase};
pub use memory::InMemorySource;
pub use source::{CollectionSource, EventSender, Subscription, SubscriptionHandle};
