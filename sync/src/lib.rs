//! # Bazaar Sync
//!
//! Deterministic live-collection sync logic for the Bazaar marketplace client.
//!
//! This crate provides the pure, IO-free half of the client: given a snapshot
//! of a remote collection and a stream of change events, it maintains a local
//! ordered sequence that stays consistent with the remote state. It also holds
//! the other pieces of client-side logic that want determinism: record schema
//! decoding, equality filters, cache freshness rules, and form validation.
//!
//! ## Design Principles
//!
//! - **No IO**: this crate has no knowledge of the network, storage, or tasks
//! - **Deterministic**: the same snapshot and event sequence always produce
//!   the same local sequence
//! - **Total**: applying an event never fails; malformed events are rejected
//!   at the decode boundary, before they reach the reconciler
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is one entity instance: a unique identifier, the collection it
//! belongs to, and a JSON field map. Records are decoded from untyped backend
//! rows by a [`CollectionSchema`], so everything past the source boundary
//! operates on validated data.
//!
//! ### Change events
//!
//! Remote changes arrive as [`ChangeMessage`]s (an action tag plus the new
//! and/or prior row) and decode into [`ChangeEvent`]s: `Inserted`, `Updated`,
//! or `Deleted`.
//!
//! ### Reconciliation
//!
//! The [`Reconciler`] owns the ordered sequence. It is seeded once from a
//! snapshot and then applies each event with merge-tolerant semantics: a
//! duplicate insert behaves as an update, an update for an unknown identifier
//! behaves as an insert, and a late delete is a no-op. The sequence is always
//! unique by identifier.
//!
//! ## Quick Start
//!
//! ```rust
//! use bazaar_sync::{
//!     ChangeEvent, CollectionSchema, FieldDef, FieldType, Reconciler,
//! };
//! use serde_json::json;
//!
//! let schema = CollectionSchema::new(
//!     "listings",
//!     vec![
//!         FieldDef::required("title", FieldType::String),
//!         FieldDef::optional("price", FieldType::Float),
//!     ],
//! );
//!
//! let snapshot = vec![
//!     schema.decode(&json!({"id": "l1", "title": "Desk lamp"})).unwrap(),
//!     schema.decode(&json!({"id": "l2", "title": "Bike"})).unwrap(),
//! ];
//!
//! let mut reconciler = Reconciler::new();
//! reconciler.seed(snapshot);
//!
//! let sold = schema
//!     .decode(&json!({"id": "l2", "title": "Bike (sold)"}))
//!     .unwrap();
//! reconciler.apply(ChangeEvent::Updated(sold));
//!
//! assert_eq!(reconciler.records().len(), 2);
//! assert_eq!(reconciler.records()[1].get("title").unwrap(), "Bike (sold)");
//! ```

pub mod error;
pub mod event;
pub mod filter;
pub mod freshness;
pub mod reconciler;
pub mod record;
pub mod schema;
pub mod validate;

// Re-export main types at crate root
pub use error::Error;
pub use event::{ChangeAction, ChangeEvent, ChangeMessage};
pub use filter::Filter;
pub use freshness::{FreshnessPolicy, DEFAULT_TTL_MS};
pub use reconciler::{Applied, OrderPolicy, Reconciler};
pub use record::Record;
pub use schema::{CollectionSchema, FieldDef, FieldType};
pub use validate::{Form, FormValidator, FormValues, Rule};

/// Type aliases for clarity
pub type RecordId = String;
pub type CollectionName = String;
pub type FieldName = String;
/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;
