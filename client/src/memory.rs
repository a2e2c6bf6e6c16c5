//! In-memory collection source.
//!
//! A full implementation of the source contract backed by process memory:
//! schema-validated collections plus a subscriber registry that broadcasts
//! each change to every matching live channel. Used by the test suites and
//! for offline demos.

use crate::error::{ClientError, Result};
use crate::source::{CollectionSource, EventSender, Subscription, SubscriptionHandle};
use async_trait::async_trait;
use bazaar_sync::{ChangeMessage, CollectionName, CollectionSchema, Filter, Record};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A registered live channel.
#[derive(Debug)]
struct Subscriber {
    collection: CollectionName,
    filter: Filter,
    sender: EventSender,
}

/// An in-memory remote collection source.
///
/// Thread-safe and shareable across consumers via `Arc`.
#[derive(Debug)]
pub struct InMemorySource {
    schemas: HashMap<CollectionName, CollectionSchema>,
    records: DashMap<CollectionName, Vec<Record>>,
    subscribers: Arc<DashMap<String, Subscriber>>,
}

impl InMemorySource {
    /// Create a source serving the given collections, all initially empty.
    pub fn new(schemas: Vec<CollectionSchema>) -> Self {
        let records = DashMap::new();
        let mut by_name = HashMap::new();
        for schema in schemas {
            records.insert(schema.name.clone(), Vec::new());
            by_name.insert(schema.name.clone(), schema);
        }
        Self {
            schemas: by_name,
            records,
            subscribers: Arc::new(DashMap::new()),
        }
    }

    /// Create a source wrapped in `Arc` for sharing.
    pub fn new_shared(schemas: Vec<CollectionSchema>) -> Arc<Self> {
        Arc::new(Self::new(schemas))
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn schema(&self, collection: &str) -> Result<&CollectionSchema> {
        self.schemas
            .get(collection)
            .ok_or_else(|| ClientError::UnknownCollection(collection.to_string()))
    }

    /// Deliver a change to every subscriber whose collection and filter match.
    ///
    /// Filters are evaluated against the decoded record the message is about:
    /// the new state for inserts/updates, the prior state for deletes.
    fn broadcast(&self, message: &ChangeMessage, subject: &Record) {
        let mut sent_count = 0;

        for entry in self.subscribers.iter() {
            let sub = entry.value();
            if sub.collection == message.collection
                && sub.filter.matches(subject)
                && sub.sender.send(message.clone()).is_ok()
            {
                sent_count += 1;
            }
        }

        tracing::debug!(
            collection = %message.collection,
            record_id = %subject.id,
            recipients = sent_count,
            "Broadcast change to subscribers"
        );
    }
}

#[async_trait]
impl CollectionSource for InMemorySource {
    async fn fetch_snapshot(&self, collection: &str, filter: &Filter) -> Result<Vec<Record>> {
        self.schema(collection)?;
        let records = self
            .records
            .get(collection)
            .map(|r| r.clone())
            .unwrap_or_default();

        Ok(records
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect())
    }

    async fn subscribe(&self, collection: &str, filter: &Filter) -> Result<Subscription> {
        self.schema(collection)?;

        let sub_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();

        self.subscribers.insert(
            sub_id.clone(),
            Subscriber {
                collection: collection.to_string(),
                filter: filter.clone(),
                sender: tx,
            },
        );

        tracing::info!(
            sub_id = %sub_id,
            channel = %filter.channel_key(collection),
            "Subscription registered"
        );

        let registry = self.subscribers.clone();
        let handle = SubscriptionHandle::new(sub_id, move |id| {
            registry.remove(id);
            tracing::info!(sub_id = %id, "Subscription unregistered");
        });

        Ok(Subscription::new(rx, handle))
    }

    async fn insert(&self, collection: &str, row: serde_json::Value) -> Result<Record> {
        let schema = self.schema(collection)?;
        let record = schema.decode(&row)?;

        {
            let mut records = self
                .records
                .get_mut(collection)
                .ok_or_else(|| ClientError::UnknownCollection(collection.to_string()))?;
            if records.iter().any(|r| r.id == record.id) {
                return Err(ClientError::DuplicateRecord(record.id));
            }
            records.push(record.clone());
        }

        self.broadcast(&ChangeMessage::inserted(collection, row), &record);
        Ok(record)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: serde_json::Value,
    ) -> Result<Record> {
        let schema = self.schema(collection)?;

        let updated = {
            let mut records = self
                .records
                .get_mut(collection)
                .ok_or_else(|| ClientError::UnknownCollection(collection.to_string()))?;
            let existing = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| ClientError::RecordNotFound(id.to_string()))?;

            // Shallow merge of the changed fields over the stored row.
            let mut merged = existing.fields.clone();
            if let (Some(base), Some(patch)) = (merged.as_object_mut(), changes.as_object()) {
                for (key, value) in patch {
                    base.insert(key.clone(), value.clone());
                }
            }

            let updated = schema.decode(&merged)?;
            if updated.id != id {
                return Err(ClientError::Remote("identifier is immutable".to_string()));
            }
            *existing = updated.clone();
            updated
        };

        self.broadcast(
            &ChangeMessage::updated(collection, updated.fields.clone()),
            &updated,
        );
        Ok(updated)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.schema(collection)?;

        let removed = {
            let mut records = self
                .records
                .get_mut(collection)
                .ok_or_else(|| ClientError::UnknownCollection(collection.to_string()))?;
            let position = records
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| ClientError::RecordNotFound(id.to_string()))?;
            records.remove(position)
        };

        self.broadcast(
            &ChangeMessage::deleted(collection, removed.fields.clone()),
            &removed,
        );
        Ok(())
    }
}
