//! Change events from the remote collection source.
//!
//! Changes arrive on the wire as tagged messages carrying the new row, the
//! prior row, or both. They decode into typed [`ChangeEvent`]s before they
//! touch the reconciler; anything malformed is rejected here and reported to
//! the caller rather than raised downstream.

use crate::{error::Result, CollectionName, CollectionSchema, Error, Record, RecordId};
use serde::{Deserialize, Serialize};

/// The operation tag carried by a wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

/// A change notification as the remote source emits it.
///
/// Insert and update carry the full new row in `record`; delete carries the
/// prior state of the row in `old_record`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMessage {
    /// Operation tag
    pub action: ChangeAction,
    /// Collection the change belongs to
    pub collection: CollectionName,
    /// Full new row for insert/update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<serde_json::Value>,
    /// Prior row state for delete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_record: Option<serde_json::Value>,
}

impl ChangeMessage {
    /// Build an insert message.
    pub fn inserted(collection: impl Into<CollectionName>, row: serde_json::Value) -> Self {
        Self {
            action: ChangeAction::Insert,
            collection: collection.into(),
            record: Some(row),
            old_record: None,
        }
    }

    /// Build an update message.
    pub fn updated(collection: impl Into<CollectionName>, row: serde_json::Value) -> Self {
        Self {
            action: ChangeAction::Update,
            collection: collection.into(),
            record: Some(row),
            old_record: None,
        }
    }

    /// Build a delete message carrying the row's prior state.
    pub fn deleted(collection: impl Into<CollectionName>, old_row: serde_json::Value) -> Self {
        Self {
            action: ChangeAction::Delete,
            collection: collection.into(),
            record: None,
            old_record: Some(old_row),
        }
    }

    /// Decode this message into a typed event using the collection schema.
    ///
    /// Fails if the message targets a different collection, carries no row
    /// for its action, or the row fails schema decoding. Delete rows only
    /// need a readable identifier; their other fields are not re-validated
    /// since the backend sends prior state that may predate the schema.
    pub fn decode(&self, schema: &CollectionSchema) -> Result<ChangeEvent> {
        if self.collection != schema.name {
            return Err(Error::CollectionMismatch {
                expected: schema.name.clone(),
                got: self.collection.clone(),
            });
        }

        match self.action {
            ChangeAction::Insert => {
                let row = self.row()?;
                Ok(ChangeEvent::Inserted(schema.decode(row)?))
            }
            ChangeAction::Update => {
                let row = self.row()?;
                Ok(ChangeEvent::Updated(schema.decode(row)?))
            }
            ChangeAction::Delete => {
                let row = self
                    .old_record
                    .as_ref()
                    .or(self.record.as_ref())
                    .ok_or_else(|| Error::MissingRow {
                        collection: self.collection.clone(),
                    })?;
                Ok(ChangeEvent::Deleted(schema.extract_id(row)?))
            }
        }
    }

    fn row(&self) -> Result<&serde_json::Value> {
        self.record.as_ref().ok_or_else(|| Error::MissingRow {
            collection: self.collection.clone(),
        })
    }
}

/// A decoded change event, ready to apply to the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A record was inserted
    Inserted(Record),
    /// A record was updated
    Updated(Record),
    /// The record with this identifier was deleted
    Deleted(RecordId),
}

impl ChangeEvent {
    /// Get the identifier this event targets.
    pub fn record_id(&self) -> &RecordId {
        match self {
            ChangeEvent::Inserted(record) => &record.id,
            ChangeEvent::Updated(record) => &record.id,
            ChangeEvent::Deleted(id) => id,
        }
    }
}
