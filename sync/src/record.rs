//! Record types for the local view.

use crate::{CollectionName, RecordId};
use serde::{Deserialize, Serialize};

/// A decoded data record.
///
/// Records are produced by [`CollectionSchema::decode`](crate::CollectionSchema::decode)
/// at the remote source boundary and are never mutated locally except by
/// applying a change event. Identity is stable across updates; no field other
/// than the identifier is assumed present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier within the collection
    pub id: RecordId,
    /// Collection this record belongs to
    pub collection: CollectionName,
    /// The validated field map (JSON object, identifier field included)
    pub fields: serde_json::Value,
}

impl Record {
    /// Create a record directly. Prefer decoding through a schema; this is
    /// for sources that already hold validated rows.
    pub fn new(
        id: impl Into<RecordId>,
        collection: impl Into<CollectionName>,
        fields: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            fields,
        }
    }

    /// Get a field value by name.
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.fields.get(field)
    }
}
