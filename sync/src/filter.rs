//! Equality filters over collections.
//!
//! The backend's snapshot and subscription endpoints accept a conjunction of
//! field equality constraints. The same filter is used locally to decide
//! which subscribers a change event should reach.

use crate::{FieldName, Record};
use serde::{Deserialize, Serialize};

/// A conjunction of field equality constraints.
///
/// An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    clauses: Vec<(FieldName, serde_json::Value)>,
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn all() -> Self {
        Self::default()
    }

    /// Builder-style method to add an equality clause.
    pub fn eq(mut self, field: impl Into<FieldName>, value: impl Into<serde_json::Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    /// Check whether a record satisfies every clause.
    ///
    /// A record missing a constrained field does not match.
    pub fn matches(&self, record: &Record) -> bool {
        self.clauses
            .iter()
            .all(|(field, value)| record.get(field) == Some(value))
    }

    /// Whether this filter has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The clauses of this filter.
    pub fn clauses(&self) -> &[(FieldName, serde_json::Value)] {
        &self.clauses
    }

    /// A stable key identifying (collection, filter), used for subscription
    /// channels and cache entries.
    pub fn channel_key(&self, collection: &str) -> String {
        if self.clauses.is_empty() {
            return collection.to_string();
        }

        let clauses: Vec<String> = self
            .clauses
            .iter()
            .map(|(field, value)| format!("{field}=eq.{value}"))
            .collect();
        format!("{}?{}", collection, clauses.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing(id: &str, campus: &str, status: &str) -> Record {
        Record::new(
            id,
            "listings",
            json!({"id": id, "campus": campus, "status": status}),
        )
    }

    #[test]
    fn empty_filter_matches_all() {
        let filter = Filter::all();
        assert!(filter.is_empty());
        assert!(filter.matches(&listing("l1", "north", "active")));
    }

    #[test]
    fn single_clause() {
        let filter = Filter::all().eq("campus", "north");

        assert!(filter.matches(&listing("l1", "north", "active")));
        assert!(!filter.matches(&listing("l2", "south", "active")));
    }

    #[test]
    fn conjunction() {
        let filter = Filter::all().eq("campus", "north").eq("status", "active");

        assert!(filter.matches(&listing("l1", "north", "active")));
        assert!(!filter.matches(&listing("l2", "north", "sold")));
    }

    #[test]
    fn missing_field_does_not_match() {
        let filter = Filter::all().eq("category", "furniture");
        assert!(!filter.matches(&listing("l1", "north", "active")));
    }

    #[test]
    fn channel_key_stable() {
        let filter = Filter::all().eq("campus", "north").eq("status", "active");
        assert_eq!(
            filter.channel_key("listings"),
            "listings?campus=eq.\"north\"&status=eq.\"active\""
        );
        assert_eq!(Filter::all().channel_key("listings"), "listings");
    }

    #[test]
    fn serialization_roundtrip() {
        let filter = Filter::all().eq("sellerId", "u7").eq("rating", 5);
        let json = serde_json::to_string(&filter).unwrap();
        let parsed: Filter = serde_json::from_str(&json).unwrap();
        assert_eq!(filter, parsed);
    }
}
