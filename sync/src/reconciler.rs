//! Reconciliation of snapshots and change events into one local view.
//!
//! This is the core of live collection sync. The reconciler owns an ordered
//! sequence of records, unique by identifier. It is seeded once from a
//! snapshot, then each incoming event mutates the sequence.
//!
//! # Algorithm
//!
//! 1. `seed` replaces the sequence wholesale with the snapshot
//! 2. `apply(Inserted)` appends, or updates in place when the id is known
//! 3. `apply(Updated)` replaces in place, or inserts when the id is unknown
//! 4. `apply(Deleted)` removes, or is a no-op when the id is unknown
//!
//! The merge-tolerant rules in 2-4 make event application idempotent under
//! duplicate delivery and stable under insert/update reordering, which is all
//! the delivery guarantee the remote source offers. Applying an event is
//! total: it never fails and never panics.

use crate::{ChangeEvent, FieldName, Record, RecordId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ordering policy for the local sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OrderPolicy {
    /// Arrival order: snapshot order, inserts appended at the end, updates
    /// kept in place (default; matches the behavior consumers see today)
    #[default]
    Arrival,
    /// Keep the sequence sorted by a field; inserts go to their sorted
    /// position and updates re-sort
    SortedBy {
        field: FieldName,
        descending: bool,
    },
}

/// What applying an event did to the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Applied {
    /// A new record was added
    Inserted,
    /// An existing record was replaced
    Updated,
    /// A record was removed
    Deleted,
    /// Nothing changed (late or duplicate delete)
    Noop,
}

/// The reconciler merges a snapshot and a stream of events into one
/// consistent ordered sequence.
///
/// One reconciler backs one consumer; it is never shared across consumers.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    policy: OrderPolicy,
    records: Vec<Record>,
}

impl Reconciler {
    /// Create an empty reconciler with arrival ordering.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty reconciler with the given ordering policy.
    pub fn with_policy(policy: OrderPolicy) -> Self {
        Self {
            policy,
            records: Vec::new(),
        }
    }

    /// The current sequence.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records in the sequence.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get a record by identifier.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.position(id).map(|i| &self.records[i])
    }

    /// Replace the sequence wholesale with a snapshot.
    ///
    /// Duplicate identifiers within the snapshot keep the last occurrence,
    /// mirroring apply-in-order semantics. Never fails.
    pub fn seed(&mut self, snapshot: Vec<Record>) {
        self.records.clear();
        for record in snapshot {
            match self.position(&record.id) {
                Some(i) => self.records[i] = record,
                None => self.records.push(record),
            }
        }
        self.sort_if_needed();
    }

    /// Apply one change event to the sequence.
    ///
    /// Total: every event maps to a sequence mutation or a no-op.
    pub fn apply(&mut self, event: ChangeEvent) -> Applied {
        match event {
            ChangeEvent::Inserted(record) | ChangeEvent::Updated(record) => {
                self.upsert(record)
            }
            ChangeEvent::Deleted(id) => self.remove(&id),
        }
    }

    fn upsert(&mut self, record: Record) -> Applied {
        match self.position(&record.id) {
            Some(i) => {
                self.records[i] = record;
                // In-place replacement can violate a sorted order when the
                // sort field changed.
                if let OrderPolicy::SortedBy { .. } = self.policy {
                    self.sort_if_needed();
                }
                Applied::Updated
            }
            None => {
                match &self.policy {
                    OrderPolicy::Arrival => self.records.push(record),
                    OrderPolicy::SortedBy { field, descending } => {
                        let pos = self.sorted_position(&record, field, *descending);
                        self.records.insert(pos, record);
                    }
                }
                Applied::Inserted
            }
        }
    }

    fn remove(&mut self, id: &RecordId) -> Applied {
        match self.position(id) {
            Some(i) => {
                self.records.remove(i);
                Applied::Deleted
            }
            None => Applied::Noop,
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn sort_if_needed(&mut self) {
        if let OrderPolicy::SortedBy { field, descending } = self.policy.clone() {
            self.records.sort_by(|a, b| {
                let ord = cmp_field(a.get(&field), b.get(&field));
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
    }

    fn sorted_position(&self, record: &Record, field: &str, descending: bool) -> usize {
        self.records
            .partition_point(|existing| {
                let ord = cmp_field(existing.get(field), record.get(field));
                let ord = if descending { ord.reverse() } else { ord };
                ord != Ordering::Greater
            })
    }
}

/// Compare two optional field values for ordering purposes.
///
/// Numbers compare numerically, strings lexicographically, booleans
/// false-before-true. Absent values sort last; incomparable kinds compare
/// equal, which keeps the sort stable rather than surprising.
fn cmp_field(a: Option<&serde_json::Value>, b: Option<&serde_json::Value>) -> Ordering {
    use serde_json::Value;

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, name: &str) -> Record {
        Record::new(id, "listings", json!({"id": id, "name": name}))
    }

    fn record_with(id: &str, field: &str, value: impl Into<serde_json::Value>) -> Record {
        Record::new(id, "listings", json!({"id": id, field: value.into()}))
    }

    fn ids(reconciler: &Reconciler) -> Vec<&str> {
        reconciler.records().iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn seed_then_update_delete_insert() {
        // The worked example: seed [1:A, 2:B], update 2 -> B2, delete 1,
        // insert 3:C.
        let mut reconciler = Reconciler::new();
        reconciler.seed(vec![record("1", "A"), record("2", "B")]);

        reconciler.apply(ChangeEvent::Updated(record("2", "B2")));
        assert_eq!(ids(&reconciler), vec!["1", "2"]);
        assert_eq!(reconciler.get("2").unwrap().get("name").unwrap(), "B2");

        reconciler.apply(ChangeEvent::Deleted("1".into()));
        assert_eq!(ids(&reconciler), vec!["2"]);

        reconciler.apply(ChangeEvent::Inserted(record("3", "C")));
        assert_eq!(ids(&reconciler), vec!["2", "3"]);
    }

    #[test]
    fn insert_appends() {
        let mut reconciler = Reconciler::new();
        reconciler.seed(vec![record("a", "A")]);

        let applied = reconciler.apply(ChangeEvent::Inserted(record("b", "B")));
        assert_eq!(applied, Applied::Inserted);
        assert_eq!(ids(&reconciler), vec!["a", "b"]);
    }

    #[test]
    fn duplicate_insert_behaves_as_update() {
        let mut reconciler = Reconciler::new();
        reconciler.seed(vec![record("a", "A"), record("b", "B")]);

        let applied = reconciler.apply(ChangeEvent::Inserted(record("a", "A2")));
        assert_eq!(applied, Applied::Updated);
        // Position unchanged, no duplicate added.
        assert_eq!(ids(&reconciler), vec!["a", "b"]);
        assert_eq!(reconciler.get("a").unwrap().get("name").unwrap(), "A2");
    }

    #[test]
    fn update_for_unknown_id_behaves_as_insert() {
        let mut reconciler = Reconciler::new();
        reconciler.seed(vec![record("a", "A")]);

        let applied = reconciler.apply(ChangeEvent::Updated(record("z", "Z")));
        assert_eq!(applied, Applied::Inserted);
        assert_eq!(ids(&reconciler), vec!["a", "z"]);
    }

    #[test]
    fn update_replaces_in_place() {
        let mut reconciler = Reconciler::new();
        reconciler.seed(vec![record("a", "A"), record("b", "B"), record("c", "C")]);

        reconciler.apply(ChangeEvent::Updated(record("b", "B2")));
        assert_eq!(ids(&reconciler), vec!["a", "b", "c"]);
    }

    #[test]
    fn delete_removes() {
        let mut reconciler = Reconciler::new();
        reconciler.seed(vec![record("a", "A"), record("b", "B")]);

        let applied = reconciler.apply(ChangeEvent::Deleted("a".into()));
        assert_eq!(applied, Applied::Deleted);
        assert_eq!(ids(&reconciler), vec!["b"]);
    }

    #[test]
    fn double_delete_is_noop() {
        let mut reconciler = Reconciler::new();
        reconciler.seed(vec![record("a", "A")]);

        assert_eq!(
            reconciler.apply(ChangeEvent::Deleted("a".into())),
            Applied::Deleted
        );
        assert_eq!(
            reconciler.apply(ChangeEvent::Deleted("a".into())),
            Applied::Noop
        );
        assert!(reconciler.is_empty());
    }

    #[test]
    fn delete_for_unknown_id_is_noop() {
        let mut reconciler = Reconciler::new();
        reconciler.seed(vec![record("a", "A")]);

        assert_eq!(
            reconciler.apply(ChangeEvent::Deleted("ghost".into())),
            Applied::Noop
        );
        assert_eq!(reconciler.len(), 1);
    }

    #[test]
    fn reseed_replaces_wholesale() {
        let mut reconciler = Reconciler::new();
        reconciler.seed(vec![record("a", "A"), record("b", "B")]);
        reconciler.apply(ChangeEvent::Inserted(record("c", "C")));

        reconciler.seed(vec![record("x", "X")]);
        assert_eq!(ids(&reconciler), vec!["x"]);
    }

    #[test]
    fn seed_duplicate_ids_keep_last() {
        let mut reconciler = Reconciler::new();
        reconciler.seed(vec![record("a", "first"), record("a", "second")]);

        assert_eq!(reconciler.len(), 1);
        assert_eq!(reconciler.get("a").unwrap().get("name").unwrap(), "second");
    }

    #[test]
    fn insert_then_update_equals_update_then_insert() {
        let mut left = Reconciler::new();
        left.seed(vec![record("a", "A")]);
        left.apply(ChangeEvent::Inserted(record("b", "B1")));
        left.apply(ChangeEvent::Updated(record("b", "B2")));

        let mut right = Reconciler::new();
        right.seed(vec![record("a", "A")]);
        right.apply(ChangeEvent::Updated(record("b", "B1")));
        right.apply(ChangeEvent::Inserted(record("b", "B2")));

        assert_eq!(left.records(), right.records());
        assert_eq!(ids(&left), vec!["a", "b"]);
    }

    #[test]
    fn sorted_policy_inserts_in_order() {
        let mut reconciler = Reconciler::with_policy(OrderPolicy::SortedBy {
            field: "price".into(),
            descending: false,
        });
        reconciler.seed(vec![
            record_with("a", "price", 30),
            record_with("b", "price", 10),
        ]);
        // Seed sorts.
        assert_eq!(ids(&reconciler), vec!["b", "a"]);

        reconciler.apply(ChangeEvent::Inserted(record_with("c", "price", 20)));
        assert_eq!(ids(&reconciler), vec!["b", "c", "a"]);
    }

    #[test]
    fn sorted_policy_resorts_on_update() {
        let mut reconciler = Reconciler::with_policy(OrderPolicy::SortedBy {
            field: "createdAt".into(),
            descending: true,
        });
        reconciler.seed(vec![
            record_with("a", "createdAt", 3000),
            record_with("b", "createdAt", 2000),
            record_with("c", "createdAt", 1000),
        ]);
        assert_eq!(ids(&reconciler), vec!["a", "b", "c"]);

        reconciler.apply(ChangeEvent::Updated(record_with("c", "createdAt", 5000)));
        assert_eq!(ids(&reconciler), vec!["c", "a", "b"]);
    }

    #[test]
    fn sorted_policy_missing_field_sorts_last() {
        let mut reconciler = Reconciler::with_policy(OrderPolicy::SortedBy {
            field: "price".into(),
            descending: false,
        });
        reconciler.seed(vec![record("a", "no price"), record_with("b", "price", 5)]);

        assert_eq!(ids(&reconciler), vec!["b", "a"]);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        #[derive(Debug, Clone)]
        enum Op {
            Insert(u8),
            Update(u8),
            Delete(u8),
        }

        fn arb_op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u8..8).prop_map(Op::Insert),
                (0u8..8).prop_map(Op::Update),
                (0u8..8).prop_map(Op::Delete),
            ]
        }

        fn to_event(op: &Op, version: usize) -> ChangeEvent {
            match op {
                Op::Insert(n) => ChangeEvent::Inserted(record_with(
                    &format!("r{n}"),
                    "version",
                    version as u64,
                )),
                Op::Update(n) => ChangeEvent::Updated(record_with(
                    &format!("r{n}"),
                    "version",
                    version as u64,
                )),
                Op::Delete(n) => ChangeEvent::Deleted(format!("r{n}")),
            }
        }

        proptest! {
            #[test]
            fn prop_no_duplicate_ids(ops in prop::collection::vec(arb_op(), 0..64)) {
                let mut reconciler = Reconciler::new();
                reconciler.seed(vec![record("r0", "seeded"), record("r1", "seeded")]);

                for (i, op) in ops.iter().enumerate() {
                    reconciler.apply(to_event(op, i));

                    let mut seen = HashSet::new();
                    for r in reconciler.records() {
                        prop_assert!(seen.insert(r.id.clone()), "duplicate id {}", r.id);
                    }
                }
            }

            #[test]
            fn prop_final_state_matches_last_write(ops in prop::collection::vec(arb_op(), 0..64)) {
                let mut reconciler = Reconciler::new();
                reconciler.seed(Vec::new());

                // Shadow model: id -> latest version, or absent after delete.
                let mut model: std::collections::HashMap<String, u64> =
                    std::collections::HashMap::new();

                for (i, op) in ops.iter().enumerate() {
                    reconciler.apply(to_event(op, i));
                    match op {
                        Op::Insert(n) | Op::Update(n) => {
                            model.insert(format!("r{n}"), i as u64);
                        }
                        Op::Delete(n) => {
                            model.remove(&format!("r{n}"));
                        }
                    }
                }

                prop_assert_eq!(reconciler.len(), model.len());
                for (id, version) in &model {
                    let record = reconciler.get(id).expect("record missing");
                    prop_assert_eq!(record.get("version").unwrap(), *version);
                }
            }

            #[test]
            fn prop_apply_is_idempotent(ops in prop::collection::vec(arb_op(), 1..32)) {
                let mut once = Reconciler::new();
                let mut twice = Reconciler::new();

                for (i, op) in ops.iter().enumerate() {
                    once.apply(to_event(op, i));
                    twice.apply(to_event(op, i));
                    twice.apply(to_event(op, i)); // duplicate delivery
                }

                prop_assert_eq!(once.records(), twice.records());
            }
        }
    }
}
