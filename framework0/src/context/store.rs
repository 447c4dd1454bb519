//! The shared, attributed key-value store.

use super::history::ChangeRecord;
use super::snapshot::{Snapshot, SnapshotId, SnapshotInfo};
use crate::errors::ContextError;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// Store and history live under one lock so a write and its record are a unit.
#[derive(Debug, Default)]
struct State {
    store: HashMap<String, serde_json::Value>,
    history: Vec<ChangeRecord>,
}

impl State {
    fn next_seq(&self) -> u64 {
        self.history.len() as u64 + 1
    }
}

/// A thread-safe blackboard shared by all steps of a run.
///
/// Every write names its writer and is recorded in an append-only history.
/// Snapshots capture the whole store and can be restored later; a restore is
/// itself recorded, attributed to whoever requested it.
#[derive(Debug, Default)]
pub struct Context {
    state: RwLock<State>,
    snapshots: RwLock<HashMap<SnapshotId, Snapshot>>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the current value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.state.read().store.get(key).cloned()
    }

    /// Gets the current value for `key`, or `default` if absent.
    #[must_use]
    pub fn get_or(&self, key: &str, default: serde_json::Value) -> serde_json::Value {
        self.get(key).unwrap_or(default)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.state.read().store.contains_key(key)
    }

    /// Writes `value` at `key`, attributed to `who`.
    ///
    /// # Errors
    ///
    /// Returns `MissingAttribution` if `who` is blank and `InvalidKey` if the
    /// key is not a dot-separated name. The store is untouched on error.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
        who: &str,
    ) -> Result<(), ContextError> {
        let key = key.into();
        validate_key(&key)?;
        if who.trim().is_empty() {
            return Err(ContextError::missing_attribution(key));
        }
        let value = value.into();

        let mut state = self.state.write();
        let seq = state.next_seq();
        let before = state.store.insert(key.clone(), value.clone());
        state
            .history
            .push(ChangeRecord::new(seq, key, before, Some(value), who));
        Ok(())
    }

    /// Returns change records in insertion order.
    ///
    /// With `limit`, only the most recent `limit` records are returned.
    #[must_use]
    pub fn get_history(&self, limit: Option<usize>) -> Vec<ChangeRecord> {
        let state = self.state.read();
        let start = limit.map_or(0, |n| state.history.len().saturating_sub(n));
        state.history[start..].to_vec()
    }

    /// Returns the records that touched `key`, oldest first.
    #[must_use]
    pub fn history_for_key(&self, key: &str) -> Vec<ChangeRecord> {
        self.state
            .read()
            .history
            .iter()
            .filter(|record| record.key == key)
            .cloned()
            .collect()
    }

    /// Number of changes applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.read().history.len() as u64
    }

    /// Returns all live key names.
    #[must_use]
    pub fn keys(&self) -> BTreeSet<String> {
        self.state.read().store.keys().cloned().collect()
    }

    /// Returns the number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().store.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().store.is_empty()
    }

    /// Returns a sorted copy of the whole store.
    #[must_use]
    pub fn to_dict(&self) -> BTreeMap<String, serde_json::Value> {
        self.state
            .read()
            .store
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns every entry at or below the dotted `prefix`.
    ///
    /// `namespace("processing")` matches `processing` and `processing.result`
    /// but not `processing_extra`.
    #[must_use]
    pub fn namespace(&self, prefix: &str) -> BTreeMap<String, serde_json::Value> {
        let nested = format!("{prefix}.");
        self.state
            .read()
            .store
            .iter()
            .filter(|(k, _)| k.as_str() == prefix || k.starts_with(&nested))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Captures the current store under a new snapshot id.
    pub fn create_snapshot(&self, label: impl Into<String>) -> SnapshotId {
        let snapshot = {
            let state = self.state.read();
            Snapshot::capture(label, state.store.clone(), state.history.len())
        };
        let id = snapshot.info.id;
        debug!(snapshot_id = %id, label = %snapshot.info.label, keys = snapshot.info.key_count, "Context snapshot created");
        self.snapshots.write().insert(id, snapshot);
        id
    }

    /// Replaces the store with the contents of a snapshot.
    ///
    /// One change record attributed to `who` is appended for every key whose
    /// value differs, in key order. The snapshot stays available.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotNotFound` for an unknown id and `MissingAttribution`
    /// for a blank `who`; the store is untouched in both cases.
    pub fn restore_snapshot(&self, id: &SnapshotId, who: &str) -> Result<(), ContextError> {
        if who.trim().is_empty() {
            return Err(ContextError::missing_attribution(format!("<restore {id}>")));
        }
        let target = self
            .snapshots
            .read()
            .get(id)
            .map(|snapshot| snapshot.store.clone())
            .ok_or_else(|| ContextError::snapshot_not_found(id))?;

        let mut state = self.state.write();
        let changed: BTreeSet<String> = state
            .store
            .keys()
            .chain(target.keys())
            .filter(|key| state.store.get(*key) != target.get(*key))
            .cloned()
            .collect();

        let mut seq = state.next_seq();
        let mut records = Vec::with_capacity(changed.len());
        for key in changed {
            let before = state.store.get(&key).cloned();
            let after = target.get(&key).cloned();
            records.push(ChangeRecord::new(seq, key, before, after, who));
            seq += 1;
        }

        let count = records.len();
        state.store = target;
        state.history.extend(records);
        drop(state);

        info!(snapshot_id = %id, who, changed_keys = count, "Context restored from snapshot");
        Ok(())
    }

    /// Drops a snapshot. Returns false if it did not exist.
    pub fn discard_snapshot(&self, id: &SnapshotId) -> bool {
        self.snapshots.write().remove(id).is_some()
    }

    /// Lists snapshot metadata, oldest first.
    #[must_use]
    pub fn list_snapshots(&self) -> Vec<SnapshotInfo> {
        let mut infos: Vec<SnapshotInfo> = self
            .snapshots
            .read()
            .values()
            .map(|snapshot| snapshot.info.clone())
            .collect();
        infos.sort_by_key(|info| info.created_at);
        infos
    }
}

/// Checks that a key is a non-empty, dot-separated name without empty segments.
pub(crate) fn validate_key(key: &str) -> Result<(), ContextError> {
    if key.trim().is_empty() {
        return Err(ContextError::invalid_key(key, "key must not be empty"));
    }
    if key.split('.').any(str::is_empty) {
        return Err(ContextError::invalid_key(key, "namespace segments must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_get_missing_key() {
        let ctx = Context::new();
        assert_eq!(ctx.get("nope"), None);
        assert_eq!(ctx.get_or("nope", json!(5)), json!(5));
    }

    #[test]
    fn test_two_writer_history() {
        let ctx = Context::new();
        ctx.set("x", 1, "a").unwrap();
        ctx.set("x", 2, "b").unwrap();

        let history = ctx.get_history(None);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].before, None);
        assert_eq!(history[1].before, Some(json!(1)));
        assert_eq!(history[1].after, Some(json!(2)));
        assert_eq!(history[1].who, "b");
        assert_eq!(ctx.get("x"), Some(json!(2)));
    }

    #[test]
    fn test_last_record_matches_value() {
        let ctx = Context::new();
        let writes = [("a", json!(1)), ("b.c", json!("s")), ("a", json!([1, 2])), ("b.c", json!(null))];
        for (key, value) in writes {
            ctx.set(key, value, "writer").unwrap();
            let last = ctx.get_history(Some(1)).pop().unwrap();
            assert_eq!(last.key, key);
            assert_eq!(last.after, ctx.get(key));
        }
    }

    #[test]
    fn test_blank_attribution_rejected() {
        let ctx = Context::new();
        assert!(matches!(
            ctx.set("k", 1, ""),
            Err(ContextError::MissingAttribution { .. })
        ));
        assert!(ctx.set("k", 1, "   ").is_err());
        assert!(ctx.is_empty());
        assert!(ctx.get_history(None).is_empty());
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let ctx = Context::new();
        for key in ["", ".a", "a.", "a..b"] {
            assert!(
                matches!(ctx.set(key, 1, "w"), Err(ContextError::InvalidKey { .. })),
                "key {key:?} should be rejected"
            );
        }
        assert!(ctx.set("processing.result", 1, "w").is_ok());
    }

    #[test]
    fn test_history_limit() {
        let ctx = Context::new();
        for i in 0..5 {
            ctx.set("n", i, "w").unwrap();
        }
        let recent = ctx.get_history(Some(2));
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].after, Some(json!(3)));
        assert_eq!(recent[1].after, Some(json!(4)));
        assert_eq!(ctx.get_history(Some(50)).len(), 5);
        assert_eq!(ctx.version(), 5);
    }

    #[test]
    fn test_snapshot_independence() {
        let ctx = Context::new();
        ctx.set("a", json!({"nested": [1]}), "w").unwrap();
        ctx.set("b", 2, "w").unwrap();
        let before = ctx.to_dict();
        let id = ctx.create_snapshot("checkpoint");

        ctx.set("a", json!({"nested": [1, 2]}), "w").unwrap();
        ctx.set("c", 3, "w").unwrap();

        ctx.restore_snapshot(&id, "restorer").unwrap();
        assert_eq!(ctx.to_dict(), before);
    }

    #[test]
    fn test_restore_records_only_differences() {
        let ctx = Context::new();
        ctx.set("same", 1, "init").unwrap();
        ctx.set("changed", 1, "init").unwrap();
        let id = ctx.create_snapshot("s");

        ctx.set("changed", 2, "step").unwrap();
        ctx.set("added", 3, "step").unwrap();
        let version = ctx.version();

        ctx.restore_snapshot(&id, "error_recovery").unwrap();
        let records: Vec<ChangeRecord> = ctx.get_history(None).split_off(version as usize);
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["added", "changed"]);
        assert!(records.iter().all(|r| r.who == "error_recovery"));
        assert!(records[0].is_removal());
        assert_eq!(records[1].after, Some(json!(1)));
        assert!(!ctx.contains_key("added"));
    }

    #[test]
    fn test_restore_unknown_snapshot() {
        let ctx = Context::new();
        ctx.set("k", 1, "w").unwrap();
        let id = ctx.create_snapshot("tmp");
        assert!(ctx.discard_snapshot(&id));
        assert!(!ctx.discard_snapshot(&id));

        ctx.set("k", 2, "w").unwrap();
        let err = ctx.restore_snapshot(&id, "w").unwrap_err();
        assert!(matches!(err, ContextError::SnapshotNotFound { .. }));
        assert_eq!(ctx.get("k"), Some(json!(2)));
        assert_eq!(ctx.version(), 2);
    }

    #[test]
    fn test_namespace_and_keys() {
        let ctx = Context::new();
        ctx.set("processing", 0, "w").unwrap();
        ctx.set("processing.result", 1, "w").unwrap();
        ctx.set("processing_extra", 2, "w").unwrap();
        ctx.set("other.key", 3, "w").unwrap();

        let ns = ctx.namespace("processing");
        assert_eq!(ns.keys().cloned().collect::<Vec<_>>(), vec!["processing", "processing.result"]);
        assert_eq!(ctx.keys().len(), 4);
        assert_eq!(ctx.len(), 4);
    }

    #[test]
    fn test_history_for_key_and_snapshot_listing() {
        let ctx = Context::new();
        ctx.set("a", 1, "x").unwrap();
        ctx.set("b", 1, "x").unwrap();
        ctx.set("a", 2, "y").unwrap();
        assert_eq!(ctx.history_for_key("a").len(), 2);

        let first = ctx.create_snapshot("first");
        let _second = ctx.create_snapshot("second");
        let listed = ctx.list_snapshots();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|info| info.id == first && info.label == "first"));
        assert!(listed.iter().all(|info| info.history_len == 3));
    }
}
