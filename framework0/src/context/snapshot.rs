//! Point-in-time copies of the context store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(Uuid);

impl SnapshotId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable copy of the store.
///
/// `serde_json::Value` clones are deep, so later writes to the live store
/// never leak into a snapshot.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub(crate) info: SnapshotInfo,
    pub(crate) store: HashMap<String, serde_json::Value>,
}

/// Public metadata about a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// The snapshot id.
    pub id: SnapshotId,
    /// Caller-supplied label (e.g., "pre_execution").
    pub label: String,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
    /// Length of the history at the time of the snapshot.
    pub history_len: usize,
    /// Number of keys captured.
    pub key_count: usize,
}

impl Snapshot {
    pub(crate) fn capture(
        label: impl Into<String>,
        store: HashMap<String, serde_json::Value>,
        history_len: usize,
    ) -> Self {
        Self {
            info: SnapshotInfo {
                id: SnapshotId::generate(),
                label: label.into(),
                created_at: Utc::now(),
                history_len,
                key_count: store.len(),
            },
            store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_ids_are_unique() {
        let a = SnapshotId::generate();
        let b = SnapshotId::generate();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 36);
    }

    #[test]
    fn test_capture_metadata() {
        let mut store = HashMap::new();
        store.insert("a".to_string(), serde_json::json!(1));
        let snap = Snapshot::capture("label", store, 7);
        assert_eq!(snap.info.label, "label");
        assert_eq!(snap.info.history_len, 7);
        assert_eq!(snap.info.key_count, 1);
    }
}
