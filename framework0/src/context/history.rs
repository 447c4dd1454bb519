//! Attributed change records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One mutation of the context store.
///
/// Every `set` produces exactly one record; a restore produces one record per
/// key whose value changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Position in the history, starting at 1.
    pub seq: u64,
    /// The key that changed.
    pub key: String,
    /// The previous value; `None` if the key was absent.
    pub before: Option<serde_json::Value>,
    /// The new value; `None` only when a restore removed the key.
    pub after: Option<serde_json::Value>,
    /// Identity of the writer (component or step name).
    pub who: String,
    /// When the change was applied.
    pub timestamp: DateTime<Utc>,
}

impl ChangeRecord {
    pub(crate) fn new(
        seq: u64,
        key: impl Into<String>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
        who: impl Into<String>,
    ) -> Self {
        Self {
            seq,
            key: key.into(),
            before,
            after,
            who: who.into(),
            timestamp: Utc::now(),
        }
    }

    /// Returns true if the key did not exist before this change.
    #[must_use]
    pub fn is_creation(&self) -> bool {
        self.before.is_none()
    }

    /// Returns true if this change removed the key.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.after.is_none()
    }
}
