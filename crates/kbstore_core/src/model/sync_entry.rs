use serde::{Deserialize, Serialize};

/// One ledger row: "entity `entity_id` of `entity_name` changed".
///
/// Carries no payload. Consumers re-fetch the current state by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEntry {
    /// Monotonic, allocated in the writing transaction.
    pub sync_id: i64,
    pub entity_name: String,
    pub entity_id: String,
    /// Replica that produced the change.
    pub source_id: String,
    /// Epoch ms.
    pub utc_date_changed: i64,
}
