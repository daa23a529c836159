//! Branch domain model: one placement edge of the note DAG.
//!
//! # Invariants
//! - `branch_id` is derived from `(parent_note_id, note_id)`, so one pair maps to
//!   exactly one row; re-placing a note revives that row instead of adding another.

use super::{validate_note_id, EntityValidationError};
use serde::{Deserialize, Serialize};

/// Joins parent and note id in a branch id. Never valid inside a note id.
pub const BRANCH_ID_SEPARATOR: char = '_';

/// Derives the deterministic branch id for a placement.
pub fn branch_id_for(parent_note_id: &str, note_id: &str) -> String {
    format!("{parent_note_id}{BRANCH_ID_SEPARATOR}{note_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub branch_id: String,
    pub note_id: String,
    pub parent_note_id: String,
    /// Sibling order key within one parent.
    pub note_position: i64,
    /// Optional display prefix shown before the note title.
    pub prefix: Option<String>,
    pub is_expanded: bool,
    pub is_deleted: bool,
    /// Epoch ms.
    pub date_modified: i64,
}

impl Branch {
    pub fn new(
        note_id: impl Into<String>,
        parent_note_id: impl Into<String>,
        note_position: i64,
    ) -> Self {
        let note_id = note_id.into();
        let parent_note_id = parent_note_id.into();
        Self {
            branch_id: branch_id_for(&parent_note_id, &note_id),
            note_id,
            parent_note_id,
            note_position,
            prefix: None,
            is_expanded: false,
            is_deleted: false,
            date_modified: 0,
        }
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        validate_note_id("note_id", &self.note_id)?;
        validate_note_id("parent_note_id", &self.parent_note_id)?;
        if self.note_id == self.parent_note_id {
            return Err(EntityValidationError::SelfParent(self.note_id.clone()));
        }
        let expected = branch_id_for(&self.parent_note_id, &self.note_id);
        if self.branch_id != expected {
            return Err(EntityValidationError::BranchIdMismatch {
                expected,
                actual: self.branch_id.clone(),
            });
        }
        Ok(())
    }

    pub fn before_saving(&mut self, now_ms: i64) {
        self.date_modified = now_ms;
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}
