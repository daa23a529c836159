//! Option domain model: named store settings.
//!
//! # Invariants
//! - Options with `is_synced = false` are replica-local and never reach the ledger.

use super::EntityValidationError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub name: String,
    pub value: String,
    pub is_synced: bool,
    pub date_modified: i64,
}

impl OptionEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>, is_synced: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_synced,
            date_modified: 0,
        }
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        if self.name.trim().is_empty() {
            return Err(EntityValidationError::BlankName);
        }
        Ok(())
    }
}
