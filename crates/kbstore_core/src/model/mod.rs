//! Entity model for the knowledge-base store.
//!
//! # Responsibility
//! - Define the persisted records (notes, branches, attributes, options).
//! - Provide the table identity and a table-generic sum type over records.
//!
//! # Invariants
//! - Every entity is identified by a primary key that is stable for its lifetime.
//! - Deletion is represented by soft-delete tombstones, never physical removal.

pub mod attribute;
pub mod branch;
pub mod note;
pub mod option;
pub mod sync_entry;

pub use attribute::{Attribute, AttributeType, NewAttribute};
pub use branch::{branch_id_for, Branch, BRANCH_ID_SEPARATOR};
pub use note::{NewNote, Note, NoteType};
pub use option::OptionEntry;
pub use sync_entry::SyncEntry;

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Id of the distinguished hierarchy root note.
pub const ROOT_NOTE_ID: &str = "root";
/// Pseudo parent id used by the root note's own branch.
pub const NONE_NOTE_ID: &str = "none";

/// Table identity of a persisted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTable {
    Notes,
    Branches,
    Attributes,
    Options,
}

impl EntityTable {
    pub const ALL: [EntityTable; 4] = [
        EntityTable::Notes,
        EntityTable::Branches,
        EntityTable::Attributes,
        EntityTable::Options,
    ];

    /// Table name, also used as `entity_name` in the sync ledger.
    pub fn name(self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::Branches => "branches",
            Self::Attributes => "attributes",
            Self::Options => "options",
        }
    }

    pub fn primary_key_name(self) -> &'static str {
        match self {
            Self::Notes => "note_id",
            Self::Branches => "branch_id",
            Self::Attributes => "attribute_id",
            Self::Options => "name",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.name() == value)
    }
}

/// One persisted record of any table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum EntityRecord {
    Note(Note),
    Branch(Branch),
    Attribute(Attribute),
    Option(OptionEntry),
}

impl EntityRecord {
    pub fn table(&self) -> EntityTable {
        match self {
            Self::Note(_) => EntityTable::Notes,
            Self::Branch(_) => EntityTable::Branches,
            Self::Attribute(_) => EntityTable::Attributes,
            Self::Option(_) => EntityTable::Options,
        }
    }

    pub fn primary_key(&self) -> &str {
        match self {
            Self::Note(note) => &note.note_id,
            Self::Branch(branch) => &branch.branch_id,
            Self::Attribute(attribute) => &attribute.attribute_id,
            Self::Option(option) => &option.name,
        }
    }
}

/// Validation failures raised before any write reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityValidationError {
    /// Primary key or foreign id is empty or contains whitespace.
    InvalidId { field: &'static str, value: String },
    /// Attribute or option name is blank.
    BlankName,
    /// Branch id does not match `{parent_note_id}_{note_id}`.
    BranchIdMismatch { expected: String, actual: String },
    /// Branch places a note directly under itself.
    SelfParent(String),
    /// MIME type is blank.
    BlankMime,
}

impl Display for EntityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidId { field, value } => write!(f, "invalid {field}: `{value}`"),
            Self::BlankName => write!(f, "name must not be blank"),
            Self::BranchIdMismatch { expected, actual } => {
                write!(f, "branch id `{actual}` does not match expected `{expected}`")
            }
            Self::SelfParent(note_id) => write!(f, "note {note_id} cannot be its own parent"),
            Self::BlankMime => write!(f, "mime must not be blank"),
        }
    }
}

impl Error for EntityValidationError {}

/// Generates a fresh opaque entity id.
pub fn new_entity_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Current wall clock in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn validate_id(field: &'static str, value: &str) -> Result<(), EntityValidationError> {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(EntityValidationError::InvalidId {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Note ids additionally exclude the branch id separator, so
/// `{parent}_{note}` stays unique per pair.
pub(crate) fn validate_note_id(
    field: &'static str,
    value: &str,
) -> Result<(), EntityValidationError> {
    validate_id(field, value)?;
    if value.contains(BRANCH_ID_SEPARATOR) {
        return Err(EntityValidationError::InvalidId {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{new_entity_id, validate_id, validate_note_id, EntityTable};

    #[test]
    fn table_names_round_trip() {
        for table in EntityTable::ALL {
            assert_eq!(EntityTable::from_name(table.name()), Some(table));
        }
        assert_eq!(EntityTable::from_name("images"), None);
    }

    #[test]
    fn generated_ids_are_valid_and_unique() {
        let first = new_entity_id();
        let second = new_entity_id();
        assert_ne!(first, second);
        assert!(validate_id("note_id", &first).is_ok());
        assert!(!first.contains('_'));
    }

    #[test]
    fn validate_id_rejects_blank_and_whitespace() {
        assert!(validate_id("note_id", "").is_err());
        assert!(validate_id("note_id", "a b").is_err());
    }

    #[test]
    fn note_ids_reject_branch_separator() {
        assert!(validate_note_id("note_id", "b_c").is_err());
        assert!(validate_note_id("note_id", "root").is_ok());
        assert!(validate_id("branch_id", "a_b").is_ok());
    }
}
