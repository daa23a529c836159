//! Note domain model.
//!
//! # Responsibility
//! - Define the metadata record of a note, independent of its placement.
//!
//! # Invariants
//! - `note_id` is stable and never reused for another note.
//! - A note with no active branch is unreachable but still persisted.
//! - Content is not part of this record; it lives with an external collaborator.

use super::{new_entity_id, validate_note_id, EntityValidationError};
use serde::{Deserialize, Serialize};

/// Enumerated note kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteType {
    Text,
    Code,
    Search,
    RelationMap,
    Render,
    File,
    Image,
}

impl NoteType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Search => "search",
            Self::RelationMap => "relation-map",
            Self::Render => "render",
            Self::File => "file",
            Self::Image => "image",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "code" => Some(Self::Code),
            "search" => Some(Self::Search),
            "relation-map" => Some(Self::RelationMap),
            "render" => Some(Self::Render),
            "file" => Some(Self::File),
            "image" => Some(Self::Image),
            _ => None,
        }
    }

    /// MIME assigned when a note of this type is created without one.
    pub fn default_mime(self) -> &'static str {
        match self {
            Self::Text => "text/html",
            Self::Code => "text/plain",
            Self::Search | Self::RelationMap => "application/json",
            Self::Render => "text/html",
            Self::File | Self::Image => "application/octet-stream",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub note_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    pub mime: String,
    /// Opaque gate; encryption is handled outside the store.
    pub is_protected: bool,
    pub is_deleted: bool,
    /// Epoch ms.
    pub date_created: i64,
    /// Epoch ms. Recomputed by the pre-save hook on every write.
    pub date_modified: i64,
}

impl Note {
    pub fn new(title: impl Into<String>, note_type: NoteType) -> Self {
        Self::with_id(new_entity_id(), title, note_type)
    }

    /// Used by bootstrap and replication paths where identity already exists.
    pub fn with_id(
        note_id: impl Into<String>,
        title: impl Into<String>,
        note_type: NoteType,
    ) -> Self {
        Self {
            note_id: note_id.into(),
            title: title.into(),
            note_type,
            mime: note_type.default_mime().to_string(),
            is_protected: false,
            is_deleted: false,
            date_created: 0,
            date_modified: 0,
        }
    }

    pub fn validate(&self) -> Result<(), EntityValidationError> {
        validate_note_id("note_id", &self.note_id)?;
        if self.mime.trim().is_empty() {
            return Err(EntityValidationError::BlankMime);
        }
        Ok(())
    }

    pub fn before_saving(&mut self, now_ms: i64) {
        if self.date_created == 0 {
            self.date_created = now_ms;
        }
        self.date_modified = now_ms;
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}

/// Creation request for a note placed under a parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub note_type: NoteType,
    pub mime: Option<String>,
    pub is_protected: bool,
}

impl NewNote {
    pub fn text(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            note_type: NoteType::Text,
            mime: None,
            is_protected: false,
        }
    }

    pub(crate) fn into_note(self) -> Note {
        let mut note = Note::new(self.title, self.note_type);
        if let Some(mime) = self.mime {
            note.mime = mime;
        }
        note.is_protected = self.is_protected;
        note
    }
}

#[cfg(test)]
mod tests {
    use super::{NewNote, Note, NoteType};

    #[test]
    fn note_type_parse_matches_as_str() {
        for kind in [
            NoteType::Text,
            NoteType::Code,
            NoteType::Search,
            NoteType::RelationMap,
            NoteType::Render,
            NoteType::File,
            NoteType::Image,
        ] {
            assert_eq!(NoteType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NoteType::parse("book"), None);
    }

    #[test]
    fn before_saving_keeps_creation_date() {
        let mut note = Note::new("draft", NoteType::Text);
        note.before_saving(100);
        note.before_saving(250);
        assert_eq!(note.date_created, 100);
        assert_eq!(note.date_modified, 250);
    }

    #[test]
    fn new_note_uses_type_default_mime() {
        let mut request = NewNote::text("code");
        request.note_type = NoteType::Code;
        let note = request.into_note();
        assert_eq!(note.mime, "text/plain");
        assert!(note.validate().is_ok());
    }
}
