//! Attribute domain model (labels and relations share one table).
//!
//! # Invariants
//! - `name` is case-sensitive; several attributes with one name may sit on a note.
//! - For relations, `value` holds the target note id.

use super::{new_entity_id, validate_id, validate_note_id, EntityValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Label,
    Relation,
}

impl AttributeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::Relation => "relation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "label" => Some(Self::Label),
            "relation" => Some(Self::Relation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub attribute_id: String,
    /// Owning note.
    pub note_id: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    pub name: String,
    pub value: String,
    pub position: i64,
    /// Propagates to descendants at read time; never materialized.
    pub is_inheritable: bool,
    pub is_deleted: bool,
    pub date_created: i64,
    pub date_modified: i64,
}

impl Attribute {
    pub fn validate(&self) -> Result<(), EntityValidationError> {
        validate_id("attribute_id", &self.attribute_id)?;
        validate_note_id("note_id", &self.note_id)?;
        if self.name.trim().is_empty() {
            return Err(EntityValidationError::BlankName);
        }
        if self.attribute_type == AttributeType::Relation {
            validate_note_id("value", &self.value)?;
        }
        Ok(())
    }

    pub fn before_saving(&mut self, now_ms: i64) {
        if self.date_created == 0 {
            self.date_created = now_ms;
        }
        self.date_modified = now_ms;
    }

    pub fn is_label(&self) -> bool {
        self.attribute_type == AttributeType::Label
    }
}

/// Creation request for an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttribute {
    pub note_id: String,
    pub attribute_type: AttributeType,
    pub name: String,
    pub value: String,
    pub is_inheritable: bool,
}

impl NewAttribute {
    pub fn label(
        note_id: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            note_id: note_id.into(),
            attribute_type: AttributeType::Label,
            name: name.into(),
            value: value.into(),
            is_inheritable: false,
        }
    }

    pub fn relation(
        note_id: impl Into<String>,
        name: impl Into<String>,
        target_note_id: impl Into<String>,
    ) -> Self {
        Self {
            note_id: note_id.into(),
            attribute_type: AttributeType::Relation,
            name: name.into(),
            value: target_note_id.into(),
            is_inheritable: false,
        }
    }

    pub fn inheritable(mut self) -> Self {
        self.is_inheritable = true;
        self
    }

    pub(crate) fn into_attribute(self, position: i64) -> Attribute {
        Attribute {
            attribute_id: new_entity_id(),
            note_id: self.note_id,
            attribute_type: self.attribute_type,
            name: self.name,
            value: self.value,
            position,
            is_inheritable: self.is_inheritable,
            is_deleted: false,
            date_created: 0,
            date_modified: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AttributeType, NewAttribute};
    use crate::model::EntityValidationError;

    #[test]
    fn blank_name_is_rejected() {
        let attribute = NewAttribute::label("n1", "  ", "").into_attribute(0);
        assert_eq!(attribute.validate(), Err(EntityValidationError::BlankName));
    }

    #[test]
    fn relation_requires_target_id() {
        let attribute = NewAttribute::relation("n1", "author", "").into_attribute(0);
        assert!(matches!(
            attribute.validate(),
            Err(EntityValidationError::InvalidId { field: "value", .. })
        ));
        assert_eq!(attribute.attribute_type, AttributeType::Relation);
    }
}
