//! Attribute index: labels and relations attached to notes.
//!
//! # Responsibility
//! - Create and tombstone attributes through the repository (so each write
//!   reaches the sync ledger).
//! - Answer "which note carries label X (=value)" lookups deterministically.
//! - Resolve effective attributes, including inheritable ones from ancestors.
//!
//! # Invariants
//! - Label lookups only match attributes owned directly by the note.
//! - Lookup order is `note_id ASC`, so repeated calls agree.
//! - Inheritable attributes are never copied onto descendants.

use crate::error::{RepoError, RepoResult};
use crate::hierarchy::query::ancestor_ids;
use crate::model::{Attribute, AttributeType, EntityTable, NewAttribute, Note};
use crate::repo::{Repository, WriteTx};
use crate::store;
use rusqlite::{params, Connection};
use std::collections::HashSet;

const NOTE_WITH_LABEL_PREDICATE: &str = "n.is_deleted = 0
    AND EXISTS (
      SELECT 1
      FROM attributes a
      WHERE a.note_id = n.note_id
        AND a.type = 'label'
        AND a.is_deleted = 0
        AND a.name = ?1
        AND (?2 IS NULL OR a.value = ?2)
    )
    ORDER BY n.note_id ASC";

/// Creates one attribute after checking its owner (and relation target).
pub fn create_attribute(tx: &WriteTx<'_>, request: NewAttribute) -> RepoResult<Attribute> {
    require_note(tx.conn(), &request.note_id)?;
    if request.attribute_type == AttributeType::Relation {
        require_note(tx.conn(), &request.value)?;
    }
    let position = next_attribute_position(tx.conn(), &request.note_id)?;
    tx.create_entity(request.into_attribute(position))
}

/// Adds a label. A missing value is stored as the empty string.
pub fn create_label(
    tx: &WriteTx<'_>,
    note_id: &str,
    name: &str,
    value: Option<&str>,
) -> RepoResult<Attribute> {
    create_attribute(tx, NewAttribute::label(note_id, name, value.unwrap_or_default()))
}

pub fn create_relation(
    tx: &WriteTx<'_>,
    note_id: &str,
    name: &str,
    target_note_id: &str,
) -> RepoResult<Attribute> {
    create_attribute(tx, NewAttribute::relation(note_id, name, target_note_id))
}

/// Tombstones one attribute.
pub fn remove_attribute(tx: &WriteTx<'_>, attribute_id: &str) -> RepoResult<Attribute> {
    let mut attribute: Attribute = tx.get_required(attribute_id)?;
    if !attribute.is_deleted {
        attribute.is_deleted = true;
        tx.update_entity(&mut attribute)?;
    }
    Ok(attribute)
}

/// First active note owning an active label `name` (with `value`, if given).
pub fn get_note_with_label(
    conn: &Connection,
    name: &str,
    value: Option<&str>,
) -> RepoResult<Option<Note>> {
    store::query_one(conn, NOTE_WITH_LABEL_PREDICATE, params![name, value])
}

pub fn get_notes_with_label(
    conn: &Connection,
    name: &str,
    value: Option<&str>,
) -> RepoResult<Vec<Note>> {
    store::query(conn, NOTE_WITH_LABEL_PREDICATE, params![name, value])
}

/// Active attributes owned by `note_id`, in position order.
pub fn attributes_of(conn: &Connection, note_id: &str) -> RepoResult<Vec<Attribute>> {
    store::query(
        conn,
        "a.note_id = ?1 AND a.is_deleted = 0 ORDER BY a.position ASC, a.attribute_id ASC",
        [note_id],
    )
}

/// Value of the first active label `name` owned by `note_id`.
pub fn get_label_value(conn: &Connection, note_id: &str, name: &str) -> RepoResult<Option<String>> {
    let label: Option<Attribute> = store::query_one(
        conn,
        "a.note_id = ?1 AND a.type = 'label' AND a.name = ?2 AND a.is_deleted = 0
         ORDER BY a.position ASC, a.attribute_id ASC",
        [note_id, name],
    )?;
    Ok(label.map(|attribute| attribute.value))
}

pub fn has_label(conn: &Connection, note_id: &str, name: &str) -> RepoResult<bool> {
    Ok(get_label_value(conn, note_id, name)?.is_some())
}

/// Own attributes of `note_id` followed by the inheritable attributes of its
/// ancestors, nearest first. Values accumulate; nothing overrides.
pub fn effective_attributes(conn: &Connection, note_id: &str) -> RepoResult<Vec<Attribute>> {
    let mut seen = HashSet::new();
    let mut effective = Vec::new();
    for attribute in attributes_of(conn, note_id)? {
        seen.insert(attribute.attribute_id.clone());
        effective.push(attribute);
    }
    for ancestor in ancestor_ids(conn, note_id)? {
        for attribute in attributes_of(conn, &ancestor)? {
            if attribute.is_inheritable && seen.insert(attribute.attribute_id.clone()) {
                effective.push(attribute);
            }
        }
    }
    Ok(effective)
}

fn require_note(conn: &Connection, note_id: &str) -> RepoResult<()> {
    match store::get::<Note>(conn, note_id)? {
        Some(note) if note.is_active() => Ok(()),
        _ => Err(RepoError::not_found(EntityTable::Notes, note_id)),
    }
}

fn next_attribute_position(conn: &Connection, note_id: &str) -> RepoResult<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(position), -1) + 1
         FROM attributes
         WHERE note_id = ?1
           AND is_deleted = 0;",
        [note_id],
        |row| row.get(0),
    )?;
    Ok(next)
}

/// Attribute facade running each operation in its own transaction.
pub struct AttributeIndex<'r> {
    repo: &'r Repository,
}

impl<'r> AttributeIndex<'r> {
    pub fn new(repo: &'r Repository) -> Self {
        Self { repo }
    }

    pub fn create_label(
        &self,
        note_id: &str,
        name: &str,
        value: Option<&str>,
    ) -> RepoResult<Attribute> {
        self.repo.write(|tx| create_label(tx, note_id, name, value))
    }

    pub fn create_relation(
        &self,
        note_id: &str,
        name: &str,
        target_note_id: &str,
    ) -> RepoResult<Attribute> {
        self.repo.write(|tx| create_relation(tx, note_id, name, target_note_id))
    }

    pub fn create_attribute(&self, request: NewAttribute) -> RepoResult<Attribute> {
        self.repo.write(|tx| create_attribute(tx, request))
    }

    pub fn remove_attribute(&self, attribute_id: &str) -> RepoResult<Attribute> {
        self.repo.write(|tx| remove_attribute(tx, attribute_id))
    }

    pub fn get_note_with_label(&self, name: &str, value: Option<&str>) -> RepoResult<Option<Note>> {
        self.repo.read(|conn| get_note_with_label(conn, name, value))
    }

    pub fn get_notes_with_label(&self, name: &str, value: Option<&str>) -> RepoResult<Vec<Note>> {
        self.repo.read(|conn| get_notes_with_label(conn, name, value))
    }

    pub fn attributes_of(&self, note_id: &str) -> RepoResult<Vec<Attribute>> {
        self.repo.read(|conn| attributes_of(conn, note_id))
    }

    pub fn get_label_value(&self, note_id: &str, name: &str) -> RepoResult<Option<String>> {
        self.repo.read(|conn| get_label_value(conn, note_id, name))
    }

    pub fn effective_attributes(&self, note_id: &str) -> RepoResult<Vec<Attribute>> {
        self.repo.read(|conn| effective_attributes(conn, note_id))
    }
}
