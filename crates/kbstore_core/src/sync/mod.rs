//! Sync ledger and the read side offered to replication transports.
//!
//! # Responsibility
//! - Append and read the `sync_log` change ledger.
//! - Resolve ledger entries to current entity state for a transport.
//! - Re-queue a note and its placements/attributes for sync on demand.
//!
//! # Invariants
//! - The ledger carries no payload; consumers always re-fetch by id.
//! - Conflict resolution belongs to the transport, not to this module.

pub mod ledger;

use crate::error::{RepoError, RepoResult};
use crate::model::{Attribute, Branch, EntityRecord, EntityTable, Note, SyncEntry};
use crate::repo::WriteTx;
use crate::store;
use log::info;
use rusqlite::Connection;

/// One ledger entry paired with the entity's state at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedEntity {
    pub entry: SyncEntry,
    /// `None` when the entity row is missing or its table is unknown.
    pub record: Option<EntityRecord>,
}

/// Reads up to `limit` entries after `after` and re-fetches each entity.
///
/// Several entries for one entity each resolve to the same current state.
pub fn changes_since(conn: &Connection, after: i64, limit: u32) -> RepoResult<Vec<ChangedEntity>> {
    let entries = ledger::read_since_limited(conn, after, limit)?;
    let mut changes = Vec::with_capacity(entries.len());
    for entry in entries {
        let record = match EntityTable::from_name(&entry.entity_name) {
            Some(table) => store::get_record(conn, table, &entry.entity_id)?,
            None => None,
        };
        changes.push(ChangedEntity { entry, record });
    }
    Ok(changes)
}

/// Appends ledger entries for a note, all its branches and all its attributes
/// without touching their data. Returns the number of entries written.
pub fn force_note_sync(tx: &WriteTx<'_>, note_id: &str) -> RepoResult<usize> {
    let note: Option<Note> = tx.get(note_id)?;
    if note.is_none() {
        return Err(RepoError::not_found(EntityTable::Notes, note_id));
    }

    let mut written = 0;
    tx.touch(EntityTable::Notes, note_id)?;
    written += 1;

    let branches: Vec<Branch> = tx.get_entities("b.note_id = ?1 ORDER BY b.branch_id", [note_id])?;
    for branch in &branches {
        tx.touch(EntityTable::Branches, &branch.branch_id)?;
        written += 1;
    }

    let attributes: Vec<Attribute> =
        tx.get_entities("a.note_id = ?1 ORDER BY a.attribute_id", [note_id])?;
    for attribute in &attributes {
        tx.touch(EntityTable::Attributes, &attribute.attribute_id)?;
        written += 1;
    }

    info!(
        "event=sync_force_note module=sync status=ok note_id={} entries={}",
        note_id, written
    );
    Ok(written)
}
