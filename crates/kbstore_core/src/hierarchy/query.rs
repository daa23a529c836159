//! Read-side walks over the branch DAG.
//!
//! # Invariants
//! - Only active branches (`is_deleted=0`) form edges.
//! - Child listing is deterministic: `note_position ASC, note_id ASC`.
//! - Ancestor walks are bounded by the total note count, so corrupted data
//!   cannot make them loop.

use crate::error::RepoResult;
use crate::model::{Branch, EntityTable, Note, NONE_NOTE_ID, ROOT_NOTE_ID};
use crate::store;
use rusqlite::Connection;
use std::collections::{HashSet, VecDeque};

/// Active branches under `parent_note_id` whose notes are not deleted.
pub fn child_branches(conn: &Connection, parent_note_id: &str) -> RepoResult<Vec<Branch>> {
    store::query(
        conn,
        "b.parent_note_id = ?1
           AND b.is_deleted = 0
           AND EXISTS (
             SELECT 1 FROM notes n WHERE n.note_id = b.note_id AND n.is_deleted = 0
           )
         ORDER BY b.note_position ASC, b.note_id ASC",
        [parent_note_id],
    )
}

/// Active children paired with their placing branch, in sibling order.
pub fn child_entries(conn: &Connection, parent_note_id: &str) -> RepoResult<Vec<(Branch, Note)>> {
    let branches = child_branches(conn, parent_note_id)?;
    let mut entries = Vec::with_capacity(branches.len());
    for branch in branches {
        let note: Note = store::get_required(conn, &branch.note_id)?;
        entries.push((branch, note));
    }
    Ok(entries)
}

pub fn children(conn: &Connection, parent_note_id: &str) -> RepoResult<Vec<Note>> {
    Ok(child_entries(conn, parent_note_id)?
        .into_iter()
        .map(|(_, note)| note)
        .collect())
}

/// Active branches placing `note_id` anywhere.
pub fn note_branches(conn: &Connection, note_id: &str) -> RepoResult<Vec<Branch>> {
    store::query(
        conn,
        "b.note_id = ?1 AND b.is_deleted = 0 ORDER BY b.parent_note_id ASC",
        [note_id],
    )
}

/// Ids of every parent holding an active branch to `note_id`.
pub fn parent_note_ids(conn: &Connection, note_id: &str) -> RepoResult<Vec<String>> {
    Ok(note_branches(conn, note_id)?
        .into_iter()
        .map(|branch| branch.parent_note_id)
        .filter(|parent| parent != NONE_NOTE_ID)
        .collect())
}

/// All notes reachable upwards from `note_id`, excluding itself.
///
/// Breadth-first, so nearer ancestors come first.
pub fn ancestor_ids(conn: &Connection, note_id: &str) -> RepoResult<Vec<String>> {
    let budget = walk_budget(conn)?;
    let mut visited = HashSet::new();
    let mut ordered = Vec::new();
    let mut queue = VecDeque::from([note_id.to_string()]);
    let mut steps = 0usize;

    while let Some(current) = queue.pop_front() {
        steps += 1;
        if steps > budget {
            break;
        }
        for parent in parent_note_ids(conn, &current)? {
            if parent == note_id || !visited.insert(parent.clone()) {
                continue;
            }
            ordered.push(parent.clone());
            queue.push_back(parent);
        }
    }
    Ok(ordered)
}

/// Whether `ancestor_id` is `note_id` itself or lies above it.
pub fn is_ancestor_or_self(
    conn: &Connection,
    ancestor_id: &str,
    note_id: &str,
) -> RepoResult<bool> {
    if ancestor_id == note_id {
        return Ok(true);
    }
    Ok(ancestor_ids(conn, note_id)?
        .iter()
        .any(|candidate| candidate == ancestor_id))
}

/// Whether placing `note_id` under `parent_note_id` would close a cycle.
pub fn would_create_cycle(
    conn: &Connection,
    note_id: &str,
    parent_note_id: &str,
) -> RepoResult<bool> {
    is_ancestor_or_self(conn, note_id, parent_note_id)
}

/// One root-first path of note ids ending at `note_id`, following the
/// lowest-positioned parent at each step. `None` if `root` is unreachable.
pub fn note_path(conn: &Connection, note_id: &str) -> RepoResult<Option<Vec<String>>> {
    let budget = walk_budget(conn)?;
    let mut path = vec![note_id.to_string()];
    let mut seen = HashSet::from([note_id.to_string()]);
    let mut current = note_id.to_string();

    while current != ROOT_NOTE_ID {
        if path.len() > budget {
            return Ok(None);
        }
        let mut branches = note_branches(conn, &current)?;
        branches.sort_by(|left, right| {
            left.note_position
                .cmp(&right.note_position)
                .then_with(|| left.parent_note_id.cmp(&right.parent_note_id))
        });
        let next = branches
            .into_iter()
            .map(|branch| branch.parent_note_id)
            .find(|parent| parent != NONE_NOTE_ID && !seen.contains(parent));
        match next {
            Some(parent) => {
                seen.insert(parent.clone());
                path.push(parent.clone());
                current = parent;
            }
            None => return Ok(None),
        }
    }

    path.reverse();
    Ok(Some(path))
}

/// Notes that are not deleted but have no active branch. Report only.
pub fn orphaned_notes(conn: &Connection) -> RepoResult<Vec<Note>> {
    store::query(
        conn,
        "n.is_deleted = 0
           AND NOT EXISTS (
             SELECT 1 FROM branches b WHERE b.note_id = n.note_id AND b.is_deleted = 0
           )
         ORDER BY n.note_id ASC",
        [],
    )
}

/// Next free sibling position. Must be read inside the inserting transaction.
pub fn next_note_position(conn: &Connection, parent_note_id: &str) -> RepoResult<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(note_position), -1) + 1
         FROM branches
         WHERE parent_note_id = ?1
           AND is_deleted = 0;",
        [parent_note_id],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn walk_budget(conn: &Connection) -> RepoResult<usize> {
    let notes = store::count_rows(conn, EntityTable::Notes)?;
    Ok(usize::try_from(notes).unwrap_or(0) + 1)
}
