//! Structural mutations of the note DAG, run inside a caller's `WriteTx`.
//!
//! # Invariants
//! - Every placement goes through the cycle check against active branches.
//! - Sibling positions are derived inside the same transaction as the insert.
//! - Removal only tombstones branches; notes are never purged here.

use super::query::{child_entries, next_note_position, would_create_cycle};
use super::HierarchyError;
use crate::error::RepoError;
use crate::model::{branch_id_for, Branch, NewNote, Note, NONE_NOTE_ID, ROOT_NOTE_ID};
use crate::repo::WriteTx;
use log::{info, warn};
use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};

/// Creates a note and places it last under `parent_note_id`.
pub fn create_note(
    tx: &WriteTx<'_>,
    parent_note_id: &str,
    request: NewNote,
) -> Result<(Note, Branch), HierarchyError> {
    ensure_parent_active(tx, parent_note_id)?;
    let note = tx.create_entity(request.into_note())?;
    let position = next_note_position(tx.conn(), parent_note_id)?;
    let branch = tx.create_entity(Branch::new(note.note_id.as_str(), parent_note_id, position))?;
    info!(
        "event=hierarchy_create module=hierarchy status=ok note_id={} parent_note_id={} position={}",
        note.note_id, parent_note_id, position
    );
    Ok((note, branch))
}

/// Clones `note_id` under `parent_note_id`, placing it last.
///
/// Idempotent: an existing active placement is returned unchanged.
pub fn place_note(
    tx: &WriteTx<'_>,
    note_id: &str,
    parent_note_id: &str,
) -> Result<Branch, HierarchyError> {
    ensure_note_active(tx, note_id)?;
    ensure_parent_active(tx, parent_note_id)?;
    if let Some(existing) = active_branch_at(tx, note_id, parent_note_id)? {
        return Ok(existing);
    }
    ensure_acyclic(tx, note_id, parent_note_id)?;

    let position = next_note_position(tx.conn(), parent_note_id)?;
    let branch = write_placement(tx, note_id, parent_note_id, position, None)?;
    info!(
        "event=hierarchy_place module=hierarchy status=ok note_id={} parent_note_id={} position={}",
        note_id, parent_note_id, position
    );
    Ok(branch)
}

/// Clones `note_id` into the parent of `after_branch_id`, right after it.
pub fn place_note_after(
    tx: &WriteTx<'_>,
    note_id: &str,
    after_branch_id: &str,
) -> Result<Branch, HierarchyError> {
    ensure_note_active(tx, note_id)?;
    let after = load_active_branch(tx, after_branch_id)?;
    let parent_note_id = after.parent_note_id.clone();
    if parent_note_id == NONE_NOTE_ID {
        return Err(HierarchyError::RootImmutable);
    }
    if let Some(existing) = active_branch_at(tx, note_id, &parent_note_id)? {
        return Ok(existing);
    }
    ensure_acyclic(tx, note_id, &parent_note_id)?;

    let position = after.note_position + 1;
    shift_siblings_from(tx, &parent_note_id, position, None)?;
    let branch = write_placement(tx, note_id, &parent_note_id, position, None)?;
    info!(
        "event=hierarchy_place module=hierarchy status=ok note_id={} parent_note_id={} position={} after={}",
        note_id, parent_note_id, position, after_branch_id
    );
    Ok(branch)
}

/// Moves a placement under `new_parent_note_id`, placing it last.
///
/// The old branch is tombstoned and the new one written in the same
/// transaction. Moving within the same parent returns the branch unchanged.
pub fn move_branch(
    tx: &WriteTx<'_>,
    branch_id: &str,
    new_parent_note_id: &str,
) -> Result<Branch, HierarchyError> {
    let branch = load_movable_branch(tx, branch_id)?;
    if branch.parent_note_id == new_parent_note_id {
        return Ok(branch);
    }
    ensure_parent_active(tx, new_parent_note_id)?;
    ensure_acyclic(tx, &branch.note_id, new_parent_note_id)?;

    let prefix = branch.prefix.clone();
    let note_id = branch.note_id.clone();
    tombstone(tx, branch)?;

    let moved = match active_branch_at(tx, &note_id, new_parent_note_id)? {
        Some(existing) => existing,
        None => {
            let position = next_note_position(tx.conn(), new_parent_note_id)?;
            write_placement(tx, &note_id, new_parent_note_id, position, prefix)?
        }
    };
    info!(
        "event=hierarchy_move module=hierarchy status=ok note_id={} from_branch_id={} to_branch_id={}",
        note_id, branch_id, moved.branch_id
    );
    Ok(moved)
}

/// Moves a placement right after `after_branch_id`, possibly across parents.
pub fn move_branch_after(
    tx: &WriteTx<'_>,
    branch_id: &str,
    after_branch_id: &str,
) -> Result<Branch, HierarchyError> {
    let mut branch = load_movable_branch(tx, branch_id)?;
    if branch_id == after_branch_id {
        return Ok(branch);
    }
    let after = load_active_branch(tx, after_branch_id)?;
    let parent_note_id = after.parent_note_id.clone();
    if parent_note_id == NONE_NOTE_ID {
        return Err(HierarchyError::RootImmutable);
    }
    let position = after.note_position + 1;

    if branch.parent_note_id == parent_note_id {
        shift_siblings_from(tx, &parent_note_id, position, Some(branch_id))?;
        branch.note_position = position;
        tx.update_entity(&mut branch)?;
        info!(
            "event=hierarchy_move module=hierarchy status=ok note_id={} from_branch_id={} to_branch_id={}",
            branch.note_id, branch_id, branch_id
        );
        return Ok(branch);
    }

    ensure_acyclic(tx, &branch.note_id, &parent_note_id)?;
    let note_id = branch.note_id.clone();
    let prefix = branch.prefix.clone();
    tombstone(tx, branch)?;

    let target_id = branch_id_for(&parent_note_id, &note_id);
    shift_siblings_from(tx, &parent_note_id, position, Some(&target_id))?;
    let moved = write_placement(tx, &note_id, &parent_note_id, position, prefix)?;
    info!(
        "event=hierarchy_move module=hierarchy status=ok note_id={} from_branch_id={} to_branch_id={}",
        note_id, branch_id, moved.branch_id
    );
    Ok(moved)
}

/// Tombstones one placement. The note and its other placements are untouched.
pub fn remove_branch(tx: &WriteTx<'_>, branch_id: &str) -> Result<Branch, HierarchyError> {
    let branch = load_movable_branch(tx, branch_id)?;
    let removed = tombstone(tx, branch)?;
    info!(
        "event=hierarchy_remove module=hierarchy status=ok branch_id={} note_id={}",
        removed.branch_id, removed.note_id
    );
    Ok(removed)
}

/// Re-sorts the children of `parent_note_id` by case-folded title.
///
/// Returns the number of branches whose position changed.
pub fn sort_children(tx: &WriteTx<'_>, parent_note_id: &str) -> Result<usize, HierarchyError> {
    sort_children_by(tx, parent_note_id, |left, right| {
        left.title
            .to_lowercase()
            .cmp(&right.title.to_lowercase())
            .then_with(|| left.note_id.cmp(&right.note_id))
    })
}

/// Re-sorts the children of `parent_note_id` with a caller comparator.
pub fn sort_children_by<F>(
    tx: &WriteTx<'_>,
    parent_note_id: &str,
    mut compare: F,
) -> Result<usize, HierarchyError>
where
    F: FnMut(&Note, &Note) -> Ordering,
{
    ensure_parent_active(tx, parent_note_id)?;
    let mut entries = child_entries(tx.conn(), parent_note_id)?;
    entries.sort_by(|(_, left), (_, right)| compare(left, right));

    let mut changed = 0;
    for (index, (mut branch, _)) in entries.into_iter().enumerate() {
        let position = index as i64;
        if branch.note_position == position {
            continue;
        }
        branch.note_position = position;
        tx.update_entity(&mut branch)?;
        changed += 1;
    }
    info!(
        "event=hierarchy_sort module=hierarchy status=ok parent_note_id={} changed={}",
        parent_note_id, changed
    );
    Ok(changed)
}

pub fn set_branch_prefix(
    tx: &WriteTx<'_>,
    branch_id: &str,
    prefix: Option<&str>,
) -> Result<Branch, HierarchyError> {
    let mut branch = load_active_branch(tx, branch_id)?;
    branch.prefix = prefix
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    tx.update_entity(&mut branch)?;
    Ok(branch)
}

pub fn set_expanded(
    tx: &WriteTx<'_>,
    branch_id: &str,
    is_expanded: bool,
) -> Result<Branch, HierarchyError> {
    let mut branch = load_active_branch(tx, branch_id)?;
    if branch.is_expanded != is_expanded {
        branch.is_expanded = is_expanded;
        tx.update_entity(&mut branch)?;
    }
    Ok(branch)
}

pub fn rename_note(tx: &WriteTx<'_>, note_id: &str, title: &str) -> Result<Note, HierarchyError> {
    let mut note = load_active_note(tx, note_id)?;
    note.title = title.to_string();
    tx.update_entity(&mut note)?;
    Ok(note)
}

/// Tombstones the note row itself. Its branches are left as they are.
pub fn soft_delete_note(tx: &WriteTx<'_>, note_id: &str) -> Result<Note, HierarchyError> {
    if note_id == ROOT_NOTE_ID {
        return Err(HierarchyError::RootImmutable);
    }
    let mut note = load_active_note(tx, note_id)?;
    note.is_deleted = true;
    tx.update_entity(&mut note)?;
    Ok(note)
}

/// Sets `is_protected` on `note_id` and every active descendant.
///
/// Returns the number of notes whose flag changed.
pub fn protect_subtree(
    tx: &WriteTx<'_>,
    note_id: &str,
    is_protected: bool,
) -> Result<usize, HierarchyError> {
    load_active_note(tx, note_id)?;
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([note_id.to_string()]);
    let mut changed = 0;

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current.clone()) {
            continue;
        }
        let mut note = load_active_note(tx, &current)?;
        if note.is_protected != is_protected {
            note.is_protected = is_protected;
            tx.update_entity(&mut note)?;
            changed += 1;
        }
        for (branch, _) in child_entries(tx.conn(), &current)? {
            queue.push_back(branch.note_id);
        }
    }
    Ok(changed)
}

fn write_placement(
    tx: &WriteTx<'_>,
    note_id: &str,
    parent_note_id: &str,
    position: i64,
    prefix: Option<String>,
) -> Result<Branch, HierarchyError> {
    let branch_id = branch_id_for(parent_note_id, note_id);
    let mut branch = match tx.get::<Branch>(&branch_id)? {
        Some(existing) if !places_pair(&existing, note_id, parent_note_id) => {
            return Err(foreign_branch(&existing, note_id, parent_note_id));
        }
        Some(mut revived) => {
            revived.is_deleted = false;
            revived
        }
        None => Branch::new(note_id, parent_note_id, position),
    };
    branch.note_position = position;
    branch.prefix = prefix;
    tx.update_entity(&mut branch)?;
    Ok(branch)
}

fn shift_siblings_from(
    tx: &WriteTx<'_>,
    parent_note_id: &str,
    from_position: i64,
    except_branch_id: Option<&str>,
) -> Result<(), HierarchyError> {
    let siblings: Vec<Branch> = tx.get_entities(
        "b.parent_note_id = ?1 AND b.is_deleted = 0 AND b.note_position >= ?2
         ORDER BY b.note_position DESC",
        rusqlite::params![parent_note_id, from_position],
    )?;
    for mut sibling in siblings {
        if Some(sibling.branch_id.as_str()) == except_branch_id {
            continue;
        }
        sibling.note_position += 1;
        tx.update_entity(&mut sibling)?;
    }
    Ok(())
}

fn tombstone(tx: &WriteTx<'_>, mut branch: Branch) -> Result<Branch, HierarchyError> {
    branch.is_deleted = true;
    tx.update_entity(&mut branch)?;
    Ok(branch)
}

fn ensure_acyclic(
    tx: &WriteTx<'_>,
    note_id: &str,
    parent_note_id: &str,
) -> Result<(), HierarchyError> {
    if would_create_cycle(tx.conn(), note_id, parent_note_id)? {
        warn!(
            "event=hierarchy_place module=hierarchy status=rejected reason=cycle note_id={} parent_note_id={}",
            note_id, parent_note_id
        );
        return Err(HierarchyError::CyclicHierarchy {
            note_id: note_id.to_string(),
            parent_note_id: parent_note_id.to_string(),
        });
    }
    Ok(())
}

fn active_branch_at(
    tx: &WriteTx<'_>,
    note_id: &str,
    parent_note_id: &str,
) -> Result<Option<Branch>, HierarchyError> {
    let branch = tx.get::<Branch>(&branch_id_for(parent_note_id, note_id))?;
    match branch {
        Some(existing) if !places_pair(&existing, note_id, parent_note_id) => {
            Err(foreign_branch(&existing, note_id, parent_note_id))
        }
        other => Ok(other.filter(Branch::is_active)),
    }
}

fn places_pair(branch: &Branch, note_id: &str, parent_note_id: &str) -> bool {
    branch.note_id == note_id && branch.parent_note_id == parent_note_id
}

/// A stored row under the derived id belongs to another pair.
fn foreign_branch(existing: &Branch, note_id: &str, parent_note_id: &str) -> HierarchyError {
    warn!(
        "event=hierarchy_place module=hierarchy status=rejected reason=branch_id_collision branch_id={}",
        existing.branch_id
    );
    HierarchyError::Repo(RepoError::InvalidData(format!(
        "branch {} places {} under {}, not {} under {}",
        existing.branch_id, existing.note_id, existing.parent_note_id, note_id, parent_note_id
    )))
}

fn load_active_branch(tx: &WriteTx<'_>, branch_id: &str) -> Result<Branch, HierarchyError> {
    tx.get::<Branch>(branch_id)?
        .filter(Branch::is_active)
        .ok_or_else(|| HierarchyError::BranchNotFound(branch_id.to_string()))
}

fn load_movable_branch(tx: &WriteTx<'_>, branch_id: &str) -> Result<Branch, HierarchyError> {
    let branch = load_active_branch(tx, branch_id)?;
    if branch.note_id == ROOT_NOTE_ID {
        return Err(HierarchyError::RootImmutable);
    }
    Ok(branch)
}

fn load_active_note(tx: &WriteTx<'_>, note_id: &str) -> Result<Note, HierarchyError> {
    tx.get::<Note>(note_id)?
        .filter(Note::is_active)
        .ok_or_else(|| HierarchyError::NoteNotFound(note_id.to_string()))
}

fn ensure_note_active(tx: &WriteTx<'_>, note_id: &str) -> Result<(), HierarchyError> {
    load_active_note(tx, note_id).map(|_| ())
}

fn ensure_parent_active(tx: &WriteTx<'_>, parent_note_id: &str) -> Result<(), HierarchyError> {
    match load_active_note(tx, parent_note_id) {
        Ok(_) => Ok(()),
        Err(HierarchyError::NoteNotFound(id)) => Err(HierarchyError::ParentNotFound(id)),
        Err(other) => Err(other),
    }
}
