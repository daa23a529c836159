//! Note hierarchy (DAG) manager.
//!
//! # Responsibility
//! - Place, clone, move, remove and sort branches while keeping the active
//!   branch graph acyclic and rooted at `root`.
//! - Offer read walks (children, parents, ancestors, paths, orphans).
//!
//! # Invariants
//! - At most one active branch per `(note_id, parent_note_id)`.
//! - No active branch may make a note its own ancestor.
//! - The `root` note's own placement can never be moved or removed.

pub mod ops;
pub mod query;

use crate::error::{ErrorKind, RepoError};
use crate::model::{Branch, EntityTable, NewNote, Note};
use crate::repo::Repository;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use ops::{
    create_note, move_branch, move_branch_after, place_note, place_note_after, protect_subtree,
    remove_branch, rename_note, set_branch_prefix, set_expanded, soft_delete_note, sort_children,
    sort_children_by,
};
pub use query::{
    ancestor_ids, child_branches, child_entries, children, is_ancestor_or_self, note_branches,
    note_path, orphaned_notes, parent_note_ids, would_create_cycle,
};

/// Errors from hierarchy operations.
#[derive(Debug)]
pub enum HierarchyError {
    /// Placement would make `note_id` its own ancestor.
    CyclicHierarchy {
        note_id: String,
        parent_note_id: String,
    },
    /// Target note does not exist or is deleted.
    NoteNotFound(String),
    /// Parent note does not exist or is deleted.
    ParentNotFound(String),
    /// Branch does not exist or is deleted.
    BranchNotFound(String),
    /// Operation would alter the `root` note's placement.
    RootImmutable,
    /// Repository-level failure.
    Repo(RepoError),
}

impl HierarchyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CyclicHierarchy { .. } => ErrorKind::CyclicHierarchy,
            Self::NoteNotFound(_) | Self::ParentNotFound(_) | Self::BranchNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::RootImmutable => ErrorKind::Validation,
            Self::Repo(err) => err.kind(),
        }
    }
}

impl Display for HierarchyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CyclicHierarchy {
                note_id,
                parent_note_id,
            } => write!(
                f,
                "placing note {note_id} under {parent_note_id} would create a cycle"
            ),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent note not found: {id}"),
            Self::BranchNotFound(id) => write!(f, "branch not found: {id}"),
            Self::RootImmutable => write!(f, "the root note placement cannot be changed"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HierarchyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for HierarchyError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                table: EntityTable::Notes,
                id,
            } => Self::NoteNotFound(id),
            RepoError::NotFound {
                table: EntityTable::Branches,
                id,
            } => Self::BranchNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for HierarchyError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Hierarchy facade running each operation in its own transaction.
pub struct NoteTree<'r> {
    repo: &'r Repository,
}

impl<'r> NoteTree<'r> {
    pub fn new(repo: &'r Repository) -> Self {
        Self { repo }
    }

    pub fn create_note(
        &self,
        parent_note_id: &str,
        request: NewNote,
    ) -> Result<(Note, Branch), HierarchyError> {
        self.repo.write(|tx| ops::create_note(tx, parent_note_id, request))
    }

    pub fn place_note(
        &self,
        note_id: &str,
        parent_note_id: &str,
    ) -> Result<Branch, HierarchyError> {
        self.repo.write(|tx| ops::place_note(tx, note_id, parent_note_id))
    }

    pub fn place_note_after(
        &self,
        note_id: &str,
        after_branch_id: &str,
    ) -> Result<Branch, HierarchyError> {
        self.repo.write(|tx| ops::place_note_after(tx, note_id, after_branch_id))
    }

    pub fn move_branch(
        &self,
        branch_id: &str,
        new_parent_note_id: &str,
    ) -> Result<Branch, HierarchyError> {
        self.repo.write(|tx| ops::move_branch(tx, branch_id, new_parent_note_id))
    }

    pub fn move_branch_after(
        &self,
        branch_id: &str,
        after_branch_id: &str,
    ) -> Result<Branch, HierarchyError> {
        self.repo.write(|tx| ops::move_branch_after(tx, branch_id, after_branch_id))
    }

    pub fn remove_branch(&self, branch_id: &str) -> Result<Branch, HierarchyError> {
        self.repo.write(|tx| ops::remove_branch(tx, branch_id))
    }

    pub fn sort_children(&self, parent_note_id: &str) -> Result<usize, HierarchyError> {
        self.repo.write(|tx| ops::sort_children(tx, parent_note_id))
    }

    pub fn set_branch_prefix(
        &self,
        branch_id: &str,
        prefix: Option<&str>,
    ) -> Result<Branch, HierarchyError> {
        self.repo.write(|tx| ops::set_branch_prefix(tx, branch_id, prefix))
    }

    pub fn rename_note(&self, note_id: &str, title: &str) -> Result<Note, HierarchyError> {
        self.repo.write(|tx| ops::rename_note(tx, note_id, title))
    }

    pub fn protect_subtree(
        &self,
        note_id: &str,
        is_protected: bool,
    ) -> Result<usize, HierarchyError> {
        self.repo.write(|tx| ops::protect_subtree(tx, note_id, is_protected))
    }

    pub fn children(&self, parent_note_id: &str) -> Result<Vec<Note>, HierarchyError> {
        self.repo.read(|conn| Ok(query::children(conn, parent_note_id)?))
    }

    pub fn child_branches(&self, parent_note_id: &str) -> Result<Vec<Branch>, HierarchyError> {
        self.repo.read(|conn| Ok(query::child_branches(conn, parent_note_id)?))
    }

    pub fn note_branches(&self, note_id: &str) -> Result<Vec<Branch>, HierarchyError> {
        self.repo.read(|conn| Ok(query::note_branches(conn, note_id)?))
    }

    pub fn ancestor_ids(&self, note_id: &str) -> Result<Vec<String>, HierarchyError> {
        self.repo.read(|conn| Ok(query::ancestor_ids(conn, note_id)?))
    }

    pub fn note_path(&self, note_id: &str) -> Result<Option<Vec<String>>, HierarchyError> {
        self.repo.read(|conn| Ok(query::note_path(conn, note_id)?))
    }

    pub fn orphaned_notes(&self) -> Result<Vec<Note>, HierarchyError> {
        self.repo.read(|conn| Ok(query::orphaned_notes(conn)?))
    }
}
