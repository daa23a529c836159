//! Shared error taxonomy for the store.
//!
//! # Responsibility
//! - Define `RepoError`, the error every entity-store and repository call returns.
//! - Define `ErrorKind`, the coarse classification all layer errors map to.
//!
//! # Invariants
//! - Every error aborts the enclosing transaction; nothing here is retried.

use crate::db::DbError;
use crate::model::{EntityTable, EntityValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Distinguishable error kinds exposed to callers of any layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input to a create/update call. No mutation occurred.
    Validation,
    /// A placement or move would make a note its own ancestor.
    CyclicHierarchy,
    /// A required entity could not be found.
    NotFound,
    /// Underlying durability failure; the transaction was rolled back.
    Storage,
    /// Unrecognized enumerated configuration value.
    Configuration,
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity store and repository error.
#[derive(Debug)]
pub enum RepoError {
    /// SQLite/bootstrap failure.
    Db(DbError),
    /// Entity failed validation before any write.
    Validation(EntityValidationError),
    /// Lookup by primary key yielded nothing where a value was required.
    NotFound { table: EntityTable, id: String },
    /// Persisted data cannot be converted into a valid entity.
    InvalidData(String),
    /// A writer panicked while holding the connection lock.
    LockPoisoned,
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Db(_)
            | Self::InvalidData(_)
            | Self::LockPoisoned
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn not_found(table: EntityTable, id: impl Into<String>) -> Self {
        Self::NotFound {
            table,
            id: id.into(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { table, id } => write!(f, "{} entity not found: {id}", table.name()),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::LockPoisoned => write!(f, "store connection lock is poisoned"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<EntityValidationError> for RepoError {
    fn from(value: EntityValidationError) -> Self {
        Self::Validation(value)
    }
}
