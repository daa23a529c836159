//! Transactional knowledge-base store.
//!
//! Notes live in a DAG of branches, carry labels and relations, and every
//! committed change is recorded in an append-only sync ledger. All writes go
//! through [`Repository::write`].

pub mod attributes;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;
pub mod sync;

pub use attributes::AttributeIndex;
pub use calendar::{CalendarError, DateNotes, WeekStart};
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use error::{ErrorKind, RepoError, RepoResult};
pub use hierarchy::{HierarchyError, NoteTree};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LogTarget};
pub use model::{
    Attribute, AttributeType, Branch, EntityRecord, EntityTable, NewAttribute, NewNote, Note,
    NoteType, OptionEntry, SyncEntry, NONE_NOTE_ID, ROOT_NOTE_ID,
};
pub use repo::{Repository, WriteTx};
pub use sync::ChangedEntity;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
