//! Entity store: typed row access over the four entity tables.
//!
//! # Responsibility
//! - Map each entity to its table through the `Entity` trait.
//! - Provide get / query / upsert primitives that run on any connection or
//!   transaction handed in by the repository.
//!
//! # Invariants
//! - The store holds no transaction state of its own.
//! - Upserts write only persisted columns.
//! - Reads reject malformed persisted rows instead of masking them.

mod tables;

use crate::error::{RepoError, RepoResult};
use crate::model::{EntityRecord, EntityTable};
use rusqlite::{Connection, Params, Row};

/// Capability shared by every persisted record.
pub trait Entity: Sized + Clone {
    const TABLE: EntityTable;
    /// Column projection used by every read, aliased so predicates can
    /// reference the table by its short alias (`n`, `b`, `a`, `o`).
    const SELECT_SQL: &'static str;

    fn primary_key(&self) -> &str;

    fn validate(&self) -> RepoResult<()>;

    /// Pre-save hook; recomputes derived fields before a write.
    fn before_saving(&mut self, _now_ms: i64) {}

    /// Whether a write of this entity must be recorded in the sync ledger.
    fn emits_sync(&self) -> bool {
        true
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self>;

    /// Insert-or-replace keyed by primary key.
    fn upsert(&self, conn: &Connection) -> RepoResult<()>;

    fn into_record(self) -> EntityRecord;
}

/// Loads one entity by primary key, including soft-deleted rows.
pub fn get<T: Entity>(conn: &Connection, primary_key: &str) -> RepoResult<Option<T>> {
    let predicate = format!("{} = ?1", T::TABLE.primary_key_name());
    query_one(conn, &predicate, [primary_key])
}

/// Loads one entity by primary key or fails with `NotFound`.
pub fn get_required<T: Entity>(conn: &Connection, primary_key: &str) -> RepoResult<T> {
    get(conn, primary_key)?.ok_or_else(|| RepoError::not_found(T::TABLE, primary_key))
}

/// Runs `SELECT ... WHERE <predicate>` and parses every row.
///
/// `predicate` may carry trailing `ORDER BY` / `LIMIT` clauses.
pub fn query<T: Entity, P: Params>(
    conn: &Connection,
    predicate: &str,
    params: P,
) -> RepoResult<Vec<T>> {
    let mut stmt = conn.prepare(&format!("{} WHERE {predicate};", T::SELECT_SQL))?;
    let mut rows = stmt.query(params)?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(T::from_row(row)?);
    }
    Ok(items)
}

/// Like [`query`] but returns the first row only.
pub fn query_one<T: Entity, P: Params>(
    conn: &Connection,
    predicate: &str,
    params: P,
) -> RepoResult<Option<T>> {
    let mut stmt = conn.prepare(&format!("{} WHERE {predicate} LIMIT 1;", T::SELECT_SQL))?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => Ok(Some(T::from_row(row)?)),
        None => Ok(None),
    }
}

/// Validates and upserts one entity. No ledger entry is written here.
pub fn put<T: Entity>(conn: &Connection, entity: &T) -> RepoResult<()> {
    entity.validate()?;
    entity.upsert(conn)
}

/// Table-generic lookup used by ledger consumers.
pub fn get_record(
    conn: &Connection,
    table: EntityTable,
    primary_key: &str,
) -> RepoResult<Option<EntityRecord>> {
    let record = match table {
        EntityTable::Notes => {
            get::<crate::model::Note>(conn, primary_key)?.map(Entity::into_record)
        }
        EntityTable::Branches => {
            get::<crate::model::Branch>(conn, primary_key)?.map(Entity::into_record)
        }
        EntityTable::Attributes => {
            get::<crate::model::Attribute>(conn, primary_key)?.map(Entity::into_record)
        }
        EntityTable::Options => {
            get::<crate::model::OptionEntry>(conn, primary_key)?.map(Entity::into_record)
        }
    };
    Ok(record)
}

/// Table-generic upsert.
pub fn put_record(conn: &Connection, record: &EntityRecord) -> RepoResult<()> {
    match record {
        EntityRecord::Note(note) => put(conn, note),
        EntityRecord::Branch(branch) => put(conn, branch),
        EntityRecord::Attribute(attribute) => put(conn, attribute),
        EntityRecord::Option(option) => put(conn, option),
    }
}

/// Counts rows of one table, tombstones included.
pub fn count_rows(conn: &Connection, table: EntityTable) -> RepoResult<i64> {
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM {};", table.name()),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
