//! Append-only sync ledger over the `sync_log` table.
//!
//! # Invariants
//! - `sync_id` comes from SQLite AUTOINCREMENT inside the writer's transaction,
//!   so ids are never reused and follow commit order.
//! - Rows are never updated or deleted.

use crate::error::RepoResult;
use crate::model::SyncEntry;
use rusqlite::{params, Connection, Row};

const SYNC_SELECT_SQL: &str = "SELECT
    sync_id,
    entity_name,
    entity_id,
    source_id,
    utc_date_changed
FROM sync_log";

/// Appends one ledger row and returns its `sync_id`.
///
/// Must run inside the transaction that performed the entity write.
pub fn append(
    conn: &Connection,
    entity_name: &str,
    entity_id: &str,
    source_id: &str,
    now_ms: i64,
) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO sync_log (entity_name, entity_id, source_id, utc_date_changed)
         VALUES (?1, ?2, ?3, ?4);",
        params![entity_name, entity_id, source_id, now_ms],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Returns every entry with `sync_id > after`, ascending.
pub fn read_since(conn: &Connection, after: i64) -> RepoResult<Vec<SyncEntry>> {
    collect(
        conn,
        &format!("{SYNC_SELECT_SQL} WHERE sync_id > ?1 ORDER BY sync_id ASC;"),
        params![after],
    )
}

/// Batched variant of [`read_since`] for transports that page through the log.
pub fn read_since_limited(conn: &Connection, after: i64, limit: u32) -> RepoResult<Vec<SyncEntry>> {
    collect(
        conn,
        &format!("{SYNC_SELECT_SQL} WHERE sync_id > ?1 ORDER BY sync_id ASC LIMIT ?2;"),
        params![after, i64::from(limit)],
    )
}

/// Highest allocated `sync_id`, or 0 for an empty ledger.
pub fn last_sync_id(conn: &Connection) -> RepoResult<i64> {
    let value = conn.query_row("SELECT COALESCE(MAX(sync_id), 0) FROM sync_log;", [], |row| {
        row.get(0)
    })?;
    Ok(value)
}

/// All entries recorded for one entity, ascending.
pub fn entries_for(
    conn: &Connection,
    entity_name: &str,
    entity_id: &str,
) -> RepoResult<Vec<SyncEntry>> {
    collect(
        conn,
        &format!(
            "{SYNC_SELECT_SQL} WHERE entity_name = ?1 AND entity_id = ?2 ORDER BY sync_id ASC;"
        ),
        params![entity_name, entity_id],
    )
}

fn collect(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> RepoResult<Vec<SyncEntry>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        entries.push(parse_sync_row(row)?);
    }
    Ok(entries)
}

fn parse_sync_row(row: &Row<'_>) -> RepoResult<SyncEntry> {
    Ok(SyncEntry {
        sync_id: row.get("sync_id")?,
        entity_name: row.get("entity_name")?,
        entity_id: row.get("entity_id")?,
        source_id: row.get("source_id")?,
        utc_date_changed: row.get("utc_date_changed")?,
    })
}
