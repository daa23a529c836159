use kbstore_core::db::migrations::latest_version;
use kbstore_core::db::{open_db, open_db_in_memory, DbError};
use kbstore_core::{CoreConfig, Repository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in ["notes", "branches", "attributes", "options", "sync_log"] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn reopening_file_store_keeps_schema_and_source_id() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig {
        db_path: Some(dir.path().join("kb.db")),
        ..CoreConfig::default()
    };

    let first = Repository::open(&config).unwrap();
    let source_id = first.source_id().to_string();
    let ledger_len = first.last_sync_id().unwrap();
    drop(first);

    let second = Repository::open(&config).unwrap();
    assert_eq!(second.source_id(), source_id);
    // Root bootstrap is not repeated on an initialized store.
    assert_eq!(second.last_sync_id().unwrap(), ledger_len);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn sync_log_ids_are_never_reused() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO sync_log (entity_name, entity_id, source_id, utc_date_changed)
         VALUES ('notes', 'a', 'src', 1), ('notes', 'b', 'src', 2);
         DELETE FROM sync_log WHERE sync_id = 2;
         INSERT INTO sync_log (entity_name, entity_id, source_id, utc_date_changed)
         VALUES ('notes', 'c', 'src', 3);",
    )
    .unwrap();

    let max: i64 = conn
        .query_row("SELECT MAX(sync_id) FROM sync_log;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(max, 3);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
