//! Transactional repository: the only mutation gateway of the store.
//!
//! # Responsibility
//! - Own the SQLite connection behind a single writer lock.
//! - Hand out explicit transaction scopes (`WriteTx`) in which every entity
//!   write and its ledger entry land together or not at all.
//!
//! # Invariants
//! - A committed entity change always has a ledger entry, and vice versa.
//! - Non-synced options are written without ledger entries.
//! - `write` must not be re-entered from inside its own closure.

use crate::config::CoreConfig;
use crate::db::migrations::latest_version;
use crate::db::{open_db, open_db_in_memory};
use crate::error::{RepoError, RepoResult};
use crate::model::{
    new_entity_id, now_epoch_ms, Attribute, Branch, EntityRecord, EntityTable, Note, NoteType,
    OptionEntry, SyncEntry, NONE_NOTE_ID, ROOT_NOTE_ID,
};
use crate::store::{self, Entity};
use crate::sync::{self, ledger, ChangedEntity};
use log::{info, warn};
use rusqlite::{Connection, Params, Transaction, TransactionBehavior};
use std::cell::Cell;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// Local option holding this replica's source id. Never synced.
pub const LOCAL_SOURCE_ID_OPTION: &str = "localSourceId";

const REQUIRED_TABLES: [&str; 5] = ["notes", "branches", "attributes", "options", "sync_log"];

/// Shared, thread-safe handle to one store.
pub struct Repository {
    conn: Mutex<Connection>,
    source_id: String,
}

impl Repository {
    /// Wraps a migrated connection.
    ///
    /// Resolves the replica source id (explicit value, else the local option,
    /// else a freshly generated one) and makes sure the `root` note exists.
    pub fn new(mut conn: Connection, source_id: Option<&str>) -> RepoResult<Self> {
        ensure_repository_ready(&conn)?;
        let source_id = resolve_source_id(&mut conn, source_id)?;
        let repo = Self {
            conn: Mutex::new(conn),
            source_id,
        };
        repo.write(ensure_root)?;
        Ok(repo)
    }

    /// Opens the store described by `config`.
    pub fn open(config: &CoreConfig) -> RepoResult<Self> {
        let conn = match &config.db_path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        Self::new(conn, config.source_id.as_deref())
    }

    pub fn in_memory() -> RepoResult<Self> {
        Self::new(open_db_in_memory()?, None)
    }

    /// Id of the replica producing this repository's changes.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Runs `op` in one IMMEDIATE transaction.
    ///
    /// Commits when `op` returns `Ok`; rolls back on `Err` or panic.
    pub fn write<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(&WriteTx<'_>) -> Result<T, E>,
        E: From<RepoError>,
    {
        let started_at = Instant::now();
        let mut conn = self.lock()?;
        let tx = Transaction::new(&mut conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        let scope = WriteTx {
            tx,
            source_id: &self.source_id,
            now_ms: now_epoch_ms(),
            ledger_entries: Cell::new(0),
        };

        match op(&scope) {
            Ok(value) => {
                let ledger_entries = scope.ledger_entries.get();
                scope.tx.commit().map_err(RepoError::from)?;
                info!(
                    "event=repo_commit module=repo status=ok ledger_entries={} duration_ms={}",
                    ledger_entries,
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                drop(scope);
                warn!(
                    "event=repo_rollback module=repo status=error duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    /// Runs `op` against the last committed state.
    pub fn read<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<RepoError>,
    {
        let conn = self.lock()?;
        op(&conn)
    }

    pub fn get_entity<T: Entity, P: Params>(
        &self,
        predicate: &str,
        params: P,
    ) -> RepoResult<Option<T>> {
        self.read(|conn| store::query_one(conn, predicate, params))
    }

    pub fn get_entities<T: Entity, P: Params>(
        &self,
        predicate: &str,
        params: P,
    ) -> RepoResult<Vec<T>> {
        self.read(|conn| store::query(conn, predicate, params))
    }

    pub fn get_note(&self, note_id: &str) -> RepoResult<Option<Note>> {
        self.read(|conn| store::get(conn, note_id))
    }

    pub fn get_branch(&self, branch_id: &str) -> RepoResult<Option<Branch>> {
        self.read(|conn| store::get(conn, branch_id))
    }

    pub fn get_attribute(&self, attribute_id: &str) -> RepoResult<Option<Attribute>> {
        self.read(|conn| store::get(conn, attribute_id))
    }

    pub fn get_option(&self, name: &str) -> RepoResult<Option<OptionEntry>> {
        self.read(|conn| store::get(conn, name))
    }

    pub fn get_option_value(&self, name: &str) -> RepoResult<Option<String>> {
        Ok(self.get_option(name)?.map(|option| option.value))
    }

    /// Creates or overwrites one option.
    pub fn set_option(
        &self,
        name: &str,
        value: &str,
        is_synced: bool,
    ) -> RepoResult<OptionEntry> {
        self.write(|tx| tx.create_entity(OptionEntry::new(name, value, is_synced)))
    }

    /// Ledger entries with `sync_id > after`, ascending.
    pub fn read_since(&self, after: i64) -> RepoResult<Vec<SyncEntry>> {
        self.read(|conn| ledger::read_since(conn, after))
    }

    pub fn last_sync_id(&self) -> RepoResult<i64> {
        self.read(ledger::last_sync_id)
    }

    /// Up to `limit` ledger entries after `after`, each with current entity state.
    pub fn changes_since(&self, after: i64, limit: u32) -> RepoResult<Vec<ChangedEntity>> {
        self.read(|conn| sync::changes_since(conn, after, limit))
    }

    /// Re-queues a note with its branches and attributes.
    pub fn force_note_sync(&self, note_id: &str) -> RepoResult<usize> {
        self.write(|tx| sync::force_note_sync(tx, note_id))
    }

    /// Applies a batch of records from replica `source_id` in one transaction.
    pub fn apply_replicated(&self, records: &[EntityRecord], source_id: &str) -> RepoResult<usize> {
        self.write(|tx| {
            for record in records {
                tx.apply_replicated(record, source_id)?;
            }
            Ok(records.len())
        })
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

/// Explicit transaction scope handed to every mutating call.
pub struct WriteTx<'c> {
    tx: Transaction<'c>,
    source_id: &'c str,
    now_ms: i64,
    ledger_entries: Cell<usize>,
}

impl WriteTx<'_> {
    /// Connection view of the open transaction, for reads inside the scope.
    pub fn conn(&self) -> &Connection {
        &self.tx
    }

    pub fn source_id(&self) -> &str {
        self.source_id
    }

    /// Timestamp shared by every write of this transaction.
    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }

    /// Persists a new entity and records it in the ledger.
    pub fn create_entity<T: Entity>(&self, mut entity: T) -> RepoResult<T> {
        self.update_entity(&mut entity)?;
        Ok(entity)
    }

    /// Runs the pre-save hook, upserts the row and appends the ledger entry.
    pub fn update_entity<T: Entity>(&self, entity: &mut T) -> RepoResult<()> {
        entity.before_saving(self.now_ms);
        store::put(self.conn(), entity)?;
        if entity.emits_sync() {
            self.append_ledger(T::TABLE, entity.primary_key())?;
        }
        Ok(())
    }

    /// Upserts a record received from another replica, keeping its fields
    /// verbatim and attributing the ledger entry to `source_id`.
    pub fn apply_replicated(&self, record: &EntityRecord, source_id: &str) -> RepoResult<()> {
        store::put_record(self.conn(), record)?;
        let emits_sync = match record {
            EntityRecord::Option(option) => option.is_synced,
            _ => true,
        };
        if emits_sync {
            ledger::append(
                self.conn(),
                record.table().name(),
                record.primary_key(),
                source_id,
                self.now_ms,
            )?;
            self.ledger_entries.set(self.ledger_entries.get() + 1);
        }
        Ok(())
    }

    /// Records a ledger entry without changing the entity.
    pub fn touch(&self, table: EntityTable, entity_id: &str) -> RepoResult<i64> {
        self.append_ledger(table, entity_id)
    }

    pub fn get<T: Entity>(&self, primary_key: &str) -> RepoResult<Option<T>> {
        store::get(self.conn(), primary_key)
    }

    pub fn get_required<T: Entity>(&self, primary_key: &str) -> RepoResult<T> {
        store::get_required(self.conn(), primary_key)
    }

    pub fn get_entity<T: Entity, P: Params>(
        &self,
        predicate: &str,
        params: P,
    ) -> RepoResult<Option<T>> {
        store::query_one(self.conn(), predicate, params)
    }

    pub fn get_entities<T: Entity, P: Params>(
        &self,
        predicate: &str,
        params: P,
    ) -> RepoResult<Vec<T>> {
        store::query(self.conn(), predicate, params)
    }

    fn append_ledger(&self, table: EntityTable, entity_id: &str) -> RepoResult<i64> {
        let sync_id = ledger::append(
            self.conn(),
            table.name(),
            entity_id,
            self.source_id,
            self.now_ms,
        )?;
        self.ledger_entries.set(self.ledger_entries.get() + 1);
        Ok(sync_id)
    }
}

fn ensure_root(tx: &WriteTx<'_>) -> RepoResult<()> {
    if tx.get::<Note>(ROOT_NOTE_ID)?.is_none() {
        tx.create_entity(Note::with_id(ROOT_NOTE_ID, "root", NoteType::Text))?;
    }
    let root_branch_id = crate::model::branch_id_for(NONE_NOTE_ID, ROOT_NOTE_ID);
    if tx.get::<Branch>(&root_branch_id)?.is_none() {
        tx.create_entity(Branch::new(ROOT_NOTE_ID, NONE_NOTE_ID, 0))?;
    }
    Ok(())
}

fn resolve_source_id(conn: &mut Connection, configured: Option<&str>) -> RepoResult<String> {
    if let Some(value) = configured.map(str::trim).filter(|value| !value.is_empty()) {
        return Ok(value.to_string());
    }
    if let Some(option) = store::get::<OptionEntry>(conn, LOCAL_SOURCE_ID_OPTION)? {
        return Ok(option.value);
    }

    let source_id = new_entity_id();
    let mut option = OptionEntry::new(LOCAL_SOURCE_ID_OPTION, source_id.as_str(), false);
    option.date_modified = now_epoch_ms();
    let tx = conn.transaction()?;
    store::put(&tx, &option)?;
    tx.commit()?;
    Ok(source_id)
}

fn ensure_repository_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}
