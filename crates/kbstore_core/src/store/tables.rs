//! `Entity` implementations: column lists, row parsing and upsert SQL per table.

use super::Entity;
use crate::error::{RepoError, RepoResult};
use crate::model::{
    Attribute, AttributeType, Branch, EntityRecord, EntityTable, Note, NoteType, OptionEntry,
};
use rusqlite::{params, Connection, Row};

impl Entity for Note {
    const TABLE: EntityTable = EntityTable::Notes;
    const SELECT_SQL: &'static str = "SELECT
        n.note_id AS note_id,
        n.title AS title,
        n.type AS type,
        n.mime AS mime,
        n.is_protected AS is_protected,
        n.is_deleted AS is_deleted,
        n.date_created AS date_created,
        n.date_modified AS date_modified
    FROM notes n";

    fn primary_key(&self) -> &str {
        &self.note_id
    }

    fn validate(&self) -> RepoResult<()> {
        Note::validate(self).map_err(Into::into)
    }

    fn before_saving(&mut self, now_ms: i64) {
        Note::before_saving(self, now_ms);
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let type_text: String = row.get("type")?;
        let note_type = NoteType::parse(&type_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid note type `{type_text}` in notes.type"))
        })?;

        Ok(Self {
            note_id: row.get("note_id")?,
            title: row.get("title")?,
            note_type,
            mime: row.get("mime")?,
            is_protected: parse_flag(row, "is_protected", "notes")?,
            is_deleted: parse_flag(row, "is_deleted", "notes")?,
            date_created: row.get("date_created")?,
            date_modified: row.get("date_modified")?,
        })
    }

    fn upsert(&self, conn: &Connection) -> RepoResult<()> {
        conn.execute(
            "INSERT INTO notes (
                note_id,
                title,
                type,
                mime,
                is_protected,
                is_deleted,
                date_created,
                date_modified
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(note_id) DO UPDATE SET
                title = excluded.title,
                type = excluded.type,
                mime = excluded.mime,
                is_protected = excluded.is_protected,
                is_deleted = excluded.is_deleted,
                date_created = excluded.date_created,
                date_modified = excluded.date_modified;",
            params![
                self.note_id,
                self.title,
                self.note_type.as_str(),
                self.mime,
                bool_to_int(self.is_protected),
                bool_to_int(self.is_deleted),
                self.date_created,
                self.date_modified,
            ],
        )?;
        Ok(())
    }

    fn into_record(self) -> EntityRecord {
        EntityRecord::Note(self)
    }
}

impl Entity for Branch {
    const TABLE: EntityTable = EntityTable::Branches;
    const SELECT_SQL: &'static str = "SELECT
        b.branch_id AS branch_id,
        b.note_id AS note_id,
        b.parent_note_id AS parent_note_id,
        b.note_position AS note_position,
        b.prefix AS prefix,
        b.is_expanded AS is_expanded,
        b.is_deleted AS is_deleted,
        b.date_modified AS date_modified
    FROM branches b";

    fn primary_key(&self) -> &str {
        &self.branch_id
    }

    fn validate(&self) -> RepoResult<()> {
        Branch::validate(self).map_err(Into::into)
    }

    fn before_saving(&mut self, now_ms: i64) {
        Branch::before_saving(self, now_ms);
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            branch_id: row.get("branch_id")?,
            note_id: row.get("note_id")?,
            parent_note_id: row.get("parent_note_id")?,
            note_position: row.get("note_position")?,
            prefix: row.get("prefix")?,
            is_expanded: parse_flag(row, "is_expanded", "branches")?,
            is_deleted: parse_flag(row, "is_deleted", "branches")?,
            date_modified: row.get("date_modified")?,
        })
    }

    fn upsert(&self, conn: &Connection) -> RepoResult<()> {
        conn.execute(
            "INSERT INTO branches (
                branch_id,
                note_id,
                parent_note_id,
                note_position,
                prefix,
                is_expanded,
                is_deleted,
                date_modified
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(branch_id) DO UPDATE SET
                note_id = excluded.note_id,
                parent_note_id = excluded.parent_note_id,
                note_position = excluded.note_position,
                prefix = excluded.prefix,
                is_expanded = excluded.is_expanded,
                is_deleted = excluded.is_deleted,
                date_modified = excluded.date_modified;",
            params![
                self.branch_id,
                self.note_id,
                self.parent_note_id,
                self.note_position,
                self.prefix,
                bool_to_int(self.is_expanded),
                bool_to_int(self.is_deleted),
                self.date_modified,
            ],
        )?;
        Ok(())
    }

    fn into_record(self) -> EntityRecord {
        EntityRecord::Branch(self)
    }
}

impl Entity for Attribute {
    const TABLE: EntityTable = EntityTable::Attributes;
    const SELECT_SQL: &'static str = "SELECT
        a.attribute_id AS attribute_id,
        a.note_id AS note_id,
        a.type AS type,
        a.name AS name,
        a.value AS value,
        a.position AS position,
        a.is_inheritable AS is_inheritable,
        a.is_deleted AS is_deleted,
        a.date_created AS date_created,
        a.date_modified AS date_modified
    FROM attributes a";

    fn primary_key(&self) -> &str {
        &self.attribute_id
    }

    fn validate(&self) -> RepoResult<()> {
        Attribute::validate(self).map_err(Into::into)
    }

    fn before_saving(&mut self, now_ms: i64) {
        Attribute::before_saving(self, now_ms);
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let type_text: String = row.get("type")?;
        let attribute_type = AttributeType::parse(&type_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid attribute type `{type_text}` in attributes.type"
            ))
        })?;

        Ok(Self {
            attribute_id: row.get("attribute_id")?,
            note_id: row.get("note_id")?,
            attribute_type,
            name: row.get("name")?,
            value: row.get("value")?,
            position: row.get("position")?,
            is_inheritable: parse_flag(row, "is_inheritable", "attributes")?,
            is_deleted: parse_flag(row, "is_deleted", "attributes")?,
            date_created: row.get("date_created")?,
            date_modified: row.get("date_modified")?,
        })
    }

    fn upsert(&self, conn: &Connection) -> RepoResult<()> {
        conn.execute(
            "INSERT INTO attributes (
                attribute_id,
                note_id,
                type,
                name,
                value,
                position,
                is_inheritable,
                is_deleted,
                date_created,
                date_modified
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(attribute_id) DO UPDATE SET
                note_id = excluded.note_id,
                type = excluded.type,
                name = excluded.name,
                value = excluded.value,
                position = excluded.position,
                is_inheritable = excluded.is_inheritable,
                is_deleted = excluded.is_deleted,
                date_created = excluded.date_created,
                date_modified = excluded.date_modified;",
            params![
                self.attribute_id,
                self.note_id,
                self.attribute_type.as_str(),
                self.name,
                self.value,
                self.position,
                bool_to_int(self.is_inheritable),
                bool_to_int(self.is_deleted),
                self.date_created,
                self.date_modified,
            ],
        )?;
        Ok(())
    }

    fn into_record(self) -> EntityRecord {
        EntityRecord::Attribute(self)
    }
}

impl Entity for OptionEntry {
    const TABLE: EntityTable = EntityTable::Options;
    const SELECT_SQL: &'static str = "SELECT
        o.name AS name,
        o.value AS value,
        o.is_synced AS is_synced,
        o.date_modified AS date_modified
    FROM options o";

    fn primary_key(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> RepoResult<()> {
        OptionEntry::validate(self).map_err(Into::into)
    }

    fn before_saving(&mut self, now_ms: i64) {
        self.date_modified = now_ms;
    }

    fn emits_sync(&self) -> bool {
        self.is_synced
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            name: row.get("name")?,
            value: row.get("value")?,
            is_synced: parse_flag(row, "is_synced", "options")?,
            date_modified: row.get("date_modified")?,
        })
    }

    fn upsert(&self, conn: &Connection) -> RepoResult<()> {
        conn.execute(
            "INSERT INTO options (name, value, is_synced, date_modified)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                is_synced = excluded.is_synced,
                date_modified = excluded.date_modified;",
            params![
                self.name,
                self.value,
                bool_to_int(self.is_synced),
                self.date_modified,
            ],
        )?;
        Ok(())
    }

    fn into_record(self) -> EntityRecord {
        EntityRecord::Option(self)
    }
}

fn parse_flag(row: &Row<'_>, column: &'static str, table: &'static str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` in {table}.{column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
