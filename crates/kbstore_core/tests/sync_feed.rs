use kbstore_core::{
    AttributeIndex, EntityRecord, EntityTable, ErrorKind, NewNote, Note, NoteTree, NoteType,
    Repository, ROOT_NOTE_ID,
};

#[test]
fn changes_resolve_to_current_state() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let cursor = repo.last_sync_id().unwrap();
    let (note, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("v1")).unwrap();
    tree.rename_note(&note.note_id, "v2").unwrap();

    let changes = repo.changes_since(cursor, 100).unwrap();

    let note_changes: Vec<_> = changes
        .iter()
        .filter(|change| change.entry.entity_name == EntityTable::Notes.name())
        .collect();
    assert_eq!(note_changes.len(), 2);
    for change in note_changes {
        match &change.record {
            Some(EntityRecord::Note(current)) => assert_eq!(current.title, "v2"),
            other => panic!("unexpected record: {other:?}"),
        }
    }
}

#[test]
fn changes_are_paged_by_limit() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    for index in 0..5 {
        tree.create_note(ROOT_NOTE_ID, NewNote::text(format!("n{index}")))
            .unwrap();
    }

    let mut cursor = 0;
    let mut seen = 0;
    loop {
        let page = repo.changes_since(cursor, 3).unwrap();
        if page.is_empty() {
            break;
        }
        assert!(page.len() <= 3);
        cursor = page.last().unwrap().entry.sync_id;
        seen += page.len();
    }
    assert_eq!(seen as i64, repo.last_sync_id().unwrap());
}

#[test]
fn force_sync_touches_note_branches_and_attributes() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let (a, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("A")).unwrap();
    let (note, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("shared")).unwrap();
    tree.place_note(&note.note_id, &a.note_id).unwrap();
    AttributeIndex::new(&repo)
        .create_label(&note.note_id, "pin", None)
        .unwrap();
    let cursor = repo.last_sync_id().unwrap();
    let before = repo.get_note(&note.note_id).unwrap().unwrap();

    let written = repo.force_note_sync(&note.note_id).unwrap();

    assert_eq!(written, 4);
    let entries = repo.read_since(cursor).unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].entity_name, "notes");
    assert_eq!(repo.get_note(&note.note_id).unwrap().unwrap(), before);
}

#[test]
fn force_sync_of_missing_note_is_not_found() {
    let repo = Repository::in_memory().unwrap();
    let err = repo.force_note_sync("nope").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn replicated_records_keep_fields_and_remote_source() {
    let repo = Repository::in_memory().unwrap();
    let mut remote = Note::with_id("remote1", "From elsewhere", NoteType::Code);
    remote.date_created = 1_000;
    remote.date_modified = 2_000;
    let cursor = repo.last_sync_id().unwrap();

    let applied = repo
        .apply_replicated(&[EntityRecord::Note(remote.clone())], "replica-b")
        .unwrap();

    assert_eq!(applied, 1);
    assert_eq!(repo.get_note("remote1").unwrap().unwrap(), remote);
    let entries = repo.read_since(cursor).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source_id, "replica-b");
}

#[test]
fn local_options_stay_out_of_the_ledger() {
    let repo = Repository::in_memory().unwrap();
    let cursor = repo.last_sync_id().unwrap();

    repo.set_option("theme", "dark", false).unwrap();
    assert_eq!(repo.last_sync_id().unwrap(), cursor);

    repo.set_option("locale", "zh_CN", true).unwrap();
    let entries = repo.read_since(cursor).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entity_name, "options");
    assert_eq!(entries[0].entity_id, "locale");
    assert_eq!(repo.get_option_value("theme").unwrap().as_deref(), Some("dark"));
}

#[test]
fn ledger_entries_serialize_for_transports() {
    let repo = Repository::in_memory().unwrap();
    let entry = repo.read_since(0).unwrap().remove(0);

    let json = serde_json::to_value(&entry).unwrap();

    assert_eq!(json["entity_name"], "notes");
    assert_eq!(json["entity_id"], ROOT_NOTE_ID);
    assert_eq!(json["source_id"], repo.source_id());
}
