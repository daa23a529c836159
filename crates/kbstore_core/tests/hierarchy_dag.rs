use kbstore_core::hierarchy::{self, HierarchyError};
use kbstore_core::{
    EntityRecord, ErrorKind, NewNote, Note, NoteTree, NoteType, RepoError, Repository,
    ROOT_NOTE_ID,
};

fn titles(notes: &[Note]) -> Vec<&str> {
    notes.iter().map(|note| note.title.as_str()).collect()
}

#[test]
fn create_appends_children_in_order() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);

    let (_, first) = tree.create_note(ROOT_NOTE_ID, NewNote::text("Alpha")).unwrap();
    let (_, second) = tree.create_note(ROOT_NOTE_ID, NewNote::text("Beta")).unwrap();

    assert_eq!(first.note_position + 1, second.note_position);
    assert_eq!(titles(&tree.children(ROOT_NOTE_ID).unwrap()), vec!["Alpha", "Beta"]);
}

#[test]
fn cloning_is_idempotent_and_keeps_both_parents() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let (a, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("A")).unwrap();
    let (b, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("B")).unwrap();
    let (c, _) = tree.create_note(&a.note_id, NewNote::text("C")).unwrap();

    let cloned = tree.place_note(&c.note_id, &b.note_id).unwrap();
    let again = tree.place_note(&c.note_id, &b.note_id).unwrap();

    assert_eq!(cloned, again);
    assert_eq!(cloned.branch_id, format!("{}_{}", b.note_id, c.note_id));
    assert_eq!(tree.note_branches(&c.note_id).unwrap().len(), 2);
}

#[test]
fn placement_under_descendant_is_rejected_without_writes() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let (a, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("A")).unwrap();
    let (b, _) = tree.create_note(&a.note_id, NewNote::text("B")).unwrap();
    let (c, _) = tree.create_note(&b.note_id, NewNote::text("C")).unwrap();
    let last_before = repo.last_sync_id().unwrap();

    let err = tree.place_note(&a.note_id, &c.note_id).unwrap_err();

    assert!(matches!(err, HierarchyError::CyclicHierarchy { .. }));
    assert_eq!(err.kind(), ErrorKind::CyclicHierarchy);
    assert_eq!(repo.last_sync_id().unwrap(), last_before);

    let self_err = tree.place_note(&a.note_id, &a.note_id).unwrap_err();
    assert_eq!(self_err.kind(), ErrorKind::CyclicHierarchy);
}

#[test]
fn cycle_check_sees_clones() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let (a, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("A")).unwrap();
    let (b, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("B")).unwrap();
    let (c, _) = tree.create_note(&b.note_id, NewNote::text("C")).unwrap();
    // A now also lives under C.
    tree.place_note(&a.note_id, &c.note_id).unwrap();

    let err = tree.place_note(&b.note_id, &a.note_id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CyclicHierarchy);
}

#[test]
fn move_tombstones_old_branch_and_appends_under_new_parent() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let (a, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("A")).unwrap();
    let (b, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("B")).unwrap();
    tree.create_note(&b.note_id, NewNote::text("Existing")).unwrap();
    let (c, c_branch) = tree.create_note(&a.note_id, NewNote::text("C")).unwrap();

    let moved = tree.move_branch(&c_branch.branch_id, &b.note_id).unwrap();

    assert_eq!(moved.parent_note_id, b.note_id);
    assert_eq!(moved.note_position, 1);
    assert!(repo.get_branch(&c_branch.branch_id).unwrap().unwrap().is_deleted);
    assert!(tree.children(&a.note_id).unwrap().is_empty());
    assert_eq!(titles(&tree.children(&b.note_id).unwrap()), vec!["Existing", "C"]);
    assert_eq!(tree.note_path(&c.note_id).unwrap().unwrap().len(), 3);
}

#[test]
fn move_into_own_subtree_is_rejected() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let (a, a_branch) = tree.create_note(ROOT_NOTE_ID, NewNote::text("A")).unwrap();
    let (b, _) = tree.create_note(&a.note_id, NewNote::text("B")).unwrap();

    let err = tree.move_branch(&a_branch.branch_id, &b.note_id).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CyclicHierarchy);
    assert!(!repo.get_branch(&a_branch.branch_id).unwrap().unwrap().is_deleted);
}

#[test]
fn place_after_shifts_following_siblings() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let (folder, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("Folder")).unwrap();
    let (_, first) = tree.create_note(&folder.note_id, NewNote::text("one")).unwrap();
    tree.create_note(&folder.note_id, NewNote::text("three")).unwrap();
    let (two, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("two")).unwrap();

    tree.place_note_after(&two.note_id, &first.branch_id).unwrap();

    assert_eq!(
        titles(&tree.children(&folder.note_id).unwrap()),
        vec!["one", "two", "three"]
    );
}

#[test]
fn move_after_reorders_within_parent() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let (folder, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("Folder")).unwrap();
    let (_, x) = tree.create_note(&folder.note_id, NewNote::text("x")).unwrap();
    tree.create_note(&folder.note_id, NewNote::text("y")).unwrap();
    let (_, z) = tree.create_note(&folder.note_id, NewNote::text("z")).unwrap();

    tree.move_branch_after(&x.branch_id, &z.branch_id).unwrap();

    assert_eq!(titles(&tree.children(&folder.note_id).unwrap()), vec!["y", "z", "x"]);
}

#[test]
fn removing_last_branch_leaves_an_orphan_report() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let (note, branch) = tree.create_note(ROOT_NOTE_ID, NewNote::text("Lonely")).unwrap();

    tree.remove_branch(&branch.branch_id).unwrap();

    let orphans = tree.orphaned_notes().unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].note_id, note.note_id);
    assert!(repo.get_note(&note.note_id).unwrap().unwrap().is_active());
    assert!(tree.note_path(&note.note_id).unwrap().is_none());
}

#[test]
fn re_placing_revives_tombstoned_branch() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let (note, branch) = tree.create_note(ROOT_NOTE_ID, NewNote::text("Back")).unwrap();
    tree.remove_branch(&branch.branch_id).unwrap();

    let revived = tree.place_note(&note.note_id, ROOT_NOTE_ID).unwrap();

    assert_eq!(revived.branch_id, branch.branch_id);
    assert!(!revived.is_deleted);
    assert!(tree.orphaned_notes().unwrap().is_empty());
}

#[test]
fn soft_deleted_notes_disappear_from_children() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let (note, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("Gone")).unwrap();

    repo.write(|tx| hierarchy::soft_delete_note(tx, &note.note_id)).unwrap();

    assert!(tree.children(ROOT_NOTE_ID).unwrap().is_empty());
    let err = tree
        .create_note(&note.note_id, NewNote::text("child"))
        .unwrap_err();
    assert!(matches!(err, HierarchyError::ParentNotFound(_)));
}

#[test]
fn root_placement_is_immutable() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let (a, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("A")).unwrap();

    let err = tree.move_branch("none_root", &a.note_id).unwrap_err();
    assert!(matches!(err, HierarchyError::RootImmutable));
    assert!(matches!(
        tree.remove_branch("none_root").unwrap_err(),
        HierarchyError::RootImmutable
    ));
}

#[test]
fn sort_orders_by_case_folded_title() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    for title in ["delta", "Bravo", "alpha", "Charlie"] {
        tree.create_note(ROOT_NOTE_ID, NewNote::text(title)).unwrap();
    }

    let changed = tree.sort_children(ROOT_NOTE_ID).unwrap();

    assert!(changed > 0);
    assert_eq!(
        titles(&tree.children(ROOT_NOTE_ID).unwrap()),
        vec!["alpha", "Bravo", "Charlie", "delta"]
    );
    assert_eq!(tree.sort_children(ROOT_NOTE_ID).unwrap(), 0);
}

#[test]
fn protect_subtree_covers_descendants() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let (a, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("A")).unwrap();
    let (b, _) = tree.create_note(&a.note_id, NewNote::text("B")).unwrap();

    assert_eq!(tree.protect_subtree(&a.note_id, true).unwrap(), 2);
    assert!(repo.get_note(&b.note_id).unwrap().unwrap().is_protected);
    assert_eq!(tree.protect_subtree(&a.note_id, true).unwrap(), 0);
}

#[test]
fn ancestors_include_all_clone_parents() {
    let repo = Repository::in_memory().unwrap();
    let tree = NoteTree::new(&repo);
    let (a, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("A")).unwrap();
    let (b, _) = tree.create_note(ROOT_NOTE_ID, NewNote::text("B")).unwrap();
    let (c, _) = tree.create_note(&a.note_id, NewNote::text("C")).unwrap();
    tree.place_note(&c.note_id, &b.note_id).unwrap();

    let ancestors = tree.ancestor_ids(&c.note_id).unwrap();

    assert!(ancestors.contains(&a.note_id));
    assert!(ancestors.contains(&b.note_id));
    assert!(ancestors.contains(&ROOT_NOTE_ID.to_string()));
    assert!(!ancestors.contains(&c.note_id));
}

#[test]
fn note_ids_containing_branch_separator_are_rejected() {
    let repo = Repository::in_memory().unwrap();
    let last_before = repo.last_sync_id().unwrap();

    let created = repo.write(|tx| tx.create_entity(Note::with_id("b_c", "B C", NoteType::Text)));
    let replicated = repo.apply_replicated(
        &[EntityRecord::Note(Note::with_id("a_b", "A B", NoteType::Text))],
        "replica-b",
    );

    assert_eq!(created.unwrap_err().kind(), ErrorKind::Validation);
    assert_eq!(replicated.unwrap_err().kind(), ErrorKind::Validation);
    assert_eq!(repo.last_sync_id().unwrap(), last_before);
}

#[test]
fn colliding_legacy_branch_is_never_reused_for_another_pair() {
    let repo = Repository::in_memory().unwrap();
    // Rows written before note ids excluded the separator: `a_b_c` places
    // `b_c` under `a`, and is also the derived id for `c` under `a_b`.
    repo.read(|conn| {
        conn.execute_batch(
            "INSERT INTO notes (note_id, title, date_created, date_modified)
             VALUES ('a', 'a', 1, 1), ('a_b', 'a_b', 1, 1), ('b_c', 'b_c', 1, 1), ('c', 'c', 1, 1);
             INSERT INTO branches (branch_id, note_id, parent_note_id, date_modified)
             VALUES ('a_b_c', 'b_c', 'a', 1);",
        )
        .map_err(RepoError::from)
    })
    .unwrap();
    let tree = NoteTree::new(&repo);

    let err = tree.place_note("c", "a_b").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Storage);
    let stored = repo.get_branch("a_b_c").unwrap().unwrap();
    assert_eq!(stored.note_id, "b_c");
    assert_eq!(stored.parent_note_id, "a");
    assert!(tree.note_branches("c").unwrap().is_empty());
}
