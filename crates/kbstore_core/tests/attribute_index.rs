use kbstore_core::{
    AttributeIndex, AttributeType, ErrorKind, NewAttribute, NewNote, NoteTree, RepoError,
    Repository, ROOT_NOTE_ID,
};

fn note(repo: &Repository, parent: &str, title: &str) -> String {
    NoteTree::new(repo)
        .create_note(parent, NewNote::text(title))
        .unwrap()
        .0
        .note_id
}

#[test]
fn label_lookup_is_deterministic_by_note_id() {
    let repo = Repository::in_memory().unwrap();
    let index = AttributeIndex::new(&repo);
    let first = note(&repo, ROOT_NOTE_ID, "one");
    let second = note(&repo, ROOT_NOTE_ID, "two");
    index.create_label(&first, "todo", None).unwrap();
    index.create_label(&second, "todo", None).unwrap();

    let expected = std::cmp::min(first.clone(), second.clone());
    for _ in 0..3 {
        let found = index.get_note_with_label("todo", None).unwrap().unwrap();
        assert_eq!(found.note_id, expected);
    }
    assert_eq!(index.get_notes_with_label("todo", None).unwrap().len(), 2);
}

#[test]
fn value_filter_and_missing_label() {
    let repo = Repository::in_memory().unwrap();
    let index = AttributeIndex::new(&repo);
    let id = note(&repo, ROOT_NOTE_ID, "tagged");
    index.create_label(&id, "status", Some("open")).unwrap();

    assert!(index
        .get_note_with_label("status", Some("open"))
        .unwrap()
        .is_some());
    assert!(index
        .get_note_with_label("status", Some("closed"))
        .unwrap()
        .is_none());
    assert!(index.get_note_with_label("absent", None).unwrap().is_none());
}

#[test]
fn deleted_labels_and_deleted_notes_do_not_match() {
    let repo = Repository::in_memory().unwrap();
    let index = AttributeIndex::new(&repo);
    let kept = note(&repo, ROOT_NOTE_ID, "kept");
    let label = index.create_label(&kept, "pin", None).unwrap();
    index.remove_attribute(&label.attribute_id).unwrap();
    assert!(index.get_note_with_label("pin", None).unwrap().is_none());

    let gone = note(&repo, ROOT_NOTE_ID, "gone");
    index.create_label(&gone, "pin", None).unwrap();
    repo.write(|tx| kbstore_core::hierarchy::soft_delete_note(tx, &gone)).unwrap();
    assert!(index.get_note_with_label("pin", None).unwrap().is_none());
}

#[test]
fn relation_requires_existing_target() {
    let repo = Repository::in_memory().unwrap();
    let index = AttributeIndex::new(&repo);
    let source = note(&repo, ROOT_NOTE_ID, "source");
    let target = note(&repo, ROOT_NOTE_ID, "target");

    let relation = index.create_relation(&source, "seeAlso", &target).unwrap();
    assert_eq!(relation.attribute_type, AttributeType::Relation);
    assert_eq!(relation.value, target);

    let err = index
        .create_relation(&source, "seeAlso", "missing")
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn blank_name_is_a_validation_error() {
    let repo = Repository::in_memory().unwrap();
    let index = AttributeIndex::new(&repo);
    let id = note(&repo, ROOT_NOTE_ID, "n");

    let err = index.create_label(&id, "  ", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn attribute_positions_increase_per_note() {
    let repo = Repository::in_memory().unwrap();
    let index = AttributeIndex::new(&repo);
    let id = note(&repo, ROOT_NOTE_ID, "n");

    let first = index.create_label(&id, "a", None).unwrap();
    let second = index.create_label(&id, "b", None).unwrap();

    assert_eq!(first.position + 1, second.position);
    let names: Vec<String> = index
        .attributes_of(&id)
        .unwrap()
        .into_iter()
        .map(|attribute| attribute.name)
        .collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn inheritable_attributes_flow_down_without_copies() {
    let repo = Repository::in_memory().unwrap();
    let index = AttributeIndex::new(&repo);
    let parent = note(&repo, ROOT_NOTE_ID, "parent");
    let child = note(&repo, &parent, "child");
    index
        .create_attribute(NewAttribute::label(parent.as_str(), "color", "red").inheritable())
        .unwrap();
    index.create_label(&parent, "local", None).unwrap();
    index.create_label(&child, "own", None).unwrap();

    let effective: Vec<String> = index
        .effective_attributes(&child)
        .unwrap()
        .into_iter()
        .map(|attribute| attribute.name)
        .collect();

    assert_eq!(effective, vec!["own", "color"]);
    assert_eq!(index.attributes_of(&child).unwrap().len(), 1);
    assert!(index
        .get_note_with_label("color", Some("red"))
        .unwrap()
        .map(|found| found.note_id == parent)
        .unwrap_or(false));
}
