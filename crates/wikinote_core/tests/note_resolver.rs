use rusqlite::Connection;
use wikinote_core::db::open_db_in_memory;
use wikinote_core::{
    Note, NoteRepository, NoteResolver, Resolution, ResolutionPass, ResolveError, ResolveOptions,
    SqliteNoteRepository,
};

const OWNER: &str = "owner-1";

fn insert_note(conn: &Connection, owner: &str, title: &str) -> uuid::Uuid {
    let repo = SqliteNoteRepository::try_new(conn).unwrap();
    repo.create_note(&Note::new(owner, title, "")).unwrap()
}

fn count_notes(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn exact_title_match_ignores_case_and_creates_nothing() {
    let conn = open_db_in_memory().unwrap();
    let paris = insert_note(&conn, OWNER, "París");
    let resolver = NoteResolver::new(SqliteNoteRepository::try_new(&conn).unwrap());

    for text in ["parís", "PARÍS", "  París  "] {
        let resolution = resolver
            .resolve(OWNER, text, ResolveOptions::create_missing())
            .unwrap();
        assert_eq!(resolution, Resolution::Existing(paris));
    }
    assert_eq!(count_notes(&conn), 1);
}

#[test]
fn exact_match_wins_over_earlier_substring_match() {
    let conn = open_db_in_memory().unwrap();
    insert_note(&conn, OWNER, "Rust Book");
    let exact = insert_note(&conn, OWNER, "rust");
    let resolver = NoteResolver::new(SqliteNoteRepository::try_new(&conn).unwrap());

    let resolution = resolver
        .resolve(OWNER, "Rust", ResolveOptions::lookup_only())
        .unwrap();
    assert_eq!(resolution, Resolution::Existing(exact));
}

#[test]
fn substring_ties_go_to_the_first_note_in_store_order() {
    // Known ambiguity: several titles contain the text and the oldest wins.
    let conn = open_db_in_memory().unwrap();
    let first = insert_note(&conn, OWNER, "Ownership in Rust");
    insert_note(&conn, OWNER, "Rust Atomics");
    let resolver = NoteResolver::new(SqliteNoteRepository::try_new(&conn).unwrap());

    let resolution = resolver
        .resolve(OWNER, "rust", ResolveOptions::lookup_only())
        .unwrap();
    assert_eq!(resolution, Resolution::Existing(first));
}

#[test]
fn lookup_only_miss_reports_and_creates_nothing() {
    let conn = open_db_in_memory().unwrap();
    let resolver = NoteResolver::new(SqliteNoteRepository::try_new(&conn).unwrap());

    let resolution = resolver
        .resolve(OWNER, "Nowhere", ResolveOptions::lookup_only())
        .unwrap();
    assert_eq!(resolution, Resolution::Miss);
    assert_eq!(resolution.note_id(), None);
    assert_eq!(count_notes(&conn), 0);
}

#[test]
fn miss_with_creation_builds_stub_note() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();
    let resolver = NoteResolver::new(repo);

    let resolution = resolver
        .resolve(OWNER, " Borrow Checker ", ResolveOptions::create_missing())
        .unwrap();
    let Resolution::Created(id) = resolution else {
        panic!("expected a created note, got {resolution:?}");
    };

    let stub = repo.get_note(id).unwrap().unwrap();
    assert_eq!(stub.title, "Borrow Checker");
    assert_eq!(stub.body, "# Borrow Checker\n");
    assert_eq!(stub.owner_id, OWNER);
    assert_eq!(stub.parent_id, None);
}

#[test]
fn notes_of_other_owners_and_deleted_notes_are_invisible() {
    let conn = open_db_in_memory().unwrap();
    insert_note(&conn, "someone-else", "Shared Title");
    let deleted = insert_note(&conn, OWNER, "Shared Title");
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();
    repo.soft_delete_note(deleted).unwrap();

    let resolver = NoteResolver::new(repo);
    let resolution = resolver
        .resolve(OWNER, "shared title", ResolveOptions::lookup_only())
        .unwrap();
    assert_eq!(resolution, Resolution::Miss);
}

#[test]
fn pass_creates_one_note_for_repeated_misses() {
    let conn = open_db_in_memory().unwrap();
    let resolver = NoteResolver::new(SqliteNoteRepository::try_new(&conn).unwrap());
    let mut pass = ResolutionPass::new();

    let results = ["Lifetimes", "lifetimes", "Lifetimes"]
        .into_iter()
        .map(|text| {
            resolver
                .resolve_in_pass(&mut pass, OWNER, text, ResolveOptions::create_missing())
                .unwrap()
        })
        .collect::<Vec<_>>();

    let Resolution::Created(id) = results[0] else {
        panic!("first occurrence should create, got {:?}", results[0]);
    };
    assert_eq!(results[1], Resolution::Existing(id));
    assert_eq!(results[2], Resolution::Existing(id));
    assert_eq!(pass.created_notes(), &[id]);
    assert_eq!(count_notes(&conn), 1);
}

#[test]
fn blank_display_text_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let resolver = NoteResolver::new(SqliteNoteRepository::try_new(&conn).unwrap());

    let err = resolver
        .resolve(OWNER, "   ", ResolveOptions::create_missing())
        .unwrap_err();
    assert!(matches!(err, ResolveError::EmptyDisplayText));
    assert_eq!(count_notes(&conn), 0);
}
