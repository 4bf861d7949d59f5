use rusqlite::Connection;
use uuid::Uuid;
use wikinote_core::db::open_db_in_memory;
use wikinote_core::{
    BacklinkService, Backlink, LinkRepository, Note, NoteId, NoteLink, NoteRepository,
    NoteListQuery, NoteSummary, RepoError, RepoResult, ResolveError, SqliteLinkRepository,
    SqliteNoteRepository, SyncError, SyncOptions, TitleFilter,
};

const OWNER: &str = "owner-1";

fn insert_note(conn: &Connection, title: &str) -> NoteId {
    let repo = SqliteNoteRepository::try_new(conn).unwrap();
    repo.create_note(&Note::new(OWNER, title, "")).unwrap()
}

fn service(conn: &Connection) -> BacklinkService<SqliteNoteRepository<'_>, SqliteLinkRepository<'_>> {
    BacklinkService::new(
        SqliteNoteRepository::try_new(conn).unwrap(),
        SqliteLinkRepository::try_new(conn).unwrap(),
    )
}

fn outgoing(conn: &Connection, from: NoteId) -> Vec<(NoteId, String)> {
    SqliteLinkRepository::try_new(conn)
        .unwrap()
        .list_links_from(from)
        .unwrap()
        .into_iter()
        .map(|link| (link.to_note, link.anchor_text))
        .collect()
}

fn count_notes(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))
        .unwrap()
}

/// Link store that refuses edges with one anchor text.
struct RejectingLinks<'conn> {
    inner: SqliteLinkRepository<'conn>,
    rejected_anchor: &'static str,
}

impl LinkRepository for RejectingLinks<'_> {
    fn delete_links_from(&self, from_note: NoteId) -> RepoResult<usize> {
        self.inner.delete_links_from(from_note)
    }

    fn insert_link(&self, link: &NoteLink) -> RepoResult<()> {
        if link.anchor_text == self.rejected_anchor {
            return Err(RepoError::InvalidData("simulated insert failure".to_string()));
        }
        self.inner.insert_link(link)
    }

    fn list_links_from(&self, from_note: NoteId) -> RepoResult<Vec<NoteLink>> {
        self.inner.list_links_from(from_note)
    }

    fn list_backlinks_to(&self, to_note: NoteId) -> RepoResult<Vec<Backlink>> {
        self.inner.list_backlinks_to(to_note)
    }
}

/// Note store whose creates always fail.
struct ReadOnlyNotes<'conn> {
    inner: SqliteNoteRepository<'conn>,
}

impl NoteRepository for ReadOnlyNotes<'_> {
    fn create_note(&self, _note: &Note) -> RepoResult<NoteId> {
        Err(RepoError::InvalidData("simulated create failure".to_string()))
    }

    fn update_note(&self, id: NoteId, title: &str, body: &str) -> RepoResult<()> {
        self.inner.update_note(id, title, body)
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        self.inner.get_note(id)
    }

    fn find_notes(
        &self,
        owner_id: &str,
        filter: TitleFilter<'_>,
        limit: u32,
    ) -> RepoResult<Vec<NoteSummary>> {
        self.inner.find_notes(owner_id, filter, limit)
    }

    fn list_notes(&self, owner_id: &str, query: &NoteListQuery) -> RepoResult<Vec<Note>> {
        self.inner.list_notes(owner_id, query)
    }

    fn soft_delete_note(&self, id: NoteId) -> RepoResult<()> {
        self.inner.soft_delete_note(id)
    }
}

#[test]
fn repeated_reference_with_same_anchor_yields_one_edge() {
    let conn = open_db_in_memory().unwrap();
    let source = insert_note(&conn, "Source");
    let x = insert_note(&conn, "X");

    let report = service(&conn)
        .synchronize_backlinks(OWNER, source, "[[X]] and [[X]]")
        .unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(outgoing(&conn, source), vec![(x, "X".to_string())]);
}

#[test]
fn synchronizing_twice_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let source = insert_note(&conn, "Source");
    let body = "See [[Alpha]], [[Beta]] and [[alpha]] again.";
    let sync = service(&conn);

    let first = sync.synchronize_backlinks(OWNER, source, body).unwrap();
    let after_first = outgoing(&conn, source);
    let notes_after_first = count_notes(&conn);

    let second = sync.synchronize_backlinks(OWNER, source, body).unwrap();
    assert_eq!(outgoing(&conn, source), after_first);
    assert_eq!(count_notes(&conn), notes_after_first);
    assert_eq!(first.created_notes.len(), 2);
    assert!(second.created_notes.is_empty());
    assert_eq!(second.removed, first.inserted);
}

#[test]
fn anchor_text_is_kept_after_fuzzy_match_and_distinct_anchors_get_own_edges() {
    let conn = open_db_in_memory().unwrap();
    let source = insert_note(&conn, "Source");
    let book = insert_note(&conn, "The Rust Programming Language");

    service(&conn)
        .synchronize_backlinks(OWNER, source, "[[rust programming]] vs [[The Rust Programming Language]]")
        .unwrap();
    assert_eq!(
        outgoing(&conn, source),
        vec![
            (book, "rust programming".to_string()),
            (book, "The Rust Programming Language".to_string()),
        ]
    );
}

#[test]
fn edges_follow_body_changes_without_stale_entries() {
    let conn = open_db_in_memory().unwrap();
    let source = insert_note(&conn, "Source");
    let a = insert_note(&conn, "A");
    let b = insert_note(&conn, "B");
    let sync = service(&conn);

    sync.synchronize_backlinks(OWNER, source, "[[A]] [[B]]").unwrap();
    assert_eq!(outgoing(&conn, source).len(), 2);

    let report = sync.synchronize_backlinks(OWNER, source, "only [[B]] now").unwrap();
    assert_eq!(report.removed, 2);
    assert_eq!(outgoing(&conn, source), vec![(b, "B".to_string())]);

    sync.synchronize_backlinks(OWNER, source, "no links").unwrap();
    assert!(outgoing(&conn, source).is_empty());
    assert!(SqliteLinkRepository::try_new(&conn)
        .unwrap()
        .list_backlinks_to(a)
        .unwrap()
        .is_empty());
}

#[test]
fn three_identical_misses_create_exactly_one_note() {
    let conn = open_db_in_memory().unwrap();
    let source = insert_note(&conn, "Source");

    let report = service(&conn)
        .synchronize_backlinks(OWNER, source, "[[Traits]] [[Traits]] [[Traits]]")
        .unwrap();
    assert_eq!(report.created_notes.len(), 1);
    assert_eq!(count_notes(&conn), 2);
    assert_eq!(
        outgoing(&conn, source),
        vec![(report.created_notes[0], "Traits".to_string())]
    );
}

#[test]
fn disabled_creation_reports_misses_and_skips_edges() {
    let conn = open_db_in_memory().unwrap();
    let source = insert_note(&conn, "Source");
    let known = insert_note(&conn, "Known");

    let report = service(&conn)
        .with_options(SyncOptions {
            create_missing_notes: false,
        })
        .synchronize_backlinks(OWNER, source, "[[Known]] [[Unknown]] [[Unknown]]")
        .unwrap();
    assert_eq!(report.misses, vec!["Unknown".to_string()]);
    assert_eq!(count_notes(&conn), 2);
    assert_eq!(outgoing(&conn, source), vec![(known, "Known".to_string())]);
}

#[test]
fn synchronizing_a_deleted_note_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let source = insert_note(&conn, "Source");
    let target = insert_note(&conn, "Target");
    let sync = service(&conn);
    sync.synchronize_backlinks(OWNER, source, "[[Target]]").unwrap();

    SqliteNoteRepository::try_new(&conn)
        .unwrap()
        .soft_delete_note(source)
        .unwrap();
    let report = sync
        .synchronize_backlinks(OWNER, source, "[[Brand New]]")
        .unwrap();
    assert!(report.skipped);
    assert_eq!(count_notes(&conn), 2);
    assert_eq!(outgoing(&conn, source), vec![(target, "Target".to_string())]);

    let missing = sync
        .synchronize_backlinks(OWNER, Uuid::new_v4(), "[[Target]]")
        .unwrap();
    assert!(missing.skipped);
}

#[test]
fn syncing_one_note_leaves_other_notes_edges_alone() {
    let conn = open_db_in_memory().unwrap();
    let a = insert_note(&conn, "A");
    let b = insert_note(&conn, "B");
    let sync = service(&conn);

    sync.synchronize_backlinks(OWNER, a, "[[B]]").unwrap();
    sync.synchronize_backlinks(OWNER, b, "[[A]]").unwrap();
    sync.synchronize_backlinks(OWNER, a, "nothing").unwrap();

    assert!(outgoing(&conn, a).is_empty());
    assert_eq!(outgoing(&conn, b), vec![(a, "A".to_string())]);
}

#[test]
fn other_owner_cannot_synchronize_note() {
    let conn = open_db_in_memory().unwrap();
    let source = insert_note(&conn, "Source");

    let err = service(&conn)
        .synchronize_backlinks("intruder", source, "[[Source]]")
        .unwrap_err();
    assert!(matches!(err, SyncError::OwnerMismatch { .. }));
}

#[test]
fn partial_failure_is_reported_and_next_sync_self_heals() {
    let conn = open_db_in_memory().unwrap();
    let source = insert_note(&conn, "Source");
    let good = insert_note(&conn, "Good");
    let flaky = insert_note(&conn, "Flaky");
    let body = "[[Good]] [[Flaky]]";

    let failing = BacklinkService::new(
        SqliteNoteRepository::try_new(&conn).unwrap(),
        RejectingLinks {
            inner: SqliteLinkRepository::try_new(&conn).unwrap(),
            rejected_anchor: "Flaky",
        },
    );
    match failing.synchronize_backlinks(OWNER, source, body).unwrap_err() {
        SyncError::Partial {
            inserted, failures, ..
        } => {
            assert_eq!(inserted, 1);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].link.to_note, flaky);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(outgoing(&conn, source), vec![(good, "Good".to_string())]);

    service(&conn).synchronize_backlinks(OWNER, source, body).unwrap();
    assert_eq!(
        outgoing(&conn, source),
        vec![(good, "Good".to_string()), (flaky, "Flaky".to_string())]
    );
}

#[test]
fn resolution_failure_keeps_previous_edges() {
    let conn = open_db_in_memory().unwrap();
    let source = insert_note(&conn, "Source");
    let old = insert_note(&conn, "Old");
    service(&conn).synchronize_backlinks(OWNER, source, "[[Old]]").unwrap();

    let read_only = BacklinkService::new(
        ReadOnlyNotes {
            inner: SqliteNoteRepository::try_new(&conn).unwrap(),
        },
        SqliteLinkRepository::try_new(&conn).unwrap(),
    );
    let err = read_only
        .synchronize_backlinks(OWNER, source, "[[Needs Creating]]")
        .unwrap_err();
    assert!(matches!(err, SyncError::Resolve(ResolveError::Repo(_))));
    assert_eq!(outgoing(&conn, source), vec![(old, "Old".to_string())]);
}

#[test]
fn replace_links_writes_pre_resolved_references() {
    let conn = open_db_in_memory().unwrap();
    let source = insert_note(&conn, "Source");
    let target = insert_note(&conn, "Target");

    let report = service(&conn)
        .replace_links(
            source,
            &[
                wikinote_core::ResolvedReference {
                    to_note: target,
                    anchor_text: "t".to_string(),
                },
                wikinote_core::ResolvedReference {
                    to_note: target,
                    anchor_text: "t".to_string(),
                },
            ],
        )
        .unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(outgoing(&conn, source), vec![(target, "t".to_string())]);
}
