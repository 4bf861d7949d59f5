//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist notes and answer the title lookups used by reference
//!   resolution.
//!
//! # Invariants
//! - Every query is scoped to one owner (except id lookups) and skips
//!   soft-deleted rows.
//! - Title lookups return rows in store order: `created_at ASC`, then
//!   insertion order. Resolution relies on this as its tie-break.
//! - Title matching is case-insensitive with Unicode lower-casing; SQLite's
//!   `NOCASE` only folds ASCII, so the filter is applied after the scan.

use crate::model::note::{Note, NoteId, NoteValidationError};
use crate::repo::{ensure_tables, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const NOTES_DEFAULT_LIMIT: u32 = 20;
const NOTES_LIMIT_MAX: u32 = 100;

const NOTE_SELECT_SQL: &str = "SELECT
    uuid,
    owner_id,
    title,
    body,
    parent_uuid,
    created_at,
    updated_at
FROM notes";

/// Title predicate for [`NoteRepository::find_notes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleFilter<'a> {
    /// Whole title equals the needle, ignoring case and outer whitespace.
    Equals(&'a str),
    /// Title contains the needle, ignoring case.
    Contains(&'a str),
}

impl TitleFilter<'_> {
    fn matches(&self, title: &str) -> bool {
        let title = title.trim().to_lowercase();
        match self {
            Self::Equals(needle) => title == needle.trim().to_lowercase(),
            Self::Contains(needle) => title.contains(&needle.trim().to_lowercase()),
        }
    }
}

/// Lightweight lookup row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSummary {
    pub uuid: NoteId,
    pub title: String,
}

/// Pagination options for [`NoteRepository::list_notes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteListQuery {
    /// Defaults to 20 and clamps to 100.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Store operations on notes.
pub trait NoteRepository {
    /// Inserts a validated note and returns its id.
    fn create_note(&self, note: &Note) -> RepoResult<NoteId>;
    /// Replaces title and body; bumps `updated_at`.
    fn update_note(&self, id: NoteId, title: &str, body: &str) -> RepoResult<()>;
    /// Gets an active note by id.
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Title lookup for one owner, in store order, at most `limit` rows.
    fn find_notes(
        &self,
        owner_id: &str,
        filter: TitleFilter<'_>,
        limit: u32,
    ) -> RepoResult<Vec<NoteSummary>>;
    /// Lists an owner's notes by `updated_at DESC, uuid ASC`.
    fn list_notes(&self, owner_id: &str, query: &NoteListQuery) -> RepoResult<Vec<Note>>;
    /// Tombstones a note. Its outgoing edges are left to the next resync.
    fn soft_delete_note(&self, id: NoteId) -> RepoResult<()>;
}

impl<T: NoteRepository + ?Sized> NoteRepository for &T {
    fn create_note(&self, note: &Note) -> RepoResult<NoteId> {
        (**self).create_note(note)
    }

    fn update_note(&self, id: NoteId, title: &str, body: &str) -> RepoResult<()> {
        (**self).update_note(id, title, body)
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        (**self).get_note(id)
    }

    fn find_notes(
        &self,
        owner_id: &str,
        filter: TitleFilter<'_>,
        limit: u32,
    ) -> RepoResult<Vec<NoteSummary>> {
        (**self).find_notes(owner_id, filter, limit)
    }

    fn list_notes(&self, owner_id: &str, query: &NoteListQuery) -> RepoResult<Vec<Note>> {
        (**self).list_notes(owner_id, query)
    }

    fn soft_delete_note(&self, id: NoteId) -> RepoResult<()> {
        (**self).soft_delete_note(id)
    }
}

/// SQLite-backed note repository.
#[derive(Clone, Copy)]
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Wraps a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["notes"])?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create_note(&self, note: &Note) -> RepoResult<NoteId> {
        note.validate()?;

        self.conn.execute(
            "INSERT INTO notes (uuid, owner_id, title, body, parent_uuid)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                note.uuid.to_string(),
                note.owner_id.as_str(),
                note.title.trim(),
                note.body.as_str(),
                note.parent_id.map(|id| id.to_string()),
            ],
        )?;

        Ok(note.uuid)
    }

    fn update_note(&self, id: NoteId, title: &str, body: &str) -> RepoResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(NoteValidationError::EmptyTitle.into());
        }

        let changed = self.conn.execute(
            "UPDATE notes
             SET
                title = ?2,
                body = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            params![id.to_string(), title, body],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             WHERE uuid = ?1
               AND is_deleted = 0;"
        ))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn find_notes(
        &self,
        owner_id: &str,
        filter: TitleFilter<'_>,
        limit: u32,
    ) -> RepoResult<Vec<NoteSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, title
             FROM notes
             WHERE owner_id = ?1
               AND is_deleted = 0
             ORDER BY created_at ASC, rowid ASC;",
        )?;

        let mut rows = stmt.query([owner_id])?;
        let mut found = Vec::new();
        while let Some(row) = rows.next()? {
            if found.len() >= limit as usize {
                break;
            }
            let title: String = row.get("title")?;
            if !filter.matches(&title) {
                continue;
            }
            let uuid_text: String = row.get("uuid")?;
            found.push(NoteSummary {
                uuid: parse_uuid(&uuid_text, "notes.uuid")?,
                title,
            });
        }
        Ok(found)
    }

    fn list_notes(&self, owner_id: &str, query: &NoteListQuery) -> RepoResult<Vec<Note>> {
        let limit = normalize_note_limit(query.limit);
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             WHERE owner_id = ?1
               AND is_deleted = 0
             ORDER BY updated_at DESC, uuid ASC
             LIMIT ?2 OFFSET ?3;"
        ))?;

        let mut rows = stmt.query(params![owner_id, i64::from(limit), i64::from(query.offset)])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn soft_delete_note(&self, id: NoteId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

/// Normalizes a list limit: unset or zero means 20, values above 100 clamp.
pub fn normalize_note_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => NOTES_DEFAULT_LIMIT,
        Some(value) if value > NOTES_LIMIT_MAX => NOTES_LIMIT_MAX,
        Some(value) => value,
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let uuid_text: String = row.get("uuid")?;
    let parent_id = match row.get::<_, Option<String>>("parent_uuid")? {
        Some(value) => Some(parse_uuid(&value, "notes.parent_uuid")?),
        None => None,
    };

    let note = Note {
        uuid: parse_uuid(&uuid_text, "notes.uuid")?,
        owner_id: row.get("owner_id")?,
        title: row.get("title")?,
        body: row.get("body")?,
        parent_id,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    note.validate()?;
    Ok(note)
}
