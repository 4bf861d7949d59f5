//! Link graph repository contract and SQLite implementation.
//!
//! # Invariants
//! - Edges are keyed by `from_note`; deleting one note's edges never touches
//!   edges owned by another note.
//! - `(from_note, to_note, anchor_text)` is unique at the storage level.
//! - Edge reads return insertion order.

use crate::model::link::{Backlink, NoteLink};
use crate::model::note::NoteId;
use crate::repo::{ensure_tables, parse_uuid, RepoResult};
use rusqlite::{params, Connection};

/// Store operations on link graph edges.
pub trait LinkRepository {
    /// Removes every edge whose source is `from_note`; returns the count.
    fn delete_links_from(&self, from_note: NoteId) -> RepoResult<usize>;
    /// Inserts one edge.
    fn insert_link(&self, link: &NoteLink) -> RepoResult<()>;
    /// Outgoing edges of one note, in insertion order.
    fn list_links_from(&self, from_note: NoteId) -> RepoResult<Vec<NoteLink>>;
    /// Incoming edges of one note from active notes, in insertion order.
    fn list_backlinks_to(&self, to_note: NoteId) -> RepoResult<Vec<Backlink>>;
}

impl<T: LinkRepository + ?Sized> LinkRepository for &T {
    fn delete_links_from(&self, from_note: NoteId) -> RepoResult<usize> {
        (**self).delete_links_from(from_note)
    }

    fn insert_link(&self, link: &NoteLink) -> RepoResult<()> {
        (**self).insert_link(link)
    }

    fn list_links_from(&self, from_note: NoteId) -> RepoResult<Vec<NoteLink>> {
        (**self).list_links_from(from_note)
    }

    fn list_backlinks_to(&self, to_note: NoteId) -> RepoResult<Vec<Backlink>> {
        (**self).list_backlinks_to(to_note)
    }
}

/// SQLite-backed link repository.
#[derive(Clone, Copy)]
pub struct SqliteLinkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLinkRepository<'conn> {
    /// Wraps a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["notes", "note_links"])?;
        Ok(Self { conn })
    }
}

impl LinkRepository for SqliteLinkRepository<'_> {
    fn delete_links_from(&self, from_note: NoteId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM note_links WHERE from_note = ?1;",
            [from_note.to_string()],
        )?;
        Ok(removed)
    }

    fn insert_link(&self, link: &NoteLink) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO note_links (from_note, to_note, anchor_text)
             VALUES (?1, ?2, ?3);",
            params![
                link.from_note.to_string(),
                link.to_note.to_string(),
                link.anchor_text.as_str(),
            ],
        )?;
        Ok(())
    }

    fn list_links_from(&self, from_note: NoteId) -> RepoResult<Vec<NoteLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT from_note, to_note, anchor_text
             FROM note_links
             WHERE from_note = ?1
             ORDER BY id ASC;",
        )?;

        let mut rows = stmt.query([from_note.to_string()])?;
        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            let from_text: String = row.get("from_note")?;
            let to_text: String = row.get("to_note")?;
            links.push(NoteLink {
                from_note: parse_uuid(&from_text, "note_links.from_note")?,
                to_note: parse_uuid(&to_text, "note_links.to_note")?,
                anchor_text: row.get("anchor_text")?,
            });
        }
        Ok(links)
    }

    fn list_backlinks_to(&self, to_note: NoteId) -> RepoResult<Vec<Backlink>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.from_note, n.title, l.anchor_text
             FROM note_links l
             INNER JOIN notes n ON n.uuid = l.from_note
             WHERE l.to_note = ?1
               AND n.is_deleted = 0
             ORDER BY l.id ASC;",
        )?;

        let mut rows = stmt.query([to_note.to_string()])?;
        let mut backlinks = Vec::new();
        while let Some(row) = rows.next()? {
            let from_text: String = row.get(0)?;
            backlinks.push(Backlink {
                from_note: parse_uuid(&from_text, "note_links.from_note")?,
                from_title: row.get(1)?,
                anchor_text: row.get(2)?,
            });
        }
        Ok(backlinks)
    }
}
