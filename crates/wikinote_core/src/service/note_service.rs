//! Note use-case service.
//!
//! # Responsibility
//! - Create and save notes, then resynchronize their outgoing links.
//! - Serve the "linked from" view and read-only reference previews.
//!
//! # Invariants
//! - A saved note stays saved when link synchronization fails afterwards;
//!   the failure is reported next to the note.
//! - Only the owner can save a note.
//! - Previews never create notes.

use crate::model::link::{Backlink, NoteLink};
use crate::model::note::{Note, NoteId, NoteValidationError};
use crate::repo::link_repo::LinkRepository;
use crate::repo::note_repo::{normalize_note_limit, NoteListQuery, NoteRepository};
use crate::repo::RepoError;
use crate::service::backlink_service::{BacklinkService, SyncError, SyncOptions, SyncReport};
use crate::service::resolver::{NoteResolver, Resolution, ResolveError, ResolveOptions};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Title is blank after trimming.
    InvalidTitle,
    /// Any other write-time note rule, such as a blank owner.
    InvalidNote(NoteValidationError),
    NoteNotFound(NoteId),
    /// Caller does not own the note.
    NotOwner(NoteId),
    Resolve(ResolveError),
    Repo(RepoError),
    /// A write succeeded but could not be read back.
    InconsistentState(&'static str),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "note title must not be blank"),
            Self::InvalidNote(err) => write!(f, "{err}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::NotOwner(id) => write!(f, "note {id} belongs to another owner"),
            Self::Resolve(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent note state: {details}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidNote(err) => Some(err),
            Self::Resolve(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            RepoError::InvalidNote(NoteValidationError::EmptyTitle) => Self::InvalidTitle,
            RepoError::InvalidNote(err) => Self::InvalidNote(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ResolveError> for NoteServiceError {
    fn from(value: ResolveError) -> Self {
        Self::Resolve(value)
    }
}

/// Link synchronization outcome attached to a save.
#[derive(Debug)]
pub enum LinkSyncStatus {
    Synced(SyncReport),
    /// The note was saved; its edges may be stale or partial until the
    /// next successful save.
    Failed(SyncError),
}

impl LinkSyncStatus {
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced(_))
    }
}

/// Result of a create/save call.
#[derive(Debug)]
pub struct SavedNote {
    pub note: Note,
    pub link_sync: LinkSyncStatus,
}

/// List envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesListResult {
    /// Sorted by `updated_at DESC, uuid ASC`.
    pub items: Vec<Note>,
    pub applied_limit: u32,
}

/// Note service facade over note and link repositories.
pub struct NoteService<N: NoteRepository, L: LinkRepository> {
    notes: N,
    links: L,
    sync_options: SyncOptions,
}

impl<N: NoteRepository, L: LinkRepository> NoteService<N, L> {
    pub fn new(notes: N, links: L) -> Self {
        Self {
            notes,
            links,
            sync_options: SyncOptions::default(),
        }
    }

    pub fn with_sync_options(mut self, options: SyncOptions) -> Self {
        self.sync_options = options;
        self
    }

    /// Creates a note and links its references.
    pub fn create_note(
        &self,
        owner_id: &str,
        title: &str,
        body: impl Into<String>,
        parent_id: Option<Uuid>,
    ) -> Result<SavedNote, NoteServiceError> {
        if title.trim().is_empty() {
            return Err(NoteServiceError::InvalidTitle);
        }
        let note = Note::new(owner_id, title, body).with_parent(parent_id);
        let note_id = self.notes.create_note(&note)?;
        info!("event=note_create module=notes status=ok note_id={note_id}");
        self.read_back_and_sync(owner_id, note_id, "created note not found in read-back")
    }

    /// Saves new content for an existing note and relinks it.
    ///
    /// `title = None` keeps the current title.
    pub fn save_note(
        &self,
        owner_id: &str,
        note_id: NoteId,
        title: Option<&str>,
        body: &str,
    ) -> Result<SavedNote, NoteServiceError> {
        let current = self
            .notes
            .get_note(note_id)?
            .ok_or(NoteServiceError::NoteNotFound(note_id))?;
        if current.owner_id != owner_id {
            return Err(NoteServiceError::NotOwner(note_id));
        }

        let title = title.unwrap_or(current.title.as_str());
        self.notes.update_note(note_id, title, body)?;
        info!("event=note_save module=notes status=ok note_id={note_id}");
        self.read_back_and_sync(owner_id, note_id, "saved note not found in read-back")
    }

    pub fn get_note(&self, note_id: NoteId) -> Result<Option<Note>, NoteServiceError> {
        Ok(self.notes.get_note(note_id)?)
    }

    /// Lists an owner's notes with normalized pagination.
    pub fn list_notes(
        &self,
        owner_id: &str,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<NotesListResult, NoteServiceError> {
        let applied_limit = normalize_note_limit(limit);
        let query = NoteListQuery {
            limit: Some(applied_limit),
            offset,
        };
        let items = self.notes.list_notes(owner_id, &query)?;
        Ok(NotesListResult {
            items,
            applied_limit,
        })
    }

    /// Notes that link to `note_id`, with the anchor text they used.
    pub fn list_backlinks(&self, note_id: NoteId) -> Result<Vec<Backlink>, NoteServiceError> {
        Ok(self.links.list_backlinks_to(note_id)?)
    }

    /// Outgoing edges of `note_id`.
    pub fn list_links(&self, note_id: NoteId) -> Result<Vec<NoteLink>, NoteServiceError> {
        Ok(self.links.list_links_from(note_id)?)
    }

    /// Resolves a reference for viewing. A miss means the caller should
    /// offer a "create note" action instead.
    pub fn preview_reference(
        &self,
        owner_id: &str,
        display_text: &str,
    ) -> Result<Resolution, NoteServiceError> {
        let resolver = NoteResolver::new(&self.notes);
        Ok(resolver.resolve(owner_id, display_text, ResolveOptions::lookup_only())?)
    }

    fn read_back_and_sync(
        &self,
        owner_id: &str,
        note_id: NoteId,
        missing: &'static str,
    ) -> Result<SavedNote, NoteServiceError> {
        let note = self
            .notes
            .get_note(note_id)?
            .ok_or(NoteServiceError::InconsistentState(missing))?;

        let backlinks =
            BacklinkService::new(&self.notes, &self.links).with_options(self.sync_options);
        let link_sync = match backlinks.synchronize_backlinks(owner_id, note_id, &note.body) {
            Ok(report) => LinkSyncStatus::Synced(report),
            Err(err) => {
                warn!(
                    "event=note_link_sync module=notes status=error note_id={note_id} error={err}"
                );
                LinkSyncStatus::Failed(err)
            }
        };
        Ok(SavedNote { note, link_sync })
    }
}
