//! Note domain model.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another note.
//! - `title` is non-empty after trimming. Uniqueness is NOT enforced: two
//!   notes may share a title and resolution picks one by store order.
//! - `owner_id` is an opaque identity supplied by the caller.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a note.
pub type NoteId = Uuid;

/// A Markdown note owned by one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub uuid: NoteId,
    pub owner_id: String,
    pub title: String,
    /// Raw Markdown source, scanned for `[[...]]` references on save.
    pub body: String,
    /// Opaque container id (folder, notebook); not interpreted by the core.
    pub parent_id: Option<Uuid>,
    /// Epoch milliseconds, assigned by the store.
    pub created_at: i64,
    /// Epoch milliseconds, assigned by the store.
    pub updated_at: i64,
}

/// Validation failures for [`Note`] writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    EmptyTitle,
    EmptyOwner,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "note title must not be blank"),
            Self::EmptyOwner => write!(f, "note owner must not be blank"),
        }
    }
}

impl Error for NoteValidationError {}

impl Note {
    /// Creates a note with a fresh id. Timestamps are filled in by the store.
    pub fn new(
        owner_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            owner_id: owner_id.into(),
            title: title.into().trim().to_string(),
            body: body.into(),
            parent_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Sets the container id.
    pub fn with_parent(mut self, parent_id: Option<Uuid>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Checks write-time invariants.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.owner_id.trim().is_empty() {
            return Err(NoteValidationError::EmptyOwner);
        }
        if self.title.trim().is_empty() {
            return Err(NoteValidationError::EmptyTitle);
        }
        Ok(())
    }
}

/// Derives a display title from Markdown text.
///
/// Uses the first ATX heading when present, otherwise the first non-empty
/// line, with heading markers stripped. Returns `None` for blank bodies.
pub fn derive_title(body: &str) -> Option<String> {
    let lines = || body.lines().map(str::trim).filter(|line| !line.is_empty());
    let heading = lines().find_map(|line| {
        let rest = line.strip_prefix('#')?.trim_start_matches('#');
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return None;
        }
        Some(rest.trim_end_matches('#').trim())
    });
    heading
        .filter(|title| !title.is_empty())
        .or_else(|| lines().next())
        .map(str::to_string)
}
