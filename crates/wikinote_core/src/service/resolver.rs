//! Reference resolution: display text to note id.
//!
//! # Responsibility
//! - Map `[[display text]]` to a note of the same owner.
//! - Create a stub note on a miss when the caller's policy allows it.
//!
//! # Invariants
//! - Lookup order is fixed: exact title (case-insensitive), then substring,
//!   then miss. Within a step the first row in store order wins.
//! - Resolution never consults randomness; equal store state gives equal
//!   results.
//! - Within one [`ResolutionPass`] a display text creates at most one note.
//! - Note creation is never retried here.

use crate::model::note::{Note, NoteId};
use crate::repo::note_repo::{NoteRepository, TitleFilter};
use crate::repo::RepoError;
use log::{debug, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Policy for [`NoteResolver::resolve`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Create a stub note when nothing matches (save path). When `false` a
    /// miss is reported instead (preview path).
    pub create_if_missing: bool,
}

impl ResolveOptions {
    /// Options for the save path.
    pub fn create_missing() -> Self {
        Self {
            create_if_missing: true,
        }
    }

    /// Options for read-only lookups.
    pub fn lookup_only() -> Self {
        Self {
            create_if_missing: false,
        }
    }
}

/// Outcome of resolving one display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// An existing note matched.
    Existing(NoteId),
    /// No note matched and a stub was created.
    Created(NoteId),
    /// No note matched and creation was not allowed.
    Miss,
}

impl Resolution {
    pub fn note_id(&self) -> Option<NoteId> {
        match self {
            Self::Existing(id) | Self::Created(id) => Some(*id),
            Self::Miss => None,
        }
    }
}

/// Resolution failure.
#[derive(Debug)]
pub enum ResolveError {
    /// Display text is blank after trimming.
    EmptyDisplayText,
    Repo(RepoError),
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDisplayText => write!(f, "reference display text must not be blank"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::EmptyDisplayText => None,
        }
    }
}

impl From<RepoError> for ResolveError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Per-pass memo so repeated references resolve (and create) once.
///
/// Keys are trimmed, lower-cased display texts. Not meant to outlive one
/// save; a later pass must see notes created or renamed in between.
#[derive(Debug, Default)]
pub struct ResolutionPass {
    resolved: HashMap<String, Resolution>,
    created: Vec<NoteId>,
}

impl ResolutionPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notes created during this pass, in creation order.
    pub fn created_notes(&self) -> &[NoteId] {
        &self.created
    }
}

/// Resolves display texts against a note repository.
pub struct NoteResolver<N: NoteRepository> {
    notes: N,
}

impl<N: NoteRepository> NoteResolver<N> {
    pub fn new(notes: N) -> Self {
        Self { notes }
    }

    /// Resolves one display text without memoization.
    pub fn resolve(
        &self,
        owner_id: &str,
        display_text: &str,
        options: ResolveOptions,
    ) -> Result<Resolution, ResolveError> {
        let text = display_text.trim();
        if text.is_empty() {
            return Err(ResolveError::EmptyDisplayText);
        }

        if let Some(hit) = self.first_match(owner_id, TitleFilter::Equals(text))? {
            debug!("event=note_resolve module=resolver status=ok outcome=exact note_id={hit}");
            return Ok(Resolution::Existing(hit));
        }
        // Substring ties go to the first row in store order.
        if let Some(hit) = self.first_match(owner_id, TitleFilter::Contains(text))? {
            debug!("event=note_resolve module=resolver status=ok outcome=contains note_id={hit}");
            return Ok(Resolution::Existing(hit));
        }
        if !options.create_if_missing {
            debug!("event=note_resolve module=resolver status=ok outcome=miss");
            return Ok(Resolution::Miss);
        }

        let stub = Note::new(owner_id, text, stub_body(text));
        let created = self.notes.create_note(&stub)?;
        info!("event=note_resolve module=resolver status=ok outcome=created note_id={created}");
        Ok(Resolution::Created(created))
    }

    /// Resolves through `pass`, reusing earlier results for the same text.
    ///
    /// A text first created in this pass comes back as `Existing` on repeats.
    pub fn resolve_in_pass(
        &self,
        pass: &mut ResolutionPass,
        owner_id: &str,
        display_text: &str,
        options: ResolveOptions,
    ) -> Result<Resolution, ResolveError> {
        let key = display_text.trim().to_lowercase();
        if let Some(previous) = pass.resolved.get(&key) {
            return Ok(match previous {
                Resolution::Created(id) => Resolution::Existing(*id),
                other => *other,
            });
        }

        let resolution = self.resolve(owner_id, display_text, options)?;
        if let Resolution::Created(id) = resolution {
            pass.created.push(id);
        }
        pass.resolved.insert(key, resolution);
        Ok(resolution)
    }

    fn first_match(
        &self,
        owner_id: &str,
        filter: TitleFilter<'_>,
    ) -> Result<Option<NoteId>, ResolveError> {
        let rows = self.notes.find_notes(owner_id, filter, 1)?;
        Ok(rows.first().map(|row| row.uuid))
    }
}

/// Body given to notes created from an unresolved reference.
pub fn stub_body(title: &str) -> String {
    format!("# {title}\n")
}
