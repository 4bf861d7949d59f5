//! Backlink synchronization: keep a note's outgoing edges equal to its body.
//!
//! # Responsibility
//! - Resolve every `[[...]]` reference of a body to a note id.
//! - Replace the persisted edges of the source note with the fresh set.
//!
//! # Invariants
//! - Only edges whose `from_note` is the synchronized note are touched.
//! - One edge per distinct `(to_note, anchor_text)`, in first-occurrence
//!   order. `anchor_text` is the reference text, not the target's title.
//! - All references are resolved before any edge is deleted.
//! - Delete + insert is not transactional. A failed insert leaves a partial
//!   edge set; the next successful run rebuilds it from the body alone.
//! - Synchronizing a note that no longer exists is a no-op.
//! - Callers serialize synchronizations of the same note.

use crate::model::link::NoteLink;
use crate::model::note::NoteId;
use crate::repo::link_repo::LinkRepository;
use crate::repo::note_repo::NoteRepository;
use crate::repo::RepoError;
use crate::service::resolver::{NoteResolver, ResolutionPass, ResolveError, ResolveOptions};
use crate::wikilink::extract::references;
use log::{error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Synchronization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Create stub notes for unresolved references. Defaults to `true`.
    pub create_missing_notes: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            create_missing_notes: true,
        }
    }
}

/// A reference already mapped to its target note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub to_note: NoteId,
    pub anchor_text: String,
}

/// References of one body after resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedBody {
    /// In source order, duplicates kept.
    pub resolved: Vec<ResolvedReference>,
    /// Notes created for unresolved references.
    pub created_notes: Vec<NoteId>,
    /// Display texts that matched nothing (creation disabled).
    pub misses: Vec<String>,
}

/// Summary of one synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub from_note: NoteId,
    /// The source note no longer exists; nothing was done.
    pub skipped: bool,
    pub removed: usize,
    pub inserted: usize,
    pub created_notes: Vec<NoteId>,
    pub misses: Vec<String>,
}

/// One edge that could not be written.
#[derive(Debug)]
pub struct LinkInsertFailure {
    pub link: NoteLink,
    pub error: RepoError,
}

/// Synchronization failure.
#[derive(Debug)]
pub enum SyncError {
    /// The source note belongs to another owner.
    OwnerMismatch { note: NoteId, owner_id: String },
    /// A reference could not be resolved; edges were left untouched.
    Resolve(ResolveError),
    /// Loading the note or deleting old edges failed.
    Repo(RepoError),
    /// Old edges were deleted but some new edges could not be inserted.
    Partial {
        from_note: NoteId,
        removed: usize,
        inserted: usize,
        failures: Vec<LinkInsertFailure>,
    },
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OwnerMismatch { note, owner_id } => {
                write!(f, "note {note} is not owned by `{owner_id}`")
            }
            Self::Resolve(err) => write!(f, "reference resolution failed: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Partial {
                from_note,
                inserted,
                failures,
                ..
            } => write!(
                f,
                "partial link sync for note {from_note}: {inserted} inserted, {} failed",
                failures.len()
            ),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Resolve(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Partial { failures, .. } => failures
                .first()
                .map(|failure| &failure.error as &(dyn Error + 'static)),
            Self::OwnerMismatch { .. } => None,
        }
    }
}

impl From<ResolveError> for SyncError {
    fn from(value: ResolveError) -> Self {
        Self::Resolve(value)
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Reconciles the link graph with note bodies.
pub struct BacklinkService<N: NoteRepository, L: LinkRepository> {
    notes: N,
    links: L,
    options: SyncOptions,
}

impl<N: NoteRepository, L: LinkRepository> BacklinkService<N, L> {
    /// Creates a service with default options (stub creation enabled).
    pub fn new(notes: N, links: L) -> Self {
        Self {
            notes,
            links,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Makes the edges of `from_note` match the references in `body`.
    ///
    /// # Errors
    /// - [`SyncError::OwnerMismatch`] when `owner_id` does not own the note.
    /// - [`SyncError::Resolve`] when lookup or stub creation fails; existing
    ///   edges are kept.
    /// - [`SyncError::Partial`] when some inserts failed after the delete.
    pub fn synchronize_backlinks(
        &self,
        owner_id: &str,
        from_note: NoteId,
        body: &str,
    ) -> Result<SyncReport, SyncError> {
        let started_at = Instant::now();
        let Some(note) = self.notes.get_note(from_note)? else {
            info!("event=link_sync module=backlinks status=skipped reason=note_missing note_id={from_note}");
            return Ok(skipped_report(from_note));
        };
        if note.owner_id != owner_id {
            return Err(SyncError::OwnerMismatch {
                note: from_note,
                owner_id: owner_id.to_string(),
            });
        }

        let resolved = self.resolve_body(owner_id, body)?;
        let mut report = self.apply_links(from_note, &resolved.resolved)?;
        report.created_notes = resolved.created_notes;
        report.misses = resolved.misses;

        info!(
            "event=link_sync module=backlinks status=ok note_id={from_note} removed={} inserted={} created={} misses={} duration_ms={}",
            report.removed,
            report.inserted,
            report.created_notes.len(),
            report.misses.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Resolves every reference in `body` with one memoized pass.
    pub fn resolve_body(&self, owner_id: &str, body: &str) -> Result<ResolvedBody, ResolveError> {
        let resolver = NoteResolver::new(&self.notes);
        let options = ResolveOptions {
            create_if_missing: self.options.create_missing_notes,
        };
        let mut pass = ResolutionPass::new();
        let mut resolved_body = ResolvedBody::default();

        for reference in references(body) {
            let resolution =
                resolver.resolve_in_pass(&mut pass, owner_id, &reference.display_text, options)?;
            match resolution.note_id() {
                Some(to_note) => resolved_body.resolved.push(ResolvedReference {
                    to_note,
                    anchor_text: reference.display_text,
                }),
                None => {
                    if !resolved_body.misses.contains(&reference.display_text) {
                        resolved_body.misses.push(reference.display_text);
                    }
                }
            }
        }
        resolved_body.created_notes = pass.created_notes().to_vec();
        Ok(resolved_body)
    }

    /// Replaces the edges of `from_note` with an already resolved list.
    ///
    /// No-op when the note does not exist.
    pub fn replace_links(
        &self,
        from_note: NoteId,
        resolved: &[ResolvedReference],
    ) -> Result<SyncReport, SyncError> {
        if self.notes.get_note(from_note)?.is_none() {
            return Ok(skipped_report(from_note));
        }
        self.apply_links(from_note, resolved)
    }

    fn apply_links(
        &self,
        from_note: NoteId,
        resolved: &[ResolvedReference],
    ) -> Result<SyncReport, SyncError> {
        let links = distinct_links(from_note, resolved);
        let removed = self.links.delete_links_from(from_note)?;

        let mut inserted = 0;
        let mut failures = Vec::new();
        for link in links {
            match self.links.insert_link(&link) {
                Ok(()) => inserted += 1,
                Err(error) => {
                    warn!(
                        "event=link_insert module=backlinks status=error note_id={from_note} to_note={} error={error}",
                        link.to_note
                    );
                    failures.push(LinkInsertFailure { link, error });
                }
            }
        }

        if !failures.is_empty() {
            error!(
                "event=link_sync module=backlinks status=partial note_id={from_note} removed={removed} inserted={inserted} failed={}",
                failures.len()
            );
            return Err(SyncError::Partial {
                from_note,
                removed,
                inserted,
                failures,
            });
        }

        Ok(SyncReport {
            from_note,
            skipped: false,
            removed,
            inserted,
            created_notes: Vec::new(),
            misses: Vec::new(),
        })
    }
}

/// Deduplicates `(to_note, anchor_text)` pairs, keeping first occurrences.
pub fn distinct_links(from_note: NoteId, resolved: &[ResolvedReference]) -> Vec<NoteLink> {
    let mut seen = HashSet::new();
    resolved
        .iter()
        .filter(|reference| seen.insert((reference.to_note, reference.anchor_text.clone())))
        .map(|reference| NoteLink::new(from_note, reference.to_note, reference.anchor_text.as_str()))
        .collect()
}

fn skipped_report(from_note: NoteId) -> SyncReport {
    SyncReport {
        from_note,
        skipped: true,
        ..SyncReport::default()
    }
}
