//! Directed link graph edges between notes.
//!
//! # Invariants
//! - An edge is identified by `(from_note, to_note, anchor_text)`; the same
//!   triple is never stored twice.
//! - Several edges may connect the same pair when anchor texts differ.
//! - Edges are only written by backlink synchronization of `from_note`.

use crate::model::note::NoteId;
use serde::{Deserialize, Serialize};

/// One persisted `from_note -> to_note` edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteLink {
    pub from_note: NoteId,
    pub to_note: NoteId,
    /// Reference text exactly as written in the source body.
    pub anchor_text: String,
}

impl NoteLink {
    pub fn new(from_note: NoteId, to_note: NoteId, anchor_text: impl Into<String>) -> Self {
        Self {
            from_note,
            to_note,
            anchor_text: anchor_text.into(),
        }
    }
}

/// Incoming edge joined with the linking note's title, for "linked from" views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backlink {
    pub from_note: NoteId,
    pub from_title: String,
    pub anchor_text: String,
}
