//! Domain records shared by the link engine, the quiz parser and storage.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId`.
//! - Notes are soft-deleted by the store; the core never hard-deletes them.

pub mod link;
pub mod note;
pub mod quiz;
