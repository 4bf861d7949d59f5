//! Core domain logic for wikinote.
//! Wikilink resolution, backlink graph synchronization and quiz text import.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod quiz;
pub mod repo;
pub mod service;
pub mod wikilink;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::link::{Backlink, NoteLink};
pub use model::note::{derive_title, Note, NoteId, NoteValidationError};
pub use model::quiz::{QuizOption, QuizQuestion, QuizValidationError};
pub use quiz::parser::{parse_quiz_text, QuizErrorKind, QuizParseError, QuizParseOutcome};
pub use repo::flashcard_repo::{FlashcardRecord, FlashcardRepository, SqliteFlashcardRepository};
pub use repo::link_repo::{LinkRepository, SqliteLinkRepository};
pub use repo::note_repo::{
    NoteListQuery, NoteRepository, NoteSummary, SqliteNoteRepository, TitleFilter,
};
pub use repo::{RepoError, RepoResult};
pub use service::backlink_service::{
    BacklinkService, LinkInsertFailure, ResolvedReference, SyncError, SyncOptions, SyncReport,
};
pub use service::flashcard_service::{
    FlashcardService, FlashcardServiceError, ImportPolicy, QuizImportReport,
};
pub use service::note_service::{
    LinkSyncStatus, NoteService, NoteServiceError, NotesListResult, SavedNote,
};
pub use service::resolver::{
    NoteResolver, Resolution, ResolutionPass, ResolveError, ResolveOptions,
};
pub use wikilink::extract::{extract_references, references, Reference};

/// Minimal health-check API for embedding shells.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
