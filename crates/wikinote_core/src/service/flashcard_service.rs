//! Flashcard import from pasted quiz text.
//!
//! # Invariants
//! - Only questions that passed validation are persisted.
//! - With `require_all_valid`, one bad block rejects the whole import and
//!   nothing is written.

use crate::model::note::NoteId;
use crate::quiz::parser::{parse_quiz_text, QuizParseError};
use crate::repo::flashcard_repo::{FlashcardRecord, FlashcardRepository};
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// How to treat partially valid input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportPolicy {
    /// Reject the whole import when any block fails.
    pub require_all_valid: bool,
}

/// Outcome of an accepted import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizImportReport {
    /// Ids of the stored flashcards, in source order.
    pub saved: Vec<Uuid>,
    /// Blocks that were skipped, or the top-level "no blocks" error.
    pub errors: Vec<QuizParseError>,
    pub blocks_found: usize,
}

#[derive(Debug)]
pub enum FlashcardServiceError {
    /// Import refused under `require_all_valid`.
    Rejected(Vec<QuizParseError>),
    /// Storage failed; cards listed in `saved` were already written.
    Repo { saved: Vec<Uuid>, source: RepoError },
}

impl Display for FlashcardServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(errors) => {
                write!(f, "quiz import rejected: {} invalid block(s)", errors.len())?;
                if let Some(first) = errors.first() {
                    write!(f, "; first: {first}")?;
                }
                Ok(())
            }
            Self::Repo { saved, source } => {
                write!(f, "{source} (after saving {} card(s))", saved.len())
            }
        }
    }
}

impl Error for FlashcardServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo { source, .. } => Some(source),
            Self::Rejected(_) => None,
        }
    }
}

/// Flashcard service facade.
pub struct FlashcardService<F: FlashcardRepository> {
    repo: F,
}

impl<F: FlashcardRepository> FlashcardService<F> {
    pub fn new(repo: F) -> Self {
        Self { repo }
    }

    /// Parses `raw` and stores its valid questions for `owner_id`.
    pub fn import_quiz_text(
        &self,
        owner_id: &str,
        deck_note: Option<NoteId>,
        raw: &str,
        policy: ImportPolicy,
    ) -> Result<QuizImportReport, FlashcardServiceError> {
        let outcome = parse_quiz_text(raw);
        if policy.require_all_valid && !outcome.errors.is_empty() {
            warn!(
                "event=quiz_import module=flashcards status=rejected blocks={} errors={}",
                outcome.blocks_found,
                outcome.errors.len()
            );
            return Err(FlashcardServiceError::Rejected(outcome.errors));
        }

        let mut saved = Vec::with_capacity(outcome.questions.len());
        for question in outcome.questions {
            let record = FlashcardRecord {
                owner_id: owner_id.to_string(),
                deck_note,
                question,
            };
            match self.repo.insert_flashcard(&record) {
                Ok(id) => saved.push(id),
                Err(source) => return Err(FlashcardServiceError::Repo { saved, source }),
            }
        }

        info!(
            "event=quiz_import module=flashcards status=ok blocks={} saved={} errors={}",
            outcome.blocks_found,
            saved.len(),
            outcome.errors.len()
        );
        Ok(QuizImportReport {
            saved,
            errors: outcome.errors,
            blocks_found: outcome.blocks_found,
        })
    }

    pub fn list_flashcards(
        &self,
        owner_id: &str,
        deck_note: Option<NoteId>,
    ) -> Result<Vec<FlashcardRecord>, RepoError> {
        self.repo.list_flashcards(owner_id, deck_note)
    }
}
