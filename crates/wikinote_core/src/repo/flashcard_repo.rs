//! Flashcard persistence for imported quiz questions.
//!
//! # Invariants
//! - A flashcard and its options are written in one transaction.
//! - Questions are validated before insertion and again on read.
//! - Correct answers are stored as a comma-separated letter list.

use crate::model::note::NoteId;
use crate::model::quiz::{QuizOption, QuizQuestion};
use crate::repo::{ensure_tables, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection};
use uuid::Uuid;

/// A question stored as a flashcard for one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardRecord {
    pub owner_id: String,
    /// Note the card belongs to, when imported into a deck note.
    pub deck_note: Option<NoteId>,
    pub question: QuizQuestion,
}

/// Store operations on flashcards.
pub trait FlashcardRepository {
    /// Inserts the card and its options; returns the card id.
    fn insert_flashcard(&self, record: &FlashcardRecord) -> RepoResult<Uuid>;
    /// Lists an owner's cards in insertion order, optionally for one deck.
    fn list_flashcards(
        &self,
        owner_id: &str,
        deck_note: Option<NoteId>,
    ) -> RepoResult<Vec<FlashcardRecord>>;
}

/// SQLite-backed flashcard repository.
#[derive(Clone, Copy)]
pub struct SqliteFlashcardRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFlashcardRepository<'conn> {
    /// Wraps a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["flashcards", "flashcard_options"])?;
        Ok(Self { conn })
    }
}

impl FlashcardRepository for SqliteFlashcardRepository<'_> {
    fn insert_flashcard(&self, record: &FlashcardRecord) -> RepoResult<Uuid> {
        let question = &record.question;
        question.validate()?;

        let card_id = question.id.to_string();
        let answers = question
            .correct_answers
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO flashcards (uuid, owner_id, deck_note, ordinal, question, correct_answers)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                card_id.as_str(),
                record.owner_id.as_str(),
                record.deck_note.map(|id| id.to_string()),
                i64::from(question.ordinal),
                question.question.as_str(),
                answers,
            ],
        )?;
        for (position, option) in question.options.iter().enumerate() {
            tx.execute(
                "INSERT INTO flashcard_options (flashcard_uuid, position, letter, option_text)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    card_id.as_str(),
                    position as i64,
                    option.letter.to_string(),
                    option.text.as_str(),
                ],
            )?;
        }
        tx.commit()?;

        Ok(question.id)
    }

    fn list_flashcards(
        &self,
        owner_id: &str,
        deck_note: Option<NoteId>,
    ) -> RepoResult<Vec<FlashcardRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, deck_note, ordinal, question, correct_answers
             FROM flashcards
             WHERE owner_id = ?1
               AND (?2 IS NULL OR deck_note = ?2)
             ORDER BY created_at ASC, rowid ASC;",
        )?;

        let mut rows = stmt.query(params![owner_id, deck_note.map(|id| id.to_string())])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get("uuid")?;
            let deck_note = match row.get::<_, Option<String>>("deck_note")? {
                Some(value) => Some(parse_uuid(&value, "flashcards.deck_note")?),
                None => None,
            };
            let ordinal = row.get::<_, i64>("ordinal")?;
            let answers: String = row.get("correct_answers")?;

            let question = QuizQuestion {
                id: parse_uuid(&uuid_text, "flashcards.uuid")?,
                ordinal: u32::try_from(ordinal).map_err(|_| {
                    RepoError::InvalidData(format!("invalid ordinal `{ordinal}` in flashcards"))
                })?,
                question: row.get("question")?,
                options: load_options(self.conn, &uuid_text)?,
                correct_answers: parse_letters(&answers)?,
            };
            question.validate()?;
            records.push(FlashcardRecord {
                owner_id: owner_id.to_string(),
                deck_note,
                question,
            });
        }
        Ok(records)
    }
}

fn load_options(conn: &Connection, card_id: &str) -> RepoResult<Vec<QuizOption>> {
    let mut stmt = conn.prepare(
        "SELECT letter, option_text
         FROM flashcard_options
         WHERE flashcard_uuid = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([card_id])?;
    let mut options = Vec::new();
    while let Some(row) = rows.next()? {
        let letter: String = row.get(0)?;
        options.push(QuizOption {
            letter: single_letter(&letter)?,
            text: row.get(1)?,
        });
    }
    Ok(options)
}

fn parse_letters(value: &str) -> RepoResult<Vec<char>> {
    value
        .split(',')
        .filter(|token| !token.is_empty())
        .map(single_letter)
        .collect()
}

fn single_letter(value: &str) -> RepoResult<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) => Ok(letter),
        _ => Err(RepoError::InvalidData(format!(
            "invalid option letter `{value}` in flashcards"
        ))),
    }
}
