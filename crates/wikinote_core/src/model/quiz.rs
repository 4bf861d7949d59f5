//! Multiple-choice question records produced by the quiz text parser.
//!
//! # Invariants
//! - At least two options, with letters unique within the question.
//! - At least one correct answer, and every correct answer letter is an
//!   option letter.
//! - Option and answer letters are stored lower-cased.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Minimum number of options in a valid question.
pub const MIN_OPTIONS: usize = 2;

/// One lettered choice, e.g. `b) Paris`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub letter: char,
    pub text: String,
}

/// A validated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// Synthetic id, generated when the question is built.
    pub id: Uuid,
    /// Number as declared in the source (`Question 7:`); may repeat or skip.
    pub ordinal: u32,
    /// Question text, possibly spanning several lines.
    pub question: String,
    /// Options in source order.
    pub options: Vec<QuizOption>,
    /// Correct letters in declared order, without repeats.
    pub correct_answers: Vec<char>,
}

/// Violations of the [`QuizQuestion`] invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizValidationError {
    EmptyQuestion,
    TooFewOptions { found: usize },
    DuplicateOptionLetter(char),
    NoCorrectAnswer,
    UnknownAnswerLetter(String),
}

impl Display for QuizValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyQuestion => write!(f, "question text is empty"),
            Self::TooFewOptions { found } => write!(
                f,
                "expected at least {MIN_OPTIONS} options, found {found}"
            ),
            Self::DuplicateOptionLetter(letter) => {
                write!(f, "option letter `{letter}` is used more than once")
            }
            Self::NoCorrectAnswer => write!(f, "answer line lists no letters"),
            Self::UnknownAnswerLetter(letter) => {
                write!(f, "answer `{letter}` does not match any option letter")
            }
        }
    }
}

impl Error for QuizValidationError {}

impl QuizQuestion {
    /// Builds and validates a question with a fresh id.
    pub fn new(
        ordinal: u32,
        question: impl Into<String>,
        options: Vec<QuizOption>,
        correct_answers: Vec<char>,
    ) -> Result<Self, QuizValidationError> {
        let question = Self {
            id: Uuid::new_v4(),
            ordinal,
            question: question.into(),
            options,
            correct_answers,
        };
        question.validate()?;
        Ok(question)
    }

    /// Checks the record invariants.
    pub fn validate(&self) -> Result<(), QuizValidationError> {
        if self.question.trim().is_empty() {
            return Err(QuizValidationError::EmptyQuestion);
        }
        if self.options.len() < MIN_OPTIONS {
            return Err(QuizValidationError::TooFewOptions {
                found: self.options.len(),
            });
        }
        for (idx, option) in self.options.iter().enumerate() {
            if self.options[..idx]
                .iter()
                .any(|prior| prior.letter == option.letter)
            {
                return Err(QuizValidationError::DuplicateOptionLetter(option.letter));
            }
        }
        if self.correct_answers.is_empty() {
            return Err(QuizValidationError::NoCorrectAnswer);
        }
        if let Some(unknown) = self
            .correct_answers
            .iter()
            .find(|letter| self.option(**letter).is_none())
        {
            return Err(QuizValidationError::UnknownAnswerLetter(unknown.to_string()));
        }
        Ok(())
    }

    /// Looks up an option by letter (case-insensitive).
    pub fn option(&self, letter: char) -> Option<&QuizOption> {
        let wanted = letter.to_ascii_lowercase();
        self.options.iter().find(|option| option.letter == wanted)
    }

    /// Returns whether the given letter set is exactly the correct set.
    pub fn is_correct(&self, letters: &[char]) -> bool {
        let mut given = letters
            .iter()
            .map(char::to_ascii_lowercase)
            .collect::<Vec<_>>();
        given.sort_unstable();
        given.dedup();
        let mut expected = self.correct_answers.clone();
        expected.sort_unstable();
        given == expected
    }
}

#[cfg(test)]
mod tests {
    use super::{QuizOption, QuizQuestion, QuizValidationError};

    fn options(letters: &[char]) -> Vec<QuizOption> {
        letters
            .iter()
            .map(|letter| QuizOption {
                letter: *letter,
                text: format!("option {letter}"),
            })
            .collect()
    }

    #[test]
    fn new_accepts_valid_question_and_checks_answers() {
        let question = QuizQuestion::new(1, "2 + 2?", options(&['a', 'b', 'c']), vec!['b', 'c'])
            .expect("question should be valid");
        assert!(question.is_correct(&['C', 'b']));
        assert!(!question.is_correct(&['b']));
        assert_eq!(question.option('A').map(|o| o.text.as_str()), Some("option a"));
    }

    #[test]
    fn validate_reports_each_invariant() {
        assert_eq!(
            QuizQuestion::new(1, "  ", options(&['a', 'b']), vec!['a']).unwrap_err(),
            QuizValidationError::EmptyQuestion
        );
        assert_eq!(
            QuizQuestion::new(1, "q", options(&['a']), vec!['a']).unwrap_err(),
            QuizValidationError::TooFewOptions { found: 1 }
        );
        assert_eq!(
            QuizQuestion::new(1, "q", options(&['a', 'a']), vec!['a']).unwrap_err(),
            QuizValidationError::DuplicateOptionLetter('a')
        );
        assert_eq!(
            QuizQuestion::new(1, "q", options(&['a', 'b']), vec![]).unwrap_err(),
            QuizValidationError::NoCorrectAnswer
        );
        assert_eq!(
            QuizQuestion::new(1, "q", options(&['a', 'b']), vec!['z']).unwrap_err(),
            QuizValidationError::UnknownAnswerLetter("z".to_string())
        );
    }
}
