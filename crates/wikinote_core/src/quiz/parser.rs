//! Line-oriented quiz text parser.
//!
//! Grammar, one construct per line (labels are case-insensitive and accepted
//! in English and Spanish):
//!
//! ```text
//! Question 1: What is the capital of France?
//! a) Madrid
//! b) Paris
//! Answer: b
//! ```
//!
//! A block runs from one question header to the next header or end of
//! input. Question text may span several lines, blank lines included, up to
//! the first option or answer line.
//!
//! # Invariants
//! - Each block is validated on its own; a bad block never hides the next.
//! - Input without any header yields one top-level error, not one per block.
//! - Block indexes in errors are 1-based, in header order.

use crate::model::quiz::{QuizOption, QuizQuestion, QuizValidationError, MIN_OPTIONS};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

static QUESTION_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:question|pregunta)\s+(\d+)\s*:(.*)$").expect("valid header regex")
});
static OPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z])\)\s*(\S.*)$").expect("valid option regex"));
static ANSWER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:answer|respuesta)\s*:(.*)$").expect("valid answer regex")
});

/// Why a block (or the whole input) was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QuizErrorKind {
    /// No line matched the question header pattern.
    NoQuestionBlocks,
    /// Header number does not fit an unsigned 32-bit integer.
    InvalidOrdinal(String),
    /// Block ended without an `Answer:` line.
    MissingAnswer,
    /// Block content violates a question invariant.
    Invalid(QuizValidationError),
}

impl Display for QuizErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoQuestionBlocks => write!(
                f,
                "no question blocks found; expected lines like `Question 1:`"
            ),
            Self::InvalidOrdinal(value) => write!(f, "invalid question number `{value}`"),
            Self::MissingAnswer => write!(f, "missing `Answer:` line"),
            Self::Invalid(err) => write!(f, "{err}"),
        }
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizParseError {
    /// 1-based block index; `None` for input-level errors.
    pub block_index: Option<usize>,
    /// 1-based line number of the block header, when there is one.
    pub line: Option<usize>,
    pub kind: QuizErrorKind,
}

impl QuizParseError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl Display for QuizParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.block_index, self.line) {
            (Some(block), Some(line)) => write!(f, "block {block} (line {line}): {}", self.kind),
            (Some(block), None) => write!(f, "block {block}: {}", self.kind),
            _ => write!(f, "{}", self.kind),
        }
    }
}

impl Error for QuizParseError {}

/// Result of parsing one pasted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuizParseOutcome {
    /// Valid questions in source order.
    pub questions: Vec<QuizQuestion>,
    pub errors: Vec<QuizParseError>,
    /// Number of question headers seen.
    pub blocks_found: usize,
}

impl QuizParseOutcome {
    /// True when at least one block was found and none failed.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.questions.is_empty()
    }
}

/// Parser position inside the current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Outside any block, or after a block's answer line.
    SeekQuestion,
    /// Collecting question text after a header.
    InQuestionBody,
    /// Collecting option lines.
    InOptions,
    /// Options ended with a blank line; waiting for the answer.
    SeekAnswer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuizLine<'a> {
    Header { ordinal: &'a str, rest: &'a str },
    Option { letter: char, text: &'a str },
    Answer(&'a str),
    /// Whitespace-only line, kept as written.
    Blank(&'a str),
    Text(&'a str),
}

fn classify(line: &str) -> QuizLine<'_> {
    if let Some(caps) = QUESTION_HEADER_RE.captures(line) {
        return QuizLine::Header {
            ordinal: caps.get(1).map_or("", |m| m.as_str()),
            rest: caps.get(2).map_or("", |m| m.as_str().trim()),
        };
    }
    if let Some(caps) = ANSWER_RE.captures(line) {
        return QuizLine::Answer(caps.get(1).map_or("", |m| m.as_str().trim()));
    }
    if let Some(caps) = OPTION_RE.captures(line) {
        let letter = caps
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .map(|c| c.to_ascii_lowercase());
        if let Some(letter) = letter {
            return QuizLine::Option {
                letter,
                text: caps.get(2).map_or("", |m| m.as_str().trim_end()),
            };
        }
    }
    if line.trim().is_empty() {
        QuizLine::Blank(line)
    } else {
        QuizLine::Text(line)
    }
}

/// Single-pass cursor over input lines.
struct LineCursor<'a> {
    lines: Vec<&'a str>,
    index: usize,
}

impl<'a> LineCursor<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            lines: raw.lines().collect(),
            index: 0,
        }
    }

    fn peek(&self) -> Option<QuizLine<'a>> {
        self.lines.get(self.index).copied().map(classify)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    /// 1-based number of the line returned by the last `peek`.
    fn line_number(&self) -> usize {
        self.index + 1
    }
}

#[derive(Debug)]
struct BlockDraft<'a> {
    index: usize,
    header_line: usize,
    ordinal: &'a str,
    question_lines: Vec<&'a str>,
    options: Vec<QuizOption>,
    duplicate_letter: Option<char>,
    answer: Option<&'a str>,
}

impl<'a> BlockDraft<'a> {
    fn new(index: usize, header_line: usize, ordinal: &'a str, rest: &'a str) -> Self {
        let first = rest.trim();
        Self {
            index,
            header_line,
            ordinal,
            question_lines: if first.is_empty() { Vec::new() } else { vec![first] },
            options: Vec::new(),
            duplicate_letter: None,
            answer: None,
        }
    }

    fn push_option(&mut self, letter: char, text: &str) {
        if self.options.iter().any(|option| option.letter == letter) {
            self.duplicate_letter.get_or_insert(letter);
            return;
        }
        self.options.push(QuizOption {
            letter,
            text: text.to_string(),
        });
    }

    fn continue_option(&mut self, text: &str) {
        if let Some(last) = self.options.last_mut() {
            last.text.push('\n');
            last.text.push_str(text.trim());
        }
    }

    fn question_text(&self) -> String {
        let is_blank = |line: &&str| line.trim().is_empty();
        let Some(first) = self.question_lines.iter().position(|l| !is_blank(l)) else {
            return String::new();
        };
        let last = self
            .question_lines
            .iter()
            .rposition(|l| !is_blank(l))
            .unwrap_or(first);
        self.question_lines[first..=last].join("\n")
    }

    fn finish(self) -> Result<QuizQuestion, QuizErrorKind> {
        let ordinal = self
            .ordinal
            .parse::<u32>()
            .map_err(|_| QuizErrorKind::InvalidOrdinal(self.ordinal.to_string()))?;
        let question = self.question_text();
        if question.is_empty() {
            return Err(QuizErrorKind::Invalid(QuizValidationError::EmptyQuestion));
        }
        if let Some(letter) = self.duplicate_letter {
            return Err(QuizErrorKind::Invalid(
                QuizValidationError::DuplicateOptionLetter(letter),
            ));
        }
        if self.options.len() < MIN_OPTIONS {
            return Err(QuizErrorKind::Invalid(QuizValidationError::TooFewOptions {
                found: self.options.len(),
            }));
        }
        let answer = self.answer.ok_or(QuizErrorKind::MissingAnswer)?;
        let letters = parse_answer_letters(answer).map_err(QuizErrorKind::Invalid)?;
        QuizQuestion::new(ordinal, question, self.options, letters).map_err(QuizErrorKind::Invalid)
    }
}

/// Splits an answer remainder like ` B, c ` into `['b', 'c']`.
fn parse_answer_letters(answer: &str) -> Result<Vec<char>, QuizValidationError> {
    let mut letters = Vec::new();
    for token in answer.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let token = token.to_lowercase();
        let mut chars = token.chars();
        let letter = match (chars.next(), chars.next()) {
            (Some(letter), None) => letter,
            _ => return Err(QuizValidationError::UnknownAnswerLetter(token)),
        };
        if !letters.contains(&letter) {
            letters.push(letter);
        }
    }
    if letters.is_empty() {
        return Err(QuizValidationError::NoCorrectAnswer);
    }
    Ok(letters)
}

/// Parses pasted quiz text into questions and per-block errors.
pub fn parse_quiz_text(raw: &str) -> QuizParseOutcome {
    let mut outcome = QuizParseOutcome::default();
    let mut cursor = LineCursor::new(raw);
    let mut state = ParseState::SeekQuestion;
    let mut block: Option<BlockDraft<'_>> = None;

    while let Some(line) = cursor.peek() {
        if let QuizLine::Header { ordinal, rest } = line {
            close_block(&mut outcome, block.take());
            outcome.blocks_found += 1;
            block = Some(BlockDraft::new(
                outcome.blocks_found,
                cursor.line_number(),
                ordinal,
                rest,
            ));
            state = ParseState::InQuestionBody;
            cursor.advance();
            continue;
        }

        let Some(draft) = block.as_mut() else {
            cursor.advance();
            continue;
        };

        state = match (state, line) {
            (ParseState::SeekQuestion, _) => ParseState::SeekQuestion,
            (_, QuizLine::Answer(rest)) => {
                draft.answer = Some(rest);
                close_block(&mut outcome, block.take());
                ParseState::SeekQuestion
            }
            (_, QuizLine::Option { letter, text }) => {
                draft.push_option(letter, text);
                ParseState::InOptions
            }
            (ParseState::InQuestionBody, QuizLine::Blank(raw)) => {
                draft.question_lines.push(raw);
                ParseState::InQuestionBody
            }
            (ParseState::InQuestionBody, QuizLine::Text(text)) => {
                draft.question_lines.push(text);
                ParseState::InQuestionBody
            }
            (ParseState::InOptions, QuizLine::Blank(_)) => ParseState::SeekAnswer,
            (ParseState::InOptions, QuizLine::Text(text)) => {
                draft.continue_option(text);
                ParseState::InOptions
            }
            (ParseState::SeekAnswer, _) => ParseState::SeekAnswer,
            (current, QuizLine::Header { .. }) => current,
        };
        cursor.advance();
    }
    close_block(&mut outcome, block.take());

    if outcome.blocks_found == 0 {
        outcome.errors.push(QuizParseError {
            block_index: None,
            line: None,
            kind: QuizErrorKind::NoQuestionBlocks,
        });
    }
    outcome
}

fn close_block(outcome: &mut QuizParseOutcome, block: Option<BlockDraft<'_>>) {
    let Some(draft) = block else {
        return;
    };
    let block_index = draft.index;
    let header_line = draft.header_line;
    match draft.finish() {
        Ok(question) => outcome.questions.push(question),
        Err(kind) => outcome.errors.push(QuizParseError {
            block_index: Some(block_index),
            line: Some(header_line),
            kind,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, parse_quiz_text, QuizErrorKind, QuizLine};
    use crate::model::quiz::QuizValidationError;

    #[test]
    fn spanish_sample_yields_one_question() {
        let raw = "Pregunta 1: ¿Cuál es la capital de Francia?\n\
                   a) Madrid\n\
                   b) París\n\
                   Respuesta: b\n";
        let outcome = parse_quiz_text(raw);
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.questions.len(), 1);
        let question = &outcome.questions[0];
        assert_eq!(question.ordinal, 1);
        assert_eq!(question.question, "¿Cuál es la capital de Francia?");
        assert_eq!(question.options.len(), 2);
        assert_eq!(question.options[1].text, "París");
        assert_eq!(question.correct_answers, vec!['b']);
    }

    #[test]
    fn unknown_answer_letter_fails_block_one() {
        let raw = "Pregunta 1: ¿Capital?\na) Madrid\nb) París\nRespuesta: z\n";
        let outcome = parse_quiz_text(raw);
        assert!(outcome.questions.is_empty());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].block_index, Some(1));
        assert_eq!(
            outcome.errors[0].kind,
            QuizErrorKind::Invalid(QuizValidationError::UnknownAnswerLetter("z".to_string()))
        );
        assert!(outcome.errors[0].message().contains("block 1"));
    }

    #[test]
    fn input_without_headers_reports_single_top_level_error() {
        let outcome = parse_quiz_text("a) one\nb) two\nAnswer: a\n\nAnswer: b\n");
        assert!(outcome.questions.is_empty());
        assert_eq!(outcome.blocks_found, 0);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].block_index, None);
        assert_eq!(outcome.errors[0].kind, QuizErrorKind::NoQuestionBlocks);
        assert!(!outcome.is_clean());
    }

    #[test]
    fn multi_line_question_keeps_internal_line_breaks() {
        let raw = "Question 3: What does this print?\n\
                   \n\
                   fn main() {\n    println!(\"hi\");\n}\n\
                   \n\
                   a) hi\n\
                   b) nothing\n\
                   Answer: a\n";
        let outcome = parse_quiz_text(raw);
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(
            outcome.questions[0].question,
            "What does this print?\n\nfn main() {\n    println!(\"hi\");\n}"
        );
    }

    #[test]
    fn failing_block_does_not_stop_later_blocks() {
        let raw = "preamble is discarded\n\
                   Question 1: only one option\n\
                   a) lonely\n\
                   Answer: a\n\
                   Question 2: duplicate letters\n\
                   a) x\n\
                   A) y\n\
                   Answer: a\n\
                   Question 3: no answer\n\
                   a) x\n\
                   b) y\n\
                   Question 7: good one\n\
                   a) x\n\
                   b) y\n\
                   c) z\n\
                   ANSWER: C, a, c\n";
        let outcome = parse_quiz_text(raw);
        assert_eq!(outcome.blocks_found, 4);
        assert_eq!(outcome.questions.len(), 1);
        assert_eq!(outcome.questions[0].ordinal, 7);
        assert_eq!(outcome.questions[0].correct_answers, vec!['c', 'a']);

        let kinds = outcome
            .errors
            .iter()
            .map(|err| (err.block_index, err.kind.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                (
                    Some(1),
                    QuizErrorKind::Invalid(QuizValidationError::TooFewOptions { found: 1 })
                ),
                (
                    Some(2),
                    QuizErrorKind::Invalid(QuizValidationError::DuplicateOptionLetter('a'))
                ),
                (Some(3), QuizErrorKind::MissingAnswer),
            ]
        );
        assert_eq!(outcome.errors[1].line, Some(5));
    }

    #[test]
    fn empty_question_and_empty_answer_are_rejected() {
        let outcome = parse_quiz_text("Question 1:\n\na) x\nb) y\nAnswer: a\nQuestion 2: q\na) x\nb) y\nAnswer: , \n");
        assert_eq!(
            outcome.errors[0].kind,
            QuizErrorKind::Invalid(QuizValidationError::EmptyQuestion)
        );
        assert_eq!(
            outcome.errors[1].kind,
            QuizErrorKind::Invalid(QuizValidationError::NoCorrectAnswer)
        );
    }

    #[test]
    fn options_continue_across_lines_and_blank_line_waits_for_answer() {
        let raw = "Question 1: pick\n\
                   a) first\n   wrapped\n\
                   b) second\n\
                   \n\
                   some stray note\n\
                   Answer: a\n\
                   trailing text is ignored\n";
        let outcome = parse_quiz_text(raw);
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        let question = &outcome.questions[0];
        assert_eq!(question.options[0].text, "first\nwrapped");
        assert_eq!(question.options[1].text, "second");
    }

    #[test]
    fn oversized_ordinal_is_reported() {
        let outcome = parse_quiz_text("Question 99999999999: q\na) x\nb) y\nAnswer: a\n");
        assert_eq!(
            outcome.errors[0].kind,
            QuizErrorKind::InvalidOrdinal("99999999999".to_string())
        );
    }

    #[test]
    fn ordinal_range_ends_at_u32_max() {
        let largest = parse_quiz_text("Question 4294967295: q\na) x\nb) y\nAnswer: a\n");
        assert!(largest.errors.is_empty(), "{:?}", largest.errors);
        assert_eq!(largest.questions[0].ordinal, u32::MAX);

        let past_end = parse_quiz_text("Question 4294967296: q\na) x\nb) y\nAnswer: a\n");
        assert!(past_end.questions.is_empty());
        assert_eq!(
            past_end.errors[0].kind,
            QuizErrorKind::InvalidOrdinal("4294967296".to_string())
        );
    }

    #[test]
    fn whitespace_only_question_lines_are_kept_verbatim() {
        let outcome = parse_quiz_text("Question 1: first\n    \nsecond\na) x\nb) y\nAnswer: b\n");
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.questions[0].question, "first\n    \nsecond");
    }

    #[test]
    fn classify_recognizes_each_line_kind() {
        assert!(matches!(
            classify("  QUESTION 12 : tail"),
            QuizLine::Header { ordinal: "12", rest: "tail" }
        ));
        assert!(matches!(classify("B) Paris "), QuizLine::Option { letter: 'b', text: "Paris" }));
        assert!(matches!(classify("respuesta: a,b"), QuizLine::Answer("a,b")));
        assert!(matches!(classify("a)   "), QuizLine::Text(_)));
        assert!(matches!(classify("   "), QuizLine::Blank("   ")));
    }
}
