//! Quiz text import.
//!
//! Turns free-form pasted text into validated multiple-choice questions.
//! Parsing never fails as a whole: malformed blocks are reported next to
//! the questions that did parse.

pub mod parser;
