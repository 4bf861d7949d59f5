//! Reference extraction from note bodies.
//!
//! A reference is any `[[text]]` span whose inner text contains no brackets.
//! Matching is non-overlapping and left to right, like a regex scan, so an
//! unmatched `[[` never produces a reference and `[[A]][[B]]` yields both.
//!
//! # Invariants
//! - References come out in strictly increasing `start` order.
//! - Display text is trimmed and never empty.
//! - Offsets are UTF-8 byte offsets into the scanned body.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

static WIKILINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\[\]]*)\]\]").expect("valid wikilink regex"));

/// One `[[...]]` marker found in a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Inner text, trimmed.
    pub display_text: String,
    /// Byte offset of the opening `[[` (inclusive).
    pub start: usize,
    /// Byte offset just past the closing `]]` (exclusive).
    pub end: usize,
}

impl Reference {
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Lazy scan over the references of one body.
///
/// Cloning the iterator, or calling [`references`] again, restarts the scan.
#[derive(Debug, Clone)]
pub struct References<'a> {
    body: &'a str,
    pos: usize,
}

impl Iterator for References<'_> {
    type Item = Reference;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.body.len() {
            let caps = WIKILINK_RE.captures_at(self.body, self.pos)?;
            let whole = caps.get(0)?;
            self.pos = whole.end();

            let display_text = caps.get(1).map_or("", |m| m.as_str()).trim();
            if display_text.is_empty() {
                continue;
            }
            return Some(Reference {
                display_text: display_text.to_string(),
                start: whole.start(),
                end: whole.end(),
            });
        }
        None
    }
}

/// Returns a lazy iterator over the references in `body`.
pub fn references(body: &str) -> References<'_> {
    References { body, pos: 0 }
}

/// Collects every reference in `body`, in source order.
pub fn extract_references(body: &str) -> Vec<Reference> {
    references(body).collect()
}
