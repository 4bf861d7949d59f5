//! Inline `[[...]]` reference scanning.
//!
//! # Responsibility
//! - Find reference markers in note bodies without touching storage.
//!
//! # Invariants
//! - Scanning is a pure function of the body text.

pub mod extract;
