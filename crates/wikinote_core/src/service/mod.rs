//! Use-case services over the repositories.
//!
//! # Responsibility
//! - Orchestrate reference resolution, link synchronization and imports.
//! - Keep callers decoupled from storage details.

pub mod backlink_service;
pub mod flashcard_service;
pub mod note_service;
pub mod resolver;
