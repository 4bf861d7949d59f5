//! Command-line probe over `wikinote_core`.
//!
//! # Responsibility
//! - Verify core linkage (`ping`).
//! - Run the reference extractor and quiz parser on a file and print JSON.
//! - Import a Markdown file as a note and synchronize its links.
//!
//! Output is one JSON document on stdout; failures go to stderr with exit
//! code 1 (runtime) or 2 (usage, including clap's argument errors).

use clap::{Parser, Subcommand};
use log::info;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use wikinote_core::db::open_db;
use wikinote_core::{
    derive_title, extract_references, parse_quiz_text, CoreConfig, LinkSyncStatus, NoteRepository,
    NoteService, SqliteLinkRepository, SqliteNoteRepository, TitleFilter,
};

/// Wikilink and quiz tooling over the wikinote store.
#[derive(Parser)]
#[command(name = "wikinote", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the core library is linked and report its version.
    Ping,
    /// Print the `[[...]]` references found in a Markdown file.
    Refs {
        file: PathBuf,
    },
    /// Parse a quiz text file and print questions and block errors.
    Quiz {
        file: PathBuf,
    },
    /// Import a Markdown file as a note and synchronize its links.
    ///
    /// An existing note with the same title (ignoring case) is updated;
    /// otherwise a new note is created.
    Sync {
        /// Database file; `-` uses WIKINOTE_DB_PATH or the default location
        db: String,
        /// Owner id the note belongs to
        owner: String,
        /// Note title; `-` derives it from the file's first heading or line
        title: String,
        file: PathBuf,
    },
}

enum CliError {
    Usage(String),
    Runtime(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = CoreConfig::from_env();
    if let Some(log_dir) = config.log_dir.as_ref().and_then(|dir| dir.to_str()) {
        if let Err(err) = wikinote_core::init_logging(&config.log_level, log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    match run(&config, cli.command) {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(CliError::Usage(message)) => {
            eprintln!("error: {message}");
            ExitCode::from(2)
        }
        Err(CliError::Runtime(message)) => {
            eprintln!("error: {message}");
            ExitCode::from(1)
        }
    }
}

fn run(config: &CoreConfig, command: Command) -> Result<Value, CliError> {
    match command {
        Command::Ping => Ok(json!({
            "ping": wikinote_core::ping(),
            "version": wikinote_core::core_version(),
        })),
        Command::Refs { file } => refs(&file),
        Command::Quiz { file } => quiz(&file),
        Command::Sync {
            db,
            owner,
            title,
            file,
        } => sync(config, &db, &owner, &title, &file),
    }
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|err| CliError::Runtime(format!("cannot read `{}`: {err}", path.display())))
}

fn runtime(err: impl std::fmt::Display) -> CliError {
    CliError::Runtime(err.to_string())
}

fn refs(file: &Path) -> Result<Value, CliError> {
    let body = read_file(file)?;
    let references = extract_references(&body);
    serde_json::to_value(references).map_err(runtime)
}

fn quiz(file: &Path) -> Result<Value, CliError> {
    let raw = read_file(file)?;
    let outcome = parse_quiz_text(&raw);
    let errors = outcome
        .errors
        .iter()
        .map(|error| json!({ "block": error.block_index, "line": error.line, "message": error.message() }))
        .collect::<Vec<_>>();
    Ok(json!({
        "blocks_found": outcome.blocks_found,
        "questions": outcome.questions,
        "errors": errors,
    }))
}

/// Upserts the note titled `title` (or the title derived from the file when
/// `title` is `-`) and synchronizes its links.
fn sync(
    config: &CoreConfig,
    db: &str,
    owner: &str,
    title: &str,
    file: &Path,
) -> Result<Value, CliError> {
    let body = read_file(file)?;
    let title = match title {
        "-" => derive_title(&body)
            .ok_or_else(|| {
            CliError::Usage(format!("cannot derive a title from `{}`", file.display()))
        })?,
        explicit => explicit.to_string(),
    };
    let db_path = match db {
        "-" => config.db_path.clone(),
        explicit => PathBuf::from(explicit),
    };

    let conn = open_db(&db_path).map_err(runtime)?;
    let notes = SqliteNoteRepository::try_new(&conn).map_err(runtime)?;
    let links = SqliteLinkRepository::try_new(&conn).map_err(runtime)?;

    let existing = notes
        .find_notes(owner, TitleFilter::Equals(&title), 1)
        .map_err(runtime)?;
    let service = NoteService::new(notes, links);
    let saved = match existing.first() {
        Some(summary) => service.save_note(owner, summary.uuid, None, &body),
        None => service.create_note(owner, &title, body.as_str(), None),
    }
    .map_err(runtime)?;

    info!(
        "event=cli_sync module=cli status=ok note_id={} created={}",
        saved.note.uuid,
        existing.is_empty()
    );
    let link_sync = match &saved.link_sync {
        LinkSyncStatus::Synced(report) => json!({
            "status": "synced",
            "skipped": report.skipped,
            "removed": report.removed,
            "inserted": report.inserted,
            "created_notes": report.created_notes.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "misses": report.misses,
        }),
        LinkSyncStatus::Failed(err) => json!({
            "status": "failed",
            "error": err.to_string(),
        }),
    };
    Ok(json!({
        "note_id": saved.note.uuid.to_string(),
        "title": saved.note.title,
        "created": existing.is_empty(),
        "link_sync": link_sync,
    }))
}
