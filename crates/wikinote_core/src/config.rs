//! Runtime configuration for embedding processes (CLI, app shells).
//!
//! Values come from the environment with build-mode defaults:
//!
//! | Variable            | Default                                  |
//! |---------------------|------------------------------------------|
//! | `WIKINOTE_DB_PATH`  | `<temp dir>/wikinote.sqlite3`            |
//! | `WIKINOTE_LOG_LEVEL`| [`default_log_level`]                    |
//! | `WIKINOTE_LOG_DIR`  | unset: logging stays off                 |

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "WIKINOTE_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "WIKINOTE_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "WIKINOTE_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "wikinote.sqlite3";

/// Resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging is enabled only when a directory is configured.
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; blank values count as
    /// unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        Self {
            db_path: value(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)),
            log_level: value(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: value(LOG_DIR_ENV).map(PathBuf::from),
        }
    }
}
