// Error types for herd.
// Handles subprocess failures, cache errors, and general application errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HerdError {
    #[error("command `{command}` exited with code {code}")]
    Command {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("cache key not found: {0}")]
    KeyNotFound(String),

    #[error("could not determine a home directory for config/cache files")]
    MissingProjectDirs,

    #[error("invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, HerdError>;
