use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutopushError {
    #[error("Repository path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Repository path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Git error: {0}")]
    GitError(String),

    #[error("GitHub CLI error: {0}")]
    GhError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to register signal handler: {0}")]
    SignalHandler(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, AutopushError>;
