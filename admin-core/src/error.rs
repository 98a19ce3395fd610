//! Custom error types for the admin core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Source not found: {0}")]
    SourceMissing(String),

    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("No matching files: {0}")]
    NoMatchingFiles(String),

    #[error("No artifact found: {0}")]
    NoArtifact(String),

    #[error("No backups available: {0}")]
    NoBackupsAvailable(String),

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Extraction failed: {0}")]
    ExtractFailure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid model entry: {0}")]
    InvalidModel(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Process control error: {0}")]
    Process(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AdminError>;
