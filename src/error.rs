//! Error types shared across the uploader.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures talking to the remote file-storage endpoint.
///
/// The upload manager does not branch on the variant: any of these turns the
/// affected task into `TaskStatus::Error` carrying the display text.
#[derive(Debug, Clone, Error)]
pub enum TransferError {
    #[error("Upload failed due to network error: {0}")]
    Network(String),

    #[error("Upload failed with status {0}")]
    Status(u16),

    #[error("Failed to parse upload response: {0}")]
    MalformedResponse(String),

    #[error("Upload was aborted")]
    Aborted,

    #[error("Failed to delete {} of {total} files: {}", .failed.len(), .failed.join(", "))]
    PartialDelete { failed: Vec<String>, total: usize },

    #[error("Failed to build request: {0}")]
    Client(String),

    #[error("Failed to read local file: {0}")]
    Read(String),
}

impl From<reqwest::Error> for TransferError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            TransferError::Status(status.as_u16())
        } else if e.is_decode() {
            TransferError::MalformedResponse(e.to_string())
        } else if e.is_builder() {
            TransferError::Client(e.to_string())
        } else {
            TransferError::Network(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to read session file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write session file {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Failed to read file {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
}
