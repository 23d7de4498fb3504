use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarvestError>;

/// Failures reported by a remote page source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The server-side cursor lease is gone. Harvesting stops at a clean checkpoint.
    #[error("cursor lease expired")]
    Expired,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected response from source: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Protocol(err.to_string())
        } else {
            SourceError::Transport(err.to_string())
        }
    }
}

/// Error type for harvesting, persistence and keyword artifacts.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CBOR error: {0}")]
    Cbor(#[from] serde_cbor::Error),
    #[error("required artifact not found: {}", path.display())]
    MissingArtifact { path: PathBuf },
    #[error("corrupted state at {}: {details}", path.display())]
    Corruption { path: PathBuf, details: String },
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HarvestError {
    pub fn missing(path: impl Into<PathBuf>) -> Self {
        HarvestError::MissingArtifact { path: path.into() }
    }

    pub fn corruption(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        HarvestError::Corruption {
            path: path.into(),
            details: details.into(),
        }
    }
}
