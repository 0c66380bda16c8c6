use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while emitting or reading back an artifact.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unsupported artifact {format} version {version} (expected {expected_format} version {expected_version})")]
    UnsupportedFormat {
        format: String,
        version: u32,
        expected_format: &'static str,
        expected_version: u32,
    },

    #[error("I/O error writing {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl From<serde_json::Error> for EmitError {
    fn from(err: serde_json::Error) -> Self {
        EmitError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EmitError>;
