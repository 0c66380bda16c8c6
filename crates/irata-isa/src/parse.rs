//! Loading of instruction-set documents.
//!
//! Documents are TOML (`.toml`) or JSON (`.json`); the format is chosen from the file
//! extension. Field-level checks happen during deserialization, so anything that gets
//! past this module has the right shape.

use std::path::Path;

use crate::document::IsaDocument;
use crate::error::{IsaError, Result};

/// On-disk encoding of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(DocumentFormat::Toml),
            "json" => Some(DocumentFormat::Json),
            _ => None,
        }
    }
}

/// Load an ISA document from a `.toml` or `.json` file.
pub fn load_isa(path: &Path) -> Result<IsaDocument> {
    if !path.exists() {
        return Err(IsaError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        IsaError::schema(
            path.display().to_string(),
            "unsupported document extension (expected .toml or .json)",
        )
    })?;
    let content = std::fs::read_to_string(path).map_err(|err| IsaError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    parse_isa(&content, format)
}

/// Parse an ISA document from a string.
pub fn parse_isa(content: &str, format: DocumentFormat) -> Result<IsaDocument> {
    let document = match format {
        DocumentFormat::Toml => toml::from_str(content)?,
        DocumentFormat::Json => serde_json::from_str(content)?,
    };
    Ok(document)
}
