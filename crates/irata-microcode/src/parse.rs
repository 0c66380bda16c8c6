//! Loading of microcode and hardware documents (`.toml` or `.json`).

use std::path::Path;

use serde::de::DeserializeOwned;

use irata_isa::DocumentFormat;

use crate::document::MicrocodeDocument;
use crate::error::{MicrocodeError, Result};
use crate::topology::HardwareDocument;

/// Load a microcode document from disk.
pub fn load_microcode(path: &Path) -> Result<MicrocodeDocument> {
    load(path)
}

/// Load a hardware description from disk.
pub fn load_hardware(path: &Path) -> Result<HardwareDocument> {
    load(path)
}

pub fn parse_microcode(content: &str, format: DocumentFormat) -> Result<MicrocodeDocument> {
    parse(content, format)
}

pub fn parse_hardware(content: &str, format: DocumentFormat) -> Result<HardwareDocument> {
    parse(content, format)
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(MicrocodeError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        MicrocodeError::schema(
            path.display().to_string(),
            "unsupported document extension (expected .toml or .json)",
        )
    })?;
    let content = std::fs::read_to_string(path).map_err(|err| MicrocodeError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    parse(&content, format)
}

fn parse<T: DeserializeOwned>(content: &str, format: DocumentFormat) -> Result<T> {
    let document = match format {
        DocumentFormat::Toml => toml::from_str(content)?,
        DocumentFormat::Json => serde_json::from_str(content)?,
    };
    Ok(document)
}
