//! Serialization, hashing and atomic output of the IR artifact.
//!
//! The encoding is pretty-printed JSON with a trailing newline. Output is staged in a
//! temporary file beside the destination and only renamed into place once fully written,
//! so readers never observe a partial artifact.

use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use sha2::{Digest, Sha256};

use irata_isa::IsaModel;
use irata_microcode::{HardwareTopology, InstructionSet};

use crate::artifact::{IrArtifact, FORMAT_NAME, FORMAT_VERSION};
use crate::error::{EmitError, Result};

/// A content hash (SHA-256 hex digest).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn compute(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        ContentHash(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn verify(&self, data: &[u8]) -> bool {
        ContentHash::compute(data) == *self
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode an artifact.
pub fn to_json(artifact: &IrArtifact) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(artifact)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode an artifact, rejecting other formats and versions.
pub fn from_json(bytes: &[u8]) -> Result<IrArtifact> {
    let artifact: IrArtifact = serde_json::from_slice(bytes)?;
    if artifact.format != FORMAT_NAME || artifact.version != FORMAT_VERSION {
        return Err(EmitError::UnsupportedFormat {
            format: artifact.format,
            version: artifact.version,
            expected_format: FORMAT_NAME,
            expected_version: FORMAT_VERSION,
        });
    }
    Ok(artifact)
}

/// An encoded artifact held in memory, ready to be written.
#[derive(Debug, Clone)]
pub struct EmittedArtifact {
    artifact: IrArtifact,
    bytes: Vec<u8>,
    hash: ContentHash,
}

impl EmittedArtifact {
    pub fn artifact(&self) -> &IrArtifact {
        &self.artifact
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Write the artifact to `path`, replacing any previous file atomically.
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        let io_error = |err: std::io::Error| EmitError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(io_error)?;

        let mut staged = tempfile::NamedTempFile::new_in(&dir).map_err(io_error)?;
        debug!("staging artifact in {}", staged.path().display());
        staged.write_all(&self.bytes).map_err(io_error)?;
        staged.as_file().sync_all().map_err(io_error)?;
        staged.persist(path).map_err(|err| io_error(err.error))?;

        info!(
            "wrote {} ({} bytes, sha256 {})",
            path.display(),
            self.bytes.len(),
            self.hash
        );
        Ok(())
    }
}

/// Flatten and encode a validated model.
pub fn emit(
    isa: &IsaModel,
    set: &InstructionSet,
    topology: &HardwareTopology,
) -> Result<EmittedArtifact> {
    let artifact = IrArtifact::from_model(isa, set, topology);
    let bytes = to_json(&artifact)?;
    let hash = ContentHash::compute(&bytes);
    info!(
        "emitted {} opcodes, {} microcode entries, {} control lines",
        artifact.opcodes.len(),
        artifact.microcode.len(),
        artifact.control_lines.len()
    );
    Ok(EmittedArtifact {
        artifact,
        bytes,
        hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::tests::sample;

    #[test]
    fn hash_format() {
        assert_eq!(
            ContentHash::compute(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let hash = ContentHash::compute(b"irata");
        assert!(hash.verify(b"irata"));
        assert!(!hash.verify(b"irata2"));
        assert_eq!(hash.to_string().len(), 64);
    }

    #[test]
    fn emission_is_deterministic() {
        let (isa, set, topology) = sample();
        let first = emit(&isa, &set, &topology).unwrap();
        let (isa, set, topology) = sample();
        let second = emit(&isa, &set, &topology).unwrap();
        assert_eq!(first.bytes(), second.bytes());
        assert_eq!(first.hash(), second.hash());
        assert!(first.bytes().ends_with(b"}\n"));
    }

    #[test]
    fn emission_is_lossless() {
        let (isa, set, topology) = sample();
        let emitted = emit(&isa, &set, &topology).unwrap();
        let decoded = from_json(emitted.bytes()).unwrap();
        assert_eq!(&decoded, emitted.artifact());
        assert_eq!(to_json(&decoded).unwrap(), emitted.bytes());
    }

    #[test]
    fn foreign_formats_are_rejected() {
        let (isa, set, topology) = sample();
        let mut artifact = emit(&isa, &set, &topology).unwrap().artifact().clone();
        artifact.version = 2;
        let bytes = to_json(&artifact).unwrap();
        assert!(matches!(
            from_json(&bytes),
            Err(EmitError::UnsupportedFormat { version: 2, .. })
        ));
        assert!(matches!(
            from_json(b"{\"format\": \"irata-ir\"}"),
            Err(EmitError::Serialization(_))
        ));
    }

    #[test]
    fn write_atomic_replaces_file() {
        let (isa, set, topology) = sample();
        let emitted = emit(&isa, &set, &topology).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("irata.ir.json");

        emitted.write_atomic(&path).unwrap();
        std::fs::write(&path, b"stale").unwrap();
        emitted.write_atomic(&path).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, emitted.bytes());
        assert!(emitted.hash().verify(&written));
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
