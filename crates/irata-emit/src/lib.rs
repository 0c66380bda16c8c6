//! IR emission for the IRATA2 microcode toolchain.
//!
//! The validated ISA model, microcode instruction set and hardware topology are flattened
//! into an [`IrArtifact`]: ordered lists only, so the JSON encoding is a pure function of
//! the model. Artifacts carry a SHA-256 [`ContentHash`] and are written atomically.

pub mod artifact;
pub mod emit;
pub mod error;

pub use artifact::{IrArtifact, FORMAT_NAME, FORMAT_VERSION};
pub use emit::{emit, from_json, to_json, ContentHash, EmittedArtifact};
pub use error::{EmitError, Result};
