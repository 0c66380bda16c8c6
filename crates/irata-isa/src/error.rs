//! Error types for loading and building the instruction-set model.

use std::path::PathBuf;

/// Errors that can occur while loading an ISA document or building the model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IsaError {
    /// The document is structurally malformed (bad syntax, unknown or missing field,
    /// out-of-range value, invalid identifier).
    #[error("schema error at {location}: {detail}")]
    Schema {
        /// Path of the offending field (e.g. `instructions[3].category`).
        location: String,
        /// What is wrong with it.
        detail: String,
    },

    /// An instruction references an addressing mode that was never declared.
    #[error("instruction {mnemonic} ({location}): unknown addressing mode '{code}'")]
    UnknownAddressingMode {
        /// Mnemonic of the declaring instruction.
        mnemonic: String,
        /// The undeclared mode code.
        code: String,
        /// Path of the instruction declaration.
        location: String,
    },

    /// An instruction lists an affected flag that was never declared.
    #[error("instruction {mnemonic} ({location}): unknown status flag '{code}'")]
    UnknownStatusFlag {
        /// Mnemonic of the declaring instruction.
        mnemonic: String,
        /// The undeclared flag code.
        code: String,
        /// Path of the `flags_affected` entry.
        location: String,
    },

    /// Two instructions claim the same opcode byte.
    #[error("duplicate opcode 0x{opcode:02X}: {first} and {second}")]
    DuplicateOpcode {
        /// The contested opcode byte.
        opcode: u8,
        /// Symbol of the instruction that claimed the byte first.
        first: String,
        /// Symbol of the instruction that collided with it.
        second: String,
    },

    /// Two instruction declarations produce the same `<mnemonic>_<mode>` symbol.
    #[error("duplicate instruction {symbol} (opcodes 0x{first:02X} and 0x{second:02X})")]
    DuplicateInstruction {
        /// The shared symbol.
        symbol: String,
        /// Opcode of the first declaration.
        first: u8,
        /// Opcode of the second declaration.
        second: u8,
    },

    /// An addressing-mode code is declared more than once.
    #[error("duplicate addressing mode '{code}' ({location})")]
    DuplicateAddressingMode {
        /// The repeated mode code.
        code: String,
        /// Path of the repeated declaration.
        location: String,
    },

    /// A status-flag code is declared more than once.
    #[error("duplicate status flag '{code}' ({location})")]
    DuplicateStatusFlag {
        /// The repeated flag code.
        code: String,
        /// Path of the repeated declaration.
        location: String,
    },

    /// Two status flags occupy the same bit position.
    #[error("status flags '{first}' and '{second}' both use bit {bit}")]
    StatusBitConflict {
        /// The shared bit position.
        bit: u8,
        /// Code of the flag declared first.
        first: String,
        /// Code of the flag declared second.
        second: String,
    },

    /// I/O error reading an ISA document.
    #[error("I/O error reading {}: {message}", path.display())]
    Io {
        /// The document being read.
        path: PathBuf,
        /// The underlying I/O error.
        message: String,
    },

    /// ISA document not found.
    #[error("ISA document not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },
}

impl IsaError {
    pub(crate) fn schema(location: impl Into<String>, detail: impl Into<String>) -> Self {
        IsaError::Schema {
            location: location.into(),
            detail: detail.into(),
        }
    }
}

impl From<toml::de::Error> for IsaError {
    fn from(err: toml::de::Error) -> Self {
        let location = err
            .span()
            .map(|span| format!("byte {}", span.start))
            .unwrap_or_else(|| "<document>".into());
        IsaError::schema(location, err.message())
    }
}

impl From<serde_json::Error> for IsaError {
    fn from(err: serde_json::Error) -> Self {
        IsaError::schema(format!("line {} column {}", err.line(), err.column()), err.to_string())
    }
}

/// Result type for single-error ISA operations (loading, parsing).
pub type Result<T> = std::result::Result<T, IsaError>;
