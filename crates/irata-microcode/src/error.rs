//! Error types for microcode resolution and validation.

use std::path::PathBuf;

use crate::topology::TickPhase;

/// Errors produced while loading microcode or hardware documents and while building the
/// microcode IR. Every variant that concerns a declaration carries its location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MicrocodeError {
    /// Structurally malformed input.
    #[error("schema error at {location}: {detail}")]
    Schema { location: String, detail: String },

    /// A microcode entry names an instruction that is not in the ISA model.
    #[error("microcode entry '{name}' resolves to unknown opcode {symbol}{}", hint(*implied_mode))]
    UnknownOpcode {
        /// Name as written in the microcode document.
        name: String,
        /// Symbol it resolved to.
        symbol: String,
        implied_mode: bool,
    },

    /// A step activates a control line that the hardware does not have.
    #[error("control line not found: {control} ({location})")]
    UnknownControlLine { control: String, location: String },

    /// A step contains an empty control name.
    #[error("control path is empty ({location})")]
    EmptyControlName { location: String },

    /// A control line is listed more than once in the same step.
    #[error("control line {control} listed twice in one step ({location})")]
    DuplicateControl { control: String, location: String },

    /// A variant guard names a status flag that the ISA does not declare.
    #[error("unknown status flag '{key}' in guard ({location})")]
    UnknownStatusFlag { key: String, location: String },

    /// Two microcode entries resolve to the same instruction.
    #[error("duplicate microcode for {symbol}: entries '{first}' and '{second}'")]
    DuplicateMicrocode {
        symbol: String,
        first: String,
        second: String,
    },

    /// ISA instructions without any microcode.
    #[error("microcode does not implement {} ISA instruction(s): {}", symbols.len(), symbols.join(", "))]
    MissingMicrocode { symbols: Vec<String> },

    /// A variant guards on more than one flag.
    #[error("variant {variant} of {symbol} guards on multiple status flags: {flags}")]
    MultipleStatusConditions {
        symbol: String,
        variant: usize,
        flags: String,
    },

    /// Two variants of one instruction apply to the same status value.
    #[error("overlapping status coverage in {symbol}: status 0x{status:02X} covered by variants {first} and {second}")]
    OverlappingStatusCoverage {
        symbol: String,
        status: u8,
        first: usize,
        second: usize,
    },

    /// Some status values select no variant of an instruction.
    #[error("incomplete status coverage in {symbol}: covered {covered} of {total} possible statuses (missing: {missing})")]
    IncompleteStatusCoverage {
        symbol: String,
        covered: usize,
        total: usize,
        missing: String,
    },

    /// One step drives opposing operations on the same component.
    #[error("conflicting {first} and {second} on {component} ({location})")]
    ControlConflict {
        component: String,
        first: String,
        second: String,
        location: String,
    },

    /// A control's declared tick phase disagrees with its operation.
    #[error("control {control} acts in phase {phase}, expected {expected} ({location})")]
    PhaseMismatch {
        control: String,
        phase: TickPhase,
        expected: TickPhase,
        location: String,
    },

    /// An empty stage is followed by a stage with steps.
    #[error("stage has no steps but later stages do ({location})")]
    StageGap { location: String },

    /// Two hardware controls normalize to the same path.
    #[error("duplicate control path {path} (hardware controls[{index}])")]
    DuplicateControlPath { path: String, index: usize },

    /// I/O error reading a document.
    #[error("I/O error reading {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// Document not found.
    #[error("document not found: {}", path.display())]
    NotFound { path: PathBuf },
}

fn hint(implied_mode: bool) -> &'static str {
    if implied_mode {
        " (implicit addressing mode assumed; name the mode explicitly if this is wrong)"
    } else {
        ""
    }
}

impl MicrocodeError {
    pub(crate) fn schema(location: impl Into<String>, detail: impl Into<String>) -> Self {
        MicrocodeError::Schema {
            location: location.into(),
            detail: detail.into(),
        }
    }
}

impl From<toml::de::Error> for MicrocodeError {
    fn from(err: toml::de::Error) -> Self {
        let location = err
            .span()
            .map(|span| format!("byte {}", span.start))
            .unwrap_or_else(|| "<document>".into());
        MicrocodeError::schema(location, err.message())
    }
}

impl From<serde_json::Error> for MicrocodeError {
    fn from(err: serde_json::Error) -> Self {
        MicrocodeError::schema(format!("line {} column {}", err.line(), err.column()), err.to_string())
    }
}

/// Result type for single-error microcode operations (loading, parsing).
pub type Result<T> = std::result::Result<T, MicrocodeError>;
