//! Microcode resolution for the IRATA2 toolchain.
//!
//! Binds a declarative microcode document to an [`irata_isa::IsaModel`] and a
//! [`HardwareTopology`]:
//! - **Resolver:** names to opcodes, definitions to guarded [`InstructionVariant`]s
//! - **Validator:** every control name in every step must exist in the hardware
//! - **Coverage:** every ISA instruction has microcode, every status value selects one variant
//! - **Rules:** no opposing operations in a step, declared phases fit, no gaps between stages
//!
//! Errors are accumulated; a failed build reports every problem it found.

pub mod coverage;
pub mod document;
pub mod error;
pub mod ir;
pub mod location;
pub mod parse;
pub mod resolver;
pub mod rules;
pub mod status;
pub mod topology;
pub mod validator;

pub use coverage::check_isa_coverage;
pub use document::{MicrocodeDefinition, MicrocodeDocument, StageDecl, StepDecl, VariantDecl};
pub use error::{MicrocodeError, Result};
pub use ir::{InstructionSet, InstructionVariant, MicrocodeInstruction, Stage, StatusCondition, Step};
pub use location::StepLocation;
pub use resolver::{build_microcode, BuildOptions, MicrocodeBuilder};
pub use rules::{check_control_conflicts, check_phase_ordering, check_stage_gaps};
pub use status::check_status_coverage;
pub use topology::{
    normalize_path, ControlDecl, ControlId, ControlLine, ControlLookup, HardwareDocument,
    HardwareTopology, TickPhase, CPU_ROOT,
};
pub use validator::ControlReferenceValidator;
