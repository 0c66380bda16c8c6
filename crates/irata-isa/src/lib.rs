//! Instruction-set model builder for the IRATA2 microcode toolchain.
//!
//! Turns a declarative instruction-set document into an immutable [`IsaModel`]:
//! - **Registries:** addressing modes and status flags, shared by `Arc`
//! - **Opcode table:** one [`Instruction`] per opcode byte, unique across the set
//! - **Categories:** the sorted set of category labels
//! - **Naming:** the `<mnemonic>_<mode>` symbols microcode joins on

pub mod builder;
pub mod document;
pub mod error;
pub mod model;
pub mod naming;
pub mod parse;
pub mod registry;

pub use builder::build_isa;
pub use document::{AddressingModeDecl, InstructionDecl, IsaDocument, StatusFlagDecl};
pub use error::{IsaError, Result};
pub use model::{Instruction, IsaModel};
pub use naming::{opcode_symbol, NamingRule, ResolvedName, DEFAULT_IMPLICIT_MODE};
pub use parse::DocumentFormat;
pub use registry::{AddressingMode, AddressingModeRegistry, StatusFlag, StatusFlagRegistry};
