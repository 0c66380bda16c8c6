//! Microcode intermediate representation.
//!
//! Order is significant everywhere: stages within a variant and steps within a stage are
//! kept exactly as declared, since downstream timing depends on it.

use std::sync::Arc;

use irata_isa::{Instruction, StatusFlag};

use crate::topology::ControlId;

/// A set of control lines activated together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Stage the step belongs to.
    pub stage: usize,
    /// Controls in declaration order, without duplicates.
    pub controls: Vec<ControlId>,
}

impl Step {
    pub fn is_noop(&self) -> bool {
        self.controls.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Position within the variant, counting from 0.
    pub index: usize,
    pub steps: Vec<Step>,
}

/// One guard term: the flag must have `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCondition {
    pub flag: Arc<StatusFlag>,
    pub value: bool,
}

impl StatusCondition {
    /// Normalized guard key (lower-cased flag code).
    pub fn key(&self) -> String {
        self.flag.code.to_ascii_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstructionVariant {
    /// Guard terms in declaration order; empty means unconditional.
    pub status_conditions: Vec<StatusCondition>,
    pub stages: Vec<Stage>,
}

impl InstructionVariant {
    pub fn is_unconditional(&self) -> bool {
        self.status_conditions.is_empty()
    }

    /// Required value of a flag, by code (case-insensitive).
    pub fn condition(&self, code: &str) -> Option<bool> {
        self.status_conditions
            .iter()
            .find(|c| c.flag.code.eq_ignore_ascii_case(code))
            .map(|c| c.value)
    }

    /// All steps across stages, in execution order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.stages.iter().flat_map(|stage| stage.steps.iter())
    }

    /// Whether this variant applies to a status-register value.
    pub fn matches_status(&self, status: u8) -> bool {
        self.status_conditions
            .iter()
            .all(|c| (status & c.flag.mask() != 0) == c.value)
    }
}

/// Microcode bound to one ISA instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicrocodeInstruction {
    /// Name as written in the microcode document.
    pub source_name: String,
    pub instruction: Arc<Instruction>,
    pub variants: Vec<InstructionVariant>,
}

impl MicrocodeInstruction {
    pub fn symbol(&self) -> &str {
        &self.instruction.symbol
    }

    pub fn opcode(&self) -> u8 {
        self.instruction.opcode
    }
}

/// The validated microcode of the whole instruction set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstructionSet {
    /// Steps run before every instruction; all belong to stage 0.
    pub fetch_preamble: Vec<Step>,
    /// Instructions in microcode document order.
    pub instructions: Vec<MicrocodeInstruction>,
}

impl InstructionSet {
    pub fn instruction(&self, opcode: u8) -> Option<&MicrocodeInstruction> {
        self.instructions.iter().find(|i| i.opcode() == opcode)
    }

    /// Instructions in ascending opcode order.
    pub fn by_opcode(&self) -> Vec<&MicrocodeInstruction> {
        let mut sorted: Vec<_> = self.instructions.iter().collect();
        sorted.sort_by_key(|i| i.opcode());
        sorted
    }

    pub fn variant_count(&self) -> usize {
        self.instructions.iter().map(|i| i.variants.len()).sum()
    }
}
