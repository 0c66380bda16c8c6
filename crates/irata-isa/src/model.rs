//! The built instruction-set model.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::registry::{AddressingMode, AddressingModeRegistry, StatusFlag, StatusFlagRegistry};

/// A fully resolved instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// `<mnemonic>_<mode>`, the join key used by microcode.
    pub symbol: String,
    /// Upper-case mnemonic, e.g. `LDA`.
    pub mnemonic: String,
    /// Opcode byte; unique across the model.
    pub opcode: u8,
    pub addressing_mode: Arc<AddressingMode>,
    /// Base cycle count.
    pub cycles: u8,
    /// Free-form description; may be empty.
    pub description: String,
    /// Category name as declared, e.g. `load` or `branch`.
    pub category: String,
    /// Affected flags in declaration order, without duplicates.
    pub flags_affected: Vec<Arc<StatusFlag>>,
}

impl Instruction {
    /// Total encoded length in bytes (opcode plus operands).
    pub fn length(&self) -> usize {
        1 + self.addressing_mode.operand_bytes as usize
    }
}

/// Immutable instruction-set model: registries, opcode table, and derived categories.
#[derive(Debug, Clone)]
pub struct IsaModel {
    pub(crate) addressing_modes: AddressingModeRegistry,
    pub(crate) status_flags: StatusFlagRegistry,
    pub(crate) instructions: Vec<Arc<Instruction>>,
    pub(crate) by_opcode: BTreeMap<u8, usize>,
    pub(crate) by_symbol: HashMap<String, usize>,
    pub(crate) categories: Vec<String>,
}

impl IsaModel {
    pub fn addressing_modes(&self) -> &AddressingModeRegistry {
        &self.addressing_modes
    }

    pub fn status_flags(&self) -> &StatusFlagRegistry {
        &self.status_flags
    }

    /// Instructions in declaration order.
    pub fn instructions(&self) -> &[Arc<Instruction>] {
        &self.instructions
    }

    /// Instructions in ascending opcode order.
    pub fn by_opcode(&self) -> impl Iterator<Item = &Arc<Instruction>> {
        self.by_opcode.values().map(|&i| &self.instructions[i])
    }

    pub fn instruction(&self, opcode: u8) -> Option<&Arc<Instruction>> {
        self.by_opcode.get(&opcode).map(|&i| &self.instructions[i])
    }

    pub fn instruction_by_symbol(&self, symbol: &str) -> Option<&Arc<Instruction>> {
        self.by_symbol.get(symbol).map(|&i| &self.instructions[i])
    }

    /// Distinct category labels, sorted lexicographically.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
