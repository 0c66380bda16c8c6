//! The emitted artifact model.
//!
//! Every field of the validated model has a place here. Control lines in steps are
//! written by path rather than by index so each step reads on its own; the index table
//! is still emitted under `control_lines`.

use serde::{Deserialize, Serialize};

use irata_isa::{AddressingMode, Instruction, IsaModel, StatusFlag};
use irata_microcode::{
    ControlId, ControlLookup, HardwareTopology, InstructionSet, InstructionVariant,
    MicrocodeInstruction, Stage, Step, TickPhase,
};

/// Value of the `format` field.
pub const FORMAT_NAME: &str = "irata-ir";

/// Value of the `version` field.
pub const FORMAT_VERSION: u32 = 1;

/// The complete emitted IR: ISA tables, control table and microcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IrArtifact {
    /// Always [`FORMAT_NAME`].
    pub format: String,
    /// Always [`FORMAT_VERSION`] when written by this crate.
    pub version: u32,
    /// Name of the hardware description, if it has one.
    pub hardware: Option<String>,
    pub addressing_modes: Vec<AddressingModeEntry>,
    pub status_flags: Vec<StatusFlagEntry>,
    /// Sorted, without duplicates.
    pub categories: Vec<String>,
    /// Ascending opcode order.
    pub opcodes: Vec<OpcodeEntry>,
    /// Index order; position equals the control id.
    pub control_lines: Vec<ControlLineEntry>,
    pub fetch_preamble: Vec<StepEntry>,
    /// Microcode document order.
    pub microcode: Vec<MicrocodeEntry>,
}

/// An addressing mode, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddressingModeEntry {
    /// Short code used in symbols, e.g. `IMM`.
    pub code: String,
    pub name: String,
    pub description: String,
    /// Operand bytes following the opcode.
    pub operand_bytes: u8,
    /// Assembler syntax template, if declared.
    pub syntax: Option<String>,
}

/// A status flag, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusFlagEntry {
    /// Flag code, e.g. `Z`.
    pub code: String,
    pub name: String,
    /// Bit position in the status register, 0 to 7.
    pub bit: u8,
    pub description: String,
}

/// One row of the opcode table, in opcode order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpcodeEntry {
    /// `<mnemonic>_<mode>`.
    pub symbol: String,
    pub mnemonic: String,
    pub opcode: u8,
    /// Addressing-mode code.
    pub addressing_mode: String,
    /// Encoded length in bytes, opcode included.
    pub length: usize,
    pub cycles: u8,
    pub description: String,
    pub category: String,
    /// Flag codes.
    pub flags_affected: Vec<String>,
}

/// A hardware control line, in path order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlLineEntry {
    /// Position in the control table.
    pub index: usize,
    /// Normalized absolute path.
    pub path: String,
    pub phase: Option<TickPhase>,
    /// The line clears itself after the tick.
    pub auto_reset: bool,
}

/// One microcode step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepEntry {
    /// Stage the step belongs to; 0 in the fetch preamble.
    pub stage: usize,
    /// Control paths in declaration order.
    pub controls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageEntry {
    /// Position of the stage within its variant.
    pub index: usize,
    pub steps: Vec<StepEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionEntry {
    /// Flag code.
    pub flag: String,
    /// Required flag value.
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantEntry {
    /// Guard terms in declaration order; empty means unconditional.
    pub when: Vec<ConditionEntry>,
    /// Stages in execution order.
    pub stages: Vec<StageEntry>,
}

/// Microcode of one instruction, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MicrocodeEntry {
    /// Name as written in the microcode document.
    pub source_name: String,
    /// Resolved opcode symbol.
    pub symbol: String,
    pub opcode: u8,
    /// Variants in declaration order.
    pub variants: Vec<VariantEntry>,
}

impl IrArtifact {
    /// Flatten a validated model. `set` must have been built against `isa` and `topology`.
    pub fn from_model(isa: &IsaModel, set: &InstructionSet, topology: &HardwareTopology) -> Self {
        let step = |step: &Step| step_entry(topology, step);
        IrArtifact {
            format: FORMAT_NAME.to_string(),
            version: FORMAT_VERSION,
            hardware: topology.name().map(str::to_string),
            addressing_modes: isa.addressing_modes().iter().map(|m| mode_entry(m)).collect(),
            status_flags: isa.status_flags().iter().map(|f| flag_entry(f)).collect(),
            categories: isa.categories().to_vec(),
            opcodes: isa.by_opcode().map(|i| opcode_entry(i)).collect(),
            control_lines: topology
                .controls()
                .iter()
                .enumerate()
                .map(|(index, line)| ControlLineEntry {
                    index,
                    path: line.path.clone(),
                    phase: line.phase,
                    auto_reset: line.auto_reset,
                })
                .collect(),
            fetch_preamble: set.fetch_preamble.iter().map(step).collect(),
            microcode: set
                .instructions
                .iter()
                .map(|i| microcode_entry(topology, i))
                .collect(),
        }
    }

    pub fn opcode(&self, opcode: u8) -> Option<&OpcodeEntry> {
        self.opcodes.iter().find(|entry| entry.opcode == opcode)
    }

    pub fn microcode_for(&self, symbol: &str) -> Option<&MicrocodeEntry> {
        self.microcode.iter().find(|entry| entry.symbol == symbol)
    }
}

fn mode_entry(mode: &AddressingMode) -> AddressingModeEntry {
    AddressingModeEntry {
        code: mode.code.clone(),
        name: mode.name.clone(),
        description: mode.description.clone(),
        operand_bytes: mode.operand_bytes,
        syntax: mode.syntax.clone(),
    }
}

fn flag_entry(flag: &StatusFlag) -> StatusFlagEntry {
    StatusFlagEntry {
        code: flag.code.clone(),
        name: flag.name.clone(),
        bit: flag.bit,
        description: flag.description.clone(),
    }
}

fn opcode_entry(instruction: &Instruction) -> OpcodeEntry {
    OpcodeEntry {
        symbol: instruction.symbol.clone(),
        mnemonic: instruction.mnemonic.clone(),
        opcode: instruction.opcode,
        addressing_mode: instruction.addressing_mode.code.clone(),
        length: instruction.length(),
        cycles: instruction.cycles,
        description: instruction.description.clone(),
        category: instruction.category.clone(),
        flags_affected: instruction
            .flags_affected
            .iter()
            .map(|f| f.code.clone())
            .collect(),
    }
}

fn control_path(topology: &HardwareTopology, id: ControlId) -> String {
    topology.control(id).path.clone()
}

fn step_entry(topology: &HardwareTopology, step: &Step) -> StepEntry {
    StepEntry {
        stage: step.stage,
        controls: step
            .controls
            .iter()
            .map(|&id| control_path(topology, id))
            .collect(),
    }
}

fn stage_entry(topology: &HardwareTopology, stage: &Stage) -> StageEntry {
    StageEntry {
        index: stage.index,
        steps: stage.steps.iter().map(|s| step_entry(topology, s)).collect(),
    }
}

fn variant_entry(topology: &HardwareTopology, variant: &InstructionVariant) -> VariantEntry {
    VariantEntry {
        when: variant
            .status_conditions
            .iter()
            .map(|c| ConditionEntry {
                flag: c.flag.code.clone(),
                value: c.value,
            })
            .collect(),
        stages: variant
            .stages
            .iter()
            .map(|s| stage_entry(topology, s))
            .collect(),
    }
}

fn microcode_entry(topology: &HardwareTopology, instruction: &MicrocodeInstruction) -> MicrocodeEntry {
    MicrocodeEntry {
        source_name: instruction.source_name.clone(),
        symbol: instruction.symbol().to_string(),
        opcode: instruction.opcode(),
        variants: instruction
            .variants
            .iter()
            .map(|v| variant_entry(topology, v))
            .collect(),
    }
}
