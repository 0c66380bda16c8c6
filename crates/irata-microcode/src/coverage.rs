//! ISA coverage: every instruction in the model needs microcode.

use std::collections::HashSet;

use irata_isa::IsaModel;

use crate::error::MicrocodeError;
use crate::ir::InstructionSet;

/// Fails with the uncovered symbols, in opcode order.
pub fn check_isa_coverage(isa: &IsaModel, instruction_set: &InstructionSet) -> Result<(), MicrocodeError> {
    let covered: HashSet<u8> = instruction_set.instructions.iter().map(|i| i.opcode()).collect();
    let missing: Vec<String> = isa
        .by_opcode()
        .filter(|inst| !covered.contains(&inst.opcode))
        .map(|inst| inst.symbol.clone())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MicrocodeError::MissingMicrocode { symbols: missing })
    }
}
