//! Builds an [`IsaModel`] from an [`IsaDocument`].
//!
//! Registries are built first, then every instruction is resolved against them and
//! inserted into the opcode table. All problems are collected so a single run reports
//! everything wrong with the document.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use log::{debug, info};

use crate::document::IsaDocument;
use crate::error::IsaError;
use crate::model::{Instruction, IsaModel};
use crate::naming::opcode_symbol;
use crate::registry::{check_identifier, AddressingModeRegistry, StatusFlagRegistry};

/// Build the instruction-set model, or every error found in the document.
pub fn build_isa(document: &IsaDocument) -> Result<IsaModel, Vec<IsaError>> {
    let (addressing_modes, mut errors) =
        AddressingModeRegistry::build_lenient(&document.addressing_modes);
    let (status_flags, flag_errors) = StatusFlagRegistry::build_lenient(&document.status_flags);
    errors.extend(flag_errors);

    let mut instructions: Vec<Arc<Instruction>> = Vec::with_capacity(document.instructions.len());
    let mut by_opcode: BTreeMap<u8, usize> = BTreeMap::new();
    let mut by_symbol: HashMap<String, usize> = HashMap::new();
    let mut categories: BTreeSet<String> = BTreeSet::new();
    let mut claimed_opcodes: HashMap<u8, String> = HashMap::new();
    let mut claimed_symbols: HashMap<String, u8> = HashMap::new();

    for (index, decl) in document.instructions.iter().enumerate() {
        let location = format!("instructions[{index}]");
        let mut valid = true;

        for (field, value) in [
            ("mnemonic", &decl.mnemonic),
            ("addressing_mode", &decl.addressing_mode),
            ("category", &decl.category),
        ] {
            if let Err(err) = check_identifier(value, &format!("{location}.{field}")) {
                errors.push(err);
                valid = false;
            }
        }
        if !valid {
            continue;
        }

        let mode = addressing_modes.get(&decl.addressing_mode).cloned();
        if mode.is_none() {
            errors.push(IsaError::UnknownAddressingMode {
                mnemonic: decl.mnemonic.clone(),
                code: decl.addressing_mode.clone(),
                location: format!("{location}.addressing_mode"),
            });
        }

        let mut flags_affected = Vec::with_capacity(decl.flags_affected.len());
        for (flag_index, code) in decl.flags_affected.iter().enumerate() {
            let flag_location = format!("{location}.flags_affected[{flag_index}]");
            match status_flags.get(code) {
                Some(flag) if flags_affected.iter().any(|f| Arc::ptr_eq(f, flag)) => {
                    errors.push(IsaError::schema(
                        flag_location,
                        format!("status flag '{code}' listed more than once"),
                    ));
                }
                Some(flag) => flags_affected.push(Arc::clone(flag)),
                None => errors.push(IsaError::UnknownStatusFlag {
                    mnemonic: decl.mnemonic.clone(),
                    code: code.clone(),
                    location: flag_location,
                }),
            }
        }

        let symbol = opcode_symbol(&decl.mnemonic, &decl.addressing_mode);

        // Claims are tracked even for instructions rejected above so that collisions
        // with them are still reported.
        if let Some(first) = claimed_opcodes.get(&decl.opcode) {
            errors.push(IsaError::DuplicateOpcode {
                opcode: decl.opcode,
                first: first.clone(),
                second: symbol,
            });
            continue;
        }
        if let Some(&first) = claimed_symbols.get(&symbol) {
            errors.push(IsaError::DuplicateInstruction {
                symbol,
                first,
                second: decl.opcode,
            });
            continue;
        }
        claimed_opcodes.insert(decl.opcode, symbol.clone());
        claimed_symbols.insert(symbol.clone(), decl.opcode);

        let Some(addressing_mode) = mode else {
            continue;
        };

        debug!("instruction {symbol} = 0x{:02X}", decl.opcode);
        let slot = instructions.len();
        by_opcode.insert(decl.opcode, slot);
        by_symbol.insert(symbol.clone(), slot);
        categories.insert(decl.category.clone());
        instructions.push(Arc::new(Instruction {
            symbol,
            mnemonic: decl.mnemonic.clone(),
            opcode: decl.opcode,
            addressing_mode,
            cycles: decl.cycles,
            description: decl.description.clone(),
            category: decl.category.clone(),
            flags_affected,
        }));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    info!(
        "ISA model: {} addressing modes, {} status flags, {} instructions, {} categories",
        addressing_modes.len(),
        status_flags.len(),
        instructions.len(),
        categories.len()
    );

    Ok(IsaModel {
        addressing_modes,
        status_flags,
        instructions,
        by_opcode,
        by_symbol,
        categories: categories.into_iter().collect(),
    })
}
