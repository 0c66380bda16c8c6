//! Status coverage of conditional variants.
//!
//! An instruction with guarded variants must select exactly one variant for every value
//! of the status register. Each variant may guard on at most one flag; unguarded flags
//! take both values. A single unconditional variant always passes.

use irata_isa::StatusFlagRegistry;

use crate::error::MicrocodeError;
use crate::ir::InstructionSet;

/// Missing status values listed in an error before the rest are summarized.
const MAX_LISTED_MISSING: usize = 5;

/// Check every instruction of the set, collecting all coverage problems.
pub fn check_status_coverage(
    flags: &StatusFlagRegistry,
    instruction_set: &InstructionSet,
) -> Result<(), Vec<MicrocodeError>> {
    let mut errors = Vec::new();

    for instruction in &instruction_set.instructions {
        let variants = &instruction.variants;
        if variants.is_empty() || (variants.len() == 1 && variants[0].is_unconditional()) {
            continue;
        }
        let symbol = instruction.symbol();

        let mut multi_guard = false;
        for (index, variant) in variants.iter().enumerate() {
            if variant.status_conditions.len() > 1 {
                let flags = variant
                    .status_conditions
                    .iter()
                    .map(|c| format!("{}={}", c.key(), c.value))
                    .collect::<Vec<_>>()
                    .join(", ");
                errors.push(MicrocodeError::MultipleStatusConditions {
                    symbol: symbol.to_string(),
                    variant: index,
                    flags,
                });
                multi_guard = true;
            }
        }
        if multi_guard {
            continue;
        }

        // owner[status] = index of the variant that status selects
        let statuses = status_space(flags);
        let mut owner: Vec<Option<usize>> = vec![None; 256];
        let mut overlapped = false;
        for (index, variant) in variants.iter().enumerate() {
            for &status in statuses.iter().filter(|&&s| variant.matches_status(s)) {
                match owner[status as usize] {
                    Some(first) => {
                        errors.push(MicrocodeError::OverlappingStatusCoverage {
                            symbol: symbol.to_string(),
                            status,
                            first,
                            second: index,
                        });
                        overlapped = true;
                        break;
                    }
                    None => owner[status as usize] = Some(index),
                }
            }
        }
        if overlapped {
            continue;
        }

        let missing: Vec<u8> = statuses
            .iter()
            .copied()
            .filter(|&s| owner[s as usize].is_none())
            .collect();
        if !missing.is_empty() {
            errors.push(MicrocodeError::IncompleteStatusCoverage {
                symbol: symbol.to_string(),
                covered: statuses.len() - missing.len(),
                total: statuses.len(),
                missing: describe_missing(&missing),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Every status value that only uses declared flag bits.
fn status_space(flags: &StatusFlagRegistry) -> Vec<u8> {
    let used: u8 = flags.iter().fold(0, |mask, flag| mask | flag.mask());
    (0..=u8::MAX).filter(|s| s & !used == 0).collect()
}

fn describe_missing(missing: &[u8]) -> String {
    let mut listed = missing
        .iter()
        .take(MAX_LISTED_MISSING)
        .map(|s| format!("0x{s:02X}"))
        .collect::<Vec<_>>()
        .join(", ");
    if missing.len() > MAX_LISTED_MISSING {
        listed.push_str(&format!(" and {} more", missing.len() - MAX_LISTED_MISSING));
    }
    listed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use irata_isa::{AddressingMode, Instruction, StatusFlag, StatusFlagDecl};

    use crate::ir::{InstructionVariant, MicrocodeInstruction, StatusCondition};

    fn registry() -> StatusFlagRegistry {
        StatusFlagRegistry::build(&[
            StatusFlagDecl {
                code: "Z".into(),
                name: "Zero".into(),
                bit: 1,
                description: String::new(),
            },
            StatusFlagDecl {
                code: "C".into(),
                name: "Carry".into(),
                bit: 0,
                description: String::new(),
            },
        ])
        .unwrap()
    }

    fn guard(flags: &StatusFlagRegistry, terms: &[(&str, bool)]) -> InstructionVariant {
        InstructionVariant {
            status_conditions: terms
                .iter()
                .map(|&(code, value)| StatusCondition {
                    flag: Arc::clone(flags.get(code).unwrap()),
                    value,
                })
                .collect(),
            stages: Vec::new(),
        }
    }

    fn set(variants: Vec<InstructionVariant>) -> InstructionSet {
        let instruction = Arc::new(Instruction {
            symbol: "BEQ_REL".into(),
            mnemonic: "BEQ".into(),
            opcode: 0xF0,
            addressing_mode: Arc::new(AddressingMode {
                code: "REL".into(),
                name: "Relative".into(),
                description: String::new(),
                operand_bytes: 1,
                syntax: None,
            }),
            cycles: 2,
            description: String::new(),
            category: "branch".into(),
            flags_affected: Vec::<Arc<StatusFlag>>::new(),
        });
        InstructionSet {
            fetch_preamble: Vec::new(),
            instructions: vec![MicrocodeInstruction {
                source_name: "BEQ_REL".into(),
                instruction,
                variants,
            }],
        }
    }

    #[test]
    fn complementary_guards_pass() {
        let flags = registry();
        let set = set(vec![guard(&flags, &[("Z", true)]), guard(&flags, &[("Z", false)])]);
        assert!(check_status_coverage(&flags, &set).is_ok());
    }

    #[test]
    fn single_unconditional_variant_passes() {
        let flags = registry();
        assert!(check_status_coverage(&flags, &set(vec![InstructionVariant::default()])).is_ok());
    }

    #[test]
    fn multiple_conditions_are_rejected() {
        let flags = registry();
        let set = set(vec![
            guard(&flags, &[("Z", true), ("C", true)]),
            guard(&flags, &[("Z", false)]),
        ]);
        let errors = check_status_coverage(&flags, &set).unwrap_err();
        assert_eq!(
            errors,
            vec![MicrocodeError::MultipleStatusConditions {
                symbol: "BEQ_REL".into(),
                variant: 0,
                flags: "z=true, c=true".into(),
            }]
        );
    }

    #[test]
    fn overlap_is_reported() {
        let flags = registry();
        let set = set(vec![guard(&flags, &[("Z", true)]), InstructionVariant::default()]);
        let errors = check_status_coverage(&flags, &set).unwrap_err();
        assert!(matches!(
            errors[0],
            MicrocodeError::OverlappingStatusCoverage { status: 0b10, first: 0, second: 1, .. }
        ));
    }

    #[test]
    fn gaps_are_reported() {
        let flags = registry();
        let set = set(vec![guard(&flags, &[("Z", true)])]);
        let errors = check_status_coverage(&flags, &set).unwrap_err();
        assert_eq!(
            errors,
            vec![MicrocodeError::IncompleteStatusCoverage {
                symbol: "BEQ_REL".into(),
                covered: 2,
                total: 4,
                missing: "0x00, 0x01".into(),
            }]
        );
    }

    #[test]
    fn long_missing_lists_are_summarized() {
        assert_eq!(
            describe_missing(&[0, 1, 2, 3, 4, 5, 6]),
            "0x00, 0x01, 0x02, 0x03, 0x04 and 2 more"
        );
    }
}
