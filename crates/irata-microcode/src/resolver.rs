//! Microcode variant resolution.
//!
//! [`MicrocodeBuilder`] walks a [`MicrocodeDocument`] in declaration order, binds each entry
//! to an ISA instruction, builds its variants, and sends every control reference through
//! the [`ControlReferenceValidator`]. Problems are collected, not raised one at a time.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};

use irata_isa::{IsaModel, NamingRule};

use crate::coverage::check_isa_coverage;
use crate::document::{MicrocodeDefinition, MicrocodeDocument, StageDecl, StepDecl, VariantDecl};
use crate::error::MicrocodeError;
use crate::ir::{
    InstructionSet, InstructionVariant, MicrocodeInstruction, Stage, StatusCondition, Step,
};
use crate::location::{variant_location, StepLocation};
use crate::rules::{check_control_conflicts, check_phase_ordering, check_stage_gaps};
use crate::status::check_status_coverage;
use crate::topology::ControlLookup;
use crate::validator::ControlReferenceValidator;

/// Knobs for a microcode build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// How microcode names map to opcode symbols.
    pub naming: NamingRule,
    /// Every ISA instruction must have microcode.
    pub require_full_coverage: bool,
    /// Conditional variants must partition the status space.
    pub check_status_coverage: bool,
    /// No step may drive opposing operations on one component.
    pub check_control_conflicts: bool,
    /// Declared control phases must fit the control's operation.
    pub check_phase_ordering: bool,
    /// No empty stage may precede a stage with steps.
    pub check_stage_gaps: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            naming: NamingRule::default(),
            require_full_coverage: true,
            check_status_coverage: true,
            check_control_conflicts: true,
            check_phase_ordering: true,
            check_stage_gaps: true,
        }
    }
}

/// Builds the microcode [`InstructionSet`] against an ISA model and a hardware topology.
pub struct MicrocodeBuilder<'a> {
    isa: &'a IsaModel,
    topology: &'a dyn ControlLookup,
    validator: ControlReferenceValidator<'a>,
    options: BuildOptions,
    errors: Vec<MicrocodeError>,
}

impl<'a> MicrocodeBuilder<'a> {
    pub fn new(isa: &'a IsaModel, topology: &'a dyn ControlLookup, options: BuildOptions) -> Self {
        Self {
            isa,
            topology,
            validator: ControlReferenceValidator::new(topology),
            options,
            errors: Vec::new(),
        }
    }

    /// Resolve and validate the whole document.
    pub fn build(mut self, document: &MicrocodeDocument) -> Result<InstructionSet, Vec<MicrocodeError>> {
        let fetch_preamble = self.build_fetch_preamble(&document.fetch_preamble);

        let mut instructions = Vec::with_capacity(document.instructions.len());
        let mut claimed: HashMap<String, String> = HashMap::new();
        for (name, definition) in &document.instructions {
            let Some(instruction) = self.build_instruction(name, definition) else {
                continue;
            };
            let symbol = instruction.symbol().to_string();
            if let Some(first) = claimed.get(&symbol) {
                self.errors.push(MicrocodeError::DuplicateMicrocode {
                    symbol,
                    first: first.clone(),
                    second: name.clone(),
                });
                continue;
            }
            claimed.insert(symbol, name.clone());
            instructions.push(instruction);
        }

        let instruction_set = InstructionSet {
            fetch_preamble,
            instructions,
        };

        if self.options.require_full_coverage {
            if let Err(err) = check_isa_coverage(self.isa, &instruction_set) {
                self.errors.push(err);
            }
        }
        if self.options.check_status_coverage {
            if let Err(errors) = check_status_coverage(self.isa.status_flags(), &instruction_set) {
                self.errors.extend(errors);
            }
        }
        if self.options.check_control_conflicts {
            if let Err(errors) = check_control_conflicts(self.topology, &instruction_set) {
                self.errors.extend(errors);
            }
        }
        if self.options.check_phase_ordering {
            if let Err(errors) = check_phase_ordering(self.topology, &instruction_set) {
                self.errors.extend(errors);
            }
        }
        if self.options.check_stage_gaps {
            if let Err(errors) = check_stage_gaps(&instruction_set) {
                self.errors.extend(errors);
            }
        }

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        info!(
            "microcode: {} fetch steps, {} instructions, {} variants",
            instruction_set.fetch_preamble.len(),
            instruction_set.instructions.len(),
            instruction_set.variant_count()
        );
        Ok(instruction_set)
    }

    fn build_fetch_preamble(&mut self, steps: &[StepDecl]) -> Vec<Step> {
        steps
            .iter()
            .enumerate()
            .map(|(index, names)| {
                let location = StepLocation::FetchPreamble { step: index };
                Step {
                    stage: 0,
                    controls: self.require_step(names, &location),
                }
            })
            .collect()
    }

    fn build_instruction(
        &mut self,
        name: &str,
        definition: &MicrocodeDefinition,
    ) -> Option<MicrocodeInstruction> {
        let resolved = self.options.naming.resolve(name);
        if resolved.implied_mode {
            warn!(
                "microcode entry '{name}' has no addressing-mode suffix; assuming {}",
                resolved.symbol
            );
        }
        let instruction = self.isa.instruction_by_symbol(&resolved.symbol).cloned();
        if instruction.is_none() {
            self.errors.push(MicrocodeError::UnknownOpcode {
                name: name.to_string(),
                symbol: resolved.symbol.clone(),
                implied_mode: resolved.implied_mode,
            });
        }

        // Variants are still walked for an unknown opcode so their control errors surface
        // in the same run.
        let variants = match (&definition.variants, &definition.stages) {
            (Some(_), Some(_)) => {
                self.errors.push(MicrocodeError::schema(
                    format!("instruction[{}]", resolved.symbol),
                    "definition has both 'variants' and 'stages'",
                ));
                return None;
            }
            (Some(variants), None) => variants
                .iter()
                .enumerate()
                .map(|(index, decl)| self.build_variant(&resolved.symbol, index, decl))
                .collect(),
            (None, stages) => {
                let stages = stages.as_deref().unwrap_or_default();
                vec![InstructionVariant {
                    status_conditions: Vec::new(),
                    stages: self.build_stages(&resolved.symbol, 0, stages),
                }]
            }
        };

        let instruction = instruction?;
        debug!(
            "microcode {} (0x{:02X}): {} variant(s)",
            instruction.symbol,
            instruction.opcode,
            variants.len()
        );
        Some(MicrocodeInstruction {
            source_name: name.to_string(),
            instruction,
            variants,
        })
    }

    fn build_variant(&mut self, symbol: &str, index: usize, decl: &VariantDecl) -> InstructionVariant {
        let mut status_conditions: Vec<StatusCondition> = Vec::with_capacity(decl.when.len());
        for (key, &value) in &decl.when {
            let normalized = key.trim().to_ascii_lowercase();
            match self.isa.status_flags().find_guard(&normalized) {
                Some(flag) if status_conditions.iter().any(|c| Arc::ptr_eq(&c.flag, flag)) => {
                    self.errors.push(MicrocodeError::schema(
                        variant_location(symbol, index),
                        format!("status flag '{}' guarded more than once", flag.code),
                    ));
                }
                Some(flag) => status_conditions.push(StatusCondition {
                    flag: Arc::clone(flag),
                    value,
                }),
                None => self.errors.push(MicrocodeError::UnknownStatusFlag {
                    key: normalized,
                    location: variant_location(symbol, index),
                }),
            }
        }

        InstructionVariant {
            status_conditions,
            stages: self.build_stages(symbol, index, &decl.stages),
        }
    }

    fn build_stages(&mut self, symbol: &str, variant: usize, stages: &[StageDecl]) -> Vec<Stage> {
        stages
            .iter()
            .enumerate()
            .map(|(stage_index, stage)| Stage {
                index: stage_index,
                steps: stage
                    .steps
                    .iter()
                    .enumerate()
                    .map(|(step_index, names)| {
                        let location = StepLocation::Instruction {
                            name: symbol.to_string(),
                            variant,
                            stage: stage_index,
                            step: step_index,
                        };
                        Step {
                            stage: stage_index,
                            controls: self.require_step(names, &location),
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    fn require_step(&mut self, names: &[String], location: &StepLocation) -> Vec<crate::topology::ControlId> {
        match self.validator.require_step(names, location) {
            Ok(controls) => controls,
            Err(errors) => {
                self.errors.extend(errors);
                Vec::new()
            }
        }
    }
}

/// Build the microcode instruction set with the given options.
pub fn build_microcode(
    isa: &IsaModel,
    topology: &dyn ControlLookup,
    document: &MicrocodeDocument,
    options: BuildOptions,
) -> Result<InstructionSet, Vec<MicrocodeError>> {
    MicrocodeBuilder::new(isa, topology, options).build(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::HardwareTopology;
    use irata_isa::parse::parse_isa;
    use irata_isa::{build_isa, DocumentFormat};

    const ISA: &str = r#"
[[addressing_modes]]
code = "IMP"
name = "Implicit"
description = ""
operands = 0

[[addressing_modes]]
code = "REL"
name = "Relative"
description = ""
operands = 1

[[status_flags]]
code = "Z"
name = "Zero"
bit = 1

[[instructions]]
mnemonic = "NOP"
opcode = 0x00
addressing_mode = "IMP"
cycles = 2
category = "control"

[[instructions]]
mnemonic = "BEQ"
opcode = 0xF0
addressing_mode = "REL"
cycles = 2
category = "branch"

[[instructions]]
mnemonic = "HLT"
opcode = 0x01
addressing_mode = "IMP"
cycles = 1
category = "control"
"#;

    fn isa() -> IsaModel {
        build_isa(&parse_isa(ISA, DocumentFormat::Toml).unwrap()).unwrap()
    }

    fn topology() -> HardwareTopology {
        HardwareTopology::from_paths([
            "PC_INC", "halt", "pc.write", "mar.read", "pc.add", "a.write", "x.read",
        ])
        .unwrap()
    }

    fn document(text: &str) -> MicrocodeDocument {
        toml::from_str(text).unwrap()
    }

    fn partial() -> BuildOptions {
        BuildOptions {
            require_full_coverage: false,
            ..BuildOptions::default()
        }
    }

    #[test]
    fn nop_scenario_builds_one_step() {
        let isa = isa();
        let topology = topology();
        let set = build_microcode(
            &isa,
            &topology,
            &document(r#"instructions.NOP = { stages = [{ steps = [["PC_INC"]] }] }"#),
            partial(),
        )
        .unwrap();

        assert_eq!(set.instructions.len(), 1);
        let nop = &set.instructions[0];
        assert_eq!(nop.opcode(), 0x00);
        assert_eq!(nop.symbol(), "NOP_IMP");
        assert_eq!(nop.variants.len(), 1);
        let variant = &nop.variants[0];
        assert!(variant.is_unconditional());
        assert_eq!(variant.stages.len(), 1);
        assert_eq!(variant.stages[0].steps.len(), 1);
        let controls: Vec<_> = variant.stages[0].steps[0]
            .controls
            .iter()
            .map(|&id| topology.control(id).path.as_str())
            .collect();
        assert_eq!(controls, vec!["/cpu/PC_INC"]);
    }

    #[test]
    fn bogus_control_reports_full_location() {
        let isa = isa();
        let topology = topology();
        let errors = build_microcode(
            &isa,
            &topology,
            &document(r#"instructions.NOP = { stages = [{ steps = [["BOGUS_LINE"]] }] }"#),
            partial(),
        )
        .unwrap_err();

        assert_eq!(
            errors,
            vec![MicrocodeError::UnknownControlLine {
                control: "BOGUS_LINE".into(),
                location: "instruction[NOP_IMP].variant[0].stage[0].step[0]".into(),
            }]
        );
        let message = errors[0].to_string();
        for part in ["NOP_IMP", "variant[0]", "stage[0]", "step[0]"] {
            assert!(message.contains(part), "{message}");
        }
    }

    #[test]
    fn bare_stages_make_one_unconditional_variant() {
        let isa = isa();
        let set = build_microcode(
            &isa,
            &topology(),
            &document(
                r#"
[instructions.NOP]
stages = [{ steps = [["pc.write", "mar.read"], []] }, { steps = [["PC_INC"]] }]
"#,
            ),
            partial(),
        )
        .unwrap();
        let variants = &set.instructions[0].variants;
        assert_eq!(variants.len(), 1);
        assert!(variants[0].status_conditions.is_empty());
        assert!(variants[0].stages[0].steps[1].is_noop());
        assert_eq!(variants[0].stages[1].index, 1);
        assert_eq!(variants[0].stages[1].steps[0].stage, 1);
    }

    #[test]
    fn declaration_order_is_preserved() {
        let isa = isa();
        let topology = topology();
        let set = build_microcode(
            &isa,
            &topology,
            &document(
                r#"
[instructions.HLT]
stages = [{ steps = [["x.read", "a.write"], ["halt"]] }]

[instructions.NOP]
stages = []
"#,
            ),
            partial(),
        )
        .unwrap();

        let order: Vec<_> = set.instructions.iter().map(|i| i.opcode()).collect();
        assert_eq!(order, vec![0x01, 0x00]);
        let by_opcode: Vec<_> = set.by_opcode().iter().map(|i| i.opcode()).collect();
        assert_eq!(by_opcode, vec![0x00, 0x01]);

        let steps: Vec<Vec<&str>> = set.instructions[0].variants[0]
            .steps()
            .map(|step| {
                step.controls
                    .iter()
                    .map(|&id| topology.control(id).path.as_str())
                    .collect()
            })
            .collect();
        assert_eq!(steps, vec![vec!["/cpu/x/read", "/cpu/a/write"], vec!["/cpu/halt"]]);
    }

    #[test]
    fn guarded_variants_normalize_keys() {
        let isa = isa();
        let set = build_microcode(
            &isa,
            &topology(),
            &document(
                r#"
[instructions.BEQ_REL]
variants = [
    { when = { ZERO = true }, stages = [{ steps = [["pc.add"]] }] },
    { when = { z = false }, stages = [] },
]
"#,
            ),
            partial(),
        )
        .unwrap();
        let variants = &set.instructions[0].variants;
        assert_eq!(variants[0].condition("Z"), Some(true));
        assert_eq!(variants[1].condition("Z"), Some(false));
        assert_eq!(variants[0].status_conditions[0].key(), "z");
    }

    #[test]
    fn fetch_preamble_is_stage_zero() {
        let isa = isa();
        let set = build_microcode(
            &isa,
            &topology(),
            &document(
                r#"
fetch_preamble = [["pc.write", "mar.read"], ["PC_INC"]]
[instructions.NOP]
stages = []
"#,
            ),
            partial(),
        )
        .unwrap();
        assert_eq!(set.fetch_preamble.len(), 2);
        assert!(set.fetch_preamble.iter().all(|s| s.stage == 0));
        assert_eq!(set.fetch_preamble[0].controls.len(), 2);
    }

    #[test]
    fn errors_accumulate_across_instructions() {
        let isa = isa();
        let errors = build_microcode(
            &isa,
            &topology(),
            &document(
                r#"
fetch_preamble = [["nowhere"]]
[instructions.NOP]
stages = [{ steps = [["PC_INC", "missing"]] }]
[instructions.JMP_ABS]
stages = [{ steps = [["also_missing"]] }]
[instructions.BEQ_REL]
variants = [{ when = { overflow = true } }]
"#,
            ),
            partial(),
        )
        .unwrap_err();

        let locations: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert!(locations[0].contains("fetch_preamble[0]"));
        assert!(locations[1].contains("instruction[NOP_IMP].variant[0].stage[0].step[0]"));
        assert!(matches!(&errors[2], MicrocodeError::UnknownOpcode { symbol, .. } if symbol == "JMP_ABS"));
        assert!(locations[3].contains("instruction[JMP_ABS]"));
        assert!(matches!(&errors[4], MicrocodeError::UnknownStatusFlag { key, location }
            if key == "overflow" && location == "instruction[BEQ_REL].variant[0]"));
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn unknown_bare_name_mentions_fallback() {
        let isa = isa();
        let errors = build_microcode(&isa, &topology(), &document("[instructions.BEQ]\n"), partial())
            .unwrap_err();
        assert_eq!(
            errors[0],
            MicrocodeError::UnknownOpcode {
                name: "BEQ".into(),
                symbol: "BEQ_IMP".into(),
                implied_mode: true,
            }
        );
        assert!(errors[0].to_string().contains("implicit addressing mode assumed"));
    }

    #[test]
    fn strict_naming_rejects_bare_names() {
        let isa = isa();
        let options = BuildOptions {
            naming: NamingRule::strict(),
            ..partial()
        };
        let errors =
            build_microcode(&isa, &topology(), &document("[instructions.NOP]\n"), options).unwrap_err();
        assert!(matches!(&errors[0], MicrocodeError::UnknownOpcode { symbol, implied_mode: false, .. }
            if symbol == "NOP"));
    }

    #[test]
    fn duplicate_microcode_is_rejected() {
        let isa = isa();
        let errors = build_microcode(
            &isa,
            &topology(),
            &document("[instructions.NOP]\n[instructions.nop_imp]\n"),
            partial(),
        )
        .unwrap_err();
        assert_eq!(
            errors,
            vec![MicrocodeError::DuplicateMicrocode {
                symbol: "NOP_IMP".into(),
                first: "NOP".into(),
                second: "nop_imp".into(),
            }]
        );
    }

    #[test]
    fn both_variants_and_stages_is_schema_error() {
        let isa = isa();
        let errors = build_microcode(
            &isa,
            &topology(),
            &document("[instructions.NOP]\nvariants = []\nstages = []\n"),
            partial(),
        )
        .unwrap_err();
        assert!(matches!(&errors[0], MicrocodeError::Schema { location, .. }
            if location == "instruction[NOP_IMP]"));
    }

    #[test]
    fn json_definition_with_both_fields_is_schema_error() {
        let isa = isa();
        let document: MicrocodeDocument = serde_json::from_str(
            r#"{"instructions": {"HLT": {"variants": [{"stages": []}], "stages": [{"steps": [["halt"]]}]}}}"#,
        )
        .unwrap();
        let errors = build_microcode(&isa, &topology(), &document, partial()).unwrap_err();
        assert_eq!(
            errors,
            vec![MicrocodeError::schema(
                "instruction[HLT_IMP]",
                "definition has both 'variants' and 'stages'",
            )]
        );
    }

    #[test]
    fn full_coverage_is_required_by_default() {
        let isa = isa();
        let errors = build_microcode(
            &isa,
            &topology(),
            &document("[instructions.NOP]\n"),
            BuildOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            errors,
            vec![MicrocodeError::MissingMicrocode {
                symbols: vec!["HLT_IMP".into(), "BEQ_REL".into()],
            }]
        );
    }
}
