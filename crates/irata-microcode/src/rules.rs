//! Structural rules over resolved steps.
//!
//! A control path splits into a component (everything before the last `/`) and an
//! operation (the last segment): `/cpu/a/read` is the `read` operation of `/cpu/a`.
//! - **Conflicts:** one step may not ask a component for opposing operations
//! - **Phases:** a control with a declared phase must act in the phase its operation implies
//! - **Stage gaps:** an empty stage may not precede a stage that has steps

use std::collections::{BTreeMap, HashSet};

use crate::error::MicrocodeError;
use crate::ir::{InstructionSet, Step};
use crate::location::{stage_location, StepLocation};
use crate::topology::{ControlLookup, TickPhase};

/// Operations that cannot share a step on the same component.
const OPPOSING: [(&str, &str); 3] = [("read", "write"), ("set", "clear"), ("increment", "decrement")];

/// Every step of the set with its location, fetch preamble first.
pub fn located_steps(instruction_set: &InstructionSet) -> impl Iterator<Item = (StepLocation, &Step)> {
    let preamble = instruction_set
        .fetch_preamble
        .iter()
        .enumerate()
        .map(|(step, s)| (StepLocation::FetchPreamble { step }, s));
    let body = instruction_set.instructions.iter().flat_map(|instruction| {
        instruction
            .variants
            .iter()
            .enumerate()
            .flat_map(move |(variant, v)| {
                v.stages.iter().flat_map(move |stage| {
                    stage.steps.iter().enumerate().map(move |(step, s)| {
                        let location = StepLocation::Instruction {
                            name: instruction.symbol().to_string(),
                            variant,
                            stage: stage.index,
                            step,
                        };
                        (location, s)
                    })
                })
            })
    });
    preamble.chain(body)
}

fn split_path(path: &str) -> (&str, &str) {
    path.rsplit_once('/').unwrap_or((path, ""))
}

/// Report every step that drives opposing operations on one component.
pub fn check_control_conflicts(
    topology: &dyn ControlLookup,
    instruction_set: &InstructionSet,
) -> Result<(), Vec<MicrocodeError>> {
    let mut errors = Vec::new();
    for (location, step) in located_steps(instruction_set) {
        let mut operations: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for &id in &step.controls {
            let (component, operation) = split_path(&topology.control(id).path);
            operations.entry(component).or_default().push(operation);
        }
        for (component, ops) in &operations {
            for (first, second) in OPPOSING {
                if ops.contains(&first) && ops.contains(&second) {
                    errors.push(MicrocodeError::ControlConflict {
                        component: component.to_string(),
                        first: first.to_string(),
                        second: second.to_string(),
                        location: location.to_string(),
                    });
                }
            }
        }
    }
    finish(errors)
}

/// Phase an operation must act in, if its name implies one.
pub fn expected_phase(operation: &str) -> Option<TickPhase> {
    match operation {
        "read" => Some(TickPhase::Read),
        "write" => Some(TickPhase::Write),
        "increment" | "decrement" | "set" | "clear" | "latch" => Some(TickPhase::Process),
        _ => None,
    }
}

/// Report controls whose declared phase disagrees with their operation. Each control is
/// reported once, at its first use. Controls without a declared phase are not checked.
pub fn check_phase_ordering(
    topology: &dyn ControlLookup,
    instruction_set: &InstructionSet,
) -> Result<(), Vec<MicrocodeError>> {
    let mut errors = Vec::new();
    let mut reported = HashSet::new();
    for (location, step) in located_steps(instruction_set) {
        for &id in &step.controls {
            let line = topology.control(id);
            let Some(phase) = line.phase else { continue };
            let Some(expected) = expected_phase(split_path(&line.path).1) else {
                continue;
            };
            if phase != expected && reported.insert(id) {
                errors.push(MicrocodeError::PhaseMismatch {
                    control: line.path.clone(),
                    phase,
                    expected,
                    location: location.to_string(),
                });
            }
        }
    }
    finish(errors)
}

/// Report empty stages that come before a stage with steps.
pub fn check_stage_gaps(instruction_set: &InstructionSet) -> Result<(), Vec<MicrocodeError>> {
    let mut errors = Vec::new();
    for instruction in &instruction_set.instructions {
        for (variant_index, variant) in instruction.variants.iter().enumerate() {
            let Some(last) = variant.stages.iter().rposition(|s| !s.steps.is_empty()) else {
                continue;
            };
            for stage in &variant.stages[..last] {
                if stage.steps.is_empty() {
                    errors.push(MicrocodeError::StageGap {
                        location: stage_location(instruction.symbol(), variant_index, stage.index),
                    });
                }
            }
        }
    }
    finish(errors)
}

fn finish(errors: Vec<MicrocodeError>) -> Result<(), Vec<MicrocodeError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
