//! Locations of microcode declarations, used in error messages.

use std::fmt;

/// Where a step (or part of one) was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepLocation {
    /// `fetch_preamble[step]`
    FetchPreamble { step: usize },
    /// `instruction[name].variant[i].stage[j].step[k]`
    Instruction {
        name: String,
        variant: usize,
        stage: usize,
        step: usize,
    },
}

impl fmt::Display for StepLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepLocation::FetchPreamble { step } => write!(f, "fetch_preamble[{step}]"),
            StepLocation::Instruction {
                name,
                variant,
                stage,
                step,
            } => write!(
                f,
                "instruction[{name}].variant[{variant}].stage[{stage}].step[{step}]"
            ),
        }
    }
}

/// `instruction[name].variant[i]`, for guard errors.
pub fn variant_location(name: &str, variant: usize) -> String {
    format!("instruction[{name}].variant[{variant}]")
}

/// `instruction[name].variant[i].stage[j]`, for stage errors.
pub fn stage_location(name: &str, variant: usize, stage: usize) -> String {
    format!("instruction[{name}].variant[{variant}].stage[{stage}]")
}
