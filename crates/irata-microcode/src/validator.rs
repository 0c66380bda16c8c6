//! Control reference validation.
//!
//! Every control name in every step goes through [`ControlReferenceValidator`], which
//! resolves it against the hardware topology and reports failures with the full
//! declaration path.

use crate::error::MicrocodeError;
use crate::location::StepLocation;
use crate::topology::{normalize_path, ControlId, ControlLookup};

/// Resolves control names against a borrowed, read-only topology.
pub struct ControlReferenceValidator<'a> {
    topology: &'a dyn ControlLookup,
}

impl<'a> ControlReferenceValidator<'a> {
    pub fn new(topology: &'a dyn ControlLookup) -> Self {
        Self { topology }
    }

    /// Resolve one control name.
    pub fn require(&self, name: &str, location: &StepLocation) -> Result<ControlId, MicrocodeError> {
        if name.trim().is_empty() {
            return Err(MicrocodeError::EmptyControlName {
                location: location.to_string(),
            });
        }
        self.topology
            .resolve(name)
            .ok_or_else(|| MicrocodeError::UnknownControlLine {
                control: name.to_string(),
                location: location.to_string(),
            })
    }

    /// Resolve every control of a step, in order. Unresolved and repeated names are all
    /// reported.
    pub fn require_step(
        &self,
        names: &[String],
        location: &StepLocation,
    ) -> Result<Vec<ControlId>, Vec<MicrocodeError>> {
        let mut controls = Vec::with_capacity(names.len());
        let mut errors = Vec::new();
        for name in names {
            match self.require(name, location) {
                Ok(id) if controls.contains(&id) => errors.push(MicrocodeError::DuplicateControl {
                    control: normalize_path(name),
                    location: location.to_string(),
                }),
                Ok(id) => controls.push(id),
                Err(err) => errors.push(err),
            }
        }
        if errors.is_empty() {
            Ok(controls)
        } else {
            Err(errors)
        }
    }
}
