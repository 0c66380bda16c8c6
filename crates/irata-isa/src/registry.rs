//! Addressing-mode and status-flag registries.
//!
//! Both registries are built once and then only read. Entries are handed out as
//! `Arc`s so instructions and microcode variants share the same records.

use std::collections::HashMap;
use std::sync::Arc;

use crate::document::{AddressingModeDecl, StatusFlagDecl};
use crate::error::IsaError;

/// Highest usable status-bit position (the status register is one byte).
pub const MAX_STATUS_BIT: u8 = 7;

/// A resolved addressing mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressingMode {
    pub code: String,
    pub name: String,
    pub description: String,
    pub operand_bytes: u8,
    pub syntax: Option<String>,
}

/// A resolved status flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFlag {
    pub code: String,
    pub name: String,
    pub bit: u8,
    pub description: String,
}

impl StatusFlag {
    /// Mask of this flag inside the status byte.
    pub fn mask(&self) -> u8 {
        1 << self.bit
    }

    /// Whether a (case-insensitive) guard key names this flag by code or by name.
    pub fn matches_key(&self, key: &str) -> bool {
        self.code.eq_ignore_ascii_case(key) || self.name.eq_ignore_ascii_case(key)
    }
}

/// Addressing modes keyed by code, kept in declaration order.
#[derive(Debug, Clone, Default)]
pub struct AddressingModeRegistry {
    modes: Vec<Arc<AddressingMode>>,
    by_code: HashMap<String, usize>,
}

impl AddressingModeRegistry {
    /// Build the registry, reporting every malformed or duplicate declaration.
    pub fn build(decls: &[AddressingModeDecl]) -> Result<Self, Vec<IsaError>> {
        let (registry, errors) = Self::build_lenient(decls);
        if errors.is_empty() {
            Ok(registry)
        } else {
            Err(errors)
        }
    }

    /// Build from every well-formed declaration, returning the rejects alongside.
    pub(crate) fn build_lenient(decls: &[AddressingModeDecl]) -> (Self, Vec<IsaError>) {
        let mut registry = Self::default();
        let mut errors = Vec::new();

        for (index, decl) in decls.iter().enumerate() {
            let location = format!("addressing_modes[{index}]");
            if let Err(err) = check_identifier(&decl.code, &format!("{location}.code")) {
                errors.push(err);
                continue;
            }
            if registry.by_code.contains_key(&decl.code) {
                errors.push(IsaError::DuplicateAddressingMode {
                    code: decl.code.clone(),
                    location,
                });
                continue;
            }
            registry.by_code.insert(decl.code.clone(), registry.modes.len());
            registry.modes.push(Arc::new(AddressingMode {
                code: decl.code.clone(),
                name: decl.name.clone(),
                description: decl.description.clone(),
                operand_bytes: decl.operands,
                syntax: decl.syntax.clone(),
            }));
        }

        (registry, errors)
    }

    /// Look up a mode by its exact code.
    pub fn get(&self, code: &str) -> Option<&Arc<AddressingMode>> {
        self.by_code.get(code).map(|&i| &self.modes[i])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    /// Modes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<AddressingMode>> {
        self.modes.iter()
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

/// Status flags keyed by code, kept in declaration order.
#[derive(Debug, Clone, Default)]
pub struct StatusFlagRegistry {
    flags: Vec<Arc<StatusFlag>>,
    by_code: HashMap<String, usize>,
    by_bit: [Option<usize>; MAX_STATUS_BIT as usize + 1],
}

impl StatusFlagRegistry {
    /// Build the registry, reporting every malformed, duplicate, or colliding declaration.
    pub fn build(decls: &[StatusFlagDecl]) -> Result<Self, Vec<IsaError>> {
        let (registry, errors) = Self::build_lenient(decls);
        if errors.is_empty() {
            Ok(registry)
        } else {
            Err(errors)
        }
    }

    pub(crate) fn build_lenient(decls: &[StatusFlagDecl]) -> (Self, Vec<IsaError>) {
        let mut registry = Self::default();
        let mut errors = Vec::new();

        for (index, decl) in decls.iter().enumerate() {
            let location = format!("status_flags[{index}]");
            if let Err(err) = check_identifier(&decl.code, &format!("{location}.code")) {
                errors.push(err);
                continue;
            }
            if decl.bit > MAX_STATUS_BIT {
                errors.push(IsaError::schema(
                    format!("{location}.bit"),
                    format!("bit {} is out of range 0-{MAX_STATUS_BIT}", decl.bit),
                ));
                continue;
            }
            if registry.by_code.contains_key(&decl.code) {
                errors.push(IsaError::DuplicateStatusFlag {
                    code: decl.code.clone(),
                    location,
                });
                continue;
            }
            if let Some(existing) = registry.by_bit[decl.bit as usize] {
                errors.push(IsaError::StatusBitConflict {
                    bit: decl.bit,
                    first: registry.flags[existing].code.clone(),
                    second: decl.code.clone(),
                });
                continue;
            }

            let slot = registry.flags.len();
            registry.by_code.insert(decl.code.clone(), slot);
            registry.by_bit[decl.bit as usize] = Some(slot);
            registry.flags.push(Arc::new(StatusFlag {
                code: decl.code.clone(),
                name: decl.name.clone(),
                bit: decl.bit,
                description: decl.description.clone(),
            }));
        }

        (registry, errors)
    }

    /// Look up a flag by its exact code.
    pub fn get(&self, code: &str) -> Option<&Arc<StatusFlag>> {
        self.by_code.get(code).map(|&i| &self.flags[i])
    }

    /// Resolve a microcode guard key. Keys are matched case-insensitively against flag
    /// codes first, then flag names.
    pub fn find_guard(&self, key: &str) -> Option<&Arc<StatusFlag>> {
        self.flags
            .iter()
            .find(|flag| flag.code.eq_ignore_ascii_case(key))
            .or_else(|| self.flags.iter().find(|flag| flag.matches_key(key)))
    }

    /// Flags in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<StatusFlag>> {
        self.flags.iter()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Codes, mnemonics, and categories become enumerator names downstream, so they must be
/// plain identifiers.
pub(crate) fn check_identifier(value: &str, location: &str) -> Result<(), IsaError> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(IsaError::schema(
            location,
            format!("'{value}' is not a valid identifier"),
        ))
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
