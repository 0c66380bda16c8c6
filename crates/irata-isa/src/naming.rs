//! Symbolic instruction names.
//!
//! Every instruction is identified by `<mnemonic>_<mode>` (e.g. `LDA_IMM`). Microcode
//! documents may abbreviate instructions that use the implicit addressing mode to the bare
//! mnemonic (`NOP` for `NOP_IMP`); [`NamingRule`] makes that abbreviation explicit and
//! switchable.

/// Addressing-mode code assumed for microcode names without a mode suffix.
pub const DEFAULT_IMPLICIT_MODE: &str = "IMP";

/// Canonical symbol of an instruction.
pub fn opcode_symbol(mnemonic: &str, mode_code: &str) -> String {
    format!("{mnemonic}_{mode_code}")
}

/// Outcome of resolving a microcode instruction name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// Symbol to look up in the ISA model.
    pub symbol: String,
    /// The implicit addressing mode was appended because the name had no suffix.
    pub implied_mode: bool,
}

/// Rule mapping microcode instruction names to opcode symbols.
///
/// The rule is total:
/// 1. the name is upper-cased;
/// 2. if it contains `_` it already names a mode and is used unchanged;
/// 3. otherwise, when an implicit mode is configured, `_<mode>` is appended;
/// 4. otherwise the bare upper-cased name is used (and will normally not match any symbol).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingRule {
    implicit_mode: Option<String>,
}

impl NamingRule {
    /// Rule that appends `implicit_mode` to suffix-less names.
    pub fn with_implicit_mode(implicit_mode: impl Into<String>) -> Self {
        Self {
            implicit_mode: Some(implicit_mode.into()),
        }
    }

    /// Rule with no fallback: every microcode name must carry its mode suffix.
    pub fn strict() -> Self {
        Self { implicit_mode: None }
    }

    /// The configured implicit mode, if the fallback is enabled.
    pub fn implicit_mode(&self) -> Option<&str> {
        self.implicit_mode.as_deref()
    }

    pub fn resolve(&self, name: &str) -> ResolvedName {
        let upper = name.to_ascii_uppercase();
        if upper.contains('_') {
            return ResolvedName {
                symbol: upper,
                implied_mode: false,
            };
        }
        match &self.implicit_mode {
            Some(mode) => ResolvedName {
                symbol: opcode_symbol(&upper, mode),
                implied_mode: true,
            },
            None => ResolvedName {
                symbol: upper,
                implied_mode: false,
            },
        }
    }
}

impl Default for NamingRule {
    fn default() -> Self {
        Self::with_implicit_mode(DEFAULT_IMPLICIT_MODE)
    }
}
