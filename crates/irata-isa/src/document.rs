//! Declaration records for the instruction-set document.
//!
//! These mirror the on-disk layout one-to-one. Unknown fields are rejected so that a typo
//! in a hand-authored document fails loudly instead of silently dropping data.

use serde::{Deserialize, Serialize};

/// Top-level instruction-set document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsaDocument {
    pub addressing_modes: Vec<AddressingModeDecl>,
    pub status_flags: Vec<StatusFlagDecl>,
    pub instructions: Vec<InstructionDecl>,
}

/// One entry of `addressing_modes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddressingModeDecl {
    /// Symbolic id (e.g. `IMM`, `IMP`).
    pub code: String,
    pub name: String,
    pub description: String,
    /// Operand byte count following the opcode.
    pub operands: u8,
    /// Assembly syntax template (e.g. `#$nn`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax: Option<String>,
}

/// One entry of `status_flags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusFlagDecl {
    pub code: String,
    pub name: String,
    pub bit: u8,
    #[serde(default)]
    pub description: String,
}

/// One entry of `instructions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstructionDecl {
    pub mnemonic: String,
    #[serde(with = "byte_literal")]
    pub opcode: u8,
    pub addressing_mode: String,
    pub cycles: u8,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub flags_affected: Vec<String>,
}

/// Serde adapter for byte values written either as integers or as strings such as `"0x1F"`.
///
/// JSON has no hexadecimal literal, so string forms are accepted in every format.
pub mod byte_literal {
    use serde::de::{self, Deserializer, Unexpected, Visitor};
    use serde::Serializer;
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        deserializer.deserialize_any(ByteVisitor)
    }

    /// Parse `"0x1F"`, `"0X1f"` or `"31"` into a byte.
    pub fn parse(text: &str) -> Option<u8> {
        let text = text.trim();
        match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) if !hex.is_empty() => u8::from_str_radix(hex, 16).ok(),
            Some(_) => None,
            None => text.parse().ok(),
        }
    }

    struct ByteVisitor;

    impl<'de> Visitor<'de> for ByteVisitor {
        type Value = u8;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a byte value 0-255, as an integer or a \"0x..\" string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u8, E> {
            u8::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u8, E> {
            u8::try_from(v).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u8, E> {
            parse(v).ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
        }
    }
}
