//! Declaration records for the microcode document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One step: the control names activated together.
pub type StepDecl = Vec<String>;

/// Top-level microcode document.
///
/// `instructions` keeps document order; the resolver walks it in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MicrocodeDocument {
    #[serde(default)]
    pub fetch_preamble: Vec<StepDecl>,
    #[serde(default, deserialize_with = "unique_keys::deserialize")]
    pub instructions: IndexMap<String, MicrocodeDefinition>,
}

/// Microcode of one instruction: explicit `variants`, or a bare `stages` list that forms a
/// single unconditional variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MicrocodeDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<VariantDecl>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<StageDecl>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantDecl {
    /// Guard: flag key to required value. Empty or absent means "always".
    #[serde(default, deserialize_with = "unique_keys::deserialize")]
    pub when: IndexMap<String, bool>,
    #[serde(default)]
    pub stages: Vec<StageDecl>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageDecl {
    #[serde(default)]
    pub steps: Vec<StepDecl>,
}

/// Ordered map deserialization that rejects repeated keys.
///
/// TOML already refuses duplicate keys; JSON parsers keep the last one, which would
/// silently replace an earlier instruction or guard.
pub mod unique_keys {
    use std::fmt;
    use std::marker::PhantomData;

    use indexmap::IndexMap;
    use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<IndexMap<String, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        deserializer.deserialize_map(UniqueKeyVisitor(PhantomData))
    }

    struct UniqueKeyVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueKeyVisitor<V> {
        type Value = IndexMap<String, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map with unique keys")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
            while let Some(key) = access.next_key::<String>()? {
                if map.contains_key(&key) {
                    return Err(de::Error::custom(format_args!("duplicate key '{key}'")));
                }
                let value = access.next_value()?;
                map.insert(key, value);
            }
            Ok(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_keep_document_order() {
        let document: MicrocodeDocument = toml::from_str(
            r#"
fetch_preamble = [["pc.write", "mar.read"], ["memory.write", "ir.read"]]

[instructions.TAX]
stages = [{ steps = [["a.write", "x.read"]] }]

[instructions.NOP]
stages = []

[instructions.BEQ_REL]
variants = [
    { when = { zero = true }, stages = [{ steps = [["pc.jump"]] }] },
    { when = { zero = false }, stages = [{ steps = [[]] }] },
]
"#,
        )
        .unwrap();

        let names: Vec<_> = document.instructions.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["TAX", "NOP", "BEQ_REL"]);
        assert_eq!(document.fetch_preamble.len(), 2);

        let beq = &document.instructions["BEQ_REL"];
        let variants = beq.variants.as_ref().unwrap();
        assert_eq!(variants[0].when.get("zero"), Some(&true));
        assert!(variants[1].stages[0].steps[0].is_empty());
        assert!(beq.stages.is_none());
    }

    #[test]
    fn json_documents_keep_order_too() {
        let document: MicrocodeDocument = serde_json::from_str(
            r#"{"instructions": {"Z_IMP": {"stages": []}, "A_IMP": {}}}"#,
        )
        .unwrap();
        let names: Vec<_> = document.instructions.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Z_IMP", "A_IMP"]);
        assert!(document.fetch_preamble.is_empty());
    }

    #[test]
    fn unknown_definition_field_is_rejected() {
        let result: Result<MicrocodeDocument, _> =
            serde_json::from_str(r#"{"instructions": {"NOP": {"stage": []}}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn repeated_instruction_in_json_is_rejected() {
        let err = serde_json::from_str::<MicrocodeDocument>(
            r#"{"instructions": {"NOP": {"stages": [{"steps": [["a"]]}]}, "HLT": {}, "NOP": {"stages": []}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate key 'NOP'"));
    }

    #[test]
    fn repeated_guard_key_in_json_is_rejected() {
        let err = serde_json::from_str::<MicrocodeDocument>(
            r#"{"instructions": {"BEQ_REL": {"variants": [{"when": {"zero": true, "zero": false}}]}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate key 'zero'"));
    }

    #[test]
    fn repeated_keys_are_rejected_in_toml_too() {
        let result: Result<MicrocodeDocument, _> =
            toml::from_str("[instructions.NOP]\nstages = []\n[instructions.NOP]\nstages = []\n");
        assert!(result.is_err());
    }

    #[test]
    fn json_definition_may_carry_both_fields_until_resolution() {
        let document: MicrocodeDocument = serde_json::from_str(
            r#"{"instructions": {"NOP": {"variants": [], "stages": []}}}"#,
        )
        .unwrap();
        let nop = &document.instructions["NOP"];
        assert!(nop.variants.is_some() && nop.stages.is_some());
    }
}
