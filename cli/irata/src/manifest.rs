//! `irata.toml` project configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use irata_isa::{NamingRule, DEFAULT_IMPLICIT_MODE};
use irata_microcode::BuildOptions;

/// File name searched for by [`IrataManifest::find_and_load`].
pub const MANIFEST_NAME: &str = "irata.toml";

/// The top-level manifest of an IRATA2 project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IrataManifest {
    pub project: ProjectConfig,
    #[serde(default)]
    pub inputs: InputsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Input documents, relative to the manifest directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputsConfig {
    #[serde(default = "default_isa")]
    pub isa: PathBuf,
    #[serde(default = "default_microcode")]
    pub microcode: PathBuf,
    #[serde(default = "default_hardware")]
    pub hardware: PathBuf,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            isa: default_isa(),
            microcode: default_microcode(),
            hardware: default_hardware(),
        }
    }
}

fn default_isa() -> PathBuf {
    PathBuf::from("isa/instructions.toml")
}

fn default_microcode() -> PathBuf {
    PathBuf::from("microcode/microcode.toml")
}

fn default_hardware() -> PathBuf {
    PathBuf::from("hardware.toml")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output(),
        }
    }
}

pub fn default_output() -> PathBuf {
    PathBuf::from("build/irata.ir.json")
}

/// `[build]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Addressing mode assumed for microcode names without a mode suffix.
    #[serde(default)]
    pub implicit_mode: Option<String>,
    #[serde(default = "enabled")]
    pub implicit_fallback: bool,
    #[serde(default = "enabled")]
    pub require_full_coverage: bool,
    #[serde(default = "enabled")]
    pub check_status_coverage: bool,
    #[serde(default = "enabled")]
    pub check_control_conflicts: bool,
    #[serde(default = "enabled")]
    pub check_phase_ordering: bool,
    #[serde(default = "enabled")]
    pub check_stage_gaps: bool,
}

fn enabled() -> bool {
    true
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            implicit_mode: None,
            implicit_fallback: true,
            require_full_coverage: true,
            check_status_coverage: true,
            check_control_conflicts: true,
            check_phase_ordering: true,
            check_stage_gaps: true,
        }
    }
}

impl BuildConfig {
    pub fn naming_rule(&self) -> NamingRule {
        if !self.implicit_fallback {
            return NamingRule::strict();
        }
        let mode = self
            .implicit_mode
            .as_deref()
            .unwrap_or(DEFAULT_IMPLICIT_MODE)
            .to_ascii_uppercase();
        NamingRule::with_implicit_mode(mode)
    }

    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            naming: self.naming_rule(),
            require_full_coverage: self.require_full_coverage,
            check_status_coverage: self.check_status_coverage,
            check_control_conflicts: self.check_control_conflicts,
            check_phase_ordering: self.check_phase_ordering,
            check_stage_gaps: self.check_stage_gaps,
        }
    }
}

impl IrataManifest {
    /// Search upward from `start_dir` for an `irata.toml` file, parse and return it
    /// along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_NAME);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: IrataManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing irata.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_manifest_uses_defaults() {
        let manifest = IrataManifest::from_str("[project]\nname = \"cpu\"\n").unwrap();
        assert_eq!(manifest.project.name, "cpu");
        assert_eq!(manifest.inputs.isa, PathBuf::from("isa/instructions.toml"));
        assert_eq!(manifest.output.path, PathBuf::from("build/irata.ir.json"));
        assert_eq!(manifest.build.options(), BuildOptions::default());
    }

    #[test]
    fn build_section_is_kebab_case() {
        let manifest = IrataManifest::from_str(
            r#"
[project]
name = "cpu"

[build]
implicit-mode = "NONE"
require-full-coverage = false
check-status-coverage = false
check-control-conflicts = false
check-phase-ordering = false
check-stage-gaps = false
"#,
        )
        .unwrap();
        let options = manifest.build.options();
        assert_eq!(options.naming.implicit_mode(), Some("NONE"));
        assert!(!options.require_full_coverage);
        assert!(!options.check_status_coverage);
        assert!(!options.check_control_conflicts);
        assert!(!options.check_phase_ordering);
        assert!(!options.check_stage_gaps);
    }

    #[test]
    fn implicit_mode_is_upper_cased() {
        let manifest = IrataManifest::from_str(
            "[project]\nname = \"cpu\"\n[build]\nimplicit-mode = \"imp\"\n",
        )
        .unwrap();
        assert_eq!(manifest.build.naming_rule().implicit_mode(), Some("IMP"));
        assert_eq!(manifest.build.options().naming, NamingRule::default());
    }

    #[test]
    fn fallback_can_be_disabled() {
        let manifest = IrataManifest::from_str(
            "[project]\nname = \"cpu\"\n[build]\nimplicit-fallback = false\n",
        )
        .unwrap();
        assert_eq!(manifest.build.naming_rule(), NamingRule::strict());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(IrataManifest::from_str("[project]\nname = \"cpu\"\n[build]\nimplicit = true\n").is_err());
    }

    #[test]
    fn find_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_NAME), "[project]\nname = \"up\"\n").unwrap();
        let nested = dir.path().join("microcode").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        let (manifest, found) = IrataManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(manifest.project.name, "up");
        assert_eq!(found, dir.path());
    }
}
