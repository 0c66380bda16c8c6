//! CLI command implementations and the pipeline they share.

pub mod build;
pub mod check;
pub mod opcodes;

use std::fmt::Display;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use irata_isa::parse::load_isa;
use irata_isa::{build_isa, IsaModel, NamingRule};
use irata_microcode::parse::{load_hardware, load_microcode};
use irata_microcode::{build_microcode, BuildOptions, HardwareTopology, InstructionSet};

use crate::manifest::IrataManifest;

/// Command-line values that take precedence over the manifest.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub isa: Option<PathBuf>,
    pub microcode: Option<PathBuf>,
    pub hardware: Option<PathBuf>,
    pub implicit_mode: Option<String>,
    pub no_implicit_mode: bool,
    pub allow_partial: bool,
}

/// Fully resolved input paths and build options.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub isa: PathBuf,
    pub microcode: PathBuf,
    pub hardware: PathBuf,
    pub options: BuildOptions,
}

impl Inputs {
    /// Manifest paths are relative to `project_dir`; command-line paths are used as given.
    pub fn resolve(
        project_dir: &Path,
        manifest: Option<&IrataManifest>,
        overrides: &Overrides,
    ) -> Self {
        let config = manifest.map(|m| m.inputs.clone()).unwrap_or_default();
        let mut options = manifest.map(|m| m.build.options()).unwrap_or_default();

        if overrides.no_implicit_mode {
            options.naming = NamingRule::strict();
        } else if let Some(mode) = &overrides.implicit_mode {
            options.naming = NamingRule::with_implicit_mode(mode.to_ascii_uppercase());
        }
        if overrides.allow_partial {
            options.require_full_coverage = false;
        }

        let pick = |flag: &Option<PathBuf>, configured: PathBuf| {
            flag.clone().unwrap_or_else(|| project_dir.join(configured))
        };
        Inputs {
            isa: pick(&overrides.isa, config.isa),
            microcode: pick(&overrides.microcode, config.microcode),
            hardware: pick(&overrides.hardware, config.hardware),
            options,
        }
    }
}

/// Everything a successful build produces.
#[derive(Debug)]
pub struct Compiled {
    pub isa: IsaModel,
    pub topology: HardwareTopology,
    pub instruction_set: InstructionSet,
}

/// Print each accumulated error on its own line and fold them into one failure.
fn report<E: Display>(stage: &str, errors: Vec<E>) -> anyhow::Error {
    for err in &errors {
        eprintln!("error: {err}");
    }
    anyhow::anyhow!("{stage} failed with {} error(s)", errors.len())
}

/// Load and build the ISA model alone.
pub fn compile_isa(path: &Path) -> Result<IsaModel> {
    let document = load_isa(path).with_context(|| format!("loading {}", path.display()))?;
    build_isa(&document).map_err(|errors| report("ISA build", errors))
}

/// Run the full pipeline: ISA model, hardware topology, microcode.
pub fn compile(inputs: &Inputs) -> Result<Compiled> {
    let isa = compile_isa(&inputs.isa)?;

    let hardware = load_hardware(&inputs.hardware)
        .with_context(|| format!("loading {}", inputs.hardware.display()))?;
    let topology =
        HardwareTopology::from_document(&hardware).map_err(|errors| report("hardware", errors))?;
    info!("hardware topology has {} control lines", topology.len());

    let document = load_microcode(&inputs.microcode)
        .with_context(|| format!("loading {}", inputs.microcode.display()))?;
    let instruction_set = build_microcode(&isa, &topology, &document, inputs.options.clone())
        .map_err(|errors| report("microcode build", errors))?;

    Ok(Compiled {
        isa,
        topology,
        instruction_set,
    })
}
