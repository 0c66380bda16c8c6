//! `irata check`: validate all inputs without writing an artifact.

use std::path::Path;

use anyhow::Result;

use super::{compile, Inputs, Overrides};
use crate::manifest::IrataManifest;

pub fn run(project_dir: &Path, manifest: Option<&IrataManifest>, overrides: &Overrides) -> Result<()> {
    let inputs = Inputs::resolve(project_dir, manifest, overrides);
    let compiled = compile(&inputs)?;
    println!(
        "ok: {} instructions, {} microcode entries ({} variants), {} control lines",
        compiled.isa.len(),
        compiled.instruction_set.instructions.len(),
        compiled.instruction_set.variant_count(),
        compiled.topology.len()
    );
    Ok(())
}
