//! `irata build`: validate all inputs and write the IR artifact.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::{compile, Inputs, Overrides};
use crate::manifest::{default_output, IrataManifest};

/// Run the pipeline and write the artifact. Returns the path written.
pub fn run(
    project_dir: &Path,
    manifest: Option<&IrataManifest>,
    overrides: &Overrides,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let inputs = Inputs::resolve(project_dir, manifest, overrides);
    let compiled = compile(&inputs)?;

    let emitted = irata_emit::emit(&compiled.isa, &compiled.instruction_set, &compiled.topology)
        .context("emitting IR artifact")?;

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => project_dir.join(
            manifest
                .map(|m| m.output.path.clone())
                .unwrap_or_else(default_output),
        ),
    };
    emitted
        .write_atomic(&output)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Built {} instructions ({} variants) over {} control lines",
        compiled.instruction_set.instructions.len(),
        compiled.instruction_set.variant_count(),
        compiled.topology.len()
    );
    println!("  Artifact: {}", output.display());
    println!("  SHA-256:  {}", emitted.hash());
    Ok(output)
}
