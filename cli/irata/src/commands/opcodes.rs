//! `irata opcodes`: print the opcode table.

use std::path::Path;

use anyhow::Result;

use irata_isa::IsaModel;

use super::{compile_isa, Inputs, Overrides};
use crate::manifest::IrataManifest;

pub fn run(project_dir: &Path, manifest: Option<&IrataManifest>, overrides: &Overrides) -> Result<()> {
    let inputs = Inputs::resolve(project_dir, manifest, overrides);
    let isa = compile_isa(&inputs.isa)?;
    for line in table(&isa) {
        println!("{line}");
    }
    Ok(())
}

/// One line per instruction, in numeric opcode order.
pub fn table(isa: &IsaModel) -> Vec<String> {
    let width = isa
        .instructions()
        .iter()
        .map(|i| i.symbol.len())
        .max()
        .unwrap_or(0);
    isa.by_opcode()
        .map(|i| {
            format!(
                "0x{:02X}  {:<width$}  {:<4} {} byte(s)  {} cycle(s)  {}",
                i.opcode,
                i.symbol,
                i.addressing_mode.code,
                i.length(),
                i.cycles,
                i.category,
            )
        })
        .collect()
}
