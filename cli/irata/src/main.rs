//! IRATA2 CLI: builds the ISA model and microcode IR from declarative documents.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand};

use commands::Overrides;
use manifest::IrataManifest;

#[derive(Parser)]
#[command(name = "irata", version, about = "IRATA2 ISA and microcode compiler")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct InputArgs {
    /// Instruction-set document (.toml or .json)
    #[arg(long)]
    isa: Option<PathBuf>,
    /// Microcode document (.toml or .json)
    #[arg(long)]
    microcode: Option<PathBuf>,
    /// Hardware description listing the control lines
    #[arg(long)]
    hardware: Option<PathBuf>,
    /// Require an addressing-mode suffix on every microcode instruction name
    #[arg(long, conflicts_with = "implicit_mode")]
    no_implicit_mode: bool,
    /// Addressing mode assumed for microcode names without a suffix (default: IMP)
    #[arg(long, value_name = "CODE")]
    implicit_mode: Option<String>,
    /// Allow ISA instructions without microcode
    #[arg(long)]
    allow_partial: bool,
}

impl From<InputArgs> for Overrides {
    fn from(args: InputArgs) -> Self {
        Overrides {
            isa: args.isa,
            microcode: args.microcode,
            hardware: args.hardware,
            implicit_mode: args.implicit_mode,
            no_implicit_mode: args.no_implicit_mode,
            allow_partial: args.allow_partial,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate all inputs and write the IR artifact
    Build {
        #[command(flatten)]
        inputs: InputArgs,
        /// Artifact path (default: [output] path from irata.toml, else build/irata.ir.json)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Validate all inputs without writing anything
    Check {
        #[command(flatten)]
        inputs: InputArgs,
    },
    /// Print the opcode table in numeric order
    Opcodes {
        /// Instruction-set document (.toml or .json)
        #[arg(long)]
        isa: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let (manifest, project_dir) = load_manifest_optional(&cwd)?;
    let project_dir = project_dir.unwrap_or(cwd);

    match cli.command {
        Commands::Build { inputs, output } => {
            commands::build::run(
                &project_dir,
                manifest.as_ref(),
                &inputs.into(),
                output.as_deref(),
            )?;
            Ok(())
        }
        Commands::Check { inputs } => {
            commands::check::run(&project_dir, manifest.as_ref(), &inputs.into())
        }
        Commands::Opcodes { isa } => {
            let overrides = Overrides {
                isa,
                ..Overrides::default()
            };
            commands::opcodes::run(&project_dir, manifest.as_ref(), &overrides)
        }
    }
}

/// Try to load a manifest from the current directory upward. Returns (None, None) if not found.
fn load_manifest_optional(cwd: &Path) -> anyhow::Result<(Option<IrataManifest>, Option<PathBuf>)> {
    match IrataManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    use clap::CommandFactory;

    const ISA: &str = r#"
status_flags = []

[[addressing_modes]]
code = "IMP"
name = "Implicit"
description = "No operand"
operands = 0

[[instructions]]
mnemonic = "NOP"
opcode = 0x00
addressing_mode = "IMP"
cycles = 2
category = "control"

[[instructions]]
mnemonic = "HLT"
opcode = 0x01
addressing_mode = "IMP"
cycles = 1
category = "control"
"#;

    const HARDWARE: &str = r#"controls = ["PC_INC", "halt", "pc.write", "mar.read"]"#;

    const MICROCODE: &str = r#"
fetch_preamble = [["pc.write", "mar.read"]]

[instructions]
NOP = { stages = [{ steps = [["PC_INC"]] }] }
HLT = { stages = [{ steps = [["halt"]] }] }
"#;

    fn sample_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/sample")
    }

    /// Lay out a project using the default input paths.
    fn project(isa: &str, microcode: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("isa")).unwrap();
        std::fs::create_dir_all(root.join("microcode")).unwrap();
        std::fs::write(root.join("irata.toml"), "[project]\nname = \"test-cpu\"\n").unwrap();
        std::fs::write(root.join("isa/instructions.toml"), isa).unwrap();
        std::fs::write(root.join("microcode/microcode.toml"), microcode).unwrap();
        std::fs::write(root.join("hardware.toml"), HARDWARE).unwrap();
        dir
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_parse_into_overrides() {
        let cli = Cli::try_parse_from([
            "irata",
            "-vv",
            "build",
            "--isa",
            "cpu.json",
            "--implicit-mode",
            "IMP",
            "--allow-partial",
            "-o",
            "out.json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Build { inputs, output } => {
                let overrides = Overrides::from(inputs);
                assert_eq!(overrides.isa, Some(PathBuf::from("cpu.json")));
                assert_eq!(overrides.implicit_mode.as_deref(), Some("IMP"));
                assert!(overrides.allow_partial);
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            _ => panic!("expected build"),
        }

        let conflict = Cli::try_parse_from([
            "irata",
            "check",
            "--no-implicit-mode",
            "--implicit-mode",
            "IMP",
        ]);
        assert!(conflict.is_err());
    }

    #[test]
    fn build_writes_artifact() {
        let dir = project(ISA, MICROCODE);
        let (manifest, project_dir) = IrataManifest::find_and_load(dir.path()).unwrap().unwrap();

        let written =
            commands::build::run(&project_dir, Some(&manifest), &Overrides::default(), None)
                .unwrap();
        assert_eq!(written, project_dir.join("build/irata.ir.json"));

        let artifact = irata_emit::from_json(&std::fs::read(&written).unwrap()).unwrap();
        assert_eq!(artifact.opcodes.len(), 2);
        let nop = artifact.microcode_for("NOP_IMP").unwrap();
        assert_eq!(nop.variants[0].stages[0].steps[0].controls, vec!["/cpu/PC_INC"]);
    }

    #[test]
    fn rebuild_is_byte_identical() {
        let dir = project(ISA, MICROCODE);
        let output = dir.path().join("a.json");
        let again = dir.path().join("b.json");
        commands::build::run(dir.path(), None, &Overrides::default(), Some(&output)).unwrap();
        commands::build::run(dir.path(), None, &Overrides::default(), Some(&again)).unwrap();
        assert_eq!(std::fs::read(output).unwrap(), std::fs::read(again).unwrap());
    }

    #[test]
    fn unknown_control_fails_check() {
        let microcode = MICROCODE.replace("PC_INC", "BOGUS_LINE");
        let dir = project(ISA, &microcode);
        let err = commands::check::run(dir.path(), None, &Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("microcode build failed with 1 error(s)"));
    }

    #[test]
    fn duplicate_opcode_fails_before_microcode() {
        let isa = ISA.replace("opcode = 0x01", "opcode = 0x00");
        let dir = project(&isa, MICROCODE);
        let err = commands::check::run(dir.path(), None, &Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("ISA build failed"));
        assert!(!dir.path().join("build").exists());
    }

    #[test]
    fn partial_microcode_needs_flag() {
        let microcode = MICROCODE.replace("HLT = { stages = [{ steps = [[\"halt\"]] }] }\n", "");
        let dir = project(ISA, &microcode);
        assert!(commands::check::run(dir.path(), None, &Overrides::default()).is_err());

        let overrides = Overrides {
            allow_partial: true,
            ..Overrides::default()
        };
        commands::check::run(dir.path(), None, &overrides).unwrap();
    }

    #[test]
    fn strict_naming_rejects_bare_names() {
        let dir = project(ISA, MICROCODE);
        let overrides = Overrides {
            no_implicit_mode: true,
            ..Overrides::default()
        };
        assert!(commands::check::run(dir.path(), None, &overrides).is_err());
    }

    #[test]
    fn sample_project_builds() {
        let sample = sample_dir();
        let (manifest, project_dir) = IrataManifest::find_and_load(&sample).unwrap().unwrap();
        assert_eq!(manifest.project.name, "irata2-sample");

        let out = tempfile::tempdir().unwrap();
        let output = out.path().join("sample.ir.json");
        commands::build::run(
            &project_dir,
            Some(&manifest),
            &Overrides::default(),
            Some(&output),
        )
        .unwrap();

        let artifact = irata_emit::from_json(&std::fs::read(&output).unwrap()).unwrap();
        let beq = artifact.microcode_for("BEQ_REL").unwrap();
        assert_eq!(beq.variants.len(), 2);
        assert_eq!(artifact.fetch_preamble.len(), 2);
        let opcodes: Vec<u8> = artifact.opcodes.iter().map(|o| o.opcode).collect();
        let mut sorted = opcodes.clone();
        sorted.sort_unstable();
        assert_eq!(opcodes, sorted);
    }

    #[test]
    fn sample_opcode_table_lists_every_instruction() {
        let sample = sample_dir();
        let isa = commands::compile_isa(&sample.join("isa/instructions.toml")).unwrap();
        assert_eq!(commands::opcodes::table(&isa).len(), isa.len());
    }
}
