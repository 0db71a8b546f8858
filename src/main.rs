//! Tincture - shader IR and SPIR-V generator
//!
//! # Usage
//!
//! ```bash
//! # Generate SPIR-V from a serialized module
//! tincture spirv shader.tirb -o shader.spv
//!
//! # Print the disassembly and run spirv-val over the result
//! tincture spirv shader.json --disassemble --validate
//!
//! # Print the IR of a module
//! tincture dump shader.tirb
//!
//! # Convert a JSON module to the binary .tirb format
//! tincture encode shader.json -o shader.tirb
//!
//! # Write the sample modules
//! tincture demo -o samples/
//!
//! # Describe a diagnostic code
//! tincture explain E5003
//! ```

use clap::{Parser, Subcommand};
use compiler::codegen::spirv::{BinaryWriter, SpirvVal, SpirvValidator};
use compiler::codegen::{disassemble, generate};
use compiler::config::GeneratorOptions;
use compiler::ir::{binary, dump};
use compiler::{demos, error_codes, logging};
use diagnostics::{Diagnostics, ErrorFormatter};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "tincture")]
#[command(version = "0.1.0")]
#[command(about = "Tincture - shader IR and SPIR-V generator", long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a SPIR-V binary from a module
    Spirv {
        /// Module file (.tirb or .json)
        file: PathBuf,

        /// Output file (defaults to the input with a .spv extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Generator options file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the disassembly of the generated module
        #[arg(long)]
        disassemble: bool,

        /// Run spirv-val over the generated binary
        #[arg(long)]
        validate: bool,
    },

    /// Print the IR of a module
    Dump {
        /// Module file (.tirb or .json)
        file: PathBuf,

        /// Only print this function
        #[arg(long)]
        function: Option<String>,
    },

    /// Convert a module between the JSON and .tirb formats
    Encode {
        /// Input module
        file: PathBuf,

        /// Output file; the extension picks the format
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write the sample modules
    Demo {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Write JSON instead of .tirb
        #[arg(long)]
        json: bool,
    },

    /// Describe an error code such as E5003
    Explain {
        /// Error code
        code: String,
    },

    /// Show information about the generator
    Info,
}

fn main() {
    let cli = Cli::parse();
    logging::init_for_cli(cli.verbose);

    let result = match cli.command {
        Commands::Spirv {
            file,
            output,
            config,
            disassemble,
            validate,
        } => spirv_file(&file, output, config, disassemble, validate),
        Commands::Dump { file, function } => dump_file(&file, function.as_deref()),
        Commands::Encode { file, output } => encode_file(&file, &output),
        Commands::Demo { output, json } => write_demos(&output, json),
        Commands::Explain { code } => explain(&code),
        Commands::Info => {
            show_info();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn format_diagnostics(diagnostics: &Diagnostics) -> String {
    ErrorFormatter::new().format_diagnostics(diagnostics)
}

fn spirv_file(
    file: &Path,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    show_disassembly: bool,
    validate: bool,
) -> Result<(), String> {
    let options = match config {
        Some(path) => GeneratorOptions::load(&path).map_err(|e| e.to_string())?,
        None => GeneratorOptions::default(),
    };
    let module = binary::load(file).map_err(|e| e.to_string())?;
    log::info!("loaded module '{}' from {}", module.name, file.display());

    let generated = generate(&module, &options).map_err(|d| format_diagnostics(&d))?;

    if show_disassembly {
        println!("{}", disassemble(&generated.module));
    }

    if validate {
        let validator = SpirvVal::from_options(&options);
        match validator.validate(&generated.words, options.spirv_version) {
            Ok(outcome) if outcome.ok => println!("✓ spirv-val accepted the module"),
            Ok(outcome) => return Err(format_diagnostics(&outcome.diagnostics)),
            Err(missing) => eprintln!("warning: {}; skipping validation", missing),
        }
    }

    let output = output.unwrap_or_else(|| file.with_extension("spv"));
    std::fs::write(&output, BinaryWriter::to_bytes(&generated.words))
        .map_err(|e| format!("failed to write {}: {}", output.display(), e))?;
    println!(
        "✓ Wrote {} ({} words) to {}",
        module.name,
        generated.words.len(),
        output.display()
    );
    Ok(())
}

fn dump_file(file: &Path, function: Option<&str>) -> Result<(), String> {
    let module = binary::load(file).map_err(|e| e.to_string())?;
    match function {
        Some(name) => {
            let text = dump::dump_function_by_name(&module, name)
                .ok_or_else(|| format!("no function named '{}'", name))?;
            print!("{}", text);
        }
        None => print!("{}", dump::disassemble(&module)),
    }
    Ok(())
}

fn encode_file(file: &Path, output: &Path) -> Result<(), String> {
    let module = binary::load(file).map_err(|e| e.to_string())?;
    binary::save(output, &module).map_err(|e| e.to_string())?;
    println!("✓ Wrote {}", output.display());
    Ok(())
}

fn write_demos(dir: &Path, json: bool) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("failed to create {}: {}", dir.display(), e))?;
    let extension = if json { "json" } else { "tirb" };
    for (name, module) in demos::all() {
        let path = dir.join(format!("{}.{}", name, extension));
        binary::save(&path, &module).map_err(|e| e.to_string())?;
        println!("  {}", path.display());
    }
    Ok(())
}

fn explain(code: &str) -> Result<(), String> {
    match error_codes::lookup_name(code) {
        Some(entry) => {
            println!("{}", entry);
            Ok(())
        }
        None => Err(format!("unknown error code '{}'", code)),
    }
}

fn show_info() {
    println!("Tincture v0.1.0");
    println!("Shader IR with structured regions and a SPIR-V generator\n");

    println!("Formats:");
    println!("  .tirb  binary IR (postcard)");
    println!("  .json  human-editable IR");
    println!("  .spv   SPIR-V output\n");

    println!("Generator defaults:");
    let options = GeneratorOptions::default();
    let (major, minor) = options.spirv_version;
    println!("  SPIR-V version:      {}.{}", major, minor);
    println!("  Debug names:         {}", options.emit_debug_names);
    println!("  Validate IR first:   {}", options.validate_ir);

    let validator = SpirvVal::from_options(&options);
    if validator.is_available() {
        println!("  spirv-val:           available");
    } else {
        println!("  spirv-val:           not found");
    }
}
