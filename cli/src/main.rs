use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use protoc_gen_pydantic_compiler::error::CompileError;
use protoc_gen_pydantic_compiler::request::request_from_descriptor_set;
use protoc_gen_pydantic_compiler::{generate_from_descriptor_set, load_ir, run_plugin};

#[derive(Parser)]
#[command(name = "protoc-gen-pydantic")]
#[command(about = "Generate Pydantic models from protobuf schemas", long_about = None)]
struct Cli {
    /// Without a subcommand, runs as a protoc plugin over stdin/stdout
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a `protoc --descriptor_set_out` file directly
    Generate {
        /// Serialized `FileDescriptorSet`
        #[arg(short, long)]
        descriptor_set: PathBuf,

        /// Proto file to generate (repeatable)
        #[arg(short, long = "file", required = true)]
        files: Vec<String>,

        /// Plugin parameter string, e.g. `use_integers_for_enums=true`
        #[arg(short, long)]
        parameter: Option<String>,

        /// Output directory (defaults to the current directory)
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Print the intermediate representation as JSON
    DumpIr {
        /// Serialized `FileDescriptorSet`
        #[arg(short, long)]
        descriptor_set: PathBuf,

        /// Files to mark for generation
        #[arg(short, long = "file")]
        files: Vec<String>,
    },
}

fn init_tracing() {
    let filter = std::env::var("PROTOC_GEN_PYDANTIC_LOG")
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new("warn"));
    // stdout carries the plugin response
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match &cli.command {
        None => plugin(),
        Some(Commands::Generate { descriptor_set, files, parameter, out }) => {
            generate(descriptor_set, files, parameter.clone(), out)
        }
        Some(Commands::DumpIr { descriptor_set, files }) => dump_ir(descriptor_set, files),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(category = ?err.category(), "{}", err);
            eprintln!("protoc-gen-pydantic: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn plugin() -> Result<(), CompileError> {
    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input)?;
    let output = run_plugin(&input);
    let mut stdout = io::stdout().lock();
    stdout.write_all(&output)?;
    stdout.flush()?;
    Ok(())
}

fn generate(descriptor_set: &Path, files: &[String], parameter: Option<String>, out: &Path) -> Result<(), CompileError> {
    let bytes = fs::read(descriptor_set)?;
    let generated = generate_from_descriptor_set(&bytes, files.to_vec(), parameter)?;
    for file in &generated {
        let path = out.join(&file.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &file.content)?;
        println!("Generated {}", path.display());
    }
    Ok(())
}

fn dump_ir(descriptor_set: &Path, files: &[String]) -> Result<(), CompileError> {
    let bytes = fs::read(descriptor_set)?;
    let request = request_from_descriptor_set(&bytes, files.to_vec(), None)?;
    let ir = load_ir(&request)?;
    let json = serde_json::to_string_pretty(&ir).map_err(|e| CompileError::Io(e.into()))?;
    println!("{}", json);
    Ok(())
}
