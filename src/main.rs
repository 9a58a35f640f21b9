use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use stackc::codegen::CodeGenerator;
use stackc::parser::Parser;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(ClapParser)]
#[command(name = "stackc")]
#[command(about = "Compiler for a small C-like language targeting a stack virtual machine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the input file and print the syntax tree
    Parse {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Compile the input file to stack-machine assembly
    Compile {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output file path (defaults to FILE.vasm next to the input)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Print the listing to stdout even when writing to file
        #[arg(short, long)]
        print: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { file } => parse_file(&file)?,
        Commands::Compile {
            file,
            output,
            print,
        } => compile_file(&file, output.as_deref(), print)?,
    }

    Ok(())
}

fn parse_file(path: &Path) -> Result<()> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read file '{}'", path.display()))?;

    let program = Parser::parse(&source)
        .with_context(|| format!("failed to parse '{}'", path.display()))?;

    println!("{program}");
    Ok(())
}

fn compile_file(path: &Path, output: Option<&Path>, print: bool) -> Result<()> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read file '{}'", path.display()))?;

    let program = Parser::parse(&source)
        .with_context(|| format!("failed to parse '{}'", path.display()))?;

    let listing = CodeGenerator::new()
        .generate(&program)
        .with_context(|| format!("failed to generate code for '{}'", path.display()))?;

    let output_path = output.map_or_else(
        || PathBuf::from(format!("{}.vasm", path.display())),
        Path::to_path_buf,
    );
    fs::write(&output_path, &listing)
        .with_context(|| format!("failed to write listing to '{}'", output_path.display()))?;

    if print {
        println!("{listing}");
    } else {
        println!("assembly written to: {}", output_path.display());
    }

    Ok(())
}
