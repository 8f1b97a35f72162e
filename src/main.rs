use std::path::PathBuf;

use clap::Parser;
use inkwell::context::Context;
use neon_lang::compiler::Program;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Primary source file to compile.
    file: PathBuf,

    /// Print the parse tree, AST and IR of every compiled module.
    #[arg(short, long)]
    verbose: bool,

    /// Path of the object file to write.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let level = if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Warn
    };
    simple_logger::init_with_level(level)?;

    let context = Context::create();
    let mut program = Program::new(&context, args.file, args.verbose);
    program.compile()?;

    let output = args.output.unwrap_or_else(|| program.object_file_path());
    program.write_object_file(&output)
}
