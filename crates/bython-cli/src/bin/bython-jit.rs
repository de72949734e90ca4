//! `bython-jit`: compile a Bython program with Cranelift, optionally print
//! its IR, and run it.

use std::path::PathBuf;

use bython_cli::{
    diagnostics_status, exit_with, init_tracing, program_status, read_source, report, CliError,
    OptFlag, EXIT_DIAGNOSTICS, EXIT_FATAL,
};
use bython_compiler::{compile, ir_header, CompileOptions};
use clap::Parser;

#[derive(Parser)]
#[command(name = "bython-jit")]
#[command(about = "JIT-compile and run a Bython program", long_about = None)]
struct Cli {
    /// Print the Cranelift IR of every function to stdout
    #[arg(long)]
    emit_ir: bool,

    /// Run the program (implied unless --emit-ir is given)
    #[arg(long)]
    run: bool,

    /// Code generation level
    #[arg(short = 'O', value_enum, default_value_t = OptFlag::Debug)]
    opt: OptFlag,

    /// Log stage progress to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Bython source file
    path: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    exit_with(run(&cli))
}

fn run(cli: &Cli) -> Result<i32, CliError> {
    let source = read_source(&cli.path)?;
    let options = CompileOptions {
        jit: cli.opt.jit_options(),
        ..CompileOptions::default()
    };
    let outcome = match compile(&source, &options) {
        Ok(outcome) => outcome,
        Err(failure) => {
            report(&failure.diagnostics, false)?;
            return Ok(EXIT_FATAL);
        }
    };
    report(&outcome.diagnostics, false)?;
    let Some(engine) = outcome.engine else {
        return Ok(diagnostics_status(&outcome.diagnostics).max(EXIT_DIAGNOSTICS));
    };

    if cli.emit_ir {
        println!("{}", ir_header(&source));
        print!("{}", engine.ir());
    }
    if cli.run || !cli.emit_ir {
        let execution = engine.run()?;
        tracing::info!(exit_code = execution.exit_code, "program finished");
        return Ok(program_status(execution.exit_code));
    }
    Ok(0)
}
