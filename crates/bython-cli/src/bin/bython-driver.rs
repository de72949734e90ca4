//! `bython-driver`: run the pipeline up to the requested stage.

use std::path::PathBuf;

use bython_cli::{
    diagnostics_status, exit_with, init_tracing, program_status, read_source, report, CliError,
    OptFlag, EXIT_DIAGNOSTICS, EXIT_FATAL,
};
use bython_compiler::{
    check_source_with, compile, parse_source, source_hash, CheckOptions, CompileOptions, Mode,
};
use bython_types::printer;
use bython_types::{Diagnostics, SourceFile};
use clap::Parser;

#[derive(Parser)]
#[command(name = "bython-driver")]
#[command(about = "Parse, type-check or run a Bython program", long_about = None)]
struct Cli {
    /// Pipeline stage to stop after: parse, tcheck or full
    #[arg(short = 'm', long = "mode", default_value_t = Mode::Full)]
    mode: Mode,

    /// Print diagnostics to stdout as JSON instead of text on stderr
    #[arg(long)]
    json: bool,

    /// Print the (annotated) AST after a clean tcheck
    #[arg(long)]
    dump_ast: bool,

    /// Do not print the AST dump in parse mode
    #[arg(short, long)]
    quiet: bool,

    /// Warn about expression statements whose value is discarded
    #[arg(long)]
    warn_unused: bool,

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
    tracing::info!(
        file = %source.name,
        mode = %cli.mode,
        hash = %source_hash(&source.source),
        "driver start"
    );
    match cli.mode {
        Mode::Parse => run_parse(cli, &source),
        Mode::Tcheck => run_tcheck(cli, &source),
        Mode::Full => run_full(cli, &source),
    }
}

fn run_parse(cli: &Cli, source: &SourceFile) -> Result<i32, CliError> {
    let mut diagnostics = Diagnostics::empty();
    let module = parse_source(source, &mut diagnostics);
    report(&diagnostics, cli.json)?;
    if diagnostics.has_errors() {
        return Ok(diagnostics_status(&diagnostics));
    }
    if let Some(module) = module.filter(|_| !cli.quiet && !cli.json) {
        print!("{}", printer::dump(&module));
    }
    Ok(0)
}

fn check_options(cli: &Cli) -> CheckOptions {
    CheckOptions {
        warn_unused: cli.warn_unused,
    }
}

fn run_tcheck(cli: &Cli, source: &SourceFile) -> Result<i32, CliError> {
    let mut diagnostics = Diagnostics::empty();
    let module = check_source_with(source, check_options(cli), &mut diagnostics);
    report(&diagnostics, cli.json)?;
    if diagnostics.has_errors() {
        return Ok(diagnostics_status(&diagnostics));
    }
    if let Some(module) = module.filter(|_| cli.dump_ast && !cli.json) {
        print!("{}", printer::dump(&module));
    }
    Ok(0)
}

fn run_full(cli: &Cli, source: &SourceFile) -> Result<i32, CliError> {
    let options = CompileOptions {
        check: check_options(cli),
        jit: cli.opt.jit_options(),
    };
    let outcome = match compile(source, &options) {
        Ok(outcome) => outcome,
        Err(failure) => {
            report(&failure.diagnostics, cli.json)?;
            return Ok(EXIT_FATAL);
        }
    };
    report(&outcome.diagnostics, cli.json)?;
    let Some(engine) = outcome.engine else {
        return Ok(diagnostics_status(&outcome.diagnostics).max(EXIT_DIAGNOSTICS));
    };
    let execution = engine.run()?;
    tracing::info!(exit_code = execution.exit_code, "program finished");
    Ok(program_status(execution.exit_code))
}
