//! Shared plumbing for the `bython-driver` and `bython-jit` binaries.
//!
//! Both binaries read one `.by` file, run some prefix of the pipeline and
//! exit with a status that tells scripts what happened:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success (`parse`/`tcheck`) |
//! | 1 | the source has errors |
//! | 66 | the file could not be read |
//! | 70 | internal compiler failure |
//! | 101 | runtime division by zero (raised by the program itself) |
//!
//! In `full` mode and for `bython-jit` a successful run exits with the
//! program's own result instead.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bython_codegen::{CodegenError, JitOptions, OptLevel};
use bython_types::{Diagnostics, SourceFile};
use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Exit status for a source file with errors.
pub const EXIT_DIAGNOSTICS: i32 = 1;
/// Exit status when the input cannot be read (`EX_NOINPUT`).
pub const EXIT_IO: i32 = 66;
/// Exit status for an internal failure (`EX_SOFTWARE`).
pub const EXIT_FATAL: i32 = 70;

/// Environment variable holding the `tracing` filter.
pub const LOG_ENV: &str = "BYTHON_LOG";

// ══════════════════════════════════════════════════════════════════════════════
// Errors
// ══════════════════════════════════════════════════════════════════════════════

/// Failures that are not the user's source code being wrong.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("internal compiler error: {0}")]
    Fatal(#[from] CodegenError),

    #[error("cannot serialize diagnostics: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Io { .. } => EXIT_IO,
            CliError::Fatal(_) | CliError::Json(_) => EXIT_FATAL,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Options
// ══════════════════════════════════════════════════════════════════════════════

/// Value of `-O`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OptFlag {
    /// No optimisation, IR verifier on.
    #[default]
    #[value(name = "g")]
    Debug,
    /// No optimisation, no verifier.
    #[value(name = "0")]
    Zero,
    /// Cranelift `speed`.
    #[value(name = "fast")]
    Fast,
}

impl OptFlag {
    /// JIT settings for this level. Binaries never capture output.
    pub fn jit_options(self) -> JitOptions {
        let (opt_level, verify) = match self {
            OptFlag::Debug => (OptLevel::None, true),
            OptFlag::Zero => (OptLevel::None, false),
            OptFlag::Fast => (OptLevel::Speed, false),
        };
        JitOptions {
            opt_level,
            verify,
            capture_output: false,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Process Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Install the stderr `tracing` subscriber.
///
/// `BYTHON_LOG` wins when set. Otherwise the level is `warn`, or `info`
/// with `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    // Keep an already installed subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Read `path` into a [`SourceFile`] named after the path as given.
pub fn read_source(path: &Path) -> Result<SourceFile, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(SourceFile::new(path.display().to_string(), text))
}

/// Emit `diagnostics`: rendered lines on stderr, or one JSON document on
/// stdout with `json`.
pub fn report(diagnostics: &Diagnostics, json: bool) -> Result<(), CliError> {
    if json {
        let text = serde_json::to_string_pretty(diagnostics)?;
        println!("{text}");
    } else if !diagnostics.is_empty() {
        eprint!("{}", diagnostics.render());
    }
    Ok(())
}

/// Status for a run that stopped after reporting `diagnostics`: 70 when a
/// stage hit an internal fault, 1 for other errors and 0 otherwise.
pub fn diagnostics_status(diagnostics: &Diagnostics) -> i32 {
    if diagnostics.has_fatal() {
        EXIT_FATAL
    } else if diagnostics.has_errors() {
        EXIT_DIAGNOSTICS
    } else {
        0
    }
}

/// Flush stdout and leave with the code `result` resolves to.
pub fn exit_with(result: Result<i32, CliError>) -> ! {
    let code = match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            error.exit_code()
        }
    };
    let _ = io::stdout().flush();
    std::process::exit(code)
}

/// Narrow a program result to a process status. The OS keeps the low byte.
pub fn program_status(exit_code: i64) -> i32 {
    exit_code as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use bython_types::{Diagnostic, ErrorCode, Span, Stage};

    #[test]
    fn test_opt_flag_names() {
        assert_eq!(OptFlag::from_str("g", false), Ok(OptFlag::Debug));
        assert_eq!(OptFlag::from_str("0", false), Ok(OptFlag::Zero));
        assert_eq!(OptFlag::from_str("fast", false), Ok(OptFlag::Fast));
        assert!(OptFlag::from_str("3", false).is_err());
    }

    #[test]
    fn test_opt_flag_jit_options() {
        let debug = OptFlag::Debug.jit_options();
        assert!(debug.verify);
        assert_eq!(debug.opt_level, OptLevel::None);
        assert_eq!(OptFlag::Fast.jit_options().opt_level, OptLevel::Speed);
        assert!(!OptFlag::Zero.jit_options().capture_output);
    }

    #[test]
    fn test_diagnostics_status() {
        let diag = |code| {
            Diagnostic::new("t.by", code, Stage::Tcheck, "m", Span::point(1, 1), "")
        };
        let mut diags = Diagnostics::empty();
        assert_eq!(diagnostics_status(&diags), 0);
        diags.push(diag(ErrorCode::UNUSED_VALUE));
        assert_eq!(diagnostics_status(&diags), 0);
        diags.push(diag(ErrorCode::TYPE_MISMATCH));
        assert_eq!(diagnostics_status(&diags), EXIT_DIAGNOSTICS);
        diags.push(diag(ErrorCode::INTERNAL));
        assert_eq!(diagnostics_status(&diags), EXIT_FATAL);
    }

    #[test]
    fn test_io_error_exit_code() {
        let error = read_source(Path::new("/nonexistent/dir/missing.by")).unwrap_err();
        assert_eq!(error.exit_code(), EXIT_IO);
        assert!(error.to_string().starts_with("cannot read '/nonexistent/dir/missing.by'"));
    }

    #[test]
    fn test_read_source_names_file_after_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prog.by");
        std::fs::write(&path, "def main() {}\n").unwrap();
        let source = read_source(&path).unwrap();
        assert_eq!(source.name, path.display().to_string());
        assert_eq!(source.source, "def main() {}\n");
    }
}
