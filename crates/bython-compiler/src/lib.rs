//! Bython compiler: orchestrates the full compilation pipeline.
//!
//! ```text
//! Bython Source → Lexer → Parser → Type Checker → Cranelift JIT → run
//! ```
//!
//! Each stage appends to one [`Diagnostics`] value that is passed along
//! explicitly. A stage never runs on the output of a stage that reported
//! errors: parse errors stop type checking and type errors stop codegen.

pub mod checker;
pub mod env;

use std::fmt;
use std::str::FromStr;

use bython_codegen::{CodegenError, CodegenResult, JitEngine, JitOptions};
use bython_lexer::Lexer;
use bython_parser::Parser;
use bython_types::ast::Module;
use bython_types::{Diagnostic, Diagnostics, ErrorCode, SourceFile, Span, Stage};
use sha2::{Digest, Sha256};

pub use checker::{CheckOptions, TypeChecker, ENTRY_POINT};

// ══════════════════════════════════════════════════════════════════════════════
// Mode
// ══════════════════════════════════════════════════════════════════════════════

/// How far the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Lex and parse only.
    Parse,
    /// Parse and type-check.
    Tcheck,
    /// Everything, then execute `main`.
    #[default]
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{0}' (expected parse, tcheck or full)")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parse" => Ok(Mode::Parse),
            "tcheck" => Ok(Mode::Tcheck),
            "full" => Ok(Mode::Full),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Parse => "parse",
            Mode::Tcheck => "tcheck",
            Mode::Full => "full",
        })
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Frontend
// ══════════════════════════════════════════════════════════════════════════════

/// Lex and parse `source`, appending lexical then syntax diagnostics.
pub fn parse_source(source: &SourceFile, diagnostics: &mut Diagnostics) -> Option<Module> {
    tracing::debug!(file = %source.name, "parsing");
    let module = Parser::new(Lexer::new(source)).parse(diagnostics);
    tracing::debug!(
        functions = module.as_ref().map_or(0, |m| m.items.len()),
        errors = diagnostics.total_errors,
        "parse finished"
    );
    module
}

/// Parse and, if parsing was clean, type-check `source`.
///
/// The returned module is annotated only when `diagnostics` held no errors
/// after parsing; callers must consult `diagnostics` before using it.
pub fn check_source(source: &SourceFile, diagnostics: &mut Diagnostics) -> Option<Module> {
    check_source_with(source, CheckOptions::default(), diagnostics)
}

/// [`check_source`] with explicit checker options.
pub fn check_source_with(
    source: &SourceFile,
    options: CheckOptions,
    diagnostics: &mut Diagnostics,
) -> Option<Module> {
    let mut module = parse_source(source, diagnostics)?;
    if diagnostics.has_errors() {
        return Some(module);
    }
    tracing::debug!(file = %source.name, "type checking");
    TypeChecker::with_options(source, diagnostics, options).check(&mut module);
    Some(module)
}

/// Parse and type-check a source string, returning only the diagnostics.
pub fn type_check(source: &str, name: &str) -> Diagnostics {
    let source = SourceFile::new(name, source);
    let mut diagnostics = Diagnostics::empty();
    check_source(&source, &mut diagnostics);
    diagnostics
}

// ══════════════════════════════════════════════════════════════════════════════
// Full compilation
// ══════════════════════════════════════════════════════════════════════════════

/// Options for [`compile`].
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub check: CheckOptions,
    pub jit: JitOptions,
}

/// What [`compile`] produced.
pub struct CompileOutcome {
    /// Every diagnostic from every stage that ran, in order.
    pub diagnostics: Diagnostics,
    /// Present only when all stages succeeded.
    pub engine: Option<JitEngine>,
}

impl CompileOutcome {
    pub fn succeeded(&self) -> bool {
        self.engine.is_some()
    }
}

/// A fault inside the code generator.
///
/// Carries every diagnostic reported before the fault, followed by one
/// `FatalInternalError` entry describing it.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct CompileFailure {
    pub diagnostics: Diagnostics,
    #[source]
    pub error: CodegenError,
}

/// Run the whole pipeline and build a finalized [`JitEngine`].
///
/// User errors come back as diagnostics with `engine: None`. Only a fault
/// inside the code generator itself is an `Err`.
pub fn compile(source: &SourceFile, options: &CompileOptions) -> Result<CompileOutcome, CompileFailure> {
    let mut diagnostics = Diagnostics::empty();
    match check_source_with(source, options.check, &mut diagnostics) {
        Some(module) => generate(source, &module, &options.jit, diagnostics),
        None => Ok(CompileOutcome {
            diagnostics,
            engine: None,
        }),
    }
}

/// Lower a checked module, appending to the diagnostics of the earlier
/// stages. Nothing is lowered if those already hold an error.
pub fn generate(
    source: &SourceFile,
    module: &Module,
    options: &JitOptions,
    mut diagnostics: Diagnostics,
) -> Result<CompileOutcome, CompileFailure> {
    if diagnostics.has_errors() {
        return Ok(CompileOutcome {
            diagnostics,
            engine: None,
        });
    }

    if module.function(ENTRY_POINT).is_none() {
        diagnostics.push(missing_entry(source, module));
        return Ok(CompileOutcome {
            diagnostics,
            engine: None,
        });
    }

    match build_engine(module, options) {
        Ok(engine) => {
            tracing::debug!(
                file = %source.name,
                hash = %source_hash(&source.source),
                "compiled"
            );
            Ok(CompileOutcome {
                diagnostics,
                engine: Some(engine),
            })
        }
        Err(error) => {
            tracing::error!(file = %source.name, "{error}");
            diagnostics.push(codegen_fault(source, &error));
            Err(CompileFailure { diagnostics, error })
        }
    }
}

fn build_engine(module: &Module, options: &JitOptions) -> CodegenResult<JitEngine> {
    let mut engine = JitEngine::new(options)?;
    engine.compile(module)?;
    Ok(engine)
}

/// One-line diagnostic for a code generator fault. Multi-line details such
/// as verifier output stay in the log.
fn codegen_fault(source: &SourceFile, error: &CodegenError) -> Diagnostic {
    let span = error.span().unwrap_or(Span::point(1, 1));
    let text = error.to_string();
    let message = text.lines().next().unwrap_or_default();
    Diagnostic::new(
        source.name.as_str(),
        ErrorCode::INTERNAL,
        Stage::Codegen,
        message,
        span,
        source.line(span.start_line).unwrap_or(""),
    )
}

fn missing_entry(source: &SourceFile, module: &Module) -> Diagnostic {
    let span = if module.items.is_empty() {
        Span::point(1, 1)
    } else {
        module.span
    };
    Diagnostic::new(
        source.name.as_str(),
        ErrorCode::MISSING_ENTRY,
        Stage::Codegen,
        format!("no '{ENTRY_POINT}' function defined"),
        span,
        source.line(span.start_line).unwrap_or(""),
    )
    .with_suggestion(format!("add `def {ENTRY_POINT}() -> int {{ return 0; }}`"))
}

/// SHA-256 of `text` as lowercase hex.
pub fn source_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// First line of `bython-jit --emit-ir` output.
pub fn ir_header(source: &SourceFile) -> String {
    format!(
        "; bython module {} sha256={}",
        source.name,
        source_hash(&source.source)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trips_through_strings() {
        for mode in [Mode::Parse, Mode::Tcheck, Mode::Full] {
            assert_eq!(mode.to_string().parse::<Mode>(), Ok(mode));
        }
        assert_eq!(
            "lint".parse::<Mode>(),
            Err(UnknownMode("lint".to_string()))
        );
    }

    #[test]
    fn test_source_hash_is_sha256_hex() {
        assert_eq!(
            source_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(source_hash("def main() {}").len(), 64);
    }

    #[test]
    fn test_ir_header() {
        let sf = SourceFile::new("a.by", "");
        assert_eq!(
            ir_header(&sf),
            "; bython module a.by sha256=e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
