//! Shared types for the Bython toolchain.
//!
//! This crate defines the AST node types, source spans, diagnostics,
//! semantic types and the builtin function table used by every stage
//! of the pipeline.

mod error;
mod span;
pub mod ast;
pub mod builtins;
pub mod printer;
pub mod ty;

pub use error::{
    Diagnostic, Diagnostics, ErrorCategory, ErrorCode, Severity, Stage, MAX_ERRORS,
};
pub use span::{SourceFile, Span};
pub use ty::{FunctionType, Type};

/// Error returned when a node annotation is written twice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("node at {span} is already annotated")]
pub struct AlreadyAnnotated {
    pub span: Span,
}
