//! Codegen error types.
//!
//! Every variant is a toolchain fault, never a problem in the user's
//! program: the checker has already accepted the module by the time the
//! code generator sees it.

use bython_types::Span;
use cranelift_codegen::settings::SetError;
use cranelift_module::ModuleError;
use thiserror::Error;

/// Errors that can occur while lowering, finalizing or running a module.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// A node reached lowering without its type annotation.
    #[error("node at {span} was not annotated by the type checker")]
    Unannotated { span: Span },

    /// Declaring, defining or finalizing a Cranelift item failed.
    #[error("cranelift module error: {0}")]
    Module(#[from] ModuleError),

    /// The host ISA could not be built.
    #[error("unsupported host ISA: {0}")]
    Isa(String),

    /// A Cranelift setting was rejected.
    #[error("invalid cranelift setting: {0}")]
    Settings(#[from] SetError),

    /// The generated IR failed verification.
    #[error("IR verification failed in '{function}':\n{errors}")]
    Verifier { function: String, errors: String },

    /// An internal consistency check failed.
    #[error("internal codegen error: {0}")]
    Internal(String),
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;

impl CodegenError {
    /// Source position of the fault, when it is tied to one node.
    pub fn span(&self) -> Option<Span> {
        match self {
            CodegenError::Unannotated { span } => Some(*span),
            _ => None,
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        CodegenError::Internal(message.into())
    }
}
