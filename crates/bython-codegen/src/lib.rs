//! Bython code generator: lowers a type-checked AST to Cranelift IR and
//! JIT-compiles it in process.
//!
//! # Architecture
//!
//! [`JitEngine`] owns a `cranelift_jit::JITModule`. Compiling a module runs
//! a [`CodeGenerator`] over it in two passes: every function is declared
//! first, then each body is lowered by a per-function lowerer that keeps
//! Bython variables in Cranelift `Variable`s and builds control flow from
//! basic blocks.
//!
//! ## Symbols
//! - `bython.<name>`: one local function per Bython function
//! - `__bython_entry`: exported trampoline, `extern "C" fn() -> i64`,
//!   calling `main` and widening its result
//! - `bython_rt_*`: host functions in [`runtime`], imported by name
//!
//! ## Value Representation
//!
//! Scalars map one-to-one onto Cranelift types; see [`types`]. A `str` is a
//! pointer to a NUL-terminated literal in the module's data.
//!
//! Every error here is a toolchain fault. User errors are reported by the
//! checker before lowering begins.

pub mod compiler;
pub mod engine;
pub mod error;
mod expr;
pub mod runtime;
mod stmt;
pub mod types;

pub use compiler::{mangle, CodeGenerator, ENTRY_FUNCTION, ENTRY_SYMBOL};
pub use engine::{Execution, JitEngine, JitOptions, OptLevel};
pub use error::{CodegenError, CodegenResult};
