//! In-process JIT engine.
//!
//! A [`JitEngine`] owns one `JITModule`. [`JitEngine::compile`] lowers a
//! checked module into it and finalizes the machine code; [`JitEngine::run`]
//! calls the entry trampoline. The module's memory is released when the
//! engine is dropped.

use std::cell::Cell;
use std::marker::PhantomData;

use bython_types::ast::Module as AstModule;
use cranelift_codegen::settings::{self, Configurable};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId, Module};
use target_lexicon::Triple;

use crate::compiler::CodeGenerator;
use crate::error::{CodegenError, CodegenResult};
use crate::runtime::{self, RuntimeFunctions};
use crate::types::BythonTypes;

// ══════════════════════════════════════════════════════════════════════════════
// Options
// ══════════════════════════════════════════════════════════════════════════════

/// Cranelift optimization level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    /// No optimization; fastest to compile.
    #[default]
    None,
    Speed,
}

impl OptLevel {
    fn setting(self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Speed => "speed",
        }
    }
}

/// Options for building a [`JitEngine`].
#[derive(Debug, Clone, Default)]
pub struct JitOptions {
    pub opt_level: OptLevel,
    /// Run the IR verifier on every function before it is defined.
    pub verify: bool,
    /// Collect program output into [`Execution::output`] instead of stdout.
    pub capture_output: bool,
}

/// Result of running a compiled program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Value returned by the entry function, widened to `i64`.
    pub exit_code: i64,
    /// Captured output, when [`JitOptions::capture_output`] was set.
    pub output: Option<String>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Engine
// ══════════════════════════════════════════════════════════════════════════════

pub struct JitEngine {
    module: Option<JITModule>,
    runtime: RuntimeFunctions,
    types: BythonTypes,
    options: JitOptions,
    triple: Triple,
    entry: Option<FuncId>,
    ir: String,
    /// The runtime's capture buffer is per thread.
    _not_sync: PhantomData<Cell<()>>,
}

impl JitEngine {
    /// Build an engine for the host and register the runtime symbols.
    pub fn new(options: &JitOptions) -> CodegenResult<Self> {
        let mut flag_builder = settings::builder();
        flag_builder.set("use_colocated_libcalls", "false")?;
        flag_builder.set("is_pic", "false")?;
        flag_builder.set("opt_level", options.opt_level.setting())?;
        flag_builder.set(
            "enable_verifier",
            if options.verify { "true" } else { "false" },
        )?;

        let isa_builder = cranelift_native::builder().map_err(|msg| CodegenError::Isa(msg.to_string()))?;
        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .map_err(|e| CodegenError::Isa(e.to_string()))?;
        let triple = isa.triple().clone();

        let mut builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());
        for (name, address) in runtime::symbols() {
            builder.symbol(name, address);
        }
        let mut module = JITModule::new(builder);

        let types = BythonTypes::new(
            module.target_config().pointer_type(),
            module.target_config().default_call_conv,
        );
        let runtime = RuntimeFunctions::declare_all(&mut module, &types)?;

        tracing::debug!(triple = %triple, opt_level = ?options.opt_level, "JIT engine ready");
        Ok(Self {
            module: Some(module),
            runtime,
            types,
            options: options.clone(),
            triple,
            entry: None,
            ir: String::new(),
            _not_sync: PhantomData,
        })
    }

    /// Lower `ast`, emit the entry trampoline and finalize machine code.
    ///
    /// `ast` must have passed type checking with zero errors.
    pub fn compile(&mut self, ast: &AstModule) -> CodegenResult<()> {
        if self.entry.is_some() {
            return Err(CodegenError::internal("engine already holds a compiled module"));
        }
        let module = self
            .module
            .as_mut()
            .ok_or_else(|| CodegenError::internal("JIT module already released"))?;

        let mut codegen = CodeGenerator::new(module, &self.runtime, self.types, self.options.verify);
        let entry = codegen.compile_module(ast)?;
        self.ir = codegen.into_ir();

        module.finalize_definitions()?;
        self.entry = Some(entry);
        tracing::info!(functions = ast.items.len(), "module finalized");
        Ok(())
    }

    /// Textual CLIF of every compiled function, in definition order.
    pub fn ir(&self) -> &str {
        &self.ir
    }

    /// Target the engine generates code for.
    pub fn triple(&self) -> &Triple {
        &self.triple
    }

    /// Call the entry trampoline and return the program's result.
    pub fn run(&self) -> CodegenResult<Execution> {
        let entry = self
            .entry
            .ok_or_else(|| CodegenError::internal("run called before compile"))?;
        let module = self
            .module
            .as_ref()
            .ok_or_else(|| CodegenError::internal("JIT module already released"))?;
        let code = module.get_finalized_function(entry);

        if self.options.capture_output {
            runtime::begin_capture();
        }
        // SAFETY: `entry` is the trampoline generated by `compile`, which
        // has the signature `extern "C" fn() -> i64` under the host's
        // default calling convention, and the module is finalized.
        let exit_code = unsafe {
            let entry_fn: extern "C" fn() -> i64 = std::mem::transmute(code);
            entry_fn()
        };
        let output = if self.options.capture_output {
            runtime::end_capture()
        } else {
            runtime::flush_stdout();
            None
        };

        tracing::debug!(exit_code, "program finished");
        Ok(Execution { exit_code, output })
    }
}

impl Drop for JitEngine {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            // SAFETY: no function pointer obtained from this module outlives
            // `run`, so nothing can still reference its code or data.
            unsafe { module.free_memory() };
        }
    }
}
