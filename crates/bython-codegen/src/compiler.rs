//! Module-level lowering: function declarations, bodies and the entry
//! trampoline.
//!
//! Lowering is two-pass. The first pass declares every user function so
//! calls may refer to functions defined later in the file. The second pass
//! builds each body with a [`FunctionLowerer`].

use std::collections::HashMap;
use std::fmt::Write as _;

use bython_types::ast::{FunctionDef, Module as AstModule};
use bython_types::{FunctionType, Type};
use cranelift_codegen::ir::types::I64;
use cranelift_codegen::ir::{AbiParam, InstBuilder, Signature, UserFuncName, Value};
use cranelift_codegen::Context;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext, Variable};
use cranelift_module::{DataId, FuncId, Linkage, Module};

use crate::error::{CodegenError, CodegenResult};
use crate::runtime::RuntimeFunctions;
use crate::types::BythonTypes;

/// Name of the Bython function the trampoline calls.
pub const ENTRY_FUNCTION: &str = "main";

/// Exported symbol of the generated trampoline: `extern "C" fn() -> i64`.
pub const ENTRY_SYMBOL: &str = "__bython_entry";

/// Symbol a user function is declared under.
pub fn mangle(name: &str) -> String {
    format!("bython.{name}")
}

/// A user function after the declaration pass.
#[derive(Debug, Clone)]
pub(crate) struct DeclaredFunction {
    pub(crate) id: FuncId,
    pub(crate) sig: FunctionType,
}

// ══════════════════════════════════════════════════════════════════════════════
// CodeGenerator
// ══════════════════════════════════════════════════════════════════════════════

/// Lowers a checked module into a Cranelift [`Module`].
pub struct CodeGenerator<'m, M: Module> {
    module: &'m mut M,
    runtime: &'m RuntimeFunctions,
    types: BythonTypes,
    functions: HashMap<String, DeclaredFunction>,
    /// Interned string literals.
    strings: HashMap<String, DataId>,
    verify: bool,
    ir: String,
}

impl<'m, M: Module> CodeGenerator<'m, M> {
    pub fn new(
        module: &'m mut M,
        runtime: &'m RuntimeFunctions,
        types: BythonTypes,
        verify: bool,
    ) -> Self {
        Self {
            module,
            runtime,
            types,
            functions: HashMap::new(),
            strings: HashMap::new(),
            verify,
            ir: String::new(),
        }
    }

    /// Lower every function plus the trampoline. Returns the trampoline's id.
    pub fn compile_module(&mut self, ast: &AstModule) -> CodegenResult<FuncId> {
        for func in &ast.items {
            self.declare_function(func)?;
        }
        for func in &ast.items {
            self.define_function(func)?;
        }
        self.define_entry()
    }

    /// Textual CLIF of every function lowered so far.
    pub fn into_ir(self) -> String {
        self.ir
    }

    fn declare_function(&mut self, func: &FunctionDef) -> CodegenResult<()> {
        let sig = func
            .signature
            .clone()
            .ok_or(CodegenError::Unannotated { span: func.span })?;
        let id = self.module.declare_function(
            &mangle(&func.name.name),
            Linkage::Local,
            &self.types.signature(&sig),
        )?;
        self.functions
            .insert(func.name.name.clone(), DeclaredFunction { id, sig });
        Ok(())
    }

    fn define_function(&mut self, func: &FunctionDef) -> CodegenResult<()> {
        let name = func.name.name.as_str();
        let declared = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| CodegenError::internal(format!("function '{name}' was never declared")))?;
        tracing::trace!(function = name, "lowering");

        let mut ctx = self.module.make_context();
        ctx.func.signature = self.types.signature(&declared.sig);
        ctx.func.name = UserFuncName::user(0, declared.id.as_u32());

        let mut func_ctx = FunctionBuilderContext::new();
        let mut builder = FunctionBuilder::new(&mut ctx.func, &mut func_ctx);

        let entry_block = builder.create_block();
        builder.append_block_params_for_function_params(entry_block);
        builder.switch_to_block(entry_block);
        builder.seal_block(entry_block);
        let param_values: Vec<Value> = builder.block_params(entry_block).to_vec();

        let mut lowerer = FunctionLowerer {
            builder: &mut builder,
            module: &mut *self.module,
            runtime: self.runtime,
            types: self.types,
            functions: &self.functions,
            strings: &mut self.strings,
            scopes: vec![HashMap::new()],
            next_var: 0,
            return_type: declared.sig.ret.clone(),
            terminated: false,
        };
        for ((param, ty), value) in func.params.iter().zip(&declared.sig.params).zip(param_values) {
            lowerer.define_variable(&param.name.name, ty, value, param.span)?;
        }
        lowerer.lower_function_body(&func.body)?;

        builder.seal_all_blocks();
        builder.finalize();

        self.finish_function(name, declared.id, &mut ctx)
    }

    /// `__bython_entry() -> i64`: call `main` and widen its result.
    fn define_entry(&mut self) -> CodegenResult<FuncId> {
        let main = self
            .functions
            .get(ENTRY_FUNCTION)
            .cloned()
            .ok_or_else(|| CodegenError::internal(format!("no '{ENTRY_FUNCTION}' to call")))?;

        let mut sig = Signature::new(self.types.call_conv());
        sig.returns.push(AbiParam::new(I64));
        let id = self.module.declare_function(ENTRY_SYMBOL, Linkage::Export, &sig)?;

        let mut ctx = self.module.make_context();
        ctx.func.signature = sig;
        ctx.func.name = UserFuncName::user(0, id.as_u32());

        let mut func_ctx = FunctionBuilderContext::new();
        let mut builder = FunctionBuilder::new(&mut ctx.func, &mut func_ctx);
        let block = builder.create_block();
        builder.switch_to_block(block);
        builder.seal_block(block);

        let callee = self.module.declare_func_in_func(main.id, builder.func);
        let call = builder.ins().call(callee, &[]);
        let result = builder.inst_results(call).first().copied();
        let exit_code = match (&main.sig.ret, result) {
            (Type::Void, _) => builder.ins().iconst(I64, 0),
            (Type::Int { bits: 64, .. }, Some(value)) => value,
            (Type::Int { signed: true, .. }, Some(value)) => builder.ins().sextend(I64, value),
            (Type::Bool | Type::Int { .. }, Some(value)) => builder.ins().uextend(I64, value),
            (other, _) => {
                return Err(CodegenError::internal(format!(
                    "'{ENTRY_FUNCTION}' returns {other}, which has no exit code"
                )))
            }
        };
        builder.ins().return_(&[exit_code]);
        builder.finalize();

        self.finish_function(ENTRY_SYMBOL, id, &mut ctx)?;
        Ok(id)
    }

    /// Verify, record the IR text, and define the function in the module.
    fn finish_function(&mut self, name: &str, id: FuncId, ctx: &mut Context) -> CodegenResult<()> {
        if self.verify {
            cranelift_codegen::verify_function(&ctx.func, self.module.isa()).map_err(|errors| {
                CodegenError::Verifier {
                    function: name.to_string(),
                    errors: errors.to_string(),
                }
            })?;
        }
        let _ = writeln!(self.ir, "; fn {name}");
        let _ = writeln!(self.ir, "{}", ctx.func.display());

        self.module.define_function(id, ctx)?;
        self.module.clear_context(ctx);
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// FunctionLowerer
// ══════════════════════════════════════════════════════════════════════════════

/// Per-function lowering state. Statement lowering lives in `stmt.rs`,
/// expression lowering in `expr.rs`.
pub(crate) struct FunctionLowerer<'a, 'b, M: Module> {
    pub(crate) builder: &'a mut FunctionBuilder<'b>,
    pub(crate) module: &'a mut M,
    pub(crate) runtime: &'a RuntimeFunctions,
    pub(crate) types: BythonTypes,
    pub(crate) functions: &'a HashMap<String, DeclaredFunction>,
    pub(crate) strings: &'a mut HashMap<String, DataId>,
    /// Innermost scope last. Each entry maps a name to its variable and type.
    pub(crate) scopes: Vec<HashMap<String, (Variable, Type)>>,
    pub(crate) next_var: u32,
    pub(crate) return_type: Type,
    /// The current block already ends in a terminator.
    pub(crate) terminated: bool,
}

impl<M: Module> FunctionLowerer<'_, '_, M> {
    pub(crate) fn define_variable(
        &mut self,
        name: &str,
        ty: &Type,
        value: Value,
        span: bython_types::Span,
    ) -> CodegenResult<()> {
        let var = Variable::from_u32(self.next_var);
        self.next_var += 1;
        self.builder
            .declare_var(var, self.types.expect_value_type(ty, span)?);
        self.builder.def_var(var, value);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), (var, ty.clone()));
        }
        Ok(())
    }

    pub(crate) fn lookup_variable(&self, name: &str) -> CodegenResult<(Variable, Type)> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
            .ok_or_else(|| CodegenError::internal(format!("unbound variable '{name}'")))
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }
}
