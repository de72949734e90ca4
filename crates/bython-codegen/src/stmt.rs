//! Statement lowering.
//!
//! Control flow maps onto basic blocks. `terminated` tracks whether the
//! current block already ends in `return`; statements after that point in
//! the same block are unreachable and are not lowered.

use bython_types::ast::{Block, CondBranch, Expr, Stmt, StmtKind};
use bython_types::Type;
use cranelift_codegen::ir::{InstBuilder, TrapCode};
use cranelift_module::Module;

use crate::compiler::FunctionLowerer;
use crate::error::{CodegenError, CodegenResult};

/// Trap raised if control reaches the end of a non-void function. The
/// checker rejects such functions, except after `while true`.
const FELL_OFF_END: u8 = 1;

impl<M: Module> FunctionLowerer<'_, '_, M> {
    // ══════════════════════════════════════════════════════════════════════════
    // Bodies & Blocks
    // ══════════════════════════════════════════════════════════════════════════

    /// Lower a function body; parameters are already bound in the outer scope.
    pub(crate) fn lower_function_body(&mut self, body: &Block) -> CodegenResult<()> {
        self.lower_stmts(&body.stmts)?;
        if !self.terminated {
            if self.return_type == Type::Void {
                self.builder.ins().return_(&[]);
            } else {
                self.builder
                    .ins()
                    .trap(TrapCode::unwrap_user(FELL_OFF_END));
            }
            self.terminated = true;
        }
        Ok(())
    }

    fn lower_block(&mut self, block: &Block) -> CodegenResult<()> {
        self.push_scope();
        let result = self.lower_stmts(&block.stmts);
        self.pop_scope();
        result
    }

    fn lower_stmts(&mut self, stmts: &[Stmt]) -> CodegenResult<()> {
        for stmt in stmts {
            if self.terminated {
                break;
            }
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════════

    fn lower_stmt(&mut self, stmt: &Stmt) -> CodegenResult<()> {
        match &stmt.kind {
            StmtKind::Val {
                name,
                value,
                binding_type,
                ..
            } => {
                let ty = binding_type
                    .as_ref()
                    .ok_or(CodegenError::Unannotated { span: stmt.span })?;
                let lowered = self.lower_expr_as(value, ty)?;
                self.define_variable(&name.name, ty, lowered, name.span)
            }
            StmtKind::Assign { target, value } => {
                let (var, ty) = self.lookup_variable(&target.name)?;
                let lowered = self.lower_expr_as(value, &ty)?;
                self.builder.def_var(var, lowered);
                Ok(())
            }
            StmtKind::If {
                branches,
                else_block,
            } => self.lower_if(branches, else_block.as_ref()),
            StmtKind::While { cond, body } => self.lower_while(cond, body),
            StmtKind::Return(value) => self.lower_return(value.as_ref()),
            StmtKind::Discard(expr) | StmtKind::Expr(expr) => self.lower_effect(expr),
        }
    }

    fn lower_return(&mut self, value: Option<&Expr>) -> CodegenResult<()> {
        match value {
            Some(expr) => {
                let ret = self.return_type.clone();
                let lowered = self.lower_expr_as(expr, &ret)?;
                self.builder.ins().return_(&[lowered]);
            }
            None => {
                self.builder.ins().return_(&[]);
            }
        }
        self.terminated = true;
        Ok(())
    }

    /// ```text
    /// cond0 ─true─▶ body0 ──┐
    ///   │false              │
    /// cond1 ─true─▶ body1 ──┤
    ///   │false              ▼
    /// else ───────────────▶ merge
    /// ```
    fn lower_if(&mut self, branches: &[CondBranch], else_block: Option<&Block>) -> CodegenResult<()> {
        let merge = self.builder.create_block();
        let mut reaches_merge = false;

        for branch in branches {
            let cond = self.lower_expr(&branch.cond)?;
            let then_block = self.builder.create_block();
            let next_block = self.builder.create_block();
            self.builder.ins().brif(cond, then_block, &[], next_block, &[]);

            self.builder.switch_to_block(then_block);
            self.terminated = false;
            self.lower_block(&branch.body)?;
            if !self.terminated {
                self.builder.ins().jump(merge, &[]);
                reaches_merge = true;
            }

            self.builder.switch_to_block(next_block);
            self.terminated = false;
        }

        if let Some(block) = else_block {
            self.lower_block(block)?;
        }
        if !self.terminated {
            self.builder.ins().jump(merge, &[]);
            reaches_merge = true;
        }

        if reaches_merge {
            self.builder.switch_to_block(merge);
            self.terminated = false;
        } else {
            self.terminated = true;
        }
        Ok(())
    }

    fn lower_while(&mut self, cond: &Expr, body: &Block) -> CodegenResult<()> {
        let header = self.builder.create_block();
        let body_block = self.builder.create_block();
        let exit = self.builder.create_block();

        self.builder.ins().jump(header, &[]);

        self.builder.switch_to_block(header);
        let test = self.lower_expr(cond)?;
        self.builder.ins().brif(test, body_block, &[], exit, &[]);

        self.builder.switch_to_block(body_block);
        self.terminated = false;
        self.lower_block(body)?;
        if !self.terminated {
            self.builder.ins().jump(header, &[]);
        }

        self.builder.switch_to_block(exit);
        self.terminated = false;
        Ok(())
    }

    /// Lower an expression evaluated only for its side effects.
    fn lower_effect(&mut self, expr: &Expr) -> CodegenResult<()> {
        let inner = expr.unparen();
        if let bython_types::ast::ExprKind::Call { callee, args } = &inner.kind {
            self.lower_call(callee, args, inner.span)?;
            return Ok(());
        }
        self.lower_expr(inner)?;
        Ok(())
    }
}
