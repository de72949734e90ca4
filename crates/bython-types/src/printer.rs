//! Deterministic textual dump of a Bython AST.
//!
//! One node per line, indented two spaces per level, each followed by its
//! `@line:col` position and, once the checker has run, `: type`. The driver
//! prints this in `parse` mode and for `tcheck --dump-ast`.

use crate::ast::*;
use crate::Type;
use std::fmt::Write;

/// Render `module` as an indented tree.
pub fn dump(module: &Module) -> String {
    let mut printer = Printer::default();
    printer.module(module);
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn line(&mut self, text: &str, span: crate::Span, ty: Option<&Type>) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        let _ = write!(self.out, " @{span}");
        if let Some(ty) = ty {
            let _ = write!(self.out, " : {ty}");
        }
        self.out.push('\n');
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.depth += 1;
        f(self);
        self.depth -= 1;
    }

    fn module(&mut self, module: &Module) {
        self.line("Module", module.span, None);
        self.nested(|p| {
            for item in &module.items {
                p.function(item);
            }
        });
    }

    fn function(&mut self, func: &FunctionDef) {
        let params: Vec<String> = func
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name.name, p.ty.name))
            .collect();
        let ret = func.return_type.as_ref().map_or("void", |t| t.name.as_str());
        let header = format!("FunctionDef {}({}) -> {}", func.name.name, params.join(", "), ret);
        self.line(&header, func.span, None);
        self.nested(|p| p.block(&func.body));
    }

    fn block(&mut self, block: &Block) {
        self.line("Block", block.span, None);
        self.nested(|p| {
            for stmt in &block.stmts {
                p.stmt(stmt);
            }
        });
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Val {
                name,
                annotation,
                value,
                binding_type,
            } => {
                let text = match annotation {
                    Some(ann) => format!("Val {}: {}", name.name, ann.name),
                    None => format!("Val {}", name.name),
                };
                self.line(&text, stmt.span, binding_type.as_ref());
                self.nested(|p| p.expr(value));
            }
            StmtKind::Assign { target, value } => {
                self.line(&format!("Assign {}", target.name), stmt.span, None);
                self.nested(|p| p.expr(value));
            }
            StmtKind::If {
                branches,
                else_block,
            } => {
                self.line("If", stmt.span, None);
                self.nested(|p| {
                    for branch in branches {
                        p.line("Branch", branch.span, None);
                        p.nested(|p| {
                            p.expr(&branch.cond);
                            p.block(&branch.body);
                        });
                    }
                    if let Some(block) = else_block {
                        p.line("Else", block.span, None);
                        p.nested(|p| p.block(block));
                    }
                });
            }
            StmtKind::While { cond, body } => {
                self.line("While", stmt.span, None);
                self.nested(|p| {
                    p.expr(cond);
                    p.block(body);
                });
            }
            StmtKind::Return(value) => {
                self.line("Return", stmt.span, None);
                if let Some(value) = value {
                    self.nested(|p| p.expr(value));
                }
            }
            StmtKind::Discard(value) => {
                self.line("Discard", stmt.span, None);
                self.nested(|p| p.expr(value));
            }
            StmtKind::Expr(value) => {
                self.line("ExprStmt", stmt.span, None);
                self.nested(|p| p.expr(value));
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        let ty = expr.ty.as_ref();
        match &expr.kind {
            ExprKind::IntLit(v) => self.line(&format!("Int {v}"), expr.span, ty),
            ExprKind::FloatLit(v) => self.line(&format!("Float {v:?}"), expr.span, ty),
            ExprKind::BoolLit(v) => self.line(&format!("Bool {v}"), expr.span, ty),
            ExprKind::StrLit(s) => self.line(&format!("Str {s:?}"), expr.span, ty),
            ExprKind::Ident(id) => self.line(&format!("Ident {}", id.name), expr.span, ty),
            ExprKind::Unary { op, operand } => {
                self.line(&format!("Unary {}", op.symbol()), expr.span, ty);
                self.nested(|p| p.expr(operand));
            }
            ExprKind::Binary { left, op, right } => {
                self.line(&format!("Binary {}", op.symbol()), expr.span, ty);
                self.nested(|p| {
                    p.expr(left);
                    p.expr(right);
                });
            }
            ExprKind::Cast { expr: inner, target } => {
                self.line(&format!("Cast {}", target.name), expr.span, ty);
                self.nested(|p| p.expr(inner));
            }
            ExprKind::Call { callee, args } => {
                self.line(&format!("Call {}", callee.name), expr.span, ty);
                self.nested(|p| {
                    for arg in args {
                        p.expr(arg);
                    }
                });
            }
            ExprKind::Paren(inner) => {
                self.line("Paren", expr.span, ty);
                self.nested(|p| p.expr(inner));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Span;
    use pretty_assertions::assert_eq;

    fn sp(line: u32, col: u32) -> Span {
        Span::point(line, col)
    }

    #[test]
    fn test_dump_small_module() {
        let ret = Stmt::new(
            StmtKind::Return(Some(Expr::new(
                ExprKind::Binary {
                    left: Box::new(Expr::new(ExprKind::Ident(Ident::new("x", sp(1, 34))), sp(1, 34))),
                    op: BinOp::Add,
                    right: Box::new(Expr::new(ExprKind::IntLit(1), sp(1, 38))),
                },
                sp(1, 34),
            ))),
            sp(1, 27),
        );
        let module = Module {
            items: vec![FunctionDef {
                name: Ident::new("f", sp(1, 5)),
                params: vec![Param {
                    name: Ident::new("x", sp(1, 7)),
                    ty: TypeAnnotation::new("int", sp(1, 10)),
                    span: sp(1, 7),
                }],
                return_type: Some(TypeAnnotation::new("int", sp(1, 18))),
                body: Block {
                    stmts: vec![ret],
                    span: sp(1, 27),
                },
                span: sp(1, 1),
                signature: None,
            }],
            span: sp(1, 1),
        };

        let expected = "\
Module @1:1
  FunctionDef f(x: int) -> int @1:1
    Block @1:27
      Return @1:27
        Binary + @1:34
          Ident x @1:34
          Int 1 @1:38
";
        assert_eq!(dump(&module), expected);
    }

    #[test]
    fn test_dump_shows_annotations() {
        let mut expr = Expr::new(ExprKind::BoolLit(true), sp(2, 3));
        expr.annotate(Type::Bool).unwrap();
        let mut printer = Printer::default();
        printer.expr(&expr);
        assert_eq!(printer.out, "Bool true @2:3 : bool\n");
    }

    #[test]
    fn test_annotation_written_once() {
        let mut expr = Expr::new(ExprKind::IntLit(7), sp(1, 1));
        assert!(expr.annotate(Type::I64).is_ok());
        assert!(expr.annotate(Type::I32).is_err());
        assert_eq!(expr.ty, Some(Type::I64));
    }
}
