//! Bython Type Checker: walks a parsed AST, resolves names and types, and
//! annotates every expression in place.
//!
//! Entry point: [`TypeChecker::check`].
//!
//! Error codes emitted:
//! - E300: undefined name
//! - E301: duplicate definition in one scope
//! - E400: type mismatch
//! - E401: unknown type name
//! - E402: invalid operand for an operator
//! - E403: call of something that is not a function
//! - E404: missing return in a non-void function
//! - E405: invalid `as` conversion
//! - E406: function used as a value
//! - E407: assignment to a function
//! - E408: invalid `main` signature
//! - E409: binding a `void` value
//! - E500: wrong argument count
//! - E900: node annotated twice (checking stops at the first one)
//! - W100: unused expression value, only with [`CheckOptions::warn_unused`]

use bython_types::ast::*;
use bython_types::builtins::BUILTINS;
use bython_types::{
    AlreadyAnnotated, Diagnostic, Diagnostics, ErrorCode, FunctionType, SourceFile, Span, Stage,
    Type,
};

use crate::env::{Binding, BindingKind, ScopeArena, ScopeId, ScopeKind};

/// Name of the program entry point.
pub const ENTRY_POINT: &str = "main";

// ══════════════════════════════════════════════════════════════════════════════
// TypeChecker
// ══════════════════════════════════════════════════════════════════════════════

/// Optional checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Warn (W100) when an expression statement drops a non-void value.
    pub warn_unused: bool,
}

/// Walks a parsed [`Module`] and validates all types.
pub struct TypeChecker<'a> {
    scopes: ScopeArena,
    current: ScopeId,
    module_scope: ScopeId,
    diagnostics: &'a mut Diagnostics,
    source: &'a SourceFile,
    /// Declared return type of the function being checked.
    return_type: Type,
    options: CheckOptions,
    /// Set by an internal fault; nothing further is checked.
    aborted: bool,
}

impl<'a> TypeChecker<'a> {
    /// Create a new type checker with the builtins in its root scope.
    pub fn new(source: &'a SourceFile, diagnostics: &'a mut Diagnostics) -> Self {
        Self::with_options(source, diagnostics, CheckOptions::default())
    }

    pub fn with_options(
        source: &'a SourceFile,
        diagnostics: &'a mut Diagnostics,
        options: CheckOptions,
    ) -> Self {
        let mut scopes = ScopeArena::new();
        let root = scopes.root();
        for builtin in BUILTINS {
            let binding = Binding {
                ty: Type::Function(Box::new(builtin.signature())),
                span: Span::point(1, 1),
                kind: BindingKind::Builtin,
            };
            // Builtin names are unique; a clash would only drop the second.
            let _ = scopes.define(root, builtin.name, binding);
        }
        let module_scope = scopes.push(root, ScopeKind::Module);
        Self {
            scopes,
            current: module_scope,
            module_scope,
            diagnostics,
            source,
            return_type: Type::Void,
            options,
            aborted: false,
        }
    }

    /// Type-check and annotate a complete module.
    pub fn check(&mut self, module: &mut Module) {
        // 1. Collect every signature first so calls may precede definitions.
        for func in module.items.iter_mut() {
            if self.aborted {
                return;
            }
            self.declare_function(func);
        }

        // 2. Check bodies.
        for func in module.items.iter_mut() {
            if self.aborted {
                return;
            }
            self.check_function(func);
        }

        tracing::debug!(
            scopes = self.scopes.len(),
            errors = self.diagnostics.total_errors,
            "type check finished"
        );
    }

    // ══════════════════════════════════════════════════════════════════════
    // Functions
    // ══════════════════════════════════════════════════════════════════════

    fn declare_function(&mut self, func: &mut FunctionDef) {
        let params: Vec<Type> = func
            .params
            .iter()
            .map(|p| self.resolve_value_type(&p.ty, &format!("parameter '{}'", p.name.name)))
            .collect();
        let ret = match &func.return_type {
            Some(ann) => self.resolve_type(ann),
            None => Type::Void,
        };
        let sig = FunctionType::new(params, ret);

        if func.name.name == ENTRY_POINT {
            self.check_entry_signature(func, &sig);
        }

        let binding = Binding {
            ty: Type::Function(Box::new(sig.clone())),
            span: func.name.span,
            kind: BindingKind::Function,
        };
        if let Err(previous) = self.scopes.define(self.module_scope, &func.name.name, binding) {
            self.error(
                ErrorCode::DUPLICATE_DEFINITION,
                format!(
                    "function '{}' is already defined at {}",
                    func.name.name, previous
                ),
                func.name.span,
            );
        }

        let annotated = func.annotate(sig);
        self.record(annotated);
    }

    fn check_entry_signature(&mut self, func: &FunctionDef, sig: &FunctionType) {
        if !func.params.is_empty() {
            self.error(
                ErrorCode::INVALID_ENTRY,
                format!(
                    "'{ENTRY_POINT}' must take no parameters, found {}",
                    func.params.len()
                ),
                func.name.span,
            );
        }
        let ret_ok = matches!(
            sig.ret,
            Type::Void | Type::Bool | Type::Int { .. } | Type::Unknown
        );
        if !ret_ok {
            let span = func.return_type.as_ref().map_or(func.name.span, |t| t.span);
            self.error(
                ErrorCode::INVALID_ENTRY,
                format!(
                    "'{ENTRY_POINT}' must return void, bool or an integer, found {}",
                    sig.ret
                ),
                span,
            );
        }
    }

    fn check_function(&mut self, func: &mut FunctionDef) {
        let sig = func
            .signature
            .clone()
            .unwrap_or_else(|| FunctionType::new(Vec::new(), Type::Unknown));

        let scope = self.scopes.push(self.module_scope, ScopeKind::Function);
        self.current = scope;
        self.return_type = sig.ret.clone();

        for (param, ty) in func.params.iter().zip(sig.params.iter()) {
            self.define(&param.name, Binding::variable(ty.clone(), param.name.span));
        }

        // The body shares the parameter scope: `val x` may not redefine parameter `x`.
        let returns = self.check_stmts(&mut func.body.stmts);

        let needs_value = !matches!(sig.ret, Type::Void | Type::Unknown);
        if needs_value && !returns {
            self.error(
                ErrorCode::MISSING_RETURN,
                format!(
                    "missing return: function '{}' may reach its end without returning a value of type {}",
                    func.name.name, sig.ret
                ),
                func.name.span,
            );
        }

        self.current = self.module_scope;
        tracing::trace!(function = %func.name.name, "checked function");
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    /// Check a braced block in a fresh child scope. Returns whether every
    /// path through it returns.
    fn check_block(&mut self, block: &mut Block) -> bool {
        let outer = self.current;
        self.current = self.scopes.push(outer, ScopeKind::Block);
        let returns = self.check_stmts(&mut block.stmts);
        self.current = outer;
        returns
    }

    fn check_stmts(&mut self, stmts: &mut [Stmt]) -> bool {
        let mut returns = false;
        for stmt in stmts.iter_mut() {
            if self.aborted {
                break;
            }
            returns |= self.check_stmt(stmt);
        }
        returns
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) -> bool {
        match &mut stmt.kind {
            StmtKind::Val {
                name,
                annotation,
                value,
                binding_type,
            } => {
                let ty = match annotation {
                    Some(ann) => {
                        let declared =
                            self.resolve_value_type(ann, &format!("binding '{}'", name.name));
                        let actual = self.check_expr(value, Some(&declared));
                        self.expect_assignable(&actual, &declared, value.span);
                        declared
                    }
                    None => {
                        let actual = self.check_expr(value, None);
                        if actual == Type::Void {
                            self.error(
                                ErrorCode::VOID_VALUE,
                                format!("cannot bind '{}' to a value of type void", name.name),
                                value.span,
                            );
                            Type::Unknown
                        } else {
                            actual
                        }
                    }
                };
                let annotated = write_binding_type(binding_type, ty.clone(), stmt.span);
                self.record(annotated);
                self.define(name, Binding::variable(ty, name.span));
                false
            }
            StmtKind::Assign { target, value } => {
                self.check_assign(target, value);
                false
            }
            StmtKind::If {
                branches,
                else_block,
            } => {
                let mut all_return = true;
                for branch in branches.iter_mut() {
                    self.check_condition(&mut branch.cond);
                    all_return &= self.check_block(&mut branch.body);
                }
                match else_block {
                    Some(block) => all_return &= self.check_block(block),
                    None => all_return = false,
                }
                all_return
            }
            StmtKind::While { cond, body } => {
                self.check_condition(cond);
                self.check_block(body);
                // `while true` only leaves through a `return`.
                matches!(cond.unparen().kind, ExprKind::BoolLit(true))
            }
            StmtKind::Return(value) => {
                self.check_return(value.as_mut(), stmt.span);
                true
            }
            StmtKind::Discard(value) => {
                self.check_expr(value, None);
                false
            }
            StmtKind::Expr(value) => {
                let ty = self.check_expr(value, None);
                if self.options.warn_unused && !matches!(ty, Type::Void | Type::Unknown) {
                    let diagnostic = self
                        .diagnostic(
                            ErrorCode::UNUSED_VALUE,
                            format!("unused value of type {ty}"),
                            value.span,
                        )
                        .with_suggestion("use 'discard' to ignore a value explicitly");
                    self.diagnostics.push(diagnostic);
                }
                false
            }
        }
    }

    fn check_assign(&mut self, target: &Ident, value: &mut Expr) {
        let binding = self.scopes.lookup(self.current, &target.name).cloned();
        match binding {
            None => {
                self.error(
                    ErrorCode::UNDEFINED_NAME,
                    format!("undefined name '{}'", target.name),
                    target.span,
                );
                self.check_expr(value, None);
            }
            Some(binding) if binding.is_callable() => {
                self.error(
                    ErrorCode::ASSIGN_TO_FUNCTION,
                    format!("cannot assign to function '{}'", target.name),
                    target.span,
                );
                self.check_expr(value, None);
            }
            Some(binding) => {
                let actual = self.check_expr(value, Some(&binding.ty));
                self.expect_assignable(&actual, &binding.ty, value.span);
            }
        }
    }

    fn check_condition(&mut self, cond: &mut Expr) {
        let ty = self.check_expr(cond, Some(&Type::Bool));
        if !ty.is_assignable_to(&Type::Bool) {
            self.error(
                ErrorCode::TYPE_MISMATCH,
                format!("condition must be bool, found {ty}"),
                cond.span,
            );
        }
    }

    fn check_return(&mut self, value: Option<&mut Expr>, span: Span) {
        let expected = self.return_type.clone();
        match value {
            Some(value) if expected == Type::Void => {
                self.check_expr(value, None);
                self.error(
                    ErrorCode::TYPE_MISMATCH,
                    "cannot return a value from a function returning void",
                    value.span,
                );
            }
            Some(value) => {
                let actual = self.check_expr(value, Some(&expected));
                self.expect_assignable(&actual, &expected, value.span);
            }
            None if matches!(expected, Type::Void | Type::Unknown) => {}
            None => {
                self.error(
                    ErrorCode::TYPE_MISMATCH,
                    format!("missing return value: function returns {expected}"),
                    span,
                );
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    /// Infer the type of `expr`, write it into the node, and return it.
    ///
    /// `expected` is a hint used to type numeric literals; mismatches
    /// against it are reported by the caller.
    fn check_expr(&mut self, expr: &mut Expr, expected: Option<&Type>) -> Type {
        let ty = self.infer_expr(expr, expected);
        let annotated = expr.annotate(ty.clone());
        self.record(annotated);
        ty
    }

    fn infer_expr(&mut self, expr: &mut Expr, expected: Option<&Type>) -> Type {
        let span = expr.span;
        match &mut expr.kind {
            ExprKind::IntLit(value) => self.int_literal_type(i128::from(*value), expected, span),
            ExprKind::FloatLit(_) => match expected {
                Some(ty @ Type::Float { .. }) => ty.clone(),
                _ => Type::F64,
            },
            ExprKind::BoolLit(_) => Type::Bool,
            ExprKind::StrLit(_) => Type::Str,
            ExprKind::Ident(ident) => self.check_ident(ident),
            ExprKind::Unary { op, operand } => self.check_unary(*op, operand, expected, span),
            ExprKind::Binary { left, op, right } => {
                self.check_binary(left, *op, right, expected, span)
            }
            ExprKind::Cast { expr: inner, target } => {
                let source = self.check_expr(inner, None);
                let target_ty = self.resolve_type(target);
                if source != target_ty && !source.can_cast_to(&target_ty) {
                    self.error(
                        ErrorCode::INVALID_CAST,
                        format!("cannot cast {source} to {target_ty}"),
                        span,
                    );
                }
                target_ty
            }
            ExprKind::Call { callee, args } => self.check_call(callee, args),
            ExprKind::Paren(inner) => self.check_expr(inner, expected),
        }
    }

    /// Type of an integer literal: the expected integer or float type when
    /// the value fits, otherwise `i64` (or `u64` past `i64::MAX`).
    fn int_literal_type(&mut self, value: i128, expected: Option<&Type>, span: Span) -> Type {
        match expected {
            Some(ty @ Type::Int { .. }) => {
                if ty.int_fits(value) {
                    ty.clone()
                } else {
                    self.error(
                        ErrorCode::TYPE_MISMATCH,
                        format!("integer literal {value} does not fit in {ty}"),
                        span,
                    );
                    Type::Unknown
                }
            }
            Some(ty @ Type::Float { .. }) => ty.clone(),
            _ if Type::I64.int_fits(value) => Type::I64,
            _ if Type::U64.int_fits(value) => Type::U64,
            _ => {
                self.error(
                    ErrorCode::TYPE_MISMATCH,
                    format!("integer literal {value} does not fit in i64"),
                    span,
                );
                Type::Unknown
            }
        }
    }

    fn check_ident(&mut self, ident: &Ident) -> Type {
        match self.scopes.lookup(self.current, &ident.name).cloned() {
            None => {
                self.error(
                    ErrorCode::UNDEFINED_NAME,
                    format!("undefined name '{}'", ident.name),
                    ident.span,
                );
                Type::Unknown
            }
            Some(binding) if binding.is_callable() => {
                let diagnostic = self
                    .diagnostic(
                        ErrorCode::FUNCTION_AS_VALUE,
                        format!("function '{}' cannot be used as a value", ident.name),
                        ident.span,
                    )
                    .with_suggestion(format!("call it: {}(...)", ident.name));
                self.diagnostics.push(diagnostic);
                Type::Unknown
            }
            Some(binding) => binding.ty,
        }
    }

    fn check_unary(
        &mut self,
        op: UnaryOp,
        operand: &mut Expr,
        expected: Option<&Type>,
        span: Span,
    ) -> Type {
        // `-<literal>` is typed as one negative literal so `-128` fits i8.
        if op == UnaryOp::Neg {
            if let ExprKind::IntLit(value) = operand.kind {
                let ty = self.int_literal_type(-i128::from(value), expected, span);
                let annotated = operand.annotate(ty.clone());
                self.record(annotated);
                return ty;
            }
        }

        let hint = match op {
            UnaryOp::Not => Some(&Type::Bool),
            _ => expected.filter(|t| t.is_numeric()),
        };
        let ty = self.check_expr(operand, hint);
        if ty.is_unknown() {
            return Type::Unknown;
        }
        let ok = match op {
            UnaryOp::Neg | UnaryOp::Plus => ty.is_numeric(),
            UnaryOp::BitNot => ty.is_integer(),
            UnaryOp::Not => ty == Type::Bool,
        };
        if ok {
            ty
        } else {
            let wanted = match op {
                UnaryOp::Neg | UnaryOp::Plus => "a numeric",
                UnaryOp::BitNot => "an integer",
                UnaryOp::Not => "a bool",
            };
            self.error(
                ErrorCode::INVALID_OPERAND,
                format!("unary '{}' requires {wanted} operand, found {ty}", op.symbol()),
                span,
            );
            Type::Unknown
        }
    }

    fn check_binary(
        &mut self,
        left: &mut Expr,
        op: BinOp,
        right: &mut Expr,
        expected: Option<&Type>,
        span: Span,
    ) -> Type {
        if op.is_logical() {
            for side in [left, right] {
                let ty = self.check_expr(side, Some(&Type::Bool));
                if !ty.is_assignable_to(&Type::Bool) {
                    self.error(
                        ErrorCode::INVALID_OPERAND,
                        format!("operator '{}' requires bool operands, found {ty}", op.symbol()),
                        side.span,
                    );
                }
            }
            return Type::Bool;
        }

        let (lt, rt) = self.check_operands(left, op, right, expected);
        if lt.is_unknown() || rt.is_unknown() {
            return if op.is_comparison() {
                Type::Bool
            } else {
                Type::Unknown
            };
        }

        let result = match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Pow => {
                lt.arithmetic_result(&rt)
            }
            BinOp::Mod | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                if lt.is_integer() && rt.is_integer() {
                    lt.arithmetic_result(&rt)
                } else {
                    None
                }
            }
            BinOp::Shl | BinOp::Shr => (lt.is_integer() && rt.is_integer()).then(|| lt.clone()),
            BinOp::Eq | BinOp::NotEq => {
                let comparable =
                    lt.arithmetic_result(&rt).is_some() || (lt == Type::Bool && rt == Type::Bool);
                comparable.then_some(Type::Bool)
            }
            BinOp::Less | BinOp::LessEq | BinOp::Greater | BinOp::GreaterEq => {
                lt.arithmetic_result(&rt).map(|_| Type::Bool)
            }
            BinOp::And | BinOp::Or => Some(Type::Bool),
        };

        match result {
            Some(ty) => ty,
            None => {
                self.error(
                    ErrorCode::INVALID_OPERAND,
                    format!(
                        "operator '{}' cannot be applied to {lt} and {rt}",
                        op.symbol()
                    ),
                    span,
                );
                if op.is_comparison() {
                    Type::Bool
                } else {
                    Type::Unknown
                }
            }
        }
    }

    /// Check both operands left to right, letting a literal on one side take
    /// its type from the other side.
    fn check_operands(
        &mut self,
        left: &mut Expr,
        op: BinOp,
        right: &mut Expr,
        expected: Option<&Type>,
    ) -> (Type, Type) {
        let hint = if op.is_comparison() {
            None
        } else {
            expected.filter(|t| t.is_numeric()).cloned()
        };

        // Shift amounts are typed on their own.
        if matches!(op, BinOp::Shl | BinOp::Shr) {
            let lt = self.check_expr(left, hint.as_ref());
            let rt = self.check_expr(right, None);
            return (lt, rt);
        }

        if is_numeric_literal(left) && !is_numeric_literal(right) {
            let rt = self.check_expr(right, hint.as_ref());
            let lt = self.check_expr(left, sibling_hint(&rt, hint.as_ref()));
            (lt, rt)
        } else {
            let lt = self.check_expr(left, hint.as_ref());
            let rt = self.check_expr(right, sibling_hint(&lt, hint.as_ref()));
            (lt, rt)
        }
    }

    fn check_call(&mut self, callee: &Ident, args: &mut [Expr]) -> Type {
        let binding = self.scopes.lookup(self.current, &callee.name).cloned();
        let sig = match binding {
            Some(Binding {
                ty: Type::Function(sig),
                ..
            }) => *sig,
            Some(binding) => {
                self.error(
                    ErrorCode::NOT_CALLABLE,
                    format!(
                        "'{}' is a variable of type {}, not a function",
                        callee.name, binding.ty
                    ),
                    callee.span,
                );
                self.check_args_unhinted(args);
                return Type::Unknown;
            }
            None => {
                self.error(
                    ErrorCode::UNDEFINED_NAME,
                    format!("undefined function '{}'", callee.name),
                    callee.span,
                );
                self.check_args_unhinted(args);
                return Type::Unknown;
            }
        };

        if args.len() != sig.params.len() {
            let plural = if sig.params.len() == 1 { "" } else { "s" };
            self.error(
                ErrorCode::WRONG_ARG_COUNT,
                format!(
                    "function '{}' takes {} argument{plural} but {} were given",
                    callee.name,
                    sig.params.len(),
                    args.len()
                ),
                callee.span,
            );
        }

        for (index, arg) in args.iter_mut().enumerate() {
            let param = sig.params.get(index);
            let actual = self.check_expr(arg, param);
            if let Some(param) = param {
                if !actual.is_assignable_to(param) {
                    self.error(
                        ErrorCode::TYPE_MISMATCH,
                        format!(
                            "argument {} of '{}': expected {param}, found {actual}",
                            index + 1,
                            callee.name
                        ),
                        arg.span,
                    );
                }
            }
        }
        sig.ret
    }

    fn check_args_unhinted(&mut self, args: &mut [Expr]) {
        for arg in args.iter_mut() {
            self.check_expr(arg, None);
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Helpers
    // ══════════════════════════════════════════════════════════════════════

    fn resolve_type(&mut self, ann: &TypeAnnotation) -> Type {
        match Type::from_name(&ann.name) {
            Some(ty) => ty,
            None => {
                let diagnostic = self
                    .diagnostic(
                        ErrorCode::UNKNOWN_TYPE,
                        format!("unknown type '{}'", ann.name),
                        ann.span,
                    )
                    .with_suggestion(
                        "known types: bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, str, void",
                    );
                self.diagnostics.push(diagnostic);
                Type::Unknown
            }
        }
    }

    /// Resolve the type of a slot that must hold a value. `void` is
    /// reported and becomes `Unknown`.
    fn resolve_value_type(&mut self, ann: &TypeAnnotation, what: &str) -> Type {
        match self.resolve_type(ann) {
            Type::Void => {
                self.error(
                    ErrorCode::VOID_VALUE,
                    format!("{what} cannot have type void"),
                    ann.span,
                );
                Type::Unknown
            }
            ty => ty,
        }
    }

    fn expect_assignable(&mut self, actual: &Type, expected: &Type, span: Span) {
        if !actual.is_assignable_to(expected) {
            self.error(
                ErrorCode::TYPE_MISMATCH,
                format!("mismatched types: expected {expected}, found {actual}"),
                span,
            );
        }
    }

    fn define(&mut self, name: &Ident, binding: Binding) {
        if let Err(previous) = self.scopes.define(self.current, &name.name, binding) {
            self.error(
                ErrorCode::DUPLICATE_DEFINITION,
                format!(
                    "'{}' is already defined in this scope at {}",
                    name.name, previous
                ),
                name.span,
            );
        }
    }

    /// Turn a failed annotation write into a fatal internal diagnostic and
    /// stop checking. Only the first fault is reported.
    fn record(&mut self, result: Result<(), AlreadyAnnotated>) {
        if let Err(err) = result {
            if self.aborted {
                return;
            }
            tracing::error!(span = %err.span, "{err}");
            self.error(ErrorCode::INTERNAL, err.to_string(), err.span);
            self.aborted = true;
        }
    }

    fn diagnostic(&self, code: ErrorCode, message: impl Into<String>, span: Span) -> Diagnostic {
        let source_line = self.source.line(span.start_line).unwrap_or("");
        Diagnostic::new(
            self.source.name.as_str(),
            code,
            Stage::Tcheck,
            message,
            span,
            source_line,
        )
    }

    fn error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let diagnostic = self.diagnostic(code, message, span);
        self.diagnostics.push(diagnostic);
    }
}

fn write_binding_type(
    slot: &mut Option<Type>,
    ty: Type,
    span: Span,
) -> Result<(), AlreadyAnnotated> {
    if slot.is_some() {
        return Err(AlreadyAnnotated { span });
    }
    *slot = Some(ty);
    Ok(())
}

fn is_numeric_literal(expr: &Expr) -> bool {
    match &expr.unparen().kind {
        ExprKind::IntLit(_) | ExprKind::FloatLit(_) => true,
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => matches!(operand.kind, ExprKind::IntLit(_) | ExprKind::FloatLit(_)),
        _ => false,
    }
}

/// Hint for the second operand: the first operand's type if numeric.
fn sibling_hint<'t>(sibling: &'t Type, fallback: Option<&'t Type>) -> Option<&'t Type> {
    if sibling.is_numeric() {
        Some(sibling)
    } else {
        fallback
    }
}
