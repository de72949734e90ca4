//! Expression lowering.
//!
//! Every expression is lowered at the type the checker recorded for it.
//! Operands of a binary operator are lowered left to right, then coerced to
//! the operator's operand type. [`FunctionLowerer::coerce`] implements both
//! the implicit widenings the checker allows and explicit `as` casts.

use bython_types::ast::{BinOp, Expr, ExprKind, Ident, UnaryOp};
use bython_types::builtins;
use bython_types::{Span, Type};
use cranelift_codegen::ir::condcodes::{FloatCC, IntCC};
use cranelift_codegen::ir::types::{F32, F64, I64, I8};
use cranelift_codegen::ir::{self, BlockArg, InstBuilder, TrapCode, Value};
use cranelift_module::{DataDescription, Module};

use crate::compiler::FunctionLowerer;
use crate::error::{CodegenError, CodegenResult};
use crate::types::{int_immediate, int_type};

/// Placed after the call to the division-by-zero handler, which never returns.
const DIV_ZERO_UNREACHABLE: u8 = 2;

fn annotation(expr: &Expr) -> CodegenResult<&Type> {
    expr.ty.as_ref().ok_or(CodegenError::Unannotated { span: expr.span })
}

impl<M: Module> FunctionLowerer<'_, '_, M> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Points
    // ══════════════════════════════════════════════════════════════════════════

    /// Lower `expr` and convert it to `target`.
    pub(crate) fn lower_expr_as(&mut self, expr: &Expr, target: &Type) -> CodegenResult<Value> {
        let source = annotation(expr)?.clone();
        let value = self.lower_expr(expr)?;
        self.coerce(value, &source, target, expr.span)
    }

    /// Lower an expression that produces a value.
    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> CodegenResult<Value> {
        let ty = annotation(expr)?.clone();
        match &expr.kind {
            ExprKind::IntLit(value) => self.int_literal(i128::from(*value), &ty, expr.span),
            ExprKind::FloatLit(value) => self.float_const(*value, &ty, expr.span),
            ExprKind::BoolLit(value) => Ok(self.builder.ins().iconst(I8, i64::from(*value))),
            ExprKind::StrLit(text) => self.string_literal(text),
            ExprKind::Ident(ident) => {
                let (var, _) = self.lookup_variable(&ident.name)?;
                Ok(self.builder.use_var(var))
            }
            ExprKind::Unary { op, operand } => self.lower_unary(*op, operand, &ty, expr.span),
            ExprKind::Binary { left, op, right } => {
                self.lower_binary(left, *op, right, &ty, expr.span)
            }
            ExprKind::Cast { expr: inner, .. } => self.lower_expr_as(inner, &ty),
            ExprKind::Call { callee, args } => self
                .lower_call(callee, args, expr.span)?
                .ok_or_else(|| {
                    CodegenError::internal(format!(
                        "call to '{}' at {} produces no value",
                        callee.name, expr.span
                    ))
                }),
            ExprKind::Paren(inner) => self.lower_expr(inner),
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Literals
    // ══════════════════════════════════════════════════════════════════════════

    /// An integer literal typed as an integer or, by context, a float.
    fn int_literal(&mut self, value: i128, ty: &Type, span: Span) -> CodegenResult<Value> {
        match ty {
            Type::Int { bits, .. } => Ok(self.int_const(*bits, value)),
            Type::Float { .. } => self.float_const(value as f64, ty, span),
            other => Err(CodegenError::internal(format!(
                "integer literal at {span} annotated as {other}"
            ))),
        }
    }

    pub(crate) fn int_const(&mut self, bits: u8, value: i128) -> Value {
        self.builder
            .ins()
            .iconst(int_type(bits), int_immediate(value, bits))
    }

    fn float_const(&mut self, value: f64, ty: &Type, span: Span) -> CodegenResult<Value> {
        match ty {
            Type::Float { bits: 32 } => Ok(self.builder.ins().f32const(value as f32)),
            Type::Float { .. } => Ok(self.builder.ins().f64const(value)),
            other => Err(CodegenError::internal(format!(
                "float literal at {span} annotated as {other}"
            ))),
        }
    }

    /// Address of a NUL-terminated copy of `text`. Equal literals share one
    /// data object.
    fn string_literal(&mut self, text: &str) -> CodegenResult<Value> {
        let data_id = match self.strings.get(text) {
            Some(id) => *id,
            None => {
                let id = self.module.declare_anonymous_data(false, false)?;
                let mut description = DataDescription::new();
                let mut bytes = text.as_bytes().to_vec();
                bytes.push(0);
                description.define(bytes.into_boxed_slice());
                self.module.define_data(id, &description)?;
                self.strings.insert(text.to_string(), id);
                id
            }
        };
        let global = self.module.declare_data_in_func(data_id, self.builder.func);
        Ok(self
            .builder
            .ins()
            .symbol_value(self.types.pointer_type(), global))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Unary
    // ══════════════════════════════════════════════════════════════════════════

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expr, ty: &Type, span: Span) -> CodegenResult<Value> {
        // `-<int literal>` was typed as one negative literal.
        if let (UnaryOp::Neg, ExprKind::IntLit(value)) = (op, &operand.kind) {
            return self.int_literal(-i128::from(*value), ty, span);
        }

        let value = self.lower_expr_as(operand, ty)?;
        Ok(match (op, ty) {
            (UnaryOp::Neg, Type::Float { .. }) => self.builder.ins().fneg(value),
            (UnaryOp::Neg, _) => self.builder.ins().ineg(value),
            (UnaryOp::Plus, _) => value,
            (UnaryOp::BitNot, _) => self.builder.ins().bnot(value),
            (UnaryOp::Not, _) => self.builder.ins().bxor_imm(value, 1),
        })
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Binary
    // ══════════════════════════════════════════════════════════════════════════

    fn lower_binary(
        &mut self,
        left: &Expr,
        op: BinOp,
        right: &Expr,
        ty: &Type,
        span: Span,
    ) -> CodegenResult<Value> {
        match op {
            BinOp::And | BinOp::Or => self.lower_logical(left, op, right),
            BinOp::Shl | BinOp::Shr => {
                let lhs = self.lower_expr_as(left, ty)?;
                // The amount is masked by the operand width, so only its low bits matter.
                let rt = annotation(right)?.clone();
                let amount_ty = match (&rt, ty) {
                    (Type::Int { signed, .. }, Type::Int { bits, .. }) => Type::Int {
                        signed: *signed,
                        bits: *bits,
                    },
                    _ => rt.clone(),
                };
                let amount = self.lower_expr_as(right, &amount_ty)?;
                Ok(match (op, ty.is_signed()) {
                    (BinOp::Shl, _) => self.builder.ins().ishl(lhs, amount),
                    (_, true) => self.builder.ins().sshr(lhs, amount),
                    (_, false) => self.builder.ins().ushr(lhs, amount),
                })
            }
            _ if op.is_comparison() => self.lower_comparison(left, op, right, span),
            _ => {
                let lhs = self.lower_expr_as(left, ty)?;
                let rhs = self.lower_expr_as(right, ty)?;
                match ty {
                    Type::Float { .. } => self.float_arith(op, lhs, rhs, ty, span),
                    Type::Int { signed, bits } => self.int_arith(op, lhs, rhs, *signed, *bits, span),
                    other => Err(CodegenError::internal(format!(
                        "operator '{}' at {span} produces {other}",
                        op.symbol()
                    ))),
                }
            }
        }
    }

    /// `a && b` and `a || b` evaluate `b` only when `a` does not decide the
    /// result. The merge block receives the result as its parameter.
    fn lower_logical(&mut self, left: &Expr, op: BinOp, right: &Expr) -> CodegenResult<Value> {
        let lhs = self.lower_expr_as(left, &Type::Bool)?;
        let rhs_block = self.builder.create_block();
        let merge = self.builder.create_block();
        let result = self.builder.append_block_param(merge, I8);

        let short = [BlockArg::from(lhs)];
        if op == BinOp::And {
            self.builder.ins().brif(lhs, rhs_block, &[], merge, &short);
        } else {
            self.builder.ins().brif(lhs, merge, &short, rhs_block, &[]);
        }

        self.builder.switch_to_block(rhs_block);
        let rhs = self.lower_expr_as(right, &Type::Bool)?;
        self.builder.ins().jump(merge, &[BlockArg::from(rhs)]);

        self.builder.switch_to_block(merge);
        Ok(result)
    }

    fn lower_comparison(&mut self, left: &Expr, op: BinOp, right: &Expr, span: Span) -> CodegenResult<Value> {
        let lt = annotation(left)?.clone();
        let rt = annotation(right)?.clone();
        let operand_ty = if lt == Type::Bool && rt == Type::Bool {
            Type::Bool
        } else {
            lt.arithmetic_result(&rt).ok_or_else(|| {
                CodegenError::internal(format!("cannot compare {lt} with {rt} at {span}"))
            })?
        };
        let lhs = self.lower_expr_as(left, &operand_ty)?;
        let rhs = self.lower_expr_as(right, &operand_ty)?;

        if operand_ty.is_float() {
            let cc = match op {
                BinOp::Eq => FloatCC::Equal,
                BinOp::NotEq => FloatCC::NotEqual,
                BinOp::Less => FloatCC::LessThan,
                BinOp::LessEq => FloatCC::LessThanOrEqual,
                BinOp::Greater => FloatCC::GreaterThan,
                _ => FloatCC::GreaterThanOrEqual,
            };
            return Ok(self.builder.ins().fcmp(cc, lhs, rhs));
        }

        let signed = operand_ty.is_signed();
        let cc = match (op, signed) {
            (BinOp::Eq, _) => IntCC::Equal,
            (BinOp::NotEq, _) => IntCC::NotEqual,
            (BinOp::Less, true) => IntCC::SignedLessThan,
            (BinOp::Less, false) => IntCC::UnsignedLessThan,
            (BinOp::LessEq, true) => IntCC::SignedLessThanOrEqual,
            (BinOp::LessEq, false) => IntCC::UnsignedLessThanOrEqual,
            (BinOp::Greater, true) => IntCC::SignedGreaterThan,
            (BinOp::Greater, false) => IntCC::UnsignedGreaterThan,
            (_, true) => IntCC::SignedGreaterThanOrEqual,
            (_, false) => IntCC::UnsignedGreaterThanOrEqual,
        };
        Ok(self.builder.ins().icmp(cc, lhs, rhs))
    }

    fn float_arith(&mut self, op: BinOp, lhs: Value, rhs: Value, ty: &Type, span: Span) -> CodegenResult<Value> {
        Ok(match op {
            BinOp::Add => self.builder.ins().fadd(lhs, rhs),
            BinOp::Sub => self.builder.ins().fsub(lhs, rhs),
            BinOp::Mul => self.builder.ins().fmul(lhs, rhs),
            BinOp::Div => self.builder.ins().fdiv(lhs, rhs),
            BinOp::Pow => return self.float_pow(lhs, rhs, ty),
            _ => {
                return Err(CodegenError::internal(format!(
                    "operator '{}' at {span} is not defined on floats",
                    op.symbol()
                )))
            }
        })
    }

    fn int_arith(
        &mut self,
        op: BinOp,
        lhs: Value,
        rhs: Value,
        signed: bool,
        bits: u8,
        span: Span,
    ) -> CodegenResult<Value> {
        Ok(match op {
            BinOp::Add => self.builder.ins().iadd(lhs, rhs),
            BinOp::Sub => self.builder.ins().isub(lhs, rhs),
            BinOp::Mul => self.builder.ins().imul(lhs, rhs),
            BinOp::BitAnd => self.builder.ins().band(lhs, rhs),
            BinOp::BitOr => self.builder.ins().bor(lhs, rhs),
            BinOp::BitXor => self.builder.ins().bxor(lhs, rhs),
            BinOp::Div | BinOp::Mod => return self.int_division(op, lhs, rhs, signed, bits),
            BinOp::Pow => return self.int_pow(lhs, rhs, signed, bits, span),
            _ => {
                return Err(CodegenError::internal(format!(
                    "operator '{}' at {span} is not arithmetic",
                    op.symbol()
                )))
            }
        })
    }

    /// Division and remainder with a zero check. Signed `MIN / -1` wraps to
    /// `MIN` and `MIN % -1` is 0 instead of trapping.
    fn int_division(&mut self, op: BinOp, lhs: Value, rhs: Value, signed: bool, bits: u8) -> CodegenResult<Value> {
        let zero = self.int_const(bits, 0);
        let is_zero = self.builder.ins().icmp(IntCC::Equal, rhs, zero);
        let fail = self.builder.create_block();
        let ok = self.builder.create_block();
        self.builder.ins().brif(is_zero, fail, &[], ok, &[]);

        self.builder.switch_to_block(fail);
        self.builder.set_cold_block(fail);
        let handler = self
            .module
            .declare_func_in_func(self.runtime.div_zero, self.builder.func);
        self.builder.ins().call(handler, &[]);
        self.builder
            .ins()
            .trap(TrapCode::unwrap_user(DIV_ZERO_UNREACHABLE));

        self.builder.switch_to_block(ok);
        if !signed {
            return Ok(match op {
                BinOp::Div => self.builder.ins().udiv(lhs, rhs),
                _ => self.builder.ins().urem(lhs, rhs),
            });
        }

        let minus_one = self.int_const(bits, -1);
        let one = self.int_const(bits, 1);
        let is_minus_one = self.builder.ins().icmp(IntCC::Equal, rhs, minus_one);
        let safe_rhs = self.builder.ins().select(is_minus_one, one, rhs);
        Ok(match op {
            BinOp::Div => {
                let quotient = self.builder.ins().sdiv(lhs, safe_rhs);
                let negated = self.builder.ins().ineg(lhs);
                self.builder.ins().select(is_minus_one, negated, quotient)
            }
            _ => {
                let remainder = self.builder.ins().srem(lhs, safe_rhs);
                self.builder.ins().select(is_minus_one, zero, remainder)
            }
        })
    }

    /// Integer `**` through the runtime's 64-bit helpers, truncated back.
    fn int_pow(&mut self, lhs: Value, rhs: Value, signed: bool, bits: u8, span: Span) -> CodegenResult<Value> {
        let (helper, wide_ty) = if signed {
            (self.runtime.ipow, Type::I64)
        } else {
            (self.runtime.upow, Type::U64)
        };
        let operand_ty = Type::Int { signed, bits };
        let base = self.coerce(lhs, &operand_ty, &wide_ty, span)?;
        let exp = self.coerce(rhs, &operand_ty, &wide_ty, span)?;
        let func = self.module.declare_func_in_func(helper, self.builder.func);
        let call = self.builder.ins().call(func, &[base, exp]);
        let wide = self.first_result(call)?;
        self.coerce(wide, &wide_ty, &operand_ty, span)
    }

    fn float_pow(&mut self, lhs: Value, rhs: Value, ty: &Type) -> CodegenResult<Value> {
        let narrow = *ty == Type::F32;
        let (base, exp) = if narrow {
            (
                self.builder.ins().fpromote(F64, lhs),
                self.builder.ins().fpromote(F64, rhs),
            )
        } else {
            (lhs, rhs)
        };
        let func = self
            .module
            .declare_func_in_func(self.runtime.powf, self.builder.func);
        let call = self.builder.ins().call(func, &[base, exp]);
        let result = self.first_result(call)?;
        Ok(if narrow {
            self.builder.ins().fdemote(F32, result)
        } else {
            result
        })
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Calls
    // ══════════════════════════════════════════════════════════════════════════

    /// Lower a call. Returns `None` for functions returning `void`.
    ///
    /// User functions shadow builtins of the same name.
    pub(crate) fn lower_call(&mut self, callee: &Ident, args: &[Expr], span: Span) -> CodegenResult<Option<Value>> {
        let (func_id, sig) = match self.functions.get(&callee.name) {
            Some(declared) => (declared.id, declared.sig.clone()),
            None => {
                let builtin = builtins::lookup(&callee.name).ok_or_else(|| {
                    CodegenError::internal(format!("unresolved function '{}' at {span}", callee.name))
                })?;
                let id = self.runtime.builtins.get(builtin.name).copied().ok_or_else(|| {
                    CodegenError::internal(format!("builtin '{}' was not declared", builtin.name))
                })?;
                (id, builtin.signature())
            }
        };
        if sig.params.len() != args.len() {
            return Err(CodegenError::internal(format!(
                "call to '{}' at {span} has {} arguments, expected {}",
                callee.name,
                args.len(),
                sig.params.len()
            )));
        }

        let mut values = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(&sig.params) {
            values.push(self.lower_expr_as(arg, param)?);
        }
        let func_ref = self.module.declare_func_in_func(func_id, self.builder.func);
        let call = self.builder.ins().call(func_ref, &values);
        Ok(self.builder.inst_results(call).first().copied())
    }

    fn first_result(&mut self, call: ir::Inst) -> CodegenResult<Value> {
        self.builder
            .inst_results(call)
            .first()
            .copied()
            .ok_or_else(|| CodegenError::internal("runtime helper returned no value"))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Conversions
    // ══════════════════════════════════════════════════════════════════════════

    /// Convert `value` from `from` to `to`.
    ///
    /// Integers extend by the source's signedness and truncate when
    /// narrowing. Float to integer saturates. Integer to bool is `!= 0`.
    pub(crate) fn coerce(&mut self, value: Value, from: &Type, to: &Type, span: Span) -> CodegenResult<Value> {
        if from == to {
            return Ok(value);
        }
        Ok(match (from, to) {
            (Type::Int { signed, bits: fb }, Type::Int { bits: tb, .. }) => {
                if fb == tb {
                    value
                } else if fb < tb && *signed {
                    self.builder.ins().sextend(int_type(*tb), value)
                } else if fb < tb {
                    self.builder.ins().uextend(int_type(*tb), value)
                } else {
                    self.builder.ins().ireduce(int_type(*tb), value)
                }
            }
            (Type::Bool, Type::Int { bits: 8, .. }) => value,
            (Type::Bool, Type::Int { bits, .. }) => self.builder.ins().uextend(int_type(*bits), value),
            (Type::Int { bits, .. }, Type::Bool) => {
                let zero = self.int_const(*bits, 0);
                self.builder.ins().icmp(IntCC::NotEqual, value, zero)
            }
            (Type::Float { bits: 32 }, Type::Float { .. }) => self.builder.ins().fpromote(F64, value),
            (Type::Float { .. }, Type::Float { .. }) => self.builder.ins().fdemote(F32, value),
            (Type::Int { signed, bits }, Type::Float { bits: fbits }) => {
                let wide = self.widen_to_i64(value, *signed, *bits);
                let float_ty = if *fbits == 32 { F32 } else { F64 };
                if *signed {
                    self.builder.ins().fcvt_from_sint(float_ty, wide)
                } else {
                    self.builder.ins().fcvt_from_uint(float_ty, wide)
                }
            }
            (Type::Bool, Type::Float { bits: fbits }) => {
                let wide = self.builder.ins().uextend(I64, value);
                let float_ty = if *fbits == 32 { F32 } else { F64 };
                self.builder.ins().fcvt_from_uint(float_ty, wide)
            }
            (Type::Float { .. }, Type::Int { signed, bits }) => {
                self.float_to_int(value, *signed, *bits)
            }
            _ => {
                return Err(CodegenError::internal(format!(
                    "no conversion from {from} to {to} at {span}"
                )))
            }
        })
    }

    fn widen_to_i64(&mut self, value: Value, signed: bool, bits: u8) -> Value {
        match (bits, signed) {
            (64, _) => value,
            (_, true) => self.builder.ins().sextend(I64, value),
            (_, false) => self.builder.ins().uextend(I64, value),
        }
    }

    /// Saturating float to integer. Narrow targets convert through `i64`
    /// and clamp to the target's range before truncating.
    fn float_to_int(&mut self, value: Value, signed: bool, bits: u8) -> Value {
        if bits == 64 {
            return if signed {
                self.builder.ins().fcvt_to_sint_sat(I64, value)
            } else {
                self.builder.ins().fcvt_to_uint_sat(I64, value)
            };
        }
        let wide = self.builder.ins().fcvt_to_sint_sat(I64, value);
        let (min, max) = if signed {
            let max = (1i128 << (bits - 1)) - 1;
            (-max - 1, max)
        } else {
            (0, (1i128 << bits) - 1)
        };
        let min = self.int_const(64, min);
        let max = self.int_const(64, max);
        let clamped = self.builder.ins().smax(wide, min);
        let clamped = self.builder.ins().smin(clamped, max);
        self.builder.ins().ireduce(int_type(bits), clamped)
    }
}
