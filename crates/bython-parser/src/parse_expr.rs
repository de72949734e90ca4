//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//!  1. `||`
//!  2. `&&`
//!  3. `==`, `!=`, `<`, `<=`, `>`, `>=` (no chaining)
//!  4. `|`
//!  5. `^`
//!  6. `&`
//!  7. `<<`, `>>`
//!  8. `+`, `-`
//!  9. `*`, `/`, `%`
//! 10. unary `-`, `+`, `~`, `!`
//! 11. `**` (right-associative; `-2 ** 2` is `-(2 ** 2)`, `2 ** -1` is allowed)
//! 12. `as` (postfix cast, left-associative)
//! 13. literals, names, calls, parenthesised expressions
//!
//! All binary levels except `**` and the comparisons are left-associative.
//! Every operand and every operator applied draws one level from the
//! parser's nesting budget.

use bython_lexer::TokenKind;
use bython_types::ast::*;
use bython_types::ErrorCode;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.parse_or()
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse one left-associative level: `Next { op Next }`.
    fn parse_left_assoc(
        &mut self,
        next: fn(&mut Self) -> Option<Expr>,
        match_op: fn(&TokenKind) -> Option<BinOp>,
    ) -> Option<Expr> {
        let mut left = next(self)?;
        let mut levels = 0;
        while let Some(op) = match_op(self.peek_kind()) {
            // Each operator deepens the left spine by one node.
            if self.enter_nesting().is_none() {
                self.leave_nesting(levels);
                return None;
            }
            levels += 1;
            self.advance();
            let Some(right) = next(self) else {
                self.leave_nesting(levels);
                return None;
            };
            left = binary(left, op, right);
        }
        self.leave_nesting(levels);
        Some(left)
    }

    /// `OrExpr = AndExpr { "||" AndExpr }`
    fn parse_or(&mut self) -> Option<Expr> {
        self.parse_left_assoc(Self::parse_and, |k| {
            matches!(k, TokenKind::PipePipe).then_some(BinOp::Or)
        })
    }

    /// `AndExpr = CompExpr { "&&" CompExpr }`
    fn parse_and(&mut self) -> Option<Expr> {
        self.parse_left_assoc(Self::parse_comparison, |k| {
            matches!(k, TokenKind::AmpAmp).then_some(BinOp::And)
        })
    }

    /// `CompExpr = BitOrExpr [ CompOp BitOrExpr ]`
    ///
    /// Comparison operators do NOT chain: `a < b < c` is a syntax error.
    /// The extra operands are still consumed so only one error is reported.
    fn parse_comparison(&mut self) -> Option<Expr> {
        let mut left = self.parse_bit_or()?;
        let Some(op) = comparison_op(self.peek_kind()) else {
            return Some(left);
        };
        self.advance();
        let right = self.parse_bit_or()?;
        left = binary(left, op, right);

        if comparison_op(self.peek_kind()).is_some() {
            self.error_at_current(
                ErrorCode::CHAINED_COMPARISON,
                "comparison operators cannot be chained; combine them with '&&'",
            );
            while let Some(op) = comparison_op(self.peek_kind()) {
                self.enter_nesting()?;
                self.advance();
                let right = self.parse_bit_or();
                self.leave_nesting(1);
                left = binary(left, op, right?);
            }
        }
        Some(left)
    }

    fn parse_bit_or(&mut self) -> Option<Expr> {
        self.parse_left_assoc(Self::parse_bit_xor, |k| {
            matches!(k, TokenKind::Pipe).then_some(BinOp::BitOr)
        })
    }

    fn parse_bit_xor(&mut self) -> Option<Expr> {
        self.parse_left_assoc(Self::parse_bit_and, |k| {
            matches!(k, TokenKind::Caret).then_some(BinOp::BitXor)
        })
    }

    fn parse_bit_and(&mut self) -> Option<Expr> {
        self.parse_left_assoc(Self::parse_shift, |k| {
            matches!(k, TokenKind::Amp).then_some(BinOp::BitAnd)
        })
    }

    fn parse_shift(&mut self) -> Option<Expr> {
        self.parse_left_assoc(Self::parse_additive, |k| match k {
            TokenKind::LessLess => Some(BinOp::Shl),
            TokenKind::GreaterGreater => Some(BinOp::Shr),
            _ => None,
        })
    }

    /// `AddExpr = MulExpr { ("+" | "-") MulExpr }`
    fn parse_additive(&mut self) -> Option<Expr> {
        self.parse_left_assoc(Self::parse_multiplicative, |k| match k {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    /// `MulExpr = UnaryExpr { ("*" | "/" | "%") UnaryExpr }`
    fn parse_multiplicative(&mut self) -> Option<Expr> {
        self.parse_left_assoc(Self::parse_unary, |k| match k {
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::Percent => Some(BinOp::Mod),
            _ => None,
        })
    }

    /// `UnaryExpr = ("-" | "+" | "~" | "!") UnaryExpr | PowerExpr`
    ///
    /// Every operand passes through here, so this is where the nesting
    /// budget is charged for prefix chains, `**` exponents and parentheses.
    fn parse_unary(&mut self) -> Option<Expr> {
        self.enter_nesting()?;
        let expr = self.parse_unary_inner();
        self.leave_nesting(1);
        expr
    }

    fn parse_unary_inner(&mut self) -> Option<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_power(),
        };
        let start = self.advance().span;
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// `PowerExpr = CastExpr [ "**" UnaryExpr ]`
    ///
    /// The right operand re-enters the unary level, which makes `**`
    /// right-associative and lets it take a signed exponent.
    fn parse_power(&mut self) -> Option<Expr> {
        let base = self.parse_cast()?;
        if !self.eat(&TokenKind::StarStar) {
            return Some(base);
        }
        let exponent = self.parse_unary()?;
        Some(binary(base, BinOp::Pow, exponent))
    }

    /// `CastExpr = Primary { "as" Type }`
    fn parse_cast(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        let mut levels = 0;
        while self.check_exact(&TokenKind::As) {
            if self.enter_nesting().is_none() {
                self.leave_nesting(levels);
                return None;
            }
            levels += 1;
            self.advance();
            let Some(target) = self.parse_type_annotation() else {
                self.leave_nesting(levels);
                return None;
            };
            let span = expr.span.merge(target.span);
            expr = Expr::new(
                ExprKind::Cast {
                    expr: Box::new(expr),
                    target,
                },
                span,
            );
        }
        self.leave_nesting(levels);
        Some(expr)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let span = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::IntLit(value) => ExprKind::IntLit(value),
            TokenKind::FloatLit(value) => ExprKind::FloatLit(value),
            TokenKind::StrLit(value) => ExprKind::StrLit(value),
            TokenKind::True => ExprKind::BoolLit(true),
            TokenKind::False => ExprKind::BoolLit(false),
            TokenKind::Identifier(_) if self.look_ahead(1) == &TokenKind::LParen => {
                return self.parse_call();
            }
            TokenKind::Identifier(name) => ExprKind::Ident(Ident::new(name, span)),
            TokenKind::LParen => return self.parse_paren(),
            other => {
                self.error_at_current(
                    ErrorCode::EXPECTED_EXPRESSION,
                    format!("expected expression, got '{other}'"),
                );
                return None;
            }
        };
        self.advance();
        Some(Expr::new(kind, span))
    }

    fn parse_paren(&mut self) -> Option<Expr> {
        let open = self.advance().span;
        let inner = self.parse_expression()?;
        self.expect_closing(&TokenKind::RParen, open)?;
        let span = open.merge(self.previous_span());
        Some(Expr::new(ExprKind::Paren(Box::new(inner)), span))
    }

    /// `Call = Identifier "(" [ Expr { "," Expr } [ "," ] ] ")"`
    fn parse_call(&mut self) -> Option<Expr> {
        let callee = self.expect_identifier()?;
        let open = self.advance().span;
        let mut args = Vec::new();
        while !self.check_exact(&TokenKind::RParen) && !self.at_end() {
            args.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_closing(&TokenKind::RParen, open)?;
        let span = callee.span.merge(self.previous_span());
        Some(Expr::new(ExprKind::Call { callee, args }, span))
    }
}

fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

fn comparison_op(kind: &TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::EqEq => Some(BinOp::Eq),
        TokenKind::BangEq => Some(BinOp::NotEq),
        TokenKind::Less => Some(BinOp::Less),
        TokenKind::LessEq => Some(BinOp::LessEq),
        TokenKind::Greater => Some(BinOp::Greater),
        TokenKind::GreaterEq => Some(BinOp::GreaterEq),
        _ => None,
    }
}
