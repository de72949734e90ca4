//! Statement and block parsing.

use bython_lexer::TokenKind;
use bython_types::ast::*;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Blocks
    // ══════════════════════════════════════════════════════════════════════════

    /// `Block = "{" { Statement } "}"`
    ///
    /// A failed statement is skipped up to the next boundary and the block
    /// keeps going, so every broken statement gets its own diagnostic.
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        self.enter_nesting()?;
        // Statements nested inside braces need their `;` again.
        let inline = std::mem::replace(&mut self.inline_body, false);
        let block = self.parse_braced();
        self.inline_body = inline;
        self.leave_nesting(1);
        block
    }

    fn parse_braced(&mut self) -> Option<Block> {
        let open = self.expect(&TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();

        while !self.check_exact(&TokenKind::RBrace)
            && !self.check_exact(&TokenKind::Def)
            && !self.at_end()
        {
            if self.too_many_errors() {
                return None;
            }
            let start = self.consumed;
            match self.parse_statement() {
                Some(stmt) => stmts.push(stmt),
                None => self.synchronize(start),
            }
        }

        self.expect_closing(&TokenKind::RBrace, open)?;
        Some(Block {
            stmts,
            span: open.merge(self.previous_span()),
        })
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════════

    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        match self.peek_kind() {
            TokenKind::Val => self.parse_val(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Discard => self.parse_discard(),
            TokenKind::Identifier(_) if self.look_ahead(1) == &TokenKind::Eq => {
                self.parse_assign()
            }
            _ => self.parse_expr_stmt(),
        }
    }

    /// `ValStmt = "val" Identifier [ ":" Type ] "=" Expr ";"`
    fn parse_val(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let name = self.expect_identifier()?;
        let annotation = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expression()?;
        let span = start.merge(value.span);
        self.expect_terminator();
        Some(Stmt::new(
            StmtKind::Val {
                name,
                annotation,
                value,
                binding_type: None,
            },
            span,
        ))
    }

    /// `AssignStmt = Identifier "=" Expr ";"`
    fn parse_assign(&mut self) -> Option<Stmt> {
        let target = self.expect_identifier()?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expression()?;
        let span = target.span.merge(value.span);
        self.expect_terminator();
        Some(Stmt::new(StmtKind::Assign { target, value }, span))
    }

    /// `IfStmt = "if" Expr Block { "elif" Expr Block } [ "else" Block ]`
    fn parse_if(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        let mut branches = Vec::new();
        loop {
            // `if` on the first pass, `elif` afterwards
            let keyword = self.advance().span;
            let cond = self.parse_expression()?;
            let body = self.parse_block()?;
            let span = keyword.merge(body.span);
            branches.push(CondBranch { cond, body, span });
            if !self.check_exact(&TokenKind::Elif) {
                break;
            }
        }
        let else_block = if self.eat(&TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };
        Some(Stmt::new(
            StmtKind::If {
                branches,
                else_block,
            },
            start.merge(self.previous_span()),
        ))
    }

    /// `WhileStmt = "while" Expr Block`
    fn parse_while(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let cond = self.parse_expression()?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Some(Stmt::new(StmtKind::While { cond, body }, span))
    }

    /// `ReturnStmt = "return" [ Expr ] ";"`
    fn parse_return(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let value = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let span = start.merge(self.previous_span());
        self.expect_terminator();
        Some(Stmt::new(StmtKind::Return(value), span))
    }

    /// `DiscardStmt = "discard" Expr ";"`
    fn parse_discard(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let value = self.parse_expression()?;
        let span = start.merge(value.span);
        self.expect_terminator();
        Some(Stmt::new(StmtKind::Discard(value), span))
    }

    fn parse_expr_stmt(&mut self) -> Option<Stmt> {
        let value = self.parse_expression()?;
        let span = value.span;
        self.expect_terminator();
        Some(Stmt::new(StmtKind::Expr(value), span))
    }

    /// Whether the cursor sits where an optional trailing expression is absent.
    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Def | TokenKind::Eof
        )
    }
}
