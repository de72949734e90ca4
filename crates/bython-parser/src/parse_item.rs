//! Top-level parsing: the module and its function definitions.

use bython_lexer::TokenKind;
use bython_types::ast::*;
use bython_types::ErrorCode;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Module
    // ══════════════════════════════════════════════════════════════════════════

    /// `Module = { FunctionDef } EOF`
    pub(crate) fn parse_module(&mut self) -> Option<Module> {
        let start = self.current_span();
        let mut items = Vec::new();

        while !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            let item_start = self.consumed;
            if !self.check_exact(&TokenKind::Def) {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected 'def' at top level, got '{}'", self.peek_kind()),
                );
                self.synchronize_item(item_start);
                continue;
            }
            match self.parse_function() {
                Some(func) => items.push(func),
                None => self.synchronize_item(item_start),
            }
        }

        let span = match items.last() {
            Some(last) => start.merge(last.span),
            None => start,
        };
        Some(Module { items, span })
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Function Definitions
    // ══════════════════════════════════════════════════════════════════════════

    /// ```ebnf
    /// FunctionDef = "def" Identifier "(" [ Params ] ")" [ "->" Type ] Body ;
    /// Body        = Block | ":" Statement ;
    /// ```
    fn parse_function(&mut self) -> Option<FunctionDef> {
        let start = self.advance().span;
        let name = self.expect_identifier()?;
        let params = self.parse_params()?;
        let return_type = if self.eat(&TokenKind::Arrow) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        let body = if self.eat(&TokenKind::Colon) {
            self.parse_inline_body()?
        } else {
            self.parse_block()?
        };
        let span = start.merge(body.span);
        Some(FunctionDef {
            name,
            params,
            return_type,
            body,
            span,
            signature: None,
        })
    }

    /// `Params = Param { "," Param } [ "," ]` inside parentheses.
    fn parse_params(&mut self) -> Option<Vec<Param>> {
        let open = self.expect(&TokenKind::LParen)?.span;
        let mut params = Vec::new();
        while !self.check_exact(&TokenKind::RParen) && !self.at_end() {
            params.push(self.parse_param()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_closing(&TokenKind::RParen, open)?;
        Some(params)
    }

    /// `Param = Identifier ":" Type`
    fn parse_param(&mut self) -> Option<Param> {
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Colon)?;
        let ty = self.parse_type_annotation()?;
        let span = name.span.merge(ty.span);
        Some(Param { name, ty, span })
    }

    /// A single statement after `:`, with its `;` optional.
    fn parse_inline_body(&mut self) -> Option<Block> {
        self.inline_body = true;
        let stmt = self.parse_statement();
        self.inline_body = false;
        let stmt = stmt?;
        Some(Block {
            span: stmt.span,
            stmts: vec![stmt],
        })
    }
}
