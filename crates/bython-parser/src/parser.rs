//! Core parser infrastructure: token cursor, error reporting, recovery.

use std::collections::VecDeque;

use bython_lexer::{Lexer, Token, TokenKind};
use bython_types::ast::{Ident, Module};
use bython_types::{Diagnostic, Diagnostics, ErrorCode, SourceFile, Span, Stage, MAX_ERRORS};

/// Tokens kept buffered ahead of the cursor. `IDENT "="` needs two.
const LOOKAHEAD: usize = 2;

/// Deepest nesting of expressions and blocks accepted before giving up.
///
/// Operators, casts, parentheses and blocks all draw on one budget, since
/// every later stage walks the tree recursively.
pub const MAX_NESTING_DEPTH: u32 = 256;

/// The Bython parser.
///
/// Pulls tokens lazily from a [`Lexer`] and builds a [`Module`]. Syntax
/// errors are collected and parsing resumes at the next statement or
/// function boundary.
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    /// Buffered tokens; the front is the current token.
    buffer: VecDeque<Token>,
    /// Returned by `peek` if the buffer is ever empty.
    eof: Token,
    previous_span: Span,
    /// Number of tokens consumed so far. Used to guarantee recovery progress.
    pub(crate) consumed: usize,
    source_file: &'src SourceFile,
    errors: Diagnostics,
    /// Set while parsing a `def f(): stmt` body, where `;` is optional.
    pub(crate) inline_body: bool,
    /// Current nesting, see [`MAX_NESTING_DEPTH`].
    depth: u32,
    gave_up: bool,
}

impl<'src> Parser<'src> {
    pub fn new(lexer: Lexer<'src>) -> Self {
        let source_file = lexer.source_file();
        let mut parser = Self {
            lexer,
            buffer: VecDeque::with_capacity(LOOKAHEAD),
            eof: Token::new(TokenKind::Eof, "", Span::point(1, 1)),
            previous_span: Span::point(1, 1),
            consumed: 0,
            source_file,
            errors: Diagnostics::empty(),
            inline_body: false,
            depth: 0,
            gave_up: false,
        };
        parser.fill();
        parser
    }

    /// Convenience constructor that lexes `source_file` itself.
    pub fn from_source(source_file: &'src SourceFile) -> Self {
        Self::new(Lexer::new(source_file))
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    fn fill(&mut self) {
        while self.buffer.len() < LOOKAHEAD {
            match self.lexer.next() {
                Some(token) => self.buffer.push_back(token),
                None => break,
            }
        }
    }

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        self.buffer.front().unwrap_or(&self.eof)
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Kind of the token `n` positions ahead of the cursor (`n < 2`).
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.buffer
            .get(n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    /// Advance the cursor by one and return the consumed token.
    /// At `Eof` the cursor stays put.
    pub(crate) fn advance(&mut self) -> Token {
        if self.at_end() {
            return self.peek().clone();
        }
        let token = match self.buffer.pop_front() {
            Some(token) => token,
            None => return self.eof.clone(),
        };
        if token.kind == TokenKind::Eof {
            self.eof = token.clone();
        }
        self.previous_span = token.span;
        self.consumed += 1;
        self.fill();
        token
    }

    pub(crate) fn previous_span(&self) -> Span {
        self.previous_span
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind. Returns the token if matched, or emits an error.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check_exact(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected '{}', got '{}'", expected, self.peek_kind()),
            );
            None
        }
    }

    /// Expect the closing half of a delimiter pair opened at `open`.
    pub(crate) fn expect_closing(&mut self, closing: &TokenKind, open: Span) -> Option<Token> {
        if self.check_exact(closing) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::UNCLOSED_DELIMITER,
                format!(
                    "expected '{}' to close the delimiter opened at {}, got '{}'",
                    closing,
                    open,
                    self.peek_kind()
                ),
            );
            None
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            _ => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected identifier, got '{}'", self.peek_kind()),
                );
                None
            }
        }
    }

    /// Expect the `;` that ends a simple statement.
    ///
    /// A missing `;` is reported but the statement is kept, so parsing
    /// resumes at the offending token. Inside a single-statement body the
    /// `;` is optional.
    pub(crate) fn expect_terminator(&mut self) {
        if self.eat(&TokenKind::Semicolon) || self.inline_body {
            return;
        }
        self.error_at(
            ErrorCode::UNEXPECTED_TOKEN,
            format!("expected ';' after statement, got '{}'", self.peek_kind()),
            self.current_span(),
        );
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let diagnostic = Diagnostic::new(
            self.source_file.name.as_str(),
            code,
            Stage::Parse,
            message,
            span,
            source_line,
        );
        self.errors.push(diagnostic);
    }

    /// Returns `true` once the error limit is hit. Reports the cut-off once.
    pub(crate) fn too_many_errors(&mut self) -> bool {
        if self.gave_up {
            return true;
        }
        if self.errors.total_errors >= MAX_ERRORS {
            self.gave_up = true;
            self.error_at_current(
                ErrorCode::TOO_MANY_ERRORS,
                format!("too many syntax errors ({MAX_ERRORS}); giving up"),
            );
            return true;
        }
        false
    }

    // ── Nesting ───────────────────────────────────────────────────────────────

    /// Enter one nesting level.
    ///
    /// Past [`MAX_NESTING_DEPTH`] this reports a syntax error, stops the
    /// parse and returns `None` without entering.
    pub(crate) fn enter_nesting(&mut self) -> Option<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            if !self.gave_up {
                self.error_at_current(
                    ErrorCode::NESTING_TOO_DEEP,
                    format!("nesting exceeds {MAX_NESTING_DEPTH} levels; giving up"),
                );
                self.gave_up = true;
            }
            return None;
        }
        self.depth += 1;
        Some(())
    }

    pub(crate) fn leave_nesting(&mut self, levels: u32) {
        self.depth -= levels;
    }

    // ── Synchronization ───────────────────────────────────────────────────────

    /// Skip to the next statement boundary after a failed statement that
    /// started when `consumed` was `start`.
    ///
    /// Stops after a `;`, or before `}`, `def` or a statement keyword.
    pub(crate) fn synchronize(&mut self, start: usize) {
        if self.consumed == start {
            self.advance();
        }
        while !self.at_end() {
            match self.peek_kind() {
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace | TokenKind::Def => return,
                kind if kind.starts_statement() => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Skip to the next `def` after a failed function definition.
    pub(crate) fn synchronize_item(&mut self, start: usize) {
        if self.consumed == start {
            self.advance();
        }
        while !self.at_end() && !self.check_exact(&TokenKind::Def) {
            self.advance();
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the whole token stream into a [`Module`].
    ///
    /// Lexical diagnostics are appended to `diagnostics` first, then syntax
    /// diagnostics. Returns `None` only if no module could be built.
    pub fn parse(mut self, diagnostics: &mut Diagnostics) -> Option<Module> {
        let module = self.parse_module();
        diagnostics.append(&mut self.lexer.take_diagnostics());
        diagnostics.append(&mut self.errors);
        module
    }
}
