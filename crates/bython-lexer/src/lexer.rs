//! Core Bython lexer: a lazy, restartable token stream.
//!
//! Features:
//! - Produces tokens on demand through [`Iterator`]; one [`TokenKind::Eof`]
//!   ends every pass
//! - `#` comments, whitespace and `\`-newline continuations are skipped with
//!   line/column tracking intact
//! - Integer literals in decimal, `0d`, `0x`, `0o` and `0b` forms
//! - Error recovery: a bad character is reported and skipped, so one pass
//!   surfaces every lexical error up to [`MAX_ERRORS`], after which the
//!   stream ends early

use std::iter::FusedIterator;

use bython_types::{Diagnostic, Diagnostics, ErrorCode, SourceFile, Span, Stage, MAX_ERRORS};

use crate::token::{Token, TokenKind};

/// The Bython lexer.
///
/// Diagnostics are collected on the lexer itself and handed to the caller
/// through [`Lexer::take_diagnostics`] or [`Lexer::tokenize`].
pub struct Lexer<'src> {
    source: &'src [u8],
    source_file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based, in characters).
    col: u32,
    /// Set once `Eof` has been yielded.
    finished: bool,
    diagnostics: Diagnostics,
    /// Errors reported this pass, kept apart from `diagnostics` so that
    /// [`Lexer::take_diagnostics`] does not lift the cap.
    error_count: usize,
}

/// Result of lexing a whole file: tokens + any diagnostics collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub diagnostics: Diagnostics,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.as_bytes(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            finished: false,
            diagnostics: Diagnostics::empty(),
            error_count: 0,
        }
    }

    /// The file being scanned.
    pub fn source_file(&self) -> &'src SourceFile {
        self.source_file
    }

    /// Rewind to the start of the source and discard collected diagnostics.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.line = 1;
        self.col = 1;
        self.finished = false;
        self.diagnostics = Diagnostics::empty();
        self.error_count = 0;
    }

    /// Diagnostics collected so far in this pass.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Move the collected diagnostics out of the lexer.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    /// Lex the entire source file into a token stream.
    pub fn tokenize(mut self) -> LexResult {
        let tokens: Vec<Token> = self.by_ref().collect();
        LexResult {
            tokens,
            diagnostics: self.diagnostics,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if ch & 0xC0 != 0x80 {
            // UTF-8 continuation bytes share the column of their lead byte.
            self.col += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(start_col),
        )
    }

    fn text_from(&self, start: usize) -> &'src str {
        std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("")
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let diagnostic = Diagnostic::new(
            self.source_file.name.as_str(),
            code,
            Stage::Lex,
            message,
            span,
            source_line,
        );
        self.error_count += 1;
        self.diagnostics.push(diagnostic);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip whitespace, `#` comments and `\`-newline continuations.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.advance();
                }
                Some(b'#') => {
                    while let Some(ch) = self.peek() {
                        if ch == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'\\') if self.peek_at(1) == Some(b'\n') => {
                    self.advance();
                    self.advance();
                }
                Some(b'\\') if self.peek_at(1) == Some(b'\r') && self.peek_at(2) == Some(b'\n') => {
                    self.advance();
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan one token. Bad characters are reported and skipped.
    fn scan_token(&mut self) -> Token {
        loop {
            // Past the error cap the rest of the file is not scanned.
            if self.error_count >= MAX_ERRORS {
                return Token::new(TokenKind::Eof, "", self.current_span());
            }

            self.skip_trivia();

            let start = self.pos;
            let start_line = self.line;
            let start_col = self.col;
            let Some(ch) = self.advance() else {
                return Token::new(TokenKind::Eof, "", self.current_span());
            };

            let kind = match ch {
                b'"' => self.scan_string(start_line, start_col),
                b'0'..=b'9' => self.scan_number(start, start_line, start_col),
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(start),

                b'+' => TokenKind::Plus,
                b'/' => TokenKind::Slash,
                b'%' => TokenKind::Percent,
                b'^' => TokenKind::Caret,
                b'~' => TokenKind::Tilde,
                b'(' => TokenKind::LParen,
                b')' => TokenKind::RParen,
                b'{' => TokenKind::LBrace,
                b'}' => TokenKind::RBrace,
                b',' => TokenKind::Comma,
                b':' => TokenKind::Colon,
                b';' => TokenKind::Semicolon,

                b'*' if self.eat(b'*') => TokenKind::StarStar,
                b'*' => TokenKind::Star,
                b'-' if self.eat(b'>') => TokenKind::Arrow,
                b'-' => TokenKind::Minus,
                b'&' if self.eat(b'&') => TokenKind::AmpAmp,
                b'&' => TokenKind::Amp,
                b'|' if self.eat(b'|') => TokenKind::PipePipe,
                b'|' => TokenKind::Pipe,
                b'!' if self.eat(b'=') => TokenKind::BangEq,
                b'!' => TokenKind::Bang,
                b'=' if self.eat(b'=') => TokenKind::EqEq,
                b'=' => TokenKind::Eq,
                b'<' if self.eat(b'=') => TokenKind::LessEq,
                b'<' if self.eat(b'<') => TokenKind::LessLess,
                b'<' => TokenKind::Less,
                b'>' if self.eat(b'=') => TokenKind::GreaterEq,
                b'>' if self.eat(b'>') => TokenKind::GreaterGreater,
                b'>' => TokenKind::Greater,

                _ => {
                    // Consume the rest of a multi-byte character.
                    while matches!(self.peek(), Some(b) if b & 0xC0 == 0x80) {
                        self.advance();
                    }
                    let span = self.span_from(start_line, start_col);
                    let text = self.text_from(start);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_CHARACTER,
                        format!("unexpected character '{}'", text.escape_debug()),
                        span,
                    );
                    continue;
                }
            };

            let span = self.span_from(start_line, start_col);
            return Token::new(kind, self.text_from(start), span);
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, start: usize, start_line: u32, start_col: u32) -> TokenKind {
        // First digit already consumed.
        let radix = match (self.source[start], self.peek()) {
            (b'0', Some(b'x' | b'X')) => Some(16),
            (b'0', Some(b'o' | b'O')) => Some(8),
            (b'0', Some(b'b' | b'B')) => Some(2),
            (b'0', Some(b'd' | b'D')) => Some(10),
            _ => None,
        };

        if let Some(radix) = radix {
            self.advance(); // consume the radix letter
            let digits_start = self.pos;
            while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
                self.advance();
            }
            let digits = self.text_from(digits_start).replace('_', "");
            return self.int_literal(&digits, radix, start, start_line, start_col);
        }

        self.skip_digits();
        let mut is_float = false;

        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            is_float = true;
            self.advance();
            self.skip_digits();
        }

        let exponent_digit = match self.peek_at(1) {
            Some(b'+' | b'-') => self.peek_at(2),
            other => other,
        };
        if matches!(self.peek(), Some(b'e' | b'E')) && matches!(exponent_digit, Some(b'0'..=b'9')) {
            is_float = true;
            self.advance();
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.advance();
            }
            self.skip_digits();
        }

        let text = self.text_from(start).replace('_', "");
        if is_float {
            // Float syntax was validated above, so parsing cannot fail.
            return TokenKind::FloatLit(text.parse().unwrap_or(0.0));
        }
        self.int_literal(&text, 10, start, start_line, start_col)
    }

    fn skip_digits(&mut self) {
        while matches!(self.peek(), Some(b'0'..=b'9' | b'_')) {
            self.advance();
        }
    }

    fn int_literal(
        &mut self,
        digits: &str,
        radix: u32,
        start: usize,
        start_line: u32,
        start_col: u32,
    ) -> TokenKind {
        let span = self.span_from(start_line, start_col);
        if digits.is_empty() {
            let text = self.text_from(start);
            self.emit_error(
                ErrorCode::INVALID_NUMBER,
                format!("integer literal '{text}' has no digits"),
                span,
            );
            return TokenKind::IntLit(0);
        }
        match u64::from_str_radix(digits, radix) {
            Ok(value) => TokenKind::IntLit(value),
            Err(err) => {
                let text = self.text_from(start);
                let reason = match err.kind() {
                    std::num::IntErrorKind::PosOverflow => "does not fit in 64 bits".to_string(),
                    _ => format!("is not a valid base-{radix} number"),
                };
                self.emit_error(
                    ErrorCode::INVALID_NUMBER,
                    format!("integer literal '{text}' {reason}"),
                    span,
                );
                TokenKind::IntLit(0)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, start: usize) -> TokenKind {
        while matches!(self.peek(), Some(ch) if ch.is_ascii_alphanumeric() || ch == b'_') {
            self.advance();
        }
        let text = self.text_from(start);
        TokenKind::from_keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()))
    }

    // ─────────────────────────────────────────────────────────────
    // String literals
    // ─────────────────────────────────────────────────────────────

    /// Scan a string literal starting after the opening `"`.
    fn scan_string(&mut self, start_line: u32, start_col: u32) -> TokenKind {
        let mut buf: Vec<u8> = Vec::new();

        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "unterminated string literal",
                        span,
                    );
                    break;
                }
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }

        TokenKind::StrLit(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Scan an escape sequence starting at the `\`.
    fn scan_escape_sequence(&mut self) -> Option<u8> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance(); // consume the '\'

        match self.peek() {
            None | Some(b'\n') => None,
            Some(ch) => {
                self.advance();
                match ch {
                    b'n' => Some(b'\n'),
                    b't' => Some(b'\t'),
                    b'r' => Some(b'\r'),
                    b'0' => Some(0),
                    b'\\' => Some(b'\\'),
                    b'"' => Some(b'"'),
                    other => {
                        let span = self.span_from(start_line, start_col);
                        self.emit_error(
                            ErrorCode::INVALID_ESCAPE,
                            format!("invalid escape sequence '\\{}'", other as char),
                            span,
                        );
                        Some(other)
                    }
                }
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.scan_token();
        if token.kind == TokenKind::Eof {
            self.finished = true;
        }
        Some(token)
    }
}

impl FusedIterator for Lexer<'_> {}
