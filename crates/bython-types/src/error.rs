use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of syntax errors the parser reports before giving up.
pub const MAX_ERRORS: usize = 50;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

/// The pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Lex,
    Parse,
    Tcheck,
    Codegen,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex => f.write_str("lex"),
            Self::Parse => f.write_str("parse"),
            Self::Tcheck => f.write_str("tcheck"),
            Self::Codegen => f.write_str("codegen"),
        }
    }
}

/// Diagnostic category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    LexicalError,
    SyntaxError,
    NameError,
    TypeError,
    ArityError,
    FatalInternalError,
    Lint,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LexicalError => "LexicalError",
            Self::SyntaxError => "SyntaxError",
            Self::NameError => "NameError",
            Self::TypeError => "TypeError",
            Self::ArityError => "ArityError",
            Self::FatalInternalError => "FatalInternalError",
            Self::Lint => "Lint",
        };
        f.write_str(name)
    }
}

/// Numeric diagnostic code.
///
/// Errors occupy E100–E999. Warnings are stored offset by 1000 and
/// rendered as `W100`–`W999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Lexical errors (E100–E199) ──
    pub const UNEXPECTED_CHARACTER: Self = Self(100);
    pub const UNTERMINATED_STRING: Self = Self(101);
    pub const INVALID_ESCAPE: Self = Self(102);
    pub const INVALID_NUMBER: Self = Self(103);

    // ── Syntax errors (E200–E299) ──
    pub const UNEXPECTED_TOKEN: Self = Self(200);
    pub const EXPECTED_EXPRESSION: Self = Self(201);
    pub const UNCLOSED_DELIMITER: Self = Self(202);
    pub const CHAINED_COMPARISON: Self = Self(203);
    pub const TOO_MANY_ERRORS: Self = Self(204);
    pub const NESTING_TOO_DEEP: Self = Self(205);

    // ── Name errors (E300–E399) ──
    pub const UNDEFINED_NAME: Self = Self(300);
    pub const DUPLICATE_DEFINITION: Self = Self(301);
    pub const MISSING_ENTRY: Self = Self(302);

    // ── Type errors (E400–E499) ──
    pub const TYPE_MISMATCH: Self = Self(400);
    pub const UNKNOWN_TYPE: Self = Self(401);
    pub const INVALID_OPERAND: Self = Self(402);
    pub const NOT_CALLABLE: Self = Self(403);
    pub const MISSING_RETURN: Self = Self(404);
    pub const INVALID_CAST: Self = Self(405);
    pub const FUNCTION_AS_VALUE: Self = Self(406);
    pub const ASSIGN_TO_FUNCTION: Self = Self(407);
    pub const INVALID_ENTRY: Self = Self(408);
    pub const VOID_VALUE: Self = Self(409);

    // ── Arity errors (E500–E599) ──
    pub const WRONG_ARG_COUNT: Self = Self(500);

    // ── Fatal internal errors (E900–E999) ──
    pub const INTERNAL: Self = Self(900);

    // ── Warnings (W100–W999) ──
    pub const UNUSED_VALUE: Self = Self(1100);

    /// Get the category for this code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::LexicalError,
            200..=299 => ErrorCategory::SyntaxError,
            300..=399 => ErrorCategory::NameError,
            400..=499 => ErrorCategory::TypeError,
            500..=599 => ErrorCategory::ArityError,
            1000.. => ErrorCategory::Lint,
            _ => ErrorCategory::FatalInternalError,
        }
    }

    /// Warnings never fail a stage.
    pub fn severity(self) -> Severity {
        if self.0 >= 1000 {
            Severity::Warning
        } else {
            Severity::Error
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity() {
            Severity::Error => write!(f, "E{}", self.0),
            Severity::Warning => write!(f, "W{}", self.0 - 1000),
        }
    }
}

/// A structured diagnostic produced by one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Source file name.
    pub file: String,
    pub code: ErrorCode,
    pub severity: Severity,
    /// Derived from `code`.
    pub category: ErrorCategory,
    pub stage: Stage,
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// The source line the span starts on, for context.
    pub source_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        stage: Stage,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            severity: code.severity(),
            category: code.category(),
            stage,
            message: message.into(),
            span,
            source_line: source_line.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Renders as `<file>:<line>:<col>: <severity>: <Category>[<code>]: <message>`.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}[{}]: {}",
            self.file, self.span, self.severity, self.category, self.code, self.message
        )
    }
}

impl std::error::Error for Diagnostic {}

/// Ordered diagnostics for one compilation. Insertion order is reporting order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub items: Vec<Diagnostic>,
    pub total_errors: usize,
    pub total_warnings: usize,
}

impl Diagnostics {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.total_errors += 1,
            Severity::Warning => self.total_warnings += 1,
        }
        self.items.push(diagnostic);
    }

    /// Move every diagnostic from `other` to the end of `self`.
    pub fn append(&mut self, other: &mut Diagnostics) {
        for diagnostic in other.items.drain(..) {
            self.push(diagnostic);
        }
        other.total_errors = 0;
        other.total_warnings = 0;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_error())
    }

    /// Number of diagnostics in `category`.
    pub fn count(&self, category: ErrorCategory) -> usize {
        self.items.iter().filter(|d| d.category == category).count()
    }

    /// Whether a stage gave up on a fault of its own.
    pub fn has_fatal(&self) -> bool {
        self.items
            .iter()
            .any(|d| d.category == ErrorCategory::FatalInternalError)
    }

    /// One line per diagnostic, newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for diagnostic in &self.items {
            out.push_str(&diagnostic.to_string());
            out.push('\n');
        }
        out
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
