//! Token types for the Bython lexer.
//!
//! Defines [`TokenKind`] covering every lexeme in Bython and [`Token`],
//! which pairs a kind with its source text and [`Span`].

use bython_types::Span;
use std::fmt;

/// All reserved words in Bython.
///
/// These cannot be used as identifiers. Type names such as `i64` are not
/// reserved; they are resolved by the type checker.
pub const ALL_KEYWORDS: &[&str] = &[
    "def", "val", "if", "elif", "else", "while", "return", "discard", "as", "true", "false",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the Bython lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source text of the token (empty for `Eof`).
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    pub fn is_keyword(&self) -> bool {
        self.kind.is_keyword()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

/// Every token kind in the Bython language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────

    /// Integer literal in any radix: `42`, `0x2A`, `0b101010`
    IntLit(u64),
    /// Float literal: `3.14`, `1e9`
    FloatLit(f64),
    /// String literal with escapes already resolved: `"hi\n"`
    StrLit(String),
    /// `true`
    True,
    /// `false`
    False,

    // ── Identifiers ──────────────────────────────────────────

    /// User-defined name or type name: `count`, `i64`
    Identifier(String),

    // ── Keywords ─────────────────────────────────────────────

    /// `def`
    Def,
    /// `val`
    Val,
    /// `if`
    If,
    /// `elif`
    Elif,
    /// `else`
    Else,
    /// `while`
    While,
    /// `return`
    Return,
    /// `discard`
    Discard,
    /// `as`
    As,

    // ── Operators ────────────────────────────────────────────

    Plus,
    Minus,
    Star,
    /// `**`
    StarStar,
    Slash,
    Percent,
    Amp,
    /// `&&`
    AmpAmp,
    Pipe,
    /// `||`
    PipePipe,
    Caret,
    Tilde,
    Bang,
    /// `!=`
    BangEq,
    /// `=`
    Eq,
    /// `==`
    EqEq,
    Less,
    LessEq,
    /// `<<`
    LessLess,
    Greater,
    GreaterEq,
    /// `>>`
    GreaterGreater,
    /// `->`
    Arrow,

    // ── Punctuation ──────────────────────────────────────────

    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,

    // ── Special ──────────────────────────────────────────────

    /// End of input. Always the last token of a pass.
    Eof,
}

impl TokenKind {
    /// Map a reserved word to its token kind.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "def" => TokenKind::Def,
            "val" => TokenKind::Val,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "return" => TokenKind::Return,
            "discard" => TokenKind::Discard,
            "as" => TokenKind::As,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Def
                | TokenKind::Val
                | TokenKind::If
                | TokenKind::Elif
                | TokenKind::Else
                | TokenKind::While
                | TokenKind::Return
                | TokenKind::Discard
                | TokenKind::As
                | TokenKind::True
                | TokenKind::False
        )
    }

    /// Keywords that can only begin a statement. Used for parser recovery.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::Val
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Return
                | TokenKind::Discard
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Literals
            TokenKind::IntLit(n) => write!(f, "{n}"),
            TokenKind::FloatLit(n) => write!(f, "{n:?}"),
            TokenKind::StrLit(s) => write!(f, "{s:?}"),
            TokenKind::True => f.write_str("true"),
            TokenKind::False => f.write_str("false"),
            TokenKind::Identifier(s) => f.write_str(s),
            // Keywords
            TokenKind::Def => f.write_str("def"),
            TokenKind::Val => f.write_str("val"),
            TokenKind::If => f.write_str("if"),
            TokenKind::Elif => f.write_str("elif"),
            TokenKind::Else => f.write_str("else"),
            TokenKind::While => f.write_str("while"),
            TokenKind::Return => f.write_str("return"),
            TokenKind::Discard => f.write_str("discard"),
            TokenKind::As => f.write_str("as"),
            // Operators
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::StarStar => f.write_str("**"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::Amp => f.write_str("&"),
            TokenKind::AmpAmp => f.write_str("&&"),
            TokenKind::Pipe => f.write_str("|"),
            TokenKind::PipePipe => f.write_str("||"),
            TokenKind::Caret => f.write_str("^"),
            TokenKind::Tilde => f.write_str("~"),
            TokenKind::Bang => f.write_str("!"),
            TokenKind::BangEq => f.write_str("!="),
            TokenKind::Eq => f.write_str("="),
            TokenKind::EqEq => f.write_str("=="),
            TokenKind::Less => f.write_str("<"),
            TokenKind::LessEq => f.write_str("<="),
            TokenKind::LessLess => f.write_str("<<"),
            TokenKind::Greater => f.write_str(">"),
            TokenKind::GreaterEq => f.write_str(">="),
            TokenKind::GreaterGreater => f.write_str(">>"),
            TokenKind::Arrow => f.write_str("->"),
            // Punctuation
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBrace => f.write_str("{"),
            TokenKind::RBrace => f.write_str("}"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Colon => f.write_str(":"),
            TokenKind::Semicolon => f.write_str(";"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
