//! Lexer tests: keywords, operators, literals in every radix, comments and
//! continuations, position tracking, error recovery, laziness and restart.

use bython_lexer::{Lexer, Token, TokenKind};
use bython_types::{ErrorCategory, ErrorCode, SourceFile, Span, Stage, MAX_ERRORS};
use pretty_assertions::assert_eq;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Lex source text and return just the token kinds (excluding final Eof).
fn kinds(source: &str) -> Vec<TokenKind> {
    let sf = SourceFile::new("test.by", source);
    Lexer::new(&sf)
        .tokenize()
        .tokens
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| t.kind)
        .collect()
}

fn tokens(source: &str) -> Vec<Token> {
    let sf = SourceFile::new("test.by", source);
    Lexer::new(&sf).tokenize().tokens
}

fn error_codes(source: &str) -> Vec<ErrorCode> {
    let sf = SourceFile::new("test.by", source);
    Lexer::new(&sf)
        .tokenize()
        .diagnostics
        .iter()
        .map(|d| d.code)
        .collect()
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Identifier(name.to_string())
}

// ─────────────────────────────────────────────────────────────────────
// Keywords & identifiers
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_keywords() {
    assert_eq!(
        kinds("def val if elif else while return discard as true false"),
        vec![
            TokenKind::Def,
            TokenKind::Val,
            TokenKind::If,
            TokenKind::Elif,
            TokenKind::Else,
            TokenKind::While,
            TokenKind::Return,
            TokenKind::Discard,
            TokenKind::As,
            TokenKind::True,
            TokenKind::False,
        ]
    );
}

#[test]
fn test_identifiers_and_type_names() {
    assert_eq!(
        kinds("x _tmp i64 value2 define"),
        vec![ident("x"), ident("_tmp"), ident("i64"), ident("value2"), ident("define")]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Operators & punctuation
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_single_char_operators() {
    assert_eq!(
        kinds("+ - * / % & | ^ ~ ! = < >"),
        vec![
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Percent,
            TokenKind::Amp,
            TokenKind::Pipe,
            TokenKind::Caret,
            TokenKind::Tilde,
            TokenKind::Bang,
            TokenKind::Eq,
            TokenKind::Less,
            TokenKind::Greater,
        ]
    );
}

#[test]
fn test_two_char_operators() {
    assert_eq!(
        kinds("** && || != == <= >= << >> ->"),
        vec![
            TokenKind::StarStar,
            TokenKind::AmpAmp,
            TokenKind::PipePipe,
            TokenKind::BangEq,
            TokenKind::EqEq,
            TokenKind::LessEq,
            TokenKind::GreaterEq,
            TokenKind::LessLess,
            TokenKind::GreaterGreater,
            TokenKind::Arrow,
        ]
    );
}

#[test]
fn test_operators_without_spaces() {
    assert_eq!(
        kinds("a**-b"),
        vec![ident("a"), TokenKind::StarStar, TokenKind::Minus, ident("b")]
    );
}

#[test]
fn test_punctuation() {
    assert_eq!(
        kinds("( ) { } , : ;"),
        vec![
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::Comma,
            TokenKind::Colon,
            TokenKind::Semicolon,
        ]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Literals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_integer_radixes() {
    assert_eq!(
        kinds("42 0d42 0x2A 0o52 0b101010 1_000"),
        vec![
            TokenKind::IntLit(42),
            TokenKind::IntLit(42),
            TokenKind::IntLit(42),
            TokenKind::IntLit(42),
            TokenKind::IntLit(42),
            TokenKind::IntLit(1000),
        ]
    );
}

#[test]
fn test_max_u64_literal() {
    assert_eq!(
        kinds("18446744073709551615"),
        vec![TokenKind::IntLit(u64::MAX)]
    );
}

#[test]
fn test_float_literals() {
    assert_eq!(
        kinds("3.25 1e3 2.5e-1 7E+2"),
        vec![
            TokenKind::FloatLit(3.25),
            TokenKind::FloatLit(1000.0),
            TokenKind::FloatLit(0.25),
            TokenKind::FloatLit(700.0),
        ]
    );
}

#[test]
fn test_dot_without_digit_is_not_float() {
    // `1.` is an integer followed by a stray `.`
    let sf = SourceFile::new("test.by", "1.");
    let result = Lexer::new(&sf).tokenize();
    assert_eq!(result.tokens[0].kind, TokenKind::IntLit(1));
    assert_eq!(result.diagnostics.total_errors, 1);
}

#[test]
fn test_string_literal_escapes() {
    assert_eq!(
        kinds(r#""a\tb\n\"q\"\\""#),
        vec![TokenKind::StrLit("a\tb\n\"q\"\\".to_string())]
    );
}

#[test]
fn test_lexeme_is_source_text() {
    let toks = tokens("0x1F \"hi\" >=");
    assert_eq!(toks[0].lexeme, "0x1F");
    assert_eq!(toks[1].lexeme, "\"hi\"");
    assert_eq!(toks[2].lexeme, ">=");
    assert_eq!(toks[3].lexeme, "");
}

// ─────────────────────────────────────────────────────────────────────
// Trivia & positions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_comments_are_skipped() {
    assert_eq!(
        kinds("val x = 1; # trailing comment\n# full line\nx"),
        vec![
            TokenKind::Val,
            ident("x"),
            TokenKind::Eq,
            TokenKind::IntLit(1),
            TokenKind::Semicolon,
            ident("x"),
        ]
    );
}

#[test]
fn test_line_continuation() {
    assert_eq!(
        kinds("1 + \\\n 2"),
        vec![TokenKind::IntLit(1), TokenKind::Plus, TokenKind::IntLit(2)]
    );
}

#[test]
fn test_spans_after_comments_and_newlines() {
    let toks = tokens("# header\n  def main() {\n\treturn;\n}");
    assert_eq!(toks[0].span, Span::new(2, 3, 2, 5));
    assert_eq!(toks[1].span, Span::new(2, 7, 2, 10));
    let ret = toks.iter().find(|t| t.kind == TokenKind::Return).unwrap();
    assert_eq!(ret.span, Span::new(3, 2, 3, 7));
}

#[test]
fn test_columns_count_characters_not_bytes() {
    let toks = tokens("\"héllo\" x");
    assert_eq!(toks[1].span, Span::point(1, 9));
}

#[test]
fn test_eof_is_last_and_only_once() {
    let toks = tokens("a b");
    assert_eq!(toks.len(), 3);
    assert_eq!(toks[2].kind, TokenKind::Eof);
    assert_eq!(tokens("").len(), 1);
}

// ─────────────────────────────────────────────────────────────────────
// Error recovery
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_unexpected_characters_are_all_reported() {
    let sf = SourceFile::new("test.by", "val a = 1 @ 2 $ 3;");
    let result = Lexer::new(&sf).tokenize();
    assert_eq!(result.diagnostics.total_errors, 2);
    let first = &result.diagnostics.items[0];
    assert_eq!(first.category, ErrorCategory::LexicalError);
    assert_eq!(first.stage, Stage::Lex);
    assert_eq!(first.span, Span::new(1, 11, 1, 11));
    assert_eq!(first.message, "unexpected character '@'");
    // Scanning continued past both bad characters.
    assert!(result
        .tokens
        .iter()
        .any(|t| t.kind == TokenKind::IntLit(3)));
}

#[test]
fn test_error_cap_stops_scanning() {
    let source = "@".repeat(MAX_ERRORS * 4);
    let sf = SourceFile::new("test.by", source);
    let result = Lexer::new(&sf).tokenize();
    assert_eq!(result.diagnostics.total_errors, MAX_ERRORS);
    assert_eq!(result.tokens.len(), 1);
    assert_eq!(result.tokens[0].kind, TokenKind::Eof);
}

#[test]
fn test_error_cap_survives_take_diagnostics() {
    let source = "@ ".repeat(MAX_ERRORS + 5) + "val";
    let sf = SourceFile::new("test.by", source);
    let mut lexer = Lexer::new(&sf);
    let mut taken = 0;
    let mut kinds = Vec::new();
    while let Some(token) = lexer.next() {
        taken += lexer.take_diagnostics().total_errors;
        kinds.push(token.kind);
    }
    assert_eq!(taken, MAX_ERRORS);
    assert_eq!(kinds, vec![TokenKind::Eof]);
}

#[test]
fn test_unterminated_string() {
    assert_eq!(
        error_codes("\"abc\nval"),
        vec![ErrorCode::UNTERMINATED_STRING]
    );
    assert_eq!(kinds("\"abc\nval")[1], TokenKind::Val);
}

#[test]
fn test_invalid_escape() {
    assert_eq!(error_codes(r#""\q""#), vec![ErrorCode::INVALID_ESCAPE]);
}

#[test]
fn test_invalid_numbers() {
    assert_eq!(error_codes("0x"), vec![ErrorCode::INVALID_NUMBER]);
    assert_eq!(error_codes("0b102"), vec![ErrorCode::INVALID_NUMBER]);
    assert_eq!(
        error_codes("18446744073709551616"),
        vec![ErrorCode::INVALID_NUMBER]
    );
}

#[test]
fn test_unicode_garbage_is_one_error() {
    assert_eq!(error_codes("a → b"), vec![ErrorCode::UNEXPECTED_CHARACTER]);
    assert_eq!(kinds("a → b"), vec![ident("a"), ident("b")]);
}

// ─────────────────────────────────────────────────────────────────────
// Laziness & restart
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_lexer_is_lazy() {
    let sf = SourceFile::new("test.by", "a @ b @ c");
    let mut lexer = Lexer::new(&sf);
    assert_eq!(lexer.next().map(|t| t.kind), Some(ident("a")));
    // Only the first bad character has been reached so far.
    assert_eq!(lexer.next().map(|t| t.kind), Some(ident("b")));
    assert_eq!(lexer.diagnostics().total_errors, 1);
}

#[test]
fn test_lexer_is_fused_after_eof() {
    let sf = SourceFile::new("test.by", "x");
    let mut lexer = Lexer::new(&sf);
    assert!(lexer.next().is_some());
    assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Eof));
    assert!(lexer.next().is_none());
    assert!(lexer.next().is_none());
}

#[test]
fn test_reset_rescans_from_start() {
    let sf = SourceFile::new("test.by", "def f @ ()");
    let mut lexer = Lexer::new(&sf);
    let first: Vec<Token> = lexer.by_ref().collect();
    assert_eq!(lexer.diagnostics().total_errors, 1);

    lexer.reset();
    assert!(lexer.diagnostics().is_empty());
    let second: Vec<Token> = lexer.by_ref().collect();
    assert_eq!(first, second);
    assert_eq!(lexer.take_diagnostics().total_errors, 1);
}

#[test]
fn test_lexer_determinism_100_iterations() {
    let source = "def f(x: int) -> int {\n  return x ** 2 + 0xff; # c\n}\n";
    let first = tokens(source);
    for i in 0..100 {
        assert_eq!(first, tokens(source), "Determinism failure at iteration {i}");
    }
}
