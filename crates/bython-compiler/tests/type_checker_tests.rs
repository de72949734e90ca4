//! Type-checker integration tests.
//!
//! Each test parses and type-checks a Bython program via
//! `bython_compiler::type_check` and asserts on the diagnostics produced.

use bython_compiler::{check_source_with, parse_source, CheckOptions, TypeChecker};
use bython_types::ast::StmtKind;
use bython_types::{Diagnostics, ErrorCategory, ErrorCode, Severity, SourceFile, Span, Stage, Type};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn check(source: &str) -> Diagnostics {
    bython_compiler::type_check(source, "test.by")
}

fn check_with_lints(source: &str) -> Diagnostics {
    let source = SourceFile::new("test.by", source);
    let mut diagnostics = Diagnostics::empty();
    check_source_with(&source, CheckOptions { warn_unused: true }, &mut diagnostics);
    diagnostics
}

fn listing(diagnostics: &Diagnostics) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  [{}] {}", d.code, d.message))
        .collect::<Vec<_>>()
        .join("\n")
}

fn assert_ok(source: &str) {
    let diagnostics = check(source);
    assert!(
        !diagnostics.has_errors(),
        "expected no errors, got {}:\n{}",
        diagnostics.total_errors,
        listing(&diagnostics)
    );
}

fn assert_error(source: &str, expected_code: ErrorCode) {
    let diagnostics = check(source);
    assert!(
        diagnostics.has_errors(),
        "expected error {expected_code}, but got no errors"
    );
    assert!(
        diagnostics.iter().any(|d| d.code == expected_code),
        "expected error code {expected_code}, got:\n{}",
        listing(&diagnostics)
    );
}

fn assert_n_errors(source: &str, n: usize) {
    let diagnostics = check(source);
    assert_eq!(
        diagnostics.total_errors,
        n,
        "expected {n} errors, got {}:\n{}",
        diagnostics.total_errors,
        listing(&diagnostics)
    );
}

fn only_error(source: &str) -> bython_types::Diagnostic {
    let diagnostics = check(source);
    assert_eq!(diagnostics.total_errors, 1, "{}", listing(&diagnostics));
    let err = diagnostics.errors().next().cloned().unwrap();
    err
}

// ══════════════════════════════════════════════════════════════════════════════
// Success cases
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_minimal_program_passes() {
    assert_ok("def main() -> int { return 0; }");
}

#[test]
fn test_inline_function_and_call() {
    assert_ok("def f(x: int) -> int: return x + 1\ndef main() -> int: return f(2)\n");
}

#[test]
fn test_forward_reference() {
    assert_ok(
        r#"
def main() -> int { return later(1); }
def later(x: int) -> int { return x; }
"#,
    );
}

#[test]
fn test_all_scalar_types() {
    assert_ok(
        r#"
def main() {
  val a: i8 = -128;
  val b: u8 = 255;
  val c: i16 = 1000;
  val d: u32 = 7;
  val e: f32 = 1.5;
  val f: f64 = 2;
  val g: bool = true;
  val h: str = "text";
  val i: i64 = a;
  val j: u64 = b;
  val k: f64 = e;
  put_str(h);
}
"#,
    );
}

#[test]
fn test_literal_takes_type_from_sibling() {
    assert_ok("def main() -> int { val x: u8 = 3; val y: u8 = x + 4; return y as int; }");
    assert_ok("def main() -> int { val x: u8 = 3; val y: u8 = 4 + x; return y as int; }");
}

#[test]
fn test_while_true_counts_as_returning() {
    assert_ok("def main() -> int { while true { return 1; } }");
}

#[test]
fn test_if_else_all_branches_return() {
    assert_ok(
        r#"
def sign(x: int) -> int {
  if x < 0 { return -1; } elif x == 0 { return 0; } else { return 1; }
}
def main() -> int { return sign(5); }
"#,
    );
}

#[test]
fn test_shadowing_in_nested_block() {
    assert_ok(
        r#"
def main() {
  val x = 1;
  if true { val x = true; put_bool(x); }
  put_i64(x);
}
"#,
    );
}

#[test]
fn test_user_function_may_shadow_builtin() {
    assert_ok("def putln(x: int) { put_i64(x); }\ndef main() { putln(3); }");
}

// ══════════════════════════════════════════════════════════════════════════════
// Name errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_misspelled_identifier_reports_one_name_error() {
    let error = only_error("def main() -> int {\n  val count = 1;\n  return cuont + 1;\n}\n");
    assert_eq!(error.code, ErrorCode::UNDEFINED_NAME);
    assert_eq!(error.category, ErrorCategory::NameError);
    assert_eq!(error.span, Span::new(3, 10, 3, 14));
    assert_eq!(error.message, "undefined name 'cuont'");
    assert_eq!(error.stage, Stage::Tcheck);
    assert_eq!(error.source_line, "  return cuont + 1;");
}

#[test]
fn test_undefined_function() {
    assert_error("def main() { nope(1); }", ErrorCode::UNDEFINED_NAME);
}

#[test]
fn test_assign_to_undefined() {
    assert_error("def main() { y = 1; }", ErrorCode::UNDEFINED_NAME);
}

#[test]
fn test_duplicate_function() {
    assert_error(
        "def f() {}\ndef f() {}\ndef main() {}",
        ErrorCode::DUPLICATE_DEFINITION,
    );
}

#[test]
fn test_duplicate_val_in_same_scope() {
    assert_error(
        "def main() { val x = 1; val x = 2; }",
        ErrorCode::DUPLICATE_DEFINITION,
    );
}

#[test]
fn test_val_may_not_redefine_parameter() {
    assert_error(
        "def f(x: int) { val x = 2; }\ndef main() {}",
        ErrorCode::DUPLICATE_DEFINITION,
    );
}

#[test]
fn test_variable_out_of_scope_after_block() {
    assert_error(
        "def main() -> int { if true { val y = 1; } return y; }",
        ErrorCode::UNDEFINED_NAME,
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Type errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_int_assigned_to_bool() {
    let error = only_error("def main() { val b: bool = 1; }");
    assert_eq!(error.category, ErrorCategory::TypeError);
    assert!(error.message.contains("bool"), "{}", error.message);
    assert!(error.message.contains("i64"), "{}", error.message);
}

#[test]
fn test_narrowing_is_rejected() {
    assert_error(
        "def main() { val x: i64 = 5; val y: i32 = x; }",
        ErrorCode::TYPE_MISMATCH,
    );
}

#[test]
fn test_signedness_change_is_rejected() {
    assert_error(
        "def main() { val x: u8 = 5; val y: i64 = x; }",
        ErrorCode::TYPE_MISMATCH,
    );
}

#[test]
fn test_literal_out_of_range() {
    let error = only_error("def main() { val x: u8 = 256; }");
    assert_eq!(error.message, "integer literal 256 does not fit in u8");
}

#[test]
fn test_negative_literal_range() {
    assert_ok("def main() { val x: i8 = -128; }");
    assert_error("def main() { val x: i8 = -129; }", ErrorCode::TYPE_MISMATCH);
    assert_error("def main() { val x: u8 = -1; }", ErrorCode::TYPE_MISMATCH);
}

#[test]
fn test_condition_must_be_bool() {
    let error = only_error("def main() { if 1 { } }");
    assert_eq!(error.message, "condition must be bool, found i64");
}

#[test]
fn test_return_type_mismatch() {
    assert_error("def main() -> int { return true; }", ErrorCode::TYPE_MISMATCH);
    assert_error("def f() { return 1; }\ndef main() {}", ErrorCode::TYPE_MISMATCH);
    assert_error("def main() -> int { return; }", ErrorCode::TYPE_MISMATCH);
}

#[test]
fn test_missing_return() {
    let error = only_error("def f(x: int) -> int { if x > 0 { return 1; } }\ndef main() {}");
    assert_eq!(error.code, ErrorCode::MISSING_RETURN);
    assert!(error.message.contains("'f'"));
}

#[test]
fn test_unknown_type() {
    let diagnostics = check("def main() { val x: integer = 1; }");
    let error = diagnostics.errors().next().unwrap();
    assert_eq!(error.code, ErrorCode::UNKNOWN_TYPE);
    assert!(error.suggestion.as_deref().unwrap().contains("i64"));
    assert_eq!(diagnostics.total_errors, 1, "{}", listing(&diagnostics));
}

#[test]
fn test_invalid_operands() {
    assert_error("def main() { discard 1 + true; }", ErrorCode::INVALID_OPERAND);
    assert_error("def main() { discard 1.5 % 2.0; }", ErrorCode::INVALID_OPERAND);
    assert_error("def main() { discard !3; }", ErrorCode::INVALID_OPERAND);
    assert_error("def main() { discard ~1.0; }", ErrorCode::INVALID_OPERAND);
    assert_error("def main() { discard 1 && true; }", ErrorCode::INVALID_OPERAND);
    assert_error("def main() { discard \"a\" == \"a\"; }", ErrorCode::INVALID_OPERAND);
}

#[test]
fn test_mixed_sign_arithmetic() {
    assert_ok("def main() -> int { val a: i16 = 1; val b: u8 = 2; val c: i16 = a + b; return c; }");
    assert_error(
        "def main() { val a: i8 = 1; val b: u8 = 2; val c: i16 = a + b; }",
        ErrorCode::TYPE_MISMATCH,
    );
}

#[test]
fn test_casts() {
    assert_ok("def main() -> int { val f: f64 = 2.5; return f as int; }");
    assert_ok("def main() -> bool { return 3 as bool; }");
    assert_error("def main() -> bool { return 3.0 as bool; }", ErrorCode::INVALID_CAST);
    assert_error("def main() -> int { return \"s\" as int; }", ErrorCode::INVALID_CAST);
}

#[test]
fn test_not_callable() {
    assert_error("def main() { val x = 1; x(); }", ErrorCode::NOT_CALLABLE);
}

#[test]
fn test_function_as_value() {
    let diagnostics = check("def f() {}\ndef main() { val g = f; }");
    let error = diagnostics.errors().next().unwrap();
    assert_eq!(error.code, ErrorCode::FUNCTION_AS_VALUE);
    assert_eq!(error.suggestion.as_deref(), Some("call it: f(...)"));
}

#[test]
fn test_assign_to_function() {
    assert_error("def f() {}\ndef main() { f = 1; }", ErrorCode::ASSIGN_TO_FUNCTION);
}

#[test]
fn test_void_value_binding() {
    assert_error("def main() { val x = putln(); }", ErrorCode::VOID_VALUE);
}

#[test]
fn test_void_annotation_on_binding() {
    let error = only_error("def main() { val v: void = putln(); }");
    assert_eq!(error.code, ErrorCode::VOID_VALUE);
    assert_eq!(error.message, "binding 'v' cannot have type void");
    assert_eq!(error.span.start_col, 21);
}

#[test]
fn test_void_parameter_type() {
    let error = only_error("def f(x: void) {}\ndef main() { f(putln()); }");
    assert_eq!(error.code, ErrorCode::VOID_VALUE);
    assert_eq!(error.message, "parameter 'x' cannot have type void");
    assert_eq!(error.span.start_line, 1);
}

#[test]
fn test_void_slot_does_not_cascade() {
    assert_n_errors("def f(x: void) -> int { return x + 1; }\ndef main() {}", 1);
    assert_n_errors("def main() { val v: void = putln(); val w: int = v; }", 1);
}

#[test]
fn test_entry_signature() {
    assert_error("def main(x: int) {}", ErrorCode::INVALID_ENTRY);
    assert_error("def main() -> f64 { return 1.0; }", ErrorCode::INVALID_ENTRY);
    assert_ok("def main() -> bool { return true; }");
    assert_ok("def main() -> u8 { return 1; }");
}

// ══════════════════════════════════════════════════════════════════════════════
// Arity errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_wrong_argument_count() {
    let error = only_error("def f(a: int, b: int) -> int { return a + b; }\ndef main() -> int { return f(1); }");
    assert_eq!(error.category, ErrorCategory::ArityError);
    assert_eq!(error.message, "function 'f' takes 2 arguments but 1 were given");
}

#[test]
fn test_argument_type_mismatch() {
    let error = only_error("def main() { put_i64(true); }");
    assert_eq!(error.message, "argument 1 of 'put_i64': expected i64, found bool");
}

// ══════════════════════════════════════════════════════════════════════════════
// Recovery
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_multiple_independent_errors_in_one_body() {
    assert_n_errors(
        r#"
def main() {
  val a: bool = 1;
  val b = missing;
  put_i64(1, 2);
}
"#,
        3,
    );
}

#[test]
fn test_unknown_suppresses_cascades() {
    // `x` is unknown after the first error; using it reports nothing more.
    assert_n_errors(
        "def main() -> int { val x = nope; val y: bool = x; return x + 1; }",
        1,
    );
}

#[test]
fn test_errors_across_functions() {
    let diagnostics = check(
        "def a() -> int { return true; }\ndef b() { val z: u8 = 300; }\ndef main() {}",
    );
    let lines: Vec<u32> = diagnostics.errors().map(|d| d.span.start_line).collect();
    assert_eq!(lines, vec![1, 2]);
}

#[test]
fn test_parse_errors_skip_type_check() {
    let diagnostics = check("def main() { val x: bool = 1 }\n");
    assert!(diagnostics.iter().all(|d| d.stage == Stage::Parse));
}

// ══════════════════════════════════════════════════════════════════════════════
// Warnings
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_unused_value_is_silent_by_default() {
    let diagnostics = check("def main() { 1 + 2; }");
    assert!(diagnostics.is_empty(), "{}", listing(&diagnostics));
}

#[test]
fn test_unused_value_warning() {
    let diagnostics = check_with_lints("def main() { 1 + 2; }");
    assert!(!diagnostics.has_errors());
    assert_eq!(diagnostics.total_warnings, 1);
    let warning = diagnostics.iter().next().unwrap();
    assert_eq!(warning.code, ErrorCode::UNUSED_VALUE);
    assert_eq!(warning.severity, Severity::Warning);
    assert_eq!(
        warning.to_string(),
        "test.by:1:14: warning: Lint[W100]: unused value of type i64"
    );
}

#[test]
fn test_discard_silences_unused_value() {
    let diagnostics = check_with_lints("def main() { discard 1 + 2; }");
    assert!(diagnostics.is_empty());
}

// ══════════════════════════════════════════════════════════════════════════════
// Internal faults
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_double_annotation_is_fatal_and_stops_checking() {
    let sf = SourceFile::new("test.by", "def main() { val a = 1; val b = missing; }\ndef g() -> bool { return 1; }");
    let mut diagnostics = Diagnostics::empty();
    let mut module = parse_source(&sf, &mut diagnostics).unwrap();
    assert!(diagnostics.is_empty());

    match &mut module.items[0].body.stmts[0].kind {
        StmtKind::Val { binding_type, .. } => *binding_type = Some(Type::I64),
        other => panic!("expected val, got {other:?}"),
    }
    TypeChecker::new(&sf, &mut diagnostics).check(&mut module);

    let codes: Vec<_> = diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::INTERNAL], "{}", listing(&diagnostics));
    assert!(diagnostics.has_fatal());
    assert_eq!(diagnostics.items[0].category, ErrorCategory::FatalInternalError);
    assert_eq!(diagnostics.items[0].stage, Stage::Tcheck);
}

// ══════════════════════════════════════════════════════════════════════════════
// Determinism
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_determinism_100_iterations() {
    let source = "def f() -> int { return x; }\ndef main() { val b: bool = 1; f(1); }";
    let reference = check(source).render();
    assert!(!reference.is_empty());
    for i in 0..100 {
        assert_eq!(check(source).render(), reference, "iteration {i}");
    }
}
