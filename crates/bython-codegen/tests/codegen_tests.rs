//! Code generation tests.
//!
//! Each test runs a Bython program through the full pipeline, JIT-compiles
//! it and executes `main` with output captured.

use bython_codegen::{Execution, JitEngine, JitOptions, OptLevel};
use bython_compiler::{compile, CompileOptions};
use bython_types::SourceFile;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn build_with(source: &str, jit: JitOptions) -> JitEngine {
    let sf = SourceFile::new("test.by", source);
    let options = CompileOptions {
        jit,
        ..CompileOptions::default()
    };
    let outcome = compile(&sf, &options).expect("codegen failed");
    assert!(
        !outcome.diagnostics.has_errors(),
        "unexpected diagnostics:\n{}",
        outcome.diagnostics.render()
    );
    outcome.engine.expect("no engine after successful compile")
}

fn build(source: &str) -> JitEngine {
    build_with(
        source,
        JitOptions {
            verify: true,
            capture_output: true,
            ..JitOptions::default()
        },
    )
}

fn run(source: &str) -> Execution {
    build(source).run().expect("run failed")
}

fn exit_code(source: &str) -> i64 {
    run(source).exit_code
}

fn output(source: &str) -> String {
    run(source).output.unwrap_or_default()
}

// ══════════════════════════════════════════════════════════════════════════════
// Entry Point
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_call_result_is_exit_code() {
    let source = "def f(x: int) -> int: return x + 1\ndef main() -> int: return f(2)\n";
    assert_eq!(exit_code(source), 3);
}

#[test]
fn test_void_main_exits_zero() {
    assert_eq!(exit_code("def main() { put_i64(9); }"), 0);
}

#[test]
fn test_bool_main_exits_with_zero_or_one() {
    assert_eq!(exit_code("def main() -> bool { return 2 > 1; }"), 1);
    assert_eq!(exit_code("def main() -> bool { return 2 < 1; }"), 0);
}

#[test]
fn test_narrow_main_result_is_extended() {
    assert_eq!(exit_code("def main() -> i8 { return -5; }"), -5);
    assert_eq!(exit_code("def main() -> u8 { return 250; }"), 250);
}

#[test]
fn test_forward_call_and_recursion() {
    let source = r#"
def main() -> int { return fib(10); }
def fib(n: int) -> int {
  if n < 2 { return n; }
  return fib(n - 1) + fib(n - 2);
}
"#;
    assert_eq!(exit_code(source), 55);
}

// ══════════════════════════════════════════════════════════════════════════════
// Arithmetic
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_precedence() {
    assert_eq!(exit_code("def main() -> int { return 1 + 2 * 3; }"), 7);
    assert_eq!(exit_code("def main() -> int { return (1 + 2) * 3; }"), 9);
    assert_eq!(exit_code("def main() -> int { return 2 ** 3 ** 2; }"), 512);
    assert_eq!(exit_code("def main() -> int { return -2 ** 2; }"), -4);
}

#[test]
fn test_signed_division_truncates() {
    assert_eq!(exit_code("def main() -> int { return -7 / 2; }"), -3);
    assert_eq!(exit_code("def main() -> int { return -7 % 2; }"), -1);
}

#[test]
fn test_min_divided_by_minus_one_wraps() {
    let source = r#"
def main() -> bool {
  val m: i64 = -9223372036854775808;
  val d: i64 = -1;
  return m / d == m && m % d == 0;
}
"#;
    assert_eq!(exit_code(source), 1);
}

#[test]
fn test_unsigned_arithmetic_wraps() {
    let source = r#"
def main() -> int {
  val a: u8 = 200;
  val b: u8 = a + 100;
  return b as int;
}
"#;
    assert_eq!(exit_code(source), 44);
}

#[test]
fn test_unsigned_comparison() {
    let source = "def main() -> bool { val a: u8 = 200; val b: u8 = 100; return a > b; }";
    assert_eq!(exit_code(source), 1);
}

#[test]
fn test_integer_power() {
    assert_eq!(exit_code("def main() -> int { return 2 ** 10; }"), 1024);
    assert_eq!(exit_code("def main() -> int { return 2 ** -1; }"), 0);
    assert_eq!(exit_code("def main() -> int { return -1 ** 3; }"), -1);
}

#[test]
fn test_shifts() {
    assert_eq!(exit_code("def main() -> int { return 1 << 65; }"), 2);
    assert_eq!(exit_code("def main() -> int { return -16 >> 2; }"), -4);
    assert_eq!(
        exit_code("def main() -> int { val x: u8 = 255; return (x >> 4) as int; }"),
        15
    );
}

#[test]
fn test_bitwise() {
    assert_eq!(exit_code("def main() -> int { return 12 & 10 | 1; }"), 9);
    assert_eq!(exit_code("def main() -> int { return 12 ^ 10; }"), 6);
    assert_eq!(exit_code("def main() -> int { return ~0; }"), -1);
}

#[test]
fn test_mixed_int_float() {
    assert_eq!(output("def main() { val x: f64 = 3; put_f64(x / 2); }"), "1.5");
    assert_eq!(output("def main() { put_f64(1.5 ** 2.0); }"), "2.25");
    assert_eq!(output("def main() { val h: f32 = 0.5; put_f32(h * 3); }"), "1.5");
}

// ══════════════════════════════════════════════════════════════════════════════
// Casts
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_integer_casts_truncate_and_extend() {
    assert_eq!(exit_code("def main() -> int { return (300 as u8) as int; }"), 44);
    assert_eq!(
        exit_code("def main() -> int { val x: i64 = -1; return (x as u8) as int; }"),
        255
    );
    assert_eq!(
        exit_code("def main() -> int { val x: i8 = -1; return x as int; }"),
        -1
    );
}

#[test]
fn test_float_to_int_saturates() {
    assert_eq!(
        exit_code("def main() -> int { val f: f64 = 1000.5; return (f as i8) as int; }"),
        127
    );
    assert_eq!(
        exit_code("def main() -> int { val f: f64 = -3.0; return (f as u16) as int; }"),
        0
    );
    assert_eq!(exit_code("def main() -> int { return 2.7 as int; }"), 2);
}

#[test]
fn test_bool_casts() {
    assert_eq!(exit_code("def main() -> int { return true as int + 1; }"), 2);
    assert_eq!(exit_code("def main() -> bool { return 5 as bool; }"), 1);
    assert_eq!(exit_code("def main() -> bool { return 0 as bool; }"), 0);
}

// ══════════════════════════════════════════════════════════════════════════════
// Control Flow
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_while_loop() {
    let source = r#"
def main() -> int {
  val i = 0;
  val sum = 0;
  while i < 10 {
    i = i + 1;
    sum = sum + i;
  }
  return sum;
}
"#;
    assert_eq!(exit_code(source), 55);
}

#[test]
fn test_return_from_infinite_loop() {
    let source = r#"
def main() -> int {
  val i = 0;
  while true {
    i = i + 1;
    if i == 5 { return i; }
  }
}
"#;
    assert_eq!(exit_code(source), 5);
}

#[test]
fn test_if_elif_else() {
    let source = r#"
def classify(n: int) -> int {
  if n < 0 {
    return 1;
  } elif n == 0 {
    return 2;
  } else {
    return 3;
  }
}
def main() {
  put_i64(classify(-4));
  put_i64(classify(0));
  put_i64(classify(8));
}
"#;
    assert_eq!(output(source), "123");
}

#[test]
fn test_if_without_else_falls_through() {
    let source = r#"
def main() -> int {
  val x = 1;
  if x > 5 { x = 10; }
  if x < 5 { x = x + 1; }
  return x;
}
"#;
    assert_eq!(exit_code(source), 2);
}

#[test]
fn test_short_circuit_skips_rhs() {
    let source = r#"
def side(tag: int) -> bool {
  put_i64(tag);
  return true;
}
def main() {
  discard false && side(1);
  discard true || side(2);
  discard true && side(3);
  discard false || side(4);
}
"#;
    assert_eq!(output(source), "34");
}

#[test]
fn test_evaluation_order_is_left_to_right() {
    let source = r#"
def tick(n: int) -> int {
  put_i64(n);
  return n;
}
def add(a: int, b: int) -> int { return a + b; }
def main() -> int {
  return add(tick(1), tick(2)) + tick(3);
}
"#;
    let execution = run(source);
    assert_eq!(execution.exit_code, 6);
    assert_eq!(execution.output.as_deref(), Some("123"));
}

#[test]
fn test_block_shadowing() {
    let source = r#"
def main() {
  val x = 1;
  if true {
    val x = 2;
    put_i64(x);
  }
  put_i64(x);
}
"#;
    assert_eq!(output(source), "21");
}

// ══════════════════════════════════════════════════════════════════════════════
// Builtins & Output
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_builtin_output() {
    let source = r#"
def main() {
  put_str("hi");
  putln();
  putln_i64(42);
  put_bool(1 == 1);
  put_u64(18446744073709551615);
}
"#;
    assert_eq!(output(source), "hi\n42\ntrue18446744073709551615");
}

#[test]
fn test_string_literals_are_interned() {
    let source = r#"def main() { put_str("a"); put_str("b"); put_str("a"); }"#;
    assert_eq!(output(source), "aba");
}

#[test]
fn test_user_function_shadows_builtin() {
    let source = r#"
def putln() { put_str("custom"); }
def main() { putln(); }
"#;
    assert_eq!(output(source), "custom");
}

#[test]
fn test_void_slots_never_reach_lowering() {
    for source in [
        "def main() { val v: void = putln(); putln_i64(1); }",
        "def f(x: void) {}\ndef main() { f(putln()); }",
    ] {
        let sf = SourceFile::new("test.by", source);
        let outcome = compile(&sf, &CompileOptions::default()).expect("codegen failed");
        assert!(outcome.engine.is_none(), "{source}");
        assert_eq!(outcome.diagnostics.total_errors, 1, "{}", outcome.diagnostics.render());
        assert_eq!(
            outcome.diagnostics.items[0].code,
            bython_types::ErrorCode::VOID_VALUE
        );
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// IR & Options
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_ir_lists_every_function() {
    let engine = build("def f(x: int) -> int: return x + 1\ndef main() -> int: return f(2)\n");
    let ir = engine.ir();
    assert!(ir.contains("; fn f"), "{ir}");
    assert!(ir.contains("; fn main"), "{ir}");
    assert!(ir.contains("; fn __bython_entry"), "{ir}");
    assert!(ir.contains("iadd"), "{ir}");
    let f = ir.find("; fn f").unwrap();
    let main = ir.find("; fn main").unwrap();
    assert!(f < main);
}

#[test]
fn test_speed_opt_level_gives_same_result() {
    let engine = build_with(
        "def main() -> int { val s = 0; val i = 0; while i < 100 { s = s + i; i = i + 1; } return s; }",
        JitOptions {
            opt_level: OptLevel::Speed,
            ..JitOptions::default()
        },
    );
    assert_eq!(engine.run().unwrap().exit_code, 4950);
}

#[test]
fn test_output_not_captured_by_default() {
    let engine = build_with("def main() -> int { return 0; }", JitOptions::default());
    assert_eq!(engine.run().unwrap().output, None);
}

#[test]
fn test_run_twice() {
    let engine = build("def main() -> int { put_i64(7); return 7; }");
    let first = engine.run().unwrap();
    let second = engine.run().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_ir_determinism_100_iterations() {
    let source = "def f(x: int) -> int { if x > 0 { return x; } return -x; }\ndef main() -> int { return f(-3); }";
    let reference = build(source).ir().to_string();
    for i in 0..100 {
        assert_eq!(build(source).ir(), reference, "IR differed on iteration {i}");
    }
}
