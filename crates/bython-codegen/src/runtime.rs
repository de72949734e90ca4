//! Host runtime linked into every JIT module.
//!
//! Builtins and helper routines are plain `extern "C"` functions registered
//! with the JIT under their `bython_rt_*` symbols. Generated code imports
//! them with [`RuntimeFunctions::declare_all`].
//!
//! Output goes to stdout unless capture is active on the calling thread, in
//! which case it is appended to a buffer that [`end_capture`] hands back.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{c_char, CStr};
use std::fmt;
use std::io::Write;

use bython_types::builtins::BUILTINS;
use bython_types::FunctionType;
use bython_types::Type;
use cranelift_codegen::ir::types::F64;
use cranelift_codegen::ir::{AbiParam, Signature};
use cranelift_module::{FuncId, Linkage, Module};

use crate::error::CodegenResult;
use crate::types::BythonTypes;

/// Exit status used when a program divides by zero.
pub const DIV_ZERO_EXIT_CODE: i32 = 101;

pub const DIV_ZERO_SYMBOL: &str = "bython_rt_div_zero";
pub const IPOW_SYMBOL: &str = "bython_rt_ipow";
pub const UPOW_SYMBOL: &str = "bython_rt_upow";
pub const POWF_SYMBOL: &str = "bython_rt_powf";

// ══════════════════════════════════════════════════════════════════════════════
// Output Sink
// ══════════════════════════════════════════════════════════════════════════════

thread_local! {
    static CAPTURE: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn emit(args: fmt::Arguments<'_>) {
    let captured = CAPTURE.with(|cell| match cell.borrow_mut().as_mut() {
        Some(buffer) => {
            let _ = fmt::Write::write_fmt(buffer, args);
            true
        }
        None => false,
    });
    if !captured {
        let _ = std::io::stdout().lock().write_fmt(args);
    }
}

/// Start buffering runtime output on this thread.
pub(crate) fn begin_capture() {
    CAPTURE.with(|cell| *cell.borrow_mut() = Some(String::new()));
}

/// Stop buffering and return what was written since [`begin_capture`].
pub(crate) fn end_capture() -> Option<String> {
    CAPTURE.with(|cell| cell.borrow_mut().take())
}

pub(crate) fn flush_stdout() {
    let _ = std::io::stdout().flush();
}

// ══════════════════════════════════════════════════════════════════════════════
// Builtins
// ══════════════════════════════════════════════════════════════════════════════

extern "C" fn bython_rt_put_i64(value: i64) {
    emit(format_args!("{value}"));
}

extern "C" fn bython_rt_putln_i64(value: i64) {
    emit(format_args!("{value}\n"));
}

extern "C" fn bython_rt_put_u64(value: u64) {
    emit(format_args!("{value}"));
}

extern "C" fn bython_rt_put_f32(value: f32) {
    emit(format_args!("{value}"));
}

extern "C" fn bython_rt_put_f64(value: f64) {
    emit(format_args!("{value}"));
}

extern "C" fn bython_rt_put_bool(value: u8) {
    emit(format_args!("{}", value != 0));
}

extern "C" fn bython_rt_put_str(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: generated code only passes pointers to NUL-terminated string
    // literals defined in the module's read-only data.
    let text = unsafe { CStr::from_ptr(ptr) };
    emit(format_args!("{}", text.to_string_lossy()));
}

extern "C" fn bython_rt_putln() {
    emit(format_args!("\n"));
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

extern "C" fn bython_rt_div_zero() {
    flush_stdout();
    eprintln!("runtime error: division by zero");
    std::process::exit(DIV_ZERO_EXIT_CODE);
}

/// Wrapping signed power. A negative exponent truncates toward zero, so the
/// result is 0 unless the base is 1 or -1.
pub extern "C" fn bython_rt_ipow(base: i64, exp: i64) -> i64 {
    if exp < 0 {
        return match base {
            1 => 1,
            -1 if exp % 2 == 0 => 1,
            -1 => -1,
            _ => 0,
        };
    }
    bython_rt_upow(base as u64, exp as u64) as i64
}

/// Wrapping unsigned power by repeated squaring.
pub extern "C" fn bython_rt_upow(base: u64, exp: u64) -> u64 {
    let mut result: u64 = 1;
    let mut base = base;
    let mut exp = exp;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    result
}

pub extern "C" fn bython_rt_powf(base: f64, exp: f64) -> f64 {
    base.powf(exp)
}

/// Every runtime symbol with its host address, for `JITBuilder::symbol`.
pub fn symbols() -> Vec<(&'static str, *const u8)> {
    vec![
        ("bython_rt_put_i64", bython_rt_put_i64 as *const u8),
        ("bython_rt_putln_i64", bython_rt_putln_i64 as *const u8),
        ("bython_rt_put_u64", bython_rt_put_u64 as *const u8),
        ("bython_rt_put_f32", bython_rt_put_f32 as *const u8),
        ("bython_rt_put_f64", bython_rt_put_f64 as *const u8),
        ("bython_rt_put_bool", bython_rt_put_bool as *const u8),
        ("bython_rt_put_str", bython_rt_put_str as *const u8),
        ("bython_rt_putln", bython_rt_putln as *const u8),
        (DIV_ZERO_SYMBOL, bython_rt_div_zero as *const u8),
        (IPOW_SYMBOL, bython_rt_ipow as *const u8),
        (UPOW_SYMBOL, bython_rt_upow as *const u8),
        (POWF_SYMBOL, bython_rt_powf as *const u8),
    ]
}

// ══════════════════════════════════════════════════════════════════════════════
// Declarations
// ══════════════════════════════════════════════════════════════════════════════

/// Imported runtime functions, declared once per module.
pub struct RuntimeFunctions {
    /// Builtins keyed by their Bython source name.
    pub builtins: HashMap<&'static str, FuncId>,
    pub div_zero: FuncId,
    pub ipow: FuncId,
    pub upow: FuncId,
    pub powf: FuncId,
}

impl RuntimeFunctions {
    /// Declare all runtime functions in the module.
    pub fn declare_all<M: Module>(module: &mut M, types: &BythonTypes) -> CodegenResult<Self> {
        let call_conv = types.call_conv();
        let sig_with_params = |params: Vec<AbiParam>, returns: Vec<AbiParam>| {
            let mut sig = Signature::new(call_conv);
            sig.params.extend(params);
            sig.returns.extend(returns);
            sig
        };

        let mut builtins = HashMap::new();
        for builtin in BUILTINS {
            let sig = types.signature(&builtin.signature());
            let id = module.declare_function(builtin.symbol, Linkage::Import, &sig)?;
            builtins.insert(builtin.name, id);
        }

        let div_zero =
            module.declare_function(DIV_ZERO_SYMBOL, Linkage::Import, &sig_with_params(vec![], vec![]))?;

        let ipow = module.declare_function(
            IPOW_SYMBOL,
            Linkage::Import,
            &types.signature(&FunctionType::new(vec![Type::I64, Type::I64], Type::I64)),
        )?;

        let upow = module.declare_function(
            UPOW_SYMBOL,
            Linkage::Import,
            &types.signature(&FunctionType::new(vec![Type::U64, Type::U64], Type::U64)),
        )?;

        let powf = module.declare_function(
            POWF_SYMBOL,
            Linkage::Import,
            &sig_with_params(
                vec![AbiParam::new(F64), AbiParam::new(F64)],
                vec![AbiParam::new(F64)],
            ),
        )?;

        tracing::trace!(builtins = builtins.len(), "declared runtime functions");
        Ok(Self {
            builtins,
            div_zero,
            ipow,
            upow,
            powf,
        })
    }
}
