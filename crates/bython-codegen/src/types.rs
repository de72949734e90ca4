//! Mapping from Bython semantic types to Cranelift value types.
//!
//! | Bython          | Cranelift      |
//! |-----------------|----------------|
//! | `bool`          | `i8` (0 or 1)  |
//! | `i8`/`u8`       | `i8`           |
//! | `i16`/`u16`     | `i16`          |
//! | `i32`/`u32`     | `i32`          |
//! | `i64`/`u64`     | `i64`          |
//! | `f32`, `f64`    | `f32`, `f64`   |
//! | `str`           | pointer        |
//!
//! Signedness is not part of a Cranelift type; it selects the instruction
//! (`sdiv` vs `udiv`, `sextend` vs `uextend`) at each use.

use bython_types::{FunctionType, Span, Type};
use cranelift_codegen::ir::types::{F32, F64, I16, I32, I64, I8};
use cranelift_codegen::ir::{self, AbiParam, Signature};
use cranelift_codegen::isa::CallConv;

use crate::error::{CodegenError, CodegenResult};

/// Value-type mapping for one target.
#[derive(Debug, Clone, Copy)]
pub struct BythonTypes {
    pointer: ir::Type,
    call_conv: CallConv,
}

impl BythonTypes {
    pub fn new(pointer: ir::Type, call_conv: CallConv) -> Self {
        Self { pointer, call_conv }
    }

    pub fn pointer_type(&self) -> ir::Type {
        self.pointer
    }

    pub fn call_conv(&self) -> CallConv {
        self.call_conv
    }

    /// Cranelift type carrying a value of `ty`, or `None` for `void`.
    pub fn value_type(&self, ty: &Type) -> Option<ir::Type> {
        match ty {
            Type::Bool => Some(I8),
            Type::Int { bits, .. } => Some(int_type(*bits)),
            Type::Float { bits: 32 } => Some(F32),
            Type::Float { .. } => Some(F64),
            Type::Str => Some(self.pointer),
            Type::Void | Type::Function(_) | Type::Unknown => None,
        }
    }

    /// Like [`Self::value_type`] but for a slot that must hold a value.
    pub fn expect_value_type(&self, ty: &Type, span: Span) -> CodegenResult<ir::Type> {
        self.value_type(ty).ok_or_else(|| {
            CodegenError::internal(format!("no value representation for {ty} at {span}"))
        })
    }

    /// ABI parameter for `ty`. Narrow integers are extended per signedness
    /// so host functions see well-formed C values.
    pub fn abi_param(&self, ty: &Type) -> Option<AbiParam> {
        let param = AbiParam::new(self.value_type(ty)?);
        Some(match ty {
            Type::Bool | Type::Int { signed: false, .. } => param.uext(),
            Type::Int { signed: true, .. } => param.sext(),
            _ => param,
        })
    }

    /// Native signature of a Bython function.
    pub fn signature(&self, sig: &FunctionType) -> Signature {
        let mut signature = Signature::new(self.call_conv);
        signature
            .params
            .extend(sig.params.iter().filter_map(|p| self.abi_param(p)));
        signature.returns.extend(self.abi_param(&sig.ret));
        signature
    }
}

pub fn int_type(bits: u8) -> ir::Type {
    match bits {
        8 => I8,
        16 => I16,
        32 => I32,
        _ => I64,
    }
}

/// Two's-complement bit pattern of `value` in a `bits`-wide slot, as the
/// immediate Cranelift expects for `iconst`.
pub fn int_immediate(value: i128, bits: u8) -> i64 {
    if bits >= 64 {
        value as i64
    } else {
        (value & ((1i128 << bits) - 1)) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cranelift_codegen::isa::CallConv;

    fn types() -> BythonTypes {
        BythonTypes::new(I64, CallConv::SystemV)
    }

    #[test]
    fn test_value_types() {
        let t = types();
        assert_eq!(t.value_type(&Type::Bool), Some(I8));
        assert_eq!(t.value_type(&Type::U16), Some(I16));
        assert_eq!(t.value_type(&Type::I64), Some(I64));
        assert_eq!(t.value_type(&Type::F32), Some(F32));
        assert_eq!(t.value_type(&Type::Str), Some(I64));
        assert_eq!(t.value_type(&Type::Void), None);
    }

    #[test]
    fn test_signature_skips_void_return() {
        let sig = types().signature(&FunctionType::new(vec![Type::I8, Type::F64], Type::Void));
        assert_eq!(sig.params.len(), 2);
        assert!(sig.returns.is_empty());
    }

    #[test]
    fn test_int_immediate_masks_narrow_values() {
        assert_eq!(int_immediate(-1, 8), 0xff);
        assert_eq!(int_immediate(-128, 8), 0x80);
        assert_eq!(int_immediate(65535, 16), 0xffff);
        assert_eq!(int_immediate(-1, 64), -1);
        assert_eq!(int_immediate(u64::MAX as i128, 64), -1);
    }
}
