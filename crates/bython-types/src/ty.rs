//! Semantic types for the Bython type checker and code generator.
//!
//! [`Type`] is what the checker writes into AST annotations. It is distinct
//! from [`crate::ast::TypeAnnotation`], the syntactic form the parser produces.

use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Type
// ══════════════════════════════════════════════════════════════════════════════

/// A semantic type in Bython.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    // ── Primitives ──
    Bool,
    /// `i8`..`i64` and `u8`..`u64`.
    Int { signed: bool, bits: u8 },
    /// `f32` or `f64`.
    Float { bits: u8 },
    /// Pointer to a NUL-terminated string literal.
    Str,
    /// Statements and calls that produce no value.
    Void,

    // ── Composites ──
    /// `(T1, T2, ...) -> R`. Only function names carry this type.
    Function(Box<FunctionType>),

    // ── Special ──
    /// Type could not be determined (error recovery).
    Unknown,
}

/// Parameter and return types of a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub ret: Type,
}

impl FunctionType {
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        Self { params, ret }
    }
}

impl Type {
    pub const I8: Type = Type::Int { signed: true, bits: 8 };
    pub const I16: Type = Type::Int { signed: true, bits: 16 };
    pub const I32: Type = Type::Int { signed: true, bits: 32 };
    pub const I64: Type = Type::Int { signed: true, bits: 64 };
    pub const U8: Type = Type::Int { signed: false, bits: 8 };
    pub const U16: Type = Type::Int { signed: false, bits: 16 };
    pub const U32: Type = Type::Int { signed: false, bits: 32 };
    pub const U64: Type = Type::Int { signed: false, bits: 64 };
    pub const F32: Type = Type::Float { bits: 32 };
    pub const F64: Type = Type::Float { bits: 64 };

    /// Resolve a source-level type name. `int`, `float` and `none` are aliases.
    pub fn from_name(name: &str) -> Option<Type> {
        Some(match name {
            "bool" => Type::Bool,
            "i8" => Type::I8,
            "i16" => Type::I16,
            "i32" => Type::I32,
            "i64" | "int" => Type::I64,
            "u8" => Type::U8,
            "u16" => Type::U16,
            "u32" => Type::U32,
            "u64" => Type::U64,
            "f32" => Type::F32,
            "f64" | "float" => Type::F64,
            "str" => Type::Str,
            "void" | "none" => Type::Void,
            _ => return None,
        })
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Type {
        Type::Function(Box::new(FunctionType::new(params, ret)))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int { .. })
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float { .. })
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Type::Int { signed: true, .. } | Type::Float { .. })
    }

    /// Bit width of scalar types, `None` otherwise.
    pub fn bits(&self) -> Option<u8> {
        match self {
            Type::Int { bits, .. } | Type::Float { bits } => Some(*bits),
            Type::Bool => Some(8),
            _ => None,
        }
    }

    /// Check if a value of this type may flow into a slot of type `target`.
    ///
    /// Rules:
    /// - Same type → yes
    /// - `Unknown` is compatible with anything (error recovery)
    /// - Integers widen within the same signedness
    /// - Any integer converts to any float
    /// - `f32` widens to `f64`
    pub fn is_assignable_to(&self, target: &Type) -> bool {
        if self == target || self.is_unknown() || target.is_unknown() {
            return true;
        }
        match (self, target) {
            (
                Type::Int { signed: s1, bits: b1 },
                Type::Int { signed: s2, bits: b2 },
            ) => s1 == s2 && b1 <= b2,
            (Type::Int { .. }, Type::Float { .. }) => true,
            (Type::Float { bits: b1 }, Type::Float { bits: b2 }) => b1 <= b2,
            _ => false,
        }
    }

    /// Result type of an arithmetic operator applied to `self` and `other`.
    ///
    /// Returns `None` when either side is not numeric.
    pub fn arithmetic_result(&self, other: &Type) -> Option<Type> {
        if self.is_unknown() || other.is_unknown() {
            return Some(Type::Unknown);
        }
        match (self, other) {
            (
                Type::Int { signed: s1, bits: b1 },
                Type::Int { signed: s2, bits: b2 },
            ) => {
                if s1 == s2 {
                    return Some(Type::Int { signed: *s1, bits: (*b1).max(*b2) });
                }
                let (unsigned_bits, signed_bits) = if *s1 { (*b2, *b1) } else { (*b1, *b2) };
                if unsigned_bits >= signed_bits {
                    Some(Type::Int { signed: false, bits: unsigned_bits })
                } else {
                    Some(Type::Int { signed: true, bits: signed_bits })
                }
            }
            (Type::Float { bits: b1 }, Type::Float { bits: b2 }) => {
                Some(Type::Float { bits: (*b1).max(*b2) })
            }
            (Type::Float { .. }, Type::Int { .. }) => Some(self.clone()),
            (Type::Int { .. }, Type::Float { .. }) => Some(other.clone()),
            _ => None,
        }
    }

    /// Whether `value` is representable in this integer type.
    pub fn int_fits(&self, value: i128) -> bool {
        match self {
            Type::Int { signed: true, bits } => {
                let max = (1i128 << (bits - 1)) - 1;
                (-max - 1..=max).contains(&value)
            }
            Type::Int { signed: false, bits } => {
                let max = (1i128 << bits) - 1;
                (0..=max).contains(&value)
            }
            _ => false,
        }
    }

    /// Whether an explicit `as` conversion from `self` to `target` is allowed.
    pub fn can_cast_to(&self, target: &Type) -> bool {
        if self.is_unknown() || target.is_unknown() {
            return true;
        }
        match (self, target) {
            (Type::Float { .. }, Type::Bool) => false,
            (a, b) => {
                let scalar = |t: &Type| t.is_numeric() || matches!(t, Type::Bool);
                scalar(a) && scalar(b)
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Display
// ══════════════════════════════════════════════════════════════════════════════

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int { signed: true, bits } => write!(f, "i{bits}"),
            Type::Int { signed: false, bits } => write!(f, "u{bits}"),
            Type::Float { bits } => write!(f, "f{bits}"),
            Type::Str => write!(f, "str"),
            Type::Void => write!(f, "void"),
            Type::Unknown => write!(f, "unknown"),
            Type::Function(sig) => write!(f, "{sig}"),
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}
