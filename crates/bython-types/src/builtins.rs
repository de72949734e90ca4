//! Builtin functions visible to every Bython program.
//!
//! The checker seeds its root scope from [`BUILTINS`]; the code generator
//! binds each entry's `symbol` to a host function in the runtime.

use crate::{FunctionType, Type};

/// A host-provided function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Builtin {
    /// Name as written in Bython source.
    pub name: &'static str,
    /// Symbol the JIT resolves the call against.
    pub symbol: &'static str,
    pub params: &'static [Type],
    pub ret: Type,
}

impl Builtin {
    pub fn signature(&self) -> FunctionType {
        FunctionType::new(self.params.to_vec(), self.ret.clone())
    }
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "put_i64",
        symbol: "bython_rt_put_i64",
        params: &[Type::I64],
        ret: Type::Void,
    },
    Builtin {
        name: "putln_i64",
        symbol: "bython_rt_putln_i64",
        params: &[Type::I64],
        ret: Type::Void,
    },
    Builtin {
        name: "put_u64",
        symbol: "bython_rt_put_u64",
        params: &[Type::U64],
        ret: Type::Void,
    },
    Builtin {
        name: "put_f32",
        symbol: "bython_rt_put_f32",
        params: &[Type::F32],
        ret: Type::Void,
    },
    Builtin {
        name: "put_f64",
        symbol: "bython_rt_put_f64",
        params: &[Type::F64],
        ret: Type::Void,
    },
    Builtin {
        name: "put_bool",
        symbol: "bython_rt_put_bool",
        params: &[Type::Bool],
        ret: Type::Void,
    },
    Builtin {
        name: "put_str",
        symbol: "bython_rt_put_str",
        params: &[Type::Str],
        ret: Type::Void,
    },
    Builtin {
        name: "putln",
        symbol: "bython_rt_putln",
        params: &[],
        ret: Type::Void,
    },
];

/// Look up a builtin by its source name.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}
