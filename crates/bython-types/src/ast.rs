//! AST node types for the Bython language.
//!
//! Every node carries a [`Span`] for error reporting. Node kinds are closed
//! enums so each visitor must handle every variant.
//!
//! Slots named `ty`, `binding_type` and `signature` start out empty and are
//! written exactly once by the type checker. The code generator refuses to
//! lower a node whose slot is still empty.

use crate::{AlreadyAnnotated, FunctionType, Span, Type};

fn write_once<T>(slot: &mut Option<T>, value: T, span: Span) -> Result<(), AlreadyAnnotated> {
    if slot.is_some() {
        return Err(AlreadyAnnotated { span });
    }
    *slot = Some(value);
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A compilation unit: a sequence of function definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub items: Vec<FunctionDef>,
    pub span: Span,
}

impl Module {
    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.items.iter().find(|f| f.name.name == name)
    }
}

/// `def name(p: T, ...) -> R { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Ident,
    pub params: Vec<Param>,
    /// `None` means `void`.
    pub return_type: Option<TypeAnnotation>,
    pub body: Block,
    pub span: Span,
    /// Resolved signature, written by the checker.
    pub signature: Option<FunctionType>,
}

impl FunctionDef {
    pub fn annotate(&mut self, sig: FunctionType) -> Result<(), AlreadyAnnotated> {
        write_once(&mut self.signature, sig, self.span)
    }
}

/// `name: T`
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeAnnotation,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers & Types
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A type as written in source. Resolved to a [`Type`] by the checker.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnotation {
    pub name: String,
    pub span: Span,
}

impl TypeAnnotation {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

/// `{ stmt* }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `val name[: T] = value;`
    Val {
        name: Ident,
        annotation: Option<TypeAnnotation>,
        value: Expr,
        /// Type of the new binding, written by the checker.
        binding_type: Option<Type>,
    },
    /// `name = value;`
    Assign { target: Ident, value: Expr },
    /// `if c { } elif c { } else { }`
    If {
        branches: Vec<CondBranch>,
        else_block: Option<Block>,
    },
    /// `while cond { body }`
    While { cond: Expr, body: Block },
    /// `return [value];`
    Return(Option<Expr>),
    /// `discard expr;`
    Discard(Expr),
    /// `expr;`
    Expr(Expr),
}

/// One `if`/`elif` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct CondBranch {
    pub cond: Expr,
    pub body: Block,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    /// Inferred type, written by the checker.
    pub ty: Option<Type>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: None,
        }
    }

    pub fn annotate(&mut self, ty: Type) -> Result<(), AlreadyAnnotated> {
        write_once(&mut self.ty, ty, self.span)
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.unparen(),
            _ => self,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    IntLit(u64),
    FloatLit(f64),
    BoolLit(bool),
    StrLit(String),

    // ── References ──
    Ident(Ident),

    // ── Operations ──
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// `expr as T`
    Cast {
        expr: Box<Expr>,
        target: TypeAnnotation,
    },
    /// `callee(args)`
    Call { callee: Ident, args: Vec<Expr> },
    /// `(expr)`
    Paren(Box<Expr>),
}

// ══════════════════════════════════════════════════════════════════════════════
// Operators
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    // Comparison
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    // Logical (short-circuit)
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Less => "<",
            BinOp::LessEq => "<=",
            BinOp::Greater => ">",
            BinOp::GreaterEq => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::NotEq | BinOp::Less | BinOp::LessEq | BinOp::Greater | BinOp::GreaterEq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Plus,
    /// `~x`
    BitNot,
    /// `!x`
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "!",
        }
    }
}
