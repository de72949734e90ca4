//! Bython parser: converts a token stream into an AST.
//!
//! The parser pulls tokens lazily from [`bython_lexer::Lexer`], keeping two
//! tokens of lookahead. Syntax errors are recorded and parsing resumes at
//! the next statement or `def`, so one run reports every independent error
//! up to [`bython_types::MAX_ERRORS`].

mod parse_expr;
mod parse_item;
mod parse_stmt;
mod parse_type;
mod parser;

pub use parser::{Parser, MAX_NESTING_DEPTH};
