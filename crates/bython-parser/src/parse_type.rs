//! Type annotation parsing.

use bython_lexer::TokenKind;
use bython_types::ast::TypeAnnotation;
use bython_types::ErrorCode;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// Parse a type annotation.
    ///
    /// ```ebnf
    /// Type = Identifier ;
    /// ```
    ///
    /// Names are not resolved here: `int`, `u8` and a misspelt `i65` all
    /// parse, and the type checker decides which ones exist.
    pub(crate) fn parse_type_annotation(&mut self) -> Option<TypeAnnotation> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(TypeAnnotation::new(name, span))
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected type name, got '{other}'"),
                );
                None
            }
        }
    }
}
