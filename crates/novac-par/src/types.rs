//! Type-annotation parsing.
//!
//! Annotations are parsed to an AST node but semantically collapsed to the
//! small [`TypeAnn`] kind set. Unions, intersections, generics, tuples,
//! function types, and literal types are consumed defensively and recorded
//! as `Any`; the compiler is not a type checker.

use novac_lex::TokenKind;

use crate::ast::{TypeAnn, TypeId};
use crate::Parser;

impl<'src> Parser<'src> {
    pub(crate) fn parse_type_annotation(&mut self) -> TypeId {
        use TokenKind::*;
        let first = self.parse_primary_type();
        let mut composite = false;
        while matches!(self.peek_kind(0), Pipe | Ampersand) {
            self.advance();
            let _ = self.parse_primary_type();
            composite = true;
        }
        if composite {
            self.add_type(TypeAnn::Any)
        } else {
            first
        }
    }

    fn parse_primary_type(&mut self) -> TypeId {
        use TokenKind::*;
        let mut ty = match self.peek_kind(0) {
            Identifier => {
                let token = self.advance();
                let kind = match token.lexeme.as_str() {
                    "any" => TypeAnn::Any,
                    "unknown" => TypeAnn::Unknown,
                    "never" => TypeAnn::Never,
                    "number" => TypeAnn::Number,
                    "string" => TypeAnn::String,
                    "boolean" => TypeAnn::Boolean,
                    "object" => TypeAnn::Object,
                    _ => {
                        // User-defined or generic type: arguments discarded.
                        self.skip_type_args();
                        TypeAnn::Any
                    }
                };
                self.add_type(kind)
            }
            KeywordVoid => {
                self.advance();
                self.add_type(TypeAnn::Void)
            }
            NullLiteral => {
                self.advance();
                self.add_type(TypeAnn::Null)
            }
            UndefinedLiteral => {
                self.advance();
                self.add_type(TypeAnn::Undefined)
            }
            // Type operators apply to a nested type and collapse to Any.
            KeywordTypeof | KeywordKeyof | KeywordUnique | KeywordInfer | KeywordReadonly => {
                self.advance();
                let _ = self.parse_primary_type();
                self.add_type(TypeAnn::Any)
            }
            // Object type literal.
            LeftBrace => {
                self.skip_balanced(LeftBrace, RightBrace);
                self.add_type(TypeAnn::Object)
            }
            // Tuple type.
            LeftBracket => {
                self.skip_balanced(LeftBracket, RightBracket);
                self.add_type(TypeAnn::Any)
            }
            // Function or parenthesized type.
            LeftParen => {
                self.skip_balanced(LeftParen, RightParen);
                if self.eat(Arrow) {
                    let _ = self.parse_type_annotation();
                }
                self.add_type(TypeAnn::Any)
            }
            // Literal types.
            StringLiteral | NumberLiteral | TrueLiteral | FalseLiteral => {
                self.advance();
                self.add_type(TypeAnn::Any)
            }
            Minus if self.peek_kind(1) == NumberLiteral => {
                self.advance();
                self.advance();
                self.add_type(TypeAnn::Any)
            }
            _ => {
                // A keyword used as a type name, or malformed input.
                if self.property_name().is_some() {
                    self.skip_type_args();
                } else {
                    self.error_here("expected type");
                    if !self.is_at_end() {
                        self.advance();
                    }
                }
                self.add_type(TypeAnn::Any)
            }
        };

        // Suffixes: `T[]` array shorthand and `A.B` qualified names.
        loop {
            if self.check(LeftBracket) && self.peek_kind(1) == RightBracket {
                self.advance();
                self.advance();
                ty = self.add_type(TypeAnn::Any);
            } else if self.eat(Dot) {
                let _ = self.property_name();
                self.skip_type_args();
                ty = self.add_type(TypeAnn::Any);
            } else {
                break;
            }
        }

        ty
    }
}
