//! Destructuring pattern parsing.

use novac_lex::TokenKind;
use novac_util::Symbol;

use crate::ast::{ObjectPatternProp, PatId, Pattern};
use crate::Parser;

impl<'src> Parser<'src> {
    /// A binding position: identifier, object pattern, or array pattern,
    /// optionally wrapped with a default (`pattern = expr`).
    pub(crate) fn parse_binding_pattern(&mut self) -> PatId {
        use TokenKind::*;
        let pattern = match self.peek_kind(0) {
            Identifier => {
                let name = Symbol::intern(&self.advance().lexeme);
                self.add_pat(Pattern::Ident(name))
            }
            LeftBrace => self.parse_object_pattern(),
            LeftBracket => self.parse_array_pattern(),
            _ => {
                self.error_here("expected binding pattern");
                if !self.is_at_end() {
                    self.advance();
                }
                self.add_pat(Pattern::Invalid)
            }
        };

        if self.eat(Equal) {
            let default = self.parse_assignment_expr();
            return self.add_pat(Pattern::Assign { pattern, default });
        }
        pattern
    }

    fn parse_object_pattern(&mut self) -> PatId {
        use TokenKind::*;
        self.advance(); // {
        let mut props = Vec::new();
        let mut rest = None;

        while !self.check(RightBrace) && !self.is_at_end() {
            if self.eat(DotDotDot) {
                rest = Some(self.parse_binding_pattern());
            } else {
                let key = match self.property_name() {
                    Some(key) => key,
                    None => {
                        self.error_here("expected property name in object pattern");
                        break;
                    }
                };
                let value = if self.eat(Colon) {
                    Some(self.parse_binding_pattern())
                } else {
                    None // shorthand
                };
                let default = if self.eat(Equal) {
                    Some(self.parse_assignment_expr())
                } else {
                    None
                };
                props.push(ObjectPatternProp {
                    key,
                    value,
                    default,
                });
            }
            if !self.check(RightBrace) && !self.eat(Comma) {
                self.error_here("expected ',' or '}' in object pattern");
                break;
            }
        }
        self.expect(RightBrace, "expected '}'");
        self.add_pat(Pattern::Object { props, rest })
    }

    fn parse_array_pattern(&mut self) -> PatId {
        use TokenKind::*;
        self.advance(); // [
        let mut elements = Vec::new();
        let mut rest = None;

        while !self.check(RightBracket) && !self.is_at_end() {
            if self.check(Comma) {
                self.advance();
                elements.push(None); // elision
                continue;
            }
            if self.eat(DotDotDot) {
                rest = Some(self.parse_binding_pattern());
            } else {
                elements.push(Some(self.parse_binding_pattern()));
            }
            if !self.check(RightBracket) && !self.eat(Comma) {
                self.error_here("expected ',' or ']' in array pattern");
                break;
            }
        }
        self.expect(RightBracket, "expected ']'");
        self.add_pat(Pattern::Array { elements, rest })
    }
}
