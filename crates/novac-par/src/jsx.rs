//! JSX/TSX parsing.
//!
//! Triggered from primary-expression position on a `<` followed by an
//! identifier (element) or `>` (fragment). Text runs between markup are
//! captured as raw source slices, whitespace preserved verbatim.

use novac_lex::token::cook_string;
use novac_lex::TokenKind;
use novac_util::Symbol;

use crate::ast::{Expr, ExprId, JsxAttr, JsxAttrValue, JsxChild, JsxElement};
use crate::Parser;

impl<'src> Parser<'src> {
    /// Parse a JSX element or fragment; the cursor is at `<`.
    pub(crate) fn parse_jsx(&mut self) -> ExprId {
        use TokenKind::*;
        self.advance(); // <

        // Fragment: <> children </>
        if self.eat(Greater) {
            let children = self.parse_jsx_children(None);
            return self.add_expr(Expr::JsxFragment(children));
        }

        let name = self.parse_jsx_name();
        let mut attrs = Vec::new();

        loop {
            match self.peek_kind(0) {
                Slash | Greater | EndOfFile => break,
                LeftBrace => {
                    // Spread attribute: {...expr}
                    self.advance();
                    self.expect(DotDotDot, "expected '...' in JSX spread attribute");
                    let expr = self.parse_assignment_expr();
                    self.expect(RightBrace, "expected '}'");
                    attrs.push(JsxAttr::Spread(expr));
                }
                _ => {
                    let attr_name = match self.property_name() {
                        Some(name) => name,
                        None => {
                            self.error_here("expected JSX attribute name");
                            self.advance();
                            continue;
                        }
                    };
                    let value = if self.eat(Equal) {
                        if self.check(StringLiteral) {
                            let token = self.advance();
                            Some(JsxAttrValue::String(Symbol::intern(&cook_string(
                                &token.lexeme,
                            ))))
                        } else if self.eat(LeftBrace) {
                            let expr = self.parse_assignment_expr();
                            self.expect(RightBrace, "expected '}'");
                            Some(JsxAttrValue::Expr(expr))
                        } else {
                            self.error_here("expected JSX attribute value");
                            None
                        }
                    } else {
                        None
                    };
                    attrs.push(JsxAttr::Named {
                        name: attr_name,
                        value,
                    });
                }
            }
        }

        // Self-closing: />
        if self.eat(Slash) {
            self.expect(Greater, "expected '>' after '/'");
            return self.add_expr(Expr::JsxElement(JsxElement {
                name,
                attrs,
                children: Vec::new(),
                self_closing: true,
            }));
        }

        self.expect(Greater, "expected '>' in JSX element");
        let children = self.parse_jsx_children(Some(name));
        self.add_expr(Expr::JsxElement(JsxElement {
            name,
            attrs,
            children,
            self_closing: false,
        }))
    }

    /// Children until the matching closing tag (`</name>`, or `</>` when
    /// `closing` is `None` for fragments). Closing-tag names are verified.
    fn parse_jsx_children(&mut self, closing: Option<Symbol>) -> Vec<JsxChild> {
        use TokenKind::*;
        let mut children = Vec::new();

        loop {
            // Closing tag.
            if self.check(Less) && self.peek_kind(1) == Slash {
                self.advance();
                self.advance();
                match closing {
                    Some(expected) => {
                        let found = self.parse_jsx_name();
                        if found != expected {
                            self.error_here(format!(
                                "mismatched JSX closing tag: expected </{}>, found </{}>",
                                expected, found
                            ));
                        }
                    }
                    None => {}
                }
                self.expect(Greater, "expected '>' in closing tag");
                break;
            }

            // Nested element or fragment.
            if self.check(Less) && matches!(self.peek_kind(1), Identifier | Greater) {
                let element = self.parse_jsx();
                children.push(JsxChild::Element(element));
                continue;
            }

            // Expression container.
            if self.eat(LeftBrace) {
                let expr = self.parse_expression();
                self.expect(RightBrace, "expected '}' after JSX expression");
                children.push(JsxChild::Expr(expr));
                continue;
            }

            if self.is_at_end() {
                self.error_here("unterminated JSX element");
                break;
            }

            // Text run: raw source from the end of the previous token up to
            // the next markup token, so surrounding whitespace survives.
            let start = {
                let prev = self.previous();
                prev.location.offset as usize + prev.lexeme.len()
            };
            while !matches!(self.peek_kind(0), Less | LeftBrace | EndOfFile) {
                self.advance();
            }
            let end = self.current_token().location.offset as usize;
            let text = self.jsx_text_slice(start, end);
            if !text.is_empty() {
                children.push(JsxChild::Text(Symbol::intern(&text)));
            }
        }

        children
    }

    /// Raw text between two byte offsets. Falls back to an empty string if
    /// the offsets do not address the primary source (nested re-lex passes).
    fn jsx_text_slice(&mut self, start: usize, end: usize) -> String {
        let source = self.source();
        if start <= end
            && end <= source.len()
            && source.is_char_boundary(start)
            && source.is_char_boundary(end)
        {
            source[start..end].to_string()
        } else {
            String::new()
        }
    }

    /// A JSX element name: identifier, possibly dotted (`a.b.C`).
    fn parse_jsx_name(&mut self) -> Symbol {
        let mut name = match self.property_name() {
            Some(name) => name.as_str().to_string(),
            None => {
                self.error_here("expected JSX element name");
                return Symbol::intern("<error>");
            }
        };
        while self.eat(TokenKind::Dot) {
            match self.property_name() {
                Some(part) => {
                    name.push('.');
                    name.push_str(part.as_str());
                }
                None => break,
            }
        }
        Symbol::intern(&name)
    }
}
