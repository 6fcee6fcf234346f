//! Expression parsing: precedence climbing in fourteen strata.
//!
//! Highest precedence first: primary, postfix (call/member/optional-chain/
//! template-tag/non-null/`as`/`satisfies`), unary, exponentiation
//! (right-assoc), multiplicative, additive, shift, relational, equality,
//! bit-and, bit-xor, bit-or, logical-and, logical-or (with `??`),
//! conditional, assignment (right-assoc), sequence.

use novac_lex::token::{cook_number, cook_string, template_text, NumberValue};
use novac_lex::{Lexer, TokenKind};
use novac_util::Symbol;

use crate::ast::{
    ArrowBody, AssignOp, BinOp, Expr, ExprId, ObjectProp, Param, Pattern, PropKey, UnaryOp,
    UpdateOp,
};
use crate::Parser;

impl<'src> Parser<'src> {
    /// Full expression, including the comma (sequence) operator.
    pub(crate) fn parse_expression(&mut self) -> ExprId {
        let first = self.parse_assignment_expr();
        if !self.check(TokenKind::Comma) {
            return first;
        }
        let mut exprs = vec![first];
        while self.eat(TokenKind::Comma) {
            exprs.push(self.parse_assignment_expr());
        }
        self.add_expr(Expr::Sequence(exprs))
    }

    /// Assignment stratum. Arrow functions are disambiguated here: a
    /// parenthesized head is accepted as a parameter list only if the
    /// matching `)` is followed by `=>` (or `: type =>`), otherwise the
    /// parenthesis parses as grouping.
    pub(crate) fn parse_assignment_expr(&mut self) -> ExprId {
        use TokenKind::*;

        // x => ...
        if self.check(Identifier) && self.peek_kind(1) == Arrow {
            return self.parse_simple_arrow(false);
        }

        // async x => ... / async (...) => ...
        if self.check(KeywordAsync) {
            if self.peek_kind(1) == Identifier && self.peek_kind(2) == Arrow {
                self.advance();
                return self.parse_simple_arrow(true);
            }
            if self.peek_kind(1) == LeftParen && self.is_arrow_ahead(1) {
                self.advance();
                return self.parse_paren_arrow(true);
            }
        }

        // (...) => ...
        if self.check(LeftParen) && self.is_arrow_ahead(0) {
            return self.parse_paren_arrow(false);
        }

        if self.check(KeywordYield) {
            return self.parse_yield_expr();
        }

        let left = self.parse_conditional_expr();

        let kind = self.peek_kind(0);
        if kind.is_assignment_op() {
            let op = assign_op_for(kind);
            self.advance();
            let value = self.parse_assignment_expr();
            return self.add_expr(Expr::Assignment {
                op,
                target: left,
                value,
            });
        }

        left
    }

    fn parse_yield_expr(&mut self) -> ExprId {
        use TokenKind::*;
        self.advance(); // yield
        let delegate = self.eat(Star);
        let argument = if matches!(
            self.peek_kind(0),
            Semicolon | RightParen | RightBrace | RightBracket | Comma | Colon | EndOfFile
        ) {
            None
        } else {
            Some(self.parse_assignment_expr())
        };
        self.add_expr(Expr::Yield { argument, delegate })
    }

    fn parse_conditional_expr(&mut self) -> ExprId {
        let test = self.parse_logical_or_expr();
        if !self.eat(TokenKind::Question) {
            return test;
        }
        let consequent = self.parse_assignment_expr();
        self.expect(TokenKind::Colon, "expected ':' in conditional expression");
        let alternate = self.parse_assignment_expr();
        self.add_expr(Expr::Conditional {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_logical_or_expr(&mut self) -> ExprId {
        let mut left = self.parse_logical_and_expr();
        loop {
            let op = match self.peek_kind(0) {
                TokenKind::PipePipe => BinOp::LogicalOr,
                TokenKind::QuestionQuestion => BinOp::Nullish,
                _ => break,
            };
            self.advance();
            let right = self.parse_logical_and_expr();
            left = self.add_expr(Expr::Binary { op, left, right });
        }
        left
    }

    fn parse_logical_and_expr(&mut self) -> ExprId {
        let mut left = self.parse_bitwise_or_expr();
        while self.eat(TokenKind::AmpersandAmpersand) {
            let right = self.parse_bitwise_or_expr();
            left = self.add_expr(Expr::Binary {
                op: BinOp::LogicalAnd,
                left,
                right,
            });
        }
        left
    }

    fn parse_bitwise_or_expr(&mut self) -> ExprId {
        let mut left = self.parse_bitwise_xor_expr();
        while self.eat(TokenKind::Pipe) {
            let right = self.parse_bitwise_xor_expr();
            left = self.add_expr(Expr::Binary {
                op: BinOp::BitOr,
                left,
                right,
            });
        }
        left
    }

    fn parse_bitwise_xor_expr(&mut self) -> ExprId {
        let mut left = self.parse_bitwise_and_expr();
        while self.eat(TokenKind::Caret) {
            let right = self.parse_bitwise_and_expr();
            left = self.add_expr(Expr::Binary {
                op: BinOp::BitXor,
                left,
                right,
            });
        }
        left
    }

    fn parse_bitwise_and_expr(&mut self) -> ExprId {
        let mut left = self.parse_equality_expr();
        while self.eat(TokenKind::Ampersand) {
            let right = self.parse_equality_expr();
            left = self.add_expr(Expr::Binary {
                op: BinOp::BitAnd,
                left,
                right,
            });
        }
        left
    }

    fn parse_equality_expr(&mut self) -> ExprId {
        let mut left = self.parse_relational_expr();
        loop {
            let op = match self.peek_kind(0) {
                TokenKind::EqualEqual => BinOp::Eq,
                TokenKind::ExclamationEqual => BinOp::Ne,
                TokenKind::EqualEqualEqual => BinOp::StrictEq,
                TokenKind::ExclamationEqualEqual => BinOp::StrictNe,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational_expr();
            left = self.add_expr(Expr::Binary { op, left, right });
        }
        left
    }

    fn parse_relational_expr(&mut self) -> ExprId {
        let mut left = self.parse_shift_expr();
        loop {
            let op = match self.peek_kind(0) {
                TokenKind::Less => BinOp::Lt,
                TokenKind::LessEqual => BinOp::Le,
                TokenKind::Greater => BinOp::Gt,
                TokenKind::GreaterEqual => BinOp::Ge,
                TokenKind::KeywordInstanceof => BinOp::Instanceof,
                TokenKind::KeywordIn => BinOp::In,
                _ => break,
            };
            self.advance();
            let right = self.parse_shift_expr();
            left = self.add_expr(Expr::Binary { op, left, right });
        }
        left
    }

    fn parse_shift_expr(&mut self) -> ExprId {
        let mut left = self.parse_additive_expr();
        loop {
            let op = match self.peek_kind(0) {
                TokenKind::LessLess => BinOp::Shl,
                TokenKind::GreaterGreater => BinOp::Shr,
                TokenKind::GreaterGreaterGreater => BinOp::UShr,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive_expr();
            left = self.add_expr(Expr::Binary { op, left, right });
        }
        left
    }

    fn parse_additive_expr(&mut self) -> ExprId {
        let mut left = self.parse_multiplicative_expr();
        loop {
            let op = match self.peek_kind(0) {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative_expr();
            left = self.add_expr(Expr::Binary { op, left, right });
        }
        left
    }

    fn parse_multiplicative_expr(&mut self) -> ExprId {
        let mut left = self.parse_exponentiation_expr();
        loop {
            let op = match self.peek_kind(0) {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_exponentiation_expr();
            left = self.add_expr(Expr::Binary { op, left, right });
        }
        left
    }

    /// `**` is right-associative: `a ** b ** c` is `a ** (b ** c)`.
    fn parse_exponentiation_expr(&mut self) -> ExprId {
        let base = self.parse_unary_expr();
        if self.eat(TokenKind::StarStar) {
            let right = self.parse_exponentiation_expr();
            return self.add_expr(Expr::Binary {
                op: BinOp::Exp,
                left: base,
                right,
            });
        }
        base
    }

    fn parse_unary_expr(&mut self) -> ExprId {
        use TokenKind::*;
        let op = match self.peek_kind(0) {
            Plus => Some(UnaryOp::Plus),
            Minus => Some(UnaryOp::Minus),
            Exclamation => Some(UnaryOp::Not),
            Tilde => Some(UnaryOp::BitNot),
            KeywordTypeof => Some(UnaryOp::Typeof),
            KeywordVoid => Some(UnaryOp::Void),
            KeywordDelete => Some(UnaryOp::Delete),
            KeywordAwait => Some(UnaryOp::Await),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary_expr();
            return self.add_expr(Expr::Unary { op, operand });
        }

        if matches!(self.peek_kind(0), PlusPlus | MinusMinus) {
            let op = if self.advance().kind == PlusPlus {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            let operand = self.parse_unary_expr();
            return self.add_expr(Expr::Update {
                op,
                prefix: true,
                operand,
            });
        }

        self.parse_postfix_expr(true)
    }

    /// Postfix chains: member access, optional chaining, calls, computed
    /// index, tagged templates, postfix `++`/`--`, non-null `!`, and the
    /// `as`/`satisfies` type operators.
    fn parse_postfix_expr(&mut self, allow_call: bool) -> ExprId {
        use TokenKind::*;
        let mut expr = self.parse_primary_expr();

        loop {
            match self.peek_kind(0) {
                Dot => {
                    self.advance();
                    match self.property_name() {
                        Some(property) => {
                            expr = self.add_expr(Expr::Member {
                                object: expr,
                                property,
                                optional: false,
                            });
                        }
                        None => {
                            self.error_here("expected property name after '.'");
                            break;
                        }
                    }
                }
                QuestionDot => {
                    self.advance();
                    if self.check(LeftParen) && allow_call {
                        let args = self.parse_arguments();
                        expr = self.add_expr(Expr::Call {
                            callee: expr,
                            args,
                            optional: true,
                        });
                    } else if self.eat(LeftBracket) {
                        let index = self.parse_expression();
                        self.expect(RightBracket, "expected ']'");
                        expr = self.add_expr(Expr::Index {
                            object: expr,
                            index,
                            optional: true,
                        });
                    } else {
                        match self.property_name() {
                            Some(property) => {
                                expr = self.add_expr(Expr::Member {
                                    object: expr,
                                    property,
                                    optional: true,
                                });
                            }
                            None => {
                                self.error_here("expected property name after '?.'");
                                break;
                            }
                        }
                    }
                }
                LeftParen if allow_call => {
                    let args = self.parse_arguments();
                    expr = self.add_expr(Expr::Call {
                        callee: expr,
                        args,
                        optional: false,
                    });
                }
                LeftBracket => {
                    self.advance();
                    let index = self.parse_expression();
                    self.expect(RightBracket, "expected ']'");
                    expr = self.add_expr(Expr::Index {
                        object: expr,
                        index,
                        optional: false,
                    });
                }
                TemplateLiteral => {
                    let quasi = self.parse_template_literal();
                    expr = self.add_expr(Expr::TaggedTemplate { tag: expr, quasi });
                }
                PlusPlus | MinusMinus => {
                    let op = if self.advance().kind == PlusPlus {
                        UpdateOp::Increment
                    } else {
                        UpdateOp::Decrement
                    };
                    expr = self.add_expr(Expr::Update {
                        op,
                        prefix: false,
                        operand: expr,
                    });
                }
                Exclamation => {
                    self.advance();
                    expr = self.add_expr(Expr::NonNull(expr));
                }
                KeywordAs => {
                    self.advance();
                    let ty = self.parse_type_annotation();
                    expr = self.add_expr(Expr::As { expr, ty });
                }
                KeywordSatisfies => {
                    self.advance();
                    let ty = self.parse_type_annotation();
                    expr = self.add_expr(Expr::Satisfies { expr, ty });
                }
                _ => break,
            }
        }

        expr
    }

    fn parse_primary_expr(&mut self) -> ExprId {
        use TokenKind::*;
        let token = self.current_token().clone();

        match token.kind {
            NumberLiteral => {
                self.advance();
                let value = match cook_number(&token.lexeme) {
                    NumberValue::Int(i) => i as f64,
                    NumberValue::Float(f) => f,
                };
                self.add_expr(Expr::Number(value))
            }
            StringLiteral => {
                self.advance();
                let value = Symbol::intern(&cook_string(&token.lexeme));
                self.add_expr(Expr::String(value))
            }
            TemplateLiteral => self.parse_template_literal(),
            RegexLiteral => {
                self.advance();
                self.add_expr(Expr::Regex(Symbol::intern(&token.lexeme)))
            }
            TrueLiteral => {
                self.advance();
                self.add_expr(Expr::Bool(true))
            }
            FalseLiteral => {
                self.advance();
                self.add_expr(Expr::Bool(false))
            }
            NullLiteral => {
                self.advance();
                self.add_expr(Expr::Null)
            }
            UndefinedLiteral => {
                self.advance();
                self.add_expr(Expr::Undefined)
            }
            Identifier => {
                self.advance();
                self.add_expr(Expr::Ident(Symbol::intern(&token.lexeme)))
            }
            KeywordThis => {
                self.advance();
                self.add_expr(Expr::This)
            }
            KeywordSuper => {
                self.advance();
                self.add_expr(Expr::Super)
            }
            LeftParen => {
                self.advance();
                let inner = self.parse_expression();
                self.expect(RightParen, "expected ')'");
                self.add_expr(Expr::Paren(inner))
            }
            LeftBracket => self.parse_array_literal(),
            LeftBrace => self.parse_object_literal(),
            KeywordFunction => self.parse_function_expr(false),
            KeywordAsync if self.peek_kind(1) == KeywordFunction => {
                self.advance();
                self.parse_function_expr(true)
            }
            // `async` used as a plain identifier.
            KeywordAsync => {
                self.advance();
                self.add_expr(Expr::Ident(Symbol::intern("async")))
            }
            KeywordClass => {
                let def = self.parse_class_def();
                self.add_expr(Expr::Class(Box::new(def)))
            }
            KeywordNew => self.parse_new_expr(),
            KeywordImport => {
                self.advance();
                if self.eat(LeftParen) {
                    let arg = self.parse_assignment_expr();
                    self.expect(RightParen, "expected ')' after import()");
                    self.add_expr(Expr::ImportCall(arg))
                } else if self.eat(Dot) {
                    let property = self.property_name().unwrap_or_else(|| {
                        self.error_here("expected property after 'import.'");
                        Symbol::intern("meta")
                    });
                    self.add_expr(Expr::MetaProperty {
                        object: Symbol::intern("import"),
                        property,
                    })
                } else {
                    self.error_here("unexpected 'import' in expression position");
                    self.add_expr(Expr::Invalid)
                }
            }
            Less if matches!(self.peek_kind(1), Identifier | Greater) => self.parse_jsx(),
            // The lexer produced a division token but the grammar expects an
            // expression here: force regex interpretation from the raw source.
            Slash | SlashEqual => self.relex_regex(),
            _ => {
                self.error_here(format!("expected expression, found {}", token.kind));
                if !self.is_at_end() {
                    self.advance();
                }
                self.add_expr(Expr::Invalid)
            }
        }
    }

    fn parse_new_expr(&mut self) -> ExprId {
        use TokenKind::*;
        self.advance(); // new
        if self.eat(Dot) {
            let property = self.property_name().unwrap_or_else(|| {
                self.error_here("expected property after 'new.'");
                Symbol::intern("target")
            });
            return self.add_expr(Expr::MetaProperty {
                object: Symbol::intern("new"),
                property,
            });
        }
        // Member chain without calls, so `new a.b.C(x)` binds args to C.
        let callee = self.parse_postfix_expr(false);
        let args = if self.check(LeftParen) {
            self.parse_arguments()
        } else {
            Vec::new()
        };
        self.add_expr(Expr::New { callee, args })
    }

    fn parse_array_literal(&mut self) -> ExprId {
        use TokenKind::*;
        self.advance(); // [
        let mut elements = Vec::new();
        loop {
            if self.check(RightBracket) || self.is_at_end() {
                break;
            }
            if self.check(Comma) {
                self.advance();
                elements.push(None); // elision
                continue;
            }
            let element = if self.eat(DotDotDot) {
                let inner = self.parse_assignment_expr();
                self.add_expr(Expr::Spread(inner))
            } else {
                self.parse_assignment_expr()
            };
            elements.push(Some(element));
            if !self.check(RightBracket) && !self.eat(Comma) {
                self.error_here("expected ',' or ']' in array literal");
                break;
            }
        }
        self.expect(RightBracket, "expected ']'");
        self.add_expr(Expr::Array(elements))
    }

    fn parse_object_literal(&mut self) -> ExprId {
        use TokenKind::*;
        self.advance(); // {
        let mut props = Vec::new();
        while !self.check(RightBrace) && !self.is_at_end() {
            if self.eat(DotDotDot) {
                let inner = self.parse_assignment_expr();
                props.push(ObjectProp::Spread(inner));
            } else {
                let key = self.parse_property_key();
                if self.check(LeftParen) {
                    let func = self.parse_function_tail(None, false, false);
                    props.push(ObjectProp::Method { key, func });
                } else if self.eat(Colon) {
                    let value = self.parse_assignment_expr();
                    props.push(ObjectProp::KeyValue { key, value });
                } else if let PropKey::Ident(name) = key {
                    if self.eat(Equal) {
                        // Cover grammar leftover (`{a = 1}` in patterns);
                        // treat the default as the value.
                        let value = self.parse_assignment_expr();
                        props.push(ObjectProp::KeyValue {
                            key: PropKey::Ident(name),
                            value,
                        });
                    } else {
                        props.push(ObjectProp::Shorthand(name));
                    }
                } else {
                    self.error_here("expected ':' after property key");
                }
            }
            if !self.check(RightBrace) && !self.eat(Comma) {
                self.error_here("expected ',' or '}' in object literal");
                break;
            }
        }
        self.expect(RightBrace, "expected '}'");
        self.add_expr(Expr::Object(props))
    }

    pub(crate) fn parse_property_key(&mut self) -> PropKey {
        use TokenKind::*;
        let token = self.current_token().clone();
        match token.kind {
            StringLiteral => {
                self.advance();
                PropKey::String(Symbol::intern(&cook_string(&token.lexeme)))
            }
            NumberLiteral => {
                self.advance();
                let value = match cook_number(&token.lexeme) {
                    NumberValue::Int(i) => i as f64,
                    NumberValue::Float(f) => f,
                };
                PropKey::Number(value)
            }
            LeftBracket => {
                self.advance();
                let expr = self.parse_assignment_expr();
                self.expect(RightBracket, "expected ']' after computed key");
                PropKey::Computed(expr)
            }
            _ => match self.property_name() {
                Some(name) => PropKey::Ident(name),
                None => {
                    self.error_here("expected property key");
                    if !self.is_at_end() {
                        self.advance();
                    }
                    PropKey::Ident(Symbol::intern("<error>"))
                }
            },
        }
    }

    pub(crate) fn parse_arguments(&mut self) -> Vec<ExprId> {
        use TokenKind::*;
        self.expect(LeftParen, "expected '('");
        let mut args = Vec::new();
        while !self.check(RightParen) && !self.is_at_end() {
            let arg = if self.eat(DotDotDot) {
                let inner = self.parse_assignment_expr();
                self.add_expr(Expr::Spread(inner))
            } else {
                self.parse_assignment_expr()
            };
            args.push(arg);
            if !self.check(RightParen) && !self.eat(Comma) {
                self.error_here("expected ',' or ')' in argument list");
                break;
            }
        }
        self.expect(RightParen, "expected ')'");
        args
    }

    // -----------------------------------------------------------------------
    // Arrow functions
    // -----------------------------------------------------------------------

    /// Scan forward from the `(` at `start` to its matching `)` and check
    /// whether `=>` (optionally behind a `: type` annotation) follows. This
    /// decides parameter-list vs parenthesized-expression without
    /// speculative parsing.
    fn is_arrow_ahead(&self, start: usize) -> bool {
        use TokenKind::*;
        debug_assert_eq!(self.peek_kind(start), LeftParen);
        let mut depth = 0usize;
        let mut i = start;
        loop {
            match self.peek_kind(i) {
                LeftParen => depth += 1,
                RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                EndOfFile => return false,
                _ => {}
            }
            i += 1;
        }
        match self.peek_kind(i + 1) {
            Arrow => true,
            Colon => {
                // Return-type annotation: scan for `=>` before a terminator.
                let mut j = i + 2;
                loop {
                    match self.peek_kind(j) {
                        Arrow => return true,
                        Semicolon | LeftBrace | RightBrace | EndOfFile => return false,
                        _ => j += 1,
                    }
                }
            }
            _ => false,
        }
    }

    fn parse_simple_arrow(&mut self, is_async: bool) -> ExprId {
        let name = Symbol::intern(&self.advance().lexeme);
        let pattern = self.add_pat(Pattern::Ident(name));
        self.expect(TokenKind::Arrow, "expected '=>'");
        let body = self.parse_arrow_body();
        self.add_expr(Expr::Arrow {
            params: vec![Param {
                pattern,
                ty: None,
                default: None,
                rest: false,
            }],
            body,
            is_async,
        })
    }

    fn parse_paren_arrow(&mut self, is_async: bool) -> ExprId {
        let params = self.parse_params();
        if self.eat(TokenKind::Colon) {
            let _ = self.parse_type_annotation(); // return type, discarded
        }
        self.expect(TokenKind::Arrow, "expected '=>'");
        let body = self.parse_arrow_body();
        self.add_expr(Expr::Arrow {
            params,
            body,
            is_async,
        })
    }

    fn parse_arrow_body(&mut self) -> ArrowBody {
        if self.check(TokenKind::LeftBrace) {
            ArrowBody::Block(self.parse_block_stmts())
        } else {
            ArrowBody::Expr(self.parse_assignment_expr())
        }
    }

    // -----------------------------------------------------------------------
    // Template literals
    // -----------------------------------------------------------------------

    /// Split a raw template token into quasis and interpolated expressions.
    ///
    /// The lexer delivers the whole back-tick-delimited text as one token.
    /// Here the text is scanned for `${`, braces are balanced to find each
    /// closing `}`, and a nested lexer+parser pass runs over every
    /// interpolation chunk. Parser token state is saved and restored around
    /// each nested pass.
    pub(crate) fn parse_template_literal(&mut self) -> ExprId {
        let token = self.advance();
        let raw = template_text(&token.lexeme).to_string();

        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let bytes = raw.as_bytes();
        let mut start = 0usize;

        while let Some(rel) = raw[start..].find("${") {
            let open = start + rel;
            quasis.push(Symbol::intern(&raw[start..open]));

            let mut depth = 1usize;
            let mut i = open + 2;
            while i < bytes.len() && depth > 0 {
                match bytes[i] {
                    b'{' => depth += 1,
                    b'}' => depth -= 1,
                    _ => {}
                }
                i += 1;
            }
            if depth > 0 {
                self.handler
                    .error("unterminated '${' in template literal", token.location);
                start = bytes.len();
                break;
            }

            let chunk = &raw[open + 2..i - 1];
            exprs.push(self.parse_nested_expression(chunk));
            start = i;
        }
        quasis.push(Symbol::intern(&raw[start..]));

        self.add_expr(Expr::Template { quasis, exprs })
    }

    /// Run a nested lexer+parser over an interpolation chunk, allocating
    /// into the same arenas.
    fn parse_nested_expression(&mut self, source: &str) -> ExprId {
        let mut sub_lexer = Lexer::new(self.file().as_str(), source);
        let sub_tokens = sub_lexer.all_tokens().to_vec();
        for diag in sub_lexer.handler().take() {
            self.handler.error(diag.message, diag.location);
        }

        let saved_tokens = std::mem::replace(&mut self.tokens, sub_tokens);
        let saved_current = std::mem::replace(&mut self.current, 0);

        let expr = self.parse_expression();
        if !self.is_at_end() {
            self.error_here("unexpected tokens in template expression");
        }

        self.tokens = saved_tokens;
        self.current = saved_current;
        expr
    }

    // -----------------------------------------------------------------------
    // Regex fallback
    // -----------------------------------------------------------------------

    /// The token stream shows `/` (or `/=`) where an expression must start.
    /// Re-lex from the raw source at that offset, forcing regex
    /// interpretation, then skip the pre-fetched tokens the regex text
    /// covers.
    fn relex_regex(&mut self) -> ExprId {
        let offset = self.current_token().location.offset as usize;
        let mut sub = Lexer::new(self.file().as_str(), &self.source()[offset..]);
        let regex = sub.try_lex_regex();

        if regex.kind == TokenKind::RegexLiteral {
            let end = offset + regex.lexeme.len();
            while !self.is_at_end() && (self.current_token().location.offset as usize) < end {
                self.advance();
            }
            self.add_expr(Expr::Regex(Symbol::intern(&regex.lexeme)))
        } else {
            self.error_here("expected expression");
            if !self.is_at_end() {
                self.advance();
            }
            self.add_expr(Expr::Invalid)
        }
    }
}

fn assign_op_for(kind: TokenKind) -> AssignOp {
    use TokenKind::*;
    match kind {
        Equal => AssignOp::Assign,
        PlusEqual => AssignOp::Add,
        MinusEqual => AssignOp::Sub,
        StarEqual => AssignOp::Mul,
        SlashEqual => AssignOp::Div,
        PercentEqual => AssignOp::Rem,
        StarStarEqual => AssignOp::Exp,
        LessLessEqual => AssignOp::Shl,
        GreaterGreaterEqual => AssignOp::Shr,
        GreaterGreaterGreaterEqual => AssignOp::UShr,
        AmpersandEqual => AssignOp::BitAnd,
        PipeEqual => AssignOp::BitOr,
        CaretEqual => AssignOp::BitXor,
        AmpersandAmpersandEqual => AssignOp::LogicalAnd,
        PipePipeEqual => AssignOp::LogicalOr,
        QuestionQuestionEqual => AssignOp::Nullish,
        _ => unreachable!("not an assignment operator: {:?}", kind),
    }
}
