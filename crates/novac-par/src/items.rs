//! Declaration parsing: functions, classes, interfaces, type aliases,
//! enums, and module import/export forms.

use novac_lex::TokenKind;
use novac_util::Symbol;

use crate::ast::{
    Accessibility, ClassDef, ClassMember, EnumMember, ExportKind, Expr, ExprId, Function,
    ImportSpecifier, MemberKind, Param, PropKey, Stmt, StmtId,
};
use crate::Parser;

impl<'src> Parser<'src> {
    // -----------------------------------------------------------------------
    // Functions
    // -----------------------------------------------------------------------

    pub(crate) fn parse_function_decl(&mut self, is_async: bool) -> StmtId {
        self.advance(); // function
        let is_generator = self.eat(TokenKind::Star);
        let name = if self.check(TokenKind::Identifier) {
            Some(Symbol::intern(&self.advance().lexeme))
        } else {
            self.error_here("expected function name");
            None
        };
        let func = self.parse_function_tail(name, is_async, is_generator);
        self.add_stmt(Stmt::FunctionDecl(func))
    }

    pub(crate) fn parse_function_expr(&mut self, is_async: bool) -> ExprId {
        self.advance(); // function
        let is_generator = self.eat(TokenKind::Star);
        let name = if self.check(TokenKind::Identifier) {
            Some(Symbol::intern(&self.advance().lexeme))
        } else {
            None
        };
        let func = self.parse_function_tail(name, is_async, is_generator);
        self.add_expr(Expr::Function(func))
    }

    /// Parameter list, optional return type, and body. The cursor must be at
    /// the opening `(`.
    pub(crate) fn parse_function_tail(
        &mut self,
        name: Option<Symbol>,
        is_async: bool,
        is_generator: bool,
    ) -> Function {
        let location = self.location();
        let params = self.parse_params();
        let return_ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type_annotation())
        } else {
            None
        };
        let body = self.parse_block_stmts();
        Function {
            name,
            params,
            return_ty,
            body,
            is_async,
            is_generator,
            location,
        }
    }

    /// `( param, ... )`. Parameter-property modifiers on constructor
    /// parameters (`public x`, `readonly y`) are accepted and discarded.
    pub(crate) fn parse_params(&mut self) -> Vec<Param> {
        use TokenKind::*;
        self.expect(LeftParen, "expected '('");
        let mut params = Vec::new();
        while !self.check(RightParen) && !self.is_at_end() {
            while matches!(
                self.peek_kind(0),
                KeywordPublic | KeywordPrivate | KeywordProtected | KeywordReadonly
            ) && self.peek_kind(1) != Colon
                && self.peek_kind(1) != Comma
                && self.peek_kind(1) != RightParen
            {
                self.advance();
            }
            let rest = self.eat(DotDotDot);
            let pattern = self.parse_binding_pattern();
            self.eat(Question); // optional-parameter marker
            let ty = if self.eat(Colon) {
                Some(self.parse_type_annotation())
            } else {
                None
            };
            let default = if self.eat(Equal) {
                Some(self.parse_assignment_expr())
            } else {
                None
            };
            params.push(Param {
                pattern,
                ty,
                default,
                rest,
            });
            if !self.check(RightParen) && !self.eat(Comma) {
                self.error_here("expected ',' or ')' in parameter list");
                break;
            }
        }
        self.expect(RightParen, "expected ')'");
        params
    }

    // -----------------------------------------------------------------------
    // Classes
    // -----------------------------------------------------------------------

    /// Class declaration, with any preceding decorator list and `abstract`
    /// modifier attached.
    pub(crate) fn parse_class_decl(&mut self) -> StmtId {
        let decorators = self.parse_decorators();
        let is_abstract = self.eat(TokenKind::KeywordAbstract);
        let def = self.parse_class_def_inner(decorators, is_abstract);
        self.add_stmt(Stmt::ClassDecl(Box::new(def)))
    }

    /// Class expression form; the cursor is at `class`.
    pub(crate) fn parse_class_def(&mut self) -> ClassDef {
        self.parse_class_def_inner(Vec::new(), false)
    }

    /// `@decorator` list preceding a class or member. Each decorator is an
    /// expression (identifier or call chain).
    pub(crate) fn parse_decorators(&mut self) -> Vec<ExprId> {
        let mut decorators = Vec::new();
        while self.eat(TokenKind::At) {
            let mut expr = match self.property_name() {
                Some(name) => self.add_expr(Expr::Ident(name)),
                None => {
                    self.error_here("expected decorator name after '@'");
                    self.add_expr(Expr::Invalid)
                }
            };
            loop {
                if self.eat(TokenKind::Dot) {
                    match self.property_name() {
                        Some(property) => {
                            expr = self.add_expr(Expr::Member {
                                object: expr,
                                property,
                                optional: false,
                            });
                        }
                        None => break,
                    }
                } else if self.check(TokenKind::LeftParen) {
                    let args = self.parse_arguments();
                    expr = self.add_expr(Expr::Call {
                        callee: expr,
                        args,
                        optional: false,
                    });
                } else {
                    break;
                }
            }
            decorators.push(expr);
        }
        decorators
    }

    fn parse_class_def_inner(&mut self, decorators: Vec<ExprId>, is_abstract: bool) -> ClassDef {
        use TokenKind::*;
        self.expect(KeywordClass, "expected 'class'");

        let name = if self.check(Identifier) {
            Some(Symbol::intern(&self.advance().lexeme))
        } else {
            None
        };

        let superclass = if self.eat(KeywordExtends) {
            Some(self.parse_postfix_class_heritage())
        } else {
            None
        };

        let mut implements = Vec::new();
        if self.eat(KeywordImplements) {
            loop {
                match self.property_name() {
                    Some(name) => implements.push(name),
                    None => {
                        self.error_here("expected interface name after 'implements'");
                        break;
                    }
                }
                self.skip_type_args();
                if !self.eat(Comma) {
                    break;
                }
            }
        }

        self.expect(LeftBrace, "expected '{' before class body");
        let mut members = Vec::new();
        while !self.check(RightBrace) && !self.is_at_end() {
            if self.eat(Semicolon) {
                continue;
            }
            members.push(self.parse_class_member());
        }
        self.expect(RightBrace, "expected '}' after class body");

        ClassDef {
            name,
            superclass,
            implements,
            is_abstract,
            decorators,
            members,
        }
    }

    /// Superclass expression: an identifier or member chain, optionally with
    /// type arguments (discarded).
    fn parse_postfix_class_heritage(&mut self) -> ExprId {
        let mut expr = match self.property_name() {
            Some(name) => self.add_expr(Expr::Ident(name)),
            None => {
                self.error_here("expected superclass name after 'extends'");
                self.add_expr(Expr::Invalid)
            }
        };
        while self.eat(TokenKind::Dot) {
            match self.property_name() {
                Some(property) => {
                    expr = self.add_expr(Expr::Member {
                        object: expr,
                        property,
                        optional: false,
                    });
                }
                None => break,
            }
        }
        self.skip_type_args();
        expr
    }

    fn parse_class_member(&mut self) -> ClassMember {
        use TokenKind::*;

        let decorators = self.parse_decorators();
        let mut accessibility = None;
        let mut is_static = false;
        let mut is_abstract = false;
        let mut is_readonly = false;
        let mut is_override = false;
        let mut is_async = false;
        let mut accessor_kind: Option<MemberKind> = None;

        // Modifier keywords only count as modifiers when not themselves the
        // member name (`static() {}` declares a method named "static").
        loop {
            let next = self.peek_kind(1);
            let in_name_position = matches!(next, LeftParen | Equal | Semicolon | Colon | RightBrace);
            match self.peek_kind(0) {
                KeywordPublic if !in_name_position => {
                    accessibility = Some(Accessibility::Public);
                    self.advance();
                }
                KeywordPrivate if !in_name_position => {
                    accessibility = Some(Accessibility::Private);
                    self.advance();
                }
                KeywordProtected if !in_name_position => {
                    accessibility = Some(Accessibility::Protected);
                    self.advance();
                }
                KeywordStatic if !in_name_position => {
                    is_static = true;
                    self.advance();
                }
                KeywordAbstract if !in_name_position => {
                    is_abstract = true;
                    self.advance();
                }
                KeywordReadonly if !in_name_position => {
                    is_readonly = true;
                    self.advance();
                }
                KeywordOverride if !in_name_position => {
                    is_override = true;
                    self.advance();
                }
                KeywordAsync if !in_name_position => {
                    is_async = true;
                    self.advance();
                }
                KeywordGet if !in_name_position && accessor_kind.is_none() => {
                    accessor_kind = Some(MemberKind::Getter);
                    self.advance();
                }
                KeywordSet if !in_name_position && accessor_kind.is_none() => {
                    accessor_kind = Some(MemberKind::Setter);
                    self.advance();
                }
                _ => break,
            }
        }

        let is_generator = self.eat(Star);
        let is_private_name = self.eat(Hash);
        let key = self.parse_property_key();
        self.eat(Question); // optional-member marker

        if self.check(LeftParen) {
            let name = match &key {
                PropKey::Ident(name) => Some(*name),
                _ => None,
            };
            let func = self.parse_function_tail(name, is_async, is_generator);
            let kind = accessor_kind.unwrap_or_else(|| {
                if matches!(&key, PropKey::Ident(n) if n.as_str() == "constructor") {
                    MemberKind::Constructor
                } else {
                    MemberKind::Method
                }
            });
            return ClassMember {
                kind,
                key,
                is_static,
                is_abstract,
                is_readonly,
                is_override,
                is_private_name,
                accessibility,
                decorators,
                func: Some(func),
                value: None,
                ty: None,
            };
        }

        // Field
        let ty = if self.eat(Colon) {
            Some(self.parse_type_annotation())
        } else {
            None
        };
        let value = if self.eat(Equal) {
            Some(self.parse_assignment_expr())
        } else {
            None
        };
        self.expect_semicolon();

        ClassMember {
            kind: MemberKind::Field,
            key,
            is_static,
            is_abstract,
            is_readonly,
            is_override,
            is_private_name,
            accessibility,
            decorators,
            func: None,
            value,
            ty,
        }
    }

    // -----------------------------------------------------------------------
    // Interfaces, type aliases, enums
    // -----------------------------------------------------------------------

    /// Interfaces are type information only; the body is skipped with brace
    /// balancing and only the name is recorded.
    pub(crate) fn parse_interface_decl(&mut self) -> StmtId {
        use TokenKind::*;
        self.advance(); // interface
        let name = match self.property_name() {
            Some(name) => name,
            None => {
                self.error_here("expected interface name");
                Symbol::intern("<error>")
            }
        };
        self.skip_type_args();
        if self.eat(KeywordExtends) {
            while !matches!(self.peek_kind(0), LeftBrace | EndOfFile) {
                self.advance();
            }
        }
        if self.check(LeftBrace) {
            self.skip_balanced(LeftBrace, RightBrace);
        } else {
            self.error_here("expected '{' in interface declaration");
        }
        self.add_stmt(Stmt::InterfaceDecl { name })
    }

    pub(crate) fn parse_type_alias_decl(&mut self) -> StmtId {
        self.advance(); // type
        let name = match self.property_name() {
            Some(name) => name,
            None => {
                self.error_here("expected type alias name");
                Symbol::intern("<error>")
            }
        };
        self.skip_type_args();
        self.expect(TokenKind::Equal, "expected '=' in type alias");
        let ty = self.parse_type_annotation();
        self.expect_semicolon();
        self.add_stmt(Stmt::TypeAliasDecl { name, ty })
    }

    pub(crate) fn parse_enum_decl(&mut self, is_const: bool) -> StmtId {
        use TokenKind::*;
        self.advance(); // enum
        let name = match self.property_name() {
            Some(name) => name,
            None => {
                self.error_here("expected enum name");
                Symbol::intern("<error>")
            }
        };
        self.expect(LeftBrace, "expected '{' in enum declaration");
        let mut members = Vec::new();
        while !self.check(RightBrace) && !self.is_at_end() {
            let member_name = match self.property_name() {
                Some(n) => n,
                None => {
                    if self.check(StringLiteral) {
                        let token = self.advance();
                        Symbol::intern(&novac_lex::token::cook_string(&token.lexeme))
                    } else {
                        self.error_here("expected enum member name");
                        break;
                    }
                }
            };
            let init = if self.eat(Equal) {
                Some(self.parse_assignment_expr())
            } else {
                None
            };
            members.push(EnumMember {
                name: member_name,
                init,
            });
            if !self.check(RightBrace) && !self.eat(Comma) {
                self.error_here("expected ',' or '}' in enum body");
                break;
            }
        }
        self.expect(RightBrace, "expected '}'");
        self.add_stmt(Stmt::EnumDecl {
            name,
            is_const,
            members,
        })
    }

    // -----------------------------------------------------------------------
    // Import / export
    // -----------------------------------------------------------------------

    pub(crate) fn parse_import_decl(&mut self) -> StmtId {
        use TokenKind::*;
        self.advance(); // import

        // `import "side-effect";`
        if self.check(StringLiteral) {
            let token = self.advance();
            let source = Symbol::intern(&novac_lex::token::cook_string(&token.lexeme));
            self.expect_semicolon();
            return self.add_stmt(Stmt::ImportDecl {
                specifiers: Vec::new(),
                source,
            });
        }

        // `import type ...` erases to a plain import here.
        if self.check(KeywordType) && self.peek_kind(1) != Comma && self.peek_kind(1) != KeywordFrom
        {
            self.advance();
        }

        let mut specifiers = Vec::new();

        if self.check(Identifier) {
            let name = Symbol::intern(&self.advance().lexeme);
            specifiers.push(ImportSpecifier::Default(name));
            if self.eat(Comma) {
                self.parse_import_clause_rest(&mut specifiers);
            }
        } else {
            self.parse_import_clause_rest(&mut specifiers);
        }

        self.expect(KeywordFrom, "expected 'from' in import declaration");
        let source = if self.check(StringLiteral) {
            let token = self.advance();
            Symbol::intern(&novac_lex::token::cook_string(&token.lexeme))
        } else {
            self.error_here("expected module specifier string");
            Symbol::intern("<error>")
        };
        self.expect_semicolon();
        self.add_stmt(Stmt::ImportDecl { specifiers, source })
    }

    fn parse_import_clause_rest(&mut self, specifiers: &mut Vec<ImportSpecifier>) {
        use TokenKind::*;
        if self.eat(Star) {
            self.expect(KeywordAs, "expected 'as' after '*'");
            match self.property_name() {
                Some(name) => specifiers.push(ImportSpecifier::Namespace(name)),
                None => self.error_here("expected namespace binding name"),
            }
        } else if self.eat(LeftBrace) {
            while !self.check(RightBrace) && !self.is_at_end() {
                let imported = match self.property_name() {
                    Some(name) => name,
                    None => {
                        self.error_here("expected import specifier name");
                        break;
                    }
                };
                let local = if self.eat(KeywordAs) {
                    self.property_name().unwrap_or(imported)
                } else {
                    imported
                };
                specifiers.push(ImportSpecifier::Named { imported, local });
                if !self.check(RightBrace) && !self.eat(Comma) {
                    self.error_here("expected ',' or '}' in import clause");
                    break;
                }
            }
            self.expect(RightBrace, "expected '}'");
        } else {
            self.error_here("expected import clause");
        }
    }

    pub(crate) fn parse_export_decl(&mut self) -> StmtId {
        use TokenKind::*;
        self.advance(); // export

        if self.eat(Star) {
            let alias = if self.eat(KeywordAs) {
                self.property_name()
            } else {
                None
            };
            self.expect(KeywordFrom, "expected 'from' in re-export");
            let source = if self.check(StringLiteral) {
                let token = self.advance();
                Symbol::intern(&novac_lex::token::cook_string(&token.lexeme))
            } else {
                self.error_here("expected module specifier string");
                Symbol::intern("<error>")
            };
            self.expect_semicolon();
            return self.add_stmt(Stmt::ExportDecl(ExportKind::All { source, alias }));
        }

        if self.eat(KeywordDefault) {
            let expr = match self.peek_kind(0) {
                KeywordFunction => self.parse_function_expr(false),
                KeywordAsync if self.peek_kind(1) == KeywordFunction => {
                    self.advance();
                    self.parse_function_expr(true)
                }
                KeywordClass => {
                    let def = self.parse_class_def();
                    self.add_expr(Expr::Class(Box::new(def)))
                }
                _ => self.parse_assignment_expr(),
            };
            self.expect_semicolon();
            return self.add_stmt(Stmt::ExportDecl(ExportKind::Default(expr)));
        }

        if self.eat(LeftBrace) {
            let mut specifiers = Vec::new();
            while !self.check(RightBrace) && !self.is_at_end() {
                let local = match self.property_name() {
                    Some(name) => name,
                    None => {
                        self.error_here("expected export specifier name");
                        break;
                    }
                };
                let exported = if self.eat(KeywordAs) {
                    self.property_name().unwrap_or(local)
                } else {
                    local
                };
                specifiers.push((local, exported));
                if !self.check(RightBrace) && !self.eat(Comma) {
                    self.error_here("expected ',' or '}' in export clause");
                    break;
                }
            }
            self.expect(RightBrace, "expected '}'");
            let source = if self.eat(KeywordFrom) {
                if self.check(StringLiteral) {
                    let token = self.advance();
                    Some(Symbol::intern(&novac_lex::token::cook_string(
                        &token.lexeme,
                    )))
                } else {
                    self.error_here("expected module specifier string");
                    None
                }
            } else {
                None
            };
            self.expect_semicolon();
            return self.add_stmt(Stmt::ExportDecl(ExportKind::Named { specifiers, source }));
        }

        let decl = self.parse_statement();
        self.add_stmt(Stmt::ExportDecl(ExportKind::Decl(decl)))
    }

    // -----------------------------------------------------------------------
    // Token skipping helpers
    // -----------------------------------------------------------------------

    /// Skip a balanced `open ... close` region, the cursor at `open`.
    pub(crate) fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) {
        let mut depth = 0usize;
        loop {
            let kind = self.peek_kind(0);
            if kind == TokenKind::EndOfFile {
                self.error_here("unexpected end of file in skipped region");
                return;
            }
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth -= 1;
                if depth == 0 {
                    self.advance();
                    return;
                }
            }
            self.advance();
        }
    }

    /// Skip `<...>` type arguments if present, counting `>>` and `>>>`
    /// tokens as multiple closers.
    pub(crate) fn skip_type_args(&mut self) {
        use TokenKind::*;
        if !self.check(Less) {
            return;
        }
        let mut depth = 0i32;
        loop {
            match self.peek_kind(0) {
                Less => depth += 1,
                Greater => depth -= 1,
                GreaterGreater => depth -= 2,
                GreaterGreaterGreater => depth -= 3,
                EndOfFile => {
                    self.error_here("unterminated type arguments");
                    return;
                }
                Semicolon => return, // bail out of malformed generics
                _ => {}
            }
            self.advance();
            if depth <= 0 {
                return;
            }
        }
    }
}
